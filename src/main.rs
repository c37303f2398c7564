//! `balancers` CLI - search, verify and configure video-stream balancers

mod cmd;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use balancers::config::config_path;
use balancers::{Aggregator, AppConfig, FileStore, HttpClient, SettingsStore};

#[derive(Parser)]
#[command(name = "balancers")]
#[command(about = "Search many video-stream balancers at once")]
#[command(version)]
struct Cli {
    /// Balancer calls in flight during a search
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Per-call timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory for persisted settings
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every live balancer
    Search {
        /// Title to search for
        title: String,

        /// TMDB id
        #[arg(long)]
        tmdb: Option<String>,

        /// Kinopoisk id
        #[arg(long)]
        kp: Option<String>,

        /// IMDb id
        #[arg(long)]
        imdb: Option<String>,

        /// Show every result, unfiltered
        #[arg(short, long)]
        all: bool,

        /// Filter overrides as JSON, e.g. '{"balancers":{"active":[]}}'
        #[arg(long, conflicts_with = "all")]
        filter: Option<String>,
    },

    /// Smoke-search each live balancer and report
    Verify,

    /// List live balancers, highest priority first
    List,

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// List streams of a content item
    Streams {
        /// Balancer name
        balancer: String,
        /// Content id from search results
        content_id: String,
    },

    /// List seasons of a series
    Seasons {
        /// Balancer name
        balancer: String,
        /// Content id from search results
        content_id: String,
    },

    /// List episodes of a season
    Episodes {
        /// Balancer name
        balancer: String,
        /// Season id from `seasons`
        season_id: String,
    },

    /// Resolve a stream to a playable URL
    Link {
        /// Balancer name
        balancer: String,
        /// Stream id from `streams`
        stream_id: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings
    Show,
    /// Set a value by dotted path, e.g. `kodik.token abc`
    Set {
        /// Dotted path
        path: String,
        /// Value (parsed as JSON when possible)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_env("BALANCERS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load()
        .with_context(|| format!("failed to load {}", config_path().display()))?;
    if cli.concurrency.is_some() {
        config.concurrency = cli.concurrency;
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }
    if cli.store_dir.is_some() {
        config.store_dir = cli.store_dir.clone();
    }

    let store = Arc::new(FileStore::new(config.store_dir()));
    let settings = Arc::new(SettingsStore::open(store));

    // Settings commands don't need the network
    if let Commands::Settings { action } = &cli.command {
        return match action {
            SettingsAction::Show => cmd::cmd_settings_show(&settings, cli.json),
            SettingsAction::Set { path, value } => cmd::cmd_settings_set(&settings, path, value, cli.json),
        };
    }

    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("balancers/{}", balancers::VERSION));
    // Transport timeout stays above the per-call timeout so the latter decides
    let transport = HttpClient::with_options(&user_agent, config.call_timeout() + Duration::from_secs(5))?;

    let aggregator = Aggregator::with_options(settings, Arc::new(transport), config.aggregator_options());
    aggregator.init().await;

    match cli.command {
        Commands::Search {
            title,
            tmdb,
            kp,
            imdb,
            all,
            filter,
        } => {
            let args = cmd::SearchArgs {
                title: &title,
                tmdb: tmdb.as_deref(),
                kp: kp.as_deref(),
                imdb: imdb.as_deref(),
                all,
                filter: filter.as_deref(),
            };
            cmd::cmd_search(&aggregator, &args, cli.json).await?;
        }
        Commands::Verify => {
            cmd::cmd_verify(&aggregator, cli.json).await?;
        }
        Commands::List => {
            cmd::cmd_list(&aggregator, cli.json).await?;
        }
        Commands::Streams { balancer, content_id } => {
            cmd::cmd_streams(&aggregator, &balancer, &content_id, cli.json).await?;
        }
        Commands::Seasons { balancer, content_id } => {
            cmd::cmd_seasons(&aggregator, &balancer, &content_id, cli.json).await?;
        }
        Commands::Episodes { balancer, season_id } => {
            cmd::cmd_episodes(&aggregator, &balancer, &season_id, cli.json).await?;
        }
        Commands::Link { balancer, stream_id } => {
            cmd::cmd_link(&aggregator, &balancer, &stream_id, cli.json).await?;
        }
        Commands::Settings { .. } => {}
    }

    Ok(())
}
