//! Fan-out search across the live balancers.
//!
//! The [`Aggregator`] builds balancer instances from the settings store,
//! queries them in parallel and merges what comes back into one filtered,
//! de-duplicated list. It never fails: a balancer that errors or times out
//! simply contributes nothing (and is logged).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use balancers::aggregator::Aggregator;
//! use balancers::http::HttpClient;
//! use balancers::model::SearchQuery;
//! use balancers::settings::SettingsStore;
//! use balancers::store::FileStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(FileStore::new(FileStore::default_dir()));
//! let settings = Arc::new(SettingsStore::open(store));
//! let aggregator = Aggregator::new(settings, Arc::new(HttpClient::new()?));
//!
//! aggregator.init().await;
//! for hit in aggregator.search(&SearchQuery::new("Dune").with_kp_id("409424")).await {
//!     println!("{} [{}] {}", hit.title, hit.balancer, hit.content_id);
//! }
//! # Ok(())
//! # }
//! ```

use std::cmp::Reverse;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::balancer::{Balancer, BalancerKind};
use crate::error::{BalancerError, Result};
use crate::filter::{self, FilterConfig};
use crate::http::Transport;
use crate::model::{EpisodeRef, RawResult, SearchQuery, SeasonRef, StreamResult};
use crate::quality::compare_quality;
use crate::settings::SettingsStore;
use crate::util::{bounded_parallel, uniq_by, DEFAULT_CONCURRENCY};

/// Title used by [`Aggregator::verify`] for its smoke search.
pub const VERIFY_TITLE: &str = "Avengers";

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Balancer calls in flight during a search.
    pub concurrency: usize,
    /// Upper bound on every single balancer call.
    pub call_timeout: Duration,
    /// Filter used by [`Aggregator::search`].
    pub filter: FilterConfig,
    /// Order merged results by balancer priority instead of completion order.
    pub order_by_priority: bool,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            filter: FilterConfig::default(),
            order_by_priority: false,
        }
    }
}

/// What one balancer produced for a search.
#[derive(Debug)]
pub enum ProviderOutcome {
    Found {
        balancer: String,
        results: Vec<RawResult>,
    },
    Failed {
        balancer: String,
        error: BalancerError,
    },
}

impl ProviderOutcome {
    pub fn balancer(&self) -> &str {
        match self {
            ProviderOutcome::Found { balancer, .. } | ProviderOutcome::Failed { balancer, .. } => balancer,
        }
    }

    /// Results, or nothing for a failure.
    pub fn into_results(self) -> Vec<RawResult> {
        match self {
            ProviderOutcome::Found { results, .. } => results,
            ProviderOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Diagnostic line for one live balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEntry {
    pub name: String,
    pub api_url: String,
    pub requires_auth: bool,
    pub available: bool,
    pub ok: bool,
    pub count: usize,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub checked_at: DateTime<Utc>,
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    pub fn ok_count(&self) -> usize {
        self.entries.iter().filter(|e| e.ok).count()
    }
}

/// Orchestrates the live balancers.
///
/// Call [`Aggregator::init`] before searching, and again after the settings
/// change: the live list is a snapshot built from the settings at that time.
pub struct Aggregator {
    settings: Arc<SettingsStore>,
    transport: Arc<dyn Transport>,
    balancers: RwLock<Vec<Arc<dyn Balancer>>>,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(settings: Arc<SettingsStore>, transport: Arc<dyn Transport>) -> Self {
        Self::with_options(settings, transport, AggregatorOptions::default())
    }

    pub fn with_options(
        settings: Arc<SettingsStore>,
        transport: Arc<dyn Transport>,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            settings,
            transport,
            balancers: RwLock::new(Vec::new()),
            options,
        }
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Rebuild the live list from the current settings.
    ///
    /// Enabled names without a [`BalancerKind`] and balancers that are not
    /// available (missing token) are skipped. The list is sorted by
    /// descending priority; ties keep settings order. Returns the number of
    /// live balancers.
    pub async fn init(&self) -> usize {
        let settings = self.settings.snapshot();
        let mut live: Vec<Arc<dyn Balancer>> = Vec::new();

        for name in &settings.enabled_balancers {
            let Some(kind) = BalancerKind::from_name(name) else {
                tracing::debug!("Skipping unknown balancer: {}", name);
                continue;
            };
            if live.iter().any(|b| b.name() == kind.name()) {
                continue;
            }
            let config = kind.provider_config(&settings.balancer(name));
            let balancer = kind.build(config, self.transport.clone());
            if !balancer.is_available() {
                tracing::debug!("Skipping {}: no token configured", name);
                continue;
            }
            live.push(balancer);
        }
        live.sort_by_key(|b| Reverse(b.priority()));

        tracing::info!(
            "Live balancers: [{}]",
            live.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
        );
        let count = live.len();
        *self.balancers.write().await = live;
        count
    }

    /// Snapshot of the live list, highest priority first.
    pub async fn get_balancers(&self) -> Vec<Arc<dyn Balancer>> {
        self.balancers.read().await.clone()
    }

    pub async fn balancer(&self, name: &str) -> Option<Arc<dyn Balancer>> {
        self.balancers
            .read()
            .await
            .iter()
            .find(|b| b.name() == name)
            .cloned()
    }

    /// Search every live balancer and merge with the configured filter.
    pub async fn search(&self, query: &SearchQuery) -> Vec<RawResult> {
        self.search_with(query, &self.options.filter).await
    }

    /// [`Self::search`] with an explicit filter.
    pub async fn search_with(&self, query: &SearchQuery, cfg: &FilterConfig) -> Vec<RawResult> {
        let outcomes = self.search_outcomes(query).await;

        let mut merged = Vec::new();
        for outcome in outcomes {
            match outcome {
                ProviderOutcome::Found { results, .. } => merged.extend(results),
                ProviderOutcome::Failed { balancer, error } => {
                    tracing::warn!("Balancer {} failed: {}", balancer, error);
                }
            }
        }

        let total = merged.len();
        let results = uniq_by(filter::apply(merged, cfg), RawResult::dedup_key);
        tracing::debug!("Search '{}': {} raw, {} merged", query.title, total, results.len());
        results
    }

    /// Per-balancer outcomes of a search, unfiltered.
    ///
    /// In completion order, or in live-list order with
    /// [`AggregatorOptions::order_by_priority`].
    pub async fn search_outcomes(&self, query: &SearchQuery) -> Vec<ProviderOutcome> {
        let live = self.get_balancers().await;
        let after = self.options.call_timeout;

        let tasks: Vec<_> = live
            .into_iter()
            .enumerate()
            .map(|(rank, balancer)| {
                let query = query.clone();
                move || async move {
                    let name = balancer.name().to_string();
                    let outcome = match timed(&name, after, balancer.search(&query)).await {
                        Ok(results) => ProviderOutcome::Found {
                            balancer: name,
                            results,
                        },
                        Err(error) => ProviderOutcome::Failed {
                            balancer: name,
                            error,
                        },
                    };
                    Ok::<_, Infallible>((rank, outcome))
                }
            })
            .collect();

        let mut ranked = bounded_parallel(tasks, self.options.concurrency).await;
        if self.options.order_by_priority {
            ranked.sort_by_key(|(rank, _)| *rank);
        }
        ranked.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Smoke-search every live balancer, one at a time.
    pub async fn verify(&self) -> VerifyReport {
        let query = SearchQuery::new(VERIFY_TITLE);
        let mut entries = Vec::new();

        for balancer in self.get_balancers().await {
            let config = balancer.config();
            let started = Instant::now();
            let outcome = timed(balancer.name(), self.options.call_timeout, balancer.search(&query)).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (ok, count, error) = match outcome {
                Ok(results) => (true, results.len(), None),
                Err(e) => (false, 0, Some(e.to_string())),
            };
            entries.push(VerifyEntry {
                name: balancer.name().to_string(),
                api_url: config.api_url.clone(),
                requires_auth: config.requires_auth,
                available: balancer.is_available(),
                ok,
                count,
                error,
                elapsed_ms,
            });
        }

        let report = VerifyReport {
            checked_at: Utc::now(),
            entries,
        };
        tracing::info!("Verify: {}/{} balancers OK", report.ok_count(), report.entries.len());
        report
    }

    /// Streams of `content_id` on balancer `name`, best quality first.
    pub async fn streams(&self, name: &str, content_id: &str) -> Vec<StreamResult> {
        let mut streams = self
            .route(name, "get_streams", |b| async move { b.get_streams(content_id).await })
            .await;
        streams.sort_by(|a, b| compare_quality(b.quality.as_deref(), a.quality.as_deref()).cmp(&0));
        streams
    }

    pub async fn seasons(&self, name: &str, content_id: &str) -> Vec<SeasonRef> {
        self.route(name, "get_seasons", |b| async move { b.get_seasons(content_id).await })
            .await
    }

    pub async fn episodes(&self, name: &str, season_id: &str) -> Vec<EpisodeRef> {
        self.route(name, "get_episodes", |b| async move { b.get_episodes(season_id).await })
            .await
    }

    pub async fn direct_link(&self, name: &str, stream_id: &str) -> Option<String> {
        self.route(name, "get_direct_link", |b| async move {
            b.get_direct_link(stream_id).await
        })
        .await
    }

    /// Run `call` on the live balancer `name`, with the call timeout.
    ///
    /// Unknown names and failures give `T::default()`.
    async fn route<T, F, Fut>(&self, name: &str, capability: &str, call: F) -> T
    where
        T: Default,
        F: FnOnce(Arc<dyn Balancer>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(balancer) = self.balancer(name).await else {
            tracing::warn!("No live balancer named {}", name);
            return T::default();
        };
        match timed(name, self.options.call_timeout, call(balancer)).await {
            Ok(value) => value,
            Err(e) if e.is_not_implemented() => {
                tracing::debug!("{}", e);
                T::default()
            }
            Err(e) => {
                tracing::warn!("Balancer {} failed on {}: {}", name, capability, e);
                T::default()
            }
        }
    }
}

/// `call` bounded by `after`. The call is dropped when the time is up.
async fn timed<T>(balancer: &str, after: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| BalancerError::Timeout {
            balancer: balancer.to_string(),
            after,
        })?
}
