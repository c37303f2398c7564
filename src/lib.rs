//! `balancers` - one search across many video-stream balancers
//!
//! # Features
//!
//! - **Fan-out search**: every enabled balancer is queried in parallel, with
//!   bounded concurrency and a per-call timeout
//! - **Filtering**: by balancer, voice-over and quality range
//! - **De-duplication**: one hit per `(balancer, content, voice, quality)`
//! - **Navigation**: streams, seasons, episodes and direct links per balancer
//! - **Persistent settings**: one JSON object, written through on every change
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use balancers::{Aggregator, HttpClient, MemoryStore, SearchQuery, SettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Arc::new(SettingsStore::open(Arc::new(MemoryStore::new())));
//!     let aggregator = Aggregator::new(settings, Arc::new(HttpClient::new()?));
//!     aggregator.init().await;
//!
//!     let hits = aggregator.search(&SearchQuery::new("Dune")).await;
//!     println!("Found {} hits", hits.len());
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod balancer;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod model;
pub mod quality;
pub mod settings;
pub mod store;
pub mod util;

pub use aggregator::{Aggregator, AggregatorOptions, ProviderOutcome, VerifyEntry, VerifyReport};
pub use balancer::{Balancer, BalancerKind};
pub use config::AppConfig;
pub use error::{BalancerError, Result};
pub use filter::FilterConfig;
pub use http::{HttpClient, HttpRequest, Payload, Transport};
pub use model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};
pub use quality::{compare_quality, normalize_quality};
pub use settings::{Settings, SettingsStore};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Version of balancers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
