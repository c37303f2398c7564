//! Balancer contract and registry.
//!
//! A [`Balancer`] wraps one third-party content source and maps its
//! payloads onto the shared records in [`crate::model`]. The set of
//! balancers is closed: [`BalancerKind`] names every variant and knows how
//! to build it from a [`ProviderConfig`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use balancers::balancer::BalancerKind;
//! use balancers::http::HttpClient;
//! use balancers::model::{ProviderConfig, SearchQuery};
//!
//! # async fn example() -> balancers::Result<()> {
//! let transport = Arc::new(HttpClient::new()?);
//! let config = ProviderConfig {
//!     name: "videodb".into(),
//!     api_url: BalancerKind::Videodb.default_api_url().into(),
//!     ..ProviderConfig::default()
//! };
//! let videodb = BalancerKind::Videodb.build(config, transport);
//! let hits = videodb.search(&SearchQuery::new("Dune")).await?;
//! println!("{} hits", hits.len());
//! # Ok(())
//! # }
//! ```

pub mod cdn;
pub mod filmix;
pub mod kinopub;
pub mod kodik;
pub(crate) mod rest;
pub mod rezka;
pub mod vibix;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BalancerError, Result};
use crate::http::Transport;
use crate::model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};
use crate::settings::BalancerSettings;
use crate::util::resolve_api_url;

pub use cdn::CdnBalancer;
pub use filmix::FilmixBalancer;
pub use kinopub::KinopubBalancer;
pub use kodik::KodikBalancer;
pub use rezka::RezkaBalancer;
pub use vibix::VibixBalancer;

/// One content source.
///
/// "Nothing found" is always an empty vec or `None`, never an error.
/// Errors mean the backend could not be reached or its payload could not
/// be read. Capabilities a balancer lacks fail with
/// [`BalancerError::NotImplemented`].
#[async_trait]
pub trait Balancer: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    /// Lowercase balancer name, e.g. `"kodik"`.
    fn name(&self) -> &str {
        &self.config().name
    }

    fn priority(&self) -> i64 {
        self.config().priority
    }

    /// `true` unless the balancer needs a token and has none.
    fn is_available(&self) -> bool {
        !self.config().requires_auth || self.config().token().is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        let _ = query;
        Err(BalancerError::not_implemented(self.name(), "search"))
    }

    async fn get_seasons(&self, content_id: &str) -> Result<Vec<SeasonRef>> {
        let _ = content_id;
        Err(BalancerError::not_implemented(self.name(), "get_seasons"))
    }

    async fn get_episodes(&self, season_id: &str) -> Result<Vec<EpisodeRef>> {
        let _ = season_id;
        Err(BalancerError::not_implemented(self.name(), "get_episodes"))
    }

    async fn get_streams(&self, content_id: &str) -> Result<Vec<StreamResult>> {
        let _ = content_id;
        Err(BalancerError::not_implemented(self.name(), "get_streams"))
    }

    /// Final playable URL for a stream, or `None` when it cannot be resolved.
    async fn get_direct_link(&self, stream_id: &str) -> Result<Option<String>> {
        let _ = stream_id;
        Err(BalancerError::not_implemented(self.name(), "get_direct_link"))
    }
}

/// Every supported balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalancerKind {
    Svetacdn,
    Allohacdn,
    Videodb,
    Kodik,
    Filmix,
    Kinopub,
    Rezka,
    Vibix,
}

impl BalancerKind {
    pub const ALL: [BalancerKind; 8] = [
        BalancerKind::Svetacdn,
        BalancerKind::Allohacdn,
        BalancerKind::Videodb,
        BalancerKind::Kodik,
        BalancerKind::Filmix,
        BalancerKind::Kinopub,
        BalancerKind::Rezka,
        BalancerKind::Vibix,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BalancerKind::Svetacdn => "svetacdn",
            BalancerKind::Allohacdn => "allohacdn",
            BalancerKind::Videodb => "videodb",
            BalancerKind::Kodik => "kodik",
            BalancerKind::Filmix => "filmix",
            BalancerKind::Kinopub => "kinopub",
            BalancerKind::Rezka => "rezka",
            BalancerKind::Vibix => "vibix",
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            BalancerKind::Kodik | BalancerKind::Filmix | BalancerKind::Kinopub | BalancerKind::Vibix
        )
    }

    /// Base URL used when the settings leave `apiUrl` empty.
    pub fn default_api_url(self) -> &'static str {
        match self {
            BalancerKind::Kodik => "https://kodikapi.com",
            BalancerKind::Allohacdn => "https://api.alloha.tv",
            BalancerKind::Videodb => "https://videocdn.tv/api",
            BalancerKind::Kinopub => "https://api.service-kp.com/v1",
            BalancerKind::Rezka => "https://rezka.ag",
            BalancerKind::Vibix => "https://vibix.org/api/v1",
            BalancerKind::Svetacdn | BalancerKind::Filmix => "",
        }
    }

    /// Connection config for this balancer from its settings record.
    pub fn provider_config(self, settings: &BalancerSettings) -> ProviderConfig {
        ProviderConfig {
            name: self.name().to_string(),
            api_url: resolve_api_url(self.name(), settings),
            requires_auth: self.requires_auth(),
            token: settings.token.clone().filter(|t| !t.is_empty()),
            priority: settings.priority,
            device_id: settings.device_id.clone().filter(|d| !d.is_empty()),
        }
    }

    pub fn build(self, mut config: ProviderConfig, transport: Arc<dyn Transport>) -> Arc<dyn Balancer> {
        self.name().clone_into(&mut config.name);
        config.requires_auth = self.requires_auth();

        match self {
            BalancerKind::Svetacdn | BalancerKind::Allohacdn | BalancerKind::Videodb => {
                Arc::new(CdnBalancer::new(config, transport))
            }
            BalancerKind::Kodik => Arc::new(KodikBalancer::new(config, transport)),
            BalancerKind::Filmix => Arc::new(FilmixBalancer::new(config, transport)),
            BalancerKind::Kinopub => Arc::new(KinopubBalancer::new(config, transport)),
            BalancerKind::Rezka => Arc::new(RezkaBalancer::new(config, transport)),
            BalancerKind::Vibix => Arc::new(VibixBalancer::new(config, transport)),
        }
    }
}

impl fmt::Display for BalancerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BalancerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(&s.to_lowercase()).ok_or_else(|| format!("unknown balancer: {s}"))
    }
}
