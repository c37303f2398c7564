//! Runtime configuration loaded from `~/.config/balancers/config.toml`.
//!
//! Every key is optional:
//!
//! ```toml
//! concurrency = 4
//! timeout_secs = 20
//! store_dir = "/var/lib/balancers"
//! user_agent = "balancers/0.1"
//! order_by_priority = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::aggregator::{AggregatorOptions, DEFAULT_CALL_TIMEOUT};
use crate::store::FileStore;
use crate::util::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Balancer calls in flight during a search.
    pub concurrency: Option<usize>,
    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Directory for persisted settings.
    pub store_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub order_by_priority: Option<bool>,
}

impl AppConfig {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.filter(|n| *n > 0).unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn call_timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_CALL_TIMEOUT, Duration::from_secs)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    /// Aggregator options with the default filter.
    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            concurrency: self.concurrency(),
            call_timeout: self.call_timeout(),
            order_by_priority: self.order_by_priority.unwrap_or(false),
            ..AggregatorOptions::default()
        }
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("balancers")
        .join("config.toml")
}
