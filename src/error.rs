//! Error taxonomy for balancer calls and settings persistence.
//!
//! Missing tokens or URLs are not errors: such balancers are left out of the
//! active set. Everything here is a fault a single balancer call (or a store
//! write) can hit; the aggregator catches all of them per balancer.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by balancers, the transport and the settings store.
#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The balancer does not support this capability at all.
    #[error("{balancer}: {capability} is not implemented")]
    NotImplemented {
        balancer: String,
        capability: &'static str,
    },

    #[error("{balancer}: no response after {after:?}")]
    Timeout { balancer: String, after: Duration },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BalancerError {
    pub(crate) fn not_implemented(balancer: &str, capability: &'static str) -> Self {
        Self::NotImplemented {
            balancer: balancer.to_string(),
            capability,
        }
    }

    /// `true` for an unsupported capability, `false` for runtime faults.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, BalancerError>;
