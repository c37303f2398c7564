//! Normalized records shared by every balancer.

use serde::{Deserialize, Serialize};

/// A search request, built by the caller per search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
}

impl SearchQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tmdb_id(mut self, id: impl Into<String>) -> Self {
        self.tmdb_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_kp_id(mut self, id: impl Into<String>) -> Self {
        self.kp_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_imdb_id(mut self, id: impl Into<String>) -> Self {
        self.imdb_id = Some(id.into());
        self
    }
}

/// A single search hit, tagged with the balancer that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    /// Name of the producing balancer. Never empty.
    pub balancer: String,
    /// Balancer-specific content identifier.
    pub content_id: String,
    pub title: String,
    pub voice: Option<String>,
    pub quality: Option<String>,
    pub url: Option<String>,
    /// `"movie"`, `"serial"`, ... as reported by the balancer.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl RawResult {
    /// Identity used to collapse duplicate hits from one balancer.
    pub fn dedup_key(&self) -> (String, String, Option<String>, Option<String>) {
        (
            self.balancer.clone(),
            self.content_id.clone(),
            self.voice.clone(),
            self.quality.clone(),
        )
    }
}

/// A playable stream candidate for one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResult {
    pub balancer: String,
    pub stream_id: String,
    pub voice: Option<String>,
    pub quality: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRef {
    pub season_id: String,
    pub title: String,
    pub number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub episode_id: String,
    pub title: String,
    pub number: Option<u32>,
    /// Ready-to-play URL, for balancers that hand one out per episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Connection settings for one live balancer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,
    pub api_url: String,
    pub requires_auth: bool,
    pub token: Option<String>,
    pub priority: i64,
    pub device_id: Option<String>,
}

impl ProviderConfig {
    /// The token, if one is configured and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref().filter(|d| !d.is_empty())
    }
}
