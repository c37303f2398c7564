//! Kodik balancer.
//!
//! Token goes in the query string. Voice comes from `translation.title` and
//! the player URL from `link`; streams are listed under `/list`.

use std::sync::Arc;

use async_trait::async_trait;

use super::rest::{Auth, Fields, RestApi};
use super::Balancer;
use crate::error::Result;
use crate::http::Transport;
use crate::model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};

const KODIK_FIELDS: Fields = Fields {
    voice: &["translation.title", "voice"],
    url: &["link", "url"],
};

pub struct KodikBalancer {
    api: RestApi,
}

impl KodikBalancer {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api: RestApi::new(config, transport, Auth::Query, KODIK_FIELDS),
        }
    }
}

#[async_trait]
impl Balancer for KodikBalancer {
    fn config(&self) -> &ProviderConfig {
        self.api.config()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        self.api.search(query).await
    }

    async fn get_seasons(&self, content_id: &str) -> Result<Vec<SeasonRef>> {
        self.api.seasons(content_id).await
    }

    async fn get_episodes(&self, season_id: &str) -> Result<Vec<EpisodeRef>> {
        self.api.episodes(season_id).await
    }

    async fn get_streams(&self, content_id: &str) -> Result<Vec<StreamResult>> {
        self.api.streams("/list", content_id).await
    }

    async fn get_direct_link(&self, stream_id: &str) -> Result<Option<String>> {
        self.api.direct_link(stream_id).await
    }
}
