//! Vibix balancer.
//!
//! Vibix has no title search: content is looked up by Kinopoisk id, then by
//! IMDb id. Content ids handed out by this balancer are `kp:<id>` or
//! `imdb:<id>` so later calls know which lookup to repeat. Lookups are
//! cached per instance, including misses.
//!
//! Playback goes through the Vibix iframe player, so there is no direct
//! link to resolve.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::rest::scalar_to_string;
use super::Balancer;
use crate::error::{BalancerError, Result};
use crate::http::{HttpRequest, Transport};
use crate::model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};
use crate::util::first_number;

const UNKNOWN_TITLE: &str = "Неизвестно";

#[derive(Debug, Clone, Default, Deserialize)]
struct Video {
    name_rus: Option<String>,
    name_eng: Option<String>,
    name: Option<String>,
    iframe_url: Option<String>,
    quality: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    voiceovers: Option<Vec<Voiceover>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Voiceover {
    #[serde(default)]
    id: Value,
    name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Serial {
    seasons: Option<Vec<Season>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Season {
    #[serde(default)]
    name: Value,
    series: Option<Vec<Episode>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Episode {
    #[serde(default)]
    id: Value,
    name: Option<String>,
}

impl Video {
    fn title(&self) -> String {
        [&self.name_rus, &self.name_eng, &self.name]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    fn iframe(&self) -> Option<&str> {
        self.iframe_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Which id a content id was looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSource {
    Kinopoisk,
    Imdb,
}

impl IdSource {
    fn prefix(self) -> &'static str {
        match self {
            IdSource::Kinopoisk => "kp",
            IdSource::Imdb => "imdb",
        }
    }

    /// Split `kp:123` / `imdb:tt123` into its source and raw id.
    fn parse(content_id: &str) -> Option<(Self, &str)> {
        let (prefix, id) = content_id.split_once(':')?;
        let source = match prefix {
            "kp" => IdSource::Kinopoisk,
            "imdb" => IdSource::Imdb,
            _ => return None,
        };
        (!id.is_empty()).then_some((source, id))
    }
}

pub struct VibixBalancer {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    videos: Mutex<HashMap<String, Option<Video>>>,
}

impl VibixBalancer {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            videos: Mutex::new(HashMap::new()),
        }
    }

    fn ready(&self) -> bool {
        !self.config.api_url.is_empty() && self.config.token().is_some()
    }

    /// GET `path` as JSON. A 404 is "not found", not an error.
    async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let url = format!("{}{path}", self.config.api_url.trim_end_matches('/'));
        tracing::debug!("vibix: GET {}", url);

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .bearer(self.config.token());
        match self.transport.request(request).await {
            Ok(payload) => {
                let data = payload.into_json();
                // Some endpoints wrap the record in `data`
                let data = match data.get("data") {
                    Some(inner) if inner.is_object() => inner.clone(),
                    _ => data,
                };
                Ok((!data.is_null()).then_some(data))
            }
            Err(BalancerError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn video(&self, source: IdSource, id: &str) -> Result<Option<Video>> {
        let key = format!("{}:{id}", source.prefix());
        if let Some(cached) = self.videos.lock().await.get(&key) {
            return Ok(cached.clone());
        }

        let path = format!("/publisher/videos/{}/{id}", source.prefix());
        let video = match self.get_json(&path).await? {
            Some(data) => Some(serde_json::from_value::<Video>(data)?),
            None => None,
        };
        let video = video.filter(|v| v.iframe().is_some());

        self.videos.lock().await.insert(key, video.clone());
        Ok(video)
    }

    async fn serial(&self, source: IdSource, id: &str) -> Result<Serial> {
        let path = format!("/serials/{}/{id}", source.prefix());
        match self.get_json(&path).await? {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Ok(Serial::default()),
        }
    }

    /// First hit by Kinopoisk id, then by IMDb id.
    ///
    /// A failed lookup falls through to the next id; only the error of the
    /// last one is returned.
    async fn lookup(&self, query: &SearchQuery) -> Result<Option<(String, Video)>> {
        let candidates: Vec<(IdSource, &str)> = [
            (IdSource::Kinopoisk, query.kp_id.as_deref()),
            (IdSource::Imdb, query.imdb_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(source, id)| Some((source, id.filter(|id| !id.is_empty())?)))
        .collect();

        let last = candidates.len().saturating_sub(1);
        for (i, (source, id)) in candidates.into_iter().enumerate() {
            match self.video(source, id).await {
                Ok(Some(video)) => return Ok(Some((format!("{}:{id}", source.prefix()), video))),
                Ok(None) => {}
                Err(e) if i < last => {
                    tracing::debug!("vibix: {} lookup for {} failed: {}", source.prefix(), id, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    fn to_result(&self, content_id: String, video: &Video) -> RawResult {
        RawResult {
            balancer: self.config.name.clone(),
            content_id,
            title: video.title(),
            voice: None,
            quality: video.quality.clone().filter(|q| !q.is_empty()),
            url: video.iframe().map(str::to_string),
            kind: video.kind.clone(),
        }
    }
}

#[async_trait]
impl Balancer for VibixBalancer {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        Ok(self
            .lookup(query)
            .await?
            .map(|(content_id, video)| self.to_result(content_id, &video))
            .into_iter()
            .collect())
    }

    async fn get_streams(&self, content_id: &str) -> Result<Vec<StreamResult>> {
        let Some((source, id)) = IdSource::parse(content_id) else {
            return Ok(Vec::new());
        };
        if !self.ready() {
            return Ok(Vec::new());
        }
        let Some(video) = self.video(source, id).await? else {
            return Ok(Vec::new());
        };
        Ok(streams_for(&self.config.name, content_id, &video))
    }

    async fn get_seasons(&self, content_id: &str) -> Result<Vec<SeasonRef>> {
        let Some((source, id)) = IdSource::parse(content_id) else {
            return Ok(Vec::new());
        };
        if !self.ready() {
            return Ok(Vec::new());
        }
        let serial = self.serial(source, id).await?;

        Ok(serial
            .seasons
            .unwrap_or_default()
            .iter()
            .filter_map(|season| {
                let name = scalar_to_string(&season.name)?;
                Some(SeasonRef {
                    season_id: format!("{content_id}/{name}"),
                    number: first_number(&name),
                    title: name,
                })
            })
            .collect())
    }

    async fn get_episodes(&self, season_id: &str) -> Result<Vec<EpisodeRef>> {
        let Some((content_id, season_name)) = season_id.rsplit_once('/') else {
            return Ok(Vec::new());
        };
        let Some((source, id)) = IdSource::parse(content_id) else {
            return Ok(Vec::new());
        };
        if !self.ready() {
            return Ok(Vec::new());
        }

        let iframe = self
            .video(source, id)
            .await?
            .and_then(|video| video.iframe().map(str::to_string));
        let serial = self.serial(source, id).await?;
        let Some(season) = serial
            .seasons
            .unwrap_or_default()
            .into_iter()
            .find(|season| scalar_to_string(&season.name).as_deref() == Some(season_name))
        else {
            return Ok(Vec::new());
        };

        Ok(season
            .series
            .unwrap_or_default()
            .iter()
            .filter_map(|episode| {
                let episode_id = scalar_to_string(&episode.id)?;
                let title = episode
                    .name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| episode_id.clone());
                Some(EpisodeRef {
                    number: first_number(&title).or_else(|| episode_id.parse().ok()),
                    url: iframe
                        .as_deref()
                        .map(|base| format!("{base}?season={season_name}&episode={episode_id}")),
                    episode_id: format!("{season_id}/{episode_id}"),
                    title,
                })
            })
            .collect())
    }

    // get_direct_link: default (iframe player only)
}

/// One stream per voiceover, or a single unlabelled stream without any.
fn streams_for(balancer: &str, content_id: &str, video: &Video) -> Vec<StreamResult> {
    let url = video.iframe().map(str::to_string);
    let quality = video.quality.clone().filter(|q| !q.is_empty());
    let voiceovers = video.voiceovers.as_deref().unwrap_or_default();

    if voiceovers.is_empty() {
        return vec![StreamResult {
            balancer: balancer.to_string(),
            stream_id: content_id.to_string(),
            voice: None,
            quality,
            url,
        }];
    }

    voiceovers
        .iter()
        .enumerate()
        .map(|(index, voiceover)| {
            let voice_id = scalar_to_string(&voiceover.id).unwrap_or_else(|| index.to_string());
            StreamResult {
                balancer: balancer.to_string(),
                stream_id: format!("{content_id}#{voice_id}"),
                voice: voiceover.name.clone().filter(|name| !name.is_empty()),
                quality: quality.clone(),
                url: url.clone(),
            }
        })
        .collect()
}
