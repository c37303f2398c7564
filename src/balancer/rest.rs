//! JSON REST glue shared by the API-style balancers.
//!
//! These backends all expose `/search`, `/streams`, `/seasons`, `/episodes`
//! and `/direct` with loosely-shaped payloads. They differ in how the token
//! travels and in a few field names, captured by [`Auth`] and [`Fields`].

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::http::{HttpRequest, Transport};
use crate::model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};
use crate::util::build_url;

/// How the token is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    None,
    /// `?token=<token>`
    Query,
    /// `Authorization: Bearer <token>`
    Bearer,
}

/// Candidate keys per output field, first non-empty wins. Dotted keys walk
/// into nested objects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields {
    pub voice: &'static [&'static str],
    pub url: &'static [&'static str],
}

pub(crate) const PLAIN_FIELDS: Fields = Fields {
    voice: &["voice"],
    url: &["url"],
};

const ID_KEYS: &[&str] = &["id", "contentId", "kpId", "tmdbId", "slug"];

pub(crate) struct RestApi {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    auth: Auth,
    fields: Fields,
}

impl RestApi {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>, auth: Auth, fields: Fields) -> Self {
        Self {
            config,
            transport,
            auth,
            fields,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Whether calls can be made at all: a base URL, and a token if needed.
    pub fn ready(&self) -> bool {
        !self.config.api_url.is_empty() && (self.auth == Auth::None || self.config.token().is_some())
    }

    fn endpoint(&self, path: &str, params: &[(&str, Option<&str>)]) -> String {
        let base = format!("{}{path}", self.config.api_url.trim_end_matches('/'));
        let mut params = params.to_vec();
        if self.auth == Auth::Query {
            params.push(("token", self.config.token()));
        }
        if let Some(device_id) = self.config.device_id() {
            params.push(("device_id", Some(device_id)));
        }
        build_url(&base, &params)
    }

    async fn get_json(&self, path: &str, params: &[(&str, Option<&str>)]) -> Result<Value> {
        let url = self.endpoint(path, params);
        tracing::debug!("{}: GET {}", self.config.name, url);

        let mut request = HttpRequest::get(url).header("Accept", "application/json");
        if self.auth == Auth::Bearer {
            request = request.bearer(self.config.token());
        }
        Ok(self.transport.request(request).await?.into_json())
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let data = self
            .get_json(
                "/search",
                &[
                    ("q", Some(query.title.as_str())),
                    ("tmdb", query.tmdb_id.as_deref()),
                    ("kp", query.kp_id.as_deref()),
                ],
            )
            .await?;

        Ok(items(&data, &["results"])
            .iter()
            .map(|item| RawResult {
                balancer: self.config.name.clone(),
                content_id: text_field(item, ID_KEYS).unwrap_or_default(),
                title: text_field(item, &["title"]).unwrap_or_else(|| query.title.clone()),
                voice: text_field(item, self.fields.voice),
                quality: text_field(item, &["quality"]),
                url: text_field(item, self.fields.url),
                kind: text_field(item, &["type"]),
            })
            .collect())
    }

    pub async fn streams(&self, path: &str, content_id: &str) -> Result<Vec<StreamResult>> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let data = self.get_json(path, &[("id", Some(content_id))]).await?;

        Ok(items(&data, &["streams", "results"])
            .iter()
            .map(|item| StreamResult {
                balancer: self.config.name.clone(),
                stream_id: text_field(item, &["id", "streamId"]).unwrap_or_default(),
                voice: text_field(item, self.fields.voice),
                quality: text_field(item, &["quality"]),
                url: text_field(item, self.fields.url),
            })
            .collect())
    }

    pub async fn seasons(&self, content_id: &str) -> Result<Vec<SeasonRef>> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let data = self.get_json("/seasons", &[("id", Some(content_id))]).await?;

        Ok(items(&data, &["seasons"])
            .iter()
            .map(|item| {
                let (title, number) = title_and_number(item);
                SeasonRef {
                    season_id: text_field(item, &["id", "seasonId"]).unwrap_or_default(),
                    title,
                    number,
                }
            })
            .collect())
    }

    pub async fn episodes(&self, season_id: &str) -> Result<Vec<EpisodeRef>> {
        if !self.ready() {
            return Ok(Vec::new());
        }
        let data = self.get_json("/episodes", &[("id", Some(season_id))]).await?;

        Ok(items(&data, &["episodes"])
            .iter()
            .map(|item| {
                let (title, number) = title_and_number(item);
                EpisodeRef {
                    episode_id: text_field(item, &["id", "episodeId"]).unwrap_or_default(),
                    title,
                    number,
                    url: text_field(item, self.fields.url),
                }
            })
            .collect())
    }

    pub async fn direct_link(&self, stream_id: &str) -> Result<Option<String>> {
        if !self.ready() {
            return Ok(None);
        }
        let data = self.get_json("/direct", &[("id", Some(stream_id))]).await?;
        Ok(text_field(&data, &["url"]))
    }
}

/// The array under the first present key, or `data` itself if it is an
/// array, or nothing.
pub(crate) fn items<'a>(data: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_array))
        .or_else(|| data.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Non-empty strings and non-zero numbers, as a string.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// First key (dotted for nested objects) holding a usable scalar.
pub(crate) fn text_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        key.split('.')
            .try_fold(item, |node, part| node.get(part))
            .and_then(scalar_to_string)
    })
}

fn title_and_number(item: &Value) -> (String, Option<u32>) {
    let number = item
        .get("number")
        .and_then(|n| n.as_u64().or_else(|| n.as_str().and_then(|s| s.parse().ok())))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0);
    let title = text_field(item, &["title"])
        .unwrap_or_else(|| number.map(|n| n.to_string()).unwrap_or_default());
    (title, number)
}
