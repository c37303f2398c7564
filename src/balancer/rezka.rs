//! Rezka balancer: HTML pages instead of an API.
//!
//! Every call fetches a page and pulls links out of it. A response that is
//! not markup (the site occasionally answers with JSON) counts as "nothing
//! found".

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::Balancer;
use crate::error::Result;
use crate::http::{HttpRequest, Transport};
use crate::model::{EpisodeRef, ProviderConfig, RawResult, SearchQuery, SeasonRef, StreamResult};
use crate::util::{build_url, first_number, uniq_by};

static LINKS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static NODES: Lazy<Selector> = Lazy::new(|| selector("a, li, div"));
static VIDEO_SOURCE: Lazy<Selector> = Lazy::new(|| selector("video source[src]"));
static MEDIA_LINKS: Lazy<Selector> =
    Lazy::new(|| selector(r#"a[href*=".mp4"], a[href*=".m3u8"]"#));

static SEASON: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)сезон"));
static EPISODE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)серия"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid built-in pattern {re:?}: {e}"))
}

pub struct RezkaBalancer {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
}

impl RezkaBalancer {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Absolute URL for a page id: absolute ids pass through, relative ones
    /// are resolved against the base URL.
    fn page_url(&self, id: &str) -> String {
        if id.starts_with("http") {
            return id.to_string();
        }
        Url::parse(&self.config.api_url)
            .and_then(|base| base.join(id))
            .map_or_else(|_| format!("{}{id}", self.config.api_url), String::from)
    }

    /// Page markup, or `None` when the response was not markup.
    ///
    /// Parsing happens after the last await: the parsed `Html` is not `Send`.
    async fn fetch_page(&self, url: String) -> Result<Option<String>> {
        tracing::debug!("rezka: GET {}", url);
        let payload = self.transport.request(HttpRequest::get(url)).await?;
        Ok(payload.into_text())
    }
}

#[async_trait]
impl Balancer for RezkaBalancer {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        if self.config.api_url.is_empty() {
            return Ok(Vec::new());
        }
        let base = format!("{}/search", self.config.api_url.trim_end_matches('/'));
        let url = build_url(&base, &[("q", Some(query.title.as_str()))]);
        let Some(markup) = self.fetch_page(url).await? else {
            return Ok(Vec::new());
        };
        Ok(search_results(&Html::parse_document(&markup), &self.config.name))
    }

    async fn get_streams(&self, content_id: &str) -> Result<Vec<StreamResult>> {
        if self.config.api_url.is_empty() {
            return Ok(Vec::new());
        }
        let Some(markup) = self.fetch_page(self.page_url(content_id)).await? else {
            return Ok(Vec::new());
        };
        Ok(stream_links(&Html::parse_document(&markup), &self.config.name))
    }

    async fn get_seasons(&self, content_id: &str) -> Result<Vec<SeasonRef>> {
        if self.config.api_url.is_empty() {
            return Ok(Vec::new());
        }
        let Some(markup) = self.fetch_page(self.page_url(content_id)).await? else {
            return Ok(Vec::new());
        };
        let seasons = labelled_nodes(&Html::parse_document(&markup), &SEASON)
            .into_iter()
            .map(|(id, title, number)| SeasonRef {
                season_id: id,
                title,
                number,
            })
            .collect();
        Ok(uniq_by(seasons, |s: &SeasonRef| s.season_id.clone()))
    }

    async fn get_episodes(&self, season_id: &str) -> Result<Vec<EpisodeRef>> {
        if self.config.api_url.is_empty() {
            return Ok(Vec::new());
        }
        let Some(markup) = self.fetch_page(self.page_url(season_id)).await? else {
            return Ok(Vec::new());
        };
        let episodes = labelled_nodes(&Html::parse_document(&markup), &EPISODE)
            .into_iter()
            .map(|(id, title, number)| EpisodeRef {
                episode_id: id,
                title,
                number,
                url: None,
            })
            .collect();
        Ok(uniq_by(episodes, |e: &EpisodeRef| e.episode_id.clone()))
    }

    async fn get_direct_link(&self, stream_id: &str) -> Result<Option<String>> {
        let Some(markup) = self.fetch_page(self.page_url(stream_id)).await? else {
            return Ok(None);
        };
        Ok(direct_link(&Html::parse_document(&markup)))
    }
}

fn search_results(doc: &Html, balancer: &str) -> Vec<RawResult> {
    doc.select(&LINKS)
        .filter_map(|a| {
            let href = a.value().attr("href").unwrap_or_default();
            let title = a.text().collect::<String>();
            let title = title.trim();
            if href.is_empty() || title.is_empty() {
                return None;
            }
            Some(RawResult {
                balancer: balancer.to_string(),
                content_id: href.to_string(),
                title: title.to_string(),
                voice: None,
                quality: None,
                url: Some(href.to_string()),
                kind: None,
            })
        })
        .collect()
}

fn stream_links(doc: &Html, balancer: &str) -> Vec<StreamResult> {
    doc.select(&LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(|href| StreamResult {
            balancer: balancer.to_string(),
            stream_id: href.to_string(),
            voice: None,
            quality: None,
            url: Some(href.to_string()),
        })
        .collect()
}

/// `(id, text, number)` for the innermost `a`/`li`/`div` nodes whose text
/// matches `label`. The id is the node's `href`, or its text without one.
fn labelled_nodes(doc: &Html, label: &Regex) -> Vec<(String, String, Option<u32>)> {
    let matches = |node: &ElementRef| label.is_match(&node.text().collect::<String>());

    doc.select(&NODES)
        .filter(|node| matches(node))
        .filter(|node| {
            // Skip containers: only the innermost labelled node counts
            !node
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .any(|child| NODES.matches(&child) && matches(&child))
        })
        .map(|node| {
            let text = node.text().collect::<String>().trim().to_string();
            let id = node
                .value()
                .attr("href")
                .filter(|href| !href.is_empty())
                .map_or_else(|| text.clone(), str::to_string);
            let number = first_number(&text);
            (id, text, number)
        })
        .collect()
}

fn direct_link(doc: &Html) -> Option<String> {
    let from_source = doc
        .select(&VIDEO_SOURCE)
        .find_map(|source| source.value().attr("src").filter(|src| !src.is_empty()));
    let from_link = || {
        doc.select(&MEDIA_LINKS)
            .find_map(|a| a.value().attr("href").filter(|href| !href.is_empty()))
    };
    from_source.or_else(from_link).map(str::to_string)
}
