//! Result filtering by balancer, voice and quality.
//!
//! Rules, applied per result (order is preserved):
//!
//! - blacklisted balancer: rejected
//! - non-empty `active` list that lacks the balancer: rejected
//! - voice in `exclude`: rejected
//! - non-empty `preferred` list that lacks the voice: rejected
//! - known quality outside `[min, max]`: rejected
//!
//! A result without a voice is never rejected on voice, and an unknown
//! quality (tier `0`) is never rejected on quality. Bounds are normalized
//! like results: an unknown `min` is `0`, and an unknown `max` is `0` too,
//! which rejects every known quality.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::RawResult;
use crate::quality::normalize_quality;
use crate::util::merge_one_level;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerFilter {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceFilter {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFilter {
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
    /// Hint for players picking a stream, not used for rejection.
    #[serde(default)]
    pub preferred: String,
}

/// Default position for series playback. Carried along, not used for
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesFilter {
    pub season: u32,
    pub episode: u32,
    pub show_all_seasons: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub balancers: BalancerFilter,
    pub voices: VoiceFilter,
    pub quality: QualityFilter,
    pub series: SeriesFilter,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            balancers: BalancerFilter {
                active: strings(&["svetacdn", "allohacdn"]),
                blacklist: strings(&["rezka"]),
            },
            voices: VoiceFilter {
                preferred: strings(&["Дубляж", "Профессиональный"]),
                exclude: strings(&["Любительский"]),
            },
            quality: QualityFilter {
                min: "720p".into(),
                max: "4K".into(),
                preferred: "1080p".into(),
            },
            series: SeriesFilter {
                season: 1,
                episode: 1,
                show_all_seasons: true,
            },
        }
    }
}

impl FilterConfig {
    /// A filter that rejects nothing.
    pub fn permissive() -> Self {
        Self {
            balancers: BalancerFilter {
                active: Vec::new(),
                blacklist: Vec::new(),
            },
            voices: VoiceFilter {
                preferred: Vec::new(),
                exclude: Vec::new(),
            },
            quality: QualityFilter {
                min: String::new(),
                max: "4K".into(),
                preferred: String::new(),
            },
            ..Self::default()
        }
    }

    /// Defaults with `overrides` merged one level deep.
    ///
    /// `{"balancers": {"active": []}}` clears the active list but keeps the
    /// default blacklist.
    pub fn with_overrides(overrides: Value) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge_one_level(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    /// `true` if `result` passes every rule.
    pub fn accepts(&self, result: &RawResult) -> bool {
        let balancers = &self.balancers;
        if balancers.blacklist.contains(&result.balancer) {
            return false;
        }
        if !balancers.active.is_empty() && !balancers.active.contains(&result.balancer) {
            return false;
        }

        if let Some(voice) = result.voice.as_ref() {
            if self.voices.exclude.contains(voice) {
                return false;
            }
            if !self.voices.preferred.is_empty() && !self.voices.preferred.contains(voice) {
                return false;
            }
        }

        let tier = normalize_quality(result.quality.as_deref().unwrap_or("unknown"));
        if tier == 0 {
            return true;
        }
        let min = normalize_quality(&self.quality.min);
        let max = normalize_quality(&self.quality.max);
        tier >= min && tier <= max
    }
}

/// Results that pass `cfg`, in their original order.
pub fn apply(results: Vec<RawResult>, cfg: &FilterConfig) -> Vec<RawResult> {
    let before = results.len();
    let kept: Vec<RawResult> = results.into_iter().filter(|r| cfg.accepts(r)).collect();
    tracing::debug!("Filter kept {} of {} results", kept.len(), before);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(balancer: &str, voice: Option<&str>, quality: Option<&str>) -> RawResult {
        RawResult {
            balancer: balancer.into(),
            content_id: format!("{balancer}-1"),
            title: "Dune".into(),
            voice: voice.map(Into::into),
            quality: quality.map(Into::into),
            url: None,
            kind: None,
        }
    }

    fn open_balancers() -> FilterConfig {
        FilterConfig::with_overrides(json!({ "balancers": { "active": [] } })).unwrap()
    }

    #[test]
    fn blacklist_removes_balancer() {
        let cfg = open_balancers();
        let out = apply(
            vec![hit("rezka", None, None), hit("kodik", None, None)],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].balancer, "kodik");
    }

    #[test]
    fn active_list_restricts_balancers() {
        let out = apply(
            vec![hit("svetacdn", None, None), hit("kodik", None, None)],
            &FilterConfig::default(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].balancer, "svetacdn");
    }

    #[test]
    fn quality_range_keeps_unknown() {
        let mut cfg = FilterConfig::permissive();
        cfg.quality.min = "720p".into();
        cfg.quality.max = "1080p".into();

        let out = apply(
            vec![
                hit("a", None, Some("4K")),
                hit("a", None, Some("1080p")),
                hit("a", None, None),
                hit("a", None, Some("CAMRip")),
                hit("a", None, Some("480p")),
            ],
            &cfg,
        );
        let qualities: Vec<_> = out.iter().map(|r| r.quality.as_deref()).collect();
        assert_eq!(qualities, vec![Some("1080p"), None, Some("CAMRip")]);
    }

    #[test]
    fn unknown_min_is_open() {
        let mut cfg = FilterConfig::permissive();
        cfg.quality.min = "any".into();
        cfg.quality.max = "1080p".into();

        let out = apply(
            vec![hit("a", None, Some("480p")), hit("a", None, Some("2160p"))],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quality.as_deref(), Some("480p"));
    }

    #[test]
    fn unknown_max_rejects_known_qualities() {
        let mut cfg = FilterConfig::permissive();
        cfg.quality.min = "720p".into();
        cfg.quality.max = String::new();

        let out = apply(
            vec![
                hit("a", None, Some("4K")),
                hit("a", None, Some("1080p")),
                hit("a", None, None),
            ],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quality, None);
    }

    #[test]
    fn permissive_keeps_every_quality() {
        let out = apply(
            vec![
                hit("a", None, Some("4K")),
                hit("a", None, Some("480p")),
                hit("a", None, Some("CAMRip")),
            ],
            &FilterConfig::permissive(),
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn voice_rules() {
        let cfg = open_balancers();
        let out = apply(
            vec![
                hit("svetacdn", Some("Дубляж"), None),
                hit("svetacdn", Some("Любительский"), None),
                hit("svetacdn", Some("LostFilm"), None),
                hit("svetacdn", None, None),
            ],
            &cfg,
        );
        let voices: Vec<_> = out.iter().map(|r| r.voice.as_deref()).collect();
        assert_eq!(voices, vec![Some("Дубляж"), None]);
    }

    #[test]
    fn empty_preferred_accepts_any_voice() {
        let mut cfg = FilterConfig::permissive();
        cfg.voices.exclude = vec!["Любительский".into()];
        let out = apply(
            vec![hit("a", Some("LostFilm"), None), hit("a", Some("Любительский"), None)],
            &cfg,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].voice.as_deref(), Some("LostFilm"));
    }

    #[test]
    fn overrides_merge_one_level() {
        let cfg = FilterConfig::with_overrides(json!({
            "balancers": { "active": ["kodik"] },
            "series": { "season": 2, "episode": 5, "showAllSeasons": false }
        }))
        .unwrap();
        assert_eq!(cfg.balancers.active, vec!["kodik"]);
        assert_eq!(cfg.balancers.blacklist, vec!["rezka"]);
        assert_eq!(cfg.voices, FilterConfig::default().voices);
        assert_eq!(cfg.series.season, 2);
        assert!(!cfg.series.show_all_seasons);
    }

    #[test]
    fn malformed_overrides_fail() {
        assert!(FilterConfig::with_overrides(json!({ "series": { "season": "first" } })).is_err());
    }

    #[test]
    fn order_is_preserved() {
        let cfg = FilterConfig::permissive();
        let input = vec![hit("c", None, None), hit("a", None, None), hit("b", None, None)];
        assert_eq!(apply(input.clone(), &cfg), input);
    }
}
