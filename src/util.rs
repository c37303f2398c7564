//! Small helpers shared by balancers and the aggregator.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::balancer::BalancerKind;
use crate::settings::BalancerSettings;

/// Default number of in-flight tasks for [`bounded_parallel`].
pub const DEFAULT_CONCURRENCY: usize = 4;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").unwrap_or_else(|e| panic!("invalid built-in pattern: {e}")));

/// First run of digits in `text`, if it is a positive number.
///
/// `"Сезон 3"` is `Some(3)`, `"Спецвыпуск"` and `"0"` are `None`.
pub fn first_number(text: &str) -> Option<u32> {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

/// Stable de-duplication: keeps the first item for every key, in order.
pub fn uniq_by<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Run `tasks` with at most `limit` of them in flight (`0` means
/// [`DEFAULT_CONCURRENCY`]).
///
/// A task is only started once a slot frees up. Failed tasks are dropped
/// from the output without retry. Output is in completion order.
pub async fn bounded_parallel<F, Fut, T, E>(tasks: Vec<F>, limit: usize) -> Vec<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let limit = if limit == 0 { DEFAULT_CONCURRENCY } else { limit };

    stream::iter(tasks)
        .map(|task| task())
        .buffer_unordered(limit)
        .filter_map(|outcome| async move {
            match outcome {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Parallel task failed: {}", e);
                    None
                }
            }
        })
        .collect()
        .await
}

/// Append query parameters to `base`, skipping `None` values.
///
/// Returns `base` untouched if it does not parse as an absolute URL.
pub fn build_url(base: &str, params: &[(&str, Option<&str>)]) -> String {
    let Ok(mut url) = Url::parse(base) else {
        return base.to_string();
    };
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            if let Some(value) = value {
                pairs.append_pair(key, value);
            }
        }
    }
    // An empty `?` is left behind when every value was `None`.
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.to_string()
}

/// Merge `overlay` into `target`, one level deep.
///
/// Top-level keys of `overlay` replace those of `target`, except when both
/// sides hold an object: then the inner fields are merged key by key (and
/// inner values replace wholesale). A non-object `overlay` is ignored.
pub fn merge_one_level(target: &mut Value, overlay: Value) {
    let Value::Object(overlay) = overlay else {
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Some(target) = target.as_object_mut() else {
        return;
    };
    for (key, incoming) in overlay {
        let replacement = match (target.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(fields)) => {
                existing.extend(fields);
                None
            }
            (_, incoming) => Some(incoming),
        };
        if let Some(value) = replacement {
            target.insert(key, value);
        }
    }
}

/// The configured API URL if non-empty, else the balancer's default, else `""`.
pub fn resolve_api_url(name: &str, cfg: &BalancerSettings) -> String {
    match cfg.api_url.as_deref() {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => BalancerKind::from_name(name)
            .map(|kind| kind.default_api_url().to_string())
            .unwrap_or_default(),
    }
}
