use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use balancers::settings::Settings;
use balancers::{Balancer, BalancerKind, EpisodeRef, RawResult, SeasonRef, StreamResult, VerifyEntry};

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn format_results(results: &[RawResult]) -> Result<String> {
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        writeln!(out, "{:>3}. {} [{}]", i + 1, r.title, r.balancer)?;
        writeln!(
            out,
            "     id: {} | voice: {} | quality: {}",
            r.content_id,
            or_dash(r.voice.as_deref()),
            or_dash(r.quality.as_deref())
        )?;
        if let Some(url) = r.url.as_deref() {
            writeln!(out, "     {url}")?;
        }
    }
    Ok(out)
}

pub fn format_streams(streams: &[StreamResult]) -> Result<String> {
    let mut out = String::new();
    for s in streams {
        writeln!(
            out,
            "{} | {} | {}",
            or_dash(s.quality.as_deref()),
            or_dash(s.voice.as_deref()),
            s.stream_id
        )?;
        if let Some(url) = s.url.as_deref() {
            writeln!(out, "   {url}")?;
        }
    }
    Ok(out)
}

pub fn format_seasons(seasons: &[SeasonRef]) -> Result<String> {
    let mut out = String::new();
    for s in seasons {
        let number = s.number.map_or_else(|| "?".to_string(), |n| n.to_string());
        writeln!(out, "{number:>3}. {} ({})", s.title, s.season_id)?;
    }
    Ok(out)
}

pub fn format_episodes(episodes: &[EpisodeRef]) -> Result<String> {
    let mut out = String::new();
    for e in episodes {
        let number = e.number.map_or_else(|| "?".to_string(), |n| n.to_string());
        writeln!(out, "{number:>3}. {} ({})", e.title, e.episode_id)?;
        if let Some(url) = e.url.as_deref() {
            writeln!(out, "     {url}")?;
        }
    }
    Ok(out)
}

/// `name: OK | count=N | auth=yes | available=yes`, then the URL.
pub fn format_verify_entry(entry: &VerifyEntry) -> Result<String> {
    let mut out = format!(
        "{}: {} | count={} | auth={} | available={} | {}ms",
        entry.name,
        if entry.ok { "OK" } else { "ERR" },
        entry.count,
        yes_no(entry.requires_auth),
        yes_no(entry.available),
        entry.elapsed_ms
    );
    if let Some(error) = entry.error.as_deref() {
        write!(out, "\n   error: {error}")?;
    }
    if !entry.api_url.is_empty() {
        write!(out, "\n   {}", entry.api_url)?;
    }
    Ok(out)
}

pub fn format_live(balancers: &[std::sync::Arc<dyn Balancer>]) -> Result<String> {
    let mut out = String::new();
    for b in balancers {
        let config = b.config();
        writeln!(
            out,
            "{:<10} priority={:<3} auth={:<3} {}",
            b.name(),
            b.priority(),
            yes_no(config.requires_auth),
            or_dash(Some(config.api_url.as_str()))
        )?;
    }
    Ok(out)
}

/// One row per known balancer, the way a settings panel lists them.
pub fn format_settings(settings: &Settings) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Enabled: {}", settings.enabled_balancers.join(", "))?;
    writeln!(out, "Quality: {}", or_dash(Some(&settings.auto_select_quality)))?;
    writeln!(out, "Voice:   {}\n", or_dash(Some(&settings.preferred_voice)))?;

    for kind in BalancerKind::ALL {
        let name = kind.name();
        let record = settings.balancers.get(name);
        let enabled = record.is_some_and(|r| r.enabled)
            || settings.enabled_balancers.iter().any(|n| n == name);
        let priority = record.map_or(1, |r| r.priority);
        let token = record
            .and_then(|r| r.token.as_deref())
            .is_some_and(|t| !t.is_empty());
        let api_url = record.and_then(|r| r.api_url.as_deref());

        writeln!(
            out,
            "[{}] {:<10} priority={:<3} token={:<3} {}",
            if enabled { "x" } else { " " },
            name,
            priority,
            yes_no(token),
            or_dash(api_url)
        )?;
    }
    Ok(out)
}

/// Settings values are JSON when they parse as JSON, plain strings otherwise.
pub fn parse_setting_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
