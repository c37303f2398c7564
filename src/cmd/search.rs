use anyhow::{Context, Result};
use serde_json::json;

use balancers::{Aggregator, FilterConfig, SearchQuery};

use super::output::{format_results, print_json};

pub struct SearchArgs<'a> {
    pub title: &'a str,
    pub tmdb: Option<&'a str>,
    pub kp: Option<&'a str>,
    pub imdb: Option<&'a str>,
    /// Skip filtering entirely.
    pub all: bool,
    /// Filter overrides as a JSON object.
    pub filter: Option<&'a str>,
}

pub async fn cmd_search(aggregator: &Aggregator, args: &SearchArgs<'_>, json: bool) -> Result<()> {
    let mut query = SearchQuery::new(args.title);
    query.tmdb_id = args.tmdb.map(str::to_string);
    query.kp_id = args.kp.map(str::to_string);
    query.imdb_id = args.imdb.map(str::to_string);

    let filter = if args.all {
        FilterConfig::permissive()
    } else if let Some(raw) = args.filter {
        let overrides = serde_json::from_str(raw).context("--filter must be a JSON object")?;
        FilterConfig::with_overrides(overrides).context("invalid filter overrides")?
    } else {
        aggregator.options().filter.clone()
    };

    let live = aggregator.get_balancers().await.len();
    if live == 0 && !json {
        println!("⚠️  No live balancers. Check `balancers settings show`.");
    }

    let results = aggregator.search_with(&query, &filter).await;
    if json {
        return print_json(&json!({ "query": query, "results": results }));
    }

    println!("🔍 {} result(s) for \"{}\" from {live} balancer(s)\n", results.len(), args.title);
    print!("{}", format_results(&results)?);
    Ok(())
}
