use anyhow::{bail, Result};

use balancers::Aggregator;

use super::output::{format_episodes, format_seasons, format_streams, print_json};

async fn ensure_live(aggregator: &Aggregator, name: &str) -> Result<()> {
    if aggregator.balancer(name).await.is_none() {
        bail!("Balancer {name} is not live. Enable it (and set its token) first.");
    }
    Ok(())
}

pub async fn cmd_streams(aggregator: &Aggregator, name: &str, content_id: &str, json: bool) -> Result<()> {
    ensure_live(aggregator, name).await?;
    let streams = aggregator.streams(name, content_id).await;
    if json {
        return print_json(&streams);
    }
    if streams.is_empty() {
        println!("No streams for {content_id} on {name}");
        return Ok(());
    }
    print!("{}", format_streams(&streams)?);
    Ok(())
}

pub async fn cmd_seasons(aggregator: &Aggregator, name: &str, content_id: &str, json: bool) -> Result<()> {
    ensure_live(aggregator, name).await?;
    let seasons = aggregator.seasons(name, content_id).await;
    if json {
        return print_json(&seasons);
    }
    if seasons.is_empty() {
        println!("No seasons for {content_id} on {name}");
        return Ok(());
    }
    print!("{}", format_seasons(&seasons)?);
    Ok(())
}

pub async fn cmd_episodes(aggregator: &Aggregator, name: &str, season_id: &str, json: bool) -> Result<()> {
    ensure_live(aggregator, name).await?;
    let episodes = aggregator.episodes(name, season_id).await;
    if json {
        return print_json(&episodes);
    }
    if episodes.is_empty() {
        println!("No episodes for {season_id} on {name}");
        return Ok(());
    }
    print!("{}", format_episodes(&episodes)?);
    Ok(())
}

pub async fn cmd_link(aggregator: &Aggregator, name: &str, stream_id: &str, json: bool) -> Result<()> {
    ensure_live(aggregator, name).await?;
    let link = aggregator.direct_link(name, stream_id).await;
    if json {
        return print_json(&serde_json::json!({ "balancer": name, "streamId": stream_id, "url": link }));
    }
    match link {
        Some(url) => println!("{url}"),
        None => println!("No direct link for {stream_id} on {name}"),
    }
    Ok(())
}
