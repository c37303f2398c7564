use anyhow::Result;
use serde_json::json;

use balancers::Aggregator;

use super::output::{format_live, print_json};

pub async fn cmd_list(aggregator: &Aggregator, json: bool) -> Result<()> {
    let live = aggregator.get_balancers().await;
    if json {
        let configs: Vec<_> = live.iter().map(|b| b.config().clone()).collect();
        return print_json(&json!({ "balancers": configs }));
    }

    if live.is_empty() {
        println!("⚠️  No live balancers (enabled and, where needed, with a token)");
        return Ok(());
    }
    print!("{}", format_live(&live)?);
    Ok(())
}
