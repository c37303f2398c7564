use anyhow::Result;

use balancers::Aggregator;

use super::output::{format_verify_entry, print_json};

pub async fn cmd_verify(aggregator: &Aggregator, json: bool) -> Result<()> {
    let report = aggregator.verify().await;
    if json {
        return print_json(&report);
    }

    if report.entries.is_empty() {
        println!("⚠️  No live balancers to check");
        return Ok(());
    }

    println!("🩺 Checked at {}\n", report.checked_at.format("%Y-%m-%d %H:%M:%S UTC"));
    for entry in &report.entries {
        println!("{}", format_verify_entry(entry)?);
    }
    println!("\n{}/{} OK", report.ok_count(), report.entries.len());
    Ok(())
}
