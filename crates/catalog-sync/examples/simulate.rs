//! Drive the engine against a simulated catalog feed.
//!
//! ```text
//! RUST_LOG=catalog_sync=debug cargo run -p catalog-sync --example simulate -- 42 0.3
//! ```
//!
//! Arguments: seed (default 7) and delta failure probability (default 0.2).
//! A run with failed deltas is retried once.

use std::sync::Arc;

use anyhow::Context;
use catalog_sync::source::{SimulatedSource, SimulationConfig};
use catalog_sync::{CatalogUpdate, EngineConfig, ReconciliationEngine, RunReport};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(raw) => raw.parse().context("seed must be an integer")?,
        None => 7,
    };
    let failure_probability = match args.next() {
        Some(raw) => raw.parse().context("failure probability must be a number")?,
        None => 0.2,
    };

    let source = Arc::new(SimulatedSource::new(SimulationConfig {
        seed,
        failure_probability,
        ..SimulationConfig::default()
    }));
    let config = EngineConfig::from_json(r#"{ "fetch_timeout_ms": 1000 }"#)?;
    let engine = ReconciliationEngine::new(source, config);

    let mut updates = engine.subscribe().into_stream();
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.next().await {
            match update {
                CatalogUpdate::Loading => println!("loading..."),
                CatalogUpdate::Snapshot(snapshot) => println!(
                    "{} #{:<2} {:<40} {} records, tax {}",
                    snapshot.run,
                    snapshot.seq,
                    format!("{:?}", snapshot.kind),
                    snapshot.len(),
                    snapshot
                        .tax_rate
                        .map_or_else(|| "unknown".to_string(), |rate| format!("{rate}%")),
                ),
                CatalogUpdate::Failed { run, message } => println!("{run} failed: {message}"),
            }
        }
    });

    let report = engine.start().wait().await?;
    summarize(&report);

    if !report.is_clean() {
        let report = engine.retry().wait().await?;
        summarize(&report);
    }

    if let Some(snapshot) = engine.current().snapshot() {
        for record in snapshot.records.iter() {
            println!(
                "  {:>4} {:<12} price {:>10} stock {:>4}",
                record.id.get(),
                record.name,
                record
                    .price
                    .map_or_else(|| "-".to_string(), |p| p.round_dp(2).to_string()),
                record.stock.map_or_else(|| "-".to_string(), |s| s.to_string()),
            );
        }
    }

    drop(engine);
    printer.await?;
    Ok(())
}

fn summarize(report: &RunReport) {
    println!(
        "{}: {:?}, baseline {}, applied {:?}, failed {}, skipped ids {}",
        report.run,
        report.outcome,
        report.baseline_records,
        report.applied,
        report.failed.len(),
        report.skipped_ids,
    );
    for failure in &report.failed {
        println!("  {} failed: {}", failure.delta, failure.message);
    }
}
