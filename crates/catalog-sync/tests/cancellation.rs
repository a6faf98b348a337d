//! Retry, shutdown, and stale-run isolation.

use std::sync::Arc;
use std::time::Duration;

use catalog_sync::source::{MemorySource, Operation};
use catalog_sync::{
    CatalogUpdate, Decimal, EngineConfig, EngineError, ProductId, ReconciliationEngine, RunId,
    RunOutcome,
};
use catalog_sync_testkit::catalog;

fn price_of(update: &CatalogUpdate, id: i64) -> Option<Decimal> {
    update
        .snapshot()
        .and_then(|s| s.get(ProductId(id)))
        .and_then(|r| r.price)
}

#[tokio::test]
async fn test_retry_discards_stale_run() {
    let source = Arc::new(
        MemorySource::new()
            .baseline(catalog(&[(1, 100)]))
            .tax_rate(Decimal::TEN)
            .deletions(vec![ProductId(1)])
            .gated(Operation::Deletions),
    );
    let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default());
    let mut updates = engine.subscribe();

    let first = engine.start();
    updates
        .wait_for(|u| u.snapshot().is_some_and(|s| s.seq == 5))
        .await
        .unwrap();

    let second = engine.retry();
    assert!(engine.current().is_loading());
    assert_eq!(second.run(), RunId(2));

    // Enough for a stale waiter and the new run.
    source.release(Operation::Deletions);
    source.release(Operation::Deletions);

    let report = second.wait().await.unwrap();
    assert!(report.is_clean());

    let current = engine.current();
    let snapshot = current.snapshot().unwrap();
    assert_eq!(snapshot.run, RunId(2));
    assert_eq!(snapshot.seq, 6);
    assert!(snapshot.is_empty());

    let err = first.wait().await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled(run) if run == RunId::FIRST));

    // Nothing from the first run shows up afterwards.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(engine.current().snapshot().unwrap().run, RunId(2));
}

#[tokio::test]
async fn test_retry_after_baseline_failure() {
    let source = Arc::new(
        MemorySource::new()
            .baseline(catalog(&[(1, 100)]))
            .tax_rate(Decimal::TEN)
            .fail_first(Operation::Baseline, 1, "warming up"),
    );
    let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default());

    let report = engine.start().wait().await.unwrap();
    assert!(matches!(report.outcome, RunOutcome::BaselineFailed { .. }));
    assert!(engine.current().is_failed());
    assert_eq!(source.delta_calls(), 0);

    let report = engine.retry().wait().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.run, RunId(2));
    assert_eq!(price_of(&engine.current(), 1), Some(Decimal::from(110)));
}

#[tokio::test]
async fn test_restart_begins_from_fresh_baseline() {
    let source = Arc::new(
        MemorySource::new()
            .baseline(catalog(&[(1, 100)]))
            .tax_rate(Decimal::TEN),
    );
    let engine = ReconciliationEngine::new(source, EngineConfig::default());

    engine.start().wait().await.unwrap();
    assert_eq!(price_of(&engine.current(), 1), Some(Decimal::from(110)));

    engine.retry().wait().await.unwrap();
    // Not compounded across runs.
    assert_eq!(price_of(&engine.current(), 1), Some(Decimal::from(110)));
}

#[tokio::test]
async fn test_shutdown_stops_publishing() {
    let source = Arc::new(
        MemorySource::new()
            .baseline(catalog(&[(1, 100)]))
            .tax_rate(Decimal::TEN)
            .gated(Operation::TaxRate),
    );
    let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default());
    let mut updates = engine.subscribe();

    let handle = engine.start();
    updates
        .wait_for(|u| u.snapshot().is_some_and(|s| s.seq == 5))
        .await
        .unwrap();

    assert_eq!(engine.shutdown(), Some(RunId::FIRST));
    assert_eq!(engine.shutdown(), None);
    source.release(Operation::TaxRate);

    assert!(matches!(
        handle.wait().await,
        Err(EngineError::Cancelled(_))
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let current = engine.current();
    let snapshot = current.snapshot().unwrap();
    assert_eq!(snapshot.seq, 5);
    assert_eq!(snapshot.tax_rate, None);
}

#[tokio::test]
async fn test_dropping_engine_cancels_run() {
    let source = Arc::new(
        MemorySource::new()
            .baseline(catalog(&[(1, 100)]))
            .gated(Operation::Baseline),
    );
    let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default());
    let updates = engine.subscribe();
    let handle = engine.start();

    drop(engine);
    source.release(Operation::Baseline);

    assert!(matches!(
        handle.wait().await,
        Err(EngineError::Cancelled(_))
    ));
    assert!(updates.current().is_loading());
}

#[tokio::test]
async fn test_subscriber_stream_ends_with_engine() {
    use tokio_stream::StreamExt;

    let source = Arc::new(MemorySource::new().tax_rate(Decimal::ONE));
    let engine = ReconciliationEngine::new(source, EngineConfig::default());
    let stream = engine.subscribe().into_stream();

    engine.start().wait().await.unwrap();
    drop(engine);

    let seen: Vec<CatalogUpdate> = stream.collect().await;
    assert!(!seen.is_empty());
    assert!(seen.last().unwrap().snapshot().is_some());
}
