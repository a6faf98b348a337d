//! The reconciliation engine: baseline, concurrent deltas, published snapshots.
//!
//! A run loads the baseline into a fresh [`CatalogStore`], publishes the
//! `Initial` snapshot, then fans out one task per delta kind. Each task
//! fetches, validates, and applies its delta through the store, which
//! publishes exactly one snapshot per application. Runs are cancelled by
//! closing their store before aborting their tasks, so a cancelled run can
//! never publish again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use catalog_sync_core::{
    validate_delta, validate_records, Delta, DeltaKind, Record, RunId, SnapshotKind,
};
use catalog_sync_source::{fetch_delta, DeltaSource, Operation, SourceError};
use catalog_sync_store::{CatalogStore, StoreError};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::publisher::{CatalogUpdate, SnapshotPublisher, SnapshotSubscriber};

/// A delta that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaFailure {
    /// Which delta failed.
    pub delta: DeltaKind,
    /// Why it failed.
    pub message: String,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The baseline loaded and every delta was applied or failed.
    Completed,
    /// The baseline could not be loaded; no deltas were fetched.
    BaselineFailed { message: String },
    /// The run's store was closed before the run finished.
    Cancelled,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The run this report describes.
    pub run: RunId,
    /// Number of records in the baseline.
    pub baseline_records: usize,
    /// Deltas applied, in completion order.
    pub applied: Vec<DeltaKind>,
    /// Deltas that failed, in completion order.
    pub failed: Vec<DeltaFailure>,
    /// Total unknown ids skipped across all applied deltas.
    pub skipped_ids: usize,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(run: RunId) -> Self {
        Self {
            run,
            baseline_records: 0,
            applied: Vec::new(),
            failed: Vec::new(),
            skipped_ids: 0,
            outcome: RunOutcome::Completed,
        }
    }

    /// Check if the run completed with every delta applied.
    pub fn is_clean(&self) -> bool {
        self.outcome == RunOutcome::Completed && self.failed.is_empty()
    }

    /// Check if the given delta was accounted for, applied or failed.
    pub fn resolved(&self, kind: DeltaKind) -> bool {
        self.applied.contains(&kind) || self.failed.iter().any(|f| f.delta == kind)
    }
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    /// The run this handle refers to.
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Check if the run driver has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to finish and return its report.
    ///
    /// Returns `Cancelled` if the run was aborted by a later `start`,
    /// `retry`, or `shutdown` before it finished.
    pub async fn wait(self) -> Result<RunReport> {
        let run = self.run;
        self.task.await.map_err(|err| join_error(run, err))
    }
}

fn join_error(run: RunId, err: JoinError) -> EngineError {
    if err.is_cancelled() {
        return EngineError::Cancelled(run);
    }
    let message = match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(err) => err.to_string(),
    };
    EngineError::RunPanicked { run, message }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The run currently owned by the engine.
struct ActiveRun {
    run: RunId,
    store: Arc<CatalogStore>,
    driver: AbortHandle,
}

impl ActiveRun {
    /// Close the store first so no in-flight task can publish, then abort.
    fn cancel(self) {
        let was_open = self.store.close();
        self.driver.abort();
        if was_open {
            info!(run = %self.run, "run cancelled");
        }
    }
}

struct Runs {
    active: Option<ActiveRun>,
    last: Option<RunId>,
}

/// Concurrent delta-reconciliation engine.
///
/// Owns the publisher that subscribers observe across runs. Each call to
/// [`start`](Self::start) or [`retry`](Self::retry) cancels the previous
/// run and begins a new one against a fresh store.
pub struct ReconciliationEngine {
    source: Arc<dyn DeltaSource>,
    config: EngineConfig,
    publisher: Arc<SnapshotPublisher>,
    runs: Mutex<Runs>,
}

impl ReconciliationEngine {
    /// Create an engine. No run is started until [`start`](Self::start).
    pub fn new(source: Arc<dyn DeltaSource>, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            publisher: Arc::new(SnapshotPublisher::new()),
            runs: Mutex::new(Runs {
                active: None,
                last: None,
            }),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to published updates, starting at the current value.
    pub fn subscribe(&self) -> SnapshotSubscriber {
        self.publisher.subscribe()
    }

    /// The current published value.
    pub fn current(&self) -> CatalogUpdate {
        self.publisher.current()
    }

    /// The most recently started run, if it has not been shut down.
    pub fn active_run(&self) -> Option<RunId> {
        self.runs().active.as_ref().map(|active| active.run)
    }

    /// Start a run, cancelling any run in progress.
    ///
    /// Must be called from within a Tokio runtime. Returns immediately; the
    /// run proceeds in the background.
    pub fn start(&self) -> RunHandle {
        self.restart()
    }

    /// Cancel the current run and start over from a fresh baseline.
    ///
    /// Once this returns, nothing from the cancelled run is published.
    pub fn retry(&self) -> RunHandle {
        info!("retry requested");
        self.restart()
    }

    /// Cancel the current run without starting another.
    ///
    /// Returns the cancelled run, if there was one.
    pub fn shutdown(&self) -> Option<RunId> {
        let active = self.runs().active.take()?;
        let run = active.run;
        active.cancel();
        Some(run)
    }

    fn restart(&self) -> RunHandle {
        let mut runs = self.runs();
        if let Some(previous) = runs.active.take() {
            previous.cancel();
        }

        let run = runs.last.map_or(RunId::FIRST, RunId::next);
        runs.last = Some(run);

        self.publisher.send(CatalogUpdate::Loading);

        let store = Arc::new(CatalogStore::new(run));
        let driver = RunDriver {
            run,
            source: Arc::clone(&self.source),
            store: Arc::clone(&store),
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        };
        let task = tokio::spawn(
            driver
                .drive()
                .instrument(info_span!("reconcile_run", run = %run)),
        );

        runs.active = Some(ActiveRun {
            run,
            store,
            driver: task.abort_handle(),
        });

        RunHandle { run, task }
    }

    fn runs(&self) -> MutexGuard<'_, Runs> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ReconciliationEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything one run needs, moved into its driver task.
struct RunDriver {
    run: RunId,
    source: Arc<dyn DeltaSource>,
    store: Arc<CatalogStore>,
    publisher: Arc<SnapshotPublisher>,
    config: EngineConfig,
}

impl RunDriver {
    async fn drive(self) -> RunReport {
        let mut report = RunReport::new(self.run);
        info!("run started");

        let records = match self.fetch_baseline().await {
            Ok(records) => records,
            Err(err) => {
                let message = err.to_string();
                error!(error = %err, "baseline failed");
                let failed = CatalogUpdate::Failed {
                    run: self.run,
                    message: message.clone(),
                };
                report.outcome = match self.store.while_open(|| self.publisher.send(failed)) {
                    Ok(()) => RunOutcome::BaselineFailed { message },
                    Err(_) => RunOutcome::Cancelled,
                };
                return report;
            }
        };

        let initial = self.store.apply(
            SnapshotKind::Initial,
            move |state| state.load_baseline(records),
            &*self.publisher,
        );
        match initial {
            Ok(applied) => report.baseline_records = applied.snapshot.len(),
            Err(err) => {
                debug!(error = %err, "baseline not applied");
                report.outcome = RunOutcome::Cancelled;
                return report;
            }
        }
        info!(records = report.baseline_records, "baseline loaded");

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
        let mut tasks = JoinSet::new();
        for kind in DeltaKind::ALL {
            let task = DeltaTask {
                kind,
                source: Arc::clone(&self.source),
                store: Arc::clone(&self.store),
                publisher: Arc::clone(&self.publisher),
                permits: Arc::clone(&permits),
                timeout: self.config.fetch_timeout,
                validate: self.config.validate_payloads,
                publish_failures: self.config.publish_delta_failures,
            };
            tasks.spawn(task.run().in_current_span());
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(DeltaOutcome::Applied { kind, skipped }) => {
                    report.applied.push(kind);
                    report.skipped_ids += skipped;
                }
                Ok(DeltaOutcome::Failed(failure)) => report.failed.push(failure),
                Ok(DeltaOutcome::Cancelled) => report.outcome = RunOutcome::Cancelled,
                Err(err) => warn!(error = %err, "delta task did not finish"),
            }
        }

        // A task that panicked never reported its kind.
        for kind in DeltaKind::ALL {
            if !report.resolved(kind) {
                report.failed.push(DeltaFailure {
                    delta: kind,
                    message: "delta task panicked".to_string(),
                });
            }
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            skipped_ids = report.skipped_ids,
            outcome = ?report.outcome,
            "run finished"
        );
        report
    }

    async fn fetch_baseline(&self) -> Result<Vec<Record>> {
        let records = self.source.fetch_baseline().await?;
        if self.config.validate_payloads {
            validate_records(&records).map_err(|source| SourceError::InvalidPayload {
                operation: Operation::Baseline,
                source,
            })?;
        }
        Ok(records)
    }
}

enum DeltaOutcome {
    Applied { kind: DeltaKind, skipped: usize },
    Failed(DeltaFailure),
    Cancelled,
}

struct DeltaTask {
    kind: DeltaKind,
    source: Arc<dyn DeltaSource>,
    store: Arc<CatalogStore>,
    publisher: Arc<SnapshotPublisher>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
    validate: bool,
    publish_failures: bool,
}

impl DeltaTask {
    async fn run(self) -> DeltaOutcome {
        let kind = self.kind;
        let delta = match self.fetch().await {
            Ok(delta) => delta,
            Err(err) => return self.fail(err),
        };

        let applied = self.store.try_apply(
            SnapshotKind::applied(kind),
            move |state| state.apply_delta(delta),
            &*self.publisher,
        );
        match applied {
            Ok(applied) => {
                debug!(
                    delta = %kind,
                    seq = applied.snapshot.seq,
                    changed = applied.output.changed.len(),
                    skipped = applied.output.skipped.len(),
                    "delta applied"
                );
                DeltaOutcome::Applied {
                    kind,
                    skipped: applied.output.skipped.len(),
                }
            }
            Err(err @ StoreError::Closed(_)) => {
                debug!(delta = %kind, error = %err, "delta discarded");
                DeltaOutcome::Cancelled
            }
            Err(err) => self.fail(err.into()),
        }
    }

    async fn fetch(&self) -> Result<Delta> {
        let operation = Operation::from(self.kind);
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::unavailable(operation, "fetch pool closed"))?;

        let delta = match self.timeout {
            Some(after) => {
                match tokio::time::timeout(after, fetch_delta(&*self.source, self.kind)).await {
                    Ok(fetched) => fetched?,
                    Err(_) => return Err(SourceError::Timeout { operation, after }.into()),
                }
            }
            None => fetch_delta(&*self.source, self.kind).await?,
        };

        if self.validate {
            validate_delta(&delta)
                .map_err(|source| SourceError::InvalidPayload { operation, source })?;
        }
        Ok(delta)
    }

    /// Record a failed fetch or merge, publishing it unless the run is gone.
    fn fail(&self, err: EngineError) -> DeltaOutcome {
        let kind = self.kind;
        let message = err.to_string();
        warn!(delta = %kind, error = %err, "delta failed");

        if self.publish_failures {
            let published = self.store.apply(
                SnapshotKind::DeltaFailed {
                    delta: kind,
                    message: message.clone(),
                },
                |_| (),
                &*self.publisher,
            );
            if published.is_err() {
                return DeltaOutcome::Cancelled;
            }
        }

        DeltaOutcome::Failed(DeltaFailure {
            delta: kind,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use catalog_sync_core::{Decimal, ProductId};
    use catalog_sync_source::MemorySource;

    fn engine(source: MemorySource) -> (ReconciliationEngine, Arc<MemorySource>) {
        let source = Arc::new(source);
        let engine = ReconciliationEngine::new(source.clone(), EngineConfig::default());
        (engine, source)
    }

    fn baseline() -> Vec<Record> {
        vec![
            Record::new(1, "a").price(Decimal::from(100)).stock(3),
            Record::new(2, "b").price(Decimal::from(50)),
        ]
    }

    #[tokio::test]
    async fn test_clean_run_reports_every_delta() {
        let (engine, _) = engine(
            MemorySource::new()
                .baseline(baseline())
                .tax_rate(Decimal::TEN),
        );

        let report = engine.start().wait().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.baseline_records, 2);
        assert_eq!(report.applied.len(), 5);

        let current = engine.current();
        let snapshot = current.snapshot().unwrap();
        assert_eq!(snapshot.seq, 6);
        assert_eq!(
            snapshot.get(ProductId(1)).unwrap().price,
            Some(Decimal::from(110))
        );
    }

    #[tokio::test]
    async fn test_missing_tax_is_a_delta_failure() {
        let (engine, _) = engine(MemorySource::new().baseline(baseline()));

        let report = engine.start().wait().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].delta, DeltaKind::TaxRate);
        assert_eq!(report.applied.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_baseline_fails_run() {
        let (engine, source) = engine(
            MemorySource::new()
                .baseline(vec![Record::new(1, "a").price(Decimal::from(-1))])
                .tax_rate(Decimal::TEN),
        );

        let report = engine.start().wait().await.unwrap();
        assert!(matches!(report.outcome, RunOutcome::BaselineFailed { .. }));
        assert!(engine.current().is_failed());
        assert_eq!(source.delta_calls(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_run() {
        let (engine, source) = engine(
            MemorySource::new()
                .baseline(baseline())
                .gated(Operation::Baseline),
        );

        let handle = engine.start();
        assert_eq!(engine.shutdown(), Some(handle.run()));
        assert_eq!(engine.active_run(), None);

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled(run) if run == RunId::FIRST));

        source.release(Operation::Baseline);
        assert!(engine.current().is_loading());
    }

    #[tokio::test]
    async fn test_overflowing_tax_is_a_delta_failure() {
        let huge: Decimal = "1000000000000000000000000".parse().unwrap();
        let (engine, _) = engine(
            MemorySource::new()
                .baseline(vec![Record::new(1, "a").price(Decimal::from(1_000_000_000))])
                .tax_rate(huge),
        );

        let report = engine.start().wait().await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.applied.len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].delta, DeltaKind::TaxRate);
        assert!(report.failed[0].message.contains("overflows"));

        let current = engine.current();
        let snapshot = current.snapshot().unwrap();
        assert_eq!(snapshot.seq, 6);
        assert_eq!(snapshot.tax_rate, None);
        assert_eq!(
            snapshot.get(ProductId(1)).unwrap().price,
            Some(Decimal::from(1_000_000_000))
        );
    }

    #[tokio::test]
    async fn test_run_ids_increase() {
        let (engine, _) = engine(MemorySource::new().tax_rate(Decimal::ONE));
        let first = engine.start();
        let second = engine.retry();
        assert_eq!(first.run(), RunId(1));
        assert_eq!(second.run(), RunId(2));
        second.wait().await.unwrap();
    }
}
