//! A scripted in-memory source.
//!
//! Every operation returns a fixed payload or a fixed failure, optionally
//! after a delay or after being released through a gate. Gates let tests
//! decide the exact completion order of concurrent fetches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use catalog_sync_core::{Decimal, PriceUpdate, ProductId, Record, StockUpdate};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::error::{Result, SourceError};
use crate::source::{DeltaSource, Operation};

/// Scripted response of one operation.
#[derive(Debug, Clone)]
enum Step<T> {
    Respond(T),
    Fail(String),
    Missing,
}

/// In-memory [`DeltaSource`] with scripted responses.
///
/// Unscripted list operations return an empty list. An unscripted tax rate
/// fails with [`SourceError::NotScripted`], since no rate is neutral without
/// also marking the rate as known.
pub struct MemorySource {
    baseline: Step<Vec<Record>>,
    tax_rate: Step<Decimal>,
    price_updates: Step<Vec<PriceUpdate>>,
    stock_updates: Step<Vec<StockUpdate>>,
    deletions: Step<Vec<ProductId>>,
    new_records: Step<Vec<Record>>,

    /// Latency per operation.
    delays: [Duration; 6],
    /// Operations that wait for an explicit `release`.
    gates: [Option<Semaphore>; 6],
    /// Remaining transient failures per operation, with their message.
    transient: [AtomicUsize; 6],
    transient_messages: [String; 6],
    /// Number of calls per operation.
    calls: [AtomicUsize; 6],
}

impl MemorySource {
    /// Create a source with an empty baseline, empty delta lists, and no
    /// tax rate.
    pub fn new() -> Self {
        Self {
            baseline: Step::Respond(Vec::new()),
            tax_rate: Step::Missing,
            price_updates: Step::Respond(Vec::new()),
            stock_updates: Step::Respond(Vec::new()),
            deletions: Step::Respond(Vec::new()),
            new_records: Step::Respond(Vec::new()),
            delays: [Duration::ZERO; 6],
            gates: std::array::from_fn(|_| None),
            transient: std::array::from_fn(|_| AtomicUsize::new(0)),
            transient_messages: std::array::from_fn(|_| String::new()),
            calls: std::array::from_fn(|_| AtomicUsize::new(0)),
        }
    }

    /// Build a source from a JSON script.
    ///
    /// ```json
    /// {
    ///   "baseline": { "ok": [{ "id": 1, "name": "lamp", "price": "100" }] },
    ///   "tax_rate": { "ok": "10", "delay_ms": 20 },
    ///   "deletions": { "fail": "service unavailable" }
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let script: SourceScript = serde_json::from_str(json)?;
        Ok(Self::from_script(script))
    }

    /// Build a source from a parsed script.
    pub fn from_script(script: SourceScript) -> Self {
        let mut source = Self::new();

        let (step, delay) = script.baseline.into_step(source.baseline.clone());
        source.baseline = step;
        source.delays[Operation::Baseline.index()] = delay;

        let (step, delay) = script.tax_rate.into_step(Step::Missing);
        source.tax_rate = step;
        source.delays[Operation::TaxRate.index()] = delay;

        let (step, delay) = script.price_updates.into_step(Step::Respond(Vec::new()));
        source.price_updates = step;
        source.delays[Operation::PriceUpdates.index()] = delay;

        let (step, delay) = script.stock_updates.into_step(Step::Respond(Vec::new()));
        source.stock_updates = step;
        source.delays[Operation::StockUpdates.index()] = delay;

        let (step, delay) = script.deletions.into_step(Step::Respond(Vec::new()));
        source.deletions = step;
        source.delays[Operation::Deletions.index()] = delay;

        let (step, delay) = script.new_records.into_step(Step::Respond(Vec::new()));
        source.new_records = step;
        source.delays[Operation::NewRecords.index()] = delay;

        source
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder
    // ─────────────────────────────────────────────────────────────────────────

    /// Respond to `fetch_baseline` with these records.
    pub fn baseline(mut self, records: Vec<Record>) -> Self {
        self.baseline = Step::Respond(records);
        self
    }

    /// Respond to `fetch_tax_rate` with this rate.
    pub fn tax_rate(mut self, rate_percent: Decimal) -> Self {
        self.tax_rate = Step::Respond(rate_percent);
        self
    }

    /// Respond to `fetch_price_updates` with these updates.
    pub fn price_updates(mut self, updates: Vec<PriceUpdate>) -> Self {
        self.price_updates = Step::Respond(updates);
        self
    }

    /// Respond to `fetch_stock_updates` with these updates.
    pub fn stock_updates(mut self, updates: Vec<StockUpdate>) -> Self {
        self.stock_updates = Step::Respond(updates);
        self
    }

    /// Respond to `fetch_deletions` with these ids.
    pub fn deletions(mut self, ids: Vec<ProductId>) -> Self {
        self.deletions = Step::Respond(ids);
        self
    }

    /// Respond to `fetch_new_records` with these records.
    pub fn new_records(mut self, records: Vec<Record>) -> Self {
        self.new_records = Step::Respond(records);
        self
    }

    /// Make an operation always fail.
    pub fn fail(mut self, operation: Operation, message: impl Into<String>) -> Self {
        let message = message.into();
        match operation {
            Operation::Baseline => self.baseline = Step::Fail(message),
            Operation::TaxRate => self.tax_rate = Step::Fail(message),
            Operation::PriceUpdates => self.price_updates = Step::Fail(message),
            Operation::StockUpdates => self.stock_updates = Step::Fail(message),
            Operation::Deletions => self.deletions = Step::Fail(message),
            Operation::NewRecords => self.new_records = Step::Fail(message),
        }
        self
    }

    /// Make the first `times` calls of an operation fail, then respond as
    /// scripted.
    pub fn fail_first(
        mut self,
        operation: Operation,
        times: usize,
        message: impl Into<String>,
    ) -> Self {
        self.transient[operation.index()] = AtomicUsize::new(times);
        self.transient_messages[operation.index()] = message.into();
        self
    }

    /// Delay every call of an operation.
    pub fn delay(mut self, operation: Operation, delay: Duration) -> Self {
        self.delays[operation.index()] = delay;
        self
    }

    /// Hold every call of an operation until [`release`](Self::release).
    pub fn gated(mut self, operation: Operation) -> Self {
        self.gates[operation.index()] = Some(Semaphore::new(0));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────────────────────

    /// Let one pending (or future) call of a gated operation proceed.
    ///
    /// Has no effect on operations that are not gated.
    pub fn release(&self, operation: Operation) {
        if let Some(gate) = &self.gates[operation.index()] {
            gate.add_permits(1);
        }
    }

    /// How many times an operation has been called.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    /// Total calls across all delta operations (excluding baseline).
    pub fn delta_calls(&self) -> usize {
        Operation::ALL
            .iter()
            .filter(|op| op.delta_kind().is_some())
            .map(|op| self.calls(*op))
            .sum()
    }

    async fn respond<T: Clone>(&self, operation: Operation, step: &Step<T>) -> Result<T> {
        let idx = operation.index();
        self.calls[idx].fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gates[idx] {
            gate.acquire()
                .await
                .map_err(|_| SourceError::unavailable(operation, "gate closed"))?
                .forget();
        }

        let delay = self.delays[idx];
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let transient = self.transient[idx]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            trace!(%operation, "scripted transient failure");
            return Err(SourceError::unavailable(
                operation,
                self.transient_messages[idx].clone(),
            ));
        }

        match step {
            Step::Respond(value) => Ok(value.clone()),
            Step::Fail(message) => Err(SourceError::unavailable(operation, message.clone())),
            Step::Missing => Err(SourceError::NotScripted { operation }),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeltaSource for MemorySource {
    async fn fetch_baseline(&self) -> Result<Vec<Record>> {
        self.respond(Operation::Baseline, &self.baseline).await
    }

    async fn fetch_tax_rate(&self) -> Result<Decimal> {
        self.respond(Operation::TaxRate, &self.tax_rate).await
    }

    async fn fetch_price_updates(&self) -> Result<Vec<PriceUpdate>> {
        self.respond(Operation::PriceUpdates, &self.price_updates).await
    }

    async fn fetch_stock_updates(&self) -> Result<Vec<StockUpdate>> {
        self.respond(Operation::StockUpdates, &self.stock_updates).await
    }

    async fn fetch_deletions(&self) -> Result<Vec<ProductId>> {
        self.respond(Operation::Deletions, &self.deletions).await
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>> {
        self.respond(Operation::NewRecords, &self.new_records).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON script
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-loadable script for [`MemorySource`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceScript {
    pub baseline: ScriptStep<Vec<Record>>,
    pub tax_rate: ScriptStep<Decimal>,
    pub price_updates: ScriptStep<Vec<PriceUpdate>>,
    pub stock_updates: ScriptStep<Vec<StockUpdate>>,
    pub deletions: ScriptStep<Vec<ProductId>>,
    pub new_records: ScriptStep<Vec<Record>>,
}

/// One scripted operation: a payload (`ok`) or a failure (`fail`), with an
/// optional latency. `fail` wins if both are present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptStep<T> {
    pub ok: Option<T>,
    pub fail: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
}

impl<T> Default for ScriptStep<T> {
    fn default() -> Self {
        Self {
            ok: None,
            fail: None,
            delay_ms: 0,
        }
    }
}

impl<T> ScriptStep<T> {
    fn into_step(self, fallback: Step<T>) -> (Step<T>, Duration) {
        let step = match (self.fail, self.ok) {
            (Some(message), _) => Step::Fail(message),
            (None, Some(value)) => Step::Respond(value),
            (None, None) => fallback,
        };
        (step, Duration::from_millis(self.delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scripted_responses() {
        let source = MemorySource::new()
            .baseline(vec![Record::new(1, "a")])
            .tax_rate(Decimal::TEN)
            .deletions(vec![ProductId(1)]);

        assert_eq!(source.fetch_baseline().await.unwrap().len(), 1);
        assert_eq!(source.fetch_tax_rate().await.unwrap(), Decimal::TEN);
        assert_eq!(source.fetch_deletions().await.unwrap(), vec![ProductId(1)]);
        assert!(source.fetch_new_records().await.unwrap().is_empty());
        assert_eq!(source.calls(Operation::Baseline), 1);
    }

    #[tokio::test]
    async fn test_unscripted_tax_fails() {
        let source = MemorySource::new();
        let err = source.fetch_tax_rate().await.unwrap_err();
        assert!(matches!(err, SourceError::NotScripted { .. }));
    }

    #[tokio::test]
    async fn test_fail_and_fail_first() {
        let source = MemorySource::new()
            .fail(Operation::StockUpdates, "down")
            .fail_first(Operation::Baseline, 1, "flaky");

        let err = source.fetch_stock_updates().await.unwrap_err();
        assert_eq!(err.to_string(), "fetch_stock_updates unavailable: down");

        assert!(source.fetch_baseline().await.is_err());
        assert!(source.fetch_baseline().await.is_ok());
        assert_eq!(source.calls(Operation::Baseline), 2);
    }

    #[tokio::test]
    async fn test_gate_holds_until_released() {
        let source = Arc::new(MemorySource::new().gated(Operation::Deletions));

        let pending = tokio::spawn({
            let source = Arc::clone(&source);
            async move { source.fetch_deletions().await }
        });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        source.release(Operation::Deletions);
        assert!(pending.await.unwrap().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "baseline": { "ok": [{ "id": 1, "name": "lamp", "price": "100" }] },
            "tax_rate": { "ok": "10", "delay_ms": 5 },
            "deletions": { "fail": "service unavailable" }
        }"#;
        let source = MemorySource::from_json(json).unwrap();

        assert!(matches!(source.baseline, Step::Respond(ref r) if r.len() == 1));
        assert!(matches!(source.tax_rate, Step::Respond(_)));
        assert!(matches!(source.deletions, Step::Fail(_)));
        assert!(matches!(source.new_records, Step::Respond(ref r) if r.is_empty()));
        assert_eq!(
            source.delays[Operation::TaxRate.index()],
            Duration::from_millis(5)
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_operation() {
        let err = MemorySource::from_json(r#"{ "inventory": {} }"#).err().unwrap();
        assert!(matches!(err, SourceError::Script(_)));
    }
}
