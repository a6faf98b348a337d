//! A randomized source that behaves like a live catalog feed.
//!
//! The catalog and all deltas are generated once from a seed, so two
//! sources with the same config return the same payloads. Latency and
//! failures are drawn per call.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use catalog_sync_core::{Decimal, PriceUpdate, ProductId, Record, StockUpdate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::source::{DeltaSource, Operation};

/// Configuration for [`SimulatedSource`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for payload generation and per-call randomness.
    pub seed: u64,
    /// Number of baseline records.
    pub catalog_size: usize,
    /// Number of new records arriving as a delta.
    pub new_records: usize,
    /// Minimum per-call latency in milliseconds.
    pub min_latency_ms: u64,
    /// Maximum per-call latency in milliseconds.
    pub max_latency_ms: u64,
    /// Probability in `[0, 1]` that a delta call fails.
    pub failure_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            catalog_size: 20,
            new_records: 5,
            min_latency_ms: 50,
            max_latency_ms: 400,
            failure_probability: 0.0,
        }
    }
}

/// Payloads generated up front from the seed.
#[derive(Debug, Clone)]
struct Feed {
    baseline: Vec<Record>,
    tax_rate: Decimal,
    price_updates: Vec<PriceUpdate>,
    stock_updates: Vec<StockUpdate>,
    deletions: Vec<ProductId>,
    new_records: Vec<Record>,
}

/// Randomized [`DeltaSource`].
///
/// The baseline never fails; only the five delta operations are subject to
/// `failure_probability`.
pub struct SimulatedSource {
    config: SimulationConfig,
    feed: Feed,
    rng: Mutex<StdRng>,
}

impl SimulatedSource {
    /// Create a simulated source, generating its payloads from the seed.
    pub fn new(config: SimulationConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let feed = generate_feed(&config, &mut rng);
        Self {
            config,
            feed,
            rng: Mutex::new(rng),
        }
    }

    /// The configuration this source was built with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The baseline this source serves.
    pub fn baseline(&self) -> &[Record] {
        &self.feed.baseline
    }

    /// The tax rate this source serves.
    pub fn tax_rate(&self) -> Decimal {
        self.feed.tax_rate
    }

    /// Draw latency and failure for one call.
    fn roll(&self, operation: Operation) -> (Duration, bool) {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (lo, hi) = (
            self.config.min_latency_ms,
            self.config.max_latency_ms.max(self.config.min_latency_ms),
        );
        let latency = Duration::from_millis(rng.gen_range(lo..=hi));
        let p = self.config.failure_probability.clamp(0.0, 1.0);
        let fails = operation != Operation::Baseline && rng.gen_bool(p);
        (latency, fails)
    }

    async fn serve<T: Clone>(&self, operation: Operation, payload: &T) -> Result<T> {
        let (latency, fails) = self.roll(operation);
        tokio::time::sleep(latency).await;
        debug!(%operation, latency_ms = latency.as_millis() as u64, fails, "simulated call");
        if fails {
            return Err(SourceError::unavailable(operation, "simulated outage"));
        }
        Ok(payload.clone())
    }
}

#[async_trait]
impl DeltaSource for SimulatedSource {
    async fn fetch_baseline(&self) -> Result<Vec<Record>> {
        self.serve(Operation::Baseline, &self.feed.baseline).await
    }

    async fn fetch_tax_rate(&self) -> Result<Decimal> {
        self.serve(Operation::TaxRate, &self.feed.tax_rate).await
    }

    async fn fetch_price_updates(&self) -> Result<Vec<PriceUpdate>> {
        self.serve(Operation::PriceUpdates, &self.feed.price_updates).await
    }

    async fn fetch_stock_updates(&self) -> Result<Vec<StockUpdate>> {
        self.serve(Operation::StockUpdates, &self.feed.stock_updates).await
    }

    async fn fetch_deletions(&self) -> Result<Vec<ProductId>> {
        self.serve(Operation::Deletions, &self.feed.deletions).await
    }

    async fn fetch_new_records(&self) -> Result<Vec<Record>> {
        self.serve(Operation::NewRecords, &self.feed.new_records).await
    }
}

fn product(id: i64, rng: &mut StdRng) -> Record {
    Record::new(id, format!("Product {id}"))
        .description(format!("Simulated catalog item #{id}"))
        .price(Decimal::new(rng.gen_range(100..=10_000), 2))
        .stock(rng.gen_range(0..=100))
}

fn generate_feed(config: &SimulationConfig, rng: &mut StdRng) -> Feed {
    let size = config.catalog_size as i64;
    let baseline: Vec<Record> = (1..=size).map(|id| product(id, rng)).collect();

    let tax_rate = Decimal::new(rng.gen_range(0..=250), 1);

    let mut price_updates = Vec::new();
    let mut stock_updates = Vec::new();
    let mut deletions = Vec::new();
    for id in 1..=size {
        let roll: f64 = rng.gen();
        if roll < 0.05 {
            deletions.push(ProductId(id));
        } else if roll < 0.20 {
            price_updates.push(PriceUpdate::new(
                id,
                Decimal::new(rng.gen_range(100..=10_000), 2),
            ));
        } else if roll < 0.40 {
            stock_updates.push(StockUpdate::new(id, rng.gen_range(0..=100)));
        }
    }

    let new_records = (1..=config.new_records as i64)
        .map(|offset| product(size + offset, rng))
        .collect();

    Feed {
        baseline,
        tax_rate,
        price_updates,
        stock_updates,
        deletions,
        new_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            min_latency_ms: 0,
            max_latency_ms: 1,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_feed() {
        let a = SimulatedSource::new(fast(42));
        let b = SimulatedSource::new(fast(42));
        assert_eq!(a.baseline(), b.baseline());
        assert_eq!(a.tax_rate(), b.tax_rate());
    }

    #[test]
    fn test_new_records_do_not_collide_with_baseline() {
        let source = SimulatedSource::new(fast(1));
        let max_baseline = source.baseline().iter().map(|r| r.id).max().unwrap();
        assert!(source.feed.new_records.iter().all(|r| r.id > max_baseline));
    }

    #[test]
    fn test_delta_targets_disjoint() {
        let source = SimulatedSource::new(fast(3));
        let feed = &source.feed;
        for id in &feed.deletions {
            assert!(!feed.price_updates.iter().any(|u| u.id == *id));
            assert!(!feed.stock_updates.iter().any(|u| u.id == *id));
        }
    }

    #[tokio::test]
    async fn test_certain_failure_spares_baseline() {
        let source = SimulatedSource::new(SimulationConfig {
            failure_probability: 1.0,
            ..fast(9)
        });
        assert!(source.fetch_baseline().await.is_ok());
        assert!(source.fetch_tax_rate().await.is_err());
    }
}
