//! Snapshot publication.
//!
//! The publisher is a conflated broadcast cell: it holds exactly one
//! current value, publishing never blocks, and a slow subscriber skips
//! superseded values instead of queueing them.

use catalog_sync_core::{RunId, Snapshot};
use catalog_sync_store::SnapshotSink;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A value observed by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUpdate {
    /// A run has started and its baseline has not been loaded yet.
    Loading,
    /// The catalog as of one committed mutation.
    Snapshot(Snapshot),
    /// The run's baseline could not be loaded. Terminal for that run.
    Failed { run: RunId, message: String },
}

impl CatalogUpdate {
    /// The snapshot, if this update carries one.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            CatalogUpdate::Snapshot(snapshot) => Some(snapshot),
            CatalogUpdate::Loading | CatalogUpdate::Failed { .. } => None,
        }
    }

    /// Check if this is the loading state.
    pub fn is_loading(&self) -> bool {
        matches!(self, CatalogUpdate::Loading)
    }

    /// Check if this is a terminal failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, CatalogUpdate::Failed { .. })
    }
}

/// Sending half of the broadcast cell.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<CatalogUpdate>,
}

impl SnapshotPublisher {
    /// Create a publisher whose current value is `Loading`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CatalogUpdate::Loading);
        Self { tx }
    }

    /// Replace the current value. Never blocks, even with no subscribers.
    pub fn send(&self, update: CatalogUpdate) {
        self.tx.send_replace(update);
    }

    /// The current value.
    pub fn current(&self) -> CatalogUpdate {
        self.tx.borrow().clone()
    }

    /// Create a subscriber that starts at the current value.
    pub fn subscribe(&self) -> SnapshotSubscriber {
        SnapshotSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink for SnapshotPublisher {
    fn publish(&self, snapshot: Snapshot) {
        self.send(CatalogUpdate::Snapshot(snapshot));
    }
}

/// Receiving half of the broadcast cell.
#[derive(Debug, Clone)]
pub struct SnapshotSubscriber {
    rx: watch::Receiver<CatalogUpdate>,
}

impl SnapshotSubscriber {
    /// The latest published value.
    pub fn current(&self) -> CatalogUpdate {
        self.rx.borrow().clone()
    }

    /// Wait for a value newer than the last one seen.
    ///
    /// The value current at subscription counts as seen. Returns `None` once
    /// the publisher is gone.
    pub async fn changed(&mut self) -> Option<CatalogUpdate> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the current value satisfies `predicate`, checking the
    /// current value first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&CatalogUpdate) -> bool,
    ) -> Option<CatalogUpdate> {
        self.rx
            .wait_for(predicate)
            .await
            .ok()
            .map(|update| update.clone())
    }

    /// Convert into a stream that yields the current value, then every
    /// value observed afterwards.
    pub fn into_stream(self) -> WatchStream<CatalogUpdate> {
        WatchStream::new(self.rx)
    }
}
