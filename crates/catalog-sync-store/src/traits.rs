//! Sink trait: where committed snapshots go.
//!
//! The store hands every snapshot to a sink while it still holds its lock,
//! so sinks observe snapshots in exactly the order mutations were applied.

use std::sync::{Mutex, PoisonError};

use catalog_sync_core::Snapshot;

/// Receiver of committed snapshots.
///
/// Implementations must not block and must not call back into the store
/// that is publishing (the store lock is held during `publish`).
pub trait SnapshotSink: Send + Sync {
    /// Accept the snapshot produced by one committed mutation.
    fn publish(&self, snapshot: Snapshot);
}

/// Collects every snapshot, in order. Useful in tests.
impl SnapshotSink for Mutex<Vec<Snapshot>> {
    fn publish(&self, snapshot: Snapshot) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }
}
