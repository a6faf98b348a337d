//! The mutation-guarded catalog store.
//!
//! One `CatalogStore` exists per reconciliation run. All mutation goes
//! through [`CatalogStore::apply`], which holds the lock for exactly one
//! mutate-and-publish step.

use std::sync::{Mutex, MutexGuard, PoisonError};

use catalog_sync_core::{RunId, Snapshot, SnapshotKind};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::state::CatalogState;
use crate::traits::SnapshotSink;

/// Result of a committed mutation.
#[derive(Debug, Clone)]
pub struct Applied<R> {
    /// The snapshot that was published for this mutation.
    pub snapshot: Snapshot,
    /// Whatever the mutation closure returned.
    pub output: R,
}

/// In-memory catalog guarded by a single mutex.
///
/// Mutations run against a copy of the state and are committed with a
/// single assignment, so a panicking mutation leaves the previous state in
/// place. That makes it sound to keep using the store after lock poisoning.
pub struct CatalogStore {
    run: RunId,
    inner: Mutex<CatalogStoreInner>,
}

struct CatalogStoreInner {
    /// Committed catalog contents.
    state: CatalogState,

    /// Sequence number of the last published snapshot (0 = none yet).
    seq: u64,

    /// Set once the owning run is cancelled.
    closed: bool,

    /// Last published snapshot.
    last: Option<Snapshot>,
}

impl CatalogStore {
    /// Create an empty store for a run.
    pub fn new(run: RunId) -> Self {
        Self {
            run,
            inner: Mutex::new(CatalogStoreInner {
                state: CatalogState::new(),
                seq: 0,
                closed: false,
                last: None,
            }),
        }
    }

    /// The run this store belongs to.
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Apply a mutation under exclusive access and publish the result.
    ///
    /// The snapshot is handed to `sink` before the lock is released, so the
    /// sink sees snapshots in commit order. Returns `Closed` without running
    /// `mutate` if the store has been closed.
    pub fn apply<F, R>(
        &self,
        kind: SnapshotKind,
        mutate: F,
        sink: &dyn SnapshotSink,
    ) -> Result<Applied<R>>
    where
        F: FnOnce(&mut CatalogState) -> R,
    {
        self.try_apply(kind, |state| Ok::<R, StoreError>(mutate(state)), sink)
    }

    /// Like [`apply`](Self::apply), for mutations that can fail.
    ///
    /// A failed mutation commits nothing, consumes no sequence number, and
    /// publishes nothing.
    pub fn try_apply<F, R, E>(
        &self,
        kind: SnapshotKind,
        mutate: F,
        sink: &dyn SnapshotSink,
    ) -> Result<Applied<R>>
    where
        F: FnOnce(&mut CatalogState) -> std::result::Result<R, E>,
        E: Into<StoreError>,
    {
        let mut inner = self.lock();
        if inner.closed {
            return Err(StoreError::Closed(self.run));
        }

        let mut next = inner.state.clone();
        let output = mutate(&mut next).map_err(Into::into)?;
        inner.state = next;
        inner.seq += 1;

        let snapshot = inner.state.snapshot(self.run, inner.seq, kind);
        inner.last = Some(snapshot.clone());
        sink.publish(snapshot.clone());

        debug!(
            run = %self.run,
            seq = snapshot.seq,
            kind = ?snapshot.kind,
            records = snapshot.len(),
            "catalog mutation committed"
        );

        Ok(Applied { snapshot, output })
    }

    /// Close the store. Returns `true` if this call closed it.
    ///
    /// Waits for any in-flight `apply` to finish; after this returns no
    /// further snapshot is published from this store.
    pub fn close(&self) -> bool {
        let mut inner = self.lock();
        let newly_closed = !inner.closed;
        inner.closed = true;
        newly_closed
    }

    /// Run `f` under the store lock unless the store is closed.
    ///
    /// For publications that are not catalog mutations (such as a terminal
    /// failure) but must still never happen after `close`.
    pub fn while_open<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let inner = self.lock();
        if inner.closed {
            return Err(StoreError::Closed(self.run));
        }
        Ok(f())
    }

    /// Check if the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// The last published snapshot, if any.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.lock().last.clone()
    }

    /// Read the committed state without publishing.
    pub fn inspect<R>(&self, f: impl FnOnce(&CatalogState) -> R) -> R {
        f(&self.lock().state)
    }

    fn lock(&self) -> MutexGuard<'_, CatalogStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
