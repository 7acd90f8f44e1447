//! Per-entity exclusive sections.
//!
//! Every read-check-write of one record runs while holding that record's guard, so
//! two concurrent mutations of the same entity are applied one after the other and
//! neither is lost. Distinct entities never contend. Reads do not lock.
//!
//! An id's mutex lives in the registry only while someone holds or waits for it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type Registry = DashMap<Uuid, Arc<Mutex<()>>>;

/// Registry of one async mutex per entity id, created on first use.
#[derive(Default)]
pub struct EntityLocks {
    locks: Arc<Registry>,
}

/// Exclusive access to one entity. Releasing the last holder evicts the id.
pub struct EntityGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<Registry>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // Release first so the guard's own handle is not counted below
        self.guard.take();
        self.registry
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Access is released when the guard drops.
    pub async fn lock(&self, id: impl Into<Uuid>) -> EntityGuard {
        let id = id.into();
        // Clone the Arc out so the map shard is released before awaiting
        let mutex = self.locks.entry(id).or_default().clone();
        let guard = mutex.lock_owned().await;
        EntityGuard {
            id,
            guard: Some(guard),
            registry: self.locks.clone(),
        }
    }

    /// Number of ids currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
