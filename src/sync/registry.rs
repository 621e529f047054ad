// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory sync registry.
//!
//! Maps a ClusterSecret uid to the declaration used for its last convergence and
//! the namespaces believed to hold a mirror. Each uid has its own async mutex so
//! one identity is mutated by a single writer at a time while different
//! identities proceed in parallel. Nothing here is persisted; the startup pass
//! rebuilds it.

use crate::types::DeclaredSecret;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry entry for one declared secret.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub desired: DeclaredSecret,
    pub synced_namespaces: BTreeSet<String>,
}

type Slot = Arc<AsyncMutex<Option<SyncRecord>>>;

#[derive(Default)]
pub struct SyncRegistry {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Exclusive access to one identity's record. Held for the whole read-modify-write.
pub struct RegistryEntry<'a> {
    uid: String,
    slot: Slot,
    guard: OwnedMutexGuard<Option<SyncRecord>>,
    registry: &'a SyncRegistry,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // A panic while holding this lock cannot leave the map half-updated
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the entry for `uid`, waiting for any other writer of the same uid.
    pub async fn lock(&self, uid: &str) -> RegistryEntry<'_> {
        let slot = self
            .slots()
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone();
        let guard = slot.clone().lock_owned().await;

        RegistryEntry {
            uid: uid.to_string(),
            slot,
            guard,
            registry: self,
        }
    }

    /// Uids present right now. Entries added after the call are not included.
    pub fn uids(&self) -> Vec<String> {
        self.slots().keys().cloned().collect()
    }

    /// Copy of a record without holding its lock past the call
    pub async fn get(&self, uid: &str) -> Option<SyncRecord> {
        let slot = self.slots().get(uid).cloned()?;
        let record = slot.lock().await.clone();
        record
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, uid: &str, slot: &Slot) {
        let mut slots = self.slots();
        // Map plus the releasing entry; any extra reference is a waiter that still needs the slot
        if Arc::strong_count(slot) <= 3 && slots.get(uid).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(uid);
        }
    }
}

impl RegistryEntry<'_> {
    pub fn record(&self) -> Option<&SyncRecord> {
        self.guard.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut SyncRecord> {
        self.guard.as_mut()
    }

    /// Replace the record with the outcome of a successful convergence
    pub fn commit(&mut self, record: SyncRecord) {
        *self.guard = Some(record);
    }

    /// Drop the record. Returns the evicted record, `None` if there was nothing to evict.
    pub fn evict(&mut self) -> Option<SyncRecord> {
        self.guard.take()
    }
}

impl Drop for RegistryEntry<'_> {
    fn drop(&mut self) {
        if self.guard.is_none() {
            self.registry.release(&self.uid, &self.slot);
        }
    }
}
