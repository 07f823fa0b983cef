//! Keyed mutual exclusion
//!
//! Attempts touching the same key are serialised; disjoint keys proceed
//! concurrently. Keys are always taken in sorted order so two attempts over
//! the same pair cannot deadlock. An entry lives only while someone holds
//! or waits for it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Held for the duration of one attempt; releases every lock on drop
#[derive(Debug)]
pub struct KeyedGuard {
    locks: Arc<LockMap>,
    guards: Vec<(String, OwnedMutexGuard<()>)>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every listed key. Duplicates are locked once.
    pub async fn acquire(&self, keys: &[&str]) -> KeyedGuard {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        // Built before the first await so a cancelled acquire still prunes
        let mut held = KeyedGuard {
            locks: self.locks.clone(),
            guards: Vec::with_capacity(keys.len()),
        };
        for key in keys {
            // Declared before the lock handle so it is dropped after it
            let mut pending = PendingEntry::new(&self.locks, key);
            let lock = self.locks.entry(key.to_string()).or_default().value().clone();
            let guard = lock.lock_owned().await;
            pending.done = true;
            held.guards.push((key.to_string(), guard));
        }

        held
    }

    /// Keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Removes the map entry of `key` once no guard or waiter references it
fn prune(locks: &LockMap, key: &str) {
    locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
}

/// Waiter on one key; prunes the entry if the wait is abandoned
struct PendingEntry<'a> {
    locks: &'a LockMap,
    key: &'a str,
    done: bool,
}

impl<'a> PendingEntry<'a> {
    fn new(locks: &'a LockMap, key: &'a str) -> Self {
        Self {
            locks,
            key,
            done: false,
        }
    }
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if !self.done {
            prune(self.locks, self.key);
        }
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        for (key, guard) in self.guards.drain(..) {
            drop(guard);
            prune(&self.locks, &key);
        }
    }
}
