// Shared fetch-lifecycle plumbing for the stores.
//
// Epoch implements supersede semantics: an async operation stamps itself
// before awaiting the gateway and applies its result only if no newer
// operation (or a teardown) advanced the counter in the meantime. KeyedLocks
// implements the FIFO side: per-article mutexes so same-key mutations queue
// while distinct keys proceed independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// Lock a std mutex, recovering from poisoning. Guards here are only ever
/// held for short synchronous sections, never across an await.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fetch lifecycle of a wholesale-replaced collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Monotonic operation counter. `advance` both claims a new ticket and
/// invalidates every ticket claimed before it.
#[derive(Debug, Default)]
pub(crate) struct Epoch(AtomicU64);

impl Epoch {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Current ticket without claiming a new one. Used by mutations that
    /// must survive concurrent siblings but not a teardown.
    pub(crate) fn stamp(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the next ticket, invalidating all earlier ones.
    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::Acquire) == ticket
    }
}

/// Arena of per-key async mutexes. Holding the lock for a key serializes
/// mutations on that key in arrival order; other keys are untouched.
#[derive(Default)]
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> KeyedLocks<K>
where
    K: std::hash::Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn entry(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = lock(&self.locks);
        // A uniquely-held Arc means every holder of that key has settled;
        // sweep those out so the arena only tracks in-flight keys.
        locks.retain(|_, entry| Arc::strong_count(entry) > 1);
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.locks).len()
    }

    /// Drop all entries. In-flight holders keep their Arc and finish
    /// normally; their results are discarded by the epoch check anyway.
    pub(crate) fn clear(&self) {
        lock(&self.locks).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_invalidates_older() {
        let epoch = Epoch::new();
        let first = epoch.advance();
        let second = epoch.advance();
        assert!(!epoch.is_current(first));
        assert!(epoch.is_current(second));
    }

    #[test]
    fn stamp_survives_siblings_but_not_advance() {
        let epoch = Epoch::new();
        epoch.advance();
        let observed = epoch.stamp();
        assert!(epoch.is_current(observed));
        epoch.advance();
        assert!(!epoch.is_current(observed));
    }

    #[tokio::test]
    async fn keyed_locks_prune_settled_entries() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new();
        {
            let a = locks.entry(&"a");
            let _held = a.lock().await;
            // "a" is in flight, so the next lookup keeps it.
            locks.entry(&"b");
            assert_eq!(locks.len(), 2);
        }
        // Both settled: the next lookup sweeps them out.
        locks.entry(&"c");
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn keyed_locks_serialize_one_key_only() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new();
        let a = locks.entry(&"a");
        let a_again = locks.entry(&"a");
        let b = locks.entry(&"b");

        let _held = a.lock().await;
        // Same key: already held.
        assert!(a_again.try_lock().is_err());
        // Different key: free.
        assert!(b.try_lock().is_ok());
    }
}
