//! Counter storage backends.

use super::error::StoreError;
use super::window::WindowKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Storage for window counters.
///
/// `increment` must behave as a single indivisible operation: two racing
/// calls for the same key can never observe the same post-increment count.
pub trait CounterStore: Send + Sync + std::fmt::Debug {
    /// Increment the counter for a window and return the new count.
    fn increment(&self, key: &WindowKey) -> Result<u64, StoreError>;

    /// Current count for a window, zero when the window has no entry.
    fn count(&self, key: &WindowKey) -> Result<u64, StoreError>;

    /// Drop windows that started before the cutoff. Returns how many were
    /// removed.
    fn prune(&self, started_before: u64) -> usize;

    /// Number of windows currently held.
    fn window_count(&self) -> usize;
}

/// In-memory counter store.
///
/// Double-checked locking: the common path bumps an existing counter under
/// the read lock; only the first request of a window takes the write lock.
/// Counters for distinct keys never contend with each other.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: RwLock<HashMap<WindowKey, Arc<AtomicU64>>>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counter_for(&self, key: &WindowKey) -> Arc<AtomicU64> {
        {
            let windows = self.windows.read().expect("counter store lock poisoned");
            if let Some(counter) = windows.get(key) {
                return Arc::clone(counter);
            }
        }

        let mut windows = self.windows.write().expect("counter store lock poisoned");
        Arc::clone(
            windows
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        )
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(&self, key: &WindowKey) -> Result<u64, StoreError> {
        Ok(self.counter_for(key).fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn count(&self, key: &WindowKey) -> Result<u64, StoreError> {
        let windows = self.windows.read().expect("counter store lock poisoned");
        Ok(windows.get(key).map_or(0, |c| c.load(Ordering::SeqCst)))
    }

    fn prune(&self, started_before: u64) -> usize {
        let mut windows = self.windows.write().expect("counter store lock poisoned");
        let before = windows.len();
        windows.retain(|key, _| key.window_start >= started_before);
        before - windows.len()
    }

    fn window_count(&self) -> usize {
        self.windows
            .read()
            .expect("counter store lock poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Endpoint;

    fn key(identity: &str, window_start: u64) -> WindowKey {
        WindowKey::new(identity, Endpoint::Current, window_start)
    }

    #[test]
    fn test_increment_returns_post_increment_count() {
        let store = MemoryCounterStore::new();
        let k = key("key-1", 0);

        assert_eq!(store.increment(&k).unwrap(), 1);
        assert_eq!(store.increment(&k).unwrap(), 2);
        assert_eq!(store.increment(&k).unwrap(), 3);
        assert_eq!(store.count(&k).unwrap(), 3);
    }

    #[test]
    fn test_count_of_absent_window_is_zero() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.count(&key("nobody", 0)).unwrap(), 0);
    }

    #[test]
    fn test_keys_count_independently() {
        let store = MemoryCounterStore::new();
        store.increment(&key("key-1", 0)).unwrap();
        store.increment(&key("key-1", 0)).unwrap();
        store.increment(&key("key-2", 0)).unwrap();

        assert_eq!(store.count(&key("key-1", 0)).unwrap(), 2);
        assert_eq!(store.count(&key("key-2", 0)).unwrap(), 1);
        assert_eq!(store.window_count(), 2);
    }

    #[test]
    fn test_prune_drops_only_old_windows() {
        let store = MemoryCounterStore::new();
        store.increment(&key("key-1", 0)).unwrap();
        store.increment(&key("key-1", 900)).unwrap();
        store.increment(&key("key-1", 1_800)).unwrap();

        let removed = store.prune(900);
        assert_eq!(removed, 1);
        assert_eq!(store.window_count(), 2);
        assert_eq!(store.count(&key("key-1", 0)).unwrap(), 0);
        assert_eq!(store.count(&key("key-1", 900)).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_increments_observe_unique_counts() {
        let store = Arc::new(MemoryCounterStore::new());
        let k = key("key-1", 0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let k = k.clone();
            handles.push(std::thread::spawn(move || {
                let mut seen = Vec::with_capacity(50);
                for _ in 0..50 {
                    seen.push(store.increment(&k).unwrap());
                }
                seen
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();

        // 400 increments, 400 distinct post-increment values.
        assert_eq!(all.len(), 400);
        assert_eq!(store.count(&k).unwrap(), 400);
    }
}
