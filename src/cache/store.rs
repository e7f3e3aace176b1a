//! TTL cache with single-flight miss coalescing.

use super::entry::CacheEntry;
use super::key::CacheKey;
use crate::clock::{Clock, SystemClock};
use crate::upstream::FetchError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from a live entry.
    hits: AtomicU64,
    /// Lookups that found nothing servable.
    misses: AtomicU64,
    /// Misses that joined an existing flight instead of computing.
    coalesced: AtomicU64,
    /// Reads that found an entry past its TTL.
    expired: AtomicU64,
}

impl CacheStats {
    /// Take a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups served from a live entry.
    pub hits: u64,
    /// Lookups that found nothing servable.
    pub misses: u64,
    /// Misses that joined an existing flight instead of computing.
    pub coalesced: u64,
    /// Reads that found an entry past its TTL.
    pub expired: u64,
}

type FlightTable<V> = Mutex<HashMap<CacheKey, broadcast::Sender<Result<V, FetchError>>>>;

enum Role<V> {
    Hit(V),
    Waiter(broadcast::Receiver<Result<V, FetchError>>),
    Leader(broadcast::Receiver<Result<V, FetchError>>),
}

/// Response cache with TTL expiry and single-flight misses.
///
/// A miss computes the value at most once per key under concurrency:
/// the first caller becomes the leader and runs the computation in a
/// spawned task, racing callers subscribe to the leader's outcome. Because
/// the computation lives in its own task, a caller abort never cancels
/// work other waiters depend on. Failures are published to every waiter
/// but never stored.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry<V>>>>,
    flights: Arc<FlightTable<V>>,
    ttl: Duration,
    compute_timeout: Duration,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<V> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            flights: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            compute_timeout: Duration::from_secs(10),
            clock: Arc::new(SystemClock::new()),
            stats: CacheStats::default(),
        }
    }

    /// Bound each computation; an overrun fails the flight with
    /// [`FetchError::Timeout`].
    #[must_use]
    pub fn with_compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = timeout;
        self
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Serve from cache or compute once, sharing the result with every
    /// concurrent caller for the same key.
    ///
    /// The boolean is `true` only when the value came from a live entry;
    /// flight participants, leader and waiters alike, get `false`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<(V, bool), FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        if let Some(value) = self.lookup(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((value, true));
        }

        let role = {
            let mut flights = self.flights.lock().expect("flight table lock poisoned");
            if let Some(sender) = flights.get(&key) {
                Role::Waiter(sender.subscribe())
            } else if let Some(value) = self.lookup(&key) {
                // A flight finished between the miss above and taking the
                // flight lock.
                Role::Hit(value)
            } else {
                let (sender, receiver) = broadcast::channel(1);
                flights.insert(key.clone(), sender);
                Role::Leader(receiver)
            }
        };

        let mut receiver = match role {
            Role::Hit(value) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok((value, true));
            }
            Role::Waiter(receiver) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                receiver
            }
            Role::Leader(receiver) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.start_flight(key, compute());
                receiver
            }
        };

        match receiver.recv().await {
            Ok(outcome) => outcome.map(|value| (value, false)),
            // The flight task died without publishing.
            Err(_) => Err(FetchError::UpstreamUnavailable),
        }
    }

    fn start_flight<Fut>(&self, key: CacheKey, fut: Fut)
    where
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let flights = Arc::clone(&self.flights);
        let clock = Arc::clone(&self.clock);
        let ttl = self.ttl;
        let timeout = self.compute_timeout;

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, fut).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(key = %key, ?timeout, "upstream computation timed out");
                    Err(FetchError::Timeout)
                }
            };

            match &outcome {
                Ok(value) => {
                    let entry = CacheEntry::new(value.clone(), clock.epoch_secs(), ttl);
                    entries
                        .write()
                        .expect("cache lock poisoned")
                        .insert(key.clone(), entry);
                }
                Err(err) => {
                    debug!(key = %key, error = %err, "computation failed, nothing cached");
                }
            }

            // Publish only after removing the flight entry: a late arrival
            // then either sees the stored entry or starts a fresh flight,
            // never subscribes to a finished one.
            let sender = flights
                .lock()
                .expect("flight table lock poisoned")
                .remove(&key);
            if let Some(sender) = sender {
                let _ = sender.send(outcome);
            }
        });
    }

    fn lookup(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.epoch_secs();

        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().expect("cache lock poisoned");
        // Re-check under the write lock; a racing flight may have replaced
        // the entry with a fresh one.
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
        }
        None
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    /// Number of entries physically present, expired included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
