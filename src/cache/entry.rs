//! Cache entries with TTL.

use std::time::Duration;

/// A stored payload and its freshness bounds.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload.
    pub value: V,
    /// Epoch second the entry was stored.
    pub created_at: u64,
    /// How long the entry stays servable.
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Create an entry stamped at `created_at`.
    #[must_use]
    pub fn new(value: V, created_at: u64, ttl: Duration) -> Self {
        Self {
            value,
            created_at,
            ttl,
        }
    }

    /// Epoch second from which the entry is logically absent.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl.as_secs())
    }

    /// Whether the entry is past its TTL at `now_secs`.
    #[must_use]
    pub fn is_expired(&self, now_secs: u64) -> bool {
        now_secs >= self.expires_at()
    }
}
