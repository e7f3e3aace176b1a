//! Fixed-window admission checks.

use super::error::{RateLimitError, StoreError};
use super::store::{CounterStore, MemoryCounterStore};
use super::window::{window_start, WindowKey};
use crate::clock::{Clock, SystemClock};
use crate::config::FailPolicy;
use crate::tier::{Endpoint, Tier, TierPolicy};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A granted admission and the budget behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Window budget for the caller's tier.
    pub limit: u64,
    /// Requests left in the current window after this one.
    pub remaining: u64,
    /// Epoch second the current window resets.
    pub reset_at: u64,
}

/// Admission counters.
#[derive(Debug, Default)]
pub struct LimiterStats {
    /// Admission checks performed.
    checked: AtomicU64,
    /// Requests admitted.
    admitted: AtomicU64,
    /// Requests denied.
    denied: AtomicU64,
    /// Counter store failures absorbed by the fail policy.
    store_failures: AtomicU64,
}

impl LimiterStats {
    /// Take a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LimiterStatsSnapshot {
        LimiterStatsSnapshot {
            checked: self.checked.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`LimiterStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStatsSnapshot {
    /// Admission checks performed.
    pub checked: u64,
    /// Requests admitted.
    pub admitted: u64,
    /// Requests denied.
    pub denied: u64,
    /// Counter store failures absorbed by the fail policy.
    pub store_failures: u64,
}

/// Fixed-window rate limiter.
///
/// Counts requests per (identity, endpoint, window) against the caller's
/// tier budget. The count is incremented before it is checked, so a denied
/// request still spends a slot.
#[derive(Debug)]
pub struct RateLimiter {
    policy: TierPolicy,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    fail_policy: FailPolicy,
    stats: LimiterStats,
}

impl RateLimiter {
    /// Create a limiter over an in-memory store and the system clock.
    #[must_use]
    pub fn new(policy: TierPolicy) -> Self {
        Self {
            policy,
            store: Arc::new(MemoryCounterStore::new()),
            clock: Arc::new(SystemClock::new()),
            fail_policy: FailPolicy::default(),
            stats: LimiterStats::default(),
        }
    }

    /// Use a different counter store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = store;
        self
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the behavior on counter store failure.
    #[must_use]
    pub fn with_fail_policy(mut self, fail_policy: FailPolicy) -> Self {
        self.fail_policy = fail_policy;
        self
    }

    /// The tier table this limiter enforces.
    #[must_use]
    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Check one request against the caller's window budget.
    ///
    /// Admission increments the window counter and compares the
    /// post-increment count to the tier limit, so concurrent requests can
    /// never both land on the same slot. A tier missing from the policy
    /// table is admitted unconditionally.
    pub fn admit(
        &self,
        identity_key: &str,
        endpoint: Endpoint,
        tier: Tier,
    ) -> Result<Admission, RateLimitError> {
        self.stats.checked.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.epoch_secs();
        let Some(limits) = self.policy.limits_for(tier) else {
            debug!(%tier, "tier has no configured limits, admitting");
            self.stats.admitted.fetch_add(1, Ordering::Relaxed);
            return Ok(Admission {
                limit: u64::MAX,
                remaining: u64::MAX,
                reset_at: now,
            });
        };

        let limit = limits.max_requests_per_window;
        let window = limits.window_secs().max(1);
        let start = window_start(now, window);
        let reset_at = start + window;
        let key = WindowKey::new(identity_key, endpoint, start);

        let count = match self.store.increment(&key) {
            Ok(count) => count,
            Err(err) => return self.absorb_store_failure(&key, limit, reset_at, now, &err),
        };

        if count > limit {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, count, limit, "window budget spent, denying");
            return Err(RateLimitError::exceeded(limit, reset_at, now));
        }

        self.stats.admitted.fetch_add(1, Ordering::Relaxed);
        Ok(Admission {
            limit,
            remaining: limit - count,
            reset_at,
        })
    }

    fn absorb_store_failure(
        &self,
        key: &WindowKey,
        limit: u64,
        reset_at: u64,
        now: u64,
        err: &StoreError,
    ) -> Result<Admission, RateLimitError> {
        self.stats.store_failures.fetch_add(1, Ordering::Relaxed);

        if self.fail_policy.is_open() {
            warn!(key = %key, error = %err, "counter store failed, admitting (fail-open)");
            self.stats.admitted.fetch_add(1, Ordering::Relaxed);
            // The true count is unknowable; report as if this were the
            // first request of the window.
            return Ok(Admission {
                limit,
                remaining: limit.saturating_sub(1),
                reset_at,
            });
        }

        warn!(key = %key, error = %err, "counter store failed, denying (fail-closed)");
        self.stats.denied.fetch_add(1, Ordering::Relaxed);
        Err(RateLimitError::exceeded(limit, reset_at, now))
    }

    /// Drop windows that started more than `older_than` ago.
    ///
    /// Returns how many windows were removed.
    pub fn prune(&self, older_than: Duration) -> usize {
        let cutoff = self
            .clock
            .epoch_secs()
            .saturating_sub(older_than.as_secs());
        let removed = self.store.prune(cutoff);
        if removed > 0 {
            debug!(removed, "pruned finished rate windows");
        }
        removed
    }

    /// Admission counters.
    #[must_use]
    pub fn stats(&self) -> LimiterStatsSnapshot {
        self.stats.snapshot()
    }
}
