//! Time source abstraction.
//!
//! Window arithmetic and cache expiry both depend on "now"; routing every
//! read through a [`Clock`] keeps that arithmetic deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time with whole-second resolution.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time as whole seconds since the Unix epoch.
    fn epoch_secs(&self) -> u64;
}

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at an arbitrary epoch offset and only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_secs: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at the given epoch second.
    #[must_use]
    pub fn new(start_secs: u64) -> Self {
        Self {
            now_secs: AtomicU64::new(start_secs),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now_secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// Jump the clock to an absolute epoch second.
    pub fn set(&self, secs: u64) {
        self.now_secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn epoch_secs(&self) -> u64 {
        self.now_secs.load(Ordering::SeqCst)
    }
}
