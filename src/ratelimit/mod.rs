//! Fixed-window rate limiting.
//!
//! Requests are counted per (identity, endpoint, window start) against the
//! caller's tier budget. Counting is increment-then-check: the counter
//! moves first and the comparison happens on the post-increment value, so
//! a denied request still spends a slot and two racing requests can never
//! share one. Windows are fixed and non-overlapping, which lets a caller
//! burst up to twice its budget across a window boundary; clients learn
//! when the next budget opens from [`Admission::reset_at`].
//!
//! The counter store sits behind [`CounterStore`]; a store failure is
//! absorbed by the configured fail policy rather than surfaced to callers.

mod error;
mod limiter;
mod store;
mod window;

pub use error::{format_reset, RateLimitError, StoreError};
pub use limiter::{Admission, LimiterStats, LimiterStatsSnapshot, RateLimiter};
pub use store::{CounterStore, MemoryCounterStore};
pub use window::{window_end, window_start, WindowKey};
