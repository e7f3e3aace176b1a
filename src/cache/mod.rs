//! Response caching.
//!
//! Upstream payloads are memoized by (normalized city, endpoint, tier)
//! with a uniform TTL. Expiry is lazy at read time; the maintenance task
//! may also [`ResponseCache::sweep`] eagerly. Concurrent misses for one
//! key collapse into a single upstream computation.

mod entry;
mod key;
mod store;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use store::{CacheStats, CacheStatsSnapshot, ResponseCache};
