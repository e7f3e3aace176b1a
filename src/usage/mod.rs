//! Usage metering.
//!
//! The request path queues a fact and moves on; a background writer owns
//! the append-only store. Nothing on this path can block or fail a
//! response.

mod meter;
mod record;

pub use meter::{MeterStats, MeterStatsSnapshot, UsageMeter};
pub use record::{UsageRecord, UsageSummary};
