//! Usage facts and summaries.

use crate::tier::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One handled request, as an immutable fact.
///
/// Every terminal outcome produces a record; `status_code` carries
/// rejections as well as successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Credential key of the caller, or empty when authentication failed.
    pub identity: String,
    /// Endpoint the request targeted.
    pub endpoint: Endpoint,
    /// HTTP method.
    pub method: String,
    /// Final status of the request.
    pub status_code: u16,
    /// Wall-clock time spent handling the request.
    pub latency_ms: u64,
    /// Epoch second the request completed.
    pub timestamp: u64,
}

impl UsageRecord {
    /// Create a record.
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        endpoint: Endpoint,
        method: impl Into<String>,
        status_code: u16,
        latency_ms: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            identity: identity.into(),
            endpoint,
            method: method.into(),
            status_code,
            latency_ms,
            timestamp,
        }
    }
}

/// Aggregated usage for one identity over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    /// Requests in the window.
    pub total_requests: u64,
    /// Requests per endpoint.
    pub per_endpoint: BTreeMap<Endpoint, u64>,
    /// Mean handling latency, zero when the window is empty.
    pub avg_latency_ms: f64,
}

impl UsageSummary {
    /// Summary with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            per_endpoint: BTreeMap::new(),
            avg_latency_ms: 0.0,
        }
    }
}
