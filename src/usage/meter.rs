//! Asynchronous usage recording.

use super::record::{UsageRecord, UsageSummary};
use crate::clock::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Metering counters.
#[derive(Debug, Default)]
pub struct MeterStats {
    /// Records accepted by the writer.
    recorded: AtomicU64,
    /// Records dropped on a full queue or a stopped writer.
    dropped: AtomicU64,
}

impl MeterStats {
    /// Take a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MeterStatsSnapshot {
        MeterStatsSnapshot {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`MeterStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterStatsSnapshot {
    /// Records accepted by the writer.
    pub recorded: u64,
    /// Records dropped on a full queue or a stopped writer.
    pub dropped: u64,
}

/// Best-effort usage meter.
///
/// [`UsageMeter::record`] queues a fact onto a bounded channel drained by
/// a background writer; it never blocks the request path, and a full queue
/// drops the record with a warning. Usage data is analytics, not
/// correctness.
///
/// Must be created inside a Tokio runtime; the writer task starts
/// immediately.
#[derive(Debug)]
pub struct UsageMeter {
    sender: mpsc::Sender<UsageRecord>,
    log: Arc<RwLock<Vec<UsageRecord>>>,
    stats: Arc<MeterStats>,
    clock: Arc<dyn Clock>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl UsageMeter {
    /// Create a meter whose queue holds `queue_capacity` pending records.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let log = Arc::new(RwLock::new(Vec::new()));
        let stats = Arc::new(MeterStats::default());

        Self::spawn_writer(receiver, shutdown_rx, Arc::clone(&log), Arc::clone(&stats));

        Self {
            sender,
            log,
            stats,
            clock: Arc::new(SystemClock::new()),
            shutdown: Mutex::new(Some(shutdown_tx)),
        }
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn spawn_writer(
        mut receiver: mpsc::Receiver<UsageRecord>,
        mut shutdown: mpsc::Receiver<()>,
        log: Arc<RwLock<Vec<UsageRecord>>>,
        stats: Arc<MeterStats>,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    record = receiver.recv() => {
                        match record {
                            Some(record) => {
                                log.write().expect("usage log lock poisoned").push(record);
                                stats.recorded.fetch_add(1, Ordering::Relaxed);
                            }
                            None => break,
                        }
                    }
                    _ = shutdown.recv() => {
                        debug!("usage writer shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// Queue one usage fact.
    ///
    /// Never blocks. When the queue is full or the writer is gone the
    /// record is dropped and a warning logged.
    pub fn record(&self, record: UsageRecord) {
        if let Err(err) = self.sender.try_send(record) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            match err {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("usage queue full, dropping record");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!("usage writer stopped, dropping record");
                }
            }
        }
    }

    /// Aggregate one identity's usage over the trailing `lookback` window.
    #[must_use]
    pub fn summarize(&self, identity: &str, lookback: Duration) -> UsageSummary {
        let cutoff = self
            .clock
            .epoch_secs()
            .saturating_sub(lookback.as_secs());
        let log = self.log.read().expect("usage log lock poisoned");

        let mut total = 0_u64;
        let mut per_endpoint: BTreeMap<_, u64> = BTreeMap::new();
        let mut latency_sum = 0_u64;

        for record in log.iter() {
            if record.identity != identity || record.timestamp < cutoff {
                continue;
            }
            total += 1;
            *per_endpoint.entry(record.endpoint).or_insert(0) += 1;
            latency_sum += record.latency_ms;
        }

        let avg_latency_ms = if total == 0 {
            0.0
        } else {
            latency_sum as f64 / total as f64
        };

        UsageSummary {
            total_requests: total,
            per_endpoint,
            avg_latency_ms,
        }
    }

    /// Drop records older than `older_than`. Returns how many were removed.
    pub fn prune(&self, older_than: Duration) -> usize {
        let cutoff = self
            .clock
            .epoch_secs()
            .saturating_sub(older_than.as_secs());
        let mut log = self.log.write().expect("usage log lock poisoned");
        let before = log.len();
        log.retain(|record| record.timestamp >= cutoff);
        let removed = before - log.len();
        if removed > 0 {
            debug!(removed, "pruned old usage records");
        }
        removed
    }

    /// Number of records the writer has stored.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.log.read().expect("usage log lock poisoned").len()
    }

    /// Metering counters.
    #[must_use]
    pub fn stats(&self) -> MeterStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the background writer. Records queued after this are dropped.
    pub async fn shutdown(&self) {
        let sender = self
            .shutdown
            .lock()
            .expect("shutdown lock poisoned")
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(()).await;
        }
    }
}
