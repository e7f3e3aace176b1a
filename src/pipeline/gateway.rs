//! The request pipeline.
//!
//! [`Gateway`] wires the stage components together and drives every request
//! through the same path: resolve the credential, spend a rate-limit slot,
//! gate on the tier's capabilities, then serve from the cache or upstream.
//! Every terminal outcome is metered, rejections included.

use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use http::StatusCode;

use crate::cache::{CacheKey, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::identity::{Directory, Identity, IdentityResolver, StaticDirectory};
use crate::ratelimit::{Admission, CounterStore, MemoryCounterStore, RateLimiter};
use crate::tier::{Endpoint, Tier};
use crate::upstream::{fetch_with_retry, StaticProvider, WeatherProvider, WeatherSnapshot};
use crate::usage::{UsageMeter, UsageRecord};

use super::envelope::{Envelope, RateLimitInfo, RejectionEnvelope, SuccessEnvelope};
use super::error::{CapabilityError, GatewayError};
use super::state::PipelineState;

/// A request as the embedding server hands it to the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// The caller's API key, if one was supplied.
    pub credential: Option<String>,
    /// Endpoint being requested.
    pub endpoint: Endpoint,
    /// City the caller asked about; normalized before any lookup.
    pub city: String,
    /// HTTP method, recorded for usage reporting.
    pub method: String,
}

impl GatewayRequest {
    /// Create a request with no credential and a `GET` method.
    #[must_use]
    pub fn new(endpoint: Endpoint, city: impl Into<String>) -> Self {
        Self {
            credential: None,
            endpoint,
            city: city.into(),
            method: "GET".to_string(),
        }
    }

    /// Attach the caller's API key.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Override the recorded HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// The gateway's answer: a status, the terminal state, and the envelope.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status the embedding server should answer with.
    pub status: StatusCode,
    /// Terminal pipeline state the request ended in.
    pub state: PipelineState,
    /// Correlation id, present on every log line for this request.
    pub request_id: String,
    /// Serializable response body.
    pub envelope: Envelope,
}

/// What a request that made it all the way through carries.
struct Served {
    snapshot: WeatherSnapshot,
    cached: bool,
    admission: Admission,
    identity: Identity,
    tier: Tier,
}

/// A failure plus where it happened and who (if known) caused it.
struct Rejection {
    state: PipelineState,
    identity: Option<Identity>,
    error: GatewayError,
}

/// Builder for [`Gateway`], allowing component overrides before wiring.
pub struct GatewayBuilder {
    config: GatewayConfig,
    directory: Option<Arc<dyn Directory>>,
    provider: Option<Arc<dyn WeatherProvider>>,
    store: Option<Arc<dyn CounterStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GatewayBuilder {
    /// Swap in a credential directory.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Swap in a weather provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Swap in a rate-limit counter store.
    #[must_use]
    pub fn with_counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Swap in a clock, shared by every time-sensitive component.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wire the components and produce the gateway.
    ///
    /// Must be called inside a Tokio runtime; the usage writer task starts
    /// immediately.
    #[must_use]
    pub fn build(mut self) -> Gateway {
        self.config.normalize();

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(StaticDirectory::new()) as Arc<dyn Directory>);
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(StaticProvider::new()) as Arc<dyn WeatherProvider>);
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCounterStore::new()) as Arc<dyn CounterStore>);

        let limiter = RateLimiter::new(self.config.tiers.clone())
            .with_store(store)
            .with_clock(Arc::clone(&clock))
            .with_fail_policy(self.config.rate_limit.fail_policy);

        let cache = ResponseCache::new(self.config.cache.ttl)
            .with_compute_timeout(self.config.upstream.timeout)
            .with_clock(Arc::clone(&clock));

        let resolver = IdentityResolver::new(directory);
        let meter =
            UsageMeter::new(self.config.usage.queue_capacity).with_clock(Arc::clone(&clock));

        Gateway {
            config: self.config,
            resolver,
            limiter: Arc::new(limiter),
            cache: Arc::new(cache),
            meter: Arc::new(meter),
            provider,
            clock,
            maintenance: Mutex::new(None),
        }
    }
}

/// The tiered weather gateway.
///
/// One instance serves all callers; every method takes `&self` and the
/// components synchronize internally. Create via [`Gateway::builder`].
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    resolver: IdentityResolver,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache<WeatherSnapshot>>,
    meter: Arc<UsageMeter>,
    provider: Arc<dyn WeatherProvider>,
    clock: Arc<dyn Clock>,
    maintenance: Mutex<Option<mpsc::Sender<()>>>,
}

impl Gateway {
    /// Start building a gateway from a configuration.
    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            directory: None,
            provider: None,
            store: None,
            clock: None,
        }
    }

    /// Drive one request through the pipeline.
    ///
    /// Never returns an error: every failure becomes a rejection envelope
    /// with the matching status code. The outcome is metered and logged
    /// before this returns.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let started = Instant::now();
        let request_id = next_request_id();

        debug!(
            request_id = %request_id,
            endpoint = %request.endpoint,
            city = %request.city,
            "request received"
        );

        let outcome = self.run(&request).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (response, identity_key) = match outcome {
            Ok(served) => {
                let envelope = Envelope::Success(SuccessEnvelope {
                    data: served.snapshot,
                    tier: served.tier,
                    cached: served.cached,
                    rate_limit: RateLimitInfo::from(served.admission),
                });
                let response = GatewayResponse {
                    status: StatusCode::OK,
                    state: PipelineState::Recorded,
                    request_id,
                    envelope,
                };
                (response, served.identity.key)
            }
            Err(rejection) => {
                let envelope =
                    Envelope::Rejection(RejectionEnvelope::from_error(&rejection.error));
                let response = GatewayResponse {
                    status: rejection.error.status(),
                    state: rejection.state,
                    request_id,
                    envelope,
                };
                let key = rejection
                    .identity
                    .map(|identity| identity.key)
                    .unwrap_or_default();
                (response, key)
            }
        };

        self.meter.record(UsageRecord::new(
            identity_key,
            request.endpoint,
            request.method.clone(),
            response.status.as_u16(),
            latency_ms,
            self.clock.epoch_secs(),
        ));

        if response.status.as_u16() >= 400 {
            warn!(
                request_id = %response.request_id,
                endpoint = %request.endpoint,
                state = %response.state,
                status = response.status.as_u16(),
                latency_ms,
                "request rejected"
            );
        } else {
            info!(
                request_id = %response.request_id,
                endpoint = %request.endpoint,
                state = %response.state,
                status = response.status.as_u16(),
                latency_ms,
                "request served"
            );
        }

        response
    }

    /// The stage sequence; stops at the first failure.
    async fn run(&self, request: &GatewayRequest) -> Result<Served, Rejection> {
        let (identity, tier) = self
            .resolver
            .resolve(request.credential.as_deref())
            .await
            .map_err(|err| Rejection {
                state: PipelineState::RejectedAuth,
                identity: None,
                error: GatewayError::from(err),
            })?;

        let admission = self
            .limiter
            .admit(&identity.key, request.endpoint, tier)
            .map_err(|err| Rejection {
                state: PipelineState::RejectedRate,
                identity: Some(identity.clone()),
                error: GatewayError::from(err),
            })?;

        // The gate sits after admission so an unentitled request still spends
        // a slot of its own endpoint's budget, and before the cache so no
        // upstream work happens for it.
        let capability = request.endpoint.required_capability();
        if !self.config.tiers.allows(tier, capability) {
            return Err(Rejection {
                state: PipelineState::RejectedFetch,
                identity: Some(identity),
                error: GatewayError::from(CapabilityError::NotEntitled { tier, capability }),
            });
        }

        let key = CacheKey::new(&request.city, request.endpoint, tier);
        let provider = Arc::clone(&self.provider);
        let city = request.city.clone();
        let max_retries = self.config.upstream.max_retries;

        let (snapshot, cached) = self
            .cache
            .get_or_compute(key, move || {
                fetch_with_retry(provider, city, tier, max_retries)
            })
            .await
            .map_err(|err| Rejection {
                state: PipelineState::RejectedFetch,
                identity: Some(identity.clone()),
                error: GatewayError::from(err),
            })?;

        Ok(Served {
            snapshot,
            cached,
            admission,
            identity,
            tier,
        })
    }

    /// Start the periodic maintenance task.
    ///
    /// Each tick sweeps expired cache entries and prunes finished rate
    /// windows and aged-out usage records. Calling this twice is harmless;
    /// the second call is a no-op while the task runs.
    pub fn spawn_maintenance(&self) {
        let mut guard = self.maintenance.lock().expect("maintenance lock poisoned");
        if guard.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *guard = Some(shutdown_tx);
        drop(guard);

        let cache = Arc::clone(&self.cache);
        let limiter = Arc::clone(&self.limiter);
        let meter = Arc::clone(&self.meter);
        let sweep_interval = self.config.cache.sweep_interval;
        let retain_windows = self.config.rate_limit.retain_windows_for;
        let retain_records = self.config.usage.retain_records_for;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swept = cache.sweep();
                        let windows = limiter.prune(retain_windows);
                        let records = meter.prune(retain_records);
                        if swept > 0 || windows > 0 || records > 0 {
                            debug!(swept, windows, records, "maintenance pass");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("maintenance task shutting down");
                        break;
                    }
                }
            }
        });

        info!(
            sweep_interval_secs = sweep_interval.as_secs(),
            "maintenance task started"
        );
    }

    /// Stop the maintenance task and the usage writer.
    pub async fn shutdown(&self) {
        let sender = self
            .maintenance
            .lock()
            .expect("maintenance lock poisoned")
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(()).await;
        }
        self.meter.shutdown().await;
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The identity resolver, for stats inspection.
    #[must_use]
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// The rate limiter, for stats inspection.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The response cache, for stats inspection.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache<WeatherSnapshot> {
        &self.cache
    }

    /// The usage meter, for summaries and stats inspection.
    #[must_use]
    pub fn usage(&self) -> &UsageMeter {
        &self.meter
    }
}

/// Correlation id for one request's log lines: timestamp plus random tail.
fn next_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos:x}-{:08x}", rand::random::<u32>())
}
