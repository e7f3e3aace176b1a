//! Integration tests for the full request pipeline.
//!
//! Each test builds a gateway from configuration plus swapped-in fixtures
//! (static directory, scripted providers, a failing counter store) and
//! drives requests end to end, asserting on envelopes, status codes, and
//! component stats.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use umbrella_gateway::clock::{Clock, ManualClock};
use umbrella_gateway::config::{FailPolicy, GatewayConfig};
use umbrella_gateway::identity::{Directory, StaticDirectory};
use umbrella_gateway::pipeline::{Gateway, GatewayRequest, PipelineState};
use umbrella_gateway::ratelimit::{CounterStore, StoreError, WindowKey};
use umbrella_gateway::tier::{Capability, Endpoint, Tier, TierLimits, TierPolicy};
use umbrella_gateway::upstream::{FetchError, StaticProvider, WeatherProvider, WeatherSnapshot};

/// Provider that answers after a fixed delay.
#[derive(Debug)]
struct SlowProvider {
    delay: Duration,
    calls: AtomicU64,
}

impl SlowProvider {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU64::new(0),
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for SlowProvider {
    async fn fetch(&self, city: &str, _tier: Tier) -> Result<WeatherSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(WeatherSnapshot::new(city, 7.0, "fog"))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Provider that fails every fetch with a fixed error.
#[derive(Debug)]
struct BrokenProvider {
    error: FetchError,
    calls: AtomicU64,
}

impl BrokenProvider {
    fn new(error: FetchError) -> Self {
        Self {
            error,
            calls: AtomicU64::new(0),
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for BrokenProvider {
    async fn fetch(&self, _city: &str, _tier: Tier) -> Result<WeatherSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Counter store that is permanently unreachable.
#[derive(Debug)]
struct DownStore;

impl CounterStore for DownStore {
    fn increment(&self, _key: &WindowKey) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn count(&self, _key: &WindowKey) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn prune(&self, _started_before: u64) -> usize {
        0
    }

    fn window_count(&self) -> usize {
        0
    }
}

fn directory_with_all_tiers() -> Arc<StaticDirectory> {
    let directory = Arc::new(StaticDirectory::new());
    directory.insert("free-key", "free user", Tier::Free);
    directory.insert("premium-key", "premium user", Tier::Premium);
    directory.insert("enterprise-key", "enterprise user", Tier::Enterprise);
    directory
}

fn provider_with_oslo() -> Arc<StaticProvider> {
    let provider = Arc::new(StaticProvider::new());
    provider.insert(
        WeatherSnapshot::new("Oslo", 4.5, "sleet")
            .with_air_quality(31)
            .with_uv_index(1.2),
    );
    provider
}

/// Free tier with a budget of two requests per minute.
fn tight_free_policy() -> TierPolicy {
    TierPolicy::empty().with_tier(
        Tier::Free,
        TierLimits::new(2, Duration::from_secs(60)).with_capability(Capability::Current),
    )
}

#[tokio::test]
async fn test_budget_spent_and_restored_across_windows() {
    let mut config = GatewayConfig::default();
    config.tiers = tight_free_policy();
    let clock = Arc::new(ManualClock::new(30));

    let gateway = Gateway::builder(config)
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build();

    let request = GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key");

    let first = gateway.handle(request.clone()).await;
    assert_eq!(first.status.as_u16(), 200);
    assert_eq!(first.envelope.as_success().unwrap().rate_limit.remaining, 1);

    let second = gateway.handle(request.clone()).await;
    assert_eq!(second.envelope.as_success().unwrap().rate_limit.remaining, 0);

    let third = gateway.handle(request.clone()).await;
    assert_eq!(third.status.as_u16(), 429);
    assert_eq!(third.state, PipelineState::RejectedRate);
    let rejection = third.envelope.as_rejection().unwrap();
    assert_eq!(rejection.error, "rate_limit_exceeded");
    // Window [0, 60) at t = 30.
    assert_eq!(rejection.retry_after, Some(30));

    // Next window, full budget again.
    clock.advance(Duration::from_secs(60));
    let fourth = gateway.handle(request).await;
    assert_eq!(fourth.status.as_u16(), 200);
    assert_eq!(fourth.envelope.as_success().unwrap().rate_limit.remaining, 1);

    let stats = gateway.limiter().stats();
    assert_eq!(stats.checked, 4);
    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.denied, 1);
}

#[tokio::test]
async fn test_cache_serves_until_ttl_expires() {
    let provider = provider_with_oslo();
    let clock = Arc::new(ManualClock::new(0));

    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build();

    let request = GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key");

    let miss = gateway.handle(request.clone()).await;
    assert!(!miss.envelope.as_success().unwrap().cached);
    assert_eq!(provider.fetch_count(), 1);

    // Well inside the default five-minute TTL.
    clock.advance(Duration::from_secs(100));
    let hit = gateway.handle(request.clone()).await;
    assert!(hit.envelope.as_success().unwrap().cached);
    assert_eq!(provider.fetch_count(), 1);

    // Past it.
    clock.advance(Duration::from_secs(300));
    let refetched = gateway.handle(request).await;
    assert!(!refetched.envelope.as_success().unwrap().cached);
    assert_eq!(provider.fetch_count(), 2);

    let stats = gateway.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.expired, 1);
}

#[tokio::test]
async fn test_concurrent_misses_coalesce_into_one_fetch() {
    let provider = Arc::new(SlowProvider::new(Duration::from_millis(20)));

    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .build();

    let request = GatewayRequest::new(Endpoint::Current, "Bergen").with_credential("premium-key");
    let (a, b, c, d) = tokio::join!(
        gateway.handle(request.clone()),
        gateway.handle(request.clone()),
        gateway.handle(request.clone()),
        gateway.handle(request)
    );

    for response in [&a, &b, &c, &d] {
        let success = response.envelope.as_success().unwrap();
        assert_eq!(success.data.city, "Bergen");
        // Nobody in a coalesced flight counts as a cache hit.
        assert!(!success.cached);
    }
    assert_eq!(provider.calls(), 1);

    let stats = gateway.cache().stats();
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.coalesced, 3);

    // A fifth request lands on the stored entry.
    let fifth = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Bergen").with_credential("premium-key"))
        .await;
    assert!(fifth.envelope.as_success().unwrap().cached);
}

#[tokio::test]
async fn test_store_outage_fail_open_admits() {
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .with_counter_store(Arc::new(DownStore))
        .build();

    let request = GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key");
    for _ in 0..5 {
        let response = gateway.handle(request.clone()).await;
        assert_eq!(response.status.as_u16(), 200);
        // Admitted on the fail-open path: a full budget minus this request.
        assert_eq!(response.envelope.as_success().unwrap().rate_limit.remaining, 99);
    }

    assert_eq!(gateway.limiter().stats().store_failures, 5);
    assert_eq!(gateway.limiter().stats().admitted, 5);
}

#[tokio::test]
async fn test_store_outage_fail_closed_denies() {
    let mut config = GatewayConfig::default();
    config.rate_limit.fail_policy = FailPolicy::Closed;

    let gateway = Gateway::builder(config)
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .with_counter_store(Arc::new(DownStore))
        .build();

    let response = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key"))
        .await;

    assert_eq!(response.status.as_u16(), 429);
    assert_eq!(response.state, PipelineState::RejectedRate);
    assert_eq!(gateway.limiter().stats().store_failures, 1);
    assert_eq!(gateway.limiter().stats().denied, 1);
}

#[tokio::test]
async fn test_capability_matrix_across_tiers() {
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .build();

    let cases = [
        ("free-key", Endpoint::Current, 200),
        ("free-key", Endpoint::Forecast, 403),
        ("free-key", Endpoint::Historical, 403),
        ("premium-key", Endpoint::Forecast, 200),
        ("premium-key", Endpoint::Alerts, 200),
        ("premium-key", Endpoint::Historical, 403),
        ("enterprise-key", Endpoint::Historical, 200),
    ];

    for (credential, endpoint, expected) in cases {
        let response = gateway
            .handle(GatewayRequest::new(endpoint, "Oslo").with_credential(credential))
            .await;
        assert_eq!(
            response.status.as_u16(),
            expected,
            "{credential} on {endpoint}"
        );
    }
}

#[tokio::test]
async fn test_capability_denials_consume_their_own_window() {
    let mut config = GatewayConfig::default();
    config.tiers = tight_free_policy();
    let clock = Arc::new(ManualClock::new(30));

    let gateway = Gateway::builder(config)
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build();

    let forecast = GatewayRequest::new(Endpoint::Forecast, "Oslo").with_credential("free-key");

    // Two capability rejections drain the forecast window.
    for _ in 0..2 {
        let response = gateway.handle(forecast.clone()).await;
        assert_eq!(response.status.as_u16(), 403);
    }

    // The third forecast request is stopped by the limiter, not the gate.
    let third = gateway.handle(forecast).await;
    assert_eq!(third.status.as_u16(), 429);
    assert_eq!(third.state, PipelineState::RejectedRate);
    assert_eq!(third.envelope.as_rejection().unwrap().error, "rate_limit_exceeded");

    // The current-weather window is untouched.
    let current = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key"))
        .await;
    assert_eq!(current.envelope.as_success().unwrap().rate_limit.remaining, 1);
}

#[tokio::test]
async fn test_free_tier_payload_is_trimmed_and_cached_separately() {
    let provider = provider_with_oslo();

    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .build();

    let premium = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;
    let premium_data = &premium.envelope.as_success().unwrap().data;
    assert_eq!(premium_data.air_quality_index, Some(31));
    assert_eq!(premium_data.uv_index, Some(1.2));

    let free = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key"))
        .await;
    let free_data = &free.envelope.as_success().unwrap().data;
    assert_eq!(free_data.air_quality_index, None);
    assert_eq!(free_data.uv_index, None);

    // Different tiers never share entries.
    assert!(!free.envelope.as_success().unwrap().cached);
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test]
async fn test_upstream_timeout_maps_to_bad_gateway() {
    let mut config = GatewayConfig::default();
    config.upstream.timeout = Duration::from_millis(50);

    let provider = Arc::new(SlowProvider::new(Duration::from_secs(30)));
    let gateway = Gateway::builder(config)
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .build();

    let response = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;

    assert_eq!(response.status.as_u16(), 502);
    assert_eq!(response.state, PipelineState::RejectedFetch);
    assert_eq!(
        response.envelope.as_rejection().unwrap().error,
        "upstream_timeout"
    );
    // A timed-out computation leaves nothing behind.
    assert_eq!(gateway.cache().entry_count(), 0);
}

#[tokio::test]
async fn test_unavailable_upstream_is_retried_then_rejected() {
    let provider = Arc::new(BrokenProvider::new(FetchError::UpstreamUnavailable));

    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .build();

    let response = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;

    assert_eq!(response.status.as_u16(), 502);
    assert_eq!(
        response.envelope.as_rejection().unwrap().error,
        "upstream_unavailable"
    );
    // Default budget is one retry: the original attempt plus one more.
    assert_eq!(provider.calls(), 2);

    // A later request tries again; failures are never cached.
    gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn test_upstream_over_limit_is_not_retried() {
    let provider = Arc::new(BrokenProvider::new(FetchError::UpstreamRateLimited));

    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(Arc::clone(&provider) as Arc<dyn WeatherProvider>)
        .build();

    let response = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;

    assert_eq!(response.status.as_u16(), 503);
    assert_eq!(
        response.envelope.as_rejection().unwrap().error,
        "upstream_rate_limited"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_envelope_wire_shapes() {
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .build();

    let served = gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;
    let body = serde_json::to_value(&served.envelope).unwrap();
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["cached", "data", "rate_limit", "tier"]);
    assert_eq!(body["data"]["city"], "Oslo");
    assert_eq!(body["data"]["temperature_c"], 4.5);
    assert_eq!(body["tier"], "premium");

    let rejected = gateway.handle(GatewayRequest::new(Endpoint::Current, "Oslo")).await;
    let body = serde_json::to_value(&rejected.envelope).unwrap();
    let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
    // No retry_after on a non-rate-limit rejection.
    assert_eq!(keys, ["error", "message"]);
    assert_eq!(body["error"], "missing_api_key");
}

#[tokio::test]
async fn test_usage_summary_reflects_traffic() {
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .build();

    for _ in 0..3 {
        gateway
            .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
            .await;
    }
    gateway
        .handle(GatewayRequest::new(Endpoint::Forecast, "Oslo").with_credential("premium-key"))
        .await;
    // Different identity, not part of the summary below.
    gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("free-key"))
        .await;

    // The writer drains the queue asynchronously.
    for _ in 0..200 {
        if gateway.usage().record_count() >= 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let summary = gateway
        .usage()
        .summarize("premium-key", Duration::from_secs(3_600));
    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.per_endpoint.get(&Endpoint::Current), Some(&3));
    assert_eq!(summary.per_endpoint.get(&Endpoint::Forecast), Some(&1));
}

#[tokio::test]
async fn test_maintenance_sweeps_expired_entries() {
    let mut config = GatewayConfig::default();
    config.cache.sweep_interval = Duration::from_millis(25);
    let clock = Arc::new(ManualClock::new(0));

    let gateway = Gateway::builder(config)
        .with_directory(directory_with_all_tiers())
        .with_provider(provider_with_oslo())
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .build();

    gateway
        .handle(GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key"))
        .await;
    assert_eq!(gateway.cache().entry_count(), 1);

    gateway.spawn_maintenance();
    clock.advance(Duration::from_secs(400));

    for _ in 0..200 {
        if gateway.cache().entry_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(gateway.cache().entry_count(), 0);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_deactivated_key_is_rejected() {
    let directory = directory_with_all_tiers();
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(Arc::clone(&directory) as Arc<dyn Directory>)
        .with_provider(provider_with_oslo())
        .build();

    let request = GatewayRequest::new(Endpoint::Current, "Oslo").with_credential("premium-key");
    assert_eq!(gateway.handle(request.clone()).await.status.as_u16(), 200);

    assert!(directory.deactivate("premium-key"));
    let response = gateway.handle(request).await;
    assert_eq!(response.status.as_u16(), 401);
    assert_eq!(
        response.envelope.as_rejection().unwrap().error,
        "invalid_api_key"
    );
}

#[tokio::test]
async fn test_plan_upgrade_applies_on_next_request() {
    let directory = directory_with_all_tiers();
    let gateway = Gateway::builder(GatewayConfig::default())
        .with_directory(Arc::clone(&directory) as Arc<dyn Directory>)
        .with_provider(provider_with_oslo())
        .build();

    let request = GatewayRequest::new(Endpoint::Forecast, "Oslo").with_credential("free-key");
    assert_eq!(gateway.handle(request.clone()).await.status.as_u16(), 403);

    assert!(directory.set_tier("free-key", Tier::Premium));
    let upgraded = gateway.handle(request).await;
    assert_eq!(upgraded.status.as_u16(), 200);
    assert_eq!(upgraded.envelope.as_success().unwrap().tier, Tier::Premium);
}
