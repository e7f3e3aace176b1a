//! Bounded retry around the provider.

use super::error::FetchError;
use super::provider::WeatherProvider;
use super::WeatherSnapshot;
use crate::tier::Tier;
use std::sync::Arc;
use tracing::warn;

/// Fetch with a bounded number of retries.
///
/// Only [`FetchError::UpstreamUnavailable`] is retried, at most
/// `max_retries` extra attempts, each logged at warn. Every other failure
/// is final on the first attempt.
///
/// Arguments are owned so the returned future can outlive the caller's
/// borrows; the pipeline hands it to the cache as the compute step.
pub async fn fetch_with_retry(
    provider: Arc<dyn WeatherProvider>,
    city: String,
    tier: Tier,
    max_retries: u32,
) -> Result<WeatherSnapshot, FetchError> {
    let mut attempt = 0_u32;
    loop {
        match provider.fetch(&city, tier).await {
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    city = %city,
                    attempt,
                    max_retries,
                    provider = provider.name(),
                    "upstream unavailable, retrying"
                );
            }
            outcome => return outcome,
        }
    }
}
