//! Credential-to-identity resolution.

use super::directory::Directory;
use super::error::{AuthError, AuthResult};
use super::Identity;
use crate::tier::Tier;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Resolution counters.
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Successful resolutions.
    resolved: AtomicU64,
    /// Requests with no credential.
    missing: AtomicU64,
    /// Credentials with no active identity.
    invalid: AtomicU64,
}

impl ResolverStats {
    /// Take a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            resolved: self.resolved.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`ResolverStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    /// Successful resolutions.
    pub resolved: u64,
    /// Requests with no credential.
    pub missing: u64,
    /// Credentials with no active identity.
    pub invalid: u64,
}

/// Resolves request credentials against a [`Directory`].
///
/// Every resolution is a fresh directory lookup; tier data is never cached
/// here, so a plan change in the directory takes effect on the next request.
#[derive(Debug)]
pub struct IdentityResolver {
    directory: Arc<dyn Directory>,
    stats: ResolverStats,
}

impl IdentityResolver {
    /// Create a resolver over the given directory.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            stats: ResolverStats::default(),
        }
    }

    /// Resolve a credential to its identity and current tier.
    ///
    /// On success the identity's last-used timestamp is touched in a spawned
    /// task; that write never delays or fails the resolution itself.
    pub async fn resolve(&self, credential: Option<&str>) -> AuthResult<(Identity, Tier)> {
        let credential = match credential {
            Some(c) if !c.trim().is_empty() => c,
            _ => {
                self.stats.missing.fetch_add(1, Ordering::Relaxed);
                return Err(AuthError::MissingCredential);
            }
        };

        match self.directory.lookup(credential).await {
            Some((identity, tier)) => {
                let directory = Arc::clone(&self.directory);
                let key = credential.to_string();
                tokio::spawn(async move {
                    directory.touch_last_used(&key).await;
                });

                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                debug!(user = %identity.user, tier = %tier, "credential resolved");
                Ok((identity, tier))
            }
            None => {
                self.stats.invalid.fetch_add(1, Ordering::Relaxed);
                Err(AuthError::InvalidCredential)
            }
        }
    }

    /// Resolution counters.
    #[must_use]
    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }
}
