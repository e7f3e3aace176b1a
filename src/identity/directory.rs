//! Directory backends mapping credentials to identities.

use super::Identity;
use crate::clock::{Clock, SystemClock};
use crate::tier::Tier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// External directory of API consumers.
///
/// The directory owns identities and their tiers; the gateway only reads
/// them. `lookup` must reflect the current tier on every call so that limit
/// enforcement never runs against stale plan data.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a credential to its identity and current tier.
    ///
    /// Returns `None` for unknown or deactivated credentials.
    async fn lookup(&self, credential: &str) -> Option<(Identity, Tier)>;

    /// Record that a credential was just used.
    ///
    /// Best-effort; implementations log and swallow their own failures.
    async fn touch_last_used(&self, credential: &str);

    /// Backend name for logging.
    fn name(&self) -> &str;
}

impl std::fmt::Debug for dyn Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Directory({})", self.name())
    }
}

/// A key record held by the in-memory directory.
#[derive(Debug, Clone)]
struct KeyRecord {
    /// Owning user.
    user: String,
    /// Current subscription tier.
    tier: Tier,
    /// Deactivated keys stay in the map so old usage records remain valid.
    active: bool,
    /// Last use, epoch seconds.
    last_used: Option<u64>,
}

/// In-memory directory backend.
#[derive(Debug)]
pub struct StaticDirectory {
    keys: RwLock<HashMap<String, KeyRecord>>,
    clock: Arc<dyn Clock>,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDirectory {
    /// Create an empty directory on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create an empty directory on the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a credential.
    pub fn insert(&self, credential: impl Into<String>, user: impl Into<String>, tier: Tier) {
        let mut keys = self.keys.write().expect("directory lock poisoned");
        keys.insert(
            credential.into(),
            KeyRecord {
                user: user.into(),
                tier,
                active: true,
                last_used: None,
            },
        );
    }

    /// Change the tier of an existing credential.
    ///
    /// Returns `false` when the credential is unknown.
    pub fn set_tier(&self, credential: &str, tier: Tier) -> bool {
        let mut keys = self.keys.write().expect("directory lock poisoned");
        match keys.get_mut(credential) {
            Some(record) => {
                record.tier = tier;
                true
            }
            None => false,
        }
    }

    /// Soft-revoke a credential.
    ///
    /// Returns `false` when the credential is unknown.
    pub fn deactivate(&self, credential: &str) -> bool {
        let mut keys = self.keys.write().expect("directory lock poisoned");
        match keys.get_mut(credential) {
            Some(record) => {
                record.active = false;
                true
            }
            None => false,
        }
    }

    /// Last-used timestamp of a credential, epoch seconds.
    #[must_use]
    pub fn last_used(&self, credential: &str) -> Option<u64> {
        let keys = self.keys.read().expect("directory lock poisoned");
        keys.get(credential).and_then(|record| record.last_used)
    }

    /// Number of registered credentials, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().expect("directory lock poisoned").len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn lookup(&self, credential: &str) -> Option<(Identity, Tier)> {
        let keys = self.keys.read().expect("directory lock poisoned");
        match keys.get(credential) {
            Some(record) if record.active => Some((
                Identity::new(credential, &record.user),
                record.tier,
            )),
            Some(_) => {
                tracing::debug!("lookup hit a deactivated credential");
                None
            }
            None => None,
        }
    }

    async fn touch_last_used(&self, credential: &str) {
        let now = self.clock.epoch_secs();
        let mut keys = self.keys.write().expect("directory lock poisoned");
        if let Some(record) = keys.get_mut(credential) {
            record.last_used = Some(now);
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
