//! Identity resolution.
//!
//! Turns a request credential into who is calling ([`Identity`]) and what
//! they are entitled to ([`crate::tier::Tier`]), via the external
//! [`Directory`] backend. Identities are owned by the directory; the
//! gateway only references them.

mod directory;
mod error;
mod resolver;

pub use directory::{Directory, StaticDirectory};
pub use error::{AuthError, AuthResult};
pub use resolver::{IdentityResolver, ResolverStats, ResolverStatsSnapshot};

/// An authenticated API consumer.
///
/// Immutable once issued; revocation happens in the directory by
/// deactivating the key, never by deleting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// The opaque credential string.
    pub key: String,
    /// The owning user.
    pub user: String,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(key: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            user: user.into(),
        }
    }
}
