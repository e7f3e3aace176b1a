//! Error types for identity resolution.

use std::fmt;

/// Result type for identity resolution.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while resolving a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was supplied with the request.
    MissingCredential,

    /// The credential maps to no active identity.
    InvalidCredential,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "API key required"),
            Self::InvalidCredential => write!(f, "invalid API key"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Check if the caller supplied no credential at all.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}
