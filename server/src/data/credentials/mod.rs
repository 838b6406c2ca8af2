//! Credential store abstraction
//!
//! Models the hosted authentication provider: (email, password) pairs
//! mapped to opaque identity ids. Application code never addresses a
//! credential directly; everything goes through create / sign-in / delete.

mod context;
mod memory;

pub use context::IsolatedContext;
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;
use thiserror::Error;

/// Minimum password length enforced by the provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors surfaced by the credential store, mirroring the provider's
/// failure codes.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("email is already registered")]
    EmailInUse,

    #[error("password too weak: minimum {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("no identity registered for this email")]
    NotFound,

    #[error("too many failed attempts, try again later")]
    TooManyRequests,

    #[error("credential store unreachable: {0}")]
    Network(String),

    #[error("operation not supported by the provider: {0}")]
    Unsupported(String),
}

/// Credential store operations.
///
/// Deliberately context-free: signed-in state lives in the handles built
/// on top ([`IsolatedContext`] for per-operation admin work, the process
/// session state for the primary login), so a trial sign-in from an
/// isolated context can never disturb anyone else's session.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Register a new identity. Fails with [`CredentialError::EmailInUse`]
    /// if the email already has a credential.
    async fn create(&self, email: &str, password: &str) -> Result<String, CredentialError>;

    /// Validate a credential and return the identity id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, CredentialError>;

    /// Delete an identity. Best-effort: the provider may not support
    /// deleting an identity the caller is not signed in as, in which case
    /// [`CredentialError::Unsupported`] is returned.
    async fn delete(&self, identity_id: &str) -> Result<(), CredentialError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
