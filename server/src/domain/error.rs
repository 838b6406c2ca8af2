//! Domain error taxonomy
//!
//! Stable error codes surfaced by the workflow services. The account
//! lifecycle maps credential-store failures onto these; the API layer maps
//! them onto HTTP statuses without re-interpreting.

use thiserror::Error;

use crate::data::credentials::{CredentialError, MIN_PASSWORD_LEN};
use crate::data::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum DomainError {
    /// The email already has a credential-store identity.
    #[error("an account already exists for this email")]
    AccountExists,

    /// The email has an identity whose password could not be verified as
    /// matching the requested one. Requires out-of-band resolution.
    #[error("email has an existing credential with a different password")]
    AuthExistsConflict,

    #[error("password too weak: minimum {MIN_PASSWORD_LEN} characters")]
    WeakSecret,

    /// A directory write failed. When it followed a fresh identity
    /// creation in the same operation, the identity was rolled back.
    #[error("profile write failed: {0}")]
    ProfileWriteFailed(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential store error: {0}")]
    Credential(#[source] CredentialError),
}

impl DomainError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::AccountExists => "ACCOUNT_EXISTS",
            DomainError::AuthExistsConflict => "AUTH_EXISTS_CONFLICT",
            DomainError::WeakSecret => "WEAK_SECRET",
            DomainError::ProfileWriteFailed(_) => "PROFILE_WRITE_FAILED",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::PermissionDenied(_) => "PERMISSION_DENIED",
            DomainError::InvalidInput(_) => "INVALID_INPUT",
            DomainError::Credential(_) => "CREDENTIAL_ERROR",
        }
    }

    pub fn not_found(what: &'static str) -> Self {
        DomainError::NotFound(what)
    }

    pub fn permission_denied(what: &'static str) -> Self {
        DomainError::PermissionDenied(what)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        DomainError::InvalidInput(msg.into())
    }
}

impl From<CredentialError> for DomainError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::EmailInUse => DomainError::AccountExists,
            CredentialError::WeakPassword => DomainError::WeakSecret,
            CredentialError::NotFound => DomainError::NotFound("identity"),
            other => DomainError::Credential(other),
        }
    }
}

impl From<DirectoryError> for DomainError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(what) => DomainError::NotFound(what),
            DirectoryError::WriteFailed(msg) => DomainError::ProfileWriteFailed(msg),
            DirectoryError::InvalidArgument(msg) => DomainError::InvalidInput(msg),
        }
    }
}
