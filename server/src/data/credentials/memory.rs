//! In-memory credential store
//!
//! Email → (identity id, password hash) map guarded by a `parking_lot`
//! lock. Passwords are stored as salted SHA-256 hashes and compared in
//! constant time; repeated sign-in failures per email trip a lockout that
//! maps to `TooManyRequests`, like the hosted provider's throttling.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::{CredentialError, CredentialStore, MIN_PASSWORD_LEN};
use crate::utils::crypto;

/// Failed sign-in attempts per email before throttling kicks in.
const MAX_FAILED_ATTEMPTS: u32 = 10;

struct IdentityRecord {
    id: String,
    salt: [u8; 16],
    password_hash: [u8; 32],
    failed_attempts: u32,
}

impl IdentityRecord {
    fn new(password: &str) -> Self {
        let salt = crypto::generate_salt();
        Self {
            id: Uuid::new_v4().to_string(),
            salt,
            password_hash: crypto::hash_password(password, &salt),
            failed_attempts: 0,
        }
    }

    fn password_matches(&self, candidate: &str) -> bool {
        let candidate_hash = crypto::hash_password(candidate, &self.salt);
        candidate_hash.ct_eq(&self.password_hash).into()
    }
}

/// In-memory [`CredentialStore`] implementation.
#[derive(Default)]
pub struct MemoryCredentialStore {
    // Keyed by normalized (trimmed, lowercased) email.
    identities: RwLock<HashMap<String, IdentityRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let email = Self::normalize(email);
        if email.is_empty() || !email.contains('@') {
            return Err(CredentialError::InvalidCredential);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(CredentialError::WeakPassword);
        }

        let mut identities = self.identities.write();
        if identities.contains_key(&email) {
            return Err(CredentialError::EmailInUse);
        }

        let record = IdentityRecord::new(password);
        let id = record.id.clone();
        identities.insert(email.clone(), record);

        tracing::debug!(email = %email, "Identity created");
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let email = Self::normalize(email);
        let mut identities = self.identities.write();

        let record = identities
            .get_mut(&email)
            .ok_or(CredentialError::NotFound)?;

        if record.failed_attempts >= MAX_FAILED_ATTEMPTS {
            return Err(CredentialError::TooManyRequests);
        }

        if !record.password_matches(password) {
            record.failed_attempts += 1;
            return Err(CredentialError::InvalidCredential);
        }

        record.failed_attempts = 0;
        Ok(record.id.clone())
    }

    async fn delete(&self, identity_id: &str) -> Result<(), CredentialError> {
        let mut identities = self.identities.write();
        let email = identities
            .iter()
            .find(|(_, record)| record.id == identity_id)
            .map(|(email, _)| email.clone())
            .ok_or(CredentialError::NotFound)?;

        identities.remove(&email);
        tracing::debug!(email = %email, "Identity deleted");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
