//! Session manager
//!
//! Issues and validates the Bearer tokens carried by API clients. The
//! signing key is generated at boot, so sessions do not survive a restart.

use anyhow::Result;

use super::jwt::{self, JwtError, SessionClaims};
use crate::data::types::Role;
use crate::utils::crypto::generate_signing_key;

pub struct AuthManager {
    signing_key: Vec<u8>,
    session_ttl_days: u32,
}

impl AuthManager {
    pub fn new(session_ttl_days: u32) -> Self {
        Self {
            signing_key: generate_signing_key(),
            session_ttl_days,
        }
    }

    pub fn create_session(&self, user_id: &str, role: Role) -> Result<String> {
        jwt::create_session_token(&self.signing_key, user_id, role, self.session_ttl_days)
    }

    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, JwtError> {
        jwt::validate_session_token(token, &self.signing_key)
    }
}
