//! Isolated credential context
//!
//! A disposable, unauthenticated-by-default handle to the credential
//! store, created per admin operation and discarded afterward. Creating or
//! trial-signing-in a third-party identity through it never touches the
//! caller's own session, so the admin stays signed in while provisioning
//! accounts for others.

use std::sync::Arc;

use super::{CredentialError, CredentialStore};

pub struct IsolatedContext {
    store: Arc<dyn CredentialStore>,
    signed_in: Option<String>,
}

impl IsolatedContext {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            signed_in: None,
        }
    }

    /// Create a new identity; the context is signed in as it afterwards,
    /// which is what allows the compensating delete on rollback.
    pub async fn create(&mut self, email: &str, password: &str) -> Result<String, CredentialError> {
        let id = self.store.create(email, password).await?;
        self.signed_in = Some(id.clone());
        Ok(id)
    }

    /// Trial sign-in. Used to test whether an existing identity's password
    /// already equals a candidate without mutating anything.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<String, CredentialError> {
        let id = self.store.sign_in(email, password).await?;
        self.signed_in = Some(id.clone());
        Ok(id)
    }

    /// Delete the identity this context is signed in as. Compensating
    /// action for a failed profile write after a fresh create.
    pub async fn delete_signed_in(&mut self) -> Result<(), CredentialError> {
        match self.signed_in.take() {
            Some(id) => self.store.delete(&id).await,
            None => Ok(()),
        }
    }

    pub fn sign_out(&mut self) {
        self.signed_in = None;
    }
}
