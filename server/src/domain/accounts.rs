//! Account lifecycle workflow
//!
//! Keeps exactly one credential-store identity paired with exactly one
//! profile record per logical account, across the three admin operations:
//! create, migrate (email change), and repair-or-set-password. Credential
//! work for third parties always goes through a disposable
//! [`IsolatedContext`] so the caller's own session is never disturbed.
//!
//! Only the create path is transactional in spirit: a failed profile write
//! after a fresh identity creation is compensated by deleting the identity.
//! Migration is a documented non-atomic four-step sequence; an
//! interruption between its copy and delete steps leaves duplicated child
//! records under both ids until an admin re-runs the deletion.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::error::DomainError;
use crate::data::credentials::{CredentialError, CredentialStore, IsolatedContext, MIN_PASSWORD_LEN};
use crate::data::directory::DirectoryStore;
use crate::data::types::{NewAccount, PharmacyProfile, ProfileRecord, Role};

/// Outcome of a successful repair-or-set-password operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairOutcome {
    /// The pairing is intact: either a fresh identity was created for the
    /// email, or the existing identity already had the requested password.
    Restored,
}

/// Re-read the caller's own profile and require the admin role.
///
/// The check deliberately ignores whatever role the client claims to hold;
/// only the stored record counts.
pub(crate) async fn ensure_admin(
    directory: &dyn DirectoryStore,
    caller_id: &str,
) -> Result<ProfileRecord, DomainError> {
    let profile = directory
        .get_profile(caller_id)
        .await?
        .ok_or(DomainError::PermissionDenied("admin role required"))?;
    if profile.role != Role::Admin {
        return Err(DomainError::PermissionDenied("admin role required"));
    }
    Ok(profile)
}

pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl AccountService {
    pub fn new(credentials: Arc<dyn CredentialStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            credentials,
            directory,
        }
    }

    /// Self-service registration. Same pairing flow as the admin create,
    /// without the role gate.
    pub async fn register(
        &self,
        account: &NewAccount,
        password: &str,
    ) -> Result<ProfileRecord, DomainError> {
        self.create_paired(account, password).await
    }

    /// Admin-only: create an account for a third party.
    pub async fn create_account(
        &self,
        caller_id: &str,
        account: &NewAccount,
        password: &str,
    ) -> Result<ProfileRecord, DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;
        self.create_paired(account, password).await
    }

    /// Create identity + profile (+ pharmacy sub-record) as a pair.
    ///
    /// Rollback contract: if any directory write fails after the identity
    /// was created, the identity is deleted again and the error surfaces
    /// as `PROFILE_WRITE_FAILED`. An email that already has a credential
    /// fails with `ACCOUNT_EXISTS` before anything is created, so no
    /// rollback applies there.
    async fn create_paired(
        &self,
        account: &NewAccount,
        password: &str,
    ) -> Result<ProfileRecord, DomainError> {
        // Reject weak passwords before touching either store.
        if password.len() < MIN_PASSWORD_LEN {
            return Err(DomainError::WeakSecret);
        }

        let mut ctx = IsolatedContext::new(self.credentials.clone());
        let identity_id = ctx.create(account.email(), password).await?;

        let profile = account.to_profile(&identity_id, Utc::now());
        if let Err(e) = self.directory.put_profile(&profile).await {
            self.rollback_identity(&mut ctx, account.email()).await;
            return Err(DomainError::ProfileWriteFailed(e.to_string()));
        }

        if let Some(pharmacy) = account.to_pharmacy_profile(&identity_id) {
            if let Err(e) = self.directory.put_pharmacy(&pharmacy).await {
                // Undo both writes so no half-paired account survives.
                if let Err(del) = self.directory.delete_profile(&identity_id).await {
                    tracing::warn!(error = %del, "Profile cleanup after failed pharmacy write failed");
                }
                self.rollback_identity(&mut ctx, account.email()).await;
                return Err(DomainError::ProfileWriteFailed(e.to_string()));
            }
        }

        ctx.sign_out();
        tracing::info!(id = %profile.id, role = %profile.role, "Account created");
        Ok(profile)
    }

    async fn rollback_identity(&self, ctx: &mut IsolatedContext, email: &str) {
        match ctx.delete_signed_in().await {
            Ok(()) => tracing::info!(email = %email, "Rolled back freshly created identity"),
            Err(e) => tracing::error!(
                email = %email,
                error = %e,
                "Identity rollback failed, orphaned credential remains"
            ),
        }
    }

    /// Admin-only: migrate an account to a new email.
    ///
    /// An email change is a new identity. Steps, in order: create the new
    /// account, resolve its id by email, copy role-specific child records
    /// verbatim, delete the old account. Steps after the first are not
    /// covered by any rollback.
    pub async fn migrate_account(
        &self,
        caller_id: &str,
        old_id: &str,
        account: &NewAccount,
        new_password: &str,
    ) -> Result<ProfileRecord, DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;

        if new_password.is_empty() {
            return Err(DomainError::invalid_input(
                "email change requires a new password",
            ));
        }

        let old_profile = self
            .directory
            .get_profile(old_id)
            .await?
            .ok_or(DomainError::NotFound("profile"))?;

        // Step 1: create the new pairing. A failure here aborts the whole
        // migration with nothing moved.
        self.create_paired(account, new_password).await?;

        // Step 2: resolve the new identity id through the directory.
        let new_profile = self
            .directory
            .find_profile_by_email(account.email())
            .await?
            .ok_or(DomainError::NotFound("migrated profile"))?;

        // Step 3: copy role-specific child collections, ids preserved.
        match account.role() {
            Role::Pharmacy => {
                let copied = self.directory.copy_stock(old_id, &new_profile.id).await?;
                tracing::debug!(copied, old_id, new_id = %new_profile.id, "Stock migrated");
            }
            Role::User => {
                let copied = self
                    .directory
                    .copy_saved_requests(old_id, &new_profile.id)
                    .await?;
                tracing::debug!(copied, old_id, new_id = %new_profile.id, "Saved requests migrated");
            }
            _ => {}
        }

        // Step 4: remove the old account. The old credential may not be
        // deletable without its session; that residue is accepted.
        self.directory.delete_profile(old_id).await?;
        if let Err(e) = self.credentials.delete(old_id).await {
            tracing::warn!(
                old_id,
                error = %e,
                "Old identity not deleted, residual credential remains"
            );
        }

        tracing::info!(
            old_id,
            new_id = %new_profile.id,
            old_email = %old_profile.email,
            new_email = %new_profile.email,
            "Account migrated"
        );
        Ok(new_profile)
    }

    /// Admin-only: same-email edit with a new password.
    ///
    /// The profile is written first so edits survive any credential
    /// failure. Then the pairing is repaired: a fresh identity is created
    /// if the email has none, or a trial sign-in verifies the existing
    /// identity already holds the requested password. A verifiably
    /// different password is a hard `AUTH_EXISTS_CONFLICT`; the credential
    /// store cannot overwrite a password for an identity it is not signed
    /// in as.
    pub async fn repair_or_set_password(
        &self,
        caller_id: &str,
        target_id: &str,
        account: &NewAccount,
        new_password: &str,
    ) -> Result<RepairOutcome, DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;

        let existing = self
            .directory
            .get_profile(target_id)
            .await?
            .ok_or(DomainError::NotFound("profile"))?;

        // Step 1: persist the profile edit before any credential work.
        let mut profile = account.to_profile(target_id, existing.created_at);
        profile.created_at = existing.created_at;
        self.directory.put_profile(&profile).await?;

        if let Some(pharmacy) = account.to_pharmacy_profile(target_id) {
            let preserved = self.preserve_rating(pharmacy).await?;
            self.directory.put_pharmacy(&preserved).await?;
        }

        // Step 2: repair the credential pairing.
        let mut ctx = IsolatedContext::new(self.credentials.clone());
        match ctx.create(account.email(), new_password).await {
            Ok(_) => {
                ctx.sign_out();
                tracing::info!(target_id, "Credential restored with a fresh identity");
                Ok(RepairOutcome::Restored)
            }
            Err(CredentialError::EmailInUse) => {
                // Trial sign-in: only tests whether the existing password
                // already equals the candidate. Never mutates anything.
                match ctx.sign_in(account.email(), new_password).await {
                    Ok(_) => {
                        ctx.sign_out();
                        tracing::info!(target_id, "Existing credential already matches");
                        Ok(RepairOutcome::Restored)
                    }
                    Err(CredentialError::InvalidCredential) => {
                        tracing::warn!(
                            target_id,
                            "Existing credential has a different password, manual resolution required"
                        );
                        Err(DomainError::AuthExistsConflict)
                    }
                    Err(other) => Err(other.into()),
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Keep the stored rating aggregate when an admin edit rewrites the
    /// pharmacy sub-record; only the aggregator may change it.
    async fn preserve_rating(
        &self,
        mut pharmacy: PharmacyProfile,
    ) -> Result<PharmacyProfile, DomainError> {
        if let Some(current) = self.directory.get_pharmacy(&pharmacy.id).await? {
            pharmacy.rating = current.rating;
            pharmacy.reviews_count = current.reviews_count;
        }
        Ok(pharmacy)
    }

    /// Admin-only: delete an account's directory records. The credential
    /// delete is best-effort.
    pub async fn delete_account(&self, caller_id: &str, target_id: &str) -> Result<(), DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;

        self.directory
            .get_profile(target_id)
            .await?
            .ok_or(DomainError::NotFound("profile"))?;
        self.directory.delete_profile(target_id).await?;

        if let Err(e) = self.credentials.delete(target_id).await {
            tracing::warn!(target_id, error = %e, "Identity not deleted, residual credential remains");
        }

        tracing::info!(target_id, "Account deleted");
        Ok(())
    }

    /// Admin-only: list every profile record.
    pub async fn list_accounts(&self, caller_id: &str) -> Result<Vec<ProfileRecord>, DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;
        Ok(self.directory.list_profiles().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::credentials::MemoryCredentialStore;
    use crate::data::directory::MemoryDirectoryStore;
    use crate::data::types::{AvailabilityStatus, NewContactAccount, NewPharmacyAccount, StockItem};

    const ADMIN_ID: &str = "admin-1";

    async fn service() -> (AccountService, Arc<MemoryCredentialStore>, Arc<MemoryDirectoryStore>) {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let directory = Arc::new(MemoryDirectoryStore::new());

        directory
            .put_profile(&ProfileRecord {
                id: ADMIN_ID.to_string(),
                role: Role::Admin,
                name: "Admin".to_string(),
                email: "admin@x.dz".to_string(),
                phone: None,
                wilaya: None,
                commune: None,
                approved: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let service = AccountService::new(credentials.clone(), directory.clone());
        (service, credentials, directory)
    }

    fn pharmacy_account(email: &str) -> NewAccount {
        NewAccount::Pharmacy(NewPharmacyAccount {
            email: email.to_string(),
            name: "Pharmacie Centrale".to_string(),
            wilaya: "Alger".to_string(),
            commune: "Centre".to_string(),
            phone: "0550000001".to_string(),
            approved: true,
        })
    }

    fn user_account(email: &str) -> NewAccount {
        NewAccount::User(NewContactAccount {
            email: email.to_string(),
            name: "User".to_string(),
            wilaya: Some("Oran".to_string()),
            phone: None,
        })
    }

    #[tokio::test]
    async fn test_create_pairs_identity_and_profile() {
        let (service, credentials, directory) = service().await;

        let profile = service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "secret1")
            .await
            .unwrap();

        let stored = directory.get_profile(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "ph1@x.dz");
        let pharmacy = directory.get_pharmacy(&profile.id).await.unwrap().unwrap();
        assert_eq!(pharmacy.rating, 0.0);
        assert_eq!(pharmacy.reviews_count, 0);

        // The new identity signs in; the id matches the profile id.
        let id = credentials.sign_in("ph1@x.dz", "secret1").await.unwrap();
        assert_eq!(id, profile.id);
    }

    #[tokio::test]
    async fn test_non_admin_caller_denied() {
        let (service, _, directory) = service().await;
        service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();
        let user_id = directory
            .find_profile_by_email("u1@x.dz")
            .await
            .unwrap()
            .unwrap()
            .id;

        let result = service
            .create_account(&user_id, &user_account("u2@x.dz"), "secret1")
            .await;
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_weak_password_fails_before_any_write() {
        let (service, _, directory) = service().await;

        let result = service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "abc")
            .await;
        assert!(matches!(result, Err(DomainError::WeakSecret)));
        assert!(directory
            .find_profile_by_email("ph1@x.dz")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_existing_email_fails_without_rollback() {
        let (service, credentials, _) = service().await;
        service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "secret1")
            .await
            .unwrap();

        let result = service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "secret2")
            .await;
        assert!(matches!(result, Err(DomainError::AccountExists)));

        // Original credential untouched.
        assert!(credentials.sign_in("ph1@x.dz", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_profile_write_rolls_back_identity() {
        let (service, _, directory) = service().await;

        directory.inject_write_faults(1);
        let result = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await;
        assert!(matches!(result, Err(DomainError::ProfileWriteFailed(_))));

        // The identity was deleted again: a retry with the same email
        // succeeds instead of failing with ACCOUNT_EXISTS.
        service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migration_moves_stock_and_deletes_old_profile() {
        let (service, credentials, directory) = service().await;

        let old = service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "secret1")
            .await
            .unwrap();
        directory
            .put_stock_item(
                &old.id,
                &StockItem {
                    id: "m1".to_string(),
                    pharmacy_id: old.id.clone(),
                    medicine_name: "Paracetamol".to_string(),
                    availability: AvailabilityStatus::Available,
                    price: Some(250.0),
                    alternative_name: None,
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let new = service
            .migrate_account(ADMIN_ID, &old.id, &pharmacy_account("ph1-new@x.dz"), "secret2")
            .await
            .unwrap();

        // Stock arrived under the new id, verbatim.
        let stock = directory.list_stock(&new.id).await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].id, "m1");
        assert_eq!(stock[0].medicine_name, "Paracetamol");

        // Old profile no longer retrievable; new credential works.
        assert!(directory.get_profile(&old.id).await.unwrap().is_none());
        assert!(credentials.sign_in("ph1-new@x.dz", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_migration_requires_new_password() {
        let (service, _, _) = service().await;
        let old = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();

        let result = service
            .migrate_account(ADMIN_ID, &old.id, &user_account("u1-new@x.dz"), "")
            .await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_migration_create_moves_nothing() {
        let (service, _, directory) = service().await;
        let old = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();
        service
            .create_account(ADMIN_ID, &user_account("taken@x.dz"), "secret1")
            .await
            .unwrap();

        let result = service
            .migrate_account(ADMIN_ID, &old.id, &user_account("taken@x.dz"), "secret2")
            .await;
        assert!(matches!(result, Err(DomainError::AccountExists)));
        assert!(directory.get_profile(&old.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repair_creates_missing_credential() {
        let (service, credentials, directory) = service().await;

        // A profile without a credential, as after a provider-side loss.
        let orphan = ProfileRecord {
            id: "orphan-1".to_string(),
            role: Role::User,
            name: "User".to_string(),
            email: "lost@x.dz".to_string(),
            phone: None,
            wilaya: None,
            commune: None,
            approved: None,
            created_at: Utc::now(),
        };
        directory.put_profile(&orphan).await.unwrap();

        let outcome = service
            .repair_or_set_password(ADMIN_ID, "orphan-1", &user_account("lost@x.dz"), "secret9")
            .await
            .unwrap();
        assert_eq!(outcome, RepairOutcome::Restored);
        assert!(credentials.sign_in("lost@x.dz", "secret9").await.is_ok());
    }

    #[tokio::test]
    async fn test_repair_matching_password_is_restored() {
        let (service, _, _) = service().await;
        let profile = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();

        let outcome = service
            .repair_or_set_password(ADMIN_ID, &profile.id, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();
        assert_eq!(outcome, RepairOutcome::Restored);
    }

    #[tokio::test]
    async fn test_repair_conflict_still_updates_profile() {
        let (service, _, directory) = service().await;
        let profile = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();

        let edited = NewAccount::User(NewContactAccount {
            email: "u1@x.dz".to_string(),
            name: "Renamed User".to_string(),
            wilaya: Some("Blida".to_string()),
            phone: Some("0770000000".to_string()),
        });

        let result = service
            .repair_or_set_password(ADMIN_ID, &profile.id, &edited, "different-password")
            .await;
        assert!(matches!(result, Err(DomainError::AuthExistsConflict)));

        // The profile edit survived the credential conflict.
        let stored = directory.get_profile(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed User");
        assert_eq!(stored.wilaya.as_deref(), Some("Blida"));
    }

    #[tokio::test]
    async fn test_repair_preserves_rating_aggregate() {
        let (service, _, directory) = service().await;
        let profile = service
            .create_account(ADMIN_ID, &pharmacy_account("ph1@x.dz"), "secret1")
            .await
            .unwrap();

        let mut rated = directory.get_pharmacy(&profile.id).await.unwrap().unwrap();
        rated.rating = 4.5;
        rated.reviews_count = 2;
        directory.put_pharmacy(&rated).await.unwrap();

        service
            .repair_or_set_password(ADMIN_ID, &profile.id, &pharmacy_account("ph1@x.dz"), "secret1")
            .await
            .unwrap();

        let after = directory.get_pharmacy(&profile.id).await.unwrap().unwrap();
        assert_eq!(after.rating, 4.5);
        assert_eq!(after.reviews_count, 2);
    }

    #[tokio::test]
    async fn test_delete_account_frees_email() {
        let (service, _, directory) = service().await;
        let profile = service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret1")
            .await
            .unwrap();

        service.delete_account(ADMIN_ID, &profile.id).await.unwrap();
        assert!(directory.get_profile(&profile.id).await.unwrap().is_none());

        // Identity was deleted too, so the email can be reused.
        service
            .create_account(ADMIN_ID, &user_account("u1@x.dz"), "secret2")
            .await
            .unwrap();
    }
}
