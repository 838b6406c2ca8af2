//! Medicine catalog
//!
//! Public reads over the global medicine list; writes are admin-only and
//! go through the same server-side role re-check as the account workflows.

use std::sync::Arc;

use uuid::Uuid;

use super::accounts::ensure_admin;
use super::error::DomainError;
use crate::data::directory::DirectoryStore;
use crate::data::types::Medicine;

pub struct CatalogService {
    directory: Arc<dyn DirectoryStore>,
}

impl CatalogService {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    pub async fn list(&self) -> Result<Vec<Medicine>, DomainError> {
        Ok(self.directory.list_medicines().await?)
    }

    /// Create or update a catalog entry. An empty id means create.
    pub async fn upsert(
        &self,
        caller_id: &str,
        id: Option<&str>,
        name: &str,
        category: &str,
    ) -> Result<Medicine, DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("medicine name is required"));
        }

        let medicine = Medicine {
            id: id
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: name.to_string(),
            category: category.trim().to_string(),
        };
        self.directory.put_medicine(&medicine).await?;
        Ok(medicine)
    }

    pub async fn delete(&self, caller_id: &str, id: &str) -> Result<(), DomainError> {
        ensure_admin(self.directory.as_ref(), caller_id).await?;
        if !self.directory.delete_medicine(id).await? {
            return Err(DomainError::NotFound("medicine"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::directory::MemoryDirectoryStore;
    use crate::data::types::{ProfileRecord, Role};
    use chrono::Utc;

    async fn with_admin() -> (CatalogService, Arc<MemoryDirectoryStore>) {
        let directory = Arc::new(MemoryDirectoryStore::new());
        directory
            .put_profile(&ProfileRecord {
                id: "admin".to_string(),
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
        (CatalogService::new(directory.clone()), directory)
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let (service, _) = with_admin().await;

        let medicine = service
            .upsert("admin", None, "Paracetamol", "Analgesic")
            .await
            .unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        let renamed = service
            .upsert("admin", Some(&medicine.id), "Paracetamol 500", "Analgesic")
            .await
            .unwrap();
        assert_eq!(renamed.id, medicine.id);
        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Paracetamol 500");

        service.delete("admin", &medicine.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_require_admin() {
        let (service, directory) = with_admin().await;
        directory
            .put_profile(&ProfileRecord {
                id: "u1".to_string(),
                role: Role::User,
                name: "User".to_string(),
                email: "u1@x.dz".to_string(),
                phone: None,
                wilaya: None,
                commune: None,
                approved: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(matches!(
            service.upsert("u1", None, "Aspirin", "Analgesic").await,
            Err(DomainError::PermissionDenied(_))
        ));
        assert!(matches!(
            service.delete("u1", "m1").await,
            Err(DomainError::PermissionDenied(_))
        ));
    }
}
