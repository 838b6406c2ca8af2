//! Notification access
//!
//! Reads and the read-flag flip for the caller's own notification feed.
//! Delivery happens inside the producing workflows (reviews, search
//! fan-out, responses); this service never creates notifications.

use std::sync::Arc;

use super::error::DomainError;
use crate::data::directory::{DirectoryStore, SnapshotWatch};
use crate::data::types::AppNotification;

pub struct NotificationService {
    directory: Arc<dyn DirectoryStore>,
}

impl NotificationService {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    /// The owner's feed, newest first, capped at the retention window.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<AppNotification>, DomainError> {
        Ok(self.directory.list_notifications(owner_id).await?)
    }

    pub async fn mark_read(
        &self,
        owner_id: &str,
        notification_id: &str,
    ) -> Result<(), DomainError> {
        if !self
            .directory
            .mark_notification_read(owner_id, notification_id)
            .await?
        {
            return Err(DomainError::NotFound("notification"));
        }
        Ok(())
    }

    pub fn watch(&self, owner_id: &str) -> SnapshotWatch<AppNotification> {
        self.directory.watch_notifications(owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::directory::MemoryDirectoryStore;
    use crate::data::types::NotificationKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn notification(title: &str) -> AppNotification {
        AppNotification {
            id: Uuid::new_v4().to_string(),
            kind: NotificationKind::System,
            title: title.to_string(),
            message: String::new(),
            timestamp: Utc::now(),
            read: false,
            link: None,
        }
    }

    #[tokio::test]
    async fn test_mark_read_flips_flag() {
        let directory = Arc::new(MemoryDirectoryStore::new());
        let service = NotificationService::new(directory.clone());

        let n = notification("hello");
        directory.push_notification("u1", &n).await.unwrap();

        service.mark_read("u1", &n.id).await.unwrap();
        let listed = service.list("u1").await.unwrap();
        assert!(listed[0].read);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id_not_found() {
        let directory = Arc::new(MemoryDirectoryStore::new());
        let service = NotificationService::new(directory);
        assert!(matches!(
            service.mark_read("u1", "missing").await,
            Err(DomainError::NotFound(_))
        ));
    }
}
