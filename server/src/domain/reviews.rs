//! Rating aggregator
//!
//! Reviews are immutable once written, so the pharmacy's `(rating,
//! reviews_count)` pair can be maintained incrementally: each accepted
//! review folds its rating into the stored mean inside the store's review
//! transaction. The follow-up notification to the pharmacy is best-effort
//! and never affects the committed review.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::error::DomainError;
use crate::data::directory::DirectoryStore;
use crate::data::types::{AppNotification, NotificationKind, PharmacyProfile, Review};
use crate::utils::math::round2;

pub struct ReviewService {
    directory: Arc<dyn DirectoryStore>,
}

impl ReviewService {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    /// Insert a review and fold it into the target's rating aggregate.
    ///
    /// Returns the pharmacy sub-record as committed. An unknown target
    /// fails with `NOT_FOUND` and writes nothing, review included.
    pub async fn add_review(
        &self,
        author_id: &str,
        author_name: &str,
        target_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<PharmacyProfile, DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::invalid_input("rating must be between 1 and 5"));
        }

        let review = Review {
            id: Uuid::new_v4().to_string(),
            target_id: target_id.to_string(),
            author_id: author_id.to_string(),
            author_name: author_name.to_string(),
            rating,
            comment: comment.to_string(),
            timestamp: Utc::now(),
        };

        let updated = self
            .directory
            .add_review_atomic(&review, &move |current: &PharmacyProfile| {
                let count = current.reviews_count;
                let mean = round2(
                    (current.rating * f64::from(count) + f64::from(rating))
                        / f64::from(count + 1),
                );
                (mean, count + 1)
            })
            .await?;

        tracing::info!(
            target_id,
            rating,
            new_rating = updated.rating,
            reviews = updated.reviews_count,
            "Review committed"
        );

        // Best-effort: a failed notification must not surface after the
        // review is already committed.
        let notification = AppNotification {
            id: Uuid::new_v4().to_string(),
            kind: NotificationKind::Review,
            title: "New review".to_string(),
            message: format!("{author_name} rated your pharmacy {rating}/5"),
            timestamp: review.timestamp,
            read: false,
            link: None,
        };
        if let Err(e) = self.directory.push_notification(target_id, &notification).await {
            tracing::warn!(target_id, error = %e, "Review notification not delivered");
        }

        Ok(updated)
    }

    /// Reviews for a pharmacy, newest first.
    pub async fn list_reviews(&self, target_id: &str) -> Result<Vec<Review>, DomainError> {
        Ok(self.directory.list_reviews(target_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::directory::MemoryDirectoryStore;

    async fn with_pharmacy(id: &str) -> (ReviewService, Arc<MemoryDirectoryStore>) {
        let directory = Arc::new(MemoryDirectoryStore::new());
        directory
            .put_pharmacy(&PharmacyProfile {
                id: id.to_string(),
                name: "Pharmacie Centrale".to_string(),
                wilaya: "Alger".to_string(),
                commune: "Centre".to_string(),
                phone: "0550000001".to_string(),
                email: "ph1@x.dz".to_string(),
                approved: true,
                rating: 0.0,
                reviews_count: 0,
            })
            .await
            .unwrap();
        (ReviewService::new(directory.clone()), directory)
    }

    #[tokio::test]
    async fn test_two_reviews_average_to_half() {
        let (service, directory) = with_pharmacy("ph1").await;

        service.add_review("u1", "User One", "ph1", 4, "good").await.unwrap();
        let updated = service.add_review("u2", "User Two", "ph1", 5, "great").await.unwrap();

        assert_eq!(updated.rating, 4.5);
        assert_eq!(updated.reviews_count, 2);

        let reviews = directory.list_reviews("ph1").await.unwrap();
        assert_eq!(reviews.len(), 2);
        // Newest first.
        assert_eq!(reviews[0].author_id, "u2");
    }

    #[tokio::test]
    async fn test_mean_rounds_to_two_decimals() {
        let (service, _) = with_pharmacy("ph1").await;

        service.add_review("u1", "A", "ph1", 4, "").await.unwrap();
        service.add_review("u2", "B", "ph1", 4, "").await.unwrap();
        let updated = service.add_review("u3", "C", "ph1", 5, "").await.unwrap();

        // 13 / 3 = 4.333...
        assert_eq!(updated.rating, 4.33);
        assert_eq!(updated.reviews_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_target_writes_nothing() {
        let (service, directory) = with_pharmacy("ph1").await;

        let result = service.add_review("u1", "A", "missing", 5, "").await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
        assert!(directory.list_reviews("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_out_of_range_rejected() {
        let (service, directory) = with_pharmacy("ph1").await;

        assert!(matches!(
            service.add_review("u1", "A", "ph1", 0, "").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            service.add_review("u1", "A", "ph1", 6, "").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(directory.list_reviews("ph1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_notifies_pharmacy() {
        let (service, directory) = with_pharmacy("ph1").await;

        service.add_review("u1", "User One", "ph1", 5, "").await.unwrap();

        let notifications = directory.list_notifications("ph1").await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Review);
        assert!(!notifications[0].read);
    }

    #[tokio::test]
    async fn test_same_author_may_review_twice() {
        let (service, _) = with_pharmacy("ph1").await;

        service.add_review("u1", "A", "ph1", 2, "").await.unwrap();
        let updated = service.add_review("u1", "A", "ph1", 4, "").await.unwrap();
        assert_eq!(updated.rating, 3.0);
        assert_eq!(updated.reviews_count, 2);
    }
}
