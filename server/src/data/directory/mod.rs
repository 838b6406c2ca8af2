//! Directory store abstraction
//!
//! Models the hosted document database as a tree of owned records: one
//! profile per identity, role sub-records, child collections keyed by the
//! owning profile id, and global collections (medicine catalog, search
//! requests with response children).
//!
//! Two consistency guarantees are surfaced, matching what the backend
//! provides: single-record writes are atomic, and [`DirectoryStore::
//! add_review_atomic`] runs the review insert together with the rating
//! aggregate update as one transaction. Every other multi-step sequence in
//! the application is explicitly non-atomic.

mod memory;

pub use memory::MemoryDirectoryStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::types::{
    AppNotification, Medicine, PharmacyProfile, ProfileRecord, Review, SearchRequest,
    SearchResponse, StockItem,
};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("write rejected by backend: {0}")]
    WriteFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Error surfaced by a snapshot subscription.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The subscriber fell behind and `n` snapshots were dropped. The next
    /// successful `recv` returns a current snapshot, so nothing is lost.
    #[error("subscriber lagged behind by {0} snapshots")]
    Lagged(u64),

    #[error("subscription channel closed")]
    Closed,
}

/// A live subscription delivering a full snapshot of a matching record set
/// on every underlying change.
///
/// Teardown is explicit: dropping the watch unsubscribes, and a snapshot
/// already in flight at drop time is simply never received. Callers must
/// drop the watch when the consuming context goes away instead of letting
/// stale deliveries pile up.
pub struct SnapshotWatch<T> {
    rx: broadcast::Receiver<Vec<T>>,
}

impl<T: Clone> SnapshotWatch<T> {
    pub(crate) fn new(rx: broadcast::Receiver<Vec<T>>) -> Self {
        Self { rx }
    }

    /// Receive the next snapshot.
    pub async fn recv(&mut self) -> Result<Vec<T>, WatchError> {
        match self.rx.recv().await {
            Ok(snapshot) => Ok(snapshot),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(WatchError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(WatchError::Closed),
        }
    }
}

/// Document-oriented directory store.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // ---- profiles ----

    async fn get_profile(&self, id: &str) -> Result<Option<ProfileRecord>, DirectoryError>;

    /// Create or replace a profile record.
    async fn put_profile(&self, profile: &ProfileRecord) -> Result<(), DirectoryError>;

    /// Delete a profile and its pharmacy sub-record, if any. Idempotent.
    async fn delete_profile(&self, id: &str) -> Result<(), DirectoryError>;

    async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRecord>, DirectoryError>;

    async fn list_profiles(&self) -> Result<Vec<ProfileRecord>, DirectoryError>;

    async fn list_profiles_in_wilaya(
        &self,
        wilaya: &str,
    ) -> Result<Vec<ProfileRecord>, DirectoryError>;

    // ---- pharmacy sub-records ----

    async fn get_pharmacy(&self, id: &str) -> Result<Option<PharmacyProfile>, DirectoryError>;

    async fn put_pharmacy(&self, profile: &PharmacyProfile) -> Result<(), DirectoryError>;

    async fn list_pharmacies(&self) -> Result<Vec<PharmacyProfile>, DirectoryError>;

    // ---- reviews ----

    /// Newest first.
    async fn list_reviews(&self, target_id: &str) -> Result<Vec<Review>, DirectoryError>;

    /// Insert a review and update the target pharmacy's rating aggregate
    /// as one atomic unit. `apply` receives the current sub-record and
    /// returns the new `(rating, reviews_count)` pair; it runs under the
    /// transaction, so concurrent calls for the same target serialize.
    ///
    /// Fails with `NotFound` and writes nothing when the target pharmacy
    /// sub-record does not exist.
    async fn add_review_atomic(
        &self,
        review: &Review,
        apply: &(dyn for<'a> Fn(&'a PharmacyProfile) -> (f64, u32) + Send + Sync),
    ) -> Result<PharmacyProfile, DirectoryError>;

    // ---- stock ----

    async fn list_stock(&self, pharmacy_id: &str) -> Result<Vec<StockItem>, DirectoryError>;

    async fn put_stock_item(
        &self,
        pharmacy_id: &str,
        item: &StockItem,
    ) -> Result<(), DirectoryError>;

    /// Copy the whole stock collection to another owner, preserving
    /// document ids and contents verbatim. Returns the number of copied
    /// items.
    async fn copy_stock(&self, from_id: &str, to_id: &str) -> Result<usize, DirectoryError>;

    // ---- saved search requests (per user) ----

    async fn list_saved_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<SearchRequest>, DirectoryError>;

    async fn put_saved_request(
        &self,
        user_id: &str,
        request: &SearchRequest,
    ) -> Result<(), DirectoryError>;

    /// Same id-preserving copy as [`DirectoryStore::copy_stock`], for the
    /// saved-requests collection.
    async fn copy_saved_requests(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> Result<usize, DirectoryError>;

    // ---- notifications ----

    async fn push_notification(
        &self,
        owner_id: &str,
        notification: &AppNotification,
    ) -> Result<(), DirectoryError>;

    /// Most recent first, capped at the store's retention window.
    async fn list_notifications(
        &self,
        owner_id: &str,
    ) -> Result<Vec<AppNotification>, DirectoryError>;

    /// Flip `read` to true. Returns false if the notification is unknown.
    async fn mark_notification_read(
        &self,
        owner_id: &str,
        notification_id: &str,
    ) -> Result<bool, DirectoryError>;

    fn watch_notifications(&self, owner_id: &str) -> SnapshotWatch<AppNotification>;

    // ---- favorites ----

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<PharmacyProfile>, DirectoryError>;

    async fn is_favorite(&self, user_id: &str, pharmacy_id: &str) -> Result<bool, DirectoryError>;

    async fn add_favorite(
        &self,
        user_id: &str,
        pharmacy: &PharmacyProfile,
    ) -> Result<(), DirectoryError>;

    async fn remove_favorite(
        &self,
        user_id: &str,
        pharmacy_id: &str,
    ) -> Result<bool, DirectoryError>;

    // ---- medicine catalog ----

    async fn list_medicines(&self) -> Result<Vec<Medicine>, DirectoryError>;

    async fn put_medicine(&self, medicine: &Medicine) -> Result<(), DirectoryError>;

    async fn delete_medicine(&self, id: &str) -> Result<bool, DirectoryError>;

    // ---- global search requests and their responses ----

    async fn put_request(&self, request: &SearchRequest) -> Result<(), DirectoryError>;

    async fn get_request(&self, id: &str) -> Result<Option<SearchRequest>, DirectoryError>;

    /// Newest first, optionally filtered by wilaya, capped at `limit`.
    async fn list_requests(
        &self,
        wilaya: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchRequest>, DirectoryError>;

    async fn put_response(&self, response: &SearchResponse) -> Result<(), DirectoryError>;

    async fn list_responses(
        &self,
        request_id: &str,
    ) -> Result<Vec<SearchResponse>, DirectoryError>;

    fn watch_responses(&self, request_id: &str) -> SnapshotWatch<SearchResponse>;

    /// Snapshot stream over the whole global request collection; callers
    /// filter by region and freshness at read time.
    fn watch_requests(&self) -> SnapshotWatch<SearchRequest>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
