//! In-memory directory store
//!
//! A single `parking_lot::RwLock` over the whole record tree. That makes
//! single-record writes trivially atomic and lets the review transaction
//! hold the write lock across its read-modify-write, which is exactly the
//! isolation the hosted backend's transaction gives. Snapshot
//! subscriptions publish over per-topic tokio broadcast channels.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{DirectoryError, DirectoryStore, SnapshotWatch};
use crate::data::types::{
    AppNotification, Medicine, PharmacyProfile, ProfileRecord, Review, SearchRequest,
    SearchResponse, StockItem,
};

/// Notifications kept per owner, newest first.
const NOTIFICATION_RETENTION: usize = 50;

/// Snapshot channel capacity per topic.
const WATCH_CAPACITY: usize = 256;

#[derive(Default)]
struct Tree {
    profiles: HashMap<String, ProfileRecord>,
    pharmacies: HashMap<String, PharmacyProfile>,
    reviews: HashMap<String, Vec<Review>>,
    stock: HashMap<String, BTreeMap<String, StockItem>>,
    saved_requests: HashMap<String, BTreeMap<String, SearchRequest>>,
    notifications: HashMap<String, Vec<AppNotification>>,
    favorites: HashMap<String, BTreeMap<String, PharmacyProfile>>,
    medicines: BTreeMap<String, Medicine>,
    requests: HashMap<String, SearchRequest>,
    responses: HashMap<String, BTreeMap<String, SearchResponse>>,
}

/// In-memory [`DirectoryStore`] implementation.
pub struct MemoryDirectoryStore {
    tree: RwLock<Tree>,
    notification_topics: DashMap<String, broadcast::Sender<Vec<AppNotification>>>,
    response_topics: DashMap<String, broadcast::Sender<Vec<SearchResponse>>>,
    request_topic: broadcast::Sender<Vec<SearchRequest>>,
    // Fault injection: fail the next N mutating calls. Always zero outside
    // of tests.
    write_faults: AtomicU32,
}

impl Default for MemoryDirectoryStore {
    fn default() -> Self {
        let (request_topic, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            tree: RwLock::new(Tree::default()),
            notification_topics: DashMap::new(),
            response_topics: DashMap::new(),
            request_topic,
            write_faults: AtomicU32::new(0),
        }
    }
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` mutating calls fail, simulating backend write
    /// rejections.
    #[cfg(test)]
    pub fn inject_write_faults(&self, n: u32) {
        self.write_faults.store(n, Ordering::SeqCst);
    }

    fn check_write_fault(&self) -> Result<(), DirectoryError> {
        let remaining = self.write_faults.load(Ordering::SeqCst);
        if remaining > 0 {
            self.write_faults.store(remaining - 1, Ordering::SeqCst);
            return Err(DirectoryError::WriteFailed("injected fault".to_string()));
        }
        Ok(())
    }

    fn publish_notifications(&self, tree: &Tree, owner_id: &str) {
        if let Some(topic) = self.notification_topics.get(owner_id) {
            let _ = topic.send(Self::notifications_snapshot(tree, owner_id));
        }
    }

    fn publish_responses(&self, tree: &Tree, request_id: &str) {
        if let Some(topic) = self.response_topics.get(request_id) {
            let snapshot = tree
                .responses
                .get(request_id)
                .map(|children| children.values().cloned().collect())
                .unwrap_or_default();
            let _ = topic.send(snapshot);
        }
    }

    fn publish_requests(&self, tree: &Tree) {
        let mut snapshot: Vec<SearchRequest> = tree.requests.values().cloned().collect();
        snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let _ = self.request_topic.send(snapshot);
    }

    fn notifications_snapshot(tree: &Tree, owner_id: &str) -> Vec<AppNotification> {
        let mut snapshot = tree.notifications.get(owner_id).cloned().unwrap_or_default();
        snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        snapshot.truncate(NOTIFICATION_RETENTION);
        snapshot
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn get_profile(&self, id: &str) -> Result<Option<ProfileRecord>, DirectoryError> {
        Ok(self.tree.read().profiles.get(id).cloned())
    }

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<(), DirectoryError> {
        if profile.id.is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "profile id must not be empty".to_string(),
            ));
        }
        self.check_write_fault()?;
        self.tree
            .write()
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        tree.profiles.remove(id);
        tree.pharmacies.remove(id);
        Ok(())
    }

    async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRecord>, DirectoryError> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .tree
            .read()
            .profiles
            .values()
            .find(|p| p.email.trim().to_lowercase() == needle)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let mut profiles: Vec<ProfileRecord> =
            self.tree.read().profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    async fn list_profiles_in_wilaya(
        &self,
        wilaya: &str,
    ) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let needle = wilaya.trim();
        Ok(self
            .tree
            .read()
            .profiles
            .values()
            .filter(|p| p.wilaya.as_deref().map(str::trim) == Some(needle))
            .cloned()
            .collect())
    }

    async fn get_pharmacy(&self, id: &str) -> Result<Option<PharmacyProfile>, DirectoryError> {
        Ok(self.tree.read().pharmacies.get(id).cloned())
    }

    async fn put_pharmacy(&self, profile: &PharmacyProfile) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        self.tree
            .write()
            .pharmacies
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list_pharmacies(&self) -> Result<Vec<PharmacyProfile>, DirectoryError> {
        let mut pharmacies: Vec<PharmacyProfile> =
            self.tree.read().pharmacies.values().cloned().collect();
        pharmacies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pharmacies)
    }

    async fn list_reviews(&self, target_id: &str) -> Result<Vec<Review>, DirectoryError> {
        let mut reviews = self
            .tree
            .read()
            .reviews
            .get(target_id)
            .cloned()
            .unwrap_or_default();
        reviews.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(reviews)
    }

    async fn add_review_atomic(
        &self,
        review: &Review,
        apply: &(dyn for<'a> Fn(&'a PharmacyProfile) -> (f64, u32) + Send + Sync),
    ) -> Result<PharmacyProfile, DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();

        // Read, recompute and write under one lock: a concurrent add for
        // the same target can never interleave with this one.
        let pharmacy = tree
            .pharmacies
            .get(&review.target_id)
            .ok_or(DirectoryError::NotFound("pharmacy profile"))?;

        let (rating, reviews_count) = apply(pharmacy);
        let mut updated = pharmacy.clone();
        updated.rating = rating;
        updated.reviews_count = reviews_count;

        tree.pharmacies
            .insert(review.target_id.clone(), updated.clone());
        tree.reviews
            .entry(review.target_id.clone())
            .or_default()
            .push(review.clone());

        Ok(updated)
    }

    async fn list_stock(&self, pharmacy_id: &str) -> Result<Vec<StockItem>, DirectoryError> {
        Ok(self
            .tree
            .read()
            .stock
            .get(pharmacy_id)
            .map(|children| children.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_stock_item(
        &self,
        pharmacy_id: &str,
        item: &StockItem,
    ) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        self.tree
            .write()
            .stock
            .entry(pharmacy_id.to_string())
            .or_default()
            .insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn copy_stock(&self, from_id: &str, to_id: &str) -> Result<usize, DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        let source = tree.stock.get(from_id).cloned().unwrap_or_default();
        let copied = source.len();
        if copied > 0 {
            tree.stock.entry(to_id.to_string()).or_default().extend(source);
        }
        Ok(copied)
    }

    async fn list_saved_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<SearchRequest>, DirectoryError> {
        let mut requests: Vec<SearchRequest> = self
            .tree
            .read()
            .saved_requests
            .get(user_id)
            .map(|children| children.values().cloned().collect())
            .unwrap_or_default();
        requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(requests)
    }

    async fn put_saved_request(
        &self,
        user_id: &str,
        request: &SearchRequest,
    ) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        self.tree
            .write()
            .saved_requests
            .entry(user_id.to_string())
            .or_default()
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn copy_saved_requests(
        &self,
        from_id: &str,
        to_id: &str,
    ) -> Result<usize, DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        let source = tree.saved_requests.get(from_id).cloned().unwrap_or_default();
        let copied = source.len();
        if copied > 0 {
            tree.saved_requests
                .entry(to_id.to_string())
                .or_default()
                .extend(source);
        }
        Ok(copied)
    }

    async fn push_notification(
        &self,
        owner_id: &str,
        notification: &AppNotification,
    ) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        let inbox = tree.notifications.entry(owner_id.to_string()).or_default();
        inbox.push(notification.clone());
        if inbox.len() > NOTIFICATION_RETENTION {
            inbox.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            inbox.truncate(NOTIFICATION_RETENTION);
        }
        self.publish_notifications(&tree, owner_id);
        Ok(())
    }

    async fn list_notifications(
        &self,
        owner_id: &str,
    ) -> Result<Vec<AppNotification>, DirectoryError> {
        Ok(Self::notifications_snapshot(&self.tree.read(), owner_id))
    }

    async fn mark_notification_read(
        &self,
        owner_id: &str,
        notification_id: &str,
    ) -> Result<bool, DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        let Some(inbox) = tree.notifications.get_mut(owner_id) else {
            return Ok(false);
        };
        let Some(notification) = inbox.iter_mut().find(|n| n.id == notification_id) else {
            return Ok(false);
        };
        notification.read = true;
        self.publish_notifications(&tree, owner_id);
        Ok(true)
    }

    fn watch_notifications(&self, owner_id: &str) -> SnapshotWatch<AppNotification> {
        let topic = self
            .notification_topics
            .entry(owner_id.to_string())
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0);
        SnapshotWatch::new(topic.subscribe())
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<PharmacyProfile>, DirectoryError> {
        Ok(self
            .tree
            .read()
            .favorites
            .get(user_id)
            .map(|children| children.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn is_favorite(&self, user_id: &str, pharmacy_id: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .tree
            .read()
            .favorites
            .get(user_id)
            .is_some_and(|children| children.contains_key(pharmacy_id)))
    }

    async fn add_favorite(
        &self,
        user_id: &str,
        pharmacy: &PharmacyProfile,
    ) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        self.tree
            .write()
            .favorites
            .entry(user_id.to_string())
            .or_default()
            .insert(pharmacy.id.clone(), pharmacy.clone());
        Ok(())
    }

    async fn remove_favorite(
        &self,
        user_id: &str,
        pharmacy_id: &str,
    ) -> Result<bool, DirectoryError> {
        self.check_write_fault()?;
        Ok(self
            .tree
            .write()
            .favorites
            .get_mut(user_id)
            .is_some_and(|children| children.remove(pharmacy_id).is_some()))
    }

    async fn list_medicines(&self) -> Result<Vec<Medicine>, DirectoryError> {
        Ok(self.tree.read().medicines.values().cloned().collect())
    }

    async fn put_medicine(&self, medicine: &Medicine) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        self.tree
            .write()
            .medicines
            .insert(medicine.id.clone(), medicine.clone());
        Ok(())
    }

    async fn delete_medicine(&self, id: &str) -> Result<bool, DirectoryError> {
        self.check_write_fault()?;
        Ok(self.tree.write().medicines.remove(id).is_some())
    }

    async fn put_request(&self, request: &SearchRequest) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        tree.requests.insert(request.id.clone(), request.clone());
        self.publish_requests(&tree);
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<SearchRequest>, DirectoryError> {
        Ok(self.tree.read().requests.get(id).cloned())
    }

    async fn list_requests(
        &self,
        wilaya: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchRequest>, DirectoryError> {
        let needle = wilaya.map(str::trim);
        let mut requests: Vec<SearchRequest> = self
            .tree
            .read()
            .requests
            .values()
            .filter(|r| needle.is_none_or(|w| r.wilaya.trim() == w))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        requests.truncate(limit);
        Ok(requests)
    }

    async fn put_response(&self, response: &SearchResponse) -> Result<(), DirectoryError> {
        self.check_write_fault()?;
        let mut tree = self.tree.write();
        tree.responses
            .entry(response.request_id.clone())
            .or_default()
            .insert(response.id.clone(), response.clone());
        self.publish_responses(&tree, &response.request_id);
        Ok(())
    }

    async fn list_responses(
        &self,
        request_id: &str,
    ) -> Result<Vec<SearchResponse>, DirectoryError> {
        Ok(self
            .tree
            .read()
            .responses
            .get(request_id)
            .map(|children| children.values().cloned().collect())
            .unwrap_or_default())
    }

    fn watch_responses(&self, request_id: &str) -> SnapshotWatch<SearchResponse> {
        let topic = self
            .response_topics
            .entry(request_id.to_string())
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0);
        SnapshotWatch::new(topic.subscribe())
    }

    fn watch_requests(&self) -> SnapshotWatch<SearchRequest> {
        SnapshotWatch::new(self.request_topic.subscribe())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{AvailabilityStatus, NotificationKind, RequestStatus, Role};
    use chrono::Utc;

    fn profile(id: &str, email: &str, role: Role, wilaya: &str) -> ProfileRecord {
        ProfileRecord {
            id: id.to_string(),
            role,
            name: format!("name-{id}"),
            email: email.to_string(),
            phone: None,
            wilaya: Some(wilaya.to_string()),
            commune: None,
            approved: None,
            created_at: Utc::now(),
        }
    }

    fn pharmacy(id: &str) -> PharmacyProfile {
        PharmacyProfile {
            id: id.to_string(),
            name: format!("pharmacy-{id}"),
            wilaya: "Alger".to_string(),
            commune: "Centre".to_string(),
            phone: "0550000000".to_string(),
            email: format!("{id}@x.dz"),
            approved: true,
            rating: 0.0,
            reviews_count: 0,
        }
    }

    fn stock_item(id: &str, pharmacy_id: &str, name: &str) -> StockItem {
        StockItem {
            id: id.to_string(),
            pharmacy_id: pharmacy_id.to_string(),
            medicine_name: name.to_string(),
            availability: AvailabilityStatus::Available,
            price: Some(120.0),
            alternative_name: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_profile_roundtrip_and_email_lookup() {
        let store = MemoryDirectoryStore::new();
        store
            .put_profile(&profile("p1", "Ph1@X.dz", Role::Pharmacy, "Alger"))
            .await
            .unwrap();

        let found = store.find_profile_by_email(" ph1@x.dz ").await.unwrap();
        assert_eq!(found.unwrap().id, "p1");
        assert!(store.find_profile_by_email("other@x.dz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_profile_removes_pharmacy_sub_record() {
        let store = MemoryDirectoryStore::new();
        store
            .put_profile(&profile("p1", "p1@x.dz", Role::Pharmacy, "Alger"))
            .await
            .unwrap();
        store.put_pharmacy(&pharmacy("p1")).await.unwrap();

        store.delete_profile("p1").await.unwrap();
        assert!(store.get_profile("p1").await.unwrap().is_none());
        assert!(store.get_pharmacy("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_review_atomic_missing_target_writes_nothing() {
        let store = MemoryDirectoryStore::new();
        let review = Review {
            id: "r1".to_string(),
            target_id: "ghost".to_string(),
            author_id: "u1".to_string(),
            author_name: "User".to_string(),
            rating: 4,
            comment: "ok".to_string(),
            timestamp: Utc::now(),
        };

        let result = store.add_review_atomic(&review, &|_| (4.0, 1)).await;
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
        assert!(store.list_reviews("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_stock_preserves_ids_and_content() {
        let store = MemoryDirectoryStore::new();
        store
            .put_stock_item("old", &stock_item("m1", "old", "Paracetamol"))
            .await
            .unwrap();
        store
            .put_stock_item("old", &stock_item("m2", "old", "Ibuprofen"))
            .await
            .unwrap();

        let copied = store.copy_stock("old", "new").await.unwrap();
        assert_eq!(copied, 2);

        let old_stock = store.list_stock("old").await.unwrap();
        let new_stock = store.list_stock("new").await.unwrap();
        assert_eq!(old_stock.len(), new_stock.len());
        for (a, b) in old_stock.iter().zip(new_stock.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.medicine_name, b.medicine_name);
        }
    }

    #[tokio::test]
    async fn test_notification_watch_delivers_snapshots() {
        let store = MemoryDirectoryStore::new();
        let mut watch = store.watch_notifications("ph1");

        let notification = AppNotification {
            id: "n1".to_string(),
            kind: NotificationKind::Review,
            title: "New review".to_string(),
            message: "4 stars".to_string(),
            timestamp: Utc::now(),
            read: false,
            link: None,
        };
        store.push_notification("ph1", &notification).await.unwrap();

        let snapshot = watch.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "n1");
    }

    #[tokio::test]
    async fn test_notification_retention_cap() {
        let store = MemoryDirectoryStore::new();
        for i in 0..(NOTIFICATION_RETENTION + 10) {
            let notification = AppNotification {
                id: format!("n{i}"),
                kind: NotificationKind::System,
                title: "t".to_string(),
                message: "m".to_string(),
                timestamp: Utc::now() + chrono::Duration::seconds(i as i64),
                read: false,
                link: None,
            };
            store.push_notification("u1", &notification).await.unwrap();
        }
        let listed = store.list_notifications("u1").await.unwrap();
        assert_eq!(listed.len(), NOTIFICATION_RETENTION);
        // Newest first.
        assert!(listed[0].timestamp >= listed[1].timestamp);
    }

    #[tokio::test]
    async fn test_response_watch_scoped_to_request() {
        let store = MemoryDirectoryStore::new();
        let mut watch = store.watch_responses("req1");

        let response = SearchResponse {
            id: "resp1".to_string(),
            request_id: "req1".to_string(),
            pharmacy: pharmacy("p1"),
            status: AvailabilityStatus::Available,
            price: Some(100.0),
            alternative_name: None,
            timestamp: Utc::now(),
        };
        store.put_response(&response).await.unwrap();

        let snapshot = watch.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].request_id, "req1");
    }

    #[tokio::test]
    async fn test_list_requests_filters_and_limits() {
        let store = MemoryDirectoryStore::new();
        for i in 0..5 {
            let request = SearchRequest {
                id: format!("r{i}"),
                medicine_name: "Doliprane".to_string(),
                wilaya: if i % 2 == 0 { "Alger" } else { "Oran" }.to_string(),
                timestamp: Utc::now() + chrono::Duration::seconds(i),
                status: RequestStatus::Active,
                user_id: None,
            };
            store.put_request(&request).await.unwrap();
        }

        let alger = store.list_requests(Some("Alger"), 10).await.unwrap();
        assert_eq!(alger.len(), 3);
        assert!(alger.iter().all(|r| r.wilaya == "Alger"));

        let capped = store.list_requests(None, 2).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert!(capped[0].timestamp >= capped[1].timestamp);
    }

    #[tokio::test]
    async fn test_injected_fault_fails_one_write() {
        let store = MemoryDirectoryStore::new();
        store.inject_write_faults(1);

        let result = store
            .put_profile(&profile("p1", "p1@x.dz", Role::User, "Alger"))
            .await;
        assert!(matches!(result, Err(DirectoryError::WriteFailed(_))));

        // Next write goes through.
        store
            .put_profile(&profile("p1", "p1@x.dz", Role::User, "Alger"))
            .await
            .unwrap();
    }
}
