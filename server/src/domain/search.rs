//! Search fan-out and response collection
//!
//! A submitted request is persisted once in the global collection, saved
//! under the requesting user when one is signed in, and fanned out as
//! notifications to the pharmacies of the target wilaya. Responses are
//! children of the request carrying a denormalized pharmacy snapshot.
//! Freshness is always evaluated at read time against the request
//! timestamp; the stored status never ages in place.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::error::DomainError;
use crate::core::constants::{
    FANOUT_MAX_RECIPIENTS, REQUEST_QUERY_WINDOW_SECS, REQUEST_STREAM_WINDOW_SECS,
    TRENDING_SCAN_LIMIT, TRENDING_TOP_N,
};
use crate::data::directory::{DirectoryStore, SnapshotWatch};
use crate::data::types::{
    AppNotification, AvailabilityStatus, DrugStat, NotificationKind, RequestStatus, Role,
    SearchRequest, SearchResponse,
};

pub struct SearchService {
    directory: Arc<dyn DirectoryStore>,
}

impl SearchService {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    /// Persist a search request and notify the wilaya's pharmacies.
    ///
    /// `user_id` is `None` for guest searches; those are neither saved
    /// under a profile nor answerable with a targeted response
    /// notification. The fan-out itself is best-effort per recipient.
    pub async fn submit_request(
        &self,
        user_id: Option<&str>,
        medicine_name: &str,
        wilaya: &str,
    ) -> Result<SearchRequest, DomainError> {
        let medicine_name = medicine_name.trim();
        let wilaya = wilaya.trim();
        if medicine_name.is_empty() {
            return Err(DomainError::invalid_input("medicine name is required"));
        }
        if wilaya.is_empty() {
            return Err(DomainError::invalid_input("wilaya is required"));
        }

        let request = SearchRequest {
            id: Uuid::new_v4().to_string(),
            medicine_name: medicine_name.to_string(),
            wilaya: wilaya.to_string(),
            timestamp: Utc::now(),
            status: RequestStatus::Active,
            user_id: user_id.map(str::to_string),
        };
        self.directory.put_request(&request).await?;

        if let Some(user_id) = user_id {
            if let Err(e) = self.directory.put_saved_request(user_id, &request).await {
                tracing::warn!(user_id, error = %e, "Request not saved under user profile");
            }
        }

        self.fan_out(&request).await;

        tracing::info!(
            request_id = %request.id,
            medicine = medicine_name,
            wilaya,
            guest = user_id.is_none(),
            "Search request submitted"
        );
        Ok(request)
    }

    /// Notify every pharmacy profile of the request's wilaya, capped to
    /// stay under the backend's batch-write limit. Per-recipient failures
    /// are logged and skipped.
    async fn fan_out(&self, request: &SearchRequest) {
        let recipients = match self.directory.list_profiles_in_wilaya(&request.wilaya).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(wilaya = %request.wilaya, error = %e, "Fan-out recipient lookup failed");
                return;
            }
        };

        let mut notified = 0usize;
        for profile in recipients
            .iter()
            .filter(|p| p.role == Role::Pharmacy)
            .take(FANOUT_MAX_RECIPIENTS)
        {
            let notification = AppNotification {
                id: Uuid::new_v4().to_string(),
                kind: NotificationKind::Request,
                title: "Medicine requested".to_string(),
                message: format!("Someone is looking for {} in {}", request.medicine_name, request.wilaya),
                timestamp: request.timestamp,
                read: false,
                link: Some(format!("/requests/{}", request.id)),
            };
            match self.directory.push_notification(&profile.id, &notification).await {
                Ok(()) => notified += 1,
                Err(e) => {
                    tracing::warn!(recipient = %profile.id, error = %e, "Fan-out notification not delivered");
                }
            }
        }
        tracing::debug!(request_id = %request.id, notified, "Fan-out complete");
    }

    /// A pharmacy's answer to a request. Snapshots the responding pharmacy
    /// into the response record and notifies the requester when the
    /// request was not a guest search and the answer is actionable; a
    /// NOT_AVAILABLE answer is recorded without notifying anyone.
    pub async fn submit_response(
        &self,
        pharmacy_id: &str,
        request_id: &str,
        status: AvailabilityStatus,
        price: Option<f64>,
        alternative_name: Option<String>,
    ) -> Result<SearchResponse, DomainError> {
        let request = self
            .directory
            .get_request(request_id)
            .await?
            .ok_or(DomainError::NotFound("search request"))?;
        let pharmacy = self
            .directory
            .get_pharmacy(pharmacy_id)
            .await?
            .ok_or(DomainError::NotFound("pharmacy"))?;

        let response = SearchResponse {
            id: Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            pharmacy,
            status,
            price,
            alternative_name,
            timestamp: Utc::now(),
        };
        self.directory.put_response(&response).await?;

        if status != AvailabilityStatus::NotAvailable
            && let Some(user_id) = &request.user_id
        {
            let notification = AppNotification {
                id: Uuid::new_v4().to_string(),
                kind: NotificationKind::Response,
                title: "Pharmacy responded".to_string(),
                message: format!(
                    "{} answered your search for {}",
                    response.pharmacy.name, request.medicine_name
                ),
                timestamp: response.timestamp,
                read: false,
                link: Some(format!("/requests/{request_id}")),
            };
            if let Err(e) = self.directory.push_notification(user_id, &notification).await {
                tracing::warn!(user_id, error = %e, "Response notification not delivered");
            }
        }

        tracing::info!(request_id, pharmacy_id, ?status, "Search response submitted");
        Ok(response)
    }

    /// Recent requests for a wilaya with their effective read-time status.
    pub async fn live_requests(&self, wilaya: &str) -> Result<Vec<SearchRequest>, DomainError> {
        let window = Duration::seconds(REQUEST_QUERY_WINDOW_SECS);
        let requests = self
            .directory
            .list_requests(Some(wilaya), TRENDING_SCAN_LIMIT)
            .await?;
        Ok(requests
            .into_iter()
            .filter(|r| crate::utils::time::within_window(r.timestamp, window))
            .map(Self::with_effective_status)
            .collect())
    }

    pub async fn responses(&self, request_id: &str) -> Result<Vec<SearchResponse>, DomainError> {
        self.directory
            .get_request(request_id)
            .await?
            .ok_or(DomainError::NotFound("search request"))?;
        Ok(self.directory.list_responses(request_id).await?)
    }

    pub fn watch_responses(&self, request_id: &str) -> SnapshotWatch<SearchResponse> {
        self.directory.watch_responses(request_id)
    }

    pub fn watch_requests(&self) -> SnapshotWatch<SearchRequest> {
        self.directory.watch_requests()
    }

    /// Filter a streamed request snapshot down to one wilaya's requests
    /// inside the stream window, with effective statuses applied.
    pub fn filter_stream_snapshot(
        snapshot: Vec<SearchRequest>,
        wilaya: &str,
    ) -> Vec<SearchRequest> {
        let window = Duration::seconds(REQUEST_STREAM_WINDOW_SECS);
        snapshot
            .into_iter()
            .filter(|r| r.wilaya == wilaya)
            .filter(|r| crate::utils::time::within_window(r.timestamp, window))
            .map(Self::with_effective_status)
            .collect()
    }

    /// Initial snapshot for a request stream subscription, filtered the
    /// same way as the streamed deltas.
    pub async fn stream_snapshot(&self, wilaya: &str) -> Result<Vec<SearchRequest>, DomainError> {
        let requests = self.directory.list_requests(None, TRENDING_SCAN_LIMIT).await?;
        Ok(Self::filter_stream_snapshot(requests, wilaya))
    }

    /// Status as a reader should see it now. Stored records are never
    /// rewritten when they age out.
    fn with_effective_status(mut request: SearchRequest) -> SearchRequest {
        let window = Duration::seconds(REQUEST_QUERY_WINDOW_SECS);
        if !crate::utils::time::within_window(request.timestamp, window) {
            request.status = RequestStatus::Expired;
        }
        request
    }

    /// Most requested medicine names over the recent request history,
    /// optionally scoped to one wilaya. Names are counted
    /// case-insensitively and displayed capitalized.
    pub async fn trending(&self, wilaya: Option<&str>) -> Result<Vec<DrugStat>, DomainError> {
        let requests = self
            .directory
            .list_requests(wilaya, TRENDING_SCAN_LIMIT)
            .await?;
        let total = requests.len() as u64;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut counts: HashMap<String, u64> = HashMap::new();
        for request in &requests {
            *counts.entry(request.medicine_name.to_lowercase()).or_insert(0) += 1;
        }

        let mut stats: Vec<DrugStat> = counts
            .into_iter()
            .map(|(key, count)| DrugStat {
                name: capitalize(&key),
                count,
                // Round-half-up, in integers.
                percentage: (count * 100 + total / 2) / total,
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        stats.truncate(TRENDING_TOP_N);
        Ok(stats)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::directory::MemoryDirectoryStore;
    use crate::data::types::{PharmacyProfile, ProfileRecord};

    async fn seed_pharmacy(directory: &MemoryDirectoryStore, id: &str, wilaya: &str) {
        directory
            .put_profile(&ProfileRecord {
                id: id.to_string(),
                role: Role::Pharmacy,
                name: format!("Pharmacie {id}"),
                email: format!("{id}@x.dz"),
                phone: Some("0550000001".to_string()),
                wilaya: Some(wilaya.to_string()),
                commune: Some("Centre".to_string()),
                approved: Some(true),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        directory
            .put_pharmacy(&PharmacyProfile {
                id: id.to_string(),
                name: format!("Pharmacie {id}"),
                wilaya: wilaya.to_string(),
                commune: "Centre".to_string(),
                phone: "0550000001".to_string(),
                email: format!("{id}@x.dz"),
                approved: true,
                rating: 0.0,
                reviews_count: 0,
            })
            .await
            .unwrap();
    }

    fn service() -> (SearchService, Arc<MemoryDirectoryStore>) {
        let directory = Arc::new(MemoryDirectoryStore::new());
        (SearchService::new(directory.clone()), directory)
    }

    #[tokio::test]
    async fn test_request_notifies_wilaya_pharmacies_only() {
        let (service, directory) = service();
        seed_pharmacy(&directory, "ph1", "Alger").await;
        seed_pharmacy(&directory, "ph2", "Alger").await;
        seed_pharmacy(&directory, "ph3", "Oran").await;

        service
            .submit_request(Some("u1"), "Paracetamol", "Alger")
            .await
            .unwrap();

        assert_eq!(directory.list_notifications("ph1").await.unwrap().len(), 1);
        assert_eq!(directory.list_notifications("ph2").await.unwrap().len(), 1);
        assert!(directory.list_notifications("ph3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_request_saved_under_user() {
        let (service, directory) = service();
        let request = service
            .submit_request(Some("u1"), "Ibuprofen", "Alger")
            .await
            .unwrap();

        let saved = directory.list_saved_requests("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, request.id);
    }

    #[tokio::test]
    async fn test_guest_request_is_not_saved() {
        let (service, directory) = service();
        let request = service
            .submit_request(None, "Ibuprofen", "Alger")
            .await
            .unwrap();
        assert!(request.user_id.is_none());
        assert!(directory.list_requests(None, 10).await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_blank_fields_rejected() {
        let (service, _) = service();
        assert!(matches!(
            service.submit_request(None, "  ", "Alger").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            service.submit_request(None, "Paracetamol", "").await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_response_snapshots_pharmacy_and_notifies_requester() {
        let (service, directory) = service();
        seed_pharmacy(&directory, "ph1", "Alger").await;

        let request = service
            .submit_request(Some("u1"), "Paracetamol", "Alger")
            .await
            .unwrap();
        let response = service
            .submit_response("ph1", &request.id, AvailabilityStatus::Available, Some(250.0), None)
            .await
            .unwrap();

        assert_eq!(response.pharmacy.id, "ph1");
        assert_eq!(response.price, Some(250.0));

        let notifications = directory.list_notifications("u1").await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Response);
    }

    #[tokio::test]
    async fn test_guest_request_response_notifies_nobody() {
        let (service, directory) = service();
        seed_pharmacy(&directory, "ph1", "Alger").await;

        let request = service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        service
            .submit_response("ph1", &request.id, AvailabilityStatus::Available, None, None)
            .await
            .unwrap();

        // Only the fan-out notification to the pharmacy exists.
        assert_eq!(directory.list_notifications("ph1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_available_response_does_not_notify_requester() {
        let (service, directory) = service();
        seed_pharmacy(&directory, "ph1", "Alger").await;

        let request = service
            .submit_request(Some("u1"), "Paracetamol", "Alger")
            .await
            .unwrap();
        let response = service
            .submit_response("ph1", &request.id, AvailabilityStatus::NotAvailable, None, None)
            .await
            .unwrap();

        // The response itself is still recorded.
        assert_eq!(response.status, AvailabilityStatus::NotAvailable);
        assert_eq!(directory.list_responses(&request.id).await.unwrap().len(), 1);
        assert!(directory.list_notifications("u1").await.unwrap().is_empty());

        // An actionable answer to the same request notifies.
        service
            .submit_response("ph1", &request.id, AvailabilityStatus::Alternative, None, Some("Doliprane".to_string()))
            .await
            .unwrap();
        assert_eq!(directory.list_notifications("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_response_to_unknown_request_fails() {
        let (service, directory) = service();
        seed_pharmacy(&directory, "ph1", "Alger").await;

        let result = service
            .submit_response("ph1", "missing", AvailabilityStatus::Available, None, None)
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
        assert!(directory.list_responses("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_requests_age_out_at_read_time() {
        let (service, directory) = service();

        let stale = SearchRequest {
            id: "old".to_string(),
            medicine_name: "Aspirin".to_string(),
            wilaya: "Alger".to_string(),
            timestamp: Utc::now() - Duration::seconds(REQUEST_QUERY_WINDOW_SECS + 60),
            status: RequestStatus::Active,
            user_id: None,
        };
        directory.put_request(&stale).await.unwrap();
        service.submit_request(None, "Paracetamol", "Alger").await.unwrap();

        let live = service.live_requests("Alger").await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].medicine_name, "Paracetamol");

        // The stale record itself keeps its stored status.
        let stored = directory.get_request("old").await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Active);
    }

    #[tokio::test]
    async fn test_stream_snapshot_filter_applies_window_and_wilaya() {
        let now = Utc::now();
        let make = |id: &str, wilaya: &str, age_secs: i64| SearchRequest {
            id: id.to_string(),
            medicine_name: "Paracetamol".to_string(),
            wilaya: wilaya.to_string(),
            timestamp: now - Duration::seconds(age_secs),
            status: RequestStatus::Active,
            user_id: None,
        };

        let filtered = SearchService::filter_stream_snapshot(
            vec![
                make("fresh", "Alger", 10),
                make("aged", "Alger", REQUEST_QUERY_WINDOW_SECS + 30),
                make("stale", "Alger", REQUEST_STREAM_WINDOW_SECS + 60),
                make("elsewhere", "Oran", 10),
            ],
            "Alger",
        );

        let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh", "aged"]);
        // Inside the stream window but past the query window: expired.
        assert_eq!(filtered[0].status, RequestStatus::Active);
        assert_eq!(filtered[1].status, RequestStatus::Expired);
    }

    #[tokio::test]
    async fn test_trending_counts_case_insensitive() {
        let (service, _) = service();

        for _ in 0..3 {
            service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        }
        // Lowercase spelling, and the most recent entry: the displayed name
        // must still come out capitalized.
        service.submit_request(None, "paracetamol", "Oran").await.unwrap();
        service.submit_request(None, "ibuprofen", "Alger").await.unwrap();

        let stats = service.trending(None).await.unwrap();
        assert_eq!(stats[0].name, "Paracetamol");
        assert_eq!(stats[0].count, 4);
        assert_eq!(stats[0].percentage, 80);
        assert_eq!(stats[1].name, "Ibuprofen");
        assert_eq!(stats[1].count, 1);
        assert_eq!(stats[1].percentage, 20);
    }

    #[tokio::test]
    async fn test_trending_scoped_to_wilaya() {
        let (service, _) = service();

        service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        service.submit_request(None, "Aspirin", "Oran").await.unwrap();

        let stats = service.trending(Some("Alger")).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "Paracetamol");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].percentage, 100);
    }

    #[tokio::test]
    async fn test_trending_percentage_rounds() {
        let (service, _) = service();

        service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        service.submit_request(None, "Paracetamol", "Alger").await.unwrap();
        service.submit_request(None, "Aspirin", "Alger").await.unwrap();

        let stats = service.trending(None).await.unwrap();
        assert_eq!(stats[0].percentage, 67);
        assert_eq!(stats[1].percentage, 33);
    }

    #[tokio::test]
    async fn test_trending_empty_history() {
        let (service, _) = service();
        assert!(service.trending(None).await.unwrap().is_empty());
    }
}
