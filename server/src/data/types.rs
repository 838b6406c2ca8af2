//! Directory record types
//!
//! The record shapes stored in the directory tree: one `ProfileRecord` per
//! identity, role sub-records, child collections keyed by the owning profile
//! id, and the global collections (medicine catalog, search requests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role, stored on the profile record and re-read from the
/// directory for every privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    User,
    Pharmacy,
    Admin,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::Pharmacy => "PHARMACY",
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level record describing a person or organization.
///
/// The id always equals the credential-store identity id; the pairing is
/// maintained by the account lifecycle workflow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileRecord {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wilaya: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Pharmacy sub-record with business data and the rating aggregate.
///
/// `rating` is the mean of all review ratings for this pharmacy rounded to
/// two decimals, and `reviews_count` is their count. The pair is only ever
/// mutated together, inside the store's review transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PharmacyProfile {
    pub id: String,
    pub name: String,
    pub wilaya: String,
    pub commune: String,
    pub phone: String,
    pub email: String,
    pub approved: bool,
    pub rating: f64,
    pub reviews_count: u32,
}

/// A single review of a pharmacy. Immutable after creation; there is no
/// edit or delete path, so the aggregate never has to be reversed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: String,
    pub target_id: String,
    pub author_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// Global catalog entry, admin-owned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// Availability answer a pharmacy gives for a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,
    NotAvailable,
    Alternative,
}

/// Stock line of a pharmacy's own inventory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockItem {
    pub id: String,
    pub pharmacy_id: String,
    pub medicine_name: String,
    pub availability: AvailabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Active,
    Expired,
}

/// A live medicine search. Freshness is evaluated at read time against the
/// timestamp; the stored status never ages in place.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub id: String,
    pub medicine_name: String,
    pub wilaya: String,
    pub timestamp: DateTime<Utc>,
    pub status: RequestStatus,
    /// None for guest searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A pharmacy's answer to a search request, stored as a child of the
/// request with a denormalized snapshot of the pharmacy at response time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub id: String,
    pub request_id: String,
    pub pharmacy: PharmacyProfile,
    pub status: AvailabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Review,
    System,
    Request,
    Response,
}

/// Notification owned by the recipient profile. Only `read` is ever
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppNotification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Aggregated demand for one medicine name over recent search requests.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrugStat {
    pub name: String,
    pub count: u64,
    pub percentage: u64,
}

/// Profile data for a new or edited account, keyed by role.
///
/// Resolved once at the API boundary; each variant carries the explicit
/// field set its role needs instead of an open-ended field bag.
#[derive(Debug, Clone)]
pub enum NewAccount {
    Pharmacy(NewPharmacyAccount),
    User(NewContactAccount),
    Doctor(NewContactAccount),
    Admin(NewContactAccount),
}

#[derive(Debug, Clone)]
pub struct NewPharmacyAccount {
    pub email: String,
    pub name: String,
    pub wilaya: String,
    pub commune: String,
    pub phone: String,
    pub approved: bool,
}

#[derive(Debug, Clone)]
pub struct NewContactAccount {
    pub email: String,
    pub name: String,
    pub wilaya: Option<String>,
    pub phone: Option<String>,
}

impl NewAccount {
    pub fn role(&self) -> Role {
        match self {
            NewAccount::Pharmacy(_) => Role::Pharmacy,
            NewAccount::User(_) => Role::User,
            NewAccount::Doctor(_) => Role::Doctor,
            NewAccount::Admin(_) => Role::Admin,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            NewAccount::Pharmacy(p) => &p.email,
            NewAccount::User(c) | NewAccount::Doctor(c) | NewAccount::Admin(c) => &c.email,
        }
    }

    /// Build the profile record this account maps to, under the given
    /// identity id.
    pub fn to_profile(&self, id: &str, created_at: DateTime<Utc>) -> ProfileRecord {
        match self {
            NewAccount::Pharmacy(p) => ProfileRecord {
                id: id.to_string(),
                role: Role::Pharmacy,
                name: p.name.clone(),
                email: p.email.clone(),
                phone: Some(p.phone.clone()),
                wilaya: Some(p.wilaya.clone()),
                commune: Some(p.commune.clone()),
                approved: Some(p.approved),
                created_at,
            },
            NewAccount::User(c) | NewAccount::Doctor(c) | NewAccount::Admin(c) => ProfileRecord {
                id: id.to_string(),
                role: self.role(),
                name: c.name.clone(),
                email: c.email.clone(),
                phone: c.phone.clone(),
                wilaya: c.wilaya.clone(),
                commune: None,
                approved: None,
                created_at,
            },
        }
    }

    /// Build the pharmacy sub-record for pharmacy accounts, with the
    /// rating aggregate zeroed.
    pub fn to_pharmacy_profile(&self, id: &str) -> Option<PharmacyProfile> {
        match self {
            NewAccount::Pharmacy(p) => Some(PharmacyProfile {
                id: id.to_string(),
                name: p.name.clone(),
                wilaya: p.wilaya.clone(),
                commune: p.commune.clone(),
                phone: p.phone.clone(),
                email: p.email.clone(),
                approved: p.approved,
                rating: 0.0,
                reviews_count: 0,
            }),
            _ => None,
        }
    }
}
