//! Workflow services
//!
//! The application logic between the API surface and the stores: account
//! lifecycle, rating aggregation, search fan-out and response collection,
//! notification access, and the medicine catalog. Services hold the store
//! trait objects and surface [`DomainError`] codes the API maps to HTTP.

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod notifications;
pub mod reviews;
pub mod search;

pub use accounts::{AccountService, RepairOutcome};
pub use catalog::CatalogService;
pub use error::DomainError;
pub use notifications::NotificationService;
pub use reviews::ReviewService;
pub use search::SearchService;
