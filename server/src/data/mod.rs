//! Data storage layer
//!
//! Provides the two backing stores for the application:
//! - `credentials` - The authentication provider: (email, password) pairs
//!   mapped to opaque identity ids
//! - `directory` - The document database: profiles, pharmacy sub-records,
//!   stock, reviews, requests and their responses, notifications
//! - `types` - Shared record types across both stores
//!
//! Both stores are behind traits so the application never depends on a
//! concrete backend. The shipped implementations are in-memory.

pub mod credentials;
pub mod directory;
pub mod types;

pub use credentials::{CredentialError, CredentialStore, IsolatedContext, MemoryCredentialStore};
pub use directory::{
    DirectoryError, DirectoryStore, MemoryDirectoryStore, SnapshotWatch, WatchError,
};
