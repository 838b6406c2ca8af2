//! Session authentication

pub mod jwt;
pub mod manager;
pub mod middleware;

pub use manager::AuthManager;
pub use middleware::{AuthError, AuthPrincipal, AuthState, MaybePrincipal, optional_auth, require_auth};
