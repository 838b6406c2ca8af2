//! Shared API types
//!
//! The error envelope every endpoint returns and the account payload the
//! auth and admin surfaces share. Domain error codes pass through to the
//! client unchanged; only the HTTP status is decided here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::data::types::{NewAccount, NewContactAccount, NewPharmacyAccount, Role};
use crate::domain::DomainError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    Conflict { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let code = err.code().to_string();
        let message = err.to_string();
        match err {
            DomainError::AccountExists | DomainError::AuthExistsConflict => {
                Self::Conflict { code, message }
            }
            DomainError::WeakSecret | DomainError::InvalidInput(_) => {
                Self::BadRequest { code, message }
            }
            DomainError::NotFound(_) => Self::NotFound { code, message },
            DomainError::PermissionDenied(_) => Self::Forbidden { code, message },
            DomainError::ProfileWriteFailed(_) | DomainError::Credential(_) => {
                tracing::error!(code, error = %message, "Domain operation failed");
                Self::Internal { message }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::Conflict { code, message } => (StatusCode::CONFLICT, "conflict", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Account payload used by self-registration and the admin account
/// endpoints. Resolved into the role-specific [`NewAccount`] shape before
/// it reaches the domain layer.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AccountBody {
    pub role: Role,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub approved: bool,
}

impl AccountBody {
    pub fn into_new_account(self) -> Result<NewAccount, ApiError> {
        match self.role {
            Role::Pharmacy => {
                let missing = |field: &str| {
                    ApiError::bad_request(
                        "MISSING_FIELD",
                        format!("Pharmacy accounts require {field}"),
                    )
                };
                Ok(NewAccount::Pharmacy(NewPharmacyAccount {
                    email: self.email,
                    name: self.name,
                    wilaya: self.wilaya.ok_or_else(|| missing("wilaya"))?,
                    commune: self.commune.ok_or_else(|| missing("commune"))?,
                    phone: self.phone.ok_or_else(|| missing("phone"))?,
                    approved: self.approved,
                }))
            }
            Role::User | Role::Doctor | Role::Admin => {
                let contact = NewContactAccount {
                    email: self.email,
                    name: self.name,
                    wilaya: self.wilaya,
                    phone: self.phone,
                };
                Ok(match self.role {
                    Role::User => NewAccount::User(contact),
                    Role::Doctor => NewAccount::Doctor(contact),
                    _ => NewAccount::Admin(contact),
                })
            }
            Role::Guest => Err(ApiError::bad_request(
                "INVALID_ROLE",
                "Guest is not an account role",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(role: Role) -> AccountBody {
        AccountBody {
            role,
            email: "x@x.dz".to_string(),
            name: "X".to_string(),
            wilaya: Some("Alger".to_string()),
            commune: Some("Centre".to_string()),
            phone: Some("0550000001".to_string()),
            approved: true,
        }
    }

    #[test]
    fn test_pharmacy_body_requires_location_fields() {
        let mut incomplete = body(Role::Pharmacy);
        incomplete.commune = None;
        assert!(incomplete.into_new_account().is_err());

        assert!(matches!(
            body(Role::Pharmacy).into_new_account(),
            Ok(NewAccount::Pharmacy(_))
        ));
    }

    #[test]
    fn test_guest_role_rejected() {
        assert!(body(Role::Guest).into_new_account().is_err());
    }

    #[test]
    fn test_conflict_errors_map_to_409() {
        let api: ApiError = DomainError::AccountExists.into();
        assert!(matches!(api, ApiError::Conflict { .. }));
        let api: ApiError = DomainError::AuthExistsConflict.into();
        assert!(matches!(api, ApiError::Conflict { .. }));
    }
}
