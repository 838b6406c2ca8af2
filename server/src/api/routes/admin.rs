//! Admin account management endpoints
//!
//! All handlers pass the caller id to the domain layer, which re-reads the
//! caller's own profile and requires the admin role there.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthPrincipal;
use crate::api::extractors::ValidatedJson;
use crate::api::types::{AccountBody, ApiError};
use crate::data::types::ProfileRecord;
use crate::domain::{AccountService, RepairOutcome};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(nested)]
    pub account: AccountBody,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MigrateAccountRequest {
    /// Profile fields for the account under its new email.
    #[validate(nested)]
    pub account: AccountBody,
    #[validate(length(min = 1, message = "New password cannot be empty"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RepairAccountRequest {
    #[validate(nested)]
    pub account: AccountBody,
    #[validate(length(min = 1, message = "New password cannot be empty"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RepairAccountResponse {
    pub outcome: RepairOutcome,
}

#[derive(Clone)]
pub struct AdminApiState {
    pub accounts: Arc<AccountService>,
}

/// Build admin routes
pub fn routes(accounts: Arc<AccountService>) -> Router {
    let state = AdminApiState { accounts };

    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", delete(delete_account))
        .route("/accounts/{id}/migrate", post(migrate_account))
        .route("/accounts/{id}/repair", post(repair_account))
        .with_state(state)
}

/// List all accounts
#[utoipa::path(
    get,
    path = "/api/v1/admin/accounts",
    tag = "admin",
    responses(
        (status = 200, description = "All profile records", body = [ProfileRecord]),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_accounts(
    State(state): State<AdminApiState>,
    principal: AuthPrincipal,
) -> Result<Json<Vec<ProfileRecord>>, ApiError> {
    let profiles = state.accounts.list_accounts(&principal.user_id).await?;
    Ok(Json(profiles))
}

/// Create an account for a third party
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts",
    tag = "admin",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = ProfileRecord),
        (status = 400, description = "Weak password or invalid payload"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already has an account")
    )
)]
pub async fn create_account(
    State(state): State<AdminApiState>,
    principal: AuthPrincipal,
    ValidatedJson(request): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ProfileRecord>), ApiError> {
    let account = request.account.into_new_account()?;
    let profile = state
        .accounts
        .create_account(&principal.user_id, &account, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Migrate an account to a new email
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts/{id}/migrate",
    tag = "admin",
    request_body = MigrateAccountRequest,
    params(
        ("id" = String, Path, description = "Current profile id")
    ),
    responses(
        (status = 200, description = "Account migrated, new profile returned", body = ProfileRecord),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "New email already has an account")
    )
)]
pub async fn migrate_account(
    State(state): State<AdminApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<MigrateAccountRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let account = request.account.into_new_account()?;
    let profile = state
        .accounts
        .migrate_account(&principal.user_id, &id, &account, &request.new_password)
        .await?;
    Ok(Json(profile))
}

/// Repair the credential pairing for a same-email edit
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts/{id}/repair",
    tag = "admin",
    request_body = RepairAccountRequest,
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    responses(
        (status = 200, description = "Pairing restored", body = RepairAccountResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Existing credential has a different password")
    )
)]
pub async fn repair_account(
    State(state): State<AdminApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RepairAccountRequest>,
) -> Result<Json<RepairAccountResponse>, ApiError> {
    let account = request.account.into_new_account()?;
    let outcome = state
        .accounts
        .repair_or_set_password(&principal.user_id, &id, &account, &request.new_password)
        .await?;
    Ok(Json(RepairAccountResponse { outcome }))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/api/v1/admin/accounts/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "Profile id")
    ),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn delete_account(
    State(state): State<AdminApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .accounts
        .delete_account(&principal.user_id, &id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
