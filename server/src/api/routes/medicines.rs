//! Medicine catalog endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::{AuthPrincipal, AuthState, require_auth};
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::data::types::Medicine;
use crate::domain::CatalogService;

#[derive(Clone)]
pub struct MedicinesApiState {
    pub catalog: Arc<CatalogService>,
}

/// Build medicine catalog routes
pub fn routes(catalog: Arc<CatalogService>, auth_state: AuthState) -> Router {
    let state = MedicinesApiState { catalog };

    let protected = Router::new()
        .route("/", axum::routing::post(create_medicine))
        .route(
            "/{id}",
            axum::routing::put(update_medicine).delete(delete_medicine),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            require_auth,
        ));

    Router::new()
        .route("/", get(list_medicines))
        .merge(protected)
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MedicineBody {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub category: String,
}

/// List the catalog
#[utoipa::path(
    get,
    path = "/api/v1/medicines",
    tag = "medicines",
    responses(
        (status = 200, description = "Catalog entries", body = [Medicine])
    )
)]
pub async fn list_medicines(
    State(state): State<MedicinesApiState>,
) -> Result<Json<Vec<Medicine>>, ApiError> {
    let medicines = state.catalog.list().await?;
    Ok(Json(medicines))
}

/// Create a catalog entry (admin)
#[utoipa::path(
    post,
    path = "/api/v1/medicines",
    tag = "medicines",
    request_body = MedicineBody,
    responses(
        (status = 201, description = "Entry created", body = Medicine),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_medicine(
    State(state): State<MedicinesApiState>,
    principal: AuthPrincipal,
    ValidatedJson(body): ValidatedJson<MedicineBody>,
) -> Result<(StatusCode, Json<Medicine>), ApiError> {
    let medicine = state
        .catalog
        .upsert(&principal.user_id, None, &body.name, &body.category)
        .await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

/// Update a catalog entry (admin)
#[utoipa::path(
    put,
    path = "/api/v1/medicines/{id}",
    tag = "medicines",
    request_body = MedicineBody,
    params(
        ("id" = String, Path, description = "Medicine id")
    ),
    responses(
        (status = 200, description = "Entry updated", body = Medicine),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn update_medicine(
    State(state): State<MedicinesApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<MedicineBody>,
) -> Result<Json<Medicine>, ApiError> {
    let medicine = state
        .catalog
        .upsert(&principal.user_id, Some(&id), &body.name, &body.category)
        .await?;
    Ok(Json(medicine))
}

/// Delete a catalog entry (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/medicines/{id}",
    tag = "medicines",
    params(
        ("id" = String, Path, description = "Medicine id")
    ),
    responses(
        (status = 200, description = "Entry deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn delete_medicine(
    State(state): State<MedicinesApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.catalog.delete(&principal.user_id, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
