//! Favorites endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::auth::AuthPrincipal;
use crate::api::types::ApiError;
use crate::data::directory::DirectoryStore;
use crate::data::types::PharmacyProfile;

#[derive(Clone)]
pub struct FavoritesApiState {
    pub directory: Arc<dyn DirectoryStore>,
}

/// Build favorites routes. The whole router requires authentication.
pub fn routes(directory: Arc<dyn DirectoryStore>) -> Router {
    let state = FavoritesApiState { directory };

    Router::new()
        .route("/", get(list_favorites))
        .route(
            "/{pharmacy_id}",
            get(check_favorite)
                .put(add_favorite)
                .delete(remove_favorite),
        )
        .with_state(state)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteStatusResponse {
    pub favorite: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveFavoriteResponse {
    pub removed: bool,
}

/// List the caller's favorite pharmacies
#[utoipa::path(
    get,
    path = "/api/v1/favorites",
    tag = "favorites",
    responses(
        (status = 200, description = "Favorite pharmacies", body = [PharmacyProfile]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_favorites(
    State(state): State<FavoritesApiState>,
    principal: AuthPrincipal,
) -> Result<Json<Vec<PharmacyProfile>>, ApiError> {
    let favorites = state
        .directory
        .list_favorites(&principal.user_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(favorites))
}

/// Check whether a pharmacy is favorited
#[utoipa::path(
    get,
    path = "/api/v1/favorites/{pharmacy_id}",
    tag = "favorites",
    params(
        ("pharmacy_id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Favorite status", body = FavoriteStatusResponse)
    )
)]
pub async fn check_favorite(
    State(state): State<FavoritesApiState>,
    principal: AuthPrincipal,
    Path(pharmacy_id): Path<String>,
) -> Result<Json<FavoriteStatusResponse>, ApiError> {
    let favorite = state
        .directory
        .is_favorite(&principal.user_id, &pharmacy_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(FavoriteStatusResponse { favorite }))
}

/// Add a pharmacy to favorites
#[utoipa::path(
    put,
    path = "/api/v1/favorites/{pharmacy_id}",
    tag = "favorites",
    params(
        ("pharmacy_id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 201, description = "Favorite added"),
        (status = 404, description = "Pharmacy not found")
    )
)]
pub async fn add_favorite(
    State(state): State<FavoritesApiState>,
    principal: AuthPrincipal,
    Path(pharmacy_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let pharmacy = state
        .directory
        .get_pharmacy(&pharmacy_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", "Pharmacy not found"))?;

    state
        .directory
        .add_favorite(&principal.user_id, &pharmacy)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(StatusCode::CREATED)
}

/// Remove a pharmacy from favorites (idempotent)
#[utoipa::path(
    delete,
    path = "/api/v1/favorites/{pharmacy_id}",
    tag = "favorites",
    params(
        ("pharmacy_id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Removal result", body = RemoveFavoriteResponse)
    )
)]
pub async fn remove_favorite(
    State(state): State<FavoritesApiState>,
    principal: AuthPrincipal,
    Path(pharmacy_id): Path<String>,
) -> Result<Json<RemoveFavoriteResponse>, ApiError> {
    let removed = state
        .directory
        .remove_favorite(&principal.user_id, &pharmacy_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(RemoveFavoriteResponse { removed }))
}
