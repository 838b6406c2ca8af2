//! Pharmacy directory endpoints
//!
//! Reads are public. Review submission requires a signed-in caller, and
//! stock or business-profile writes are restricted to the owning pharmacy.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::auth::{AuthPrincipal, AuthState, require_auth};
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::data::directory::DirectoryStore;
use crate::data::types::{AvailabilityStatus, PharmacyProfile, Review, StockItem};
use crate::domain::ReviewService;

#[derive(Clone)]
pub struct PharmaciesApiState {
    pub directory: Arc<dyn DirectoryStore>,
    pub reviews: Arc<ReviewService>,
}

/// Build pharmacy routes
pub fn routes(state: PharmaciesApiState, auth_state: AuthState) -> Router {
    let protected = Router::new()
        .route("/{id}", put(update_profile))
        .route("/{id}/reviews", axum::routing::post(add_review))
        .route("/{id}/stock", put(replace_stock))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            require_auth,
        ));

    Router::new()
        .route("/", get(list_pharmacies))
        .route("/{id}", get(get_pharmacy))
        .route("/{id}/reviews", get(list_reviews))
        .route("/{id}/stock", get(list_stock))
        .merge(protected)
        .with_state(state)
}

/// List all pharmacies
#[utoipa::path(
    get,
    path = "/api/v1/pharmacies",
    tag = "pharmacies",
    responses(
        (status = 200, description = "All pharmacy profiles", body = [PharmacyProfile])
    )
)]
pub async fn list_pharmacies(
    State(state): State<PharmaciesApiState>,
) -> Result<Json<Vec<PharmacyProfile>>, ApiError> {
    let pharmacies = state
        .directory
        .list_pharmacies()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(pharmacies))
}

/// Get one pharmacy
#[utoipa::path(
    get,
    path = "/api/v1/pharmacies/{id}",
    tag = "pharmacies",
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Pharmacy profile", body = PharmacyProfile),
        (status = 404, description = "Pharmacy not found")
    )
)]
pub async fn get_pharmacy(
    State(state): State<PharmaciesApiState>,
    Path(id): Path<String>,
) -> Result<Json<PharmacyProfile>, ApiError> {
    state
        .directory
        .get_pharmacy(&id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", "Pharmacy not found"))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "Wilaya cannot be empty"))]
    pub wilaya: String,
    pub commune: String,
    pub phone: String,
}

/// Update the pharmacy's own business profile
#[utoipa::path(
    put,
    path = "/api/v1/pharmacies/{id}",
    tag = "pharmacies",
    request_body = UpdateProfileRequest,
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Profile updated", body = PharmacyProfile),
        (status = 403, description = "Caller does not own this pharmacy"),
        (status = 404, description = "Pharmacy not found")
    )
)]
pub async fn update_profile(
    State(state): State<PharmaciesApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<PharmacyProfile>, ApiError> {
    if principal.user_id != id {
        return Err(ApiError::forbidden(
            "PERMISSION_DENIED",
            "Only the owning pharmacy can edit this profile",
        ));
    }

    // The rating aggregate stays untouched; only the aggregator writes it.
    let mut profile = state
        .directory
        .get_pharmacy(&id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("NOT_FOUND", "Pharmacy not found"))?;
    profile.name = request.name;
    profile.wilaya = request.wilaya;
    profile.commune = request.commune;
    profile.phone = request.phone;

    state
        .directory
        .put_pharmacy(&profile)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddReviewResponse {
    pub rating: f64,
    pub reviews_count: u32,
}

/// Submit a review
#[utoipa::path(
    post,
    path = "/api/v1/pharmacies/{id}/reviews",
    tag = "pharmacies",
    request_body = AddReviewRequest,
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 201, description = "Review committed, new aggregate returned", body = AddReviewResponse),
        (status = 400, description = "Rating out of range"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Pharmacy not found")
    )
)]
pub async fn add_review(
    State(state): State<PharmaciesApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<AddReviewRequest>,
) -> Result<(StatusCode, Json<AddReviewResponse>), ApiError> {
    let author_name = state
        .directory
        .get_profile(&principal.user_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map(|p| p.name)
        .unwrap_or_else(|| "Anonymous".to_string());

    let updated = state
        .reviews
        .add_review(
            &principal.user_id,
            &author_name,
            &id,
            request.rating,
            &request.comment,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddReviewResponse {
            rating: updated.rating,
            reviews_count: updated.reviews_count,
        }),
    ))
}

/// List a pharmacy's reviews
#[utoipa::path(
    get,
    path = "/api/v1/pharmacies/{id}/reviews",
    tag = "pharmacies",
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Reviews, newest first", body = [Review])
    )
)]
pub async fn list_reviews(
    State(state): State<PharmaciesApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = state.reviews.list_reviews(&id).await?;
    Ok(Json(reviews))
}

/// List a pharmacy's stock
#[utoipa::path(
    get,
    path = "/api/v1/pharmacies/{id}/stock",
    tag = "pharmacies",
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Stock items", body = [StockItem])
    )
)]
pub async fn list_stock(
    State(state): State<PharmaciesApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StockItem>>, ApiError> {
    let stock = state
        .directory
        .list_stock(&id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(stock))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockItemBody {
    /// Omitted for new items.
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Medicine name cannot be empty"))]
    pub medicine_name: String,
    pub availability: AvailabilityStatus,
    pub price: Option<f64>,
    pub alternative_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplaceStockRequest {
    #[validate(nested)]
    pub items: Vec<StockItemBody>,
}

/// Write the pharmacy's own stock items
#[utoipa::path(
    put,
    path = "/api/v1/pharmacies/{id}/stock",
    tag = "pharmacies",
    request_body = ReplaceStockRequest,
    params(
        ("id" = String, Path, description = "Pharmacy id")
    ),
    responses(
        (status = 200, description = "Stock written", body = [StockItem]),
        (status = 403, description = "Caller does not own this pharmacy")
    )
)]
pub async fn replace_stock(
    State(state): State<PharmaciesApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReplaceStockRequest>,
) -> Result<Json<Vec<StockItem>>, ApiError> {
    if principal.user_id != id {
        return Err(ApiError::forbidden(
            "PERMISSION_DENIED",
            "Only the owning pharmacy can edit its stock",
        ));
    }

    let now = Utc::now();
    let mut written = Vec::with_capacity(request.items.len());
    for body in request.items {
        let item = StockItem {
            id: body
                .id
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            pharmacy_id: id.clone(),
            medicine_name: body.medicine_name,
            availability: body.availability,
            price: body.price,
            alternative_name: body.alternative_name,
            updated_at: now,
        };
        state
            .directory
            .put_stock_item(&id, &item)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        written.push(item);
    }

    Ok(Json(written))
}
