//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{admin, auth, favorites, health, medicines, notifications, pharmacies, search};
use crate::api::types::AccountBody;
use crate::data::types::{
    AppNotification, AvailabilityStatus, DrugStat, Medicine, NotificationKind, PharmacyProfile,
    ProfileRecord, RequestStatus, Review, Role, SearchRequest, SearchResponse, StockItem,
};
use crate::domain::RepairOutcome;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Findo API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Pharmacy directory and medicine search"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "admin", description = "Admin account management"),
        (name = "pharmacies", description = "Pharmacy directory, reviews, stock"),
        (name = "medicines", description = "Medicine catalog"),
        (name = "favorites", description = "User favorites"),
        (name = "search", description = "Search requests and responses"),
        (name = "notifications", description = "Notification feed")
    ),
    paths(
        // Health
        health::health,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        // Admin
        admin::list_accounts,
        admin::create_account,
        admin::migrate_account,
        admin::repair_account,
        admin::delete_account,
        // Pharmacies
        pharmacies::list_pharmacies,
        pharmacies::get_pharmacy,
        pharmacies::update_profile,
        pharmacies::add_review,
        pharmacies::list_reviews,
        pharmacies::list_stock,
        pharmacies::replace_stock,
        // Medicines
        medicines::list_medicines,
        medicines::create_medicine,
        medicines::update_medicine,
        medicines::delete_medicine,
        // Favorites
        favorites::list_favorites,
        favorites::check_favorite,
        favorites::add_favorite,
        favorites::remove_favorite,
        // Search
        search::submit_request,
        search::live_requests,
        search::list_responses,
        search::submit_response,
        search::trending,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
    ),
    components(schemas(
        // Record types
        Role,
        ProfileRecord,
        PharmacyProfile,
        Review,
        Medicine,
        StockItem,
        AvailabilityStatus,
        RequestStatus,
        SearchRequest,
        SearchResponse,
        AppNotification,
        NotificationKind,
        DrugStat,
        RepairOutcome,
        // Shared payloads
        AccountBody,
        // Health
        health::HealthResponse,
        // Auth
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::SessionResponse,
        // Admin
        admin::CreateAccountRequest,
        admin::MigrateAccountRequest,
        admin::RepairAccountRequest,
        admin::RepairAccountResponse,
        // Pharmacies
        pharmacies::UpdateProfileRequest,
        pharmacies::AddReviewRequest,
        pharmacies::AddReviewResponse,
        pharmacies::StockItemBody,
        pharmacies::ReplaceStockRequest,
        // Medicines
        medicines::MedicineBody,
        // Favorites
        favorites::FavoriteStatusResponse,
        favorites::RemoveFavoriteResponse,
        // Search
        search::SubmitRequestBody,
        search::SubmitResponseBody,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Findo API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;
