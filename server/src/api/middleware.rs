//! HTTP middleware (CORS, 404 handler)

use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use tower_http::cors::{Any, CorsLayer};

/// Create CORS layer
///
/// Sessions are carried as Bearer tokens, not cookies, so cross-origin
/// requests carry no ambient credentials and any origin is acceptable.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CACHE_CONTROL,
        ])
}

/// Handle 404 Not Found with logging
pub async fn handle_404(method: Method, uri: axum::http::Uri) -> impl IntoResponse {
    tracing::debug!(%method, %uri, "Unmatched route");
    StatusCode::NOT_FOUND
}
