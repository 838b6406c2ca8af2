//! Search request and response endpoints
//!
//! Request submission works for guests and signed-in users alike, so these
//! routes sit behind the optional-auth middleware; only the response
//! submission requires a session. The two stream endpoints deliver full
//! snapshots over SSE and terminate cleanly on server shutdown.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::watch;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::{AuthPrincipal, AuthState, MaybePrincipal, optional_auth, require_auth};
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::core::constants::SSE_KEEP_ALIVE_SECS;
use crate::data::directory::WatchError;
use crate::data::types::{AvailabilityStatus, DrugStat, SearchRequest, SearchResponse};
use crate::domain::SearchService;

#[derive(Clone)]
pub struct SearchApiState {
    pub search: Arc<SearchService>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Build search routes
pub fn routes(state: SearchApiState, auth_state: AuthState) -> Router {
    let protected = Router::new()
        .route("/requests/{id}/responses", post(submit_response))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/requests", get(live_requests).post(submit_request))
        .route("/requests/stream", get(stream_requests))
        .route("/requests/{id}/responses", get(list_responses))
        .route("/requests/{id}/responses/stream", get(stream_responses))
        .route("/trending", get(trending))
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            optional_auth,
        ))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitRequestBody {
    #[validate(length(min = 1, message = "Medicine name cannot be empty"))]
    pub medicine_name: String,
    #[validate(length(min = 1, message = "Wilaya cannot be empty"))]
    pub wilaya: String,
}

/// Submit a medicine search request
#[utoipa::path(
    post,
    path = "/api/v1/search/requests",
    tag = "search",
    request_body = SubmitRequestBody,
    responses(
        (status = 201, description = "Request submitted", body = SearchRequest),
        (status = 400, description = "Missing medicine name or wilaya")
    )
)]
pub async fn submit_request(
    State(state): State<SearchApiState>,
    MaybePrincipal(principal): MaybePrincipal,
    ValidatedJson(body): ValidatedJson<SubmitRequestBody>,
) -> Result<(StatusCode, Json<SearchRequest>), ApiError> {
    let user_id = principal.as_ref().map(|p| p.user_id.as_str());
    let request = state
        .search
        .submit_request(user_id, &body.medicine_name, &body.wilaya)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub struct WilayaQuery {
    pub wilaya: String,
}

/// Recent requests for a wilaya
#[utoipa::path(
    get,
    path = "/api/v1/search/requests",
    tag = "search",
    params(
        ("wilaya" = String, Query, description = "Target wilaya")
    ),
    responses(
        (status = 200, description = "Recent requests with effective status", body = [SearchRequest])
    )
)]
pub async fn live_requests(
    State(state): State<SearchApiState>,
    Query(query): Query<WilayaQuery>,
) -> Result<Json<Vec<SearchRequest>>, ApiError> {
    let requests = state.search.live_requests(&query.wilaya).await?;
    Ok(Json(requests))
}

/// Stream request snapshots for a wilaya over SSE
pub async fn stream_requests(
    State(state): State<SearchApiState>,
    Query(query): Query<WilayaQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = state.search.stream_snapshot(&query.wilaya).await?;
    let mut watch = state.search.watch_requests();
    let mut shutdown_rx = state.shutdown_rx.clone();
    let wilaya = query.wilaya;

    let stream = async_stream::stream! {
        if let Ok(data) = serde_json::to_string(&initial) {
            yield Ok(Event::default().event("requests").data(data));
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        yield Ok(Event::default().event("terminate").data("shutdown"));
                        break;
                    }
                }
                result = watch.recv() => {
                    match result {
                        Ok(snapshot) => {
                            let filtered = SearchService::filter_stream_snapshot(snapshot, &wilaya);
                            match serde_json::to_string(&filtered) {
                                Ok(data) => yield Ok(Event::default().event("requests").data(data)),
                                Err(e) => tracing::error!(error = %e, "Failed to serialize request snapshot"),
                            }
                        }
                        // The next recv returns a current snapshot.
                        Err(WatchError::Lagged(n)) => {
                            tracing::warn!(lagged = n, "Request stream subscriber lagged behind");
                        }
                        Err(WatchError::Closed) => break,
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

/// Responses collected for a request
#[utoipa::path(
    get,
    path = "/api/v1/search/requests/{id}/responses",
    tag = "search",
    params(
        ("id" = String, Path, description = "Request id")
    ),
    responses(
        (status = 200, description = "Responses", body = [SearchResponse]),
        (status = 404, description = "Request not found")
    )
)]
pub async fn list_responses(
    State(state): State<SearchApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SearchResponse>>, ApiError> {
    let responses = state.search.responses(&id).await?;
    Ok(Json(responses))
}

/// Stream response snapshots for a request over SSE
pub async fn stream_responses(
    State(state): State<SearchApiState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = state.search.responses(&id).await?;
    let mut watch = state.search.watch_responses(&id);
    let mut shutdown_rx = state.shutdown_rx.clone();

    let stream = async_stream::stream! {
        if let Ok(data) = serde_json::to_string(&initial) {
            yield Ok(Event::default().event("responses").data(data));
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        yield Ok(Event::default().event("terminate").data("shutdown"));
                        break;
                    }
                }
                result = watch.recv() => {
                    match result {
                        Ok(snapshot) => {
                            match serde_json::to_string(&snapshot) {
                                Ok(data) => yield Ok(Event::default().event("responses").data(data)),
                                Err(e) => tracing::error!(error = %e, "Failed to serialize response snapshot"),
                            }
                        }
                        Err(WatchError::Lagged(n)) => {
                            tracing::warn!(lagged = n, "Response stream subscriber lagged behind");
                        }
                        Err(WatchError::Closed) => break,
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitResponseBody {
    pub status: AvailabilityStatus,
    pub price: Option<f64>,
    pub alternative_name: Option<String>,
}

/// Answer a request as the signed-in pharmacy
#[utoipa::path(
    post,
    path = "/api/v1/search/requests/{id}/responses",
    tag = "search",
    request_body = SubmitResponseBody,
    params(
        ("id" = String, Path, description = "Request id")
    ),
    responses(
        (status = 201, description = "Response recorded", body = SearchResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Request or pharmacy not found")
    )
)]
pub async fn submit_response(
    State(state): State<SearchApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SubmitResponseBody>,
) -> Result<(StatusCode, Json<SearchResponse>), ApiError> {
    let response = state
        .search
        .submit_response(
            &principal.user_id,
            &id,
            body.status,
            body.price,
            body.alternative_name,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub wilaya: Option<String>,
}

/// Most requested medicines
#[utoipa::path(
    get,
    path = "/api/v1/search/trending",
    tag = "search",
    params(
        ("wilaya" = Option<String>, Query, description = "Restrict to one wilaya")
    ),
    responses(
        (status = 200, description = "Top requested medicine names", body = [DrugStat])
    )
)]
pub async fn trending(
    State(state): State<SearchApiState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<DrugStat>>, ApiError> {
    let stats = state.search.trending(query.wilaya.as_deref()).await?;
    Ok(Json(stats))
}
