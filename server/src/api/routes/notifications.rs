//! Notification endpoints
//!
//! The whole router requires authentication; every handler works on the
//! caller's own feed.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use tokio::sync::watch;

use crate::api::auth::AuthPrincipal;
use crate::api::types::ApiError;
use crate::core::constants::SSE_KEEP_ALIVE_SECS;
use crate::data::directory::WatchError;
use crate::data::types::AppNotification;
use crate::domain::NotificationService;

#[derive(Clone)]
pub struct NotificationsApiState {
    pub notifications: Arc<NotificationService>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Build notification routes
pub fn routes(notifications: Arc<NotificationService>, shutdown_rx: watch::Receiver<bool>) -> Router {
    let state = NotificationsApiState {
        notifications,
        shutdown_rx,
    };

    Router::new()
        .route("/", get(list_notifications))
        .route("/stream", get(stream_notifications))
        .route("/{id}/read", post(mark_read))
        .with_state(state)
}

/// The caller's notification feed
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    responses(
        (status = 200, description = "Notifications, newest first", body = [AppNotification]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_notifications(
    State(state): State<NotificationsApiState>,
    principal: AuthPrincipal,
) -> Result<Json<Vec<AppNotification>>, ApiError> {
    let notifications = state.notifications.list(&principal.user_id).await?;
    Ok(Json(notifications))
}

/// Mark a notification as read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "Notification id")
    ),
    responses(
        (status = 200, description = "Marked read"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<NotificationsApiState>,
    principal: AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.notifications.mark_read(&principal.user_id, &id).await?;
    Ok(Json(serde_json::json!({ "read": true })))
}

/// Stream feed snapshots over SSE
pub async fn stream_notifications(
    State(state): State<NotificationsApiState>,
    principal: AuthPrincipal,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = state.notifications.list(&principal.user_id).await?;
    let mut watch = state.notifications.watch(&principal.user_id);
    let mut shutdown_rx = state.shutdown_rx.clone();

    let stream = async_stream::stream! {
        if let Ok(data) = serde_json::to_string(&initial) {
            yield Ok(Event::default().event("notifications").data(data));
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
                                Ok(data) => yield Ok(Event::default().event("notifications").data(data)),
                                Err(e) => tracing::error!(error = %e, "Failed to serialize notification snapshot"),
                            }
                        }
                        Err(WatchError::Lagged(n)) => {
                            tracing::warn!(lagged = n, "Notification subscriber lagged behind");
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
