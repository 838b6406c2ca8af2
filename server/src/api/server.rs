//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthState, require_auth};
use super::middleware;
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::auth::AuthRoutesState;
use super::routes::pharmacies::PharmaciesApiState;
use super::routes::search::SearchApiState;
use super::routes::{admin, auth, favorites, health, medicines, notifications, pharmacies, search};
use crate::core::CoreApp;
use crate::core::constants::{AUTH_BODY_LIMIT, DEFAULT_BODY_LIMIT};

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let auth_state = AuthState {
            auth_manager: app.auth.clone(),
        };

        let auth_routes = auth::routes(
            AuthRoutesState {
                auth_manager: app.auth.clone(),
                accounts: app.accounts.clone(),
                credentials: app.credentials.clone(),
                directory: app.directory.clone(),
                session: app.session.clone(),
            },
            auth_state.clone(),
        )
        .layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT));

        let admin_routes = admin::routes(app.accounts.clone()).layer(
            axum::middleware::from_fn_with_state(auth_state.clone(), require_auth),
        );

        let pharmacies_routes = pharmacies::routes(
            PharmaciesApiState {
                directory: app.directory.clone(),
                reviews: app.reviews.clone(),
            },
            auth_state.clone(),
        );

        let medicines_routes = medicines::routes(app.catalog.clone(), auth_state.clone());

        let favorites_routes = favorites::routes(app.directory.clone()).layer(
            axum::middleware::from_fn_with_state(auth_state.clone(), require_auth),
        );

        let search_routes = search::routes(
            SearchApiState {
                search: app.search.clone(),
                shutdown_rx: shutdown.subscribe(),
            },
            auth_state.clone(),
        );

        let notifications_routes =
            notifications::routes(app.notifications.clone(), shutdown.subscribe()).layer(
                axum::middleware::from_fn_with_state(auth_state, require_auth),
            );

        let router = Router::new()
            .route("/api/v1/health", get(health::health))
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/v1/openapi.json", get(openapi_json))
            .route("/api/docs", get(swagger_ui_html))
            .route("/api/docs/", get(swagger_ui_html))
            .nest("/api/v1/auth", auth_routes)
            .nest("/api/v1/admin", admin_routes)
            .nest("/api/v1/pharmacies", pharmacies_routes)
            .nest("/api/v1/medicines", medicines_routes)
            .nest("/api/v1/favorites", favorites_routes)
            .nest("/api/v1/search", search_routes)
            .nest("/api/v1/notifications", notifications_routes)
            .fallback(middleware::handle_404)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(middleware::cors())
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
