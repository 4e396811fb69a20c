// Studio Control Plane Library
// Decision: Shared library for binaries (API server, OpenAPI export) and integration tests

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Current-user resolution
pub mod auth;

// Environment configuration
pub mod config;

// Services layer
pub mod services;
pub use services::{Hubs, NotificationService, Services, TaskService};

// OpenAPI spec generation
pub mod openapi;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use studio_storage::StorageBackend;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ServerConfig;
use crate::openapi::ApiDoc;

/// Assemble the full HTTP application.
///
/// `/health` and `/api-doc/openapi.json` are never prefixed; every `/v1`
/// route is nested under `config.api_prefix` when one is set.
pub fn build_app(db: Arc<StorageBackend>, hubs: &Hubs, config: &ServerConfig) -> Router {
    let services = Services::new(db, hubs);
    let auth_state = auth::AuthState::new(config.auth.clone());

    let tasks_state = api::tasks::AppState::new(services.tasks.clone(), auth_state.clone());
    let notifications_state =
        api::notifications::AppState::new(services.notifications.clone(), auth_state);
    let health_state = api::health::HealthState {
        hubs: hubs.clone(),
        auth_mode: config.auth.mode.as_str().to_string(),
    };

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let api_routes = Router::new()
        .merge(api::tasks::routes(tasks_state))
        .merge(api::notifications::routes(notifications_state));

    let app = Router::new()
        .merge(api::health::routes(health_state))
        .route(
            "/api-doc/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(build_router_with_prefix(api_routes, &config.api_prefix));

    let app = match cors_layer(&config.cors_allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}

/// CORS layer for the configured origins, or `None` for same-origin only
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        return None;
    }
    tracing::info!(origins = ?origins, "CORS origins configured");

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ORIGIN,
                header::CACHE_CONTROL,
                header::HeaderName::from_static(auth::USER_ID_HEADER),
                header::HeaderName::from_static(api::sse::LAST_EVENT_ID),
            ])
            .allow_credentials(true),
    )
}

/// Build router with optional API prefix (extracted for testing)
pub fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
