// Health endpoint
// Decision: not prefixed and not authenticated, so load balancers can probe it

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::Hubs;

/// Service health and live stream counts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub auth_mode: String,
    /// Open task streams
    pub task_connections: usize,
    /// Open notification streams
    pub notification_connections: usize,
}

/// State for health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub hubs: Hubs,
    pub auth_mode: String,
}

pub fn routes(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Service health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_mode: state.auth_mode.clone(),
        task_connections: state.hubs.tasks.registry().connection_count(),
        notification_connections: state.hubs.notifications.registry().connection_count(),
    })
}
