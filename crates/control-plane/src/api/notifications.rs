// Notification HTTP routes
// Decision: read/delete are owner actions and never dispatch frames

use axum::{
    extract::{FromRef, Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studio_core::Notification;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::ListResponse;
use super::error::ApiError;
use super::sse::{resume_cursor, stream_response, StreamQuery};
use crate::auth::{AuthState, AuthUser};
use crate::services::NotificationService;

/// Request body for the test notification endpoint
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TestNotificationRequest {
    /// Message to send. Defaults to "Test notification for task <id>".
    #[serde(default)]
    #[schema(example = "Render video completed successfully")]
    pub message: Option<String>,
}

/// Result of a notification action
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationActionResponse {
    pub success: bool,
    pub notification: Notification,
}

impl From<Notification> for NotificationActionResponse {
    fn from(notification: Notification) -> Self {
        Self {
            success: true,
            notification,
        }
    }
}

// ============================================
// App State and Routes
// ============================================

/// App state for notification routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(service: Arc<NotificationService>, auth: AuthState) -> Self {
        Self { service, auth }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// Create notification routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/notifications/stream", get(stream_notifications))
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/test", post(send_test_notification))
        .route(
            "/v1/notifications/:notification_id/read",
            patch(mark_notification_read),
        )
        .route(
            "/v1/notifications/:notification_id/delete",
            patch(mark_notification_deleted),
        )
        .with_state(state)
}

// ============================================
// HTTP Handlers
// ============================================

/// GET /v1/notifications/stream - Stream notifications (SSE)
///
/// Pending notifications are delivered on connect and marked sent; new ones
/// are pushed as they are created.
#[utoipa::path(
    get,
    path = "/v1/notifications/stream",
    params(
        ("Last-Event-ID" = Option<String>, Header, description = "Id of the last event received"),
        StreamQuery
    ),
    responses(
        (status = 200, description = "Notification event stream", content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "notifications"
)]
pub async fn stream_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let resume_after = resume_cursor(&headers, &query);
    let subscription = state.service.connect(user.id, resume_after).await?;
    Ok(stream_response(subscription))
}

/// GET /v1/notifications - List the caller's notifications
#[utoipa::path(
    get,
    path = "/v1/notifications",
    responses(
        (status = 200, description = "Non-deleted notifications, oldest first", body = ListResponse<Notification>),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ListResponse<Notification>>, ApiError> {
    let notifications = state.service.list(user.id).await?;
    Ok(Json(ListResponse::new(notifications)))
}

/// POST /v1/notifications/test - Send a test notification to the caller
#[utoipa::path(
    post,
    path = "/v1/notifications/test",
    request_body = TestNotificationRequest,
    responses(
        (status = 200, description = "Notification created and dispatched", body = NotificationActionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    tag = "notifications"
)]
pub async fn send_test_notification(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<TestNotificationRequest>>,
) -> Result<Json<NotificationActionResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let task_id = Uuid::now_v7();
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Test notification for task {task_id}"));

    let notification = state
        .service
        .create_and_dispatch(user.id, task_id, message)
        .await?;
    Ok(Json(notification.into()))
}

/// PATCH /v1/notifications/{notification_id}/read - Mark as read
#[utoipa::path(
    patch,
    path = "/v1/notifications/{notification_id}/read",
    params(("notification_id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationActionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationActionResponse>, ApiError> {
    let notification = state.service.mark_read(notification_id, user.id).await?;
    Ok(Json(notification.into()))
}

/// PATCH /v1/notifications/{notification_id}/delete - Soft delete
#[utoipa::path(
    patch,
    path = "/v1/notifications/{notification_id}/delete",
    params(("notification_id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification deleted", body = NotificationActionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    tag = "notifications"
)]
pub async fn mark_notification_deleted(
    State(state): State<AppState>,
    user: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationActionResponse>, ApiError> {
    let notification = state
        .service
        .mark_deleted(notification_id, user.id)
        .await?;
    Ok(Json(notification.into()))
}
