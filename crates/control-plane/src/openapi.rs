// OpenAPI specification generation
//
// This module defines the OpenAPI spec for the Studio API.
// It is served by the API server and written out by the export-openapi binary.

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use studio_core::{Notification, NotificationStatus, Task, TaskKind, TaskStatus};
use utoipa::OpenApi;

/// OpenAPI documentation for the Studio API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::tasks::stream_tasks,
        api::tasks::create_task,
        api::tasks::list_tasks,
        api::tasks::get_task,
        api::tasks::update_task,
        api::notifications::stream_notifications,
        api::notifications::list_notifications,
        api::notifications::send_test_notification,
        api::notifications::mark_notification_read,
        api::notifications::mark_notification_deleted,
    ),
    components(
        schemas(
            Task, TaskKind, TaskStatus,
            Notification, NotificationStatus,
            api::tasks::CreateTaskRequest, api::tasks::UpdateTaskRequest,
            api::notifications::TestNotificationRequest,
            api::notifications::NotificationActionResponse,
            api::health::HealthResponse,
            ErrorResponse,
            ListResponse<Task>,
            ListResponse<Notification>,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "tasks", description = "Task endpoints and task stream (SSE)"),
        (name = "notifications", description = "Notification endpoints and notification stream (SSE)")
    ),
    info(
        title = "Studio API",
        version = "0.2.0",
        description = "Real-time task and notification delivery over Server-Sent Events",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
