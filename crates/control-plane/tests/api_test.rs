// HTTP route tests against the in-memory backend
// Run with: cargo test -p studio-control-plane --test api_test

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use studio_control_plane::{
    auth::{AuthConfig, AuthMode, USER_ID_HEADER},
    build_app,
    config::ServerConfig,
    Hubs,
};
use studio_storage::StorageBackend;
use tower::ServiceExt;
use uuid::Uuid;

fn app_with(config: ServerConfig) -> (Router, Hubs) {
    let db = Arc::new(StorageBackend::in_memory());
    let hubs = Hubs::new(db.clone(), config.hub_config());
    (build_app(db, &hubs, &config), hubs)
}

fn app() -> Router {
    app_with(ServerConfig::default()).0
}

fn header_mode_app() -> Router {
    app_with(ServerConfig {
        auth: AuthConfig::new(AuthMode::Header),
        ..Default::default()
    })
    .0
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_task(app: &Router) -> Value {
    let (status, task) = send(
        app,
        json_request(
            "POST",
            "/v1/tasks",
            json!({
                "project_id": Uuid::now_v7(),
                "kind": "render_video",
                "params": {"resolution": "1080p"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    task
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["auth_mode"], "none");
    assert_eq!(body["task_connections"], 0);
    assert_eq!(body["notification_connections"], 0);
}

#[tokio::test]
async fn test_openapi_served() {
    let (status, body) = send(&app(), get("/api-doc/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/tasks"].is_object());
}

#[tokio::test]
async fn test_task_create_get_list() {
    let app = app();
    let task = create_task(&app).await;
    assert_eq!(task["status"], "pending");
    assert_eq!(task["progress"], 0);
    assert_eq!(task["kind"], "render_video");
    assert_eq!(task["params"]["resolution"], "1080p");

    let id = task["id"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/v1/tasks/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], task["id"]);

    let (status, list) = send(&app, get("/v1/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let app = app();
    let (status, body) = send(&app, get(&format!("/v1/tasks/{}", Uuid::now_v7()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("Task not found"));

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/v1/tasks/{}", Uuid::now_v7()),
            json!({"status": "running"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_out_of_range_rejected() {
    let app = app();
    let task = create_task(&app).await;
    let id = task["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/v1/tasks/{id}"), json!({"progress": 150})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("progress"));
}

#[tokio::test]
async fn test_status_change_creates_notification() {
    let app = app();
    let task = create_task(&app).await;
    let id = task["id"].as_str().unwrap();

    // Progress only: no notification.
    let (status, updated) = send(
        &app,
        json_request("PATCH", &format!("/v1/tasks/{id}"), json!({"progress": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["progress"], 40);
    assert_eq!(updated["status"], "pending");

    let (_, list) = send(&app, get("/v1/notifications")).await;
    assert!(list["data"].as_array().unwrap().is_empty());

    let (status, updated) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/v1/tasks/{id}"),
            json!({"status": "finished", "progress": 100, "result": {"video_key": "v/1.mp4"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "finished");
    assert_eq!(updated["result"]["video_key"], "v/1.mp4");

    let (_, list) = send(&app, get("/v1/notifications")).await;
    let notifications = list["data"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0]["message"],
        "Render video completed successfully"
    );
    assert_eq!(notifications[0]["task_id"], task["id"]);
    // Nobody was connected, so it waits for replay.
    assert_eq!(notifications[0]["status"], "pending");
}

#[tokio::test]
async fn test_test_notification_read_and_delete() {
    let app = app();

    let (status, created) = send(&app, json_request("POST", "/v1/notifications/test", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["success"], true);
    let notification = &created["notification"];
    let task_id = notification["task_id"].as_str().unwrap();
    assert_eq!(
        notification["message"],
        format!("Test notification for task {task_id}")
    );
    let id = notification["id"].as_str().unwrap().to_string();

    let (status, read) = send(
        &app,
        json_request("PATCH", &format!("/v1/notifications/{id}/read"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["notification"]["status"], "read");
    assert!(read["notification"]["read_at"].is_string());

    let (status, deleted) = send(
        &app,
        json_request("PATCH", &format!("/v1/notifications/{id}/delete"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["notification"]["is_deleted"], true);

    // Deleting twice is fine.
    let (status, _) = send(
        &app,
        json_request("PATCH", &format!("/v1/notifications/{id}/delete"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send(&app, get("/v1/notifications")).await;
    assert!(list["data"].as_array().unwrap().is_empty());

    // A deleted notification can no longer be marked read.
    let (status, body) = send(
        &app,
        json_request("PATCH", &format!("/v1/notifications/{id}/read"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Notification not found"));
}

#[tokio::test]
async fn test_test_notification_without_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/notifications/test")
        .body(Body::empty())
        .unwrap();
    let (status, created) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    let task_id = created["notification"]["task_id"].as_str().unwrap();
    assert_eq!(
        created["notification"]["message"],
        format!("Test notification for task {task_id}")
    );
}

#[tokio::test]
async fn test_custom_test_notification_message() {
    let (status, created) = send(
        &app(),
        json_request(
            "POST",
            "/v1/notifications/test",
            json!({"message": "Create slideshow failed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["notification"]["message"], "Create slideshow failed");
}

#[tokio::test]
async fn test_header_mode_requires_user() {
    let app = header_mode_app();

    let (status, body) = send(&app, get("/v1/notifications")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let request = Request::builder()
        .uri("/v1/notifications")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays public.
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_notifications_are_owner_scoped() {
    let app = header_mode_app();
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();

    let mut request = json_request("POST", "/v1/notifications/test", json!({}));
    request
        .headers_mut()
        .insert(USER_ID_HEADER, alice.to_string().parse().unwrap());
    let (_, created) = send(&app, request).await;
    let id = created["notification"]["id"].as_str().unwrap().to_string();

    let mut request = json_request("PATCH", &format!("/v1/notifications/{id}/read"), json!({}));
    request
        .headers_mut()
        .insert(USER_ID_HEADER, bob.to_string().parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob cannot delete it either, however often he tries.
    for _ in 0..2 {
        let mut request =
            json_request("PATCH", &format!("/v1/notifications/{id}/delete"), json!({}));
        request
            .headers_mut()
            .insert(USER_ID_HEADER, bob.to_string().parse().unwrap());
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // Still visible and unread for Alice.
    let request = Request::builder()
        .uri("/v1/notifications")
        .header(USER_ID_HEADER, alice.to_string())
        .body(Body::empty())
        .unwrap();
    let (_, list) = send(&app, request).await;
    let alice_notifications = list["data"].as_array().unwrap();
    assert_eq!(alice_notifications.len(), 1);
    assert_eq!(alice_notifications[0]["is_deleted"], false);
    assert_ne!(alice_notifications[0]["status"], "read");

    let request = Request::builder()
        .uri("/v1/notifications")
        .header(USER_ID_HEADER, bob.to_string())
        .body(Body::empty())
        .unwrap();
    let (_, list) = send(&app, request).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_headers_and_replay_frame() {
    let app = app();
    let task = create_task(&app).await;

    let response = app
        .clone()
        .oneshot(get("/v1/tasks/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap().into_data().unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();

    let mut lines = text.lines();
    let id_line = lines.next().unwrap();
    assert!(id_line.starts_with("id: "));
    let data: Value =
        serde_json::from_str(lines.next().unwrap().strip_prefix("data: ").unwrap()).unwrap();
    assert_eq!(data["id"], task["id"]);
    assert!(text.ends_with("\n\n"));
}

#[tokio::test]
async fn test_api_prefix_applies_to_v1_routes_only() {
    let (app, _hubs) = app_with(ServerConfig {
        api_prefix: "/api".to_string(),
        ..Default::default()
    });

    let (status, _) = send(&app, get("/api/v1/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/v1/tasks")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

fn as_user(mut request: Request<Body>, user: Uuid) -> Request<Body> {
    request
        .headers_mut()
        .insert(USER_ID_HEADER, user.to_string().parse().unwrap());
    request
}

#[tokio::test]
async fn test_task_update_requires_owner() {
    let app = header_mode_app();
    let alice = Uuid::now_v7();
    let mallory = Uuid::now_v7();

    let (status, task) = send(
        &app,
        as_user(
            json_request(
                "POST",
                "/v1/tasks",
                json!({"project_id": Uuid::now_v7(), "kind": "render_video"}),
            ),
            alice,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    // No user at all.
    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, json!({"status": "finished"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Someone else's task looks like it does not exist.
    let (status, _) = send(
        &app,
        as_user(json_request("PATCH", &uri, json!({"status": "finished"})), mallory),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Neither attempt touched the task or notified Alice.
    let (_, fetched) = send(&app, as_user(get(&uri), alice)).await;
    assert_eq!(fetched["status"], "pending");
    let (_, list) = send(&app, as_user(get("/v1/notifications"), alice)).await;
    assert!(list["data"].as_array().unwrap().is_empty());

    let (status, updated) = send(
        &app,
        as_user(json_request("PATCH", &uri, json!({"status": "finished"})), alice),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "finished");
}
