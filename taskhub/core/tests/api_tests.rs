// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Router-level tests: status codes, error bodies and route coverage.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use taskhub_core::application::TaskServiceRuntime;
use taskhub_core::domain::service_config::ServiceConfigManifest;
use taskhub_core::infrastructure::repositories::InMemoryTaskRepository;
use taskhub_core::presentation::router;

fn app() -> (Router, TaskServiceRuntime) {
    let runtime = TaskServiceRuntime::with_repository(
        ServiceConfigManifest::default(),
        Arc::new(InMemoryTaskRepository::new()),
    )
    .unwrap();
    (router(runtime.app_state()), runtime)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create(app: &Router, title: &str, project: i64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/tasks",
        Some(json!({
            "title": title,
            "projectId": project,
            "status": "TODO",
            "priority": "HIGH",
            "assignedTo": "lee",
            "dueDate": "2026-11-01T12:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
}

#[tokio::test]
async fn test_crud_round() {
    let (app, _) = app();
    let created = create(&app, "Design spec", 7).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let (status, fetched) = send(&app, Method::GET, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Design spec");

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some(json!({ "status": "DONE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "DONE");
    assert_eq!(updated["priority"], "HIGH");

    let (status, _) = send(&app, Method::DELETE, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::DELETE, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_validation_and_conflict_bodies() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::POST, "/tasks", Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["validationErrors"]["projectId"].is_string());
    assert!(body["validationErrors"]["status"].is_string());

    create(&app, "Twice", 1).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({ "title": "Twice", "projectId": 1, "status": "TODO", "priority": "LOW" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({ "title": "Bad", "projectId": 1, "status": "SOMEDAY", "priority": "LOW" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_filter_routes() {
    let (app, _) = app();
    create(&app, "Write docs", 3).await;
    create(&app, "Review docs", 3).await;
    create(&app, "Other", 4).await;

    let (_, body) = send(&app, Method::GET, "/tasks/project/3", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/tasks/project/3/status/todo", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/tasks/project/3/count", None).await;
    assert_eq!(body, json!(2));

    let (_, body) = send(&app, Method::GET, "/tasks/assignee/lee/count", None).await;
    assert_eq!(body, json!(3));

    let (_, body) = send(&app, Method::GET, "/tasks/priority/HIGH", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(&app, Method::GET, "/tasks/search?title=DOCS", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/tasks/due-between?start=2026-10-31T00:00:00&end=2026-11-02T00:00:00Z",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(&app, Method::GET, "/tasks/paginated?page=1&size=2", None).await;
    assert_eq!(body["content"].as_array().unwrap().len(), 1);
    assert_eq!(body["totalElements"], 3);
    assert_eq!(body["totalPages"], 2);

    let (status, _) = send(&app, Method::GET, "/tasks/status/LATER", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/tasks/project/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_event_ingress_reconciles() {
    let (app, runtime) = app();
    let cancel = CancellationToken::new();
    let _handles = runtime.start_background(&cancel).unwrap();
    create(&app, "Orphan soon", 42).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/events/projects",
        Some(json!({ "eventType": "PROJECT_DELETED", "projectId": 42, "projectName": "Apollo" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let (_, body) = send(&app, Method::GET, "/tasks/project/42/count", None).await;
            if body == json!(0) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("project deletion was not reconciled");

    let (status, _) = send(&app, Method::POST, "/events/projects", Some(json!({ "nope": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    cancel.cancel();
}

#[tokio::test]
async fn test_zone_less_due_date_accepted_on_create_and_update() {
    let (app, _) = app();
    let (status, created) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({
            "title": "Plan sprint",
            "projectId": 11,
            "status": "TODO",
            "priority": "MEDIUM",
            "dueDate": "2026-03-01 09:30:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created["dueDate"].as_str().unwrap().starts_with("2026-03-01T09:30:00"));

    let id = created["id"].as_str().unwrap();
    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some(json!({ "dueDate": "2026-03-02T10:00:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert!(updated["dueDate"].as_str().unwrap().starts_with("2026-03-02T10:00:00"));

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some(json!({ "dueDate": "whenever" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_error_body_carries_request_path() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/tasks/missing-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/tasks/missing-id");
    assert_eq!(body["message"], "Task not found with id: missing-id");

    let (status, body) = send(&app, Method::POST, "/tasks", Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["path"], "/tasks");

    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert!(body.get("path").is_none());
}

#[tokio::test]
async fn test_enum_fields_ignore_case_in_body_and_path() {
    let (app, _) = app();
    let (status, created) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({ "title": "Lower", "projectId": 2, "status": "in_progress", "priority": "urgent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "IN_PROGRESS");
    assert_eq!(created["priority"], "URGENT");

    let (_, body) = send(&app, Method::GET, "/tasks/status/in_progress", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = send(&app, Method::GET, "/tasks/priority/Urgent", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}
