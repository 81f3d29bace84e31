// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API
//!
//! REST surface over [`TaskService`] plus the project event ingress. No
//! authentication here; the edge gateway enforces it.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::application::command_handler::EventRoute;
use crate::application::errors::TaskError;
use crate::application::task_service::TaskService;
use crate::domain::commands::{
    CreateTaskCommand, DeleteTaskCommand, TaskChanges, UpdateTaskCommand, ValidationErrors,
};
use crate::domain::events::ProjectEvent;
use crate::domain::project::ProjectId;
use crate::domain::queries::{PageRequest, QueryResult, TaskQuery};
use crate::domain::task::{TaskId, TaskPriority, TaskStatus, TaskView};
use crate::domain::timestamp::parse_lenient;
use crate::infrastructure::broker::MessageBroker;

#[derive(Clone)]
pub struct AppState {
    pub service: TaskService,
    pub broker: Arc<dyn MessageBroker>,
    /// Where `POST /events/projects` publishes to.
    pub project_route: EventRoute,
    pub service_name: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        service: TaskService,
        broker: Arc<dyn MessageBroker>,
        project_route: EventRoute,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            broker,
            project_route,
            service_name: service_name.into(),
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tasks", post(create_task_handler).get(list_tasks_handler))
        .route("/tasks/paginated", get(page_tasks_handler))
        .route("/tasks/search", get(search_tasks_handler))
        .route("/tasks/due-between", get(due_between_handler))
        .route("/tasks/project/{project_id}", get(tasks_by_project_handler))
        .route(
            "/tasks/project/{project_id}/status/{status}",
            get(tasks_by_project_and_status_handler),
        )
        .route("/tasks/project/{project_id}/count", get(count_by_project_handler))
        .route("/tasks/assignee/{assignee}", get(tasks_by_assignee_handler))
        .route("/tasks/assignee/{assignee}/count", get(count_by_assignee_handler))
        .route("/tasks/status/{status}", get(tasks_by_status_handler))
        .route("/tasks/priority/{priority}", get(tasks_by_priority_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/events/projects", post(project_event_ingress_handler))
        .layer(middleware::from_fn(attach_error_path))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Task(TaskError),
    BadRequest(String),
    Unavailable(String),
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        ApiError::Task(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    /// Request path, filled in by the error-path middleware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<std::collections::BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, validation_errors) = match self {
            ApiError::Task(TaskError::TaskNotFound(id)) => (
                StatusCode::NOT_FOUND,
                format!("Task not found with id: {id}"),
                None,
            ),
            ApiError::Task(err @ TaskError::DuplicateTask { .. }) => {
                (StatusCode::CONFLICT, err.to_string(), None)
            }
            ApiError::Task(TaskError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors.fields().clone()),
            ),
            ApiError::Task(TaskError::Repository(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
                None,
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message, None),
        };

        let body = ErrorBody {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            path: None,
            validation_errors,
        };
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Error responses leave their [`ErrorBody`] in the response extensions; this
/// re-renders it with the request path, which `IntoResponse` cannot see.
async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorBody>() {
        Some(mut body) => {
            body.path = Some(path);
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_project_id(raw: &str) -> ApiResult<ProjectId> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(ProjectId(id)),
        _ => Err(ApiError::BadRequest(format!("invalid project id: {raw}"))),
    }
}

fn parse_status(raw: &str) -> ApiResult<TaskStatus> {
    raw.parse().map_err(|e: crate::domain::task::UnknownVariant| ApiError::BadRequest(e.to_string()))
}

fn parse_priority(raw: &str) -> ApiResult<TaskPriority> {
    raw.parse().map_err(|e: crate::domain::task::UnknownVariant| ApiError::BadRequest(e.to_string()))
}

fn parse_timestamp(field: &str, raw: &str) -> ApiResult<DateTime<Utc>> {
    parse_lenient(raw).ok_or_else(|| {
        ApiError::Task(TaskError::Validation(ValidationErrors::single(
            field,
            format!("{field} is not a valid date-time"),
        )))
    })
}

/// Read routes all go through the facade's `TaskQuery` dispatch.
async fn run_query(state: &AppState, query: TaskQuery) -> ApiResult<Json<QueryResult>> {
    Ok(Json(state.service.query(query).await?))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "service": state.service_name,
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskCommand>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let Json(command) = payload?;
    let view = state.service.create_task(command).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TaskChanges>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let Json(changes) = payload?;
    let view = state
        .service
        .update_task(UpdateTaskCommand::new(id, changes))
        .await?;
    Ok(Json(view))
}

async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_task(DeleteTaskCommand::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    run_query(&state, TaskQuery::ById(TaskId::from(id))).await
}

async fn list_tasks_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<QueryResult>> {
    run_query(&state, TaskQuery::All).await
}

async fn page_tasks_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Query<PageRequest>, QueryRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Query(request) = request?;
    let request = PageRequest::new(request.page, request.size);
    run_query(&state, TaskQuery::Paginated(request)).await
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    title: String,
}

async fn search_tasks_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Query(params) = params?;
    run_query(&state, TaskQuery::SearchByTitle(params.title)).await
}

#[derive(Debug, Deserialize)]
struct DueBetweenParams {
    start: String,
    end: String,
}

async fn due_between_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<DueBetweenParams>, QueryRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Query(params) = params?;
    let start = parse_timestamp("start", &params.start)?;
    let end = parse_timestamp("end", &params.end)?;
    run_query(&state, TaskQuery::DueBetween { start, end }).await
}

async fn tasks_by_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    let project_id = parse_project_id(&project_id)?;
    run_query(&state, TaskQuery::ByProject(project_id)).await
}

async fn tasks_by_project_and_status_handler(
    State(state): State<Arc<AppState>>,
    Path((project_id, status)): Path<(String, String)>,
) -> ApiResult<Json<QueryResult>> {
    let project_id = parse_project_id(&project_id)?;
    let status = parse_status(&status)?;
    run_query(&state, TaskQuery::ByProjectAndStatus(project_id, status)).await
}

async fn count_by_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    let project_id = parse_project_id(&project_id)?;
    run_query(&state, TaskQuery::CountByProject(project_id)).await
}

async fn tasks_by_assignee_handler(
    State(state): State<Arc<AppState>>,
    Path(assignee): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    run_query(&state, TaskQuery::ByAssignee(assignee)).await
}

async fn count_by_assignee_handler(
    State(state): State<Arc<AppState>>,
    Path(assignee): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    run_query(&state, TaskQuery::CountByAssignee(assignee)).await
}

async fn tasks_by_status_handler(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    let status = parse_status(&status)?;
    run_query(&state, TaskQuery::ByStatus(status)).await
}

async fn tasks_by_priority_handler(
    State(state): State<Arc<AppState>>,
    Path(priority): Path<String>,
) -> ApiResult<Json<QueryResult>> {
    let priority = parse_priority(&priority)?;
    run_query(&state, TaskQuery::ByPriority(priority)).await
}

/// Accepts a project lifecycle event from a peer and queues it for the
/// consumer. Answers before reconciliation happens.
async fn project_event_ingress_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let event: ProjectEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid project event: {e}")))?;

    let route = &state.project_route;
    match state
        .broker
        .publish(&route.exchange, &route.routing_key, body)
        .await
    {
        Ok(routed) => {
            info!(
                project_id = %event.project_id,
                event_type = %event.event_type,
                routed,
                "Project event accepted"
            );
            Ok((
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "accepted": true, "routed": routed })),
            ))
        }
        Err(e) => {
            warn!(project_id = %event.project_id, error = %e, "Project event could not be queued");
            Err(ApiError::Unavailable(format!("event could not be queued: {e}")))
        }
    }
}
