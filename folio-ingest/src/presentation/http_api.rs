//! HTTP API for the ingest node.

use crate::application_service::webhook_receiver::{Notification, ReceiveError, WebhookReceiver};
use crate::domain::record::{ContentRecord, Post, Project, RecordKind};
use crate::port::content_store::ContentStore;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Header naming the delivery's event type (`push`, `ping`, ...).
pub const EVENT_HEADER: &str = "x-github-event";

pub struct ApiState {
    pub receiver: Arc<WebhookReceiver>,
    pub store: Arc<dyn ContentStore>,
}

/// Application state shared across handlers.
pub type AppState = Arc<ApiState>;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(receive_webhook))
        .route("/posts", get(list_posts))
        .route("/posts/:slug", get(get_post))
        .route("/projects", get(list_projects))
        .route("/projects/:name", get(get_project))
        .with_state(state)
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Status code for a notification that was refused as a whole.
pub fn receive_error_status(error: &ReceiveError) -> StatusCode {
    match error {
        ReceiveError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ReceiveError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        ReceiveError::FetchFailure(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        ReceiveError::FetchFailure(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Receive a repository notification.
///
/// Individual file rejections still answer 200; the summary lists them.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let notification = Notification {
        token: header(state.receiver.token_header()),
        event: header(EVENT_HEADER),
        payload: body.to_vec(),
    };

    match state.receiver.receive(notification).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(receive_error_status(&e), e.to_string()),
    }
}

/// List all published posts.
async fn list_posts(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(RecordKind::Post).await {
        Ok(snapshot) => {
            let posts: Vec<Post> = snapshot
                .iter()
                .cloned()
                .filter_map(ContentRecord::into_post)
                .collect();
            Json(posts).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Get a post by slug.
async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> impl IntoResponse {
    match state.store.get(RecordKind::Post, &slug).await {
        Ok(Some(record)) => match record.into_post() {
            Some(post) => Json(post).into_response(),
            None => error_response(StatusCode::NOT_FOUND, format!("Post not found: {}", slug)),
        },
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Post not found: {}", slug)),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// List all published projects.
async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(RecordKind::Project).await {
        Ok(snapshot) => {
            let projects: Vec<Project> = snapshot
                .iter()
                .cloned()
                .filter_map(ContentRecord::into_project)
                .collect();
            Json(projects).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Get a project by name.
async fn get_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.get(RecordKind::Project, &name).await {
        Ok(Some(record)) => match record.into_project() {
            Some(project) => Json(project).into_response(),
            None => error_response(
                StatusCode::NOT_FOUND,
                format!("Project not found: {}", name),
            ),
        },
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Project not found: {}", name),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
