//! HTTP surface: task-list CRUD and the streaming optimizer endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::ordering::Task;
use crate::run::{RunController, RunError};
use crate::store::{JsonFileStore, StoreError, TaskStore};
use crate::transport::{into_sse, RunEventStream};

#[derive(Clone)]
pub struct AppState {
    pub controller: RunController,
    pub store: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(controller: RunController, store: Arc<dyn TaskStore>) -> Self {
        Self { controller, store }
    }
}

/// Errors returned as JSON `{"success": false, ...}` bodies.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Run(RunError),
    Body(JsonRejection),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        ApiError::Run(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Run(RunError::Busy { active }) => (
                StatusCode::CONFLICT,
                Json(json!({ "success": false, "error": "busy", "active_run": active })),
            )
                .into_response(),
            ApiError::Run(err) => {
                error!(%err, "run could not be started");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": err.to_string() })),
                )
                    .into_response()
            }
            ApiError::Body(rejection) => {
                warn!(error = %rejection.body_text(), "rejected request body");
                (
                    rejection.status(),
                    Json(json!({ "success": false, "error": rejection.body_text() })),
                )
                    .into_response()
            }
            ApiError::Store(err) => {
                error!(%err, "task store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/save-tasks", post(save_tasks))
        .route("/api/run-sa", get(run_stored).post(run_posted))
        .route("/api/run-sa/cancel", post(cancel_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until the process is stopped.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::new(
        RunController::new(config.run_settings()),
        Arc::new(JsonFileStore::new(&config.store.path)),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, store = %config.store.path.display(), "optimizer server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.load().await?))
}

async fn save_tasks(
    State(state): State<AppState>,
    body: Result<Json<Vec<Task>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(tasks) = body?;
    state.store.save(&tasks).await?;
    info!(count = tasks.len(), "tasks saved");
    Ok(Json(json!({ "success": true, "message": "Tasks saved successfully" })))
}

async fn run_stored(State(state): State<AppState>) -> Result<Response, ApiError> {
    let handle = state.controller.start_from_store(state.store.as_ref()).await?;
    Ok(into_sse(RunEventStream::new(handle)).into_response())
}

async fn run_posted(
    State(state): State<AppState>,
    body: Result<Json<Vec<Task>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(tasks) = body?;
    let handle = state.controller.start(tasks)?;
    Ok(into_sse(RunEventStream::new(handle)).into_response())
}

async fn cancel_run(State(state): State<AppState>) -> impl IntoResponse {
    let cancelled = state.controller.cancel_active();
    Json(json!({ "success": true, "cancelled": cancelled.is_some(), "run": cancelled }))
}
