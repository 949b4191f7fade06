//! HTTP API routes for the research engine
//!
//! Thin JSON surface over the workflow registry actor and the session
//! registry. Handlers translate typed errors into
//! `{"success": false, "error": {"code", "message"}}` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use shared_types::ApiError;

pub mod sessions;
pub mod workflows;

use crate::actors::workflow::WorkflowError;
use crate::app_state::AppState;
use crate::session::SessionError;

#[derive(Clone)]
pub struct ApiState {
    pub app_state: AppState,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        // Research workflow routes
        .route(
            "/research/workflows",
            get(workflows::list_workflows).post(workflows::start_workflow),
        )
        .route(
            "/research/workflows/{workflow_id}",
            get(workflows::get_workflow).delete(workflows::close_workflow),
        )
        .route(
            "/research/workflows/{workflow_id}/choice",
            post(workflows::submit_choice),
        )
        .route(
            "/research/workflows/{workflow_id}/save",
            post(workflows::save_report),
        )
        // Session routes
        .route("/sessions", get(sessions::list_sessions))
        .route(
            "/sessions/cleanup-expired",
            post(sessions::cleanup_expired),
        )
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route(
            "/sessions/{session_id}/activity",
            post(sessions::update_activity),
        )
        .route(
            "/sessions/{session_id}/resources",
            post(sessions::add_resource),
        )
        .route(
            "/sessions/{session_id}/resources/{kind}/{resource_id}",
            delete(sessions::remove_resource),
        )
        .route(
            "/sessions/{session_id}/cleanup",
            post(sessions::force_cleanup),
        )
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "jarvis-engine",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub(crate) fn error_response(status: StatusCode, error: ApiError) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error
        })),
    )
        .into_response()
}

pub(crate) fn workflow_error_status(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTopic
        | WorkflowError::InvalidChoice(_)
        | WorkflowError::InvalidPhase { .. }
        | WorkflowError::InvalidLocation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::BackendUnavailable { .. } | WorkflowError::Unavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = workflow_error_status(&self);
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Workflow request failed");
        }
        error_response(status, self.into())
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            SessionError::NotFound(_) => error_response(
                StatusCode::NOT_FOUND,
                ApiError {
                    code: "NOT_FOUND".to_string(),
                    message,
                },
            ),
        }
    }
}
