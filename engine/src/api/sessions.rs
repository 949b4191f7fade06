//! Session lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiState;
use crate::session::SessionError;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddResourceRequest {
    pub kind: String,
    pub id: String,
}

pub async fn update_activity(
    Path(session_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<ActivityRequest>,
) -> Response {
    let session = state
        .app_state
        .sessions()
        .update_activity(&session_id, req.user_id.as_deref())
        .await;
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "session": session,
        })),
    )
        .into_response()
}

pub async fn list_sessions(State(state): State<ApiState>) -> Response {
    let sessions = state.app_state.sessions().list_sessions().await;
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "sessions": sessions,
        })),
    )
        .into_response()
}

pub async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    match state.app_state.sessions().session_info(&session_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "session": session,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn add_resource(
    Path(session_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<AddResourceRequest>,
) -> Response {
    let added = state
        .app_state
        .sessions()
        .add_resource(&session_id, &req.kind, &req.id)
        .await;
    if !added {
        return SessionError::NotFound(session_id).into_response();
    }
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

pub async fn remove_resource(
    Path((session_id, kind, resource_id)): Path<(String, String, String)>,
    State(state): State<ApiState>,
) -> Response {
    let removed = state
        .app_state
        .sessions()
        .remove_resource(&session_id, &kind, &resource_id)
        .await;
    if !removed {
        return SessionError::NotFound(session_id).into_response();
    }
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

pub async fn force_cleanup(
    Path(session_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    match state.app_state.sessions().force_cleanup(&session_id).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "summary": summary,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cleanup_expired(State(state): State<ApiState>) -> Response {
    let report = state.app_state.sessions().cleanup_expired().await;
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "report": report,
        })),
    )
        .into_response()
}
