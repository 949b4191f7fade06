//! Research workflow endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use shared_types::{ResearchPreferences, RESOURCE_RESEARCH_WORKFLOW};

use crate::api::ApiState;

#[derive(Debug, Deserialize)]
pub struct StartWorkflowRequest {
    pub topic: String,
    #[serde(default)]
    pub preferences: ResearchPreferences,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub choice: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveReportRequest {
    #[serde(default)]
    pub location: Option<String>,
}

/// Start a workflow. With a `session_id` the workflow is tracked as a
/// session resource so session cleanup closes it.
pub async fn start_workflow(
    State(state): State<ApiState>,
    Json(req): Json<StartWorkflowRequest>,
) -> Response {
    let started = match state
        .app_state
        .workflows()
        .start(&req.topic, req.preferences)
        .await
    {
        Ok(started) => started,
        Err(err) => return err.into_response(),
    };

    let session = match req.session_id.as_deref() {
        Some(session_id) => {
            let sessions = state.app_state.sessions();
            let info = sessions
                .update_activity(session_id, req.user_id.as_deref())
                .await;
            sessions
                .add_resource(session_id, RESOURCE_RESEARCH_WORKFLOW, &started.workflow_id)
                .await;
            Some(info)
        }
        None => None,
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "workflow": started,
            "session": session,
        })),
    )
        .into_response()
}

pub async fn list_workflows(State(state): State<ApiState>) -> Response {
    match state.app_state.workflows().list().await {
        Ok(workflows) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "workflows": workflows,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_workflow(
    Path(workflow_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    match state.app_state.workflows().status(&workflow_id).await {
        Ok(workflow) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "workflow": workflow,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Submit a choice. Responds once the search has run and the report is
/// composed.
pub async fn submit_choice(
    Path(workflow_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<ChoiceRequest>,
) -> Response {
    if let Some(session_id) = req.session_id.as_deref() {
        state
            .app_state
            .sessions()
            .update_activity(session_id, None)
            .await;
    }

    match state
        .app_state
        .workflows()
        .choose(&workflow_id, &req.choice)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "outcome": outcome,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn save_report(
    Path(workflow_id): Path<String>,
    State(state): State<ApiState>,
    Json(req): Json<SaveReportRequest>,
) -> Response {
    match state
        .app_state
        .workflows()
        .save(&workflow_id, req.location)
        .await
    {
        Ok(saved) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "saved": saved,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn close_workflow(
    Path(workflow_id): Path<String>,
    State(state): State<ApiState>,
) -> Response {
    match state.app_state.workflows().close(&workflow_id).await {
        Ok(workflow) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "workflow": workflow,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
