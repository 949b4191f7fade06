//! WorkflowRegistryActor message protocol
//!
//! Defines the messages that can be sent to the WorkflowRegistryActor and
//! the error type shared by every workflow operation.

use ractor::RpcReplyPort;
use shared_types::{
    ChoiceOutcome, ResearchPreferences, SavedReport, StartWorkflowResponse, WorkflowPhase,
    WorkflowSnapshot,
};

use crate::search::{ExecutionRun, SearchError};

/// Messages handled by WorkflowRegistryActor
#[derive(Debug)]
pub enum WorkflowMsg {
    /// Create a workflow and generate its proposals
    Start {
        topic: String,
        preferences: ResearchPreferences,
        reply: RpcReplyPort<Result<StartWorkflowResponse, WorkflowError>>,
    },
    /// Select a proposal and run the research
    Choose {
        workflow_id: String,
        choice: String,
        reply: RpcReplyPort<Result<ChoiceOutcome, WorkflowError>>,
    },
    /// Search execution finished for a workflow (sent by the spawned run)
    ExecutionFinished {
        workflow_id: String,
        choice_message: String,
        outcome: Result<ExecutionRun, SearchError>,
        reply: RpcReplyPort<Result<ChoiceOutcome, WorkflowError>>,
    },
    /// Persist the report artifacts
    Save {
        workflow_id: String,
        location: Option<String>,
        reply: RpcReplyPort<Result<SavedReport, WorkflowError>>,
    },
    GetStatus {
        workflow_id: String,
        reply: RpcReplyPort<Result<WorkflowSnapshot, WorkflowError>>,
    },
    List {
        reply: RpcReplyPort<Vec<WorkflowSnapshot>>,
    },
    /// Remove a workflow
    Close {
        workflow_id: String,
        reply: RpcReplyPort<Result<WorkflowSnapshot, WorkflowError>>,
    },
}

/// Errors that can occur in workflow operations
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("workflow not found: {0}")]
    NotFound(String),
    #[error("topic must not be empty")]
    InvalidTopic,
    #[error("invalid choice: {0}")]
    InvalidChoice(String),
    #[error("workflow {workflow_id} is in phase {actual}, expected {expected}")]
    InvalidPhase {
        workflow_id: String,
        expected: WorkflowPhase,
        actual: WorkflowPhase,
    },
    #[error("invalid save location: {0}")]
    InvalidLocation(String),
    #[error("no search backend produced results for workflow {workflow_id}: {}", .errors.join(" | "))]
    BackendUnavailable {
        workflow_id: String,
        errors: Vec<String>,
    },
    #[error("report persistence failed: {0}")]
    Persistence(String),
    #[error("workflow registry unavailable: {0}")]
    Unavailable(String),
}

impl WorkflowError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTopic => "INVALID_TOPIC",
            Self::InvalidChoice(_) => "INVALID_CHOICE",
            Self::InvalidPhase { .. } => "INVALID_PHASE",
            Self::InvalidLocation(_) => "INVALID_LOCATION",
            Self::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Unavailable(_) => "REGISTRY_UNAVAILABLE",
        }
    }
}

impl From<WorkflowError> for shared_types::ApiError {
    fn from(err: WorkflowError) -> Self {
        shared_types::ApiError {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
