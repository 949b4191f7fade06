//! WorkflowRegistryActor - interactive research workflows
//!
//! The registry owns every workflow and is the only place phases change:
//! - `Start` creates a workflow and offers three proposals
//! - `Choose` records the selection and runs the search executor
//! - `Save` persists the report and completes the workflow
//! - `Close` removes a workflow (used by session cleanup)
//!
//! ## State Machine
//!
//! ```text
//! initial → proposal → execution → report → complete
//!              |           |
//!              v           v
//!            failed      failed
//! ```
//!
//! Search execution runs in a spawned task that reports back with
//! `WorkflowMsg::ExecutionFinished`, so the actor keeps serving other
//! workflows while a search is in flight.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (registry, _handle) = WorkflowRegistry::spawn(WorkflowRegistryArguments {
//!     executor: Arc::new(executor),
//!     reports_dir: "jarvis_reports".into(),
//!     clock: system_clock(),
//! })
//! .await?;
//!
//! let started = registry.start("ai ethics", ResearchPreferences::default()).await?;
//! let outcome = registry.choose(&started.workflow_id, "option 2").await?;
//! ```

pub mod actor;
pub mod choice;
pub mod proposals;
pub mod protocol;
pub mod state;

pub use actor::{WorkflowRegistryActor, WorkflowRegistryArguments, WorkflowRegistryState};
pub use protocol::{WorkflowError, WorkflowMsg};

use ractor::{Actor, ActorRef};
use shared_types::{
    ChoiceOutcome, ResearchPreferences, SavedReport, StartWorkflowResponse, WorkflowSnapshot,
};

/// Typed client for the WorkflowRegistryActor.
#[derive(Clone)]
pub struct WorkflowRegistry {
    actor: ActorRef<WorkflowMsg>,
}

impl WorkflowRegistry {
    pub fn new(actor: ActorRef<WorkflowMsg>) -> Self {
        Self { actor }
    }

    pub async fn spawn(
        args: WorkflowRegistryArguments,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
        let (actor, handle) = Actor::spawn(None, WorkflowRegistryActor, args).await?;
        Ok((Self::new(actor), handle))
    }

    pub fn actor(&self) -> &ActorRef<WorkflowMsg> {
        &self.actor
    }

    pub async fn start(
        &self,
        topic: &str,
        preferences: ResearchPreferences,
    ) -> Result<StartWorkflowResponse, WorkflowError> {
        let topic = topic.to_string();
        ractor::call!(self.actor, |reply| WorkflowMsg::Start {
            topic,
            preferences,
            reply,
        })
        .map_err(|e| WorkflowError::Unavailable(e.to_string()))?
    }

    pub async fn choose(
        &self,
        workflow_id: &str,
        choice: &str,
    ) -> Result<ChoiceOutcome, WorkflowError> {
        let workflow_id = workflow_id.to_string();
        let choice = choice.to_string();
        ractor::call!(self.actor, |reply| WorkflowMsg::Choose {
            workflow_id,
            choice,
            reply,
        })
        .map_err(|e| WorkflowError::Unavailable(e.to_string()))?
    }

    pub async fn save(
        &self,
        workflow_id: &str,
        location: Option<String>,
    ) -> Result<SavedReport, WorkflowError> {
        let workflow_id = workflow_id.to_string();
        ractor::call!(self.actor, |reply| WorkflowMsg::Save {
            workflow_id,
            location,
            reply,
        })
        .map_err(|e| WorkflowError::Unavailable(e.to_string()))?
    }

    pub async fn status(&self, workflow_id: &str) -> Result<WorkflowSnapshot, WorkflowError> {
        let workflow_id = workflow_id.to_string();
        ractor::call!(self.actor, |reply| WorkflowMsg::GetStatus {
            workflow_id,
            reply,
        })
        .map_err(|e| WorkflowError::Unavailable(e.to_string()))?
    }

    pub async fn list(&self) -> Result<Vec<WorkflowSnapshot>, WorkflowError> {
        ractor::call!(self.actor, |reply| WorkflowMsg::List { reply })
            .map_err(|e| WorkflowError::Unavailable(e.to_string()))
    }

    pub async fn close(&self, workflow_id: &str) -> Result<WorkflowSnapshot, WorkflowError> {
        let workflow_id = workflow_id.to_string();
        ractor::call!(self.actor, |reply| WorkflowMsg::Close {
            workflow_id,
            reply,
        })
        .map_err(|e| WorkflowError::Unavailable(e.to_string()))?
    }
}
