//! WorkflowRegistryActor - owns the research workflow state machine
//!
//! The WorkflowRegistryActor is responsible for:
//! - Creating workflows and generating their proposals
//! - Parsing choices and recording the selected proposal
//! - Running search execution off the actor and folding the result back in
//! - Composing and persisting reports

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use shared_types::{
    ChoiceOutcome, ResearchPreferences, SavedReport, StartWorkflowResponse, WorkflowPhase,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::choice::{parse_choice, resolve_choice, ChoiceDirective};
use super::proposals::generate_proposals;
use super::protocol::{WorkflowError, WorkflowMsg};
use super::state::WorkflowStore;
use crate::clock::SharedClock;
use crate::report::{self, PersistError};
use crate::search::{ExecutionRun, SearchError, SearchExecutor};

/// WorkflowRegistryActor - research workflow orchestration
#[derive(Debug, Default)]
pub struct WorkflowRegistryActor;

/// Arguments for spawning WorkflowRegistryActor
#[derive(Clone)]
pub struct WorkflowRegistryArguments {
    pub executor: Arc<SearchExecutor>,
    /// Directory that receives saved report artifacts
    pub reports_dir: PathBuf,
    pub clock: SharedClock,
}

/// Internal state for WorkflowRegistryActor
pub struct WorkflowRegistryState {
    workflows: WorkflowStore,
    executor: Arc<SearchExecutor>,
    reports_dir: PathBuf,
}

#[async_trait]
impl Actor for WorkflowRegistryActor {
    type Msg = WorkflowMsg;
    type State = WorkflowRegistryState;
    type Arguments = WorkflowRegistryArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            reports_dir = %args.reports_dir.display(),
            backends = ?args.executor.chain().names(),
            ready_backends = args.executor.chain().ready_count(),
            "WorkflowRegistryActor starting"
        );

        Ok(WorkflowRegistryState {
            workflows: WorkflowStore::new(args.clock),
            executor: args.executor,
            reports_dir: args.reports_dir,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkflowMsg::Start {
                topic,
                preferences,
                reply,
            } => {
                let result = self.handle_start(state, topic, preferences);
                let _ = reply.send(result);
            }
            WorkflowMsg::Choose {
                workflow_id,
                choice,
                reply,
            } => {
                self.handle_choose(myself, state, workflow_id, choice, reply);
            }
            WorkflowMsg::ExecutionFinished {
                workflow_id,
                choice_message,
                outcome,
                reply,
            } => {
                let result =
                    self.handle_execution_finished(state, &workflow_id, choice_message, outcome);
                let _ = reply.send(result);
            }
            WorkflowMsg::Save {
                workflow_id,
                location,
                reply,
            } => {
                let result = self.handle_save(state, &workflow_id, location).await;
                let _ = reply.send(result);
            }
            WorkflowMsg::GetStatus { workflow_id, reply } => {
                let result = state
                    .workflows
                    .get(&workflow_id)
                    .map(|record| record.snapshot())
                    .ok_or(WorkflowError::NotFound(workflow_id));
                let _ = reply.send(result);
            }
            WorkflowMsg::List { reply } => {
                let _ = reply.send(state.workflows.snapshots());
            }
            WorkflowMsg::Close { workflow_id, reply } => {
                let result = match state.workflows.remove(&workflow_id) {
                    Some(record) => {
                        tracing::info!(workflow_id = %workflow_id, phase = %record.phase, "Workflow closed");
                        Ok(record.snapshot())
                    }
                    None => Err(WorkflowError::NotFound(workflow_id)),
                };
                let _ = reply.send(result);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            workflows = state.workflows.len(),
            "WorkflowRegistryActor stopped"
        );
        Ok(())
    }
}

impl WorkflowRegistryActor {
    fn handle_start(
        &self,
        state: &mut WorkflowRegistryState,
        topic: String,
        preferences: ResearchPreferences,
    ) -> Result<StartWorkflowResponse, WorkflowError> {
        let topic = topic.trim().to_string();
        if topic.is_empty() {
            return Err(WorkflowError::InvalidTopic);
        }

        let workflow_id = state.workflows.create(topic.clone(), preferences).id.clone();
        let proposals = generate_proposals(&topic);
        let record = state
            .workflows
            .transition_to_proposal(&workflow_id, proposals)?;

        tracing::info!(workflow_id = %workflow_id, topic = %topic, "Research workflow started");

        Ok(StartWorkflowResponse {
            workflow_id: workflow_id.clone(),
            phase: record.phase,
            topic: topic.clone(),
            proposals: record.proposals.clone(),
            message: format!(
                "I've prepared {} research approaches for \"{topic}\". Which one should I use?",
                record.proposals.len()
            ),
            next_action: "Reply with 'option 1', 'option 2', 'option 3' or 'choose for me'"
                .to_string(),
        })
    }

    /// Validate and record the choice, then run the search off-actor. The
    /// reply is sent once `ExecutionFinished` comes back.
    fn handle_choose(
        &self,
        myself: ActorRef<WorkflowMsg>,
        state: &mut WorkflowRegistryState,
        workflow_id: String,
        choice: String,
        reply: RpcReplyPort<Result<ChoiceOutcome, WorkflowError>>,
    ) {
        let record = match state
            .workflows
            .require_phase(&workflow_id, WorkflowPhase::Proposal)
        {
            Ok(record) => record,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        let Some(directive) = parse_choice(&choice) else {
            let _ = reply.send(Err(WorkflowError::InvalidChoice(format!(
                "could not understand '{}'; reply with 'option N' or 'choose for me'",
                choice.trim()
            ))));
            return;
        };
        let Some(index) = resolve_choice(directive, &record.proposals) else {
            let _ = reply.send(Err(WorkflowError::InvalidChoice(format!(
                "please choose a number between 1 and {}",
                record.proposals.len()
            ))));
            return;
        };

        let record = match state.workflows.transition_to_execution(&workflow_id, index) {
            Ok(record) => record,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };
        let Some(proposal) = record.selected_proposal().cloned() else {
            let _ = reply.send(Err(WorkflowError::InvalidChoice(
                "selected proposal is missing".to_string(),
            )));
            return;
        };

        let choice_message = match directive {
            ChoiceDirective::Auto => format!(
                "I chose the {} approach ({:.0}% confidence).",
                proposal.title,
                proposal.confidence * 100.0
            ),
            ChoiceDirective::Index(n) => {
                format!("Option {n} selected: {}.", proposal.title)
            }
        };
        tracing::info!(
            workflow_id = %workflow_id,
            proposal = %proposal.title,
            complexity = proposal.complexity.as_str(),
            "Proposal selected; starting search execution"
        );

        let executor = state.executor.clone();
        let topic = record.topic.clone();
        let preferences = record.preferences.clone();
        tokio::spawn(async move {
            let outcome = executor
                .run(&topic, proposal.complexity, &preferences)
                .await;
            // If the actor is gone the reply port drops and the caller sees
            // the registry as unavailable.
            let _ = myself.send_message(WorkflowMsg::ExecutionFinished {
                workflow_id,
                choice_message,
                outcome,
                reply,
            });
        });
    }

    fn handle_execution_finished(
        &self,
        state: &mut WorkflowRegistryState,
        workflow_id: &str,
        choice_message: String,
        outcome: Result<ExecutionRun, SearchError>,
    ) -> Result<ChoiceOutcome, WorkflowError> {
        let Some(record) = state.workflows.get(workflow_id) else {
            tracing::warn!(workflow_id, "Workflow closed during execution; dropping results");
            return Err(WorkflowError::NotFound(workflow_id.to_string()));
        };

        let run = match outcome {
            Ok(run) => run,
            Err(SearchError::AllTasksFailed { errors, .. }) => {
                tracing::error!(workflow_id, errors = ?errors, "All search tasks failed");
                state.workflows.transition_to_failed(
                    workflow_id,
                    format!("all search tasks failed: {}", errors.join(" | ")),
                )?;
                return Err(WorkflowError::BackendUnavailable {
                    workflow_id: workflow_id.to_string(),
                    errors,
                });
            }
        };

        let proposal = record
            .selected_proposal()
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        let topic = record.topic.clone();

        let ranked = report::rank_results(&topic, run.results);
        let quality = report::quality_score(&ranked);
        let mut execution = run.summary;
        execution.sources_found = ranked.len();
        execution.quality_score = quality;

        let generated = report::compose_report(
            &topic,
            &proposal,
            &ranked,
            quality,
            state.workflows.now(),
        );
        let record = state.workflows.transition_to_report(
            workflow_id,
            ranked,
            execution.clone(),
            generated.clone(),
        )?;

        tracing::info!(
            workflow_id,
            sources = execution.sources_found,
            quality = execution.quality_score,
            partial = execution.partial,
            "Research report ready"
        );

        Ok(ChoiceOutcome {
            workflow: record.snapshot(),
            choice_message,
            execution,
            report: generated,
            next_action: "Say 'save report' to store it, or ask for another topic".to_string(),
        })
    }

    async fn handle_save(
        &self,
        state: &mut WorkflowRegistryState,
        workflow_id: &str,
        location: Option<String>,
    ) -> Result<SavedReport, WorkflowError> {
        let record = state
            .workflows
            .require_phase(workflow_id, WorkflowPhase::Report)?;
        let report = record
            .report
            .clone()
            .ok_or_else(|| WorkflowError::Persistence("report missing in report phase".to_string()))?;

        let slug = report::resolve_slug(location.as_deref(), &record.topic, state.workflows.now())
            .map_err(WorkflowError::InvalidLocation)?;

        let paths = report::save_report(&state.reports_dir, &slug, &report)
            .await
            .map_err(|e| match e {
                PersistError::AlreadyExists { .. } => WorkflowError::InvalidLocation(e.to_string()),
                e => {
                    tracing::error!(workflow_id, error = %e, "Failed to save report");
                    WorkflowError::Persistence(e.to_string())
                }
            })?;

        let saved = SavedReport {
            workflow_id: workflow_id.to_string(),
            markdown_path: paths.markdown.display().to_string(),
            html_path: paths.html.display().to_string(),
            json_path: paths.json.display().to_string(),
        };
        state
            .workflows
            .transition_to_complete(workflow_id, saved.clone())?;

        tracing::info!(workflow_id, path = %saved.markdown_path, "Research report saved");
        Ok(saved)
    }
}
