//! WorkflowRegistryActor state management
//!
//! Owns every live workflow and enforces the phase ordering. All mutation
//! goes through the `transition_to_*` methods; a failed transition leaves
//! the workflow untouched.

use chrono::{DateTime, Utc};
use shared_types::{
    ExecutionSummary, Proposal, Report, ResearchPreferences, SavedReport, SearchResult,
    WorkflowPhase, WorkflowSnapshot,
};
use std::collections::BTreeMap;

use super::protocol::WorkflowError;
use crate::clock::SharedClock;

/// One research workflow.
#[derive(Debug, Clone)]
pub struct WorkflowRecord {
    pub id: String,
    pub topic: String,
    pub preferences: ResearchPreferences,
    pub phase: WorkflowPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub proposals: Vec<Proposal>,
    pub selected: Option<usize>,
    pub research_data: Vec<SearchResult>,
    pub execution: Option<ExecutionSummary>,
    pub report: Option<Report>,
    pub saved: Option<SavedReport>,
    pub error: Option<String>,
}

impl WorkflowRecord {
    pub fn selected_proposal(&self) -> Option<&Proposal> {
        self.selected.and_then(|index| self.proposals.get(index))
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            workflow_id: self.id.clone(),
            topic: self.topic.clone(),
            phase: self.phase,
            created_at: self.created_at,
            updated_at: self.updated_at,
            proposals_count: self.proposals.len(),
            selected_proposal: self.selected_proposal().map(|p| p.title.clone()),
            research_data_count: self.research_data.len(),
            report_ready: self.report.is_some(),
            error: self.error.clone(),
        }
    }
}

/// State container for WorkflowRegistryActor
pub struct WorkflowStore {
    /// Keyed by monotonic ULID, so iteration order is creation order.
    workflows: BTreeMap<String, WorkflowRecord>,
    ids: ulid::Generator,
    clock: SharedClock,
}

impl WorkflowStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            workflows: BTreeMap::new(),
            ids: ulid::Generator::new(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn next_id(&mut self) -> String {
        self.ids
            .generate()
            .unwrap_or_else(|_| ulid::Ulid::new())
            .to_string()
    }

    /// Insert a new workflow in `initial`.
    pub fn create(&mut self, topic: String, preferences: ResearchPreferences) -> &WorkflowRecord {
        let id = self.next_id();
        let now = self.now();
        let record = WorkflowRecord {
            id: id.clone(),
            topic,
            preferences,
            phase: WorkflowPhase::Initial,
            created_at: now,
            updated_at: now,
            proposals: Vec::new(),
            selected: None,
            research_data: Vec::new(),
            execution: None,
            report: None,
            saved: None,
            error: None,
        };
        self.workflows.entry(id).or_insert(record)
    }

    pub fn get(&self, workflow_id: &str) -> Option<&WorkflowRecord> {
        self.workflows.get(workflow_id)
    }

    /// Workflow that must currently be in `expected`.
    pub fn require_phase(
        &self,
        workflow_id: &str,
        expected: WorkflowPhase,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        let record = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        if record.phase != expected {
            return Err(WorkflowError::InvalidPhase {
                workflow_id: workflow_id.to_string(),
                expected,
                actual: record.phase,
            });
        }
        Ok(record)
    }

    fn advance(
        &mut self,
        workflow_id: &str,
        from: WorkflowPhase,
        to: WorkflowPhase,
    ) -> Result<&mut WorkflowRecord, WorkflowError> {
        let now = self.now();
        let record = self
            .workflows
            .get_mut(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        if record.phase != from || !record.phase.can_transition_to(to) {
            return Err(WorkflowError::InvalidPhase {
                workflow_id: workflow_id.to_string(),
                expected: from,
                actual: record.phase,
            });
        }
        tracing::debug!(workflow_id, from = %record.phase, to = %to, "Workflow phase transition");
        record.phase = to;
        record.updated_at = now;
        Ok(record)
    }

    /// initial -> proposal
    pub fn transition_to_proposal(
        &mut self,
        workflow_id: &str,
        proposals: Vec<Proposal>,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        let record = self.advance(workflow_id, WorkflowPhase::Initial, WorkflowPhase::Proposal)?;
        record.proposals = proposals;
        Ok(&*record)
    }

    /// proposal -> execution, recording the selection exactly once.
    pub fn transition_to_execution(
        &mut self,
        workflow_id: &str,
        selected: usize,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        if let Some(record) = self.workflows.get(workflow_id) {
            if selected >= record.proposals.len() {
                return Err(WorkflowError::InvalidChoice(format!(
                    "proposal {} does not exist",
                    selected + 1
                )));
            }
        }
        let record = self.advance(workflow_id, WorkflowPhase::Proposal, WorkflowPhase::Execution)?;
        record.selected = Some(selected);
        Ok(&*record)
    }

    /// execution -> report
    pub fn transition_to_report(
        &mut self,
        workflow_id: &str,
        research_data: Vec<SearchResult>,
        execution: ExecutionSummary,
        report: Report,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        let record = self.advance(workflow_id, WorkflowPhase::Execution, WorkflowPhase::Report)?;
        record.research_data = research_data;
        record.execution = Some(execution);
        record.report = Some(report);
        Ok(&*record)
    }

    /// report -> complete
    pub fn transition_to_complete(
        &mut self,
        workflow_id: &str,
        saved: SavedReport,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        let record = self.advance(workflow_id, WorkflowPhase::Report, WorkflowPhase::Complete)?;
        record.saved = Some(saved);
        Ok(&*record)
    }

    /// Any non-terminal phase -> failed
    pub fn transition_to_failed(
        &mut self,
        workflow_id: &str,
        error: String,
    ) -> Result<&WorkflowRecord, WorkflowError> {
        let now = self.now();
        let record = self
            .workflows
            .get_mut(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        if !record.phase.can_transition_to(WorkflowPhase::Failed) {
            return Err(WorkflowError::InvalidPhase {
                workflow_id: workflow_id.to_string(),
                expected: WorkflowPhase::Execution,
                actual: record.phase,
            });
        }
        record.phase = WorkflowPhase::Failed;
        record.error = Some(error);
        record.updated_at = now;
        Ok(&*record)
    }

    pub fn remove(&mut self, workflow_id: &str) -> Option<WorkflowRecord> {
        self.workflows.remove(workflow_id)
    }

    pub fn snapshots(&self) -> Vec<WorkflowSnapshot> {
        self.workflows.values().map(WorkflowRecord::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::workflow::proposals::generate_proposals;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn store() -> (WorkflowStore, ManualClock) {
        let clock = ManualClock::default();
        (WorkflowStore::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn selection_happens_once() {
        let (mut store, _) = store();
        let id = store
            .create("rust".to_string(), ResearchPreferences::default())
            .id
            .clone();
        store
            .transition_to_proposal(&id, generate_proposals("rust"))
            .unwrap();
        store.transition_to_execution(&id, 2).unwrap();

        let err = store.transition_to_execution(&id, 0).unwrap_err();
        assert_eq!(err.code(), "INVALID_PHASE");
        assert_eq!(store.get(&id).unwrap().selected, Some(2));
    }

    #[test]
    fn out_of_range_selection_keeps_proposal_phase() {
        let (mut store, _) = store();
        let id = store
            .create("rust".to_string(), ResearchPreferences::default())
            .id
            .clone();
        store
            .transition_to_proposal(&id, generate_proposals("rust"))
            .unwrap();

        assert!(matches!(
            store.transition_to_execution(&id, 3),
            Err(WorkflowError::InvalidChoice(_))
        ));
        assert_eq!(store.get(&id).unwrap().phase, WorkflowPhase::Proposal);
    }

    #[test]
    fn failed_is_terminal() {
        let (mut store, clock) = store();
        let id = store
            .create("rust".to_string(), ResearchPreferences::default())
            .id
            .clone();
        store
            .transition_to_proposal(&id, generate_proposals("rust"))
            .unwrap();
        clock.advance(chrono::Duration::seconds(5));
        let failed = store
            .transition_to_failed(&id, "backends down".to_string())
            .unwrap();
        assert_eq!(failed.phase, WorkflowPhase::Failed);
        assert!(failed.updated_at > failed.created_at);

        assert!(store.transition_to_failed(&id, "again".to_string()).is_err());
        assert!(store.transition_to_execution(&id, 0).is_err());
    }

    #[test]
    fn snapshots_follow_creation_order() {
        let (mut store, _) = store();
        let ids: Vec<String> = (0..5)
            .map(|i| {
                store
                    .create(format!("topic {i}"), ResearchPreferences::default())
                    .id
                    .clone()
            })
            .collect();
        let listed: Vec<String> = store
            .snapshots()
            .into_iter()
            .map(|s| s.workflow_id)
            .collect();
        assert_eq!(listed, ids);
    }
}
