//! Shared types between the research engine and its HTTP clients
//!
//! These types cross the API boundary as JSON and are also the in-memory
//! representation the engine hands back from its registries.
//!
//! Serializable with serde for JSON over HTTP and for report artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Workflow Lifecycle
// ============================================================================

/// Phase of an interactive research workflow.
///
/// Phases only move forward along
/// `initial -> proposal -> execution -> report -> complete`; `failed` can be
/// entered from any phase that is not already terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initial,
    Proposal,
    Execution,
    Report,
    Complete,
    Failed,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Proposal => "proposal",
            Self::Execution => "execution",
            Self::Report => "report",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    fn rank(&self) -> Option<u8> {
        match self {
            Self::Initial => Some(0),
            Self::Proposal => Some(1),
            Self::Execution => Some(2),
            Self::Report => Some(3),
            Self::Complete => Some(4),
            Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the monotonic ordering.
    pub fn can_transition_to(&self, next: WorkflowPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(current), Some(target)) => target > current,
            (None, Some(_)) => false,
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Research depth tier of a proposal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Comprehensive,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Capitalized label used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Moderate => "Moderate",
            Self::Comprehensive => "Comprehensive",
        }
    }
}

/// A candidate research strategy offered to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub title: String,
    pub description: String,
    pub sources: Vec<String>,
    pub complexity: Complexity,
    pub estimated_minutes: u32,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// Confidence in [0, 1]; comparable across one proposal set.
    pub confidence: f64,
}

/// Caller preferences captured when a workflow starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchPreferences {
    /// Language codes used to derive localized query variants.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Overrides the engine's per-task result count.
    #[serde(default)]
    pub max_results_per_task: Option<usize>,
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Default for ResearchPreferences {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            max_results_per_task: None,
        }
    }
}

/// One ranked search finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub source_query: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub relevance_score: f64,
    /// Backend in the fallback chain that produced this result.
    pub backend: String,
}

/// Synthesized research report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub title: String,
    pub topic: String,
    pub approach: String,
    pub complexity: Complexity,
    pub generated_at: DateTime<Utc>,
    pub quality_score: f64,
    pub sources_count: usize,
    pub markdown: String,
    pub html: String,
    pub executive_summary: String,
    pub recommendations: Vec<String>,
    pub key_findings: Vec<String>,
}

/// Read-only view of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowSnapshot {
    pub workflow_id: String,
    pub topic: String,
    pub phase: WorkflowPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub proposals_count: usize,
    /// Title of the selected proposal, once chosen.
    pub selected_proposal: Option<String>,
    pub research_data_count: usize,
    pub report_ready: bool,
    pub error: Option<String>,
}

// ============================================================================
// Workflow Operation Payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartWorkflowResponse {
    pub workflow_id: String,
    pub phase: WorkflowPhase,
    pub topic: String,
    pub proposals: Vec<Proposal>,
    pub message: String,
    pub next_action: String,
}

/// How the parallel search step went.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionSummary {
    pub tasks_total: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    /// Tasks still running when the execution budget ran out.
    pub tasks_incomplete: usize,
    pub sources_found: usize,
    pub quality_score: f64,
    /// True when at least one task failed or did not finish.
    pub partial: bool,
    pub backends_used: Vec<String>,
    pub task_errors: Vec<String>,
}

/// Result of a successful choice: the workflow is now in `report`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceOutcome {
    pub workflow: WorkflowSnapshot,
    pub choice_message: String,
    pub execution: ExecutionSummary,
    pub report: Report,
    pub next_action: String,
}

/// Paths of the three persisted report artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedReport {
    pub workflow_id: String,
    pub markdown_path: String,
    pub html_path: String,
    pub json_path: String,
}

// ============================================================================
// Sessions
// ============================================================================

/// Resource kind for research workflows tracked under a session.
pub const RESOURCE_RESEARCH_WORKFLOW: &str = "research_workflow";
/// Resource kind for temporary files owned by a session.
pub const RESOURCE_TEMP_FILE: &str = "temp_file";
/// Resource kind for browser automation sessions.
pub const RESOURCE_BROWSER_SESSION: &str = "browser_session";

/// Opaque `(kind, id)` handle tracked purely for cleanup dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedResource {
    pub kind: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of one session with derived timing information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub command_count: u64,
    pub resources: Vec<TrackedResource>,
    pub age_seconds: f64,
    pub idle_seconds: f64,
    /// Negative once the session is overdue for reaping.
    pub expires_in_seconds: f64,
}

/// Outcome of cleaning up one removed session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupSummary {
    pub session_id: String,
    pub resources_total: usize,
    pub resources_cleaned: usize,
    pub resources_failed: usize,
    pub duration_seconds: f64,
    pub command_count: u64,
}

/// Outcome of one reaper sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SweepReport {
    pub expired: Vec<CleanupSummary>,
    pub remaining_sessions: usize,
}

// ============================================================================
// API Errors
// ============================================================================

/// Machine-readable error body returned by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions_are_monotonic() {
        use WorkflowPhase::*;
        assert!(Initial.can_transition_to(Proposal));
        assert!(Proposal.can_transition_to(Execution));
        assert!(Execution.can_transition_to(Report));
        assert!(Report.can_transition_to(Complete));

        assert!(!Execution.can_transition_to(Proposal));
        assert!(!Report.can_transition_to(Report));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Proposal));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_phases() {
        use WorkflowPhase::*;
        for phase in [Initial, Proposal, Execution, Report] {
            assert!(phase.can_transition_to(Failed), "{phase} -> failed");
        }
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&WorkflowPhase::Execution).unwrap();
        assert_eq!(json, "\"execution\"");
        let complexity: Complexity = serde_json::from_str("\"comprehensive\"").unwrap();
        assert_eq!(complexity, Complexity::Comprehensive);
    }

    #[test]
    fn test_preferences_default_to_english() {
        let prefs: ResearchPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs.languages, vec!["en".to_string()]);
        assert!(prefs.max_results_per_task.is_none());
    }
}
