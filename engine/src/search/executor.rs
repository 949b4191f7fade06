//! Concurrent search execution for a chosen research proposal
//!
//! One task per derived query, spawned on a `JoinSet`. Each task walks the
//! backend chain in order; a failing task never cancels its siblings. The
//! whole run is bounded by an execution budget after which stragglers are
//! detached and reported as incomplete.

use shared_types::{Complexity, ExecutionSummary, ResearchPreferences, SearchResult};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::task::JoinSet;

use super::{BackendChain, BackendError, BackendSlot, SearchHit};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bound on a single backend attempt.
    pub task_timeout: Duration,
    /// Bound on the whole run.
    pub execution_budget: Duration,
    pub results_per_task: usize,
    pub max_tasks: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(20),
            execution_budget: Duration::from_secs(60),
            results_per_task: 3,
            max_tasks: 8,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum SearchError {
    #[error("all {tasks} search tasks failed")]
    AllTasksFailed { tasks: usize, errors: Vec<String> },
}

/// Raw results in discovery order plus per-task accounting.
#[derive(Debug, Clone)]
pub struct ExecutionRun {
    pub results: Vec<SearchResult>,
    pub summary: ExecutionSummary,
}

#[derive(Debug)]
struct TaskReport {
    backend: Option<String>,
    results: Vec<SearchResult>,
}

#[derive(Debug)]
struct TaskFailure {
    errors: Vec<String>,
}

type TaskOutcome = Result<TaskReport, TaskFailure>;

#[derive(Debug, Clone)]
pub struct SearchExecutor {
    chain: BackendChain,
    config: ExecutorConfig,
}

impl SearchExecutor {
    pub fn new(chain: BackendChain, config: ExecutorConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &BackendChain {
        &self.chain
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Derive queries for the topic and run them concurrently.
    pub async fn run(
        &self,
        topic: &str,
        complexity: Complexity,
        preferences: &ResearchPreferences,
    ) -> Result<ExecutionRun, SearchError> {
        let queries = derive_queries(
            topic,
            complexity,
            &preferences.languages,
            self.config.max_tasks,
        );
        let per_task = preferences
            .max_results_per_task
            .unwrap_or(self.config.results_per_task)
            .max(1);
        self.run_queries(queries, per_task).await
    }

    pub async fn run_queries(
        &self,
        queries: Vec<String>,
        per_task: usize,
    ) -> Result<ExecutionRun, SearchError> {
        let total = queries.len();
        let budget = self.config.execution_budget;
        let mut set = JoinSet::new();
        let mut task_index = HashMap::new();

        for (index, query) in queries.iter().cloned().enumerate() {
            let chain = self.chain.clone();
            let timeout = self.config.task_timeout;
            let handle = set.spawn(async move {
                let outcome = run_task(chain, query, per_task, timeout).await;
                (index, outcome)
            });
            task_index.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<TaskOutcome>> = (0..total).map(|_| None).collect();
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => outcomes[index] = Some(outcome),
                Ok(Some(Err(join_err))) => {
                    tracing::warn!(error = %join_err, "Search task did not complete normally");
                    if let Some(index) = task_index.get(&join_err.id()).copied() {
                        outcomes[index] = Some(Err(TaskFailure {
                            errors: vec![format!("search task aborted: {join_err}")],
                        }));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        incomplete = set.len(),
                        budget_ms = budget.as_millis() as u64,
                        "Execution budget elapsed; detaching unfinished search tasks"
                    );
                    break;
                }
            }
        }
        set.detach_all();

        let mut summary = ExecutionSummary {
            tasks_total: total,
            ..ExecutionSummary::default()
        };
        let mut results = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            let query = &queries[index];
            match outcome {
                Some(Ok(report)) => {
                    summary.tasks_succeeded += 1;
                    if let Some(backend) = report.backend {
                        if !summary.backends_used.contains(&backend) {
                            summary.backends_used.push(backend);
                        }
                    }
                    results.extend(report.results);
                }
                Some(Err(failure)) => {
                    summary.tasks_failed += 1;
                    summary
                        .task_errors
                        .push(format!("{query}: {}", failure.errors.join("; ")));
                }
                None => {
                    summary.tasks_incomplete += 1;
                    summary.task_errors.push(format!(
                        "{query}: did not finish within {}ms",
                        budget.as_millis()
                    ));
                }
            }
        }
        summary.sources_found = results.len();
        summary.partial = summary.tasks_failed + summary.tasks_incomplete > 0;

        if summary.tasks_succeeded == 0 {
            return Err(SearchError::AllTasksFailed {
                tasks: total,
                errors: summary.task_errors,
            });
        }

        tracing::info!(
            tasks_total = summary.tasks_total,
            tasks_succeeded = summary.tasks_succeeded,
            tasks_failed = summary.tasks_failed,
            tasks_incomplete = summary.tasks_incomplete,
            sources = summary.sources_found,
            "Search execution finished"
        );
        Ok(ExecutionRun { results, summary })
    }
}

/// Walk the chain for one query. Hits end the walk; an empty answer lets
/// the next backend try. Fails only if every attempted backend errored.
async fn run_task(
    chain: BackendChain,
    query: String,
    per_task: usize,
    timeout: Duration,
) -> TaskOutcome {
    let mut errors = Vec::new();
    let mut answered = false;

    for slot in chain.slots() {
        let backend = match slot {
            BackendSlot::Ready(backend) => backend,
            BackendSlot::NotConfigured { name, reason } => {
                tracing::debug!(backend = %name, reason = %reason, query = %query, "Skipping unconfigured backend");
                errors.push(BackendError::NotConfigured(name.clone()).to_string());
                continue;
            }
        };

        let name = backend.name().to_string();
        match tokio::time::timeout(timeout, backend.search(&query, per_task)).await {
            Ok(Ok(hits)) if !hits.is_empty() => {
                tracing::debug!(backend = %name, query = %query, hits = hits.len(), "Search task answered");
                return Ok(TaskReport {
                    results: to_results(&query, &name, hits, per_task),
                    backend: Some(name),
                });
            }
            Ok(Ok(_)) => {
                tracing::debug!(backend = %name, query = %query, "Backend returned no hits; trying next");
                answered = true;
            }
            Ok(Err(err)) => {
                tracing::warn!(backend = %name, query = %query, error = %err, "Search backend failed");
                errors.push(err.to_string());
            }
            Err(_) => {
                let err = BackendError::Timeout {
                    backend: name.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                };
                tracing::warn!(backend = %name, query = %query, error = %err, "Search backend timed out");
                errors.push(err.to_string());
            }
        }
    }

    if answered {
        return Ok(TaskReport {
            backend: None,
            results: Vec::new(),
        });
    }
    if errors.is_empty() {
        errors.push("no search backends in chain".to_string());
    }
    Err(TaskFailure { errors })
}

fn to_results(query: &str, backend: &str, hits: Vec<SearchHit>, limit: usize) -> Vec<SearchResult> {
    hits.into_iter()
        .take(limit)
        .map(|hit| SearchResult {
            source_query: query.to_string(),
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
            relevance_score: 0.0,
            backend: backend.to_string(),
        })
        .collect()
}

fn base_queries(topic: &str) -> [String; 5] {
    [
        format!("{topic} best practices"),
        format!("{topic} guide tutorial"),
        format!("{topic} tips strategies"),
        format!("how to {topic}"),
        format!("{topic} examples case studies"),
    ]
}

/// Queries for a topic: base templates by depth, site-restricted queries,
/// then localized variants. Deduplicated, order-preserving, at most
/// `max_tasks` long.
pub fn derive_queries(
    topic: &str,
    complexity: Complexity,
    languages: &[String],
    max_tasks: usize,
) -> Vec<String> {
    let topic = topic.trim();
    let base_count = match complexity {
        Complexity::Simple => 2,
        Complexity::Moderate => 3,
        Complexity::Comprehensive => 4,
    };

    let mut candidates: Vec<String> = base_queries(topic).into_iter().take(base_count).collect();
    match complexity {
        Complexity::Simple => {}
        Complexity::Moderate => candidates.push(format!("{topic} site:github.com")),
        Complexity::Comprehensive => {
            candidates.push(format!("{topic} site:github.com"));
            candidates.push(format!("{topic} site:youtube.com"));
        }
    }

    for language in languages {
        let code = language.trim().to_ascii_lowercase();
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "" | "en" => {}
            "sv" => {
                candidates.push(format!("{topic} svenska"));
                candidates.push(format!("{topic} forskning Sverige"));
            }
            other => candidates.push(format!("{topic} lang:{other}")),
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|query| seen.insert(query.to_lowercase()))
        .take(max_tasks.max(1))
        .collect()
}
