//! Shared handles for the HTTP layer: the workflow registry and sessions.

use std::sync::Arc;

use crate::actors::workflow::{WorkflowRegistry, WorkflowRegistryArguments};
use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::search::{BackendChain, SearchExecutor};
use crate::session::{CascadingCleaner, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    workflows: WorkflowRegistry,
    sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(workflows: WorkflowRegistry, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                workflows,
                sessions,
            }),
        }
    }

    /// Spawn the workflow registry actor and wire the session registry so
    /// expired sessions close their workflows.
    pub async fn bootstrap(
        config: &EngineConfig,
        chain: BackendChain,
        clock: SharedClock,
    ) -> Result<Self, ractor::SpawnErr> {
        let executor = Arc::new(SearchExecutor::new(chain, config.search.clone()));
        let (workflows, _handle) = WorkflowRegistry::spawn(WorkflowRegistryArguments {
            executor,
            reports_dir: config.reports_dir.clone(),
            clock: clock.clone(),
        })
        .await?;

        if let Err(e) = tokio::fs::create_dir_all(&config.session_temp_dir).await {
            tracing::warn!(
                path = %config.session_temp_dir.display(),
                error = %e,
                "Could not create session temp dir; temp file cleanup will be refused"
            );
        }
        let cleaner = Arc::new(
            CascadingCleaner::new(workflows.clone()).with_temp_root(&config.session_temp_dir),
        );
        let sessions = SessionRegistry::new(config.sessions.clone(), clock, cleaner);
        Ok(Self::new(workflows, sessions))
    }

    pub fn workflows(&self) -> &WorkflowRegistry {
        &self.inner.workflows
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.inner.sessions
    }

    /// Drain sessions (closing their workflows) and stop the registry actor.
    pub async fn shutdown(&self) {
        let summaries = self.inner.sessions.shutdown().await;
        tracing::info!(sessions_cleaned = summaries.len(), "Sessions drained");
        self.inner
            .workflows
            .actor()
            .stop(Some("engine shutdown".to_string()));
    }
}
