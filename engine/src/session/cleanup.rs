//! Resource cleanup dispatch for expired or force-closed sessions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_types::{
    TrackedResource, RESOURCE_BROWSER_SESSION, RESOURCE_RESEARCH_WORKFLOW, RESOURCE_TEMP_FILE,
};

use crate::actors::workflow::{WorkflowError, WorkflowRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    ResearchWorkflow,
    TempFile,
    BrowserSession,
    Other(String),
}

impl ResourceKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            RESOURCE_RESEARCH_WORKFLOW => Self::ResearchWorkflow,
            RESOURCE_TEMP_FILE => Self::TempFile,
            RESOURCE_BROWSER_SESSION => Self::BrowserSession,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ResearchWorkflow => RESOURCE_RESEARCH_WORKFLOW,
            Self::TempFile => RESOURCE_TEMP_FILE,
            Self::BrowserSession => RESOURCE_BROWSER_SESSION,
            Self::Other(kind) => kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("failed to remove {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to remove {path}: outside the session temp root")]
    OutsideTempRoot { path: String },
    #[error("failed to close workflow {workflow_id}: {source}")]
    Workflow {
        workflow_id: String,
        #[source]
        source: WorkflowError,
    },
}

/// Releases one tracked resource. Implementations must tolerate resources
/// that are already gone.
#[async_trait]
pub trait ResourceCleaner: Send + Sync {
    async fn cleanup(&self, session_id: &str, resource: &TrackedResource)
        -> Result<(), CleanupError>;
}

/// Default cleaner: closes research workflows, deletes temp files under
/// the configured temp root, and logs everything else.
///
/// Without a temp root no temp file is ever deleted.
#[derive(Clone, Default)]
pub struct CascadingCleaner {
    workflows: Option<WorkflowRegistry>,
    temp_root: Option<PathBuf>,
}

impl CascadingCleaner {
    pub fn new(workflows: WorkflowRegistry) -> Self {
        Self {
            workflows: Some(workflows),
            temp_root: None,
        }
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    async fn remove_temp_file(&self, path: &str) -> Result<(), CleanupError> {
        let io_err = |source| CleanupError::Io {
            path: path.to_string(),
            source,
        };
        let outside = || CleanupError::OutsideTempRoot {
            path: path.to_string(),
        };

        let root = match &self.temp_root {
            Some(root) => tokio::fs::canonicalize(root).await.map_err(|_| outside())?,
            None => return Err(outside()),
        };
        let target = tokio::fs::canonicalize(path).await.map_err(io_err)?;
        if !is_within(&target, &root) {
            return Err(outside());
        }
        tokio::fs::remove_file(&target).await.map_err(io_err)
    }
}

/// Strictly below `root`; the root itself does not count.
fn is_within(target: &Path, root: &Path) -> bool {
    target != root && target.starts_with(root)
}

#[async_trait]
impl ResourceCleaner for CascadingCleaner {
    async fn cleanup(
        &self,
        session_id: &str,
        resource: &TrackedResource,
    ) -> Result<(), CleanupError> {
        match ResourceKind::parse(&resource.kind) {
            ResourceKind::ResearchWorkflow => {
                let Some(workflows) = &self.workflows else {
                    tracing::warn!(session_id, workflow_id = %resource.id, "No workflow registry attached; nothing to close");
                    return Ok(());
                };
                match workflows.close(&resource.id).await {
                    Ok(_) => {
                        tracing::info!(session_id, workflow_id = %resource.id, "Closed research workflow");
                        Ok(())
                    }
                    Err(WorkflowError::NotFound(_)) => {
                        tracing::debug!(session_id, workflow_id = %resource.id, "Research workflow already closed");
                        Ok(())
                    }
                    Err(source) => Err(CleanupError::Workflow {
                        workflow_id: resource.id.clone(),
                        source,
                    }),
                }
            }
            ResourceKind::TempFile => {
                if let Err(err) = self.remove_temp_file(&resource.id).await {
                    if matches!(err, CleanupError::OutsideTempRoot { .. }) {
                        tracing::warn!(session_id, path = %resource.id, "Temp file outside temp root; left in place");
                    }
                    return Err(err);
                }
                tracing::info!(session_id, path = %resource.id, "Removed temp file");
                Ok(())
            }
            ResourceKind::BrowserSession => {
                tracing::info!(session_id, browser_session = %resource.id, "Browser session released");
                Ok(())
            }
            ResourceKind::Other(kind) => {
                tracing::warn!(session_id, kind = %kind, resource_id = %resource.id, "No cleanup handler for resource kind");
                Ok(())
            }
        }
    }
}
