//! Web search capability used by research workflows
//!
//! A [`BackendChain`] is an ordered fallback list of search backends. Each
//! slot is decided once at construction: either a ready backend or a
//! placeholder recording why the backend is unavailable (usually a missing
//! API key). Search tasks walk the chain in order; see [`executor`].

use async_trait::async_trait;
use std::sync::Arc;

pub mod executor;
pub mod providers;

pub use executor::{derive_queries, ExecutionRun, ExecutorConfig, SearchError, SearchExecutor};
pub use providers::SearchProvider;

/// One raw hit returned by a backend before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Errors from a single backend attempt.
#[derive(Debug, thiserror::Error, Clone)]
pub enum BackendError {
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("{backend} request failed: {message}")]
    Request { backend: String, message: String },
    #[error("{backend} response could not be parsed: {message}")]
    Parse { backend: String, message: String },
    #[error("{backend} timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },
}

/// A search engine reachable by the executor.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Stable name used in logs and on each [`shared_types::SearchResult`].
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, BackendError>;
}

#[derive(Clone)]
pub enum BackendSlot {
    Ready(Arc<dyn SearchBackend>),
    NotConfigured { name: String, reason: String },
}

impl BackendSlot {
    pub fn ready(backend: impl SearchBackend + 'static) -> Self {
        Self::Ready(Arc::new(backend))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Ready(backend) => backend.name(),
            Self::NotConfigured { name, .. } => name,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(backend) => f.debug_tuple("Ready").field(&backend.name()).finish(),
            Self::NotConfigured { name, reason } => f
                .debug_struct("NotConfigured")
                .field("name", name)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Ordered fallback list of backends. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct BackendChain {
    slots: Arc<Vec<BackendSlot>>,
}

impl BackendChain {
    pub fn new(slots: Vec<BackendSlot>) -> Self {
        Self {
            slots: Arc::new(slots),
        }
    }

    /// Build the chain for the given providers, reading API keys from the
    /// process environment.
    pub fn from_env(providers: &[SearchProvider]) -> Self {
        let http = reqwest::Client::new();
        let slots = providers
            .iter()
            .map(|provider| providers::slot_from_env(*provider, &http))
            .collect();
        Self::new(slots)
    }

    pub fn slots(&self) -> &[BackendSlot] {
        &self.slots
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name().to_string()).collect()
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_ready()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
