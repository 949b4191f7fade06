//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use jarvis_engine::actors::workflow::{WorkflowRegistry, WorkflowRegistryArguments};
use jarvis_engine::clock::SharedClock;
use jarvis_engine::search::{
    BackendChain, BackendError, BackendSlot, ExecutorConfig, SearchBackend, SearchExecutor,
    SearchHit,
};
use jarvis_engine::session::{CleanupError, ResourceCleaner};
use shared_types::TrackedResource;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend that answers every query with deterministic hits built from it.
#[derive(Debug, Clone)]
pub struct EchoBackend {
    pub name: String,
    pub calls: Arc<AtomicUsize>,
}

impl EchoBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SearchBackend for EchoBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slug: String = query
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        Ok((0..max_results)
            .map(|i| SearchHit {
                title: format!("{query} guide {i}"),
                url: if i == 0 {
                    format!("https://github.com/example/{slug}")
                } else {
                    format!("https://docs.example.com/{slug}/{i}")
                },
                snippet: format!("A practical tutorial about {query}."),
            })
            .collect())
    }
}

/// Backend that always fails.
#[derive(Debug, Clone)]
pub struct DownBackend {
    pub name: String,
}

#[async_trait]
impl SearchBackend for DownBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, BackendError> {
        Err(BackendError::Request {
            backend: self.name.clone(),
            message: "503 Service Unavailable".to_string(),
        })
    }
}

/// Backend that never answers within any reasonable timeout.
#[derive(Debug, Clone)]
pub struct StalledBackend {
    pub name: String,
}

#[async_trait]
impl SearchBackend for StalledBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

pub fn fast_executor_config() -> ExecutorConfig {
    ExecutorConfig {
        task_timeout: Duration::from_millis(200),
        execution_budget: Duration::from_secs(5),
        results_per_task: 3,
        max_tasks: 8,
    }
}

pub async fn spawn_registry(
    slots: Vec<BackendSlot>,
    reports_dir: &Path,
    clock: SharedClock,
) -> WorkflowRegistry {
    spawn_registry_with_config(slots, reports_dir, clock, fast_executor_config()).await
}

pub async fn spawn_registry_with_config(
    slots: Vec<BackendSlot>,
    reports_dir: &Path,
    clock: SharedClock,
    config: ExecutorConfig,
) -> WorkflowRegistry {
    let executor = SearchExecutor::new(BackendChain::new(slots), config);
    let (registry, _handle) = WorkflowRegistry::spawn(WorkflowRegistryArguments {
        executor: Arc::new(executor),
        reports_dir: reports_dir.to_path_buf(),
        clock,
    })
    .await
    .expect("Failed to spawn workflow registry");
    registry
}

/// Cleaner that records every call. An optional delay widens race windows.
#[derive(Debug, Default)]
pub struct RecordingCleaner {
    calls: Mutex<Vec<(String, TrackedResource)>>,
    delay: Option<Duration>,
}

impl RecordingCleaner {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> Vec<(String, TrackedResource)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceCleaner for RecordingCleaner {
    async fn cleanup(
        &self,
        session_id: &str,
        resource: &TrackedResource,
    ) -> Result<(), CleanupError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((session_id.to_string(), resource.clone()));
        Ok(())
    }
}
