//! Workflow registry actor tests
//!
//! Drives the full proposal -> execution -> report -> complete cycle through
//! the typed client against scripted search backends.

mod common;

use jarvis_engine::actors::workflow::WorkflowError;
use jarvis_engine::clock::system_clock;
use jarvis_engine::search::{BackendSlot, ExecutorConfig};
use shared_types::{Complexity, ResearchPreferences, WorkflowPhase};
use std::sync::atomic::Ordering;

use common::{
    fast_executor_config, spawn_registry, spawn_registry_with_config, DownBackend, EchoBackend,
    StalledBackend,
};
use std::time::Duration;

#[tokio::test]
async fn test_ai_ethics_option_two_produces_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    assert_eq!(started.phase, WorkflowPhase::Proposal);
    assert_eq!(started.topic, "ai ethics");
    assert_eq!(started.proposals.len(), 3);

    let outcome = registry
        .choose(&started.workflow_id, "option 2")
        .await
        .unwrap();
    assert_eq!(outcome.workflow.phase, WorkflowPhase::Report);
    assert!(outcome.workflow.report_ready);
    assert_eq!(
        outcome.workflow.selected_proposal.as_deref(),
        Some("Comprehensive Deep-Dive")
    );
    assert_eq!(outcome.report.complexity, Complexity::Comprehensive);
    assert_eq!(outcome.report.title, "Research Report: ai ethics");
    assert!(outcome.execution.sources_found > 0);
    assert!(!outcome.execution.partial);
    assert_eq!(outcome.execution.backends_used, vec!["echo".to_string()]);
    assert!((0.0..=10.0).contains(&outcome.report.quality_score));

    let status = registry.status(&started.workflow_id).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Report);
    assert_eq!(status.research_data_count, outcome.execution.sources_found);
}

#[tokio::test]
async fn test_out_of_range_choice_keeps_proposal_phase() {
    let temp_dir = tempfile::tempdir().unwrap();
    let backend = EchoBackend::new("echo");
    let calls = backend.calls.clone();
    let registry = spawn_registry(
        vec![BackendSlot::ready(backend)],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();

    let err = registry
        .choose(&started.workflow_id, "option 9")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidChoice(_)));
    assert_eq!(err.code(), "INVALID_CHOICE");

    let err = registry
        .choose(&started.workflow_id, "tell me a joke")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidChoice(_)));

    let status = registry.status(&started.workflow_id).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Proposal);
    assert_eq!(status.selected_proposal, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_choose_for_me_picks_highest_confidence() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("rust async runtimes", ResearchPreferences::default())
        .await
        .unwrap();
    let outcome = registry
        .choose(&started.workflow_id, "Choose for me")
        .await
        .unwrap();
    assert_eq!(
        outcome.workflow.selected_proposal.as_deref(),
        Some("Comprehensive Deep-Dive")
    );
    assert!(outcome.choice_message.contains("Comprehensive Deep-Dive"));
}

#[tokio::test]
async fn test_second_choice_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    registry.choose(&started.workflow_id, "1").await.unwrap();

    let err = registry
        .choose(&started.workflow_id, "option 3")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidPhase {
            workflow_id: started.workflow_id.clone(),
            expected: WorkflowPhase::Proposal,
            actual: WorkflowPhase::Report,
        }
    );
}

#[tokio::test]
async fn test_empty_topic_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let err = registry
        .start("   ", ResearchPreferences::default())
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::InvalidTopic);
    assert!(registry.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_backends_failing_moves_workflow_to_failed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![
            BackendSlot::NotConfigured {
                name: "tavily".to_string(),
                reason: "TAVILY_API_KEY is not set".to_string(),
            },
            BackendSlot::ready(DownBackend {
                name: "brave".to_string(),
            }),
        ],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    let err = registry
        .choose(&started.workflow_id, "option 1")
        .await
        .unwrap_err();
    match &err {
        WorkflowError::BackendUnavailable {
            workflow_id,
            errors,
        } => {
            assert_eq!(workflow_id, &started.workflow_id);
            assert!(!errors.is_empty());
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
    assert_eq!(err.code(), "BACKEND_UNAVAILABLE");

    let status = registry.status(&started.workflow_id).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Failed);
    assert!(status.error.is_some());
    assert!(!status.report_ready);
}

#[tokio::test]
async fn test_slow_backend_falls_through_to_next() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![
            BackendSlot::ready(StalledBackend {
                name: "stalled".to_string(),
            }),
            BackendSlot::ready(EchoBackend::new("echo")),
        ],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    let outcome = registry
        .choose(&started.workflow_id, "option 1")
        .await
        .unwrap();
    assert_eq!(outcome.workflow.phase, WorkflowPhase::Report);
    assert_eq!(outcome.execution.backends_used, vec!["echo".to_string()]);
    assert_eq!(
        outcome.execution.tasks_succeeded,
        outcome.execution.tasks_total
    );
}

#[tokio::test]
async fn test_save_requires_report_phase() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    let err = registry
        .save(&started.workflow_id, None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidPhase {
            workflow_id: started.workflow_id.clone(),
            expected: WorkflowPhase::Report,
            actual: WorkflowPhase::Proposal,
        }
    );
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_save_completes_workflow() {
    let temp_dir = tempfile::tempdir().unwrap();
    let reports_dir = temp_dir.path().join("reports");
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        &reports_dir,
        system_clock(),
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    registry
        .choose(&started.workflow_id, "option 2")
        .await
        .unwrap();

    let err = registry
        .save(&started.workflow_id, Some("../escape".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidLocation(_)));

    let saved = registry
        .save(&started.workflow_id, Some("weekly".to_string()))
        .await
        .unwrap();
    assert!(reports_dir.join("weekly.md").is_file());
    assert!(reports_dir.join("weekly.html").is_file());
    assert!(reports_dir.join("weekly.json").is_file());
    assert!(saved.markdown_path.ends_with("weekly.md"));

    let status = registry.status(&started.workflow_id).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Complete);

    let err = registry
        .save(&started.workflow_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidPhase { .. }));
}

#[tokio::test]
async fn test_save_to_taken_location_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let reports_dir = temp_dir.path().join("reports");
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        &reports_dir,
        system_clock(),
    )
    .await;

    let mut ids = Vec::new();
    for topic in ["ai ethics", "quantum computing"] {
        let started = registry
            .start(topic, ResearchPreferences::default())
            .await
            .unwrap();
        registry
            .choose(&started.workflow_id, "option 1")
            .await
            .unwrap();
        ids.push(started.workflow_id);
    }

    registry
        .save(&ids[0], Some("weekly".to_string()))
        .await
        .unwrap();
    let first_markdown = std::fs::read_to_string(reports_dir.join("weekly.md")).unwrap();

    let err = registry
        .save(&ids[1], Some("weekly".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidLocation(_)));
    assert_eq!(
        std::fs::read_to_string(reports_dir.join("weekly.md")).unwrap(),
        first_markdown
    );

    // The rejected workflow keeps its report and can save elsewhere.
    let status = registry.status(&ids[1]).await.unwrap();
    assert_eq!(status.phase, WorkflowPhase::Report);
    registry
        .save(&ids[1], Some("weekly_quantum".to_string()))
        .await
        .unwrap();
    assert!(reports_dir.join("weekly_quantum.json").is_file());
}

#[tokio::test]
async fn test_close_during_execution_discards_results() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry_with_config(
        vec![
            BackendSlot::ready(StalledBackend {
                name: "stalled".to_string(),
            }),
            BackendSlot::ready(EchoBackend::new("echo")),
        ],
        temp_dir.path(),
        system_clock(),
        ExecutorConfig {
            task_timeout: Duration::from_millis(500),
            ..fast_executor_config()
        },
    )
    .await;

    let started = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();

    let chooser = registry.clone();
    let workflow_id = started.workflow_id.clone();
    let pending = tokio::spawn(async move { chooser.choose(&workflow_id, "option 1").await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let closed = registry.close(&started.workflow_id).await.unwrap();
    assert_eq!(closed.phase, WorkflowPhase::Execution);

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err, WorkflowError::NotFound(started.workflow_id.clone()));
    assert!(registry.list().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_close_removes_workflow() {
    let temp_dir = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        vec![BackendSlot::ready(EchoBackend::new("echo"))],
        temp_dir.path(),
        system_clock(),
    )
    .await;

    let first = registry
        .start("ai ethics", ResearchPreferences::default())
        .await
        .unwrap();
    let second = registry
        .start("quantum computing", ResearchPreferences::default())
        .await
        .unwrap();

    let listed: Vec<String> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.workflow_id)
        .collect();
    assert_eq!(
        listed,
        vec![first.workflow_id.clone(), second.workflow_id.clone()]
    );

    let closed = registry.close(&first.workflow_id).await.unwrap();
    assert_eq!(closed.phase, WorkflowPhase::Proposal);

    let err = registry.status(&first.workflow_id).await.unwrap_err();
    assert_eq!(err, WorkflowError::NotFound(first.workflow_id.clone()));
    let err = registry.close(&first.workflow_id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(registry.list().await.unwrap().len(), 1);
}
