//! In-memory session registry with idle expiry and resource cleanup.

use chrono::{DateTime, Utc};
use shared_types::{CleanupSummary, SessionInfo, SweepReport, TrackedResource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::cleanup::ResourceCleaner;
use super::reaper;
use crate::clock::SharedClock;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is reaped
    pub timeout: Duration,
    /// How often the reaper sweeps
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub command_count: u64,
    pub resources: Vec<TrackedResource>,
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

impl Session {
    fn idle(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_activity).to_std().unwrap_or(Duration::ZERO)
    }

    fn info(&self, now: DateTime<Utc>, timeout: Duration) -> SessionInfo {
        let idle_seconds = seconds_between(self.last_activity, now);
        SessionInfo {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            command_count: self.command_count,
            resources: self.resources.clone(),
            age_seconds: seconds_between(self.created_at, now),
            idle_seconds,
            expires_in_seconds: timeout.as_secs_f64() - idle_seconds,
        }
    }
}

/// Session registry keyed by session id.
///
/// One coarse lock guards the map. Sessions are removed under the lock and
/// their resources are cleaned after it is released, so each removed
/// session is cleaned exactly once no matter which path removed it.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    config: SessionConfig,
    clock: SharedClock,
    cleaner: Arc<dyn ResourceCleaner>,
    /// Running reaper, if any. Start and stop both happen under this lock.
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        clock: SharedClock,
        cleaner: Arc<dyn ResourceCleaner>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            clock,
            cleaner,
            reaper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Record activity, creating the session on first sight. Creating a
    /// session starts the reaper if none is running, including after
    /// `shutdown`.
    pub async fn update_activity(
        self: &Arc<Self>,
        session_id: &str,
        user_id: Option<&str>,
    ) -> SessionInfo {
        let now = self.clock.now();
        let (info, created) = {
            let mut sessions = self.sessions.lock().await;
            let created = !sessions.contains_key(session_id);
            let session = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Session {
                    id: session_id.to_string(),
                    user_id: None,
                    created_at: now,
                    last_activity: now,
                    command_count: 0,
                    resources: Vec::new(),
                });
            session.last_activity = now;
            session.command_count += 1;
            if session.user_id.is_none() {
                session.user_id = user_id.map(str::to_string);
            }
            (session.info(now, self.config.timeout), created)
        };

        if created {
            tracing::info!(session_id, user_id = ?info.user_id, "Session created");
            self.ensure_reaper().await;
        }
        info
    }

    async fn ensure_reaper(self: &Arc<Self>) {
        let mut slot = self.reaper.lock().await;
        if slot.is_some() {
            return;
        }
        *slot = Some(reaper::spawn_reaper(
            Arc::downgrade(self),
            self.config.sweep_interval,
        ));
    }

    pub async fn reaper_running(&self) -> bool {
        self.reaper.lock().await.is_some()
    }

    /// Track a resource under a session. `false` if the session is unknown.
    pub async fn add_resource(&self, session_id: &str, kind: &str, resource_id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        session.resources.push(TrackedResource {
            kind: kind.to_string(),
            id: resource_id.to_string(),
            created_at: now,
        });
        tracing::debug!(session_id, kind, resource_id, "Resource tracked");
        true
    }

    /// Stop tracking a resource. `false` if the session is unknown.
    pub async fn remove_resource(&self, session_id: &str, kind: &str, resource_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        session
            .resources
            .retain(|r| !(r.kind == kind && r.id == resource_id));
        true
    }

    pub async fn session_info(&self, session_id: &str) -> Result<SessionInfo, SessionError> {
        let now = self.clock.now();
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .map(|session| session.info(now, self.config.timeout))
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// All sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let now = self.clock.now();
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<SessionInfo> = sessions
            .values()
            .map(|session| session.info(now, self.config.timeout))
            .collect();
        infos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        infos
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Remove a session now and clean its resources.
    pub async fn force_cleanup(&self, session_id: &str) -> Result<CleanupSummary, SessionError> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        tracing::info!(session_id, "Session force-closed");
        Ok(self.cleanup_session(session).await)
    }

    /// Remove every session idle for at least the timeout, then clean them.
    pub async fn cleanup_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let (expired, remaining_sessions) = {
            let mut sessions = self.sessions.lock().await;
            let expired_ids: Vec<String> = sessions
                .values()
                .filter(|session| session.idle(now) >= self.config.timeout)
                .map(|session| session.id.clone())
                .collect();
            let expired: Vec<Session> = expired_ids
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect();
            (expired, sessions.len())
        };

        if !expired.is_empty() {
            tracing::info!(
                expired = expired.len(),
                remaining = remaining_sessions,
                "Reaping idle sessions"
            );
        }

        let summaries =
            futures_util::future::join_all(expired.into_iter().map(|s| self.cleanup_session(s)))
                .await;
        SweepReport {
            expired: summaries,
            remaining_sessions,
        }
    }

    /// Stop the reaper and force-clean every remaining session. The
    /// registry stays usable; the next new session restarts the reaper.
    pub async fn shutdown(&self) -> Vec<CleanupSummary> {
        if let Some(handle) = self.reaper.lock().await.take() {
            handle.abort();
            tracing::info!("Session reaper stopped");
        }
        let drained: Vec<Session> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        tracing::info!(sessions = drained.len(), "Session registry shutting down");

        futures_util::future::join_all(drained.into_iter().map(|s| self.cleanup_session(s))).await
    }

    /// Best-effort: a failing resource is logged and counted, never fatal.
    async fn cleanup_session(&self, session: Session) -> CleanupSummary {
        let mut cleaned = 0;
        let mut failed = 0;
        for resource in &session.resources {
            match self.cleaner.cleanup(&session.id, resource).await {
                Ok(()) => cleaned += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!(
                        session_id = %session.id,
                        kind = %resource.kind,
                        resource_id = %resource.id,
                        error = %err,
                        "Resource cleanup failed"
                    );
                }
            }
        }

        let summary = CleanupSummary {
            session_id: session.id.clone(),
            resources_total: session.resources.len(),
            resources_cleaned: cleaned,
            resources_failed: failed,
            duration_seconds: seconds_between(session.created_at, self.clock.now()),
            command_count: session.command_count,
        };
        tracing::info!(
            session_id = %summary.session_id,
            resources = summary.resources_total,
            failed = summary.resources_failed,
            duration_seconds = summary.duration_seconds,
            commands = summary.command_count,
            "Session cleaned up"
        );
        summary
    }
}
