//! Periodic sweep of idle sessions.

use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::registry::SessionRegistry;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Background task: sweep idle sessions every `period`. Holds only a weak
/// reference and exits once the registry is dropped.
pub(crate) fn spawn_reaper(registry: Weak<SessionRegistry>, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_SWEEP_INTERVAL);
    tracing::info!(period_ms = period.as_millis() as u64, "Session reaper started");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick is immediate; skip it
        loop {
            interval.tick().await;
            let Some(registry) = registry.upgrade() else {
                tracing::debug!("Session registry dropped; reaper exiting");
                break;
            };
            let report = registry.cleanup_expired().await;
            if !report.expired.is_empty() {
                tracing::info!(
                    expired = report.expired.len(),
                    remaining = report.remaining_sessions,
                    "Reaper sweep finished"
                );
            }
        }
    })
}
