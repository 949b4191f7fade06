//! Engine configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::search::providers::parse_provider_token;
use crate::search::{ExecutorConfig, SearchProvider};
use crate::session::SessionConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Directory saved reports are written to
    pub reports_dir: PathBuf,
    /// Idle time and sweep cadence for sessions
    pub sessions: SessionConfig,
    /// Only temp files below this directory are deleted on session cleanup
    pub session_temp_dir: PathBuf,
    /// Search fan-out limits
    pub search: ExecutorConfig,
    /// Backend fallback order
    pub backends: Vec<SearchProvider>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            reports_dir: PathBuf::from("jarvis_reports"),
            sessions: SessionConfig::default(),
            session_temp_dir: default_session_temp_dir(),
            search: ExecutorConfig::default(),
            backends: vec![
                SearchProvider::Tavily,
                SearchProvider::Brave,
                SearchProvider::Exa,
            ],
            cors_origins: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ExecutorConfig::default();
        let search = ExecutorConfig {
            task_timeout: Duration::from_millis(env_parse(
                &lookup,
                "SEARCH_TASK_TIMEOUT_MS",
                defaults.task_timeout.as_millis() as u64,
            )?),
            execution_budget: Duration::from_millis(env_parse(
                &lookup,
                "SEARCH_EXECUTION_BUDGET_MS",
                defaults.execution_budget.as_millis() as u64,
            )?),
            results_per_task: env_parse(
                &lookup,
                "SEARCH_RESULTS_PER_TASK",
                defaults.results_per_task,
            )?
            .max(1),
            max_tasks: env_parse(&lookup, "SEARCH_MAX_TASKS", defaults.max_tasks)?.max(1),
        };

        let backends = env_csv(&lookup, "SEARCH_BACKENDS", &["tavily", "brave", "exa"])
            .iter()
            .map(|token| {
                parse_provider_token(token).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Invalid SEARCH_BACKENDS entry '{token}'. Expected tavily, brave or exa"
                    )
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            port: env_parse(&lookup, "ENGINE_PORT", 8080)?,
            reports_dir: PathBuf::from(env_str(&lookup, "REPORTS_DIR", "jarvis_reports")),
            sessions: SessionConfig {
                timeout: Duration::from_secs(env_parse(&lookup, "SESSION_TIMEOUT_SECS", 300)?),
                sweep_interval: Duration::from_secs(env_parse(
                    &lookup,
                    "SESSION_SWEEP_INTERVAL_SECS",
                    30,
                )?),
            },
            session_temp_dir: lookup("SESSION_TEMP_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_session_temp_dir),
            search,
            backends,
            cors_origins: env_csv(&lookup, "CORS_ALLOWED_ORIGINS", &[]),
        })
    }
}

fn default_session_temp_dir() -> PathBuf {
    std::env::temp_dir().join("jarvis_sessions")
}

fn env_str<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}

fn env_csv<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &[&str]) -> Vec<String> {
    match lookup(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        None => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
