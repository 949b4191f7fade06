//! Jarvis research engine
//!
//! Interactive research workflows (proposal, execution, report, save)
//! driven by a ractor actor, plus a session registry whose reaper releases
//! the resources of idle sessions.

pub mod actors;
pub mod api;
pub mod app_state;
pub mod clock;
pub mod config;
pub mod markdown;
pub mod report;
pub mod runtime_env;
pub mod search;
pub mod session;
