//! Round orchestration and rule enforcement.
//!
//! [`GameSession`] drives one full round at a time: every stage for every
//! player, a single administrator review of the round's activity log, then
//! remediation prompts routed back to flagged players. The reasoning
//! engines behind the personas are external; this crate owns the
//! coordination between them.

use thiserror::Error;

pub mod binding;
pub mod executor;
pub mod prompts;
pub mod session;

pub use binding::{AdminBinding, PlayerBinding};
pub use executor::{ReviewHost, StageHost};
pub use session::GameSession;

use colosseum_agent::AgentError;
use colosseum_game::GameError;

/// Orchestration errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("game setup error: {0}")]
    Game(#[from] GameError),

    #[error("stats provider failed for {0}: {1}")]
    Stats(String, String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
