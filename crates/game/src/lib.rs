//! Domain model for a turn-based multi-agent game.
//!
//! Operations, stages, players, and the per-round activity record. This
//! crate is pure data plus lookup: who may do what during which stage, and
//! what has already happened this round. Driving the reasoning engines and
//! enforcing the rules lives in `colosseum-core`.

use thiserror::Error;

pub mod operation;
pub mod player;
pub mod registry;
pub mod round;
pub mod stage;

pub use operation::{BoxError, Operation, OperationHandler};
pub use player::{GameOptions, Player, StatsProvider};
pub use registry::OperationRegistry;
pub use round::{RoundEvent, RoundState, Violation};
pub use stage::Stage;

/// Game setup errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("game needs at least one stage")]
    NoStages,

    #[error("game needs at least one player")]
    NoPlayers,

    #[error("duplicate stage id `{0}`")]
    DuplicateStage(String),

    #[error("duplicate operation `{1}` in stage `{0}`")]
    DuplicateOperation(String, String),

    #[error("duplicate player `{0}`")]
    DuplicatePlayer(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
