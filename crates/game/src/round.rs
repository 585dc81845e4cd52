//! Per-round activity record: executed operations and flagged violations.
//!
//! A fresh `RoundState` exists for exactly one round. The orchestrator
//! replaces it with a new empty value at every round boundary, so nothing
//! recorded here can leak into the next round.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One successfully executed operation this round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEvent {
    pub player: String,
    pub stage: String,
    pub operation: String,
    pub result: String,
    pub at: DateTime<Local>,
}

/// A rule breach flagged by the administrator, waiting to be routed back
/// to the offending player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub player: String,
    pub stage: String,
    pub message: String,
    pub at: DateTime<Local>,
}

/// Transient record of everything that happened this round.
#[derive(Debug, Default)]
pub struct RoundState {
    events: Vec<RoundEvent>,
    violations: Vec<Violation>,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for the (player, stage, operation) triple, if that
    /// operation already ran this round.
    pub fn cached_result(&self, player: &str, stage: &str, operation: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.player == player && e.stage == stage && e.operation == operation)
            .map(|e| e.result.as_str())
    }

    /// Append an event for the triple. A triple that already has an event
    /// is ignored: at most one event per (player, stage, operation).
    pub fn record(
        &mut self,
        player: impl Into<String>,
        stage: impl Into<String>,
        operation: impl Into<String>,
        result: impl Into<String>,
    ) {
        let (player, stage, operation) = (player.into(), stage.into(), operation.into());
        if self.cached_result(&player, &stage, &operation).is_some() {
            tracing::debug!(
                "ignoring duplicate event for {}/{}/{}",
                player,
                stage,
                operation
            );
            return;
        }
        self.events.push(RoundEvent {
            player,
            stage,
            operation,
            result: result.into(),
            at: Local::now(),
        });
    }

    /// Append a violation exactly as given; fields are not validated here.
    /// Resolution against the player set happens at routing time.
    pub fn flag(
        &mut self,
        player: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation {
            player: player.into(),
            stage: stage.into(),
            message: message.into(),
            at: Local::now(),
        });
    }

    pub fn events(&self) -> &[RoundEvent] {
        &self.events
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.violations.is_empty()
    }

    /// Serialized activity log submitted to the administrator for review.
    pub fn activity_log(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.events)
    }
}
