//! Capability hosts: the layer between a reasoning engine's invocations
//! and the game's real effects.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use colosseum_agent::{CapabilityCall, CapabilityHost, CapabilityOutcome};
use colosseum_game::{OperationRegistry, Player, RoundState};

use crate::prompts::FLAG_CAPABILITY;

/// Host for one player's task in one stage. Wraps every operation handler
/// with idempotent replay and failure containment: an operation that
/// already ran this round returns its recorded result, and a handler error
/// becomes a generic failure outcome instead of aborting the round.
pub struct StageHost {
    player: Player,
    stage_id: String,
    registry: Arc<OperationRegistry>,
    round: Arc<Mutex<RoundState>>,
}

impl StageHost {
    pub fn new(
        player: Player,
        stage_id: impl Into<String>,
        registry: Arc<OperationRegistry>,
        round: Arc<Mutex<RoundState>>,
    ) -> Self {
        Self {
            player,
            stage_id: stage_id.into(),
            registry,
            round,
        }
    }
}

#[async_trait::async_trait]
impl CapabilityHost for StageHost {
    async fn invoke(&self, call: CapabilityCall) -> CapabilityOutcome {
        let player = self.player.name();

        let Some(operation) = self.registry.get(&self.stage_id, &call.name) else {
            warn!(
                "{} invoked unknown operation `{}` in stage `{}`",
                player, call.name, self.stage_id
            );
            return CapabilityOutcome::failed(format!(
                "Player {}'s {} operation failed.",
                player, call.name
            ));
        };

        let cached = self
            .round
            .lock()
            .await
            .cached_result(player, &self.stage_id, &call.name)
            .map(str::to_string);
        if let Some(result) = cached {
            debug!(
                "{} replayed {} in stage `{}` from this round's record",
                player, call.name, self.stage_id
            );
            return CapabilityOutcome::done(result);
        }

        match operation.execute(self.player.clone(), call.arguments.clone()).await {
            Ok(result) => {
                self.round
                    .lock()
                    .await
                    .record(player, self.stage_id.as_str(), call.name.as_str(), result.as_str());
                info!("Player {}'s {} operation result: `{}`", player, call.name, result);
                CapabilityOutcome::done(result)
            }
            Err(e) => {
                // No event is recorded, so a same-round retry re-executes.
                error!("Player {}'s {} operation error: {}", player, call.name, e);
                CapabilityOutcome::failed(format!(
                    "Player {}'s {} operation failed.",
                    player, call.name
                ))
            }
        }
    }
}

/// Host for the administrator's review task. The one capability appends a
/// violation exactly as given and always reports success; resolution
/// against the player set happens later, at routing time.
pub struct ReviewHost {
    round: Arc<Mutex<RoundState>>,
}

impl ReviewHost {
    pub fn new(round: Arc<Mutex<RoundState>>) -> Self {
        Self { round }
    }
}

#[async_trait::async_trait]
impl CapabilityHost for ReviewHost {
    async fn invoke(&self, call: CapabilityCall) -> CapabilityOutcome {
        if call.name != FLAG_CAPABILITY {
            warn!("administrator invoked unknown capability `{}`", call.name);
            return CapabilityOutcome::failed(format!("Unknown capability `{}`.", call.name));
        }

        let player = call.arg("player").unwrap_or_default();
        let stage = call.arg("stage").unwrap_or_default();
        let content = call.arg("content").unwrap_or_default();

        let note = format!("Game Admin check Player {}: \"{}\"", player, content);
        info!("{}", note);
        self.round.lock().await.flag(player, stage, content);

        CapabilityOutcome::done(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colosseum_game::{Operation, Stage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry(hits: Arc<AtomicUsize>) -> Arc<OperationRegistry> {
        let stage = Stage::new("combat", "Combat", "Fight it out").with_operation(
            Operation::new("attack", "Strike a target", move |player, args| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let target = args["target"].as_str().unwrap_or("no one").to_string();
                    Ok(format!("{} attacked {}", player.name(), target))
                }
            }),
        );
        Arc::new(OperationRegistry::new(vec![stage]).unwrap())
    }

    fn failing_registry() -> Arc<OperationRegistry> {
        let stage = Stage::new("combat", "Combat", "Fight it out").with_operation(
            Operation::new("attack", "Strike a target", |_, _| async move {
                Err::<String, colosseum_game::BoxError>("weapon jammed".into())
            }),
        );
        Arc::new(OperationRegistry::new(vec![stage]).unwrap())
    }

    fn host(registry: Arc<OperationRegistry>, round: Arc<Mutex<RoundState>>) -> StageHost {
        StageHost::new(Player::new("Alice"), "combat", registry, round)
    }

    #[tokio::test]
    async fn test_invoke_executes_and_records() {
        let hits = Arc::new(AtomicUsize::new(0));
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = host(counting_registry(Arc::clone(&hits)), Arc::clone(&round));

        let outcome = host
            .invoke(CapabilityCall::new("attack", json!({"target": "Bob"})))
            .await;

        assert!(outcome.is_done());
        assert_eq!(outcome.message, "Alice attacked Bob");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let round = round.lock().await;
        assert_eq!(round.events().len(), 1);
        assert_eq!(round.events()[0].operation, "attack");
    }

    #[tokio::test]
    async fn test_second_invoke_replays_without_running_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = host(counting_registry(Arc::clone(&hits)), Arc::clone(&round));

        let first = host
            .invoke(CapabilityCall::new("attack", json!({"target": "Bob"})))
            .await;
        let second = host
            .invoke(CapabilityCall::new("attack", json!({"target": "Carol"})))
            .await;

        assert!(second.is_done());
        assert_eq!(second.message, first.message);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(round.lock().await.events().len(), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_contained_and_leaves_no_event() {
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = host(failing_registry(), Arc::clone(&round));

        let outcome = host
            .invoke(CapabilityCall::new("attack", json!({"target": "Bob"})))
            .await;

        assert!(!outcome.is_done());
        assert_eq!(outcome.message, "Player Alice's attack operation failed.");
        assert!(round.lock().await.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_fails_without_aborting() {
        let hits = Arc::new(AtomicUsize::new(0));
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = host(counting_registry(hits), Arc::clone(&round));

        let outcome = host.invoke(CapabilityCall::new("teleport", json!({}))).await;

        assert!(!outcome.is_done());
        assert_eq!(outcome.message, "Player Alice's teleport operation failed.");
        assert!(round.lock().await.events().is_empty());
    }

    #[tokio::test]
    async fn test_review_host_flags_as_given() {
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = ReviewHost::new(Arc::clone(&round));

        let outcome = host
            .invoke(CapabilityCall::new(
                FLAG_CAPABILITY,
                json!({"player": "Bob", "stage": "combat", "content": "redo your attack"}),
            ))
            .await;

        assert!(outcome.is_done());
        assert_eq!(outcome.message, "Game Admin check Player Bob: \"redo your attack\"");

        let round = round.lock().await;
        assert_eq!(round.violations().len(), 1);
        assert_eq!(round.violations()[0].player, "Bob");
        assert_eq!(round.violations()[0].stage, "combat");
        assert_eq!(round.violations()[0].message, "redo your attack");
    }

    #[tokio::test]
    async fn test_review_host_records_malformed_flags() {
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = ReviewHost::new(Arc::clone(&round));

        let outcome = host
            .invoke(CapabilityCall::new(FLAG_CAPABILITY, json!({"content": "who was that"})))
            .await;

        assert!(outcome.is_done());
        let round = round.lock().await;
        assert_eq!(round.violations().len(), 1);
        assert_eq!(round.violations()[0].player, "");
        assert_eq!(round.violations()[0].stage, "");
    }

    #[tokio::test]
    async fn test_review_host_rejects_unknown_capability() {
        let round = Arc::new(Mutex::new(RoundState::new()));
        let host = ReviewHost::new(Arc::clone(&round));

        let outcome = host.invoke(CapabilityCall::new("ban_player", json!({}))).await;

        assert!(!outcome.is_done());
        assert!(round.lock().await.violations().is_empty());
    }
}
