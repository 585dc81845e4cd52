//! Bindings: a game persona paired with the reasoning engine driving it.

use std::sync::Arc;

use colosseum_agent::{merge_stats, AgentFactory, AgentProfile, ReasoningAgent, StatsMap};
use colosseum_game::{GameOptions, OperationRegistry, Player, StatsProvider};

use crate::{prompts, Result, SessionError};

/// A player and its engine, plus the game-level stats provider needed to
/// compose the player's merged observable state.
pub struct PlayerBinding {
    player: Player,
    agent: Arc<dyn ReasoningAgent>,
    game_stats: StatsProvider,
}

impl PlayerBinding {
    pub fn new(
        player: Player,
        registry: &OperationRegistry,
        game_stats: StatsProvider,
        factory: &dyn AgentFactory,
    ) -> Self {
        let mut profile = AgentProfile::new(player.name(), player.task(), player.persona());
        if let Some(model) = player.model() {
            profile = profile.with_model(model);
        }
        for worker in registry.worker_defs(player.name()) {
            profile = profile.with_worker(worker);
        }

        let agent = factory.create(profile);
        Self {
            player,
            agent,
            game_stats,
        }
    }

    pub fn name(&self) -> &str {
        self.player.name()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn agent(&self) -> &Arc<dyn ReasoningAgent> {
        &self.agent
    }

    /// Merged snapshot of observable state: game-level stats overlaid with
    /// the player's own. Provider failures are not contained; they abort
    /// the caller's round.
    pub async fn agent_state(&self) -> Result<StatsMap> {
        let (game, own) = tokio::join!((self.game_stats)(), self.player.stats());
        let game =
            game.map_err(|e| SessionError::Stats(self.name().to_string(), e.to_string()))?;
        let own = own.map_err(|e| SessionError::Stats(self.name().to_string(), e.to_string()))?;
        Ok(merge_stats(game, own))
    }
}

/// The administrator and its engine.
pub struct AdminBinding {
    agent: Arc<dyn ReasoningAgent>,
}

impl AdminBinding {
    pub fn new(options: &GameOptions, factory: &dyn AgentFactory) -> Self {
        let mut profile = AgentProfile::new(
            prompts::admin_name(&options.game_name),
            prompts::admin_goal(&options.admin_task),
            prompts::admin_description(&options.background, &options.rules),
        )
        .with_worker(prompts::review_worker());
        if let Some(model) = &options.admin_model {
            profile = profile.with_model(model.clone());
        }

        Self {
            agent: factory.create(profile),
        }
    }

    pub fn agent(&self) -> &Arc<dyn ReasoningAgent> {
        &self.agent
    }
}
