//! Players and the game-wide setup options.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use colosseum_agent::StatsMap;

use crate::operation::BoxError;
use crate::stage::Stage;

type StatsFuture = Pin<Box<dyn Future<Output = std::result::Result<StatsMap, BoxError>> + Send>>;

/// Async callback producing a fresh stats snapshot. Queried every round;
/// this is the only thing about a player that changes between rounds.
pub type StatsProvider = Arc<dyn Fn() -> StatsFuture + Send + Sync>;

fn empty_stats() -> StatsProvider {
    Arc::new(|| Box::pin(async { Ok(StatsMap::new()) }))
}

/// A participant, constructed once at game setup. The name doubles as the
/// lookup key for violation routing.
#[derive(Clone)]
pub struct Player {
    name: String,
    personality: String,
    strategy: String,
    task: String,
    model: Option<String>,
    stats: StatsProvider,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            personality: String::new(),
            strategy: String::new(),
            task: String::new(),
            model: None,
            stats: empty_stats(),
        }
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stats<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<StatsMap, BoxError>> + Send + 'static,
    {
        self.stats = Arc::new(move || Box::pin(provider()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Persona description handed to the reasoning engine.
    pub fn persona(&self) -> String {
        format!(
            "Personality: `{}`\nStrategy: `{}`",
            self.personality, self.strategy
        )
    }

    pub async fn stats(&self) -> std::result::Result<StatsMap, BoxError> {
        (self.stats)().await
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("personality", &self.personality)
            .field("strategy", &self.strategy)
            .field("task", &self.task)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Everything needed to set up one game session.
#[derive(Clone)]
pub struct GameOptions {
    pub game_name: String,
    pub background: String,
    pub rules: String,
    pub admin_task: String,
    pub admin_model: Option<String>,
    pub verbose: bool,
    pub stages: Vec<Stage>,
    pub players: Vec<Player>,
    pub game_stats: StatsProvider,
}

impl GameOptions {
    pub fn new(game_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            background: String::new(),
            rules: String::new(),
            admin_task: String::new(),
            admin_model: None,
            verbose: false,
            stages: Vec::new(),
            players: Vec::new(),
            game_stats: empty_stats(),
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into();
        self
    }

    pub fn with_admin_task(mut self, admin_task: impl Into<String>) -> Self {
        self.admin_task = admin_task.into();
        self
    }

    pub fn with_admin_model(mut self, model: impl Into<String>) -> Self {
        self.admin_model = Some(model.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.players.push(player);
        self
    }

    pub fn with_game_stats<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<StatsMap, BoxError>> + Send + 'static,
    {
        self.game_stats = Arc::new(move || Box::pin(provider()));
        self
    }
}

impl fmt::Debug for GameOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameOptions")
            .field("game_name", &self.game_name)
            .field("background", &self.background)
            .field("rules", &self.rules)
            .field("admin_task", &self.admin_task)
            .field("admin_model", &self.admin_model)
            .field("verbose", &self.verbose)
            .field("stages", &self.stages)
            .field("players", &self.players)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colosseum_agent::Stat;

    #[tokio::test]
    async fn test_player_default_stats_are_empty() {
        let player = Player::new("Alice");
        let stats = player.stats().await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_player_stats_provider() {
        let player = Player::new("Alice").with_stats(|| async {
            let mut stats = StatsMap::new();
            stats.insert("hp".into(), Stat::new(100, "hit points"));
            Ok(stats)
        });

        let stats = player.stats().await.unwrap();
        assert_eq!(stats["hp"].value, serde_json::json!(100));
    }

    #[test]
    fn test_player_persona() {
        let player = Player::new("Alice")
            .with_personality("bold")
            .with_strategy("rush early");
        assert_eq!(player.persona(), "Personality: `bold`\nStrategy: `rush early`");
    }

    #[test]
    fn test_game_options_builder() {
        let options = GameOptions::new("Grand Melee")
            .with_background("a crumbling arena")
            .with_rules("no hitting below the belt")
            .with_admin_task("keep the bout clean")
            .with_admin_model("gpt-4")
            .verbose(true)
            .with_player(Player::new("Alice"))
            .with_player(Player::new("Bob"));

        assert_eq!(options.game_name, "Grand Melee");
        assert_eq!(options.players.len(), 2);
        assert!(options.verbose);
        assert_eq!(options.admin_model.as_deref(), Some("gpt-4"));
    }
}
