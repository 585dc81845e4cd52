//! The round orchestrator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use colosseum_agent::{AgentFactory, TaskOptions};
use colosseum_game::{
    GameError, GameOptions, OperationRegistry, RoundEvent, RoundState, Stage, Violation,
};

use crate::binding::{AdminBinding, PlayerBinding};
use crate::executor::{ReviewHost, StageHost};
use crate::{prompts, Result, SessionError};

/// Drives one game: stage by stage, round by round.
///
/// `step` advances exactly one round: every stage for every player,
/// administrator review of the activity log, remediation of flagged
/// violations. It is re-entrant; the round record is replaced with a fresh
/// empty value at every round boundary, error or not.
pub struct GameSession {
    registry: Arc<OperationRegistry>,
    players: Vec<PlayerBinding>,
    admin: AdminBinding,
    round: Arc<Mutex<RoundState>>,
    ready: OnceCell<()>,
    verbose: bool,
    rounds_played: AtomicU64,
}

impl GameSession {
    pub fn new(options: GameOptions, factory: &dyn AgentFactory) -> Result<Self> {
        if options.players.is_empty() {
            return Err(GameError::NoPlayers.into());
        }
        let mut names = HashSet::new();
        for player in &options.players {
            if !names.insert(player.name().to_string()) {
                return Err(GameError::DuplicatePlayer(player.name().to_string()).into());
            }
        }

        let admin = AdminBinding::new(&options, factory);
        let verbose = options.verbose;
        let registry = Arc::new(OperationRegistry::new(options.stages)?);
        let players = options
            .players
            .into_iter()
            .map(|player| {
                PlayerBinding::new(player, &registry, options.game_stats.clone(), factory)
            })
            .collect();

        Ok(Self {
            registry,
            players,
            admin,
            round: Arc::new(Mutex::new(RoundState::new())),
            ready: OnceCell::new(),
            verbose,
            rounds_played: AtomicU64::new(0),
        })
    }

    /// Block until every binding has finished its one-time initialization.
    /// Satisfied at most once per session; later rounds pass straight
    /// through. An init failure is fatal: the latch is never satisfied.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                debug!(
                    "initializing administrator and {} player agents",
                    self.players.len()
                );
                let mut inits = vec![self.admin.agent().init()];
                for binding in &self.players {
                    inits.push(binding.agent().init());
                }
                try_join_all(inits).await?;
                Ok::<(), SessionError>(())
            })
            .await?;
        Ok(())
    }

    /// Advance the game by one full round.
    pub async fn step(&self) -> Result<()> {
        self.ensure_ready().await?;

        let round = self.rounds_played.fetch_add(1, Ordering::SeqCst) + 1;
        info!("round {} begins", round);

        let outcome = self.run_round().await;

        // The record never survives a round boundary, aborted or not.
        *self.round.lock().await = RoundState::new();

        match &outcome {
            Ok(()) => info!("round {} complete", round),
            Err(e) => warn!("round {} aborted: {}", round, e),
        }
        outcome
    }

    async fn run_round(&self) -> Result<()> {
        let roster = self.roster_summary().await?;
        let directive = prompts::turn_directive(&roster);

        for stage in self.registry.stages() {
            debug!("stage `{}` begins", stage.id());
            let tasks = self
                .players
                .iter()
                .map(|binding| self.run_player_stage(binding, stage, &directive));
            for result in join_all(tasks).await {
                result?;
            }
        }

        self.review().await?;
        self.remediate().await
    }

    async fn run_player_stage(
        &self,
        binding: &PlayerBinding,
        stage: &Stage,
        directive: &str,
    ) -> Result<()> {
        let host = StageHost::new(
            binding.player().clone(),
            stage.id(),
            Arc::clone(&self.registry),
            Arc::clone(&self.round),
        );
        binding
            .agent()
            .run_task(stage.id(), directive, self.task_options(), &host)
            .await?;
        Ok(())
    }

    /// `"name, stats: {json}"` per player, compiled concurrently and
    /// joined with `;`.
    async fn roster_summary(&self) -> Result<String> {
        let summaries = try_join_all(self.players.iter().map(|binding| async move {
            let stats = binding.agent_state().await?;
            Ok::<_, SessionError>(format!(
                "{}, stats: {}",
                binding.name(),
                serde_json::to_string(&stats)?
            ))
        }))
        .await?;
        Ok(summaries.join(";"))
    }

    async fn review(&self) -> Result<()> {
        let log = self.round.lock().await.activity_log()?;
        let host = ReviewHost::new(Arc::clone(&self.round));
        self.admin
            .agent()
            .run_task(
                prompts::REVIEW_WORKER_ID,
                &prompts::review_directive(&log),
                self.task_options(),
                &host,
            )
            .await?;
        Ok(())
    }

    /// Route every flagged violation back to the offending player as a new
    /// task on the violated stage. Best-effort: an unknown player or stage
    /// drops the violation silently. Distinct violations run concurrently.
    async fn remediate(&self) -> Result<()> {
        let violations = self.round.lock().await.violations().to_vec();

        let mut tasks = Vec::new();
        for violation in violations {
            let Some(binding) = self.players.iter().find(|b| b.name() == violation.player)
            else {
                debug!("dropping violation for unknown player `{}`", violation.player);
                continue;
            };
            if self.registry.stage(&violation.stage).is_none() {
                debug!(
                    "dropping violation for `{}`: unknown stage `{}`",
                    violation.player, violation.stage
                );
                continue;
            }
            tasks.push(self.remediate_one(binding, violation));
        }

        for result in join_all(tasks).await {
            result?;
        }
        Ok(())
    }

    async fn remediate_one(&self, binding: &PlayerBinding, violation: Violation) -> Result<()> {
        info!(
            "routing violation in stage `{}` back to {}",
            violation.stage, violation.player
        );
        let host = StageHost::new(
            binding.player().clone(),
            violation.stage.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.round),
        );
        binding
            .agent()
            .run_task(&violation.stage, &violation.message, self.task_options(), &host)
            .await?;
        Ok(())
    }

    fn task_options(&self) -> TaskOptions {
        TaskOptions {
            verbose: self.verbose,
        }
    }

    /// Events recorded so far in the current round.
    pub async fn current_events(&self) -> Vec<RoundEvent> {
        self.round.lock().await.events().to_vec()
    }

    /// Violations flagged so far in the current round.
    pub async fn current_violations(&self) -> Vec<Violation> {
        self.round.lock().await.violations().to_vec()
    }

    /// Rounds started so far, including an aborted one.
    pub fn rounds_played(&self) -> u64 {
        self.rounds_played.load(Ordering::SeqCst)
    }
}
