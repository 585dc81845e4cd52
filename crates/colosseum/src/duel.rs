//! An exhibition duel wired end-to-end through the orchestrator.
//!
//! Two combatants, two stages per round, and an administrator watching for
//! attacks against anyone who is not standing in the arena. The scripted
//! variant drives pre-programmed plays (round two includes an illegal
//! attack so the review-and-remediate loop is visible); the live variant
//! hands the same game to a chat-completions backend.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::Mutex;

use colosseum_agent::{ArgSpec, CapabilityCall, OpenRouterFactory, ScriptedFactory, Stat, StatsMap};
use colosseum_core::{prompts, GameSession};
use colosseum_game::{GameOptions, Operation, Player, Stage};

const GAME_NAME: &str = "Grand Melee";
const ATTACK_DAMAGE: i64 = 7;
const BRACE_RECOVERY: i64 = 3;

/// Shared arena state mutated by operation handlers.
struct DuelWorld {
    hp: HashMap<String, i64>,
}

impl DuelWorld {
    fn new() -> Self {
        let mut hp = HashMap::new();
        hp.insert("Alice".to_string(), 40);
        hp.insert("Bob".to_string(), 40);
        Self { hp }
    }

    fn hp_of(&self, name: &str) -> i64 {
        self.hp.get(name).copied().unwrap_or(0)
    }
}

type World = Arc<Mutex<DuelWorld>>;

fn attack_operation(world: World) -> Operation {
    Operation::new(
        "attack",
        "Strike one opposing combatant for 7 damage",
        move |player, args| {
            let world = Arc::clone(&world);
            async move {
                let target = args["target"]
                    .as_str()
                    .ok_or("attack needs a target")?
                    .to_string();
                let mut world = world.lock().await;
                let remaining = match world.hp.get_mut(&target) {
                    Some(hp) => {
                        *hp -= ATTACK_DAMAGE;
                        *hp
                    }
                    None => return Err(format!("no such combatant: {}", target).into()),
                };
                Ok(format!(
                    "{} strikes {} for {} ({} is at {} hp)",
                    player.name(),
                    target,
                    ATTACK_DAMAGE,
                    target,
                    remaining
                ))
            }
        },
    )
    .with_arg(ArgSpec::required("target", "name of the combatant to strike"))
    .with_limitation("you cannot strike anyone outside the arena")
}

fn brace_operation(world: World) -> Operation {
    Operation::new(
        "brace",
        "Brace behind your shield and recover 3 hp",
        move |player, _| {
            let world = Arc::clone(&world);
            async move {
                let mut world = world.lock().await;
                let hp = world.hp.entry(player.name().to_string()).or_insert(0);
                *hp += BRACE_RECOVERY;
                let hp = *hp;
                Ok(format!("{} braces behind the shield (now at {} hp)", player.name(), hp))
            }
        },
    )
}

fn taunt_operation() -> Operation {
    Operation::new("taunt", "Play to the crowd", |player, _| async move {
        Ok(format!("{} taunts the crowd and draws a roar", player.name()))
    })
    .with_tips("a good taunt rattles a careful opponent")
}

async fn stats_snapshot(
    world: World,
    name: &'static str,
) -> std::result::Result<StatsMap, colosseum_game::BoxError> {
    let world = world.lock().await;
    let mut stats = StatsMap::new();
    stats.insert("hp".to_string(), Stat::new(world.hp_of(name), "hit points"));
    Ok(stats)
}

fn duel_options(world: &World, verbose: bool) -> GameOptions {
    GameOptions::new(GAME_NAME)
        .with_background("Two duelists face off in a crumbling arena for a purse of gold.")
        .with_rules(
            "Each combatant may attack once per round, and only combatants standing in the \
             arena may be struck.",
        )
        .with_admin_task("Flag any attack aimed at someone who is not a standing combatant.")
        .verbose(verbose)
        .with_game_stats(|| async {
            let mut stats = StatsMap::new();
            stats.insert(
                "purse".to_string(),
                Stat::new(100, "gold awaiting the victor"),
            );
            Ok(stats)
        })
        .with_stage(
            Stage::new("maneuver", "Maneuver", "Position yourself before blows are exchanged")
                .with_operation(taunt_operation())
                .with_operation(brace_operation(Arc::clone(world))),
        )
        .with_stage(
            Stage::new("combat", "Combat", "Exchange blows with your opponent")
                .with_operation(attack_operation(Arc::clone(world))),
        )
        .with_player(
            Player::new("Alice")
                .with_personality("bold and theatrical")
                .with_strategy("press the attack every round")
                .with_task("Defeat Bob and claim the purse")
                .with_stats({
                    let world = Arc::clone(world);
                    move || stats_snapshot(Arc::clone(&world), "Alice")
                }),
        )
        .with_player(
            Player::new("Bob")
                .with_personality("careful and patient")
                .with_strategy("recover early, strike late")
                .with_task("Outlast Alice and claim the purse")
                .with_stats({
                    let world = Arc::clone(world);
                    move || stats_snapshot(Arc::clone(&world), "Bob")
                }),
        )
}

fn call(name: &str, arguments: serde_json::Value) -> CapabilityCall {
    CapabilityCall::new(name, arguments)
}

fn enqueue_round(factory: &ScriptedFactory, round: u32) -> Result<()> {
    let alice = factory
        .agent("Alice")
        .context("Alice's engine was never created")?;
    let bob = factory
        .agent("Bob")
        .context("Bob's engine was never created")?;
    let admin = factory
        .agent(&prompts::admin_name(GAME_NAME))
        .context("administrator engine was never created")?;

    alice.enqueue("maneuver", vec![call("taunt", json!({}))]);
    alice.enqueue("combat", vec![call("attack", json!({"target": "Bob"}))]);
    bob.enqueue("maneuver", vec![call("brace", json!({}))]);

    if round == 2 {
        // Bob swings at someone outside the arena: the handler fails, the
        // administrator flags it, and the remediation retry lands properly.
        bob.enqueue("combat", vec![call("attack", json!({"target": "the Announcer"}))]);
        admin.enqueue(
            prompts::REVIEW_WORKER_ID,
            vec![call(
                prompts::FLAG_CAPABILITY,
                json!({
                    "player": "Bob",
                    "stage": "combat",
                    "content": "The Announcer is not a combatant. Redo your attack against a standing opponent.",
                }),
            )],
        );
        bob.enqueue("combat", vec![call("attack", json!({"target": "Alice"}))]);
    } else {
        bob.enqueue("combat", vec![call("attack", json!({"target": "Alice"}))]);
    }

    Ok(())
}

async fn play(session: &GameSession, world: &World, rounds: u32) -> Result<()> {
    for round in 1..=rounds {
        session
            .step()
            .await
            .with_context(|| format!("round {} failed", round))?;

        let world = world.lock().await;
        println!(
            "after round {}: Alice {} hp, Bob {} hp",
            round,
            world.hp_of("Alice"),
            world.hp_of("Bob")
        );
    }
    Ok(())
}

/// Exhibition duel against pre-programmed plays.
pub async fn run_scripted(rounds: u32, verbose: bool) -> Result<()> {
    let world: World = Arc::new(Mutex::new(DuelWorld::new()));
    let factory = ScriptedFactory::new();
    let session = GameSession::new(duel_options(&world, verbose), &factory)?;

    for round in 1..=rounds {
        enqueue_round(&factory, round)?;
        session
            .step()
            .await
            .with_context(|| format!("round {} failed", round))?;

        let snapshot = world.lock().await;
        println!(
            "after round {}: Alice {} hp, Bob {} hp",
            round,
            snapshot.hp_of("Alice"),
            snapshot.hp_of("Bob")
        );
    }
    Ok(())
}

/// The same duel, decided by a live chat-completions backend.
pub async fn run_live(rounds: u32, model: Option<String>, verbose: bool) -> Result<()> {
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("set OPENROUTER_API_KEY or OPENAI_API_KEY")?;

    let mut factory = OpenRouterFactory::new(api_key);
    if let Some(model) = model {
        factory = factory.with_default_model(model);
    }

    let world: World = Arc::new(Mutex::new(DuelWorld::new()));
    let session = GameSession::new(duel_options(&world, verbose), &factory)?;

    play(&session, &world, rounds).await
}
