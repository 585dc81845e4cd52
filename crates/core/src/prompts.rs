//! Directive text handed to the reasoning engines.

use colosseum_agent::{ArgSpec, CapabilityDef, WorkerDef};

/// Worker id the administrator's review runs against.
pub const REVIEW_WORKER_ID: &str = "check_player_events";

/// Name of the one capability exposed to the administrator.
pub const FLAG_CAPABILITY: &str = "remind_offending_player";

const ADMINISTRATOR_GOAL: &str = "You are the Game Administrator AI, the central authority overseeing this multiplayer game. Act as referee, game manager, and rule enforcer while keeping the game fair, engaging, and clear.

Validate player actions against the game rules:
- Analyze every player operation and verify it complies with the established rules.
- Detect and flag invalid or unauthorized actions, explaining clearly why they are not permitted.
- Apply the rules impartially across all players and watch for exploits or unintended loopholes.
- When a player's action violates the rules, patiently explain the reason and ask the player to redo the action.

Manage game progression:
- Guide the game through its natural flow, managing turns and important events.

Reach a fair conclusion:
- Steer the game toward its proper resolution, identifying winners by the predefined victory conditions.";

pub fn admin_name(game_name: &str) -> String {
    format!("Game Administrator of `{}`", game_name)
}

pub fn admin_goal(admin_task: &str) -> String {
    format!("{}\nAdministrator Task: {}", ADMINISTRATOR_GOAL, admin_task)
}

pub fn admin_description(background: &str, rules: &str) -> String {
    format!("Game Background: {}\nGame Rules: {}", background, rules)
}

/// The single worker exposed to the administrator: review the activity log
/// and flag violations back through [`FLAG_CAPABILITY`].
pub fn review_worker() -> WorkerDef {
    WorkerDef::new(
        REVIEW_WORKER_ID,
        "Check Player Events",
        "Check the players' gameplay activity log against the game rules for any violations. \
         If a violation is detected, identify the offending player, specify the action that \
         caused the violation, explain the reason for the violation, and prompt the player to \
         redo the operation.",
    )
    .with_capability(
        CapabilityDef::new(
            FLAG_CAPABILITY,
            "Identify the violating player, specify the action that caused the violation, \
             explain the reason for the violation, and prompt the player to perform the \
             action again.",
        )
        .with_arg(ArgSpec::required("player", "name of the offending player"))
        .with_arg(ArgSpec::required(
            "stage",
            "the stage in which the player committed a violation",
        ))
        .with_arg(ArgSpec::required(
            "content",
            "As the referee, draft the message you want to deliver to the violating player.",
        )),
    )
}

/// Directive submitted to every player for every stage of a round.
pub fn turn_directive(roster: &str) -> String {
    format!(
        "Please complete your task. Any Operation can only be executed once.\nAll players in the current game: {}",
        roster
    )
}

/// Directive submitted to the administrator with the round's activity log.
pub fn review_directive(activity_log: &str) -> String {
    format!(
        "Please check if the player has any violations: {}",
        activity_log
    )
}
