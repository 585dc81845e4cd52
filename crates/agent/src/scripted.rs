//! Scripted reasoning engine for tests and offline demos.
//!
//! A [`ScriptedAgent`] replays pre-programmed capability calls instead of
//! reasoning: each `run_task` pops the next play queued for that worker and
//! invokes its calls through the host, in order. Every task it receives is
//! appended to a shared [`TaskLog`], so a test can assert exactly what was
//! submitted to which persona and in what order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{
    AgentError, AgentFactory, AgentProfile, CapabilityCall, CapabilityHost, ReasoningAgent,
    Result, TaskOptions,
};

/// One task submission observed by a scripted engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub agent: String,
    pub worker_id: String,
    pub prompt: String,
}

/// Shared, append-only record of every task submitted to any scripted
/// engine created by one factory. Vector order is submission order.
pub type TaskLog = Arc<Mutex<Vec<TaskRecord>>>;

// The queues are only locked for short, non-panicking sections; a poisoned
// lock still holds usable state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A play: the capability calls one task run should make, in order.
pub type Play = Vec<CapabilityCall>;

/// Deterministic [`ReasoningAgent`] driven by enqueued plays.
pub struct ScriptedAgent {
    profile: AgentProfile,
    plays: Mutex<HashMap<String, VecDeque<Play>>>,
    log: TaskLog,
    init_calls: AtomicUsize,
    fail_init: bool,
}

impl ScriptedAgent {
    pub fn new(profile: AgentProfile) -> Self {
        Self::with_log(profile, Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_log(profile: AgentProfile, log: TaskLog) -> Self {
        Self {
            profile,
            plays: Mutex::new(HashMap::new()),
            log,
            init_calls: AtomicUsize::new(0),
            fail_init: false,
        }
    }

    /// Make `init` reject, for exercising startup-failure paths.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Queue the calls the next task run against `worker_id` should make.
    pub fn enqueue(&self, worker_id: impl Into<String>, play: Play) {
        lock(&self.plays)
            .entry(worker_id.into())
            .or_default()
            .push_back(play);
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// How many times `init` has been called.
    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Tasks this engine has received, in order.
    pub fn tasks(&self) -> Vec<TaskRecord> {
        lock(&self.log)
            .iter()
            .filter(|r| r.agent == self.profile.name)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl ReasoningAgent for ScriptedAgent {
    async fn init(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(AgentError::Init(format!(
                "{} was scripted to fail init",
                self.profile.name
            )));
        }
        Ok(())
    }

    async fn run_task(
        &self,
        worker_id: &str,
        prompt: &str,
        opts: TaskOptions,
        host: &dyn CapabilityHost,
    ) -> Result<()> {
        if self.profile.worker(worker_id).is_none() {
            return Err(AgentError::UnknownWorker(worker_id.to_string()));
        }

        lock(&self.log).push(TaskRecord {
            agent: self.profile.name.clone(),
            worker_id: worker_id.to_string(),
            prompt: prompt.to_string(),
        });

        let play = lock(&self.plays)
            .get_mut(worker_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();

        for call in play {
            let name = call.name.clone();
            let outcome = host.invoke(call).await;
            if opts.verbose {
                info!(
                    "{} -> {}: {:?} {}",
                    self.profile.name, name, outcome.status, outcome.message
                );
            } else {
                debug!(
                    "{} -> {}: {:?} {}",
                    self.profile.name, name, outcome.status, outcome.message
                );
            }
        }

        Ok(())
    }
}

/// Creates [`ScriptedAgent`]s that all report into one [`TaskLog`], and
/// keeps a handle to each so tests can enqueue plays after the orchestrator
/// has built its bindings.
#[derive(Default)]
pub struct ScriptedFactory {
    log: TaskLog,
    agents: Mutex<HashMap<String, Arc<ScriptedAgent>>>,
    fail_init: Mutex<HashSet<String>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the shared submission log.
    pub fn log(&self) -> TaskLog {
        Arc::clone(&self.log)
    }

    /// The engine created for the named persona, if any.
    pub fn agent(&self, name: &str) -> Option<Arc<ScriptedAgent>> {
        lock(&self.agents).get(name).cloned()
    }

    /// Engines created for this persona name will fail their init.
    pub fn fail_init_for(&self, name: impl Into<String>) {
        lock(&self.fail_init).insert(name.into());
    }
}

impl AgentFactory for ScriptedFactory {
    fn create(&self, profile: AgentProfile) -> Arc<dyn ReasoningAgent> {
        let name = profile.name.clone();
        let mut agent = ScriptedAgent::with_log(profile, self.log());
        if lock(&self.fail_init).contains(&name) {
            agent = agent.failing_init();
        }
        let agent = Arc::new(agent);
        lock(&self.agents).insert(name, Arc::clone(&agent));
        agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapabilityOutcome, WorkerDef};
    use serde_json::json;

    struct EchoHost {
        seen: Mutex<Vec<CapabilityCall>>,
    }

    impl EchoHost {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CapabilityHost for EchoHost {
        async fn invoke(&self, call: CapabilityCall) -> CapabilityOutcome {
            let message = format!("ran {}", call.name);
            lock(&self.seen).push(call);
            CapabilityOutcome::done(message)
        }
    }

    fn duelist_profile() -> AgentProfile {
        AgentProfile::new("Alice", "Win the duel", "Personality: `bold`")
            .with_worker(WorkerDef::new("combat", "Combat", "Fight it out"))
    }

    #[tokio::test]
    async fn test_run_task_replays_enqueued_calls_in_order() {
        let agent = ScriptedAgent::new(duelist_profile());
        agent.enqueue(
            "combat",
            vec![
                CapabilityCall::new("attack", json!({"target": "Bob"})),
                CapabilityCall::new("defend", json!({})),
            ],
        );

        let host = EchoHost::new();
        agent
            .run_task("combat", "go", TaskOptions::default(), &host)
            .await
            .unwrap();

        let seen = lock(&host.seen);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].name, "attack");
        assert_eq!(seen[1].name, "defend");
    }

    #[tokio::test]
    async fn test_run_task_without_play_is_a_quiet_turn() {
        let agent = ScriptedAgent::new(duelist_profile());
        let host = EchoHost::new();
        agent
            .run_task("combat", "go", TaskOptions::default(), &host)
            .await
            .unwrap();
        assert!(lock(&host.seen).is_empty());
    }

    #[tokio::test]
    async fn test_run_task_unknown_worker_errors() {
        let agent = ScriptedAgent::new(duelist_profile());
        let host = EchoHost::new();
        let result = agent
            .run_task("diplomacy", "go", TaskOptions::default(), &host)
            .await;
        assert!(matches!(result, Err(AgentError::UnknownWorker(_))));
    }

    #[tokio::test]
    async fn test_task_log_records_prompts() {
        let agent = ScriptedAgent::new(duelist_profile());
        let host = EchoHost::new();
        agent
            .run_task("combat", "first", TaskOptions::default(), &host)
            .await
            .unwrap();
        agent
            .run_task("combat", "second", TaskOptions::default(), &host)
            .await
            .unwrap();

        let tasks = agent.tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].prompt, "first");
        assert_eq!(tasks[1].prompt, "second");
        assert_eq!(tasks[1].worker_id, "combat");
    }

    #[tokio::test]
    async fn test_init_counting_and_failure() {
        let agent = ScriptedAgent::new(duelist_profile());
        agent.init().await.unwrap();
        agent.init().await.unwrap();
        assert_eq!(agent.init_count(), 2);

        let failing = ScriptedAgent::new(duelist_profile()).failing_init();
        assert!(matches!(failing.init().await, Err(AgentError::Init(_))));
        assert_eq!(failing.init_count(), 1);
    }

    #[tokio::test]
    async fn test_factory_shares_log_and_hands_out_agents() {
        let factory = ScriptedFactory::new();
        let alice = factory.create(duelist_profile());
        let _ = factory.create(
            AgentProfile::new("Bob", "Survive", "Personality: `careful`")
                .with_worker(WorkerDef::new("combat", "Combat", "Fight it out")),
        );

        assert!(factory.agent("Alice").is_some());
        assert!(factory.agent("Bob").is_some());
        assert!(factory.agent("Mallory").is_none());

        let host = EchoHost::new();
        alice
            .run_task("combat", "go", TaskOptions::default(), &host)
            .await
            .unwrap();

        let log = factory.log();
        let log = lock(&log);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].agent, "Alice");
    }

    #[tokio::test]
    async fn test_factory_fail_init_for() {
        let factory = ScriptedFactory::new();
        factory.fail_init_for("Alice");
        let alice = factory.create(duelist_profile());
        assert!(alice.init().await.is_err());
    }
}
