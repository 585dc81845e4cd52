//! Reasoning-engine boundary for game personas.
//!
//! Every player and the administrator is driven by an external reasoning
//! engine. This crate owns that boundary: the [`ReasoningAgent`] trait the
//! orchestrator consumes, the schema types describing the capabilities a
//! persona may invoke, and the value types that flow back when the engine
//! elects to invoke one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod openrouter;
pub mod scripted;

pub use openrouter::{OpenRouterAgent, OpenRouterFactory};
pub use scripted::{ScriptedAgent, ScriptedFactory, TaskLog, TaskRecord};

/// Boundary errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent init failed: {0}")]
    Init(String),

    #[error("task failed: {0}")]
    Task(String),

    #[error("unknown worker: {0}")]
    UnknownWorker(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed engine response: {0}")]
    InvalidResponse(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no api key configured")]
    NoApiKey,

    #[error("max reasoning iterations exceeded")]
    MaxIterations,
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// One observable stat (hp, funds, ...) with a description the engine can read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub value: Value,
    pub description: String,
}

impl Stat {
    pub fn new(value: impl Into<Value>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

/// Snapshot of a persona's observable state, keyed by stat name.
pub type StatsMap = HashMap<String, Stat>;

/// Merge two stats snapshots; entries in `overlay` win on key collision.
pub fn merge_stats(base: StatsMap, overlay: StatsMap) -> StatsMap {
    let mut merged = base;
    merged.extend(overlay);
    merged
}

/// Declaration of one argument a capability accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub arg_type: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arg_type: None,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            optional: true,
            ..Self::required(name, description)
        }
    }

    pub fn with_type(mut self, arg_type: impl Into<String>) -> Self {
        self.arg_type = Some(arg_type.into());
        self
    }
}

/// A named, typed, described action exposed to a reasoning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDef {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
}

impl CapabilityDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// JSON schema for the argument object, for engines that speak
    /// OpenAI-style function calling.
    pub fn parameters(&self) -> Value {
        let mut props = serde_json::Map::new();
        let mut required = Vec::new();

        for arg in &self.args {
            props.insert(
                arg.name.clone(),
                serde_json::json!({
                    "type": arg.arg_type.as_deref().unwrap_or("string"),
                    "description": arg.description,
                }),
            );
            if !arg.optional {
                required.push(arg.name.clone());
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required,
        })
    }
}

/// A group of capabilities available to a persona during one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDef {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDef>,
}

impl WorkerDef {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: CapabilityDef) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityDef> {
        self.capabilities.iter().find(|c| c.name == name)
    }
}

/// Everything a reasoning engine needs to embody one persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub goal: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub workers: Vec<WorkerDef>,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        goal: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            description: description.into(),
            model: None,
            workers: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_worker(mut self, worker: WorkerDef) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn worker(&self, id: &str) -> Option<&WorkerDef> {
        self.workers.iter().find(|w| w.id == id)
    }
}

/// One capability invocation elected by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityCall {
    pub name: String,
    pub arguments: Value,
}

impl CapabilityCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// String view of one argument, regardless of how the engine encoded it.
    pub fn arg(&self, name: &str) -> Option<String> {
        match self.arguments.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Terminal status of a capability invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    Done,
    Failed,
}

/// What the host reports back to the engine for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityOutcome {
    pub status: CapabilityStatus,
    pub message: String,
}

impl CapabilityOutcome {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            status: CapabilityStatus::Done,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CapabilityStatus::Failed,
            message: message.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == CapabilityStatus::Done
    }
}

/// Task submission options
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOptions {
    pub verbose: bool,
}

/// Receives the capability invocations an engine elects to make while
/// running one task. Implemented by the orchestrator; never errors — a
/// failed invocation is reported through the outcome status.
#[async_trait]
pub trait CapabilityHost: Send + Sync {
    async fn invoke(&self, call: CapabilityCall) -> CapabilityOutcome;
}

/// External reasoning engine driving one persona.
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    /// One-time warm-up; the orchestrator blocks on this before the first
    /// round and never calls it again.
    async fn init(&self) -> Result<()>;

    /// Run one natural-language directive against the named worker's
    /// capability set. Resolves once the engine has finished reasoning and
    /// invoking zero or more capabilities through `host`.
    async fn run_task(
        &self,
        worker_id: &str,
        prompt: &str,
        opts: TaskOptions,
        host: &dyn CapabilityHost,
    ) -> Result<()>;
}

/// Builds a [`ReasoningAgent`] for a persona. The orchestrator composes
/// profiles; the embedding application decides which engine backs them.
pub trait AgentFactory: Send + Sync {
    fn create(&self, profile: AgentProfile) -> Arc<dyn ReasoningAgent>;
}
