//! Operations: the named, parameterized actions a player may take.

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use colosseum_agent::{ArgSpec, CapabilityDef};

use crate::player::Player;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type HandlerFuture = Pin<Box<dyn Future<Output = std::result::Result<String, BoxError>> + Send>>;

/// Performs an operation's real-world effect for one player and returns a
/// textual description of what happened.
pub type OperationHandler = Arc<dyn Fn(Player, Value) -> HandlerFuture + Send + Sync>;

/// A single action a player can perform, immutable once registered.
#[derive(Clone)]
pub struct Operation {
    name: String,
    description: String,
    args: Vec<ArgSpec>,
    tips: Option<String>,
    limitation: Option<String>,
    handler: OperationHandler,
}

impl Operation {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Player, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
            tips: None,
            limitation: None,
            handler: Arc::new(move |player, args| Box::pin(handler(player, args))),
        }
    }

    pub fn with_arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_tips(mut self, tips: impl Into<String>) -> Self {
        self.tips = Some(tips.into());
        self
    }

    pub fn with_limitation(mut self, limitation: impl Into<String>) -> Self {
        self.limitation = Some(limitation.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub async fn execute(
        &self,
        player: Player,
        args: Value,
    ) -> std::result::Result<String, BoxError> {
        (self.handler)(player, args).await
    }

    /// Capability definition as shown to `player_name`'s reasoning engine.
    pub fn capability_def(&self, player_name: &str) -> CapabilityDef {
        let mut description = format!(
            "Your name is {}, Operation Description: `{}`",
            player_name, self.description
        );
        if let Some(tips) = &self.tips {
            description.push_str(&format!("\nOperation Tips: `{}`", tips));
        }
        if let Some(limitation) = &self.limitation {
            description.push_str(&format!("\nOperation Limitation: `{}`", limitation));
        }

        CapabilityDef {
            name: self.name.clone(),
            description,
            args: self.args.clone(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("args", &self.args)
            .field("tips", &self.tips)
            .field("limitation", &self.limitation)
            .finish_non_exhaustive()
    }
}
