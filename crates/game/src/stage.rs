//! Stages: the named phases of a round.

use colosseum_agent::WorkerDef;

use crate::operation::Operation;

/// A phase of a turn, grouping the operations available during it.
/// Immutable after construction; declaration order is execution order.
#[derive(Debug, Clone)]
pub struct Stage {
    id: String,
    name: String,
    description: String,
    operations: Vec<Operation>,
}

impl Stage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name() == name)
    }

    /// The worker exposed to one player's reasoning engine for this stage.
    pub fn worker_def(&self, player_name: &str) -> WorkerDef {
        WorkerDef {
            id: self.id.clone(),
            name: self.name.clone(),
            description: format!(
                "Use the operation to complete the following requirements: {}",
                self.description
            ),
            capabilities: self
                .operations
                .iter()
                .map(|op| op.capability_def(player_name))
                .collect(),
        }
    }
}
