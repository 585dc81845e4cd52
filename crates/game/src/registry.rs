//! Operation registry: who may do what during which stage.

use std::collections::HashSet;

use colosseum_agent::WorkerDef;

use crate::operation::Operation;
use crate::stage::Stage;
use crate::{GameError, Result};

/// Pure data association from (stage id, operation name) to the registered
/// operation. Dispatch is a lookup at invocation time; handlers never close
/// over the player they act for.
#[derive(Debug)]
pub struct OperationRegistry {
    stages: Vec<Stage>,
}

impl OperationRegistry {
    /// Validates stage ids and per-stage operation names for uniqueness.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(GameError::NoStages);
        }

        let mut stage_ids = HashSet::new();
        for stage in &stages {
            if !stage_ids.insert(stage.id().to_string()) {
                return Err(GameError::DuplicateStage(stage.id().to_string()));
            }

            let mut op_names = HashSet::new();
            for op in stage.operations() {
                if !op_names.insert(op.name().to_string()) {
                    return Err(GameError::DuplicateOperation(
                        stage.id().to_string(),
                        op.name().to_string(),
                    ));
                }
            }
        }

        Ok(Self { stages })
    }

    /// Stages in declaration order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id() == id)
    }

    pub fn get(&self, stage_id: &str, operation: &str) -> Option<&Operation> {
        self.stage(stage_id)?.operation(operation)
    }

    pub fn has(&self, stage_id: &str, operation: &str) -> bool {
        self.get(stage_id, operation).is_some()
    }

    /// One worker per stage, described for the named player.
    pub fn worker_defs(&self, player_name: &str) -> Vec<WorkerDef> {
        self.stages
            .iter()
            .map(|stage| stage.worker_def(player_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Operation {
        Operation::new(name, format!("does {}", name), |_, _| async move {
            Ok("ok".to_string())
        })
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            OperationRegistry::new(Vec::new()),
            Err(GameError::NoStages)
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_stage_ids() {
        let result = OperationRegistry::new(vec![
            Stage::new("combat", "Combat", "fight"),
            Stage::new("combat", "Combat Again", "fight more"),
        ]);
        assert!(matches!(result, Err(GameError::DuplicateStage(id)) if id == "combat"));
    }

    #[test]
    fn test_new_rejects_duplicate_operation_names_within_a_stage() {
        let result = OperationRegistry::new(vec![Stage::new("combat", "Combat", "fight")
            .with_operation(noop("attack"))
            .with_operation(noop("attack"))]);
        assert!(matches!(
            result,
            Err(GameError::DuplicateOperation(stage, op)) if stage == "combat" && op == "attack"
        ));
    }

    #[test]
    fn test_same_operation_name_allowed_across_stages() {
        let registry = OperationRegistry::new(vec![
            Stage::new("morning", "Morning", "start the day").with_operation(noop("trade")),
            Stage::new("evening", "Evening", "wind down").with_operation(noop("trade")),
        ])
        .unwrap();

        assert!(registry.has("morning", "trade"));
        assert!(registry.has("evening", "trade"));
    }

    #[test]
    fn test_lookup() {
        let registry = OperationRegistry::new(vec![
            Stage::new("combat", "Combat", "fight").with_operation(noop("attack"))
        ])
        .unwrap();

        assert!(registry.get("combat", "attack").is_some());
        assert!(registry.get("combat", "defend").is_none());
        assert!(registry.get("trade", "attack").is_none());
        assert!(registry.stage("combat").is_some());
        assert!(registry.stage("trade").is_none());
    }

    #[test]
    fn test_worker_defs_preserve_stage_order() {
        let registry = OperationRegistry::new(vec![
            Stage::new("morning", "Morning", "start the day"),
            Stage::new("evening", "Evening", "wind down"),
        ])
        .unwrap();

        let workers = registry.worker_defs("Alice");
        assert_eq!(workers.len(), 2);
        assert_eq!(workers[0].id, "morning");
        assert_eq!(workers[1].id, "evening");
    }
}
