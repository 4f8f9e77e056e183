//! Rename node task

use crate::error::{ConfigError, TaskError};
use crate::manager::TaskManager;
use crate::task::BatchTask;
use crate::value::ChainValue;
use serde::{Deserialize, Serialize};

/// Rename the node called `search` to `replace` in the open document
///
/// A missing node is logged and skipped. Returns its input unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameNodeTask {
    /// Current node name
    pub search: String,
    /// New node name
    pub replace: String,
}

impl BatchTask for RenameNodeTask {
    const KIND: &'static str = "RenameNodeTask";
    const TITLE: &'static str = "Rename Node";

    fn normalize(mut self) -> Result<Self, ConfigError> {
        self.search = self.search.trim().to_string();
        self.replace = self.replace.trim().to_string();
        Ok(self)
    }

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        if self.search.is_empty() || self.search == self.replace {
            return Ok(previous);
        }

        if !manager.scene().rename_node(&self.search, &self.replace)? {
            tracing::warn!(node = %self.search, "cannot locate node to rename");
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;
    use crate::registry::TaskRegistry;
    use crate::scene::StandaloneScene;
    use std::sync::Arc;

    #[test]
    fn names_are_trimmed() {
        let task = RenameNodeTask {
            search: " root ".to_string(),
            replace: "hero_root\n".to_string(),
        }
        .normalize()
        .unwrap();
        assert_eq!(task.search, "root");
        assert_eq!(task.replace, "hero_root");
    }

    #[test]
    fn empty_search_is_a_no_op() {
        let registry = Arc::new(TaskRegistry::with_defaults());
        let manager = TaskManager::new(Arc::new(StandaloneScene::default()), &registry);
        let out = RenameNodeTask::default()
            .execute(ChainValue::Unit, &manager)
            .unwrap();
        assert!(out.is_unit());
    }

    #[test]
    fn unsupported_scene_fails_task() {
        let registry = Arc::new(TaskRegistry::with_defaults());
        let manager = TaskManager::new(Arc::new(StandaloneScene::default()), &registry);
        let task = RenameNodeTask {
            search: "a".to_string(),
            replace: "b".to_string(),
        };
        let err = task.execute(ChainValue::Unit, &manager).unwrap_err();
        assert!(matches!(err, TaskError::Scene(SceneError::Unsupported(_))));
    }
}
