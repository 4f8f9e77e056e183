//! New scene task

use crate::error::TaskError;
use crate::manager::TaskManager;
use crate::task::BatchTask;
use crate::value::ChainValue;
use serde::{Deserialize, Serialize};

/// Replace the open document with an empty one
///
/// Has no fields; persists as an empty record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSceneTask {}

impl BatchTask for NewSceneTask {
    const KIND: &'static str = "NewSceneTask";
    const TITLE: &'static str = "New Scene";

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        manager.scene().new_scene()?;
        Ok(previous)
    }
}
