//! Open scene task

use crate::error::{ConfigError, TaskError};
use crate::manager::TaskManager;
use crate::paths;
use crate::task::BatchTask;
use crate::value::ChainValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Open a scene file
///
/// Picks the first usable source:
/// 1. the manager's current file, when `reopen_current_file` is set
/// 2. `file_path`, when it exists
/// 3. the previous task's path result, when it exists
///
/// Logs a warning when none applies. Returns its input unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSceneTask {
    /// Scene file to open
    pub file_path: PathBuf,
    /// Reopen the file being batched instead
    pub reopen_current_file: bool,
}

impl BatchTask for OpenSceneTask {
    const KIND: &'static str = "OpenSceneTask";
    const TITLE: &'static str = "Open Scene";

    fn normalize(mut self) -> Result<Self, ConfigError> {
        self.file_path = paths::normalize(&self.file_path);
        Ok(self)
    }

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        let scene = manager.scene();

        if self.reopen_current_file {
            let current = manager
                .current_file()
                .ok_or_else(|| TaskError::precondition("no file is being batched"))?;
            scene.open(&current.path)?;
            return Ok(previous);
        }

        let configured = Some(self.file_path.as_path()).filter(|p| !p.as_os_str().is_empty());
        let target = configured
            .filter(|p| scene.exists(p))
            .or_else(|| previous.as_path().filter(|p| scene.exists(p)));

        match target {
            Some(path) => scene.open(path)?,
            None => tracing::warn!(path = %self.file_path.display(), "cannot locate scene file"),
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskRegistry;
    use crate::scene::{SceneHandle, StandaloneScene};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (Arc<StandaloneScene>, Arc<TaskManager>, Arc<TaskRegistry>) {
        let registry = Arc::new(TaskRegistry::with_defaults());
        let scene = Arc::new(StandaloneScene::new(["ma"]));
        let manager = TaskManager::new(Arc::clone(&scene) as Arc<dyn SceneHandle>, &registry);
        (scene, manager, registry)
    }

    #[test]
    fn opens_configured_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("rig.ma");
        fs::write(&path, "").unwrap();
        let (scene, manager, _registry) = setup();

        let task = OpenSceneTask {
            file_path: path.clone(),
            reopen_current_file: false,
        };
        let out = task.execute(ChainValue::Unit, &manager).unwrap();
        assert_eq!(out, ChainValue::Unit);
        assert_eq!(scene.current_path(), Some(path));
    }

    #[test]
    fn falls_back_to_previous_path() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("shot.ma");
        fs::write(&path, "").unwrap();
        let (scene, manager, _registry) = setup();

        let task = OpenSceneTask {
            file_path: temp.path().join("missing.ma"),
            reopen_current_file: false,
        };
        task.execute(ChainValue::path(&path), &manager).unwrap();
        assert_eq!(scene.current_path(), Some(path));
    }

    #[test]
    fn nothing_to_open_is_not_an_error() {
        let (scene, manager, _registry) = setup();
        let out = OpenSceneTask::default()
            .execute(ChainValue::Unit, &manager)
            .unwrap();
        assert!(out.is_unit());
        assert!(scene.current_path().is_none());
    }

    #[test]
    fn reopen_without_current_file_fails() {
        let (_scene, manager, _registry) = setup();
        let task = OpenSceneTask {
            file_path: PathBuf::new(),
            reopen_current_file: true,
        };
        let err = task.execute(ChainValue::Unit, &manager).unwrap_err();
        assert!(matches!(err, TaskError::Precondition(_)));
    }

    #[test]
    fn file_path_is_normalized() {
        let task = OpenSceneTask {
            file_path: PathBuf::from("scenes/./a/../rig.ma"),
            reopen_current_file: false,
        }
        .normalize()
        .unwrap();
        assert_eq!(task.file_path, PathBuf::from("scenes/rig.ma"));
    }
}
