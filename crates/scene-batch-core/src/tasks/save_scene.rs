//! Save scene task

use crate::error::{ConfigError, TaskError};
use crate::manager::TaskManager;
use crate::paths;
use crate::task::BatchTask;
use crate::value::ChainValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Save the open document under a derived name
///
/// The target name is the open document's file name (or the batched file's
/// name for an untitled document) with `search` replaced by `replace`. It is
/// saved into `directory`, or next to the document when that is empty.
///
/// With `checkout` set, an existing target is checked out before saving and
/// a new one is marked for add afterwards. Checkout failures are logged.
///
/// Returns the saved path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSceneTask {
    /// Output directory, empty for the document's own directory
    pub directory: PathBuf,
    /// Substring of the file name to replace
    pub search: String,
    /// Replacement for `search`
    pub replace: String,
    /// Check out or add the target through the manager's checkout service
    pub checkout: bool,
}

impl SaveSceneTask {
    fn target_name(&self, file_name: &str) -> String {
        if self.search.is_empty() {
            file_name.to_string()
        } else {
            file_name.replace(&self.search, &self.replace)
        }
    }
}

impl BatchTask for SaveSceneTask {
    const KIND: &'static str = "SaveSceneTask";
    const TITLE: &'static str = "Save Scene";

    fn normalize(mut self) -> Result<Self, ConfigError> {
        if self.replace.contains(['/', '\\']) {
            return Err(ConfigError::invalid_value(
                "replace",
                "must not contain path separators",
            ));
        }
        self.directory = paths::normalize(&self.directory);
        Ok(self)
    }

    fn execute(
        &self,
        _previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        let scene = manager.scene();
        let current = manager.current_file();

        let file_name = scene
            .current_file_name()
            .or_else(|| current.as_ref().map(|f| f.file_name.clone()))
            .ok_or_else(|| TaskError::precondition("no scene file name to save under"))?;

        let directory = if self.directory.as_os_str().is_empty() {
            scene
                .current_directory()
                .or_else(|| current.as_ref().map(|f| f.directory.clone()))
                .unwrap_or_default()
        } else {
            self.directory.clone()
        };

        let target = directory.join(self.target_name(&file_name));
        let existed = scene.exists(&target);

        if self.checkout && existed {
            if let Err(err) = manager.checkout_service().checkout(&target) {
                tracing::warn!(
                    path = %target.display(),
                    error = %err,
                    "checkout failed, saving anyway"
                );
            }
        }

        tracing::info!(path = %target.display(), "saving changes");
        scene.save_as(&target)?;

        if self.checkout && !existed {
            if let Err(err) = manager.checkout_service().add(&target) {
                tracing::warn!(
                    path = %target.display(),
                    error = %err,
                    "failed to mark new file for add"
                );
            }
        }

        Ok(ChainValue::Path(target))
    }
}
