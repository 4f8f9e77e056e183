//! Custom script task

use crate::error::{ConfigError, TaskError};
use crate::manager::TaskManager;
use crate::paths;
use crate::scene::ScriptLanguage;
use crate::task::BatchTask;
use crate::value::ChainValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run user script code through the scene
///
/// Executes `file_path` first, then the inline `script`; either may be
/// empty. `language` accepts a name (`"Python"`, `"Embedded"`) or an
/// integer code (`0`, `1`). Returns its input unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomScriptTask {
    /// Script file to execute
    pub file_path: PathBuf,
    /// Inline script source
    pub script: String,
    /// Language of the inline script
    pub language: ScriptLanguage,
}

impl BatchTask for CustomScriptTask {
    const KIND: &'static str = "CustomScriptTask";
    const TITLE: &'static str = "Custom Script";

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

        if !self.file_path.as_os_str().is_empty() {
            tracing::info!(path = %self.file_path.display(), "executing script file");
            scene.execute_file(&self.file_path)?;
        }

        if !self.script.trim().is_empty() {
            tracing::info!(language = ?self.language, "executing custom script");
            scene.execute_script(&self.script, self.language)?;
        }

        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{settings_of, task_from_fields};
    use serde_json::json;

    #[test]
    fn language_coerced_from_code_or_name() {
        let fields = json!({"script": "print(1)", "language": 1}).as_object().cloned().unwrap();
        let task = task_from_fields::<CustomScriptTask>(&fields).unwrap();
        let settings = settings_of::<CustomScriptTask>(task.as_ref()).unwrap();
        assert_eq!(settings.language, ScriptLanguage::Embedded);

        task.set_field("language", json!("python")).unwrap();
        let settings = settings_of::<CustomScriptTask>(task.as_ref()).unwrap();
        assert_eq!(settings.language, ScriptLanguage::Python);
    }

    #[test]
    fn unknown_language_is_rejected() {
        let fields = json!({"language": 9}).as_object().cloned().unwrap();
        let err = task_from_fields::<CustomScriptTask>(&fields).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedFields { .. }));
    }

    #[test]
    fn persists_language_by_name() {
        let task = CustomScriptTask {
            language: ScriptLanguage::Embedded,
            ..CustomScriptTask::default()
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["language"], json!("Embedded"));
    }
}
