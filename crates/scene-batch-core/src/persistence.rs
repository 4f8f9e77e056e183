//! Task list documents
//!
//! A manager's task list persists as a versioned JSON document holding one
//! typed record per task:
//!
//! ```json
//! {
//!   "version": 1,
//!   "tasks": [
//!     { "$type": "RenameNodeTask", "search": "old", "replace": "new" },
//!     { "$type": "SaveSceneTask", "directory": "out" }
//!   ]
//! }
//! ```
//!
//! Records are rebuilt through the [`TaskRegistry`], so a document can only
//! name kinds the registry knows. A single bad record fails the whole load.

use crate::error::{ManagerError, PersistenceError};
use crate::manager::TaskManager;
use crate::registry::TaskRegistry;
use crate::scene::SceneHandle;
use crate::task::{TaskFields, TaskHandle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Document version written by this build
pub const DOCUMENT_VERSION: u32 = 1;

/// One persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Registry name of the task's kind
    #[serde(rename = "$type")]
    pub kind: String,
    /// Configuration fields
    #[serde(flatten)]
    pub fields: TaskFields,
}

impl TaskRecord {
    /// Snapshot a task
    #[must_use]
    pub fn of(task: &TaskHandle) -> Self {
        Self {
            kind: task.kind().to_string(),
            fields: task.fields(),
        }
    }
}

/// Ordered list of persisted tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListDocument {
    /// Format version
    pub version: u32,
    /// Records in execution order
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl Default for TaskListDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            tasks: Vec::new(),
        }
    }
}

impl TaskListDocument {
    /// Rebuild every record through `registry`
    ///
    /// # Errors
    /// Returns [`PersistenceError::Record`] for the first record whose kind
    /// is unknown or whose fields are invalid
    pub fn instantiate(
        &self,
        registry: &TaskRegistry,
    ) -> Result<Vec<TaskHandle>, PersistenceError> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, record)| {
                registry
                    .create(&record.kind, &record.fields)
                    .map_err(|source| PersistenceError::Record { index, source })
            })
            .collect()
    }
}

/// Snapshot a manager's task list
#[must_use]
pub fn serialize(manager: &TaskManager) -> TaskListDocument {
    TaskListDocument {
        version: DOCUMENT_VERSION,
        tasks: manager.tasks().iter().map(TaskRecord::of).collect(),
    }
}

/// Build a new manager from a document
///
/// # Errors
/// Returns [`PersistenceError`] when a record cannot be rebuilt
pub fn deserialize(
    document: &TaskListDocument,
    registry: &Arc<TaskRegistry>,
    scene: Arc<dyn SceneHandle>,
) -> Result<Arc<TaskManager>, PersistenceError> {
    let manager = TaskManager::new(scene, registry);
    restore(&manager, document)?;
    Ok(manager)
}

/// Replace a manager's task list with a document's tasks
///
/// Uses the manager's own registry. The list is unchanged on error.
///
/// # Errors
/// Returns [`PersistenceError`] when the registry is gone or a record
/// cannot be rebuilt
pub fn restore(manager: &TaskManager, document: &TaskListDocument) -> Result<(), PersistenceError> {
    let registry = manager.factory().ok_or(ManagerError::RegistryUnavailable)?;
    let tasks = document.instantiate(&registry)?;
    manager.set_tasks(tasks)?;
    tracing::debug!(tasks = manager.len(), "task list restored");
    Ok(())
}

/// Render a document as pretty JSON
///
/// # Errors
/// Returns [`PersistenceError::Json`] if a field cannot be encoded
pub fn to_json(document: &TaskListDocument) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse a document, checking its version
///
/// # Errors
/// Returns [`PersistenceError::Json`] for malformed text and
/// [`PersistenceError::UnsupportedVersion`] for other format versions
pub fn from_json(text: &str) -> Result<TaskListDocument, PersistenceError> {
    let document: TaskListDocument = serde_json::from_str(text)?;
    if document.version != DOCUMENT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: document.version,
            expected: DOCUMENT_VERSION,
        });
    }
    Ok(document)
}

/// Write a manager's task list to `path`
///
/// # Errors
/// Returns [`PersistenceError`] on encoding or IO failure
pub fn save(manager: &TaskManager, path: &Path) -> Result<(), PersistenceError> {
    let text = to_json(&serialize(manager))?;
    fs::write(path, text).map_err(|e| PersistenceError::io_error(path, e))?;
    tracing::info!(path = %path.display(), tasks = manager.len(), "saved task list");
    Ok(())
}

/// Read a document from `path`
///
/// # Errors
/// Returns [`PersistenceError`] on IO, parse or version failure
pub fn read(path: &Path) -> Result<TaskListDocument, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|e| PersistenceError::io_error(path, e))?;
    from_json(&text)
}

/// Read a document from `path` into a new manager
///
/// # Errors
/// Returns [`PersistenceError`] on IO, parse, version or record failure
pub fn load(
    path: &Path,
    registry: &Arc<TaskRegistry>,
    scene: Arc<dyn SceneHandle>,
) -> Result<Arc<TaskManager>, PersistenceError> {
    deserialize(&read(path)?, registry, scene)
}
