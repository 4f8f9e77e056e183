//! Error types for Scene Batch Core
//!
//! Provides error handling for:
//! - Task configuration (field bags and reconfiguration)
//! - Registry lookups and discovery
//! - Scene and checkout capability calls
//! - Task execution failures
//! - Task list mutation and persistence

use std::path::PathBuf;

/// Invalid task or batch configuration
///
/// Raised at construction time, never deferred to execution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field received a value it cannot accept
    #[error("invalid value for field '{field}': {message}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Field bag could not be decoded into the task's settings
    #[error("malformed task fields for '{kind}': {source}")]
    MalformedFields {
        /// Task kind being constructed
        kind: String,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file could not be read
    #[error("io error reading config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::config::BatchConfig`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create an invalid value error for a field
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Registry lookup and discovery errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No task kind registered under this name
    #[error("task kind not found: '{0}'")]
    NotFound(String),

    /// Discovery was configured with a package nobody provides
    #[error("unknown task package: '{0}'")]
    UnknownPackage(String),

    /// Task construction rejected its fields
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Scene capability errors
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Scene file does not exist
    #[error("scene file not found: {0}")]
    NotFound(PathBuf),

    /// Extension is not a document type the scene understands
    #[error("unsupported scene file: {0}")]
    InvalidExtension(PathBuf),

    /// No document is currently open
    #[error("no scene is open")]
    NoDocument,

    /// Capability is not available in this host
    #[error("scene capability not supported: {0}")]
    Unsupported(&'static str),

    /// IO error while reading or writing a scene file
    #[error("io error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl SceneError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Version-control side effect failures
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Checkout command exited unsuccessfully
    #[error("checkout command '{command}' failed for {path}: {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// File being checked out
        path: PathBuf,
        /// Captured standard error
        stderr: String,
    },

    /// No command configured for this operation
    #[error("no {0} command configured")]
    NotConfigured(&'static str),

    /// Command could not be spawned
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Program name
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// A task could not complete
///
/// Returning this from a task aborts the remaining tasks for the current file.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A precondition the task depends on does not hold
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Scene capability failed
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Checkout performed by the task failed
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Task-specific failure
    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    /// Create precondition failure
    #[inline]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create generic failure
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Task list mutation errors
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Index outside the task list
    #[error("task index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Task is attached to a different live manager
    #[error("task '{0}' already belongs to another manager")]
    AlreadyAttached(&'static str),

    /// The registry this manager was built with has been dropped
    #[error("task registry is no longer available")]
    RegistryUnavailable,

    /// Registry could not construct the task
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Illegal execution phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal execution phase transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    /// Phase being left
    pub from: crate::state::ExecutionPhase,
    /// Phase requested
    pub to: crate::state::ExecutionPhase,
}

/// Task list document load/save errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// IO error on the document file
    #[error("io error on {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON for a task list
    #[error("malformed task list document: {0}")]
    Json(#[from] serde_json::Error),

    /// Document version is not understood
    #[error("unsupported task list version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the document
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// A record could not be rebuilt through the registry
    #[error("task record {index}: {source}")]
    Record {
        /// Position of the record in the document
        index: usize,
        /// Registry or configuration failure
        #[source]
        source: RegistryError,
    },

    /// Rebuilt tasks could not be attached
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl PersistenceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_names_kind() {
        let err = RegistryError::NotFound("Nonexistent".to_string());
        assert_eq!(err.to_string(), "task kind not found: 'Nonexistent'");
    }

    #[test]
    fn config_error_passes_through_registry() {
        let err: RegistryError = ConfigError::invalid_value("language", "unknown").into();
        assert!(matches!(err, RegistryError::Config(_)));
        assert_eq!(
            err.to_string(),
            "invalid value for field 'language': unknown"
        );
    }

    #[test]
    fn scene_error_converts_into_task_error() {
        let err: TaskError = SceneError::NoDocument.into();
        assert!(matches!(err, TaskError::Scene(SceneError::NoDocument)));
    }

    #[test]
    fn index_error_message() {
        let err = ManagerError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "task index 4 out of range for list of length 2"
        );
    }
}
