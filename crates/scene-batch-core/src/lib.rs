//! Scene Batch Core - batch task pipeline for scene files
//!
//! Runs an ordered list of pluggable tasks against each file of a queue,
//! threading each task's result into the next:
//! - Discovers task kinds and builds them by name ([`TaskRegistry`])
//! - Owns the task list and drives per-file execution ([`TaskManager`])
//! - Defines the task contract and its weak manager back-reference ([`Task`])
//! - Persists task lists as typed JSON records ([`persistence`])
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_batch_core::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = TaskRegistry::global();
//! let manager = TaskManager::new(Arc::new(StandaloneScene::default()), &registry);
//! manager.add_task("SaveSceneTask", &TaskFields::new())?;
//!
//! let summary = manager.execute(&["shots/sh010.ma"], ExecuteOptions::new());
//! println!("{} of {} files processed", summary.processed(), summary.total());
//! ```

#![warn(unreachable_pub)]

pub mod checkout;
pub mod config;
pub mod error;
pub mod manager;
pub mod paths;
pub mod persistence;
pub mod registry;
pub mod scene;
pub mod state;
pub mod task;
pub mod tasks;
pub mod value;

pub use checkout::{CheckoutOrder, CheckoutService, CommandCheckout, NoCheckout};
pub use config::{BatchConfig, CheckoutConfig, LoggingConfig, RegistryConfig, SceneConfig};
pub use error::{
    CheckoutError, ConfigError, ManagerError, PersistenceError, RegistryError, SceneError,
    TaskError, TransitionError,
};
pub use manager::{
    BatchSummary, CurrentFile, ExecuteOptions, FileOutcome, FileStatus, TaskManager,
};
pub use persistence::{TaskListDocument, TaskRecord};
pub use registry::{TaskClass, TaskPackage, TaskRegistrar, TaskRegistry};
pub use scene::{SceneHandle, ScriptLanguage, StandaloneScene};
pub use state::ExecutionPhase;
pub use task::{make_task, BatchTask, ManagerLink, Task, TaskFields, TaskHandle, TaskInstance};
pub use value::ChainValue;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and running batches
    pub use crate::{
        make_task, BatchConfig, BatchSummary, BatchTask, ChainValue, ExecuteOptions,
        SceneHandle, StandaloneScene, Task, TaskError, TaskFields, TaskHandle, TaskManager,
        TaskRegistry,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
