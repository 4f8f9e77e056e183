//! Scene Batch CLI
//!
//! Command implementations behind the `scene-batch` binary:
//! - `run`: execute a persisted task list over scene files
//! - `tasks`: list the registered task kinds
//! - `validate`: load a task list and print it

pub mod commands;
pub mod logging;

pub use commands::{build_checkout, build_registry, list_tasks, run, validate, RunRequest};
