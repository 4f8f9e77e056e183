//! Task contract
//!
//! Defines the polymorphic unit of work executed by the [`TaskManager`].
//!
//! # Core Concepts
//!
//! - [`BatchTask`]: typed trait implemented by every concrete task kind
//! - [`Task`]: object-safe view the manager and registry work with
//! - [`TaskInstance`]: adapter that turns a [`BatchTask`] into a [`Task`]
//! - [`ManagerLink`]: weak back-reference from a task to its manager
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(default)]
//! struct AppendTask { suffix: String }
//!
//! impl BatchTask for AppendTask {
//!     const KIND: &'static str = "AppendTask";
//!     const TITLE: &'static str = "Append";
//!
//!     fn execute(&self, previous: ChainValue, _: &TaskManager) -> Result<ChainValue, TaskError> {
//!         Ok(previous)
//!     }
//! }
//!
//! let task = make_task(AppendTask::default())?;
//! ```

use crate::error::{ConfigError, TaskError};
use crate::manager::TaskManager;
use crate::value::ChainValue;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

/// Configuration bag used to construct and persist tasks
pub type TaskFields = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a task, as stored in a manager's list
pub type TaskHandle = Arc<dyn Task>;

/// Trait for concrete task kinds
///
/// The implementing type *is* the task's configuration: its serde fields are
/// the task's persisted fields. Containers should use `#[serde(default)]` so
/// missing keys take per-field defaults; unknown keys are ignored.
///
/// # Contract
/// - `execute` receives whatever the previous task returned (the file path
///   for the first task) and returns the value for the next task
/// - Tasks with no meaningful output return their input unchanged
/// - Returning `Err` aborts the remaining tasks for the current file only
pub trait BatchTask:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Stable registry name, also the persisted type tag
    const KIND: &'static str;

    /// Display name
    const TITLE: &'static str;

    /// Validate and normalize freshly assigned fields
    ///
    /// Default implementation accepts everything unchanged.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a field value is not acceptable
    fn normalize(self) -> Result<Self, ConfigError> {
        Ok(self)
    }

    /// Execute this task against the current file
    ///
    /// # Errors
    /// Returns [`TaskError`] when the task cannot proceed
    fn execute(&self, previous: ChainValue, manager: &TaskManager)
        -> Result<ChainValue, TaskError>;
}

/// Object-safe task interface
pub trait Task: Send + Sync + Debug {
    /// Registry name of this task's kind
    fn kind(&self) -> &'static str;

    /// Display name of this task's kind
    fn title(&self) -> &'static str;

    /// Execute the task
    ///
    /// # Errors
    /// Returns [`TaskError`] when the task cannot proceed
    fn execute(&self, previous: ChainValue, manager: &TaskManager)
        -> Result<ChainValue, TaskError>;

    /// Back-reference slot, written only by the owning manager
    fn link(&self) -> &ManagerLink;

    /// Current configuration fields
    fn fields(&self) -> TaskFields;

    /// Overlay `fields` onto the current configuration
    ///
    /// The task is left unchanged when validation fails.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the merged fields are invalid
    fn configure(&self, fields: &TaskFields) -> Result<(), ConfigError>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Assign a single field
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the value is invalid
    fn set_field(&self, name: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        let mut fields = TaskFields::new();
        fields.insert(name.to_string(), value);
        self.configure(&fields)
    }

    /// Owning manager, or `None` when detached or the manager is gone
    fn manager(&self) -> Option<Arc<TaskManager>> {
        self.link().upgrade()
    }
}

/// Weak back-reference from a task to its manager
///
/// Empty until the task is inserted into a manager's list and emptied again
/// when it is removed. Never points at a manager the task is not listed in.
#[derive(Default)]
pub struct ManagerLink {
    manager: RwLock<Weak<TaskManager>>,
}

impl ManagerLink {
    /// Create an unattached link
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the manager
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<TaskManager>> {
        self.manager.read().upgrade()
    }

    /// Check whether a live manager is attached
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.manager.read().strong_count() > 0
    }

    /// Check whether `manager` is the attached manager
    #[must_use]
    pub fn is_attached_to(&self, manager: &TaskManager) -> bool {
        let guard = self.manager.read();
        guard.strong_count() > 0 && std::ptr::eq(guard.as_ptr(), manager)
    }

    pub(crate) fn attach(&self, manager: Weak<TaskManager>) {
        *self.manager.write() = manager;
    }

    pub(crate) fn detach(&self) {
        *self.manager.write() = Weak::new();
    }
}

impl Debug for ManagerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerLink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Adapter from a [`BatchTask`] to a shareable [`Task`]
pub struct TaskInstance<T: BatchTask> {
    settings: RwLock<T>,
    link: ManagerLink,
}

impl<T: BatchTask> TaskInstance<T> {
    /// Wrap a task, normalizing its fields first
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the fields are invalid
    pub fn new(task: T) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: RwLock::new(task.normalize()?),
            link: ManagerLink::new(),
        })
    }

    /// Construct from a field bag
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the bag cannot be decoded or validated
    pub fn from_fields(fields: &TaskFields) -> Result<Self, ConfigError> {
        Self::new(decode_fields(fields)?)
    }

    /// Snapshot of the current settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> T {
        self.settings.read().clone()
    }

    /// Edit settings in place, re-validating the result
    ///
    /// # Errors
    /// Returns [`ConfigError`] and keeps the previous settings when the edit
    /// produces invalid fields
    pub fn update(&self, edit: impl FnOnce(&mut T)) -> Result<(), ConfigError> {
        let mut next = self.settings();
        edit(&mut next);
        *self.settings.write() = next.normalize()?;
        Ok(())
    }
}

impl<T: BatchTask> Task for TaskInstance<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn title(&self) -> &'static str {
        T::TITLE
    }

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        let settings = self.settings();
        settings.execute(previous, manager)
    }

    fn link(&self) -> &ManagerLink {
        &self.link
    }

    fn fields(&self) -> TaskFields {
        match serde_json::to_value(&*self.settings.read()) {
            Ok(serde_json::Value::Object(fields)) => fields,
            _ => TaskFields::new(),
        }
    }

    fn configure(&self, fields: &TaskFields) -> Result<(), ConfigError> {
        let mut merged = self.fields();
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        let next = decode_fields::<T>(&merged)?.normalize()?;
        *self.settings.write() = next;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: BatchTask> Debug for TaskInstance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInstance")
            .field("kind", &T::KIND)
            .field("settings", &*self.settings.read())
            .field("link", &self.link)
            .finish()
    }
}

fn decode_fields<T: BatchTask>(fields: &TaskFields) -> Result<T, ConfigError> {
    serde_json::from_value(serde_json::Value::Object(fields.clone())).map_err(|source| {
        ConfigError::MalformedFields {
            kind: T::KIND.to_string(),
            source,
        }
    })
}

/// Wrap a typed task into a shared handle
///
/// # Errors
/// Returns [`ConfigError`] when the task's fields are invalid
pub fn make_task<T: BatchTask>(task: T) -> Result<TaskHandle, ConfigError> {
    Ok(Arc::new(TaskInstance::new(task)?))
}

/// Construct a shared handle from a field bag
///
/// # Errors
/// Returns [`ConfigError`] when the bag cannot be decoded or validated
pub fn task_from_fields<T: BatchTask>(fields: &TaskFields) -> Result<TaskHandle, ConfigError> {
    Ok(Arc::new(TaskInstance::<T>::from_fields(fields)?))
}

/// Typed settings of a task handle, if it is of kind `T`
#[must_use]
pub fn settings_of<T: BatchTask>(task: &dyn Task) -> Option<T> {
    task.as_any()
        .downcast_ref::<TaskInstance<T>>()
        .map(TaskInstance::settings)
}

/// Same kind and same configuration fields
#[must_use]
pub fn same_configuration(a: &dyn Task, b: &dyn Task) -> bool {
    a.kind() == b.kind() && a.fields() == b.fields()
}
