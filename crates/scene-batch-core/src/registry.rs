//! Task registry
//!
//! Provides [`TaskRegistry`] for discovering task kinds and constructing
//! them by name.
//!
//! Task kinds are contributed by [`TaskPackage`]s: each package is a
//! registration function that adds its kinds to a [`TaskRegistrar`].
//! Discovery runs the configured packages in order.

use crate::config::RegistryConfig;
use crate::error::{ConfigError, RegistryError};
use crate::task::{task_from_fields, BatchTask, TaskFields, TaskHandle};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Constructor stored for every registered kind
pub type TaskConstructor = fn(&TaskFields) -> Result<TaskHandle, ConfigError>;

/// Registered task kind
#[derive(Clone, Copy)]
pub struct TaskClass {
    /// Stable registry name
    pub kind: &'static str,
    /// Display name
    pub title: &'static str,
    constructor: TaskConstructor,
}

impl TaskClass {
    /// Describe a [`BatchTask`] kind
    #[inline]
    #[must_use]
    pub fn of<T: BatchTask>() -> Self {
        Self {
            kind: T::KIND,
            title: T::TITLE,
            constructor: task_from_fields::<T>,
        }
    }

    /// Construct a new instance from a field bag
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the fields are invalid
    pub fn instantiate(&self, fields: &TaskFields) -> Result<TaskHandle, ConfigError> {
        (self.constructor)(fields)
    }
}

impl fmt::Debug for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskClass")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Collects task kinds while a package registers
#[derive(Debug, Default)]
pub struct TaskRegistrar {
    classes: IndexMap<&'static str, TaskClass>,
}

impl TaskRegistrar {
    /// Register a [`BatchTask`] kind
    pub fn register<T: BatchTask>(&mut self) -> &mut Self {
        self.add(TaskClass::of::<T>())
    }

    /// Register a prepared class
    pub fn add(&mut self, class: TaskClass) -> &mut Self {
        if self.classes.insert(class.kind, class).is_some() {
            tracing::debug!(kind = class.kind, "task kind re-registered, replacing previous entry");
        }
        self
    }
}

/// Named registration module scanned by discovery
#[derive(Clone, Copy)]
pub struct TaskPackage {
    /// Package name used in configuration
    pub name: &'static str,
    register: fn(&mut TaskRegistrar),
}

impl TaskPackage {
    /// Create a package from its registration function
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, register: fn(&mut TaskRegistrar)) -> Self {
        Self { name, register }
    }

    fn register_into(&self, registrar: &mut TaskRegistrar) {
        (self.register)(registrar);
    }
}

impl fmt::Debug for TaskPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPackage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

static GLOBAL: Lazy<Arc<TaskRegistry>> = Lazy::new(|| Arc::new(TaskRegistry::with_defaults()));

/// Registry of available task kinds
///
/// Kinds are kept in registration order, which is the order
/// [`classes`](Self::classes) reports them in.
#[derive(Debug)]
pub struct TaskRegistry {
    packages: Vec<TaskPackage>,
    classes: RwLock<IndexMap<&'static str, TaskClass>>,
}

impl TaskRegistry {
    /// Create a registry over `packages` and run discovery
    #[must_use]
    pub fn new(packages: Vec<TaskPackage>) -> Self {
        let registry = Self {
            packages,
            classes: RwLock::new(IndexMap::new()),
        };
        registry.discover();
        registry
    }

    /// Create registry with the built-in task kinds
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![crate::tasks::core_package()])
    }

    /// Create registry from configuration
    ///
    /// Package names resolve against the built-in `core` package and
    /// `extra`, in that order of precedence.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownPackage`] for unresolved names
    pub fn from_config(
        config: &RegistryConfig,
        extra: &[TaskPackage],
    ) -> Result<Self, RegistryError> {
        let known: Vec<TaskPackage> = std::iter::once(crate::tasks::core_package())
            .chain(extra.iter().copied())
            .collect();

        let packages = config
            .packages
            .iter()
            .map(|name| {
                known
                    .iter()
                    .find(|package| package.name == name.as_str())
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownPackage(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(packages))
    }

    /// Process-wide registry with the built-in task kinds
    ///
    /// Constructed on first access and kept for the process lifetime.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Rebuild the kind table from the configured packages
    ///
    /// Idempotent: the same packages always produce the same table.
    pub fn discover(&self) {
        let mut registrar = TaskRegistrar::default();
        for package in &self.packages {
            package.register_into(&mut registrar);
        }

        tracing::debug!(
            packages = self.packages.len(),
            kinds = registrar.classes.len(),
            "task discovery complete"
        );
        *self.classes.write() = registrar.classes;
    }

    /// All registered kinds in stable order
    #[must_use]
    pub fn classes(&self) -> Vec<TaskClass> {
        self.classes.read().values().copied().collect()
    }

    /// Look up a kind by name
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] when no such kind is registered
    pub fn lookup(&self, name: &str) -> Result<TaskClass, RegistryError> {
        self.classes
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Construct a new task of kind `name`
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] for unknown kinds and
    /// [`RegistryError::Config`] when the fields are invalid
    pub fn create(&self, name: &str, fields: &TaskFields) -> Result<TaskHandle, RegistryError> {
        let class = self.lookup(name)?;
        Ok(class.instantiate(fields)?)
    }

    /// Check if kind exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Registered kind names in stable order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.classes.read().keys().copied().collect()
    }

    /// Number of registered kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Configured packages
    #[inline]
    #[must_use]
    pub fn packages(&self) -> &[TaskPackage] {
        &self.packages
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
