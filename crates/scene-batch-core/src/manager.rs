//! Task manager
//!
//! Owns the ordered task list and drives batch execution:
//! - List mutation with back-reference wiring (attach on insert, detach on removal)
//! - Per-file, per-task execution loop with progress callbacks
//! - Error isolation: a failing file never aborts the batch

use crate::checkout::{CheckoutOrder, CheckoutService, NoCheckout};
use crate::error::{ManagerError, SceneError};
use crate::paths;
use crate::registry::TaskRegistry;
use crate::scene::SceneHandle;
use crate::state::{validate_transition, ExecutionPhase};
use crate::task::{TaskFields, TaskHandle};
use crate::value::ChainValue;
use parking_lot::RwLock;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Decomposition of the file being processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentFile {
    /// Absolute, normalized path
    pub path: PathBuf,
    /// Containing directory
    pub directory: PathBuf,
    /// File name with extension
    pub file_name: String,
    /// File name without extension
    pub stem: String,
    /// Extension without the dot, empty if none
    pub extension: String,
    /// Zero-based position in the batch
    pub index: usize,
}

impl CurrentFile {
    /// Decompose `path` at batch position `index`
    #[must_use]
    pub fn new(path: &Path, index: usize) -> Self {
        let path = paths::absolutize(path);
        let lossy = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        Self {
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            file_name: lossy(path.file_name()),
            stem: lossy(path.file_stem()),
            extension: lossy(path.extension()),
            path,
            index,
        }
    }
}

/// Progress callback: `(file path, progress in [0, 100])`
pub type ProgressCallback<'a> = Box<dyn FnMut(&Path, f64) + 'a>;

/// Options for [`TaskManager::execute`]
#[derive(Default)]
pub struct ExecuteOptions<'a> {
    /// Request a checkout for every processed file
    pub checkout: bool,
    /// Checkout position relative to opening the file
    pub checkout_order: CheckoutOrder,
    pre_callback: Option<ProgressCallback<'a>>,
    post_callback: Option<ProgressCallback<'a>>,
}

impl<'a> ExecuteOptions<'a> {
    /// Create default options: no checkout, no callbacks
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With checkout enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_checkout(mut self, checkout: bool) -> Self {
        self.checkout = checkout;
        self
    }

    /// With checkout ordering
    #[inline]
    #[must_use]
    pub fn with_checkout_order(mut self, order: CheckoutOrder) -> Self {
        self.checkout_order = order;
        self
    }

    /// Called before a file's task chain with the progress so far
    #[must_use]
    pub fn with_pre_callback(mut self, callback: impl FnMut(&Path, f64) + 'a) -> Self {
        self.pre_callback = Some(Box::new(callback));
        self
    }

    /// Called after a file's task chain with the updated progress
    #[must_use]
    pub fn with_post_callback(mut self, callback: impl FnMut(&Path, f64) + 'a) -> Self {
        self.post_callback = Some(Box::new(callback));
        self
    }

    fn notify_pre(&mut self, path: &Path, progress: f64) {
        if let Some(callback) = self.pre_callback.as_mut() {
            callback(path, progress);
        }
    }

    fn notify_post(&mut self, path: &Path, progress: f64) {
        if let Some(callback) = self.post_callback.as_mut() {
            callback(path, progress);
        }
    }
}

impl fmt::Debug for ExecuteOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("checkout", &self.checkout)
            .field("checkout_order", &self.checkout_order)
            .field("pre_callback", &self.pre_callback.is_some())
            .field("post_callback", &self.post_callback.is_some())
            .finish()
    }
}

/// What happened to one file of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Every task ran; `result` is what the last task returned
    Processed {
        /// Final chain value
        result: ChainValue,
    },
    /// File did not exist; no task ran
    Skipped,
    /// A task failed; the tasks after it did not run
    Failed {
        /// Position of the failing task in the list
        task_index: usize,
        /// Kind of the failing task
        task_kind: &'static str,
        /// Title of the failing task
        task_title: &'static str,
        /// Task error message
        error: String,
    },
}

/// Outcome of one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    /// Path as supplied by the caller
    pub path: PathBuf,
    /// Zero-based position in the batch
    pub index: usize,
    /// What happened
    pub status: FileStatus,
    /// Scene error when the file could not be opened; the chain still ran
    pub open_error: Option<String>,
}

impl FileOutcome {
    /// Check if every task ran
    #[inline]
    #[must_use]
    pub fn is_processed(&self) -> bool {
        matches!(self.status, FileStatus::Processed { .. })
    }

    /// Final chain value, if every task ran
    #[must_use]
    pub fn result(&self) -> Option<&ChainValue> {
        match &self.status {
            FileStatus::Processed { result } => Some(result),
            _ => None,
        }
    }
}

/// Report of one [`TaskManager::execute`] call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchSummary {
    /// One entry per input file, in input order
    pub outcomes: Vec<FileOutcome>,
    /// Wall-clock time of the whole batch
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Number of input files
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Files whose whole chain ran
    #[must_use]
    pub fn processed(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Processed { .. }))
    }

    /// Files skipped because they did not exist
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Skipped))
    }

    /// Files whose chain failed
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, FileStatus::Failed { .. }))
    }

    /// Files the scene could not open
    #[must_use]
    pub fn open_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.open_error.is_some()).count()
    }

    /// Check that no file failed
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Mean time per input file, `None` for an empty batch
    #[must_use]
    pub fn average_per_file(&self) -> Option<Duration> {
        let total = u32::try_from(self.total()).ok().filter(|n| *n > 0)?;
        Some(self.elapsed / total)
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// Progress after finishing the file at `index` of `total`
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn progress_after(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (index + 1) as f64 / total as f64 * 100.0
}

/// Format a duration as `HH hours MM minutes and SS seconds`
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02} hours {:02} minutes and {:02} seconds",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}

fn same_task(a: &TaskHandle, b: &TaskHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Owner of an ordered task list and driver of batch execution
///
/// Always lives behind an [`Arc`] so tasks can hold a weak reference to it.
///
/// # Invariants
/// - After every list mutation exactly the listed tasks are attached to
///   this manager
/// - `current_file`, `current_task` and `phase` describe the file being
///   processed during [`execute`](Self::execute), and the last processed
///   file afterwards
pub struct TaskManager {
    this: Weak<TaskManager>,
    scene: Arc<dyn SceneHandle>,
    checkout: Arc<dyn CheckoutService>,
    factory: Weak<TaskRegistry>,
    tasks: RwLock<Vec<TaskHandle>>,
    current_task: RwLock<Option<TaskHandle>>,
    current_file: RwLock<Option<CurrentFile>>,
    phase: RwLock<ExecutionPhase>,
}

impl TaskManager {
    /// Create an empty manager without a checkout service
    #[must_use]
    pub fn new(scene: Arc<dyn SceneHandle>, registry: &Arc<TaskRegistry>) -> Arc<Self> {
        Self::with_checkout(scene, registry, Arc::new(NoCheckout))
    }

    /// Create an empty manager with a checkout service
    #[must_use]
    pub fn with_checkout(
        scene: Arc<dyn SceneHandle>,
        registry: &Arc<TaskRegistry>,
        checkout: Arc<dyn CheckoutService>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            scene,
            checkout,
            factory: Arc::downgrade(registry),
            tasks: RwLock::new(Vec::new()),
            current_task: RwLock::new(None),
            current_file: RwLock::new(None),
            phase: RwLock::new(ExecutionPhase::Idle),
        })
    }

    /// Scene handle used for opening files
    #[inline]
    #[must_use]
    pub fn scene(&self) -> &dyn SceneHandle {
        self.scene.as_ref()
    }

    /// Checkout service
    #[inline]
    #[must_use]
    pub fn checkout_service(&self) -> &dyn CheckoutService {
        self.checkout.as_ref()
    }

    /// Task registry, if it is still alive
    #[inline]
    #[must_use]
    pub fn factory(&self) -> Option<Arc<TaskRegistry>> {
        self.factory.upgrade()
    }

    /// Task currently (or last) executing
    #[must_use]
    pub fn current_task(&self) -> Option<TaskHandle> {
        self.current_task.read().clone()
    }

    /// File currently (or last) processed
    #[must_use]
    pub fn current_file(&self) -> Option<CurrentFile> {
        self.current_file.read().clone()
    }

    /// Current execution phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ExecutionPhase {
        *self.phase.read()
    }

    // ------------------------------------------------------------------
    // Task list
    // ------------------------------------------------------------------

    /// Snapshot of the task list
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.tasks.read().clone()
    }

    /// Task at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<TaskHandle> {
        self.tasks.read().get(index).cloned()
    }

    /// Number of tasks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Check if the task list is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Check if `task` is listed
    #[must_use]
    pub fn contains(&self, task: &TaskHandle) -> bool {
        self.tasks.read().iter().any(|t| same_task(t, task))
    }

    /// Append a task
    ///
    /// # Errors
    /// Returns [`ManagerError::AlreadyAttached`] if another manager owns it
    pub fn push(&self, task: TaskHandle) -> Result<(), ManagerError> {
        let mut tasks = self.tasks.write();
        let index = tasks.len();
        self.insert_locked(&mut tasks, index, task)
    }

    /// Insert a task at `index`
    ///
    /// # Errors
    /// Returns [`ManagerError::IndexOutOfRange`] when `index > len` and
    /// [`ManagerError::AlreadyAttached`] if another manager owns the task
    pub fn insert(&self, index: usize, task: TaskHandle) -> Result<(), ManagerError> {
        let mut tasks = self.tasks.write();
        self.insert_locked(&mut tasks, index, task)
    }

    /// Append several tasks
    ///
    /// Nothing is appended if any task belongs to another manager.
    ///
    /// # Errors
    /// Returns [`ManagerError::AlreadyAttached`] if another manager owns a task
    pub fn extend(
        &self,
        new_tasks: impl IntoIterator<Item = TaskHandle>,
    ) -> Result<(), ManagerError> {
        let new_tasks: Vec<TaskHandle> = new_tasks.into_iter().collect();
        for task in &new_tasks {
            self.ensure_attachable(task)?;
        }

        let mut tasks = self.tasks.write();
        for task in new_tasks {
            self.task_added(&task);
            tasks.push(task);
        }
        Ok(())
    }

    /// Remove the task at `index`
    ///
    /// # Errors
    /// Returns [`ManagerError::IndexOutOfRange`] when `index >= len`
    pub fn remove(&self, index: usize) -> Result<TaskHandle, ManagerError> {
        let mut tasks = self.tasks.write();
        if index >= tasks.len() {
            return Err(ManagerError::IndexOutOfRange {
                index,
                len: tasks.len(),
            });
        }
        let task = tasks.remove(index);
        Self::task_removed(&tasks, &task);
        Ok(task)
    }

    /// Remove the first occurrence of `task`
    ///
    /// Returns `false` if it is not listed.
    pub fn remove_task(&self, task: &TaskHandle) -> bool {
        let mut tasks = self.tasks.write();
        let Some(index) = tasks.iter().position(|t| same_task(t, task)) else {
            return false;
        };
        let removed = tasks.remove(index);
        Self::task_removed(&tasks, &removed);
        true
    }

    /// Move the task at `from` so it ends up at `to`
    ///
    /// # Errors
    /// Returns [`ManagerError::IndexOutOfRange`] when either index is invalid
    pub fn move_task(&self, from: usize, to: usize) -> Result<(), ManagerError> {
        let mut tasks = self.tasks.write();
        let len = tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(ManagerError::IndexOutOfRange { index, len });
            }
        }
        let task = tasks.remove(from);
        tasks.insert(to, task);
        Ok(())
    }

    /// Remove every task
    pub fn clear(&self) {
        let removed: Vec<TaskHandle> = std::mem::take(&mut *self.tasks.write());
        for task in &removed {
            task.link().detach();
        }
    }

    /// Replace the whole list (clear, then extend)
    ///
    /// The current list is kept if any new task belongs to another manager.
    ///
    /// # Errors
    /// Returns [`ManagerError::AlreadyAttached`] if another manager owns a task
    pub fn set_tasks(
        &self,
        new_tasks: impl IntoIterator<Item = TaskHandle>,
    ) -> Result<(), ManagerError> {
        let new_tasks: Vec<TaskHandle> = new_tasks.into_iter().collect();
        for task in &new_tasks {
            self.ensure_attachable(task)?;
        }
        self.clear();
        self.extend(new_tasks)
    }

    /// Construct a task through the registry and append it
    ///
    /// # Errors
    /// Returns [`ManagerError::RegistryUnavailable`] when the registry has
    /// been dropped, or [`ManagerError::Registry`] when the kind is unknown
    /// or its fields are invalid. The list is unchanged on error.
    pub fn add_task(&self, kind: &str, fields: &TaskFields) -> Result<TaskHandle, ManagerError> {
        let registry = self.factory().ok_or(ManagerError::RegistryUnavailable)?;
        let task = registry.create(kind, fields)?;
        self.push(Arc::clone(&task))?;
        Ok(task)
    }

    fn insert_locked(
        &self,
        tasks: &mut Vec<TaskHandle>,
        index: usize,
        task: TaskHandle,
    ) -> Result<(), ManagerError> {
        if index > tasks.len() {
            return Err(ManagerError::IndexOutOfRange {
                index,
                len: tasks.len(),
            });
        }
        self.ensure_attachable(&task)?;
        self.task_added(&task);
        tasks.insert(index, task);
        Ok(())
    }

    fn ensure_attachable(&self, task: &TaskHandle) -> Result<(), ManagerError> {
        let link = task.link();
        if link.is_attached() && !link.is_attached_to(self) {
            return Err(ManagerError::AlreadyAttached(task.kind()));
        }
        Ok(())
    }

    fn task_added(&self, task: &TaskHandle) {
        task.link().attach(self.this.clone());
    }

    fn task_removed(remaining: &[TaskHandle], task: &TaskHandle) {
        // Duplicates stay attached until their last occurrence leaves.
        if !remaining.iter().any(|t| same_task(t, task)) {
            task.link().detach();
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Run the task list over every file
    ///
    /// For each file, in order: skip it with a warning if it does not exist,
    /// call the pre-callback, check out and open it (in the configured
    /// order), fold the task list over `ChainValue::Path(file)`, then call
    /// the post-callback with `(index + 1) / n * 100`.
    ///
    /// The task list is snapshotted when the call starts; callbacks that
    /// edit the list affect the next call only. A file the scene cannot
    /// open still runs the chain, with the error kept in
    /// [`FileOutcome::open_error`]. A failing task stops the chain for its
    /// file only. Nothing is retried.
    pub fn execute<P: AsRef<Path>>(
        &self,
        files: &[P],
        mut options: ExecuteOptions<'_>,
    ) -> BatchSummary {
        let start = Instant::now();
        let total = files.len();
        let tasks = self.tasks();
        let mut progress = 0.0;
        let mut outcomes = Vec::with_capacity(total);

        tracing::debug!(files = total, tasks = tasks.len(), "starting batch");

        for (index, file) in files.iter().enumerate() {
            let file_path = file.as_ref();
            *self.current_file.write() = Some(CurrentFile::new(file_path, index));
            *self.current_task.write() = None;

            if !self.scene.exists(file_path) {
                tracing::warn!(path = %file_path.display(), "cannot locate file, skipping");
                outcomes.push(FileOutcome {
                    path: file_path.to_path_buf(),
                    index,
                    status: FileStatus::Skipped,
                    open_error: None,
                });
                continue;
            }

            tracing::debug!(path = %file_path.display(), index, "processing file");
            options.notify_pre(file_path, progress);

            let open_error = self
                .prepare_document(file_path, &options)
                .err()
                .map(|err| err.to_string());
            let status = self.run_chain(&tasks, file_path);
            self.transition(ExecutionPhase::Idle);

            progress = progress_after(index, total);
            options.notify_post(file_path, progress);

            outcomes.push(FileOutcome {
                path: file_path.to_path_buf(),
                index,
                status,
                open_error,
            });
        }

        let summary = BatchSummary {
            outcomes,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            files = total,
            processed = summary.processed(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            average = ?summary.average_per_file(),
            "{} file(s) batched in {}!",
            total,
            format_elapsed(summary.elapsed)
        );
        summary
    }

    fn prepare_document(
        &self,
        file_path: &Path,
        options: &ExecuteOptions<'_>,
    ) -> Result<(), SceneError> {
        match options.checkout_order {
            CheckoutOrder::BeforeOpen => {
                self.request_checkout(file_path, options.checkout);
                self.open_document(file_path)
            }
            CheckoutOrder::AfterOpen => {
                let opened = self.open_document(file_path);
                self.request_checkout(file_path, options.checkout);
                opened
            }
        }
    }

    fn open_document(&self, file_path: &Path) -> Result<(), SceneError> {
        self.transition(ExecutionPhase::Opening);
        if !self.scene.is_valid_extension(file_path) {
            return Ok(());
        }

        self.scene.open(file_path).map_err(|err| {
            tracing::error!(
                path = %file_path.display(),
                error = %err,
                "cannot open scene, running tasks against the current document"
            );
            err
        })
    }

    fn request_checkout(&self, file_path: &Path, enabled: bool) {
        if !enabled {
            return;
        }
        self.transition(ExecutionPhase::Checkout);
        if let Err(err) = self.checkout.checkout(file_path) {
            tracing::warn!(
                path = %file_path.display(),
                error = %err,
                "checkout failed, continuing"
            );
        }
    }

    fn run_chain(&self, tasks: &[TaskHandle], file_path: &Path) -> FileStatus {
        let mut result = ChainValue::path(file_path);

        for (position, task) in tasks.iter().enumerate() {
            self.transition(ExecutionPhase::RunningTask(position));
            *self.current_task.write() = Some(Arc::clone(task));
            tracing::debug!(task = task.title(), position, "running task");

            match task.execute(result, self) {
                Ok(next) => result = next,
                Err(err) => {
                    tracing::error!(
                        task = task.title(),
                        kind = task.kind(),
                        path = %file_path.display(),
                        error = %err,
                        "task failed, skipping remaining tasks for this file"
                    );
                    return FileStatus::Failed {
                        task_index: position,
                        task_kind: task.kind(),
                        task_title: task.title(),
                        error: err.to_string(),
                    };
                }
            }
        }

        FileStatus::Processed { result }
    }

    fn transition(&self, to: ExecutionPhase) {
        let mut phase = self.phase.write();
        let from = *phase;
        if let Err(err) = validate_transition(from, to) {
            assert!(!cfg!(feature = "strict-debug"), "{err}");
            tracing::error!(error = %err, "unexpected execution phase change");
        }
        tracing::trace!(from = %from, to = %to, "phase");
        *phase = to;
    }
}

impl fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("scene", &self.scene)
            .field("checkout", &self.checkout)
            .field("tasks", &self.tasks.read().len())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
