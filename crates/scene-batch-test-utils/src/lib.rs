//! Testing utilities for the Scene Batch workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use parking_lot::Mutex;
use scene_batch_core::registry::{TaskPackage, TaskRegistrar};
use scene_batch_core::scene::has_extension;
use scene_batch_core::{
    BatchTask, ChainValue, ConfigError, SceneError, SceneHandle, ScriptLanguage, TaskError,
    TaskManager,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

// ----------------------------------------------------------------------
// Scene
// ----------------------------------------------------------------------

/// Call received by a [`RecordingScene`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCall {
    Open(PathBuf),
    NewScene,
    SaveAs(PathBuf),
    ExecuteFile(PathBuf),
    ExecuteScript(String, ScriptLanguage),
    RenameNode { from: String, to: String },
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<SceneCall>,
    current: Option<PathBuf>,
    nodes: HashSet<String>,
}

/// In-memory scene that records every capability call
///
/// Files registered with [`with_files`](Self::with_files) exist without
/// touching the disk; real files exist too. Opening a path listed in
/// [`failing_open`](Self::failing_open) returns an error.
#[derive(Debug)]
pub struct RecordingScene {
    extensions: Vec<String>,
    virtual_files: Mutex<HashSet<PathBuf>>,
    failing_open: Mutex<HashSet<PathBuf>>,
    state: Mutex<RecordingState>,
}

impl Default for RecordingScene {
    fn default() -> Self {
        Self::new(["ma", "mb", "txt"])
    }
}

impl RecordingScene {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            virtual_files: Mutex::new(HashSet::new()),
            failing_open: Mutex::new(HashSet::new()),
            state: Mutex::new(RecordingState::default()),
        }
    }

    #[must_use]
    pub fn with_files<I, P>(self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.virtual_files
            .lock()
            .extend(files.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_nodes<I, S>(self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn failing_open(&self, path: impl Into<PathBuf>) {
        self.failing_open.lock().insert(path.into());
    }

    pub fn calls(&self) -> Vec<SceneCall> {
        self.state.lock().calls.clone()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SceneCall::Open(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.state.lock().nodes.contains(name)
    }

    fn record(&self, call: SceneCall) {
        self.state.lock().calls.push(call);
    }
}

impl SceneHandle for RecordingScene {
    fn exists(&self, path: &Path) -> bool {
        self.virtual_files.lock().contains(path) || path.exists()
    }

    fn is_valid_extension(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }

    fn open(&self, path: &Path) -> Result<(), SceneError> {
        self.record(SceneCall::Open(path.to_path_buf()));
        if self.failing_open.lock().contains(path) {
            return Err(SceneError::InvalidExtension(path.to_path_buf()));
        }
        self.state.lock().current = Some(path.to_path_buf());
        Ok(())
    }

    fn new_scene(&self) -> Result<(), SceneError> {
        self.record(SceneCall::NewScene);
        self.state.lock().current = None;
        Ok(())
    }

    fn save_as(&self, path: &Path) -> Result<(), SceneError> {
        self.record(SceneCall::SaveAs(path.to_path_buf()));
        self.virtual_files.lock().insert(path.to_path_buf());
        self.state.lock().current = Some(path.to_path_buf());
        Ok(())
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current.clone()
    }

    fn execute_file(&self, path: &Path) -> Result<(), SceneError> {
        self.record(SceneCall::ExecuteFile(path.to_path_buf()));
        Ok(())
    }

    fn execute_script(&self, script: &str, language: ScriptLanguage) -> Result<(), SceneError> {
        self.record(SceneCall::ExecuteScript(script.to_string(), language));
        Ok(())
    }

    fn rename_node(&self, name: &str, new_name: &str) -> Result<bool, SceneError> {
        self.record(SceneCall::RenameNode {
            from: name.to_string(),
            to: new_name.to_string(),
        });
        let mut state = self.state.lock();
        if !state.nodes.remove(name) {
            return Ok(false);
        }
        state.nodes.insert(new_name.to_string());
        Ok(true)
    }
}

// ----------------------------------------------------------------------
// Tasks
// ----------------------------------------------------------------------

/// Appends `suffix` to the previous path (`f1.txt` becomes `f1.txt-A`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendSuffixTask {
    pub suffix: String,
}

impl AppendSuffixTask {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl BatchTask for AppendSuffixTask {
    const KIND: &'static str = "AppendSuffixTask";
    const TITLE: &'static str = "Append Suffix";

    fn normalize(self) -> Result<Self, ConfigError> {
        if self.suffix.contains('/') {
            return Err(ConfigError::invalid_value("suffix", "must not contain '/'"));
        }
        Ok(self)
    }

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        let base = match previous {
            ChainValue::Path(path) => path,
            _ => manager
                .current_file()
                .map(|file| file.path)
                .ok_or_else(|| TaskError::precondition("no path to append to"))?,
        };
        let mut text = base.into_os_string();
        text.push(&self.suffix);
        Ok(ChainValue::Path(PathBuf::from(text)))
    }
}

/// What a [`SpyTask`] saw when it ran
#[derive(Debug, Clone, PartialEq)]
pub struct SpyEvent {
    pub label: String,
    pub input: ChainValue,
    pub file: Option<PathBuf>,
    pub attached: bool,
}

/// Shared record of spy executions, in order
pub type SpyLog = Arc<Mutex<Vec<SpyEvent>>>;

/// Records each execution into a shared log and passes its input through
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyTask {
    pub label: String,
    #[serde(skip)]
    pub log: SpyLog,
}

impl SpyTask {
    pub fn new(label: impl Into<String>, log: &SpyLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
        }
    }
}

impl PartialEq for SpyTask {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl BatchTask for SpyTask {
    const KIND: &'static str = "SpyTask";
    const TITLE: &'static str = "Spy";

    fn execute(
        &self,
        previous: ChainValue,
        manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        let attached = manager
            .current_task()
            .is_some_and(|task| task.link().is_attached_to(manager));
        self.log.lock().push(SpyEvent {
            label: self.label.clone(),
            input: previous.clone(),
            file: manager.current_file().map(|file| file.path),
            attached,
        });
        Ok(previous)
    }
}

/// Always fails with `message`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailingTask {
    pub message: String,
}

impl FailingTask {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl BatchTask for FailingTask {
    const KIND: &'static str = "FailingTask";
    const TITLE: &'static str = "Failing";

    fn execute(
        &self,
        _previous: ChainValue,
        _manager: &TaskManager,
    ) -> Result<ChainValue, TaskError> {
        Err(TaskError::failed(self.message.clone()))
    }
}

/// Package registering the test task kinds under the name `testing`
pub fn testing_package() -> TaskPackage {
    TaskPackage::new("testing", register_testing)
}

fn register_testing(registrar: &mut TaskRegistrar) {
    registrar
        .register::<AppendSuffixTask>()
        .register::<SpyTask>()
        .register::<FailingTask>();
}

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

/// Temporary directory of scene files
pub struct SceneFiles {
    dir: TempDir,
}

impl SceneFiles {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `name` with `contents`, returning its path
    pub fn create(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Path of `name` without creating it
    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for SceneFiles {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------
// Logs
// ----------------------------------------------------------------------

/// In-memory log sink usable as a `tracing-subscriber` writer
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a thread-local subscriber and return its plain-text logs
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
