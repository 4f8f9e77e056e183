//! Scene handle
//!
//! Abstract capability over the host document session, plus
//! [`StandaloneScene`], a headless implementation that works on plain files.

use crate::config::SceneConfig;
use crate::error::{ConfigError, SceneError};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Language of a script executed through the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ScriptLanguage {
    /// Python
    #[default]
    Python,
    /// The host's embedded scripting language
    Embedded,
}

impl ScriptLanguage {
    /// Coerce from an integer code
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unknown codes
    pub fn from_code(code: i64) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Self::Python),
            1 => Ok(Self::Embedded),
            _ => Err(ConfigError::invalid_value(
                "language",
                format!("unknown language code {code}"),
            )),
        }
    }

    /// Coerce from a name (case-insensitive)
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unknown names
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "embedded" => Ok(Self::Embedded),
            _ => Err(ConfigError::invalid_value(
                "language",
                format!("unknown language '{name}'"),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ScriptLanguage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Name(String),
        }

        let language = match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code),
            Raw::Name(name) => Self::from_name(&name),
        };
        language.map_err(serde::de::Error::custom)
    }
}

/// Host document session
///
/// The manager opens files through this handle; tasks use it to operate on
/// the open document. Implementations own their interior state.
pub trait SceneHandle: Send + Sync + fmt::Debug {
    /// Check that a file exists on the backing store
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Check that the file is a document type this scene can open
    fn is_valid_extension(&self, path: &Path) -> bool;

    /// Open a document, replacing the current one
    ///
    /// # Errors
    /// Returns [`SceneError`] when the document cannot be opened
    fn open(&self, path: &Path) -> Result<(), SceneError>;

    /// Replace the current document with an empty, untitled one
    ///
    /// # Errors
    /// Returns [`SceneError`] when the host refuses
    fn new_scene(&self) -> Result<(), SceneError>;

    /// Save the current document to `path`, which becomes its new location
    ///
    /// # Errors
    /// Returns [`SceneError`] when nothing is open or the write fails
    fn save_as(&self, path: &Path) -> Result<(), SceneError>;

    /// Location of the open document, `None` if nothing saved is open
    fn current_path(&self) -> Option<PathBuf>;

    /// Directory of the open document
    fn current_directory(&self) -> Option<PathBuf> {
        self.current_path()
            .and_then(|path| path.parent().map(Path::to_path_buf))
    }

    /// File name of the open document, with extension
    fn current_file_name(&self) -> Option<String> {
        self.current_path()
            .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
    }

    /// File name of the open document, without extension
    fn current_name(&self) -> Option<String> {
        self.current_path()
            .and_then(|path| path.file_stem().map(|n| n.to_string_lossy().into_owned()))
    }

    /// Execute a script file in the host
    ///
    /// # Errors
    /// Returns [`SceneError::Unsupported`] unless the host supports scripting
    fn execute_file(&self, _path: &Path) -> Result<(), SceneError> {
        Err(SceneError::Unsupported("execute_file"))
    }

    /// Execute inline script source in the host
    ///
    /// # Errors
    /// Returns [`SceneError::Unsupported`] unless the host supports scripting
    fn execute_script(&self, _script: &str, _language: ScriptLanguage) -> Result<(), SceneError> {
        Err(SceneError::Unsupported("execute_script"))
    }

    /// Rename a node in the open document
    ///
    /// Returns `false` when no node named `name` exists.
    ///
    /// # Errors
    /// Returns [`SceneError::Unsupported`] unless the host exposes nodes
    fn rename_node(&self, _name: &str, _new_name: &str) -> Result<bool, SceneError> {
        Err(SceneError::Unsupported("rename_node"))
    }
}

/// Check a path's extension against a list (case-insensitive, no dot)
#[must_use]
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Document {
    Empty,
    Untitled,
    File(PathBuf),
}

/// Headless scene working directly on files
///
/// Opening records the document location, saving copies its bytes to the
/// new location. Scripting and node editing are not available.
#[derive(Debug)]
pub struct StandaloneScene {
    extensions: Vec<String>,
    document: RwLock<Document>,
}

impl StandaloneScene {
    /// Create a scene that understands `extensions`
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            document: RwLock::new(Document::Empty),
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.extensions.iter().cloned())
    }

    /// Document extensions this scene understands
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for StandaloneScene {
    fn default() -> Self {
        Self::from_config(&SceneConfig::default())
    }
}

impl SceneHandle for StandaloneScene {
    fn is_valid_extension(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }

    fn open(&self, path: &Path) -> Result<(), SceneError> {
        if !self.exists(path) {
            return Err(SceneError::NotFound(path.to_path_buf()));
        }
        if !self.is_valid_extension(path) {
            return Err(SceneError::InvalidExtension(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), "opened scene");
        *self.document.write() = Document::File(path.to_path_buf());
        Ok(())
    }

    fn new_scene(&self) -> Result<(), SceneError> {
        *self.document.write() = Document::Untitled;
        Ok(())
    }

    fn save_as(&self, path: &Path) -> Result<(), SceneError> {
        let document = self.document.read().clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SceneError::io_error(parent, e))?;
        }

        match document {
            Document::Empty => return Err(SceneError::NoDocument),
            Document::Untitled => {
                fs::write(path, b"").map_err(|e| SceneError::io_error(path, e))?;
            }
            Document::File(source) => {
                if source != path {
                    fs::copy(&source, path).map_err(|e| SceneError::io_error(&source, e))?;
                }
            }
        }

        tracing::debug!(path = %path.display(), "saved scene");
        *self.document.write() = Document::File(path.to_path_buf());
        Ok(())
    }

    fn current_path(&self) -> Option<PathBuf> {
        match &*self.document.read() {
            Document::File(path) => Some(path.clone()),
            Document::Empty | Document::Untitled => None,
        }
    }
}
