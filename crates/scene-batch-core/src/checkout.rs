//! Version-control checkout service
//!
//! Best-effort side effects requested before a file is modified. Failures
//! are reported to the caller, who logs them and carries on.

use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// When the manager requests the checkout relative to opening the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutOrder {
    /// Check out, then open
    #[default]
    BeforeOpen,
    /// Open, then check out
    AfterOpen,
}

/// Version-control checkout capability
pub trait CheckoutService: Send + Sync + fmt::Debug {
    /// Open an existing file for edit
    ///
    /// # Errors
    /// Returns [`CheckoutError`] when the version-control system refuses
    fn checkout(&self, path: &Path) -> Result<(), CheckoutError>;

    /// Mark a new file for add
    ///
    /// # Errors
    /// Returns [`CheckoutError`] when the version-control system refuses
    fn add(&self, path: &Path) -> Result<(), CheckoutError>;
}

/// Checkout service that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckout;

impl CheckoutService for NoCheckout {
    fn checkout(&self, _path: &Path) -> Result<(), CheckoutError> {
        Ok(())
    }

    fn add(&self, _path: &Path) -> Result<(), CheckoutError> {
        Ok(())
    }
}

/// Checkout service running external commands
///
/// Each command line gets the file path appended as its last argument,
/// e.g. `["p4", "edit"]` runs `p4 edit <path>`.
#[derive(Debug, Clone, Default)]
pub struct CommandCheckout {
    edit_command: Vec<String>,
    add_command: Vec<String>,
}

impl CommandCheckout {
    /// Create from explicit command lines
    #[must_use]
    pub fn new(edit_command: Vec<String>, add_command: Vec<String>) -> Self {
        Self {
            edit_command,
            add_command,
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn from_config(config: &CheckoutConfig) -> Self {
        Self::new(config.edit_command.clone(), config.add_command.clone())
    }

    fn run(&self, argv: &[String], label: &'static str, path: &Path) -> Result<(), CheckoutError> {
        let (program, args) = argv
            .split_first()
            .ok_or(CheckoutError::NotConfigured(label))?;

        tracing::debug!(command = %argv.join(" "), path = %path.display(), "running {label}");
        let output = Command::new(program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|source| CheckoutError::Spawn {
                command: program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CheckoutError::CommandFailed {
                command: argv.join(" "),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl CheckoutService for CommandCheckout {
    fn checkout(&self, path: &Path) -> Result<(), CheckoutError> {
        self.run(&self.edit_command, "edit", path)
    }

    fn add(&self, path: &Path) -> Result<(), CheckoutError> {
        self.run(&self.add_command, "add", path)
    }
}
