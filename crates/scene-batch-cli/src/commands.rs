//! Subcommand implementations
//!
//! Each command writes its human-readable output to the supplied writer so
//! it can be exercised without a terminal.

use anyhow::{Context, Result};
use scene_batch_core::persistence;
use scene_batch_core::registry::TaskPackage;
use scene_batch_core::{
    BatchConfig, BatchSummary, CheckoutService, CommandCheckout, ExecuteOptions, FileStatus,
    SceneHandle, StandaloneScene, TaskManager, TaskRegistry,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs of the `run` command
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Task list document
    pub tasks: PathBuf,
    /// Scene files to process, in order
    pub files: Vec<PathBuf>,
    /// Request checkouts even when the config leaves them off
    pub checkout: bool,
}

/// Build the task registry from the configured packages
///
/// # Errors
/// Returns an error when a configured package is unknown
pub fn build_registry(config: &BatchConfig, extra: &[TaskPackage]) -> Result<Arc<TaskRegistry>> {
    let registry = TaskRegistry::from_config(&config.registry, extra)
        .context("failed to build task registry")?;
    Ok(Arc::new(registry))
}

/// Build the checkout service from the configured command lines
#[must_use]
pub fn build_checkout(config: &BatchConfig) -> Arc<dyn CheckoutService> {
    Arc::new(CommandCheckout::from_config(&config.checkout))
}

/// Run a task list over `request.files`
///
/// Prints one progress line per processed file and a final summary.
///
/// # Errors
/// Returns an error when the task list cannot be loaded. Per-file failures
/// are reported in the returned summary instead.
pub fn run(
    config: &BatchConfig,
    registry: &Arc<TaskRegistry>,
    request: &RunRequest,
    out: &mut dyn Write,
) -> Result<BatchSummary> {
    let scene: Arc<dyn SceneHandle> = Arc::new(StandaloneScene::from_config(&config.scene));
    let manager = TaskManager::with_checkout(scene, registry, build_checkout(config));

    let document = persistence::read(&request.tasks)
        .with_context(|| format!("failed to read task list {}", request.tasks.display()))?;
    persistence::restore(&manager, &document)
        .with_context(|| format!("failed to load task list {}", request.tasks.display()))?;

    tracing::info!(
        tasks = manager.len(),
        files = request.files.len(),
        "starting batch"
    );

    let mut write_error = None;
    let options = ExecuteOptions::new()
        .with_checkout(request.checkout || config.checkout.enabled)
        .with_checkout_order(config.checkout.order)
        .with_post_callback(|path, progress| {
            if write_error.is_none() {
                if let Err(err) = writeln!(out, "[{progress:5.1}%] {}", path.display()) {
                    write_error = Some(err);
                }
            }
        });
    let summary = manager.execute(&request.files, options);

    if let Some(err) = write_error {
        return Err(err).context("failed to write progress");
    }
    print_summary(&summary, out)?;
    Ok(summary)
}

fn print_summary(summary: &BatchSummary, out: &mut dyn Write) -> Result<()> {
    for outcome in &summary.outcomes {
        if let Some(error) = &outcome.open_error {
            writeln!(out, "warning {}: {error}", outcome.path.display())?;
        }
        match &outcome.status {
            FileStatus::Processed { .. } => {}
            FileStatus::Skipped => {
                writeln!(out, "skipped {}: file not found", outcome.path.display())?;
            }
            FileStatus::Failed {
                task_index,
                task_title,
                error,
                ..
            } => writeln!(
                out,
                "failed  {}: task #{task_index} '{task_title}': {error}",
                outcome.path.display()
            )?,
        }
    }

    writeln!(
        out,
        "{} processed, {} skipped, {} failed in {}",
        summary.processed(),
        summary.skipped(),
        summary.failed(),
        scene_batch_core::manager::format_elapsed(summary.elapsed)
    )?;
    Ok(())
}

/// Print every registered task kind with its title
///
/// # Errors
/// Returns an error when writing fails
pub fn list_tasks(registry: &TaskRegistry, out: &mut dyn Write) -> Result<()> {
    for class in registry.classes() {
        writeln!(out, "{:<20} {}", class.kind, class.title)?;
    }
    Ok(())
}

/// Load a task list document and print its tasks
///
/// # Errors
/// Returns an error when the document cannot be read or a record cannot be
/// rebuilt through the registry
pub fn validate(registry: &Arc<TaskRegistry>, path: &Path, out: &mut dyn Write) -> Result<()> {
    let document = persistence::read(path)
        .with_context(|| format!("failed to read task list {}", path.display()))?;
    let tasks = document
        .instantiate(registry)
        .with_context(|| format!("invalid task list {}", path.display()))?;

    writeln!(out, "{}: {} task(s)", path.display(), tasks.len())?;
    for (index, task) in tasks.iter().enumerate() {
        let fields = serde_json::Value::Object(task.fields());
        writeln!(out, "{index:>3}. {} {fields}", task.title())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_tasks(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("tasks.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn list_tasks_prints_registry_order() {
        let registry = TaskRegistry::with_defaults();
        let mut out = Vec::new();
        list_tasks(&registry, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let kinds: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "NewSceneTask",
                "OpenSceneTask",
                "SaveSceneTask",
                "RenameNodeTask",
                "CustomScriptTask"
            ]
        );
        assert!(text.contains("Save Scene"));
    }

    #[test]
    fn validate_reports_each_task() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_tasks(
            temp.path(),
            r#"{"version": 1, "tasks": [
                {"$type": "RenameNodeTask", "search": "a"},
                {"$type": "NewSceneTask"}
            ]}"#,
        );
        let registry = Arc::new(TaskRegistry::with_defaults());
        let mut out = Vec::new();
        validate(&registry, &path, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("2 task(s)"));
        assert!(text.contains("0. Rename Node"));
        assert!(text.contains("1. New Scene"));
    }

    #[test]
    fn validate_rejects_unknown_kind() {
        let temp = TempDir::new().expect("tempdir");
        let path = write_tasks(temp.path(), r#"{"version": 1, "tasks": [{"$type": "Nope"}]}"#);
        let registry = Arc::new(TaskRegistry::with_defaults());
        let err = validate(&registry, &path, &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("task kind not found: 'Nope'"));
    }

    #[test]
    fn run_saves_renamed_copies() {
        let temp = TempDir::new().expect("tempdir");
        let out_dir = temp.path().join("out");
        let scene_a = temp.path().join("a_v1.ma");
        fs::write(&scene_a, "a").unwrap();
        let missing = temp.path().join("gone_v1.ma");

        let tasks = serde_json::json!({
            "version": 1,
            "tasks": [{
                "$type": "SaveSceneTask",
                "directory": out_dir,
                "search": "_v1",
                "replace": "_v2"
            }]
        });
        let tasks_path = write_tasks(temp.path(), &tasks.to_string());

        let config = BatchConfig::default();
        let registry = build_registry(&config, &[]).unwrap();
        let request = RunRequest {
            tasks: tasks_path,
            files: vec![missing, scene_a],
            checkout: false,
        };
        let mut out = Vec::new();
        let summary = run(&config, &registry, &request, &mut out).unwrap();

        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(fs::read_to_string(out_dir.join("a_v2.ma")).unwrap(), "a");

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[100.0%]"));
        assert!(text.contains("skipped"));
        assert!(text.contains("1 processed, 1 skipped, 0 failed"));
    }

    #[test]
    fn run_fails_before_touching_files_on_bad_document() {
        let temp = TempDir::new().expect("tempdir");
        let tasks_path =
            write_tasks(temp.path(), r#"{"version": 1, "tasks": [{"$type": "Nope"}]}"#);
        let config = BatchConfig::default();
        let registry = build_registry(&config, &[]).unwrap();
        let request = RunRequest {
            tasks: tasks_path,
            files: vec![temp.path().join("a.ma")],
            checkout: false,
        };
        assert!(run(&config, &registry, &request, &mut Vec::new()).is_err());
    }
}
