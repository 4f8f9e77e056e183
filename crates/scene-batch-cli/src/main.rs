//! `scene-batch` binary

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scene_batch_cli::{build_registry, list_tasks, logging, run, validate, RunRequest};
use scene_batch_core::config::CONFIG_FILE_NAME;
use scene_batch_core::BatchConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn cli() -> Command {
    Command::new("scene-batch")
        .version(scene_batch_core::VERSION)
        .about("Batch-process scene files through a configurable task pipeline")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (defaults to ./scene-batch.toml when present)"),
        )
        .subcommand(
            Command::new("run")
                .about("Run a task list over scene files")
                .arg(
                    Arg::new("tasks")
                        .long("tasks")
                        .short('t')
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Task list document (JSON)"),
                )
                .arg(
                    Arg::new("checkout")
                        .long("checkout")
                        .action(ArgAction::SetTrue)
                        .help("Check out each file through version control before processing"),
                )
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scene files to process, in order"),
                ),
        )
        .subcommand(Command::new("tasks").about("List registered task kinds"))
        .subcommand(
            Command::new("validate")
                .about("Load a task list and print its tasks")
                .arg(
                    Arg::new("document")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Task list document (JSON)"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<BatchConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => BatchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => BatchConfig::load_or_default(Path::new(CONFIG_FILE_NAME))
            .with_context(|| format!("failed to load {CONFIG_FILE_NAME}")),
    }
}

fn dispatch(matches: &ArgMatches) -> Result<ExitCode> {
    let config = load_config(matches)?;
    logging::init(&config.logging)?;

    let registry = build_registry(&config, &[])?;
    let mut stdout = std::io::stdout().lock();

    match matches.subcommand() {
        Some(("run", args)) => {
            let request = RunRequest {
                tasks: args
                    .get_one::<PathBuf>("tasks")
                    .cloned()
                    .context("missing --tasks")?,
                files: args
                    .get_many::<PathBuf>("files")
                    .map(|files| files.cloned().collect())
                    .unwrap_or_default(),
                checkout: args.get_flag("checkout"),
            };
            let summary = run(&config, &registry, &request, &mut stdout)?;
            Ok(if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("tasks", _)) => {
            list_tasks(&registry, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("validate", args)) => {
            let document = args
                .get_one::<PathBuf>("document")
                .context("missing task list document")?;
            validate(&registry, document, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match dispatch(&matches) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "scene-batch failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
