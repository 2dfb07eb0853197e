//! `wfproof` command-line interface
//!
//! Operates on JSON files: a definition draft, a list of step reports, or
//! an exported instance. Results are printed to stdout as pretty JSON.

mod error;

pub use error::{CliError, CliResult};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use workflow_service::{
    telemetry, validate, LocalNotary, NewInstance, ServiceConfig, StepReport, ValidationResult,
    WorkflowService,
};
use workflow_types::{WorkflowDefinition, WorkflowInstance};

/// Workflow proof CLI
#[derive(Parser)]
#[command(name = "wfproof")]
#[command(about = "Validate workflow definitions and verify tamper-evident instance histories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WFPROOF_CONFIG")]
    config: Option<String>,

    /// Log level; overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Check a definition draft and list its violations
    Validate {
        /// Definition JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Register a definition and print it with its content address
    Register {
        /// Definition JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create an instance and append step reports in order
    Replay {
        /// Definition JSON file
        #[arg(short, long)]
        definition: PathBuf,

        /// JSON array of step reports
        #[arg(short, long)]
        steps: PathBuf,

        /// Instance assignee
        #[arg(short, long, default_value = "operator")]
        assignee: String,
    },

    /// Verify an exported instance against its definition
    Verify {
        /// Definition JSON file
        #[arg(short, long)]
        definition: PathBuf,

        /// Instance JSON file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

/// Run a parsed command line
pub async fn run(cli: Cli) -> CliResult<ExitCode> {
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    telemetry::init(&config.logging);

    let notary_enabled = config.notary.enabled;
    let mut service = WorkflowService::new(config);
    if notary_enabled {
        service = service.with_notary(Arc::new(LocalNotary::new()));
    }

    let code = match cli.command {
        Commands::Validate { file } => validate_command(&file)?,
        Commands::Register { file } => register_command(&service, &file).await?,
        Commands::Replay {
            definition,
            steps,
            assignee,
        } => replay_command(&service, &definition, &steps, assignee).await?,
        Commands::Verify {
            definition,
            instance,
        } => verify_command(&service, &definition, &instance).await?,
    };

    service.flush_anchors().await;
    Ok(code)
}

fn validate_command(file: &Path) -> CliResult<ExitCode> {
    let draft: WorkflowDefinition = read_json(file)?;
    match validate(&draft) {
        ValidationResult::Valid => {
            println!("Valid");
            Ok(ExitCode::SUCCESS)
        }
        ValidationResult::Invalid(violations) => {
            for violation in &violations {
                println!("{}", violation);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn register_command(service: &WorkflowService, file: &Path) -> CliResult<ExitCode> {
    let draft: WorkflowDefinition = read_json(file)?;
    let registered = service.submit_definition(draft).await?;
    print_json(&serde_json::json!({
        "address": registered.address(),
        "registered": registered.as_ref(),
    }))?;
    Ok(ExitCode::SUCCESS)
}

async fn replay_command(
    service: &WorkflowService,
    definition: &Path,
    steps: &Path,
    assignee: String,
) -> CliResult<ExitCode> {
    let draft: WorkflowDefinition = read_json(definition)?;
    let reports: Vec<StepReport> = read_json(steps)?;

    let registered = service.submit_definition(draft).await?;
    let instance = service
        .create_instance(
            registered.id(),
            Some(registered.version()),
            NewInstance::new(assignee),
        )
        .await?;

    let mut code = ExitCode::SUCCESS;
    for (index, report) in reports.into_iter().enumerate() {
        if let Err(error) = service.report_step(&instance.id, report).await {
            eprintln!("step {} rejected: {}", index, error);
            code = ExitCode::FAILURE;
            break;
        }
    }

    let report = service.get_report(&instance.id).await?;
    print_json(&serde_json::json!({
        "instance": service.get_instance(&instance.id)?,
        "report": report,
    }))?;
    Ok(code)
}

async fn verify_command(
    service: &WorkflowService,
    definition: &Path,
    instance: &Path,
) -> CliResult<ExitCode> {
    let draft: WorkflowDefinition = read_json(definition)?;
    let instance: WorkflowInstance = read_json(instance)?;

    service.submit_definition(draft).await?;
    let report = service.import_instance(instance).await?;
    print_json(&report)?;

    Ok(if report.integrity_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
