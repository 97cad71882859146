// crates/rt-cli/src/main.rs
// ============================================================================
// Module: RT CLI Entry Point
// Description: Command dispatcher for config checks, validators and records.
// Purpose: Offline tooling around the RT deployment state core.
// Dependencies: clap, rt-config, rt-core, rt-deployment-state, serde_json, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `rt` binary exposes the parts of RT that need no cloud session:
//! loading and checking `rt.hcl.tpl`, running identifier validators, and
//! migrating stored records to the current schema. Backends are initialized
//! against in-memory object stores, so `config check` never touches a bucket.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rt_config::RtConfig;
use rt_core::ApplicationData;
use rt_core::DeploymentData;
use rt_core::RT_VERSION;
use rt_core::SlotData;
use rt_core::VersionedRecord;
use rt_core::validators;
use rt_deployment_state::BackendKindRegistry;
use rt_deployment_state::DeploymentState;
use rt_deployment_state::InMemoryConnector;
use rt_deployment_state::object_store::MAX_RECORD_BYTES;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "RT_LOG";
/// Log filter used when `RT_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rt", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print version information.
    Version,
    /// Config document utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Run one identifier validator.
    Validate {
        /// Validator to run.
        #[arg(value_enum)]
        kind: ValidatorKind,
        /// Value to validate.
        value: String,
    },
    /// Stored record utilities.
    Record {
        /// Selected record subcommand.
        #[command(subcommand)]
        command: RecordCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load the config and initialize every backend offline.
    Check {
        /// Environment substituted into the template.
        #[arg(long = "env", default_value = "")]
        environment: String,
        /// Account id substituted into the template.
        #[arg(long, default_value = "")]
        account_id: String,
        /// Config file or directory containing it.
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Record subcommands.
#[derive(Subcommand, Debug)]
enum RecordCommand {
    /// Decode a record, run migrations and print the current form.
    Migrate {
        /// Record kind.
        #[arg(long, value_enum)]
        kind: RecordKind,
        /// Record file.
        file: PathBuf,
    },
}

/// Validators reachable from the CLI.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum ValidatorKind {
    /// Environment name.
    Environment,
    /// Application name.
    Application,
    /// Version string.
    Version,
    /// Slot identifier.
    SlotId,
    /// Namespace.
    Namespace,
    /// Non-empty string.
    NonEmpty,
    /// Existing filesystem path.
    Path,
    /// Percentage between 0 and 1.
    Percentage,
    /// Duration.
    Duration,
}

/// Stored record kinds.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum RecordKind {
    /// Application record.
    Application,
    /// Slot record.
    Slot,
    /// Deployment record.
    Deployment,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Version => command_version(),
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Validate {
            kind,
            value,
        } => command_validate(kind, &value),
        Commands::Record {
            command,
        } => command_record(command),
    }
}

/// Installs the stderr log subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `version` command.
fn command_version() -> CliResult<ExitCode> {
    let commit = option_env!("RT_GIT_COMMIT").unwrap_or("dev");
    write_stdout_line(&format!("rt {RT_VERSION} ({commit})"))?;
    write_stdout_line(&format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config` subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check {
            environment,
            account_id,
            path,
        } => {
            let (config, file_path) = RtConfig::load(&environment, &account_id, &path)
                .map_err(|err| CliError::new(err.to_string()))?;
            tracing::debug!(path = %file_path.display(), "resolved config file");
            let kinds = BackendKindRegistry::with_builtin_kinds(Arc::new(InMemoryConnector::new()));
            let state = DeploymentState::new(&kinds, &config.deployment_state)
                .map_err(|err| CliError::new(err.to_string()))?;
            state.are_backends_ready().map_err(|err| CliError::new(err.to_string()))?;
            write_stdout_line(&format!("config: {}", file_path.display()))?;
            for kind in state.kinds() {
                write_stdout_line(&format!("deployment_state {kind}: ok"))?;
            }
            match &config.remote_state {
                Some(remote) => write_stdout_line(&format!("remote_state {}: ok", remote.backend))?,
                None => write_stdout_line("remote_state: none")?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the `validate` command.
fn command_validate(kind: ValidatorKind, value: &str) -> CliResult<ExitCode> {
    let name = "value";
    let result = match kind {
        ValidatorKind::Environment => validators::environment_name(name, value),
        ValidatorKind::Application => validators::application_name(name, value),
        ValidatorKind::Version => validators::version(name, value),
        ValidatorKind::SlotId => validators::slot_id(name, value),
        ValidatorKind::Namespace => validators::namespace(name, value),
        ValidatorKind::NonEmpty => validators::non_empty_string(name, value),
        ValidatorKind::Path => validators::valid_path(name, value),
        ValidatorKind::Duration => validators::duration(name, value),
        ValidatorKind::Percentage => {
            let parsed: f64 = value
                .parse()
                .map_err(|err| CliError::new(format!("{name}: {value} is not a number: {err}")))?;
            validators::percentage(name, parsed)
        }
    };
    result.map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line("valid")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `record` subcommands.
fn command_record(command: RecordCommand) -> CliResult<ExitCode> {
    match command {
        RecordCommand::Migrate {
            kind,
            file,
        } => {
            let bytes = read_record(&file)?;
            tracing::debug!(path = %file.display(), bytes = bytes.len(), "migrating record");
            let migrated = match kind {
                RecordKind::Application => migrate_record::<ApplicationData>(&bytes)?,
                RecordKind::Slot => migrate_record::<SlotData>(&bytes)?,
                RecordKind::Deployment => migrate_record::<DeploymentData>(&bytes)?,
            };
            write_stdout_line(&migrated)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a record file with the stored-record size limit.
fn read_record(path: &Path) -> CliResult<Vec<u8>> {
    let bytes =
        fs::read(path).map_err(|err| CliError::new(format!("open {}: {err}", path.display())))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(CliError::new(format!("{} exceeds the record size limit", path.display())));
    }
    Ok(bytes)
}

/// Decodes a record of kind `R` and renders it at the current version.
fn migrate_record<R: VersionedRecord>(bytes: &[u8]) -> CliResult<String> {
    let mut record = R::from_json(bytes).map_err(|err| CliError::new(err.to_string()))?;
    record.set_schema_version(R::CURRENT_VERSION);
    serde_json::to_string_pretty(&record).map_err(|err| CliError::new(err.to_string()))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
