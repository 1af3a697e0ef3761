#![warn(missing_docs)]
//! runbench CLI Library
//!
//! Run orchestration plus the `runbench` command line. The binary runs shell
//! commands named in the test config; embed the harness with [`run_with`] to
//! drive your own [`BenchmarkUnit`] through the same CLI.
//!
//! # Example
//!
//! ```ignore
//! use runbench::prelude::*;
//!
//! struct Insert;
//!
//! impl BenchmarkUnit for Insert {
//!     fn setup(&mut self) -> Result<(), UnitError> { Ok(()) }
//!     fn execute(&mut self) -> Result<RunRecord, UnitError> {
//!         timed(|| Ok(RunRecord::new().with("rows", 1000)))
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     runbench_cli::run_with(|_config| Ok(Insert))
//! }
//! ```

mod config;
mod duration;
mod executor;

pub use config::{
    ConfigError, HarnessConfig, LoggingConfig, OutputConfig, OutputTarget, RunMode, RunnerConfig,
    TestConfig,
};
pub use duration::{DurationPolicy, parse_duration, resolve_duration};
pub use executor::{
    Clock, HostInfo, HostProbe, ManualClock, Orchestrator, RunError, SystemClock, SystemHost,
    build_report, collect_metadata,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use runbench_core::{BenchmarkUnit, CommandUnit};
use runbench_report::{TestReport, diff_reports, generate_json_report, write_json};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// runbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "runbench")]
#[command(author, version, about = "runbench - repeated-run benchmark harness")]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Verbose output (same as --log debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a test described by a YAML or TOML config
    Test {
        /// Test configuration file
        config: PathBuf,

        /// Report file (stdout if not specified); snapshots go next to it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accept durations that parse to zero instead of rejecting them
        #[arg(long)]
        permissive_duration: bool,

        /// Write the report as a single line
        #[arg(long)]
        compact: bool,
    },
    /// Diff two saved reports (changed - base)
    Diff {
        /// Baseline report
        base: PathBuf,

        /// Report to compare against the baseline
        changed: PathBuf,

        /// Include both reports' metadata in the output
        #[arg(long)]
        metadata: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default runbench.toml
    Init {
        /// Write the template to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the runbench CLI, executing the shell commands named in each test config.
pub fn run() -> anyhow::Result<()> {
    run_with(command_unit)
}

/// Run the runbench CLI with a custom benchmark unit.
///
/// `factory` is called once per `test` invocation, after the config has been
/// loaded and validated.
pub fn run_with<U, F>(factory: F) -> anyhow::Result<()>
where
    U: BenchmarkUnit,
    F: FnOnce(&TestConfig) -> anyhow::Result<U>,
{
    let cli = Cli::parse();
    run_with_cli(cli, factory)
}

/// Run the runbench CLI with pre-parsed arguments.
pub fn run_with_cli<U, F>(cli: Cli, factory: F) -> anyhow::Result<()>
where
    U: BenchmarkUnit,
    F: FnOnce(&TestConfig) -> anyhow::Result<U>,
{
    // Discover runbench.toml configuration (CLI flags override)
    let harness = HarnessConfig::discover().unwrap_or_default();
    init_logging(&cli, &harness)?;

    match cli.command {
        Commands::Test {
            ref config,
            ref output,
            permissive_duration,
            compact,
        } => {
            let policy = if permissive_duration {
                DurationPolicy::Permissive
            } else {
                harness.runner.duration_policy
            };
            let target = OutputTarget::from_path(output.clone());
            let pretty = harness.output.pretty && !compact;
            let progress = !cli.quiet && std::io::stderr().is_terminal();
            let report = run_test(config, &target, policy, &harness, progress, factory)?;
            write_report(&report, &target, pretty)?;
        }
        Commands::Diff {
            ref base,
            ref changed,
            metadata,
            ref output,
        } => {
            let base_report = read_json(base)?;
            let changed_report = read_json(changed)?;
            let diff = diff_reports(&base_report, &changed_report, metadata)?;
            write_report(&diff, &OutputTarget::from_path(output.clone()), true)?;
        }
        Commands::Init { ref output, force } => match output {
            Some(path) => {
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                std::fs::write(path, HarnessConfig::default_toml())?;
                info!(path = %path.display(), "wrote harness config");
            }
            None => print!("{}", HarnessConfig::default_toml()),
        },
    }

    Ok(())
}

/// Load, validate and run one test config.
fn run_test<U, F>(
    config_path: &Path,
    target: &OutputTarget,
    policy: DurationPolicy,
    harness: &HarnessConfig,
    progress: bool,
    factory: F,
) -> anyhow::Result<TestReport>
where
    U: BenchmarkUnit,
    F: FnOnce(&TestConfig) -> anyhow::Result<U>,
{
    let config = TestConfig::load(config_path)
        .with_context(|| format!("loading test config {}", config_path.display()))?;
    let mode = config.validate(policy)?;
    info!(test = %config.test_name, id = %config.test_id, ?mode, "loaded test config");

    let unit = factory(&config)?;
    let report = Orchestrator::new(unit, target.clone())
        .with_duration_policy(policy)
        .with_snapshot_dir(&harness.output.directory)
        .with_progress(progress)
        .execute(&config)?;

    debug!("report:\n{}", generate_json_report(&report)?);
    Ok(report)
}

/// Build a [`CommandUnit`] from the `command` and optional `setup_command`
/// parameters of a test config.
pub fn command_unit(config: &TestConfig) -> anyhow::Result<CommandUnit> {
    let command = config.param_str("command").ok_or_else(|| {
        anyhow::anyhow!(
            "test `{}` has no `command` parameter to run",
            config.test_name
        )
    })?;

    let unit = CommandUnit::new(command);
    Ok(match config.param_str("setup_command") {
        Some(setup) => unit.with_setup(setup),
        None => unit,
    })
}

fn init_logging(cli: &Cli, harness: &HarnessConfig) -> anyhow::Result<()> {
    let level = match (&cli.log, cli.verbose) {
        (Some(level), _) => level.to_ascii_lowercase(),
        (None, true) => "debug".to_string(),
        (None, false) => harness.logging.level.to_ascii_lowercase(),
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("runbench={}", level))
            .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))?,
    };

    // Ignore a subscriber installed by an embedding program
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading report {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing report {}", path.display()))
}

/// Write `value` as JSON to `target` and flush it.
pub fn write_report<T: Serialize + ?Sized>(
    value: &T,
    target: &OutputTarget,
    pretty: bool,
) -> Result<(), RunError> {
    match target {
        OutputTarget::File(path) => {
            let report_err = |source| RunError::Report {
                target: path.display().to_string(),
                source,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| report_err(serde_json::Error::io(e)))?;
            }
            let file = File::create(path).map_err(|e| report_err(serde_json::Error::io(e)))?;
            write_json(value, BufWriter::new(file), pretty).map_err(report_err)?;
            info!(path = %path.display(), "report written");
        }
        OutputTarget::Stdout => {
            write_json(value, std::io::stdout().lock(), pretty).map_err(|source| {
                RunError::Report {
                    target: "stdout".to_string(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}
