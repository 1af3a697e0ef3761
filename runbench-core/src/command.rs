//! Shell Command Unit
//!
//! A [`BenchmarkUnit`] that times an external command. Lets the `runbench`
//! binary benchmark arbitrary workloads without writing Rust.

use crate::measure::Timer;
use crate::record::{RunRecord, TOOK_KEY};
use crate::{BenchmarkUnit, UnitError};
use std::process::{Command, Output};
use thiserror::Error;

/// Errors raised by [`CommandUnit`]
#[derive(Debug, Error)]
pub enum CommandError {
    /// The shell could not be started
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure
    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit {
        /// Command line
        command: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured stderr, trimmed
        stderr: String,
    },
}

/// Benchmark unit that runs a shell command per run
#[derive(Debug, Clone)]
pub struct CommandUnit {
    command: String,
    setup_command: Option<String>,
}

impl CommandUnit {
    /// Time `command` on every run
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            setup_command: None,
        }
    }

    /// Run `setup_command` once before the first run
    pub fn with_setup(mut self, setup_command: impl Into<String>) -> Self {
        self.setup_command = Some(setup_command.into());
        self
    }

    /// The timed command
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl BenchmarkUnit for CommandUnit {
    fn setup(&mut self) -> Result<(), UnitError> {
        if let Some(setup) = &self.setup_command {
            tracing::debug!(command = %setup, "running setup command");
            run_shell(setup)?;
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<RunRecord, UnitError> {
        let timer = Timer::start();
        run_shell(&self.command)?;
        let took = timer.stop_millis();

        // a non-zero exit never reaches here, so only the time is recorded
        Ok(RunRecord::new().with(TOOK_KEY, took))
    }
}

fn run_shell(command: &str) -> Result<Output, CommandError> {
    let output = shell(command)
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
