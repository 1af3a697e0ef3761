//! Configuration
//!
//! Two layers:
//! - [`TestConfig`]: one test, loaded from YAML (or TOML by extension). Names
//!   the test, says how many runs or for how long, and carries free-form
//!   parameters for the benchmark unit.
//! - [`HarnessConfig`]: harness defaults from a `runbench.toml` discovered by
//!   walking up from the current directory. CLI flags override it.

use crate::duration::{DurationPolicy, resolve_duration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors in test configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// YAML did not match the test config schema
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML did not match the test config schema
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Values out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Duration that does not parse to a positive length
    #[error("Malformed duration `{0}`: expected e.g. \"1h30m\", \"45s\" with a non-zero total")]
    MalformedDuration(String),
}

/// Configuration of a single test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Human-readable test name
    pub test_name: String,
    /// Identifier of this test instance
    pub test_id: String,
    /// Fixed number of runs (ignored when `duration` is set)
    #[serde(default = "default_num_runs")]
    pub num_runs: u32,
    /// Wall-clock budget such as `"1h30m"`; takes precedence over `num_runs`
    #[serde(default)]
    pub duration: Option<String>,
    /// Include every raw run record in the final report
    #[serde(default)]
    pub show_runs: bool,
    /// Unit-specific parameters (everything not listed above)
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

fn default_num_runs() -> u32 {
    1
}

/// How the run loop terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Exactly this many runs
    Fixed(u32),
    /// Keep starting runs until this much wall-clock time has passed
    Timed(Duration),
}

impl TestConfig {
    /// Minimal config for a fixed number of runs
    pub fn new(test_name: impl Into<String>, test_id: impl Into<String>, num_runs: u32) -> Self {
        Self {
            test_name: test_name.into(),
            test_id: test_id.into(),
            num_runs,
            duration: None,
            show_runs: false,
            params: BTreeMap::new(),
        }
    }

    /// Set a wall-clock budget
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Include raw runs in the report
    pub fn with_show_runs(mut self, show_runs: bool) -> Self {
        self.show_runs = show_runs;
        self
    }

    /// Load a test config; `.toml` files are read as TOML, everything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolve how the run loop terminates, applying `policy` to the duration
    pub fn run_mode(&self, policy: DurationPolicy) -> Result<RunMode, ConfigError> {
        match &self.duration {
            Some(text) => resolve_duration(text, policy).map(RunMode::Timed),
            None => Ok(RunMode::Fixed(self.num_runs)),
        }
    }

    /// Check a config loaded from disk before anything runs
    pub fn validate(&self, policy: DurationPolicy) -> Result<RunMode, ConfigError> {
        if self.test_name.trim().is_empty() {
            return Err(ConfigError::Invalid("test_name must not be empty".to_string()));
        }
        if self.test_id.trim().is_empty() {
            return Err(ConfigError::Invalid("test_id must not be empty".to_string()));
        }
        if self.duration.is_none() && self.num_runs == 0 {
            return Err(ConfigError::Invalid(
                "num_runs must be a positive integer".to_string(),
            ));
        }
        self.run_mode(policy)
    }

    /// String parameter for the benchmark unit
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_yaml::Value::as_str)
    }
}

/// Where the final report goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to this file
    File(PathBuf),
    /// Write to standard output
    Stdout,
}

impl OutputTarget {
    /// File target if a path is given, stdout otherwise
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(OutputTarget::File).unwrap_or(OutputTarget::Stdout)
    }

    /// Snapshot file for this target.
    ///
    /// File targets get the snapshot suffix appended; stdout has no name, so
    /// the snapshot lands in `fallback_dir` named after the test id.
    pub fn snapshot_path(&self, fallback_dir: &Path, test_id: &str) -> PathBuf {
        match self {
            OutputTarget::File(path) => runbench_report::snapshot_path(path),
            OutputTarget::Stdout => {
                runbench_report::snapshot_path(&fallback_dir.join(format!("{}.json", test_id)))
            }
        }
    }
}

/// Harness configuration (`runbench.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// "strict" or "permissive" handling of zero-length durations
    #[serde(default)]
    pub duration_policy: DurationPolicy,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print the final report
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Directory for snapshots when the report goes to stdout
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
            directory: default_output_dir(),
        }
    }
}

fn default_pretty() -> bool {
    true
}
fn default_output_dir() -> String {
    "target/runbench".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("runbench.toml");
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), "ignoring runbench.toml: {e}");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# runbench configuration

[runner]
# How to treat a test duration that parses to zero ("", "soon", "0s"):
# "strict" rejects the test before it starts, "permissive" runs nothing
duration_policy = "strict"

[output]
# Pretty-print the final JSON report
pretty = true
# Where snapshots go when the report is written to stdout
directory = "target/runbench"

[logging]
# error, warn, info, debug, trace (RUST_LOG takes precedence)
level = "info"
"#
        .to_string()
    }
}
