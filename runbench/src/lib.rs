#![warn(missing_docs)]
//! # runbench
//!
//! Harness for repeated benchmark runs.
//!
//! runbench drives a [`BenchmarkUnit`] through one test and reports the mean
//! of every metric it returned:
//! - **Fixed count**: run exactly `num_runs` times
//! - **Duration bounded**: run until a wall-clock budget such as `"1h30m"` is
//!   spent, writing and flushing each run to a snapshot file as it completes
//!   so a crash loses at most the run in flight
//! - **Schema-less metrics**: each run returns any set of named values; keys
//!   missing from some runs are averaged over the runs that had them
//! - **Host metadata**: OS, CPU, memory and toolchain recorded with the results
//! - **Diffing**: compare two saved reports metric by metric
//!
//! ## Quick Start
//!
//! ```ignore
//! use runbench::prelude::*;
//!
//! struct Lookup { table: Vec<u64> }
//!
//! impl BenchmarkUnit for Lookup {
//!     fn setup(&mut self) -> Result<(), UnitError> {
//!         self.table = (0..1_000_000).collect();
//!         Ok(())
//!     }
//!
//!     fn execute(&mut self) -> Result<RunRecord, UnitError> {
//!         timed(|| {
//!             let hits = self.table.iter().filter(|v| *v % 7 == 0).count();
//!             Ok(RunRecord::new().with("hits", hits))
//!         })
//!     }
//! }
//!
//! let config = TestConfig::new("lookup", "run-1", 10);
//! let report = Orchestrator::new(Lookup { table: vec![] }, OutputTarget::Stdout)
//!     .execute(&config)?;
//! println!("{}", report.results.get("took").unwrap_or_default());
//! ```
//!
//! ## Command Line
//!
//! ```text
//! runbench test bench.yml -o results/report.json
//! runbench diff base.json changed.json --metadata
//! ```

// Re-export core types
pub use runbench_core::{
    BenchmarkUnit, CommandError, CommandUnit, MetricValue, RUN_KEY, RunRecord,
    TOOK_KEY, Timer, UnitError, timed,
};

// Re-export stats
pub use runbench_stats::{AggregateError, AggregateRecord, aggregate, mean};

// Re-export report types
pub use runbench_report::{
    DiffError, FileSnapshots, JsonLinesSink, MemorySnapshots, MemoryUsage, Metadata,
    SNAPSHOT_SUFFIX, SnapshotError, SnapshotEvent, SnapshotSink, SnapshotStore, TestReport,
    diff_reports, snapshot_path, write_json,
};

// Re-export the orchestrator and CLI entry points
pub use runbench_cli::{
    Clock, ConfigError, DurationPolicy, HarnessConfig, HostInfo, HostProbe, ManualClock,
    Orchestrator, OutputTarget, RunError, RunMode, SystemClock, SystemHost, TestConfig,
    collect_metadata, parse_duration, resolve_duration, run, run_with, write_report,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkUnit, DurationPolicy, Orchestrator, OutputTarget, RunRecord, TestConfig,
        TestReport, UnitError, timed,
    };
}
