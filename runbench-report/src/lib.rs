#![warn(missing_docs)]
//! runbench Report - Output and Persistence
//!
//! Everything that leaves the process:
//! - Final report structures ([`TestReport`], [`Metadata`])
//! - JSON writing with explicit flush
//! - Per-run snapshot sinks for duration-bounded tests
//! - Diffing of two saved reports

mod diff;
mod json;
mod report;
mod snapshot;

pub use diff::{DiffError, Side, diff_reports};
pub use json::{generate_json_report, write_json};
pub use report::{MemoryUsage, Metadata, TestReport};
pub use snapshot::{
    FileSnapshots, JsonLinesSink, MemorySink, MemorySnapshots, SNAPSHOT_SUFFIX, SnapshotError,
    SnapshotEvent, SnapshotSink, SnapshotStore, snapshot_path,
};
