//! Test Executor
//!
//! Runs one benchmark unit for one test and assembles its report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! TestConfig (YAML/TOML) + BenchmarkUnit
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Setup, fixed or timed run loop, snapshots
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Aggregate runs, attach metadata
//! └──────┬──────┘
//!        │
//!        ▼
//!    TestReport
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Orchestrator and run loops
//! - [`report`] - Report assembly
//! - [`metadata`] - Host metadata collection
//! - [`clock`] - Injectable time source for the timed loop

mod clock;
mod execution;
mod metadata;
mod report;

// Re-export public API
pub use clock::{Clock, ManualClock, SystemClock};
pub use execution::{Orchestrator, RunError};
pub use metadata::{HostInfo, HostProbe, SystemHost, collect_metadata};
pub use report::build_report;
