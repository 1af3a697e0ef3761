#![warn(missing_docs)]
//! runbench Core - Benchmark Unit Contract
//!
//! This crate defines what the harness drives and what it collects:
//! - [`BenchmarkUnit`]: one-time `setup()` plus a per-run `execute()`
//! - [`RunRecord`]: schema-less, ordered metric mapping produced per run
//! - [`timed`] / [`Timer`]: wall-clock `took` measurement for a run
//! - [`CommandUnit`]: a ready-made unit that times a shell command

mod command;
mod measure;
mod record;

pub use command::{CommandError, CommandUnit};
pub use measure::{Timer, timed};
pub use record::{MetricValue, RUN_KEY, RunRecord, TOOK_KEY};

/// Error type returned by benchmark units.
///
/// Boxed so units can surface whatever failure they hit; the harness never
/// inspects it, only propagates it.
pub type UnitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A benchmark the harness can run repeatedly.
///
/// The harness calls [`setup`](BenchmarkUnit::setup) exactly once, then
/// [`execute`](BenchmarkUnit::execute) once per run, strictly sequentially.
/// Any error aborts the whole test.
pub trait BenchmarkUnit {
    /// One-time preparation before the first run
    fn setup(&mut self) -> Result<(), UnitError>;

    /// Perform one run and report its metrics
    fn execute(&mut self) -> Result<RunRecord, UnitError>;
}

impl<U: BenchmarkUnit + ?Sized> BenchmarkUnit for Box<U> {
    fn setup(&mut self) -> Result<(), UnitError> {
        (**self).setup()
    }

    fn execute(&mut self) -> Result<RunRecord, UnitError> {
        (**self).execute()
    }
}

impl<U: BenchmarkUnit + ?Sized> BenchmarkUnit for &mut U {
    fn setup(&mut self) -> Result<(), UnitError> {
        (**self).setup()
    }

    fn execute(&mut self) -> Result<RunRecord, UnitError> {
        (**self).execute()
    }
}
