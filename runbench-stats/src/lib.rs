#![warn(missing_docs)]
//! runbench Statistics
//!
//! Turns a sequence of schema-less run records into averaged results:
//! - Key-wise arithmetic mean over the union of keys
//! - Keys absent from a run are skipped for that run, never zero-filled
//! - Non-numeric values are rejected explicitly rather than coerced

mod aggregate;

pub use aggregate::{AggregateError, AggregateRecord, aggregate, mean};
