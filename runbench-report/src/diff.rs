//! Result Diffing
//!
//! Compares two saved reports key by key and returns `changed - base` for
//! every aggregated metric. Both reports must aggregate exactly the same
//! metric names and every value must be numeric; anything else is rejected
//! rather than producing a partial diff.

use serde_json::{Map, Number, Value};
use std::fmt;
use thiserror::Error;

/// Which side of the comparison an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The baseline report
    Base,
    /// The report compared against the baseline
    Changed,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Base => write!(f, "base_result"),
            Side::Changed => write!(f, "changed_result"),
        }
    }
}

/// Reasons two reports cannot be diffed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// `results` (or `metadata`) is absent or not an object
    #[error("{side} has a missing or invalid key `{key}`")]
    MissingKey {
        /// Top-level key that was expected
        key: &'static str,
        /// Report lacking it
        side: Side,
    },

    /// A metric appears in one report's results but not the other's
    #[error("key `{key}` is not present in {side}")]
    KeyMismatch {
        /// Metric name
        key: String,
        /// Report lacking it
        side: Side,
    },

    /// A result value is not a number
    #[error("key `{key}` in {side} points to a non-numeric value")]
    NonNumeric {
        /// Metric name
        key: String,
        /// Report holding the bad value
        side: Side,
    },
}

const METADATA: &str = "metadata";
const RESULTS: &str = "results";

/// Diff two reports (`changed - base`).
///
/// With `include_metadata`, both reports must carry a `metadata` object and
/// the output wraps the diff together with both metadata blocks:
///
/// ```text
/// { "base_result_metadata": {...}, "changed_result_metadata": {...}, "diff": {...} }
/// ```
///
/// Without it the output is the bare `{metric: delta}` object. Integer
/// metrics on both sides produce integer deltas.
pub fn diff_reports(
    base: &Value,
    changed: &Value,
    include_metadata: bool,
) -> Result<Value, DiffError> {
    if include_metadata {
        object_field(base, METADATA, Side::Base)?;
        object_field(changed, METADATA, Side::Changed)?;
    }
    let base_results = object_field(base, RESULTS, Side::Base)?;
    let changed_results = object_field(changed, RESULTS, Side::Changed)?;

    check_same_keys(base_results, changed_results)?;
    check_numeric(base_results, Side::Base)?;
    check_numeric(changed_results, Side::Changed)?;

    let mut diff = Map::new();
    for (key, b) in base_results {
        // both validated above
        if let (Some(b), Some(c)) = (b.as_number(), changed_results[key].as_number()) {
            diff.insert(key.clone(), Value::Number(subtract(c, b)));
        }
    }

    if !include_metadata {
        return Ok(Value::Object(diff));
    }

    let mut out = Map::new();
    out.insert(format!("{}_{}", Side::Base, METADATA), base[METADATA].clone());
    out.insert(
        format!("{}_{}", Side::Changed, METADATA),
        changed[METADATA].clone(),
    );
    out.insert("diff".to_string(), Value::Object(diff));
    Ok(Value::Object(out))
}

fn object_field<'a>(
    report: &'a Value,
    key: &'static str,
    side: Side,
) -> Result<&'a Map<String, Value>, DiffError> {
    report
        .get(key)
        .and_then(Value::as_object)
        .ok_or(DiffError::MissingKey { key, side })
}

fn check_same_keys(base: &Map<String, Value>, changed: &Map<String, Value>) -> Result<(), DiffError> {
    if let Some(key) = base.keys().find(|k| !changed.contains_key(*k)) {
        return Err(DiffError::KeyMismatch {
            key: key.clone(),
            side: Side::Changed,
        });
    }
    if let Some(key) = changed.keys().find(|k| !base.contains_key(*k)) {
        return Err(DiffError::KeyMismatch {
            key: key.clone(),
            side: Side::Base,
        });
    }
    Ok(())
}

fn check_numeric(results: &Map<String, Value>, side: Side) -> Result<(), DiffError> {
    match results.iter().find(|(_, v)| !v.is_number()) {
        Some((key, _)) => Err(DiffError::NonNumeric {
            key: key.clone(),
            side,
        }),
        None => Ok(()),
    }
}

fn subtract(changed: &Number, base: &Number) -> Number {
    if let (Some(c), Some(b)) = (changed.as_i64(), base.as_i64()) {
        if let Some(d) = c.checked_sub(b) {
            return Number::from(d);
        }
    }
    let c = changed.as_f64().unwrap_or(0.0);
    let b = base.as_f64().unwrap_or(0.0);
    // NaN/inf cannot be represented in JSON; those inputs never parse anyway
    Number::from_f64(c - b).unwrap_or_else(|| Number::from(0))
}
