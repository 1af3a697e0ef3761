//! Run Aggregation
//!
//! Merges per-run records into one record of per-key arithmetic means.
//!
//! Records carry no fixed schema, so the aggregate is built over the union of
//! keys seen across all runs. A key missing from some runs is averaged only
//! over the runs that reported it; absent values are never treated as zero.

use indexmap::IndexMap;
use runbench_core::{MetricValue, RunRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while aggregating runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    /// A metric value cannot be averaged
    #[error("Metric `{key}` in run {run} is a {kind}, only numeric metrics can be averaged")]
    NonNumeric {
        /// Metric name
        key: String,
        /// 1-based position of the offending run in the input sequence
        run: usize,
        /// Type of the offending value
        kind: &'static str,
    },

    /// A metric value is NaN or infinite and has no JSON representation
    #[error("Metric `{key}` in run {run} is not finite ({value})")]
    NonFinite {
        /// Metric name
        key: String,
        /// 1-based position of the offending run in the input sequence
        run: usize,
        /// The offending value
        value: f64,
    },
}

/// Per-key arithmetic means across a sequence of runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateRecord {
    means: IndexMap<String, f64>,
}

impl AggregateRecord {
    /// Mean for `key`, if any run reported it
    pub fn get(&self, key: &str) -> Option<f64> {
        self.means.get(key).copied()
    }

    /// Iterate means in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.means.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Metric names in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.means.keys().map(String::as_str)
    }

    /// Number of aggregated metrics
    pub fn len(&self) -> usize {
        self.means.len()
    }

    /// Whether no metric was aggregated
    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

impl FromIterator<(String, f64)> for AggregateRecord {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            means: iter.into_iter().collect(),
        }
    }
}

/// Aggregate runs into per-key means.
///
/// Keys keep the order in which they were first seen. Zero runs give an
/// empty aggregate; a single run gives back its own values.
///
/// # Errors
/// [`AggregateError::NonNumeric`] if any value is a boolean or string, and
/// [`AggregateError::NonFinite`] if any value is NaN or infinite. The first
/// offending value in run order is reported.
pub fn aggregate(runs: &[RunRecord]) -> Result<AggregateRecord, AggregateError> {
    let mut columns: IndexMap<&str, Vec<f64>> = IndexMap::new();

    for (idx, run) in runs.iter().enumerate() {
        for (key, value) in run.iter() {
            let v = numeric(key, value, idx + 1)?;
            columns.entry(key).or_default().push(v);
        }
    }

    Ok(columns
        .into_iter()
        .map(|(key, values)| (key.to_string(), mean(&values)))
        .collect())
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn numeric(key: &str, value: &MetricValue, run: usize) -> Result<f64, AggregateError> {
    let v = value.as_f64().ok_or_else(|| AggregateError::NonNumeric {
        key: key.to_string(),
        run,
        kind: value.kind(),
    })?;
    if !v.is_finite() {
        return Err(AggregateError::NonFinite {
            key: key.to_string(),
            run,
            value: v,
        });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latency(v: i64) -> RunRecord {
        RunRecord::new().with("latency", v)
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let runs = vec![
            RunRecord::new().with("x", 1.0),
            RunRecord::new().with("x", f64::NAN),
        ];
        let err = aggregate(&runs).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::NonFinite { ref key, run: 2, .. } if key == "x"
        ));

        let runs = vec![RunRecord::new().with("y", f64::INFINITY)];
        assert!(matches!(
            aggregate(&runs),
            Err(AggregateError::NonFinite { run: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let agg = aggregate(&[]).unwrap();
        assert!(agg.is_empty());
    }

    #[test]
    fn test_single_run_is_identity() {
        let run = RunRecord::new().with("took", 12.5).with("hits", 4);
        let agg = aggregate(std::slice::from_ref(&run)).unwrap();

        assert_eq!(agg.len(), 2);
        assert_eq!(agg.get("took"), Some(12.5));
        assert_eq!(agg.get("hits"), Some(4.0));
    }

    #[test]
    fn test_mean_across_runs() {
        let runs = vec![latency(10), latency(20), latency(30)];
        let agg = aggregate(&runs).unwrap();
        assert!((agg.get("latency").unwrap() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_key_not_zero_filled() {
        let runs = vec![
            RunRecord::new().with("a", 2).with("b", 100),
            RunRecord::new().with("a", 4),
            RunRecord::new().with("a", 6).with("b", 300),
        ];
        let agg = aggregate(&runs).unwrap();

        assert_eq!(agg.get("a"), Some(4.0));
        // averaged over the two runs that had it, not three
        assert_eq!(agg.get("b"), Some(200.0));
    }

    #[test]
    fn test_key_order_is_first_seen() {
        let runs = vec![
            RunRecord::new().with("second", 1),
            RunRecord::new().with("third", 1).with("second", 1),
            RunRecord::new().with("first", 1),
        ];
        let agg = aggregate(&runs).unwrap();
        let keys: Vec<_> = agg.keys().collect();
        assert_eq!(keys, vec!["second", "third", "first"]);
    }

    #[test]
    fn test_mixed_int_and_float() {
        let runs = vec![
            RunRecord::new().with("x", 1),
            RunRecord::new().with("x", 2.5),
        ];
        let agg = aggregate(&runs).unwrap();
        assert_eq!(agg.get("x"), Some(1.75));
    }

    #[test]
    fn test_non_numeric_is_error() {
        let runs = vec![
            RunRecord::new().with("status", 1),
            RunRecord::new().with("status", "degraded"),
        ];
        let err = aggregate(&runs).unwrap_err();
        assert_eq!(
            err,
            AggregateError::NonNumeric {
                key: "status".to_string(),
                run: 2,
                kind: "string",
            }
        );
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let agg = aggregate(&[latency(10), latency(30)]).unwrap();
        let json = serde_json::to_string(&agg).unwrap();
        assert_eq!(json, r#"{"latency":20.0}"#);
    }

    #[test]
    fn test_mean_helper() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
