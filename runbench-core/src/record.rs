//! Run Records
//!
//! A [`RunRecord`] is what one benchmark invocation produces: an ordered,
//! schema-less mapping from metric name to [`MetricValue`]. Keys keep the
//! order in which the unit inserted them, so serialized snapshots and
//! reports read the same way the unit wrote them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key the orchestrator uses to tag records with their 1-based run index
pub const RUN_KEY: &str = "run";

/// Key carrying the elapsed wall-clock milliseconds of a timed run
pub const TOOK_KEY: &str = "took";

/// Single metric value reported by a benchmark unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer metric (counts, sizes, run indices)
    Int(i64),
    /// Floating point metric (latencies, rates)
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Free-form text
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value, `None` for booleans and text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Bool(_) | MetricValue::Text(_) => None,
        }
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Int(_) => "integer",
            MetricValue::Float(_) => "float",
            MetricValue::Bool(_) => "boolean",
            MetricValue::Text(_) => "string",
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Bool(v) => write!(f, "{}", v),
            MetricValue::Text(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetricValue {
                fn from(v: $t) -> Self {
                    MetricValue::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        i64::try_from(v)
            .map(MetricValue::Int)
            .unwrap_or(MetricValue::Float(v as f64))
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(MetricValue::Int)
            .unwrap_or(MetricValue::Float(v as f64))
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v as f64)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// Result of one benchmark invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunRecord {
    metrics: IndexMap<String, MetricValue>,
}

impl RunRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a metric, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetricValue>,
    ) -> Option<MetricValue> {
        self.metrics.insert(key.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a metric
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    /// Whether the record carries `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.metrics.contains_key(key)
    }

    /// Tag the record with its 1-based run index under [`RUN_KEY`].
    ///
    /// A `run` metric reported by the unit itself is overwritten.
    pub fn tag_run(&mut self, run: u64) {
        self.insert(RUN_KEY, run);
    }

    /// The run tag, if present
    pub fn run_tag(&self) -> Option<i64> {
        match self.metrics.get(RUN_KEY) {
            Some(MetricValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Iterate metrics in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Metric names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the record has no metrics
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RunRecord
where
    K: Into<String>,
    V: Into<MetricValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            metrics: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RunRecord {
    type Item = (&'a String, &'a MetricValue);
    type IntoIter = indexmap::map::Iter<'a, String, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
