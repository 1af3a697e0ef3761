//! Report Data Structures

use runbench_core::RunRecord;
use runbench_stats::AggregateRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete test report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Host and run context
    pub metadata: Metadata,
    /// Per-metric means across all runs
    pub results: AggregateRecord,
    /// Raw per-run records, only present when the test asked for them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<Vec<RunRecord>>,
}

/// Host and run context captured when the report is assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Name from the test config
    pub test_name: String,
    /// Id from the test config
    pub test_id: String,
    /// Local time, `%m/%d/%Y %H:%M:%S`
    pub date: String,
    /// `rustc --version`, or the harness version when unavailable
    pub runtime_version: String,
    /// Long OS name and version
    pub os_version: String,
    /// CPU brand and logical core count, e.g. `"AMD EPYC 7R13, 8 cores"`
    pub processor: String,
    /// `"<used> (used) / <available> (available) / <total> (total)"`
    pub memory: String,
}

/// Memory reading in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Bytes in use
    pub used: u64,
    /// Bytes available for new allocations
    pub available: u64,
    /// Installed bytes
    pub total: u64,
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (used) / {} (available) / {} (total)",
            self.used, self.available, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Metadata {
        Metadata {
            test_name: "index".to_string(),
            test_id: "t-1".to_string(),
            date: "01/02/2026 03:04:05".to_string(),
            runtime_version: "rustc 1.85.0".to_string(),
            os_version: "Linux 6.1".to_string(),
            processor: "test cpu, 4 cores".to_string(),
            memory: MemoryUsage {
                used: 1,
                available: 2,
                total: 3,
            }
            .to_string(),
        }
    }

    #[test]
    fn test_memory_display() {
        assert_eq!(
            metadata().memory,
            "1 (used) / 2 (available) / 3 (total)"
        );
    }

    #[test]
    fn test_runs_omitted_when_absent() {
        let report = TestReport {
            metadata: metadata(),
            results: AggregateRecord::default(),
            runs: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.contains_key("metadata"));
        assert!(obj.contains_key("results"));
        assert!(!obj.contains_key("runs"));
    }

    #[test]
    fn test_runs_present_when_requested() {
        let report = TestReport {
            metadata: metadata(),
            results: AggregateRecord::default(),
            runs: Some(vec![RunRecord::new().with("took", 1.0)]),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["runs"][0]["took"], 1.0);

        let back: TestReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }
}
