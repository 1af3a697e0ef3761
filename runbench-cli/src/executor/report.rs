//! Report Building
//!
//! Turns the completed runs into the final [`TestReport`].
//!
//! ```text
//!   Vec<RunRecord>
//!         │
//!         ├──────────────▶ aggregate()         ──▶ results
//!         │
//!   TestConfig + HostInfo ──▶ collect_metadata() ──▶ metadata
//!         │
//!         ▼
//!     TestReport (runs kept only with show_runs)
//! ```

use super::execution::RunError;
use super::metadata::{HostInfo, collect_metadata};
use crate::config::TestConfig;
use runbench_core::RunRecord;
use runbench_report::TestReport;
use runbench_stats::aggregate;

/// Build a complete report from the runs of one test.
///
/// Metadata is collected exactly once, after aggregation succeeds.
pub fn build_report(
    config: &TestConfig,
    runs: Vec<RunRecord>,
    host: &impl HostInfo,
) -> Result<TestReport, RunError> {
    let results = aggregate(&runs)?;
    let metadata = collect_metadata(config, host);

    Ok(TestReport {
        metadata,
        results,
        runs: config.show_runs.then_some(runs),
    })
}
