//! Test Execution
//!
//! Drives one benchmark unit through one test and produces one report.
//!
//! ## Run Modes
//!
//! - **Fixed count**: exactly `num_runs` calls to `execute()`, kept in
//!   memory. Records are not tagged and nothing is persisted mid-test.
//!
//! - **Duration bounded**: calls `execute()` until the wall-clock budget is
//!   spent. Each record is tagged with its 1-based `run` index, then written
//!   and flushed to the snapshot sink before the next run starts. A run that
//!   has started always completes, so the test can overshoot its budget by
//!   up to one run.
//!
//! ## Data Flow
//!
//! ```text
//!   TestConfig
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  Orchestrator    │  Setup → Running → Aggregating
//! └────────┬─────────┘
//!          │  RunRecord per run ──▶ SnapshotSink (duration mode)
//!          ▼
//!  aggregate() + collect_metadata()
//!          │
//!          ▼
//!     TestReport
//! ```

use super::clock::{Clock, SystemClock};
use super::metadata::{HostInfo, SystemHost};
use super::report::build_report;
use crate::config::{ConfigError, OutputTarget, RunMode, TestConfig};
use crate::duration::DurationPolicy;
use indicatif::{ProgressBar, ProgressStyle};
use runbench_core::{BenchmarkUnit, RunRecord, UnitError};
use runbench_report::{FileSnapshots, SnapshotError, SnapshotSink, SnapshotStore, TestReport};
use runbench_stats::AggregateError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Reasons a test produces no report
#[derive(Debug, Error)]
pub enum RunError {
    /// Test config rejected before setup
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The unit's one-time setup failed
    #[error("benchmark setup failed: {source}")]
    Setup {
        /// Error returned by the unit
        #[source]
        source: UnitError,
    },

    /// A single run failed
    #[error("run {run} failed: {source}")]
    Run {
        /// 1-based index of the failed run
        run: u64,
        /// Error returned by the unit
        #[source]
        source: UnitError,
    },

    /// Snapshot sink could not be opened
    #[error("failed to open snapshot sink: {0}")]
    SnapshotOpen(#[source] SnapshotError),

    /// A completed run could not be written or flushed
    #[error("failed to persist run {run}: {source}")]
    Persistence {
        /// 1-based index of the run being persisted
        run: u64,
        /// Sink error
        #[source]
        source: SnapshotError,
    },

    /// Runs could not be averaged
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// The final report could not be written
    #[error("failed to write report to {target}: {source}")]
    Report {
        /// Output file, or `stdout`
        target: String,
        /// Serialization or I/O error
        #[source]
        source: serde_json::Error,
    },
}

/// Runs a benchmark unit for one test.
///
/// Consumed by [`Orchestrator::execute`]; build a new one per report.
pub struct Orchestrator<U, S = FileSnapshots, C = SystemClock, H = SystemHost> {
    unit: U,
    snapshots: S,
    clock: C,
    host: H,
    output: OutputTarget,
    snapshot_dir: PathBuf,
    policy: DurationPolicy,
    progress: bool,
}

impl<U: BenchmarkUnit> Orchestrator<U> {
    /// Orchestrator with file snapshots, the system clock and the real host
    pub fn new(unit: U, output: OutputTarget) -> Self {
        Self {
            unit,
            snapshots: FileSnapshots,
            clock: SystemClock,
            host: SystemHost,
            output,
            snapshot_dir: PathBuf::from("target/runbench"),
            policy: DurationPolicy::default(),
            progress: false,
        }
    }
}

impl<U, S, C, H> Orchestrator<U, S, C, H>
where
    U: BenchmarkUnit,
    S: SnapshotStore,
    C: Clock,
    H: HostInfo,
{
    /// Replace the snapshot store
    pub fn with_snapshots<S2: SnapshotStore>(self, snapshots: S2) -> Orchestrator<U, S2, C, H> {
        Orchestrator {
            unit: self.unit,
            snapshots,
            clock: self.clock,
            host: self.host,
            output: self.output,
            snapshot_dir: self.snapshot_dir,
            policy: self.policy,
            progress: self.progress,
        }
    }

    /// Replace the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Orchestrator<U, S, C2, H> {
        Orchestrator {
            unit: self.unit,
            snapshots: self.snapshots,
            clock,
            host: self.host,
            output: self.output,
            snapshot_dir: self.snapshot_dir,
            policy: self.policy,
            progress: self.progress,
        }
    }

    /// Replace the host information source
    pub fn with_host<H2: HostInfo>(self, host: H2) -> Orchestrator<U, S, C, H2> {
        Orchestrator {
            unit: self.unit,
            snapshots: self.snapshots,
            clock: self.clock,
            host,
            output: self.output,
            snapshot_dir: self.snapshot_dir,
            policy: self.policy,
            progress: self.progress,
        }
    }

    /// How to treat a duration that parses to zero
    pub fn with_duration_policy(mut self, policy: DurationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Directory for snapshots when the report goes to stdout
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Show a progress bar on stderr
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Where duration-mode snapshots for `config` are written
    pub fn snapshot_path(&self, config: &TestConfig) -> PathBuf {
        self.output.snapshot_path(&self.snapshot_dir, &config.test_id)
    }

    /// Run the test and build its report.
    ///
    /// The duration is resolved before setup, so a malformed duration under
    /// [`DurationPolicy::Strict`] fails without touching the unit. Any unit
    /// or snapshot failure aborts the test; no partial report is returned.
    pub fn execute(mut self, config: &TestConfig) -> Result<TestReport, RunError> {
        let mode = config.run_mode(self.policy)?;

        info!(test = %config.test_name, id = %config.test_id, "Setting up tests.");
        self.unit
            .setup()
            .map_err(|source| RunError::Setup { source })?;

        info!("Beginning to run tests.");
        let runs = match mode {
            RunMode::Fixed(n) => self.run_fixed(n)?,
            RunMode::Timed(budget) => {
                let path = self.snapshot_path(config);
                self.run_timed(budget, &path)?
            }
        };
        info!(runs = runs.len(), "Finished running tests.");

        build_report(config, runs, &self.host)
    }

    fn run_fixed(&mut self, num_runs: u32) -> Result<Vec<RunRecord>, RunError> {
        let pb = self.progress_bar(Some(num_runs as u64));
        let mut runs = Vec::with_capacity(num_runs as usize);

        for run in 1..=u64::from(num_runs) {
            info!("Running test {} of {}", run, num_runs);
            let record = self
                .unit
                .execute()
                .map_err(|source| RunError::Run { run, source })?;
            runs.push(record);
            pb.inc(1);
        }

        pb.finish_with_message("Complete");
        Ok(runs)
    }

    fn run_timed(&mut self, budget: Duration, path: &Path) -> Result<Vec<RunRecord>, RunError> {
        let end = self.clock.now().checked_add(budget).ok_or_else(|| {
            ConfigError::Invalid(format!("duration of {:?} is too large", budget))
        })?;

        info!(path = %path.display(), "Writing snapshots");
        let mut sink = self
            .snapshots
            .open(path)
            .map_err(RunError::SnapshotOpen)?;

        let pb = self.progress_bar(None);
        let mut runs = Vec::new();
        let mut run = 0u64;

        while self.clock.now() < end {
            run += 1;
            info!("Running test {} (duration mode)", run);
            pb.set_message(format!("run {}", run));
            let mut record = self
                .unit
                .execute()
                .map_err(|source| RunError::Run { run, source })?;
            record.tag_run(run);
            sink.persist(&record, false)
                .map_err(|source| RunError::Persistence { run, source })?;
            runs.push(record);
            pb.inc(1);
        }
        drop(sink);

        pb.finish_with_message("Complete");
        Ok(runs)
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {pos} runs {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::clock::ManualClock;
    use crate::executor::metadata::HostProbe;
    use runbench_core::RUN_KEY;
    use runbench_report::{MemorySnapshots, SnapshotEvent};
    use std::cell::Cell;
    use std::rc::Rc;

    struct StubHost;

    impl HostInfo for StubHost {
        fn probe(&self) -> HostProbe {
            HostProbe {
                runtime_version: Some("rustc test".to_string()),
                ..HostProbe::default()
            }
        }
    }

    /// Returns `latency` values in turn and advances the clock per call
    struct Scripted {
        latencies: Vec<i64>,
        calls: usize,
        setups: Rc<Cell<usize>>,
        clock: Option<(ManualClock, Duration)>,
        fail_setup: bool,
        fail_on: Option<usize>,
    }

    impl Scripted {
        fn new(latencies: Vec<i64>) -> Self {
            Self {
                latencies,
                calls: 0,
                setups: Rc::new(Cell::new(0)),
                clock: None,
                fail_setup: false,
                fail_on: None,
            }
        }

        fn ticking(clock: &ManualClock, per_run: Duration) -> Self {
            let mut unit = Self::new(vec![1]);
            unit.clock = Some((clock.clone(), per_run));
            unit
        }
    }

    impl BenchmarkUnit for Scripted {
        fn setup(&mut self) -> Result<(), UnitError> {
            self.setups.set(self.setups.get() + 1);
            if self.fail_setup {
                return Err("no fixture".into());
            }
            Ok(())
        }

        fn execute(&mut self) -> Result<RunRecord, UnitError> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err("boom".into());
            }
            if let Some((clock, step)) = &self.clock {
                clock.advance(*step);
            }
            let latency = self.latencies[(self.calls - 1) % self.latencies.len()];
            Ok(RunRecord::new().with("latency", latency))
        }
    }

    fn orchestrator<U: BenchmarkUnit>(
        unit: U,
        snapshots: &MemorySnapshots,
        clock: &ManualClock,
    ) -> Orchestrator<U, MemorySnapshots, ManualClock, StubHost> {
        Orchestrator::new(unit, OutputTarget::File(PathBuf::from("out/report.json")))
            .with_snapshots(snapshots.clone())
            .with_clock(clock.clone())
            .with_host(StubHost)
    }

    #[test]
    fn test_fixed_mode_averages_runs() {
        let snapshots = MemorySnapshots::new();
        let clock = ManualClock::new();
        let config = TestConfig::new("latency", "t1", 3).with_show_runs(true);

        let report = orchestrator(Scripted::new(vec![10, 20, 30]), &snapshots, &clock)
            .execute(&config)
            .unwrap();

        assert_eq!(report.results.get("latency"), Some(20.0));
        let runs = report.runs.unwrap();
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| !r.contains_key(RUN_KEY)));
        // nothing persisted in fixed mode
        assert!(snapshots.events().is_empty());
        assert_eq!(report.metadata.test_id, "t1");
        assert_eq!(report.metadata.runtime_version, "rustc test");
    }

    #[test]
    fn test_setup_runs_once() {
        let unit = Scripted::new(vec![1]);
        let setups = unit.setups.clone();
        let config = TestConfig::new("t", "i", 4);

        orchestrator(unit, &MemorySnapshots::new(), &ManualClock::new())
            .execute(&config)
            .unwrap();
        assert_eq!(setups.get(), 1);
    }

    #[test]
    fn test_zero_runs_gives_empty_results() {
        let config = TestConfig::new("t", "i", 0).with_show_runs(true);
        let report = orchestrator(
            Scripted::new(vec![1]),
            &MemorySnapshots::new(),
            &ManualClock::new(),
        )
        .execute(&config)
        .unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.runs, Some(vec![]));
    }

    #[test]
    fn test_show_runs_false_omits_runs() {
        let config = TestConfig::new("t", "i", 2);
        let report = orchestrator(
            Scripted::new(vec![5]),
            &MemorySnapshots::new(),
            &ManualClock::new(),
        )
        .execute(&config)
        .unwrap();

        assert!(report.runs.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("runs").is_none());
    }

    #[test]
    fn test_timed_mode_tags_and_persists_each_run() {
        let snapshots = MemorySnapshots::new();
        let clock = ManualClock::new();
        let unit = Scripted::ticking(&clock, Duration::from_millis(250));
        let config = TestConfig::new("t", "i", 1)
            .with_duration("1s")
            .with_show_runs(true);

        let report = orchestrator(unit, &snapshots, &clock)
            .execute(&config)
            .unwrap();

        let runs = report.runs.unwrap();
        assert_eq!(runs.len(), 4);
        let tags: Vec<_> = runs.iter().map(|r| r.run_tag().unwrap()).collect();
        assert_eq!(tags, vec![1, 2, 3, 4]);
        assert_eq!(report.results.get("run"), Some(2.5));

        // opened once, then write + flush per run, in order
        let events = snapshots.events();
        assert_eq!(
            events[0],
            SnapshotEvent::Opened(PathBuf::from("out/report.json.snapshot"))
        );
        assert_eq!(events.len(), 1 + 2 * 4);
        for (i, pair) in events[1..].chunks(2).enumerate() {
            assert_eq!(pair[0], SnapshotEvent::Written(runs[i].clone()));
            assert_eq!(pair[1], SnapshotEvent::Flushed);
        }
        assert_eq!(snapshots.records(), runs);
    }

    #[test]
    fn test_timed_mode_overshoots_by_in_flight_run() {
        let snapshots = MemorySnapshots::new();
        let clock = ManualClock::new();
        let unit = Scripted::ticking(&clock, Duration::from_millis(600));
        let config = TestConfig::new("t", "i", 1).with_duration("1s");

        let report = orchestrator(unit, &snapshots, &clock)
            .execute(&config)
            .unwrap();

        // second run starts at 600ms and is allowed to finish at 1.2s
        assert_eq!(snapshots.records().len(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(1200));
        assert_eq!(report.results.get("latency"), Some(1.0));
    }

    #[test]
    fn test_timed_mode_ignores_num_runs() {
        let snapshots = MemorySnapshots::new();
        let clock = ManualClock::new();
        let unit = Scripted::ticking(&clock, Duration::from_millis(100));
        let config = TestConfig::new("t", "i", 1).with_duration("1s");

        orchestrator(unit, &snapshots, &clock).execute(&config).unwrap();
        assert_eq!(snapshots.records().len(), 10);
    }

    #[test]
    fn test_strict_zero_duration_fails_before_setup() {
        let unit = Scripted::new(vec![1]);
        let setups = unit.setups.clone();
        let config = TestConfig::new("t", "i", 1).with_duration("soon");

        let err = orchestrator(unit, &MemorySnapshots::new(), &ManualClock::new())
            .execute(&config)
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Config(ConfigError::MalformedDuration(_))
        ));
        assert_eq!(setups.get(), 0);
    }

    #[test]
    fn test_permissive_zero_duration_runs_nothing() {
        let snapshots = MemorySnapshots::new();
        let config = TestConfig::new("t", "i", 5)
            .with_duration("")
            .with_show_runs(true);

        let report = orchestrator(Scripted::new(vec![1]), &snapshots, &ManualClock::new())
            .with_duration_policy(DurationPolicy::Permissive)
            .execute(&config)
            .unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.runs, Some(vec![]));
        // the sink is still opened once
        assert_eq!(snapshots.events().len(), 1);
    }

    #[test]
    fn test_setup_failure_aborts() {
        let mut unit = Scripted::new(vec![1]);
        unit.fail_setup = true;
        let config = TestConfig::new("t", "i", 3);

        let err = orchestrator(unit, &MemorySnapshots::new(), &ManualClock::new())
            .execute(&config)
            .unwrap_err();
        assert!(matches!(err, RunError::Setup { .. }));
        assert!(err.to_string().contains("no fixture"));
    }

    #[test]
    fn test_run_failure_aborts_with_run_index() {
        let snapshots = MemorySnapshots::new();
        let clock = ManualClock::new();
        let mut unit = Scripted::ticking(&clock, Duration::from_millis(100));
        unit.fail_on = Some(3);
        let config = TestConfig::new("t", "i", 1).with_duration("1s");

        let err = orchestrator(unit, &snapshots, &clock)
            .execute(&config)
            .unwrap_err();
        assert!(matches!(err, RunError::Run { run: 3, .. }));
        // completed runs stay durable
        assert_eq!(snapshots.records().len(), 2);
    }

    struct BrokenStore;
    struct BrokenSink;

    impl SnapshotSink for BrokenSink {
        fn write(&mut self, _record: &RunRecord, _pretty: bool) -> Result<(), SnapshotError> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SnapshotError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    impl SnapshotStore for BrokenStore {
        type Sink = BrokenSink;

        fn open(&mut self, _path: &Path) -> Result<BrokenSink, SnapshotError> {
            Ok(BrokenSink)
        }
    }

    #[test]
    fn test_persistence_failure_aborts() {
        let clock = ManualClock::new();
        let unit = Scripted::ticking(&clock, Duration::from_millis(100));
        let config = TestConfig::new("t", "i", 1).with_duration("1s");

        let err = Orchestrator::new(unit, OutputTarget::Stdout)
            .with_snapshots(BrokenStore)
            .with_clock(clock.clone())
            .with_host(StubHost)
            .execute(&config)
            .unwrap_err();

        assert!(matches!(err, RunError::Persistence { run: 1, .. }));
        assert_eq!(clock.elapsed(), Duration::from_millis(100));
    }

    #[test]
    fn test_snapshot_path_for_stdout() {
        let config = TestConfig::new("t", "abc", 1);
        let orch = Orchestrator::new(Scripted::new(vec![1]), OutputTarget::Stdout)
            .with_snapshot_dir("/tmp/snaps");
        assert_eq!(
            orch.snapshot_path(&config),
            PathBuf::from("/tmp/snaps/abc.json.snapshot")
        );
    }
}
