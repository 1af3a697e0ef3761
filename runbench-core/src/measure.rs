//! Run Timing
//!
//! Wall-clock timing for whole benchmark runs. A run is usually milliseconds
//! to minutes long, so `std::time::Instant` resolution is plenty.

use crate::record::{RunRecord, TOOK_KEY};
use crate::UnitError;
use std::time::{Duration, Instant};

/// Timer for measuring a single run
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since start
    #[inline]
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time since start in fractional milliseconds
    #[inline]
    pub fn stop_millis(&self) -> f64 {
        self.stop().as_secs_f64() * 1000.0
    }
}

/// Run `f` and add its elapsed wall-clock milliseconds under `took`.
///
/// A record that already reports `took` is returned untouched, so units can
/// time a narrower section themselves. Errors from `f` pass through as-is.
pub fn timed<F>(f: F) -> Result<RunRecord, UnitError>
where
    F: FnOnce() -> Result<RunRecord, UnitError>,
{
    let timer = Timer::start();
    let mut record = f()?;
    let took = timer.stop_millis();

    if !record.contains_key(TOOK_KEY) {
        record.insert(TOOK_KEY, took);
    }
    Ok(record)
}
