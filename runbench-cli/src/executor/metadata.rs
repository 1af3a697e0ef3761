//! System Metadata Collection
//!
//! Collects host information for the report metadata block.
//!
//! ## Collected Data
//!
//! - **Date**: local time the report was assembled, `%m/%d/%Y %H:%M:%S`
//! - **Runtime**: `rustc --version` of the toolchain on `PATH`
//! - **OS**: long OS version from sysinfo
//! - **CPU**: brand string and logical core count
//! - **Memory**: used, available and total bytes
//!
//! Every host field degrades to `"unknown"` with a warning when it cannot be
//! read. Metadata never fails a test.

use chrono::{DateTime, Local};
use runbench_report::{MemoryUsage, Metadata};
use sysinfo::System;
use tracing::warn;

use crate::config::TestConfig;

const UNKNOWN: &str = "unknown";
const DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Raw host readings; `None` marks a value that could not be read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostProbe {
    /// Compiler or harness version string
    pub runtime_version: Option<String>,
    /// Long OS name and version
    pub os_version: Option<String>,
    /// CPU brand string
    pub cpu_brand: Option<String>,
    /// Logical core count
    pub logical_cores: Option<usize>,
    /// Memory reading
    pub memory: Option<MemoryUsage>,
}

/// Source of host information
pub trait HostInfo {
    /// Read the host
    fn probe(&self) -> HostProbe;

    /// Local wall-clock time
    fn local_time(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Reads the machine the harness runs on
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostInfo for SystemHost {
    fn probe(&self) -> HostProbe {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let cpu_brand = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());

        let logical_cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism().ok().map(|n| n.get()),
            n => Some(n),
        };

        let memory = (sys.total_memory() > 0).then(|| MemoryUsage {
            used: sys.used_memory(),
            available: sys.available_memory(),
            total: sys.total_memory(),
        });

        HostProbe {
            runtime_version: Some(runtime_version()),
            os_version: System::long_os_version(),
            cpu_brand,
            logical_cores,
            memory,
        }
    }
}

/// Version of the Rust toolchain, or of this harness when `rustc` is absent
fn runtime_version() -> String {
    std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("runbench {}", env!("CARGO_PKG_VERSION")))
}

/// Build report metadata for `config` from `host`
pub fn collect_metadata(config: &TestConfig, host: &impl HostInfo) -> Metadata {
    let probe = host.probe();

    Metadata {
        test_name: config.test_name.clone(),
        test_id: config.test_id.clone(),
        date: host.local_time().format(DATE_FORMAT).to_string(),
        runtime_version: or_unknown("runtime_version", probe.runtime_version),
        os_version: or_unknown("os_version", probe.os_version),
        processor: processor(probe.cpu_brand, probe.logical_cores),
        memory: or_unknown("memory", probe.memory.map(|m| m.to_string())),
    }
}

fn or_unknown(field: &str, value: Option<String>) -> String {
    value.unwrap_or_else(|| {
        warn!(field, "host information unavailable");
        UNKNOWN.to_string()
    })
}

fn processor(brand: Option<String>, cores: Option<usize>) -> String {
    match (brand, cores) {
        (Some(brand), Some(cores)) => format!("{}, {} cores", brand, cores),
        (None, Some(cores)) => {
            warn!(field = "processor", "CPU brand unavailable");
            format!("{}, {} cores", UNKNOWN, cores)
        }
        (Some(brand), None) => {
            warn!(field = "processor", "core count unavailable");
            brand
        }
        (None, None) => or_unknown("processor", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct StubHost(HostProbe);

    impl HostInfo for StubHost {
        fn probe(&self) -> HostProbe {
            self.0.clone()
        }

        fn local_time(&self) -> DateTime<Local> {
            Local
                .with_ymd_and_hms(2026, 3, 7, 9, 5, 1)
                .single()
                .expect("unambiguous local time")
        }
    }

    fn full_probe() -> HostProbe {
        HostProbe {
            runtime_version: Some("rustc 1.85.0".to_string()),
            os_version: Some("Linux 24.04 Ubuntu".to_string()),
            cpu_brand: Some("Test CPU".to_string()),
            logical_cores: Some(8),
            memory: Some(MemoryUsage {
                used: 10,
                available: 20,
                total: 40,
            }),
        }
    }

    #[test]
    fn test_collect_full_metadata() {
        let config = TestConfig::new("bulk insert", "run-9", 3);
        let meta = collect_metadata(&config, &StubHost(full_probe()));

        assert_eq!(meta.test_name, "bulk insert");
        assert_eq!(meta.test_id, "run-9");
        assert_eq!(meta.date, "03/07/2026 09:05:01");
        assert_eq!(meta.runtime_version, "rustc 1.85.0");
        assert_eq!(meta.os_version, "Linux 24.04 Ubuntu");
        assert_eq!(meta.processor, "Test CPU, 8 cores");
        assert_eq!(meta.memory, "10 (used) / 20 (available) / 40 (total)");
    }

    #[test]
    fn test_missing_fields_degrade_to_unknown() {
        let config = TestConfig::new("t", "i", 1);
        let meta = collect_metadata(&config, &StubHost(HostProbe::default()));

        assert_eq!(meta.runtime_version, "unknown");
        assert_eq!(meta.os_version, "unknown");
        assert_eq!(meta.processor, "unknown");
        assert_eq!(meta.memory, "unknown");
        assert_eq!(meta.test_name, "t");
    }

    #[test]
    fn test_processor_partial() {
        assert_eq!(processor(None, Some(4)), "unknown, 4 cores");
        assert_eq!(processor(Some("X".to_string()), None), "X");
    }

    #[test]
    fn test_system_host_fills_runtime() {
        let probe = SystemHost.probe();
        assert!(probe.runtime_version.is_some_and(|v| !v.is_empty()));
    }
}
