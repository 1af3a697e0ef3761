//! JSON Output

use crate::report::TestReport;
use serde::Serialize;
use std::io::Write;

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &TestReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Serialize `value` to `writer` followed by a newline, then flush.
///
/// The flush is part of the contract: once this returns `Ok`, the bytes have
/// left the process-side buffer.
pub fn write_json<W, T>(value: &T, mut writer: W, pretty: bool) -> Result<(), serde_json::Error>
where
    W: Write,
    T: Serialize + ?Sized,
{
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}
