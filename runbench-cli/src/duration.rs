//! Duration Parsing
//!
//! Test durations are written as concatenated `<integer><unit>` components in
//! hours, minutes, seconds order, each optional: `"2h15m"`, `"45s"`,
//! `"1h30m10s"`.
//!
//! Matching is anchored at the start and stops at the first text that does
//! not continue the pattern, so trailing text is ignored and input that
//! matches nothing parses to zero. Whether zero is acceptable is decided by
//! [`DurationPolicy`].

use crate::config::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?").expect("duration pattern is valid")
});

/// How to treat a duration string that parses to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DurationPolicy {
    /// Reject zero-length durations before any run starts (default)
    #[default]
    Strict,
    /// Accept them; the timed loop then exits without running
    Permissive,
}

/// Parse an `h`/`m`/`s` duration string.
///
/// Never fails: unparseable input yields [`Duration::ZERO`]. Components too
/// large to represent saturate.
pub fn parse_duration(text: &str) -> Duration {
    let Some(caps) = DURATION_RE.captures(text) else {
        return Duration::ZERO;
    };

    let component = |idx: usize, unit_secs: u64| -> u64 {
        caps.get(idx)
            .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
            .unwrap_or(0)
            .saturating_mul(unit_secs)
    };

    let secs = component(1, 3600)
        .saturating_add(component(2, 60))
        .saturating_add(component(3, 1));
    Duration::from_secs(secs)
}

/// Parse `text` and apply `policy` to a zero-length result.
pub fn resolve_duration(text: &str, policy: DurationPolicy) -> Result<Duration, ConfigError> {
    let duration = parse_duration(text);
    if duration.is_zero() {
        match policy {
            DurationPolicy::Strict => return Err(ConfigError::MalformedDuration(text.to_string())),
            DurationPolicy::Permissive => {
                tracing::warn!(
                    duration = text,
                    "duration parses to zero; the timed loop will not run"
                );
            }
        }
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h30m"), Duration::from_secs(90 * 60));
        assert_eq!(parse_duration("45s"), Duration::from_secs(45));
        assert_eq!(parse_duration("2h15m"), Duration::from_secs(2 * 3600 + 15 * 60));
        assert_eq!(parse_duration("1h30m10s"), Duration::from_secs(5410));
        assert_eq!(parse_duration("10m"), Duration::from_secs(600));
        assert_eq!(parse_duration("1h5s"), Duration::from_secs(3605));
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(parse_duration(""), Duration::ZERO);
    }

    #[test]
    fn test_trailing_text_ignored() {
        assert_eq!(parse_duration("5m please"), Duration::from_secs(300));
        assert_eq!(parse_duration("1h30x"), Duration::from_secs(3600));
    }

    #[test]
    fn test_unmatched_input_is_zero() {
        assert_eq!(parse_duration("soon"), Duration::ZERO);
        assert_eq!(parse_duration(" 5s"), Duration::ZERO);
        // out of order: matching stops after the leading seconds component
        assert_eq!(parse_duration("30s1h"), Duration::from_secs(30));
    }

    #[test]
    fn test_huge_values_saturate() {
        let d = parse_duration("99999999999999999999999h");
        assert_eq!(d, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_strict_rejects_zero() {
        let err = resolve_duration("bogus", DurationPolicy::Strict).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedDuration(ref s) if s == "bogus"));
        assert!(resolve_duration("0s", DurationPolicy::Strict).is_err());
    }

    #[test]
    fn test_permissive_accepts_zero() {
        let d = resolve_duration("bogus", DurationPolicy::Permissive).unwrap();
        assert_eq!(d, Duration::ZERO);
    }

    #[test]
    fn test_valid_passes_both_policies() {
        for policy in [DurationPolicy::Strict, DurationPolicy::Permissive] {
            assert_eq!(
                resolve_duration("1s", policy).unwrap(),
                Duration::from_secs(1)
            );
        }
    }
}
