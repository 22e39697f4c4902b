//! Duration-string parsing (`N UNIT`, unit in {s, m, h}) and ISO8601 window
//! resolution. A dedicated small parser is used instead of a generic crate
//! like `humantime` because the grammar is deliberately narrower than what
//! those crates accept: a single numeric literal, no composite durations
//! like `1h30m`.

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

/// Parses `"15m"`, `"30s"`, `"2h"` into a `chrono::Duration`.
pub fn parse_duration(input: &str) -> Result<chrono::Duration, ConfigError> {
    let input = input.trim();
    let unit = input
        .chars()
        .last()
        .ok_or_else(|| ConfigError::InvalidDuration(input.to_string()))?;
    let (digits, multiplier) = match unit {
        's' => (&input[..input.len() - 1], 1i64),
        'm' => (&input[..input.len() - 1], 60i64),
        'h' => (&input[..input.len() - 1], 3600i64),
        _ => return Err(ConfigError::InvalidDuration(input.to_string())),
    };
    let n: i64 = digits
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(input.to_string()))?;
    Ok(chrono::Duration::seconds(n * multiplier))
}

pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ConfigError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::InvalidTimestamp(input.to_string(), e.to_string()))
}

/// A closed time interval used as one side (baseline or mutant) of the
/// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Resolves a window from a start timestamp plus exactly one of an explicit
/// end timestamp or a duration string (falling back to `default_duration`
/// when neither is given). `end` and `duration` are mutually exclusive; the
/// caller enforces that before calling.
pub fn resolve_window(
    start: &str,
    end: Option<&str>,
    duration: Option<&str>,
    default_duration: Option<&str>,
    missing_err: ConfigError,
) -> Result<Window, ConfigError> {
    let start = parse_timestamp(start)?;
    let end = match (end, duration) {
        (Some(_), Some(_)) => unreachable!("caller must enforce mutual exclusivity before calling"),
        (Some(end), None) => parse_timestamp(end)?,
        (None, Some(dur)) => start + parse_duration(dur)?,
        (None, None) => match default_duration {
            Some(dur) => start + parse_duration(dur)?,
            None => return Err(missing_err),
        },
    };
    Ok(Window { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_minutes_hours() {
        assert_eq!(parse_duration("30s").unwrap(), chrono::Duration::seconds(30));
        assert_eq!(parse_duration("15m").unwrap(), chrono::Duration::minutes(15));
        assert_eq!(parse_duration("2h").unwrap(), chrono::Duration::hours(2));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration("15d").is_err());
        assert!(parse_duration("abc").is_err());
    }

    // --duration 15m with --baseline-start ... and no --baseline-end yields
    // a window ending 15 minutes after the start.
    #[test]
    fn default_duration_applies_when_no_end_is_given() {
        let window = resolve_window(
            "2025-01-01T00:00:00Z",
            None,
            None,
            Some("15m"),
            ConfigError::MissingBaselineWindow,
        )
        .unwrap();
        assert_eq!(window.end.to_rfc3339(), "2025-01-01T00:15:00+00:00");
    }

    #[test]
    fn explicit_end_wins_over_default_duration() {
        let window = resolve_window(
            "2025-01-01T00:00:00Z",
            Some("2025-01-01T01:00:00Z"),
            None,
            Some("15m"),
            ConfigError::MissingBaselineWindow,
        )
        .unwrap();
        assert_eq!(window.end.to_rfc3339(), "2025-01-01T01:00:00+00:00");
    }

    #[test]
    fn missing_everything_is_an_error() {
        let err = resolve_window("2025-01-01T00:00:00Z", None, None, None, ConfigError::MissingBaselineWindow);
        assert!(matches!(err, Err(ConfigError::MissingBaselineWindow)));
    }
}
