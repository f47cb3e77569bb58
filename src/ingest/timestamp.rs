//! Timestamp normalization
//!
//! The export automation is not consistent about date-time encoding:
//! readings arrive as ISO-8601 with `Z` or numeric offsets, with or
//! without fractional seconds, or as a bare `YYYY-MM-DD HH:MM:SS`.
//! Parsing tries the stricter interpretations first and canonicalizes
//! everything to a UTC instant.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// A date-time string no parse stage could interpret
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unparseable date-time: {0:?}")]
pub struct TimestampError(pub String);

/// Parse one of the accepted date-time encodings into a UTC instant
///
/// Order: RFC 3339 (handles `Z` and offsets), then `T`-separated naive
/// forms with optional fractional seconds, then the strict space-separated
/// fallback with any trailing offset fragment stripped. Naive inputs are
/// taken as UTC; timestamps are accepted as given, not corrected.
pub fn normalize(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Offset variants RFC 3339 is too strict for, e.g. "2025-03-14 08:00:00 -0800"
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
    }

    // Strict fallback: strip a trailing offset fragment first so
    // "2025-03-14 08:00:00 +00:00" still parses
    let stripped = strip_offset_suffix(raw);
    if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }

    Err(TimestampError(raw.to_string()))
}

/// Remove a trailing ` +HH:MM` / ` -HHMM` / `Z` fragment, if present
fn strip_offset_suffix(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches('Z').trim_end();

    if let Some(idx) = trimmed.rfind(|c| c == ' ' || c == '+') {
        let (head, tail) = trimmed.split_at(idx);
        let body = tail[1..].trim_start();
        let signed = tail.starts_with('+') || body.starts_with('+') || body.starts_with('-');
        let numeric = !body.is_empty()
            && body
                .trim_start_matches(|c| c == '+' || c == '-')
                .chars()
                .all(|c| c.is_ascii_digit() || c == ':');
        if signed && numeric {
            return head.trim_end();
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc3339_with_zulu() {
        assert_eq!(
            normalize("2025-03-14T08:30:00Z").unwrap(),
            utc(2025, 3, 14, 8, 30, 0)
        );
    }

    #[test]
    fn test_rfc3339_with_offset() {
        assert_eq!(
            normalize("2025-03-14T08:30:00-05:00").unwrap(),
            utc(2025, 3, 14, 13, 30, 0)
        );
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(
            normalize("2025-03-14T08:30:00.123456").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap()
                + chrono::Duration::microseconds(123456)
        );
    }

    #[test]
    fn test_naive_t_separated() {
        assert_eq!(
            normalize("2025-03-14T08:30:00").unwrap(),
            utc(2025, 3, 14, 8, 30, 0)
        );
    }

    #[test]
    fn test_strict_space_separated() {
        assert_eq!(
            normalize("2025-03-14 08:30:00").unwrap(),
            utc(2025, 3, 14, 8, 30, 0)
        );
    }

    #[test]
    fn test_trailing_offset_fragment_stripped() {
        // These fail RFC 3339 but must survive the strict fallback
        assert_eq!(
            normalize("2025-03-14 08:30:00 +00:00").unwrap(),
            utc(2025, 3, 14, 8, 30, 0)
        );
    }

    #[test]
    fn test_apple_style_numeric_offset() {
        assert_eq!(
            normalize("2025-03-14 08:30:00 -0800").unwrap(),
            utc(2025, 3, 14, 16, 30, 0)
        );
    }

    #[test]
    fn test_fractional_seconds_do_not_break_fallback() {
        assert_eq!(
            normalize("2025-03-14 08:30:00.5").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap()
                + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(normalize("last tuesday").is_err());
        assert!(normalize("").is_err());
        assert!(normalize("2025-03-14").is_err());
    }
}
