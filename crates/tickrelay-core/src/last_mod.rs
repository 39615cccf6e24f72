//! The `lastMod` hint exchanged with viewers.
//!
//! Encoded as the hex representation of a nanosecond Unix timestamp.
//! The `/data` page embeds it in the upgrade URL and the `/ws` handler
//! parses it back. The zero value is the Unix epoch.

use chrono::{DateTime, Utc};

/// Parse a client-supplied hex nanosecond timestamp.
///
/// Absent, empty, or malformed values yield the Unix epoch.
pub fn parse_last_mod(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| i64::from_str_radix(s, 16).ok())
        .map_or(DateTime::UNIX_EPOCH, DateTime::from_timestamp_nanos)
}

/// Encode a timestamp as lowercase hex nanoseconds.
///
/// Timestamps outside the nanosecond range (roughly 1677..2262) encode
/// as `0`. Negative values keep a leading `-`.
pub fn format_last_mod(at: DateTime<Utc>) -> String {
    let nanos = at.timestamp_nanos_opt().unwrap_or(0);
    if nanos < 0 {
        format!("-{:x}", nanos.unsigned_abs())
    } else {
        format!("{nanos:x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_epoch() {
        assert_eq!(parse_last_mod(None), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn malformed_is_epoch() {
        assert_eq!(parse_last_mod(Some("")), DateTime::UNIX_EPOCH);
        assert_eq!(parse_last_mod(Some("not-hex")), DateTime::UNIX_EPOCH);
        assert_eq!(
            parse_last_mod(Some("ffffffffffffffffffff")),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn parses_hex_nanos() {
        // 0x3b9aca00 == 1_000_000_000 ns == 1 s
        let at = parse_last_mod(Some("3b9aca00"));
        assert_eq!(at.timestamp(), 1);
        assert_eq!(at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn format_then_parse_preserves_nanos() {
        let at = DateTime::from_timestamp_nanos(1_700_000_000_123_456_789);
        let encoded = format_last_mod(at);
        assert_eq!(encoded, "17979cfe3d85cd15");
        assert_eq!(parse_last_mod(Some(&encoded)), at);
    }

    #[test]
    fn epoch_formats_as_zero() {
        assert_eq!(format_last_mod(DateTime::UNIX_EPOCH), "0");
    }
}
