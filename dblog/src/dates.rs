/// Types and utilities for manipulating the timestamps found in engine LOG files.
///
/// The engine stamps every entry with a `YYYY/MM/DD-HH:MM:SS.ffffff` time with no zone marker;
/// by convention the clock is UTC.  All timestamps are held as chrono UTC timestamps so that
/// callers can compare and sort them directly.
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

pub type Timestamp = DateTime<Utc>;

/// Parse a `YYYY/MM/DD-HH:MM:SS.ffffff` string into a Timestamp.

pub fn parse_timestamp(s: &str) -> Result<Timestamp> {
    let t = NaiveDateTime::parse_from_str(s, "%Y/%m/%d-%H:%M:%S%.f")
        .map_err(|_| anyhow!("Can't parse timestamp {s}"))?;
    Ok(Utc.from_utc_datetime(&t))
}

/// Assemble a duration from the `H:M:S.ms` components the stall lines are printed with.

pub fn duration_from_hms(hours: i64, minutes: i64, seconds: i64, millis: i64) -> Duration {
    Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::milliseconds(millis)
}

#[test]
fn test_parse_timestamp() {
    let t = parse_timestamp("2022/04/17-14:13:10.724683").unwrap();
    assert!(t.format("%Y/%m/%d-%H:%M:%S%.6f").to_string() == "2022/04/17-14:13:10.724683");

    // Timestamps from the same log sort as their strings do.
    let t2 = parse_timestamp("2022/04/17-14:14:32.645120").unwrap();
    assert!(t < t2);

    assert!(parse_timestamp("2022/04/17 14:13:10").is_err());
    assert!(parse_timestamp("yesterday").is_err());
}

#[test]
fn test_duration_from_hms() {
    let d = duration_from_hms(1, 2, 3, 456);
    assert!(d.num_milliseconds() == ((1 * 60 + 2) * 60 + 3) * 1000 + 456);
    assert!(duration_from_hms(0, 0, 0, 0).is_zero());
}
