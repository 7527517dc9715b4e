/// Database-wide stall statistics.
///
/// The database-wide section opens every stats dump.  The only fields extracted from it are
/// the interval and cumulative write-stall lines; both are optional, and a record in which
/// every duration and percentage is zero is dropped rather than stored, so the series carries
/// signal only.
use crate::dates::{duration_from_hms, Timestamp};
use crate::patterns;

use anyhow::Result;
use chrono::Duration;
use regex::Regex;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct StallRecord {
    pub interval_duration: Duration,
    pub interval_percent: f64,
    pub cumulative_duration: Duration,
    pub cumulative_percent: f64,
}

impl StallRecord {
    fn is_all_zeroes(&self) -> bool {
        self.interval_duration.is_zero()
            && self.interval_percent == 0.0
            && self.cumulative_duration.is_zero()
            && self.cumulative_percent == 0.0
    }
}

pub struct DbWideStats {
    stalls: Vec<(Timestamp, StallRecord)>,
}

// Match one stall line and convert its `H:M:S.ms` components.  Freak values that overflow
// the integer parses are treated as a non-match.

fn try_parse_stall_line(re: &Regex, line: &str) -> Option<(Duration, f64)> {
    let caps = re.captures(line)?;
    let hours = caps[1].parse::<i64>().ok()?;
    let minutes = caps[2].parse::<i64>().ok()?;
    let seconds = caps[3].parse::<i64>().ok()?;
    let millis = caps[4].parse::<i64>().ok()?;
    let percent = caps[5].parse::<f64>().ok()?;
    Some((duration_from_hms(hours, minutes, seconds, millis), percent))
}

impl DbWideStats {
    pub fn new() -> DbWideStats {
        DbWideStats { stalls: vec![] }
    }

    /// True iff `line` is the database-wide section header.

    pub fn is_start_line(line: &str) -> bool {
        patterns::DB_STATS.is_match(line)
    }

    /// Ingest one database-wide section: `lines[0]` is the section header, the rest is
    /// scanned for the two stall lines.

    pub fn ingest(&mut self, time: Timestamp, _cf: Ustr, lines: &[&str]) -> Result<()> {
        let mut record = StallRecord {
            interval_duration: Duration::zero(),
            interval_percent: 0.0,
            cumulative_duration: Duration::zero(),
            cumulative_percent: 0.0,
        };

        for line in lines.iter().skip(1) {
            if let Some((d, p)) = try_parse_stall_line(&patterns::DB_WIDE_INTERVAL_STALL, line) {
                record.interval_duration = d;
                record.interval_percent = p;
            } else if let Some((d, p)) =
                try_parse_stall_line(&patterns::DB_WIDE_CUMULATIVE_STALL, line)
            {
                record.cumulative_duration = d;
                record.cumulative_percent = p;
            }
        }

        if !record.is_all_zeroes() {
            self.stalls.push((time, record));
        }
        Ok(())
    }

    /// The stored stall records, in ingestion order.

    pub fn stalls(&self) -> &[(Timestamp, StallRecord)] {
        &self.stalls
    }
}

#[cfg(test)]
fn ingest_lines(stats: &mut DbWideStats, time: &str, lines: &[&str]) {
    let time = crate::dates::parse_timestamp(time).unwrap();
    stats.ingest(time, Ustr::from("DB_WIDE"), lines).unwrap();
}

#[test]
fn test_stall_lines() {
    let mut stats = DbWideStats::new();
    ingest_lines(
        &mut stats,
        "2022/04/17-14:14:28.645150",
        &[
            "** DB Stats **",
            "Uptime(secs): 3.2 total, 1.6 interval",
            "Cumulative stall: 12:10:56.123 H:M:S, 98.70 percent",
            "Interval stall: 45:34:12.789 H:M:S, 12.30 percent",
        ],
    );

    let stalls = stats.stalls();
    assert!(stalls.len() == 1);
    let (_, record) = &stalls[0];
    assert!(record.cumulative_duration == duration_from_hms(12, 10, 56, 123));
    assert!(record.cumulative_percent == 98.7);
    assert!(record.interval_duration == duration_from_hms(45, 34, 12, 789));
    assert!(record.interval_percent == 12.3);
}

#[test]
fn test_all_zeroes_dropped() {
    let mut stats = DbWideStats::new();
    ingest_lines(
        &mut stats,
        "2022/04/17-14:14:28.645150",
        &[
            "** DB Stats **",
            "Interval stall: 00:00:00.000 H:M:S, 0.00 percent",
            "Cumulative stall: 00:00:00.000 H:M:S, 0.00 percent",
        ],
    );
    assert!(stats.stalls().is_empty());

    // No stall lines at all is the degenerate all-zero case.
    ingest_lines(
        &mut stats,
        "2022/04/17-14:15:28.645150",
        &["** DB Stats **", "Uptime(secs): 3.2 total, 1.6 interval"],
    );
    assert!(stats.stalls().is_empty());

    // But a nonzero percentage alone is signal.
    ingest_lines(
        &mut stats,
        "2022/04/17-14:16:28.645150",
        &["** DB Stats **", "Interval stall: 00:00:00.000 H:M:S, 2.50 percent"],
    );
    assert!(stats.stalls().len() == 1);
}
