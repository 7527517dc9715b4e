/// Per-column-family stall counters.
///
/// Every column family's no-file stats block (the block opened by an uptime line) carries a
/// `Stalls(count):` line: a run of `<count> <reason>,` pairs and a trailing interval total.
/// The source log is known to truncate this line mid-way on occasion; a record whose trailing
/// total is missing is discarded wholesale, as is a record whose counts and total sum to
/// zero.
use crate::dates::Timestamp;
use crate::patterns;

use anyhow::Result;
use std::collections::HashMap;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct StallCounts {
    /// `(reason, count)` pairs in the order printed.
    pub counts: Vec<(Ustr, u64)>,

    /// The trailing `interval <n> total count` field.
    pub interval_total: u64,
}

impl StallCounts {
    pub fn count_for(&self, reason: Ustr) -> u64 {
        self.counts
            .iter()
            .find(|(r, _)| *r == reason)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

pub struct CfStallStats {
    stall_counts: HashMap<Ustr, Vec<(Timestamp, StallCounts)>>,
}

impl CfStallStats {
    pub fn new() -> CfStallStats {
        CfStallStats {
            stall_counts: HashMap::new(),
        }
    }

    /// True iff `line` opens a no-file stats block.  This is the uptime line, which also
    /// opens the database-wide section; the section scanner suppresses this classifier while
    /// the database-wide section is current.

    pub fn is_start_line(line: &str) -> bool {
        patterns::UPTIME_LINE.is_match(line)
    }

    /// Ingest one no-file block, picking out the stall counter line if there is a usable one.

    pub fn ingest(&mut self, time: Timestamp, cf: Ustr, lines: &[&str]) -> Result<()> {
        for line in lines {
            if let Some(counts) = parse_stall_count_line(line.trim()) {
                self.stall_counts.entry(cf).or_default().push((time, counts));
            }
        }
        Ok(())
    }

    /// The stored counter records for one column family, in ingestion order.

    pub fn cf_entries(&self, cf: Ustr) -> &[(Timestamp, StallCounts)] {
        self.stall_counts.get(&cf).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The column families seen so far, sorted by name.

    pub fn column_families(&self) -> Vec<Ustr> {
        let mut cfs = self.stall_counts.keys().copied().collect::<Vec<Ustr>>();
        cfs.sort();
        cfs
    }
}

// Parse one stall counter line, or return None for lines that are not stall counter lines
// and for the discarded degeneracies (truncated trailer, no pairs, all zero).

fn parse_stall_count_line(line: &str) -> Option<StallCounts> {
    if !line.starts_with(patterns::CF_STALLS_LINE_START) {
        return None;
    }

    let mut counts = vec![];
    let mut sum = 0u64;
    for caps in patterns::CF_STALLS_COUNT_AND_REASON.captures_iter(line) {
        let count = caps[1].parse::<u64>().ok()?;
        counts.push((Ustr::from(&caps[2]), count));
        sum += count;
    }
    if counts.is_empty() {
        return None;
    }

    let interval_total = patterns::CF_STALLS_INTERVAL_COUNT
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<u64>()
        .ok()?;

    if sum + interval_total == 0 {
        return None;
    }
    Some(StallCounts { counts, interval_total })
}

#[cfg(test)]
const STALLS_LINE: &str = "Stalls(count): 12 level0_slowdown, 4 level0_slowdown_with_compaction, \
     0 level0_numfiles, 0 memtable_compaction, interval 16 total count";

#[cfg(test)]
fn ts(s: &str) -> Timestamp {
    crate::dates::parse_timestamp(s).unwrap()
}

#[test]
fn test_stall_counts() {
    let mut stats = CfStallStats::new();
    let cf = Ustr::from("default");
    stats
        .ingest(
            ts("2022/04/17-14:14:28.645150"),
            cf,
            &["Uptime(secs): 3.2 total, 1.6 interval", "Flush(GB): cumulative 0.001", STALLS_LINE],
        )
        .unwrap();

    let entries = stats.cf_entries(cf);
    assert!(entries.len() == 1);
    let (_, counts) = &entries[0];
    assert!(counts.counts.len() == 4);
    assert!(counts.count_for(Ustr::from("level0_slowdown")) == 12);
    assert!(counts.count_for(Ustr::from("level0_numfiles")) == 0);
    assert!(counts.count_for(Ustr::from("nosuch")) == 0);
    assert!(counts.interval_total == 16);
}

#[test]
fn test_truncated_trailer_is_dropped() {
    let mut stats = CfStallStats::new();
    let cf = Ustr::from("default");
    stats
        .ingest(
            ts("2022/04/17-14:14:28.645150"),
            cf,
            &["Stalls(count): 12 level0_slowdown, 4 level0_numfi"],
        )
        .unwrap();
    assert!(stats.cf_entries(cf).is_empty());
}

#[test]
fn test_all_zero_counts_are_dropped() {
    let mut stats = CfStallStats::new();
    let cf = Ustr::from("default");
    stats
        .ingest(
            ts("2022/04/17-14:14:28.645150"),
            cf,
            &["Stalls(count): 0 level0_slowdown, 0 memtable_compaction, interval 0 total count"],
        )
        .unwrap();
    assert!(stats.cf_entries(cf).is_empty());
}
