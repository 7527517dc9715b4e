/// Aggregate counters and histograms.
///
/// When the engine is built with statistics enabled, every stats dump is followed by one
/// self-contained `STATISTICS:` entry whose lines are either counters (`name COUNT : n`) or
/// histograms (`name P50 : ... COUNT : n SUM : m`).  Counter names are remembered in the
/// order they first appear, which is the order the engine prints them in and the order users
/// expect to see them again.
///
/// A histogram observation is stored only when both its count and sum are strictly positive;
/// the engine emits degenerate lines (e.g. a positive count with a zero sum) for some
/// histograms and those carry no usable signal.
use crate::dates::Timestamp;
use crate::entry::LogEntry;
use crate::patterns;

use anyhow::{bail, Result};
use itertools::Itertools;
use std::collections::HashMap;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub time: Timestamp,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    pub time: Timestamp,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub p100: f64,
    pub count: u64,
    pub sum: u64,
    pub average: f64,
}

pub struct CounterStats {
    // Counter names in first-appearance order.
    counter_names: Vec<Ustr>,
    counters: HashMap<Ustr, Vec<CounterSample>>,

    // Histogram names in first-appearance order.
    histogram_names: Vec<Ustr>,
    histograms: HashMap<Ustr, Vec<HistogramSample>>,
}

impl CounterStats {
    pub fn new() -> CounterStats {
        CounterStats {
            counter_names: vec![],
            counters: HashMap::new(),
            histogram_names: vec![],
            histograms: HashMap::new(),
        }
    }

    pub fn is_start_line(line: &str) -> bool {
        patterns::STATS_COUNTERS_AND_HISTOGRAMS.is_match(line)
    }

    /// True iff `entry` is an aggregate counters/histograms entry.

    pub fn is_stats_entry(entry: &LogEntry) -> bool {
        match entry.msg_lines.first() {
            Some(line) => CounterStats::is_start_line(line),
            None => false,
        }
    }

    /// Ingest one aggregate entry.  The format is internally consistent once the entry is
    /// recognized, so a line matching neither pattern is a hard failure.

    pub fn ingest_entry(&mut self, entry: &LogEntry) -> Result<()> {
        if !CounterStats::is_stats_entry(entry) {
            bail!(
                "line {}: not a statistics entry",
                entry.start_line_idx + 1
            );
        }

        let time = entry.timestamp;
        for line in entry.msg_lines.iter().skip(1) {
            if self.try_parse_counter_line(time, line) {
                continue;
            }
            if self.try_parse_histogram_line(time, line) {
                continue;
            }
            bail!(
                "line {}: unrecognized statistics line: {line}",
                entry.start_line_idx + 1
            );
        }
        Ok(())
    }

    fn try_parse_counter_line(&mut self, time: Timestamp, line: &str) -> bool {
        let caps = match patterns::STATS_COUNTER.captures(line) {
            Some(caps) => caps,
            None => return false,
        };
        let value = match caps[2].parse::<u64>() {
            Ok(value) => value,
            Err(_) => return false,
        };
        let name = Ustr::from(&caps[1]);
        if !self.counters.contains_key(&name) {
            self.counter_names.push(name);
            self.counters.insert(name, vec![]);
        }
        if let Some(samples) = self.counters.get_mut(&name) {
            samples.push(CounterSample { time, value });
        }
        true
    }

    fn try_parse_histogram_line(&mut self, time: Timestamp, line: &str) -> bool {
        let caps = match patterns::STATS_HISTOGRAM.captures(line) {
            Some(caps) => caps,
            None => return false,
        };
        let (count, sum) = match (caps[6].parse::<u64>(), caps[7].parse::<u64>()) {
            (Ok(count), Ok(sum)) => (count, sum),
            _ => return false,
        };

        // The line is a histogram line even when the observation is dropped below.
        if count == 0 || sum == 0 {
            return true;
        }
        let (p50, p95, p99, p100) = match (
            caps[2].parse::<f64>(),
            caps[3].parse::<f64>(),
            caps[4].parse::<f64>(),
            caps[5].parse::<f64>(),
        ) {
            (Ok(p50), Ok(p95), Ok(p99), Ok(p100)) => (p50, p95, p99, p100),
            _ => return false,
        };

        let average = (count as f64 / sum as f64 * 100.0).round() / 100.0;
        let name = Ustr::from(&caps[1]);
        if !self.histograms.contains_key(&name) {
            self.histogram_names.push(name);
            self.histograms.insert(name, vec![]);
        }
        if let Some(samples) = self.histograms.get_mut(&name) {
            samples.push(HistogramSample { time, p50, p95, p99, p100, count, sum, average });
        }
        true
    }

    /// Counter names in first-appearance order.

    pub fn counter_names(&self) -> &[Ustr] {
        &self.counter_names
    }

    /// Histogram names in first-appearance order.

    pub fn histogram_names(&self) -> &[Ustr] {
        &self.histogram_names
    }

    /// Full history for one counter, oldest first; empty when unknown.

    pub fn counter_entries(&self, name: Ustr) -> &[CounterSample] {
        self.counters.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The most recent value for one counter, 0 when unknown.

    pub fn last_counter_value(&self, name: Ustr) -> u64 {
        self.counter_entries(name).last().map(|s| s.value).unwrap_or(0)
    }

    /// The sorted union of all counter observation times.

    pub fn counter_times(&self) -> Vec<Timestamp> {
        self.counters
            .values()
            .flatten()
            .map(|s| s.time)
            .sorted()
            .dedup()
            .collect()
    }

    /// Full history for one histogram, oldest first; empty when unknown.

    pub fn histogram_entries(&self, name: Ustr) -> &[HistogramSample] {
        self.histograms.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
fn stats_entry(time: &str, lines: &[&str]) -> LogEntry {
    let mut entry =
        LogEntry::new(0, &format!("{time} 7f4a9fdff700 [/db_impl.cc:1000] STATISTICS:")).unwrap();
    for line in lines {
        entry.add_line(line).unwrap();
    }
    entry.finalize().unwrap();
    entry
}

#[test]
fn test_counters() {
    let mut stats = CounterStats::new();
    stats
        .ingest_entry(&stats_entry(
            "2022/04/17-14:14:28.645150",
            &[
                "rocksdb.block.cache.miss COUNT : 61",
                "rocksdb.block.cache.hit COUNT : 0",
                "rocksdb.db.get.micros P50 : 1.50 P95 : 2.50 P99 : 3.50 P100 : 4.50 COUNT : 10 SUM : 100",
            ],
        ))
        .unwrap();
    stats
        .ingest_entry(&stats_entry(
            "2022/04/17-14:15:28.645150",
            &["rocksdb.block.cache.miss COUNT : 100"],
        ))
        .unwrap();

    let miss = Ustr::from("rocksdb.block.cache.miss");
    let hit = Ustr::from("rocksdb.block.cache.hit");
    assert!(stats.counter_names() == &[miss, hit]);
    assert!(stats.counter_entries(miss).len() == 2);
    assert!(stats.last_counter_value(miss) == 100);
    assert!(stats.last_counter_value(hit) == 0);
    assert!(stats.last_counter_value(Ustr::from("nosuch")) == 0);
    assert!(stats.counter_times().len() == 2);
}

#[test]
fn test_histogram_average_and_drops() {
    let mut stats = CounterStats::new();
    stats
        .ingest_entry(&stats_entry(
            "2022/04/17-14:14:28.645150",
            &[
                "rocksdb.db.get.micros P50 : 1.50 P95 : 2.50 P99 : 3.50 P100 : 4.50 COUNT : 10 SUM : 100",
                "rocksdb.db.write.micros P50 : 0.00 P95 : 0.00 P99 : 0.00 P100 : 0.00 COUNT : 0 SUM : 0",
                "rocksdb.prefetched.bytes.discarded P50 : 1.00 P95 : 1.00 P99 : 1.00 P100 : 1.00 COUNT : 5 SUM : 0",
            ],
        ))
        .unwrap();

    let get = Ustr::from("rocksdb.db.get.micros");
    let samples = stats.histogram_entries(get);
    assert!(samples.len() == 1);
    assert!(samples[0].p50 == 1.5 && samples[0].p100 == 4.5);
    assert!(samples[0].count == 10 && samples[0].sum == 100);
    assert!(samples[0].average == 0.10);

    // Degenerate observations are dropped, and so are their names.
    assert!(stats.histogram_entries(Ustr::from("rocksdb.db.write.micros")).is_empty());
    assert!(stats.histogram_entries(Ustr::from("rocksdb.prefetched.bytes.discarded")).is_empty());
    assert!(stats.histogram_names() == &[get]);
}

#[test]
fn test_unrecognized_line_is_fatal() {
    let mut stats = CounterStats::new();
    let entry = stats_entry("2022/04/17-14:14:28.645150", &["this is not a statistics line"]);
    assert!(stats.ingest_entry(&entry).is_err());
}
