/// Statistics dump parsing.
///
/// A stats dump spans one log entry that opens with the dump marker, one entry holding the
/// whole multi-section dump body, and optionally one trailing `STATISTICS:` entry with the
/// aggregate counters and histograms.  The body has no section terminators: a section runs
/// until a line that some classifier recognizes as the start of the next section, so the
/// scanner re-derives the boundaries from content alone.
///
/// Classifiers are applied in a fixed priority order.  The stall-counter classifier matches
/// the uptime line, which also appears inside the database-wide section, so it is suppressed
/// while the database-wide section is current; that suppression is a load-bearing part of
/// the boundary contract, not an optimization.
///
/// A column family name embedded in a freshly matched header applies to the *next* range:
/// the range being dispatched belongs to the section whose header opened it.
use crate::blob::BlobStats;
use crate::blockcache::BlockCacheStats;
use crate::cfstalls::CfStallStats;
use crate::compaction::CompactionStats;
use crate::counters::CounterStats;
use crate::dates::Timestamp;
use crate::dbwide::DbWideStats;
use crate::entry::LogEntry;
use crate::filehist::FileHistogramStats;
use crate::patterns;

use anyhow::{bail, Error, Result};
use ustr::Ustr;

/// The pseudo column family name under which database-wide (family-less) data is filed.

pub const NO_COL_FAMILY: &str = "DB_WIDE";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SectionKind {
    DbWide,
    Compaction,
    Blob,
    BlockCache,
    CfStalls,
    CfFileHistogram,
}

/// One failed dump: where it started, when it was stamped, and why it failed.  The sections
/// ingested before the failure remain stored; everything after the failing line is skipped.

#[derive(Debug)]
pub struct DumpFailure {
    pub entry_idx: usize,
    pub timestamp: Timestamp,
    pub error: Error,
}

/// All the series harvested from the stats dumps of a log.  Each section kind owns its own
/// store; the orchestrator here owns nothing but the dispatch bookkeeping for the dump being
/// parsed.

pub struct StatsStore {
    pub db_wide: DbWideStats,
    pub compaction: CompactionStats,
    pub blob: BlobStats,
    pub block_cache: BlockCacheStats,
    pub cf_stalls: CfStallStats,
    pub file_histograms: FileHistogramStats,
    pub counters: CounterStats,
}

/// True iff `entry` is the dump-start marker entry.

pub fn is_dump_start(entry: &LogEntry) -> bool {
    match entry.msg_lines.first() {
        Some(line) => line.trim_start().starts_with(patterns::DUMP_STATS_MARKER),
        None => false,
    }
}

impl StatsStore {
    pub fn new() -> StatsStore {
        StatsStore {
            db_wide: DbWideStats::new(),
            compaction: CompactionStats::new(),
            blob: BlobStats::new(),
            block_cache: BlockCacheStats::new(),
            cf_stalls: CfStallStats::new(),
            file_histograms: FileHistogramStats::new(),
            counters: CounterStats::new(),
        }
    }

    /// Try to ingest the dump starting at `entries[start]`.
    ///
    /// Returns `Ok(None)` when `entries[start]` is not a dump-start marker (nothing is
    /// consumed), `Ok(Some(next))` with the index just past the dump when ingestion
    /// succeeded, and an error when the dump is structurally broken.  On error the caller
    /// should resume scanning right after the marker.

    pub fn try_ingest_dump(&mut self, entries: &[LogEntry], start: usize) -> Result<Option<usize>> {
        let mut entry_idx = start;
        match entries.get(entry_idx) {
            Some(marker) if is_dump_start(marker) => {}
            _ => return Ok(None),
        }
        entry_idx += 1;

        let body = match entries.get(entry_idx) {
            Some(body) => body,
            None => bail!("dump marker at entry {start} has no dump body"),
        };
        let lines = body.msg_lines.iter().map(|l| l.trim()).collect::<Vec<&str>>();
        match lines.first() {
            Some(first) if DbWideStats::is_start_line(first) => {}
            _ => bail!(
                "entry {entry_idx}: stats dump does not open with the database-wide header"
            ),
        }
        let time = body.timestamp;
        entry_idx += 1;

        let mut cursor = 0;
        let mut kind = SectionKind::DbWide;
        let mut cf = Ustr::from(NO_COL_FAMILY);
        while cursor < lines.len() {
            let (next, found) = find_next_section(&lines, cursor, kind);
            if next <= cursor {
                // A classifier matched the line the previous round already consumed.
                bail!("entry {}: section scan stuck at line {cursor}", entry_idx - 1);
            }

            self.dispatch(kind, time, cf, &lines[cursor..next])?;

            cursor = next;
            if let Some((next_kind, next_cf)) = found {
                kind = next_kind;
                if let Some(name) = next_cf {
                    cf = name;
                }
            }
        }

        // The aggregate counters/histograms entry is optional; when present it is a single
        // self-contained entry right after the dump body.
        if let Some(entry) = entries.get(entry_idx) {
            if CounterStats::is_stats_entry(entry) {
                self.counters.ingest_entry(entry)?;
                entry_idx += 1;
            }
        }

        Ok(Some(entry_idx))
    }

    fn dispatch(
        &mut self,
        kind: SectionKind,
        time: Timestamp,
        cf: Ustr,
        lines: &[&str],
    ) -> Result<()> {
        match kind {
            SectionKind::DbWide => self.db_wide.ingest(time, cf, lines),
            SectionKind::Compaction => self.compaction.ingest(time, cf, lines),
            SectionKind::Blob => self.blob.ingest(time, cf, lines),
            SectionKind::BlockCache => self.block_cache.ingest(time, cf, lines),
            SectionKind::CfStalls => self.cf_stalls.ingest(time, cf, lines),
            SectionKind::CfFileHistogram => self.file_histograms.ingest(time, cf, lines),
        }
    }

    /// Ingest every dump found in `entries`, collecting a failure per broken dump instead of
    /// giving up; the series from intact dumps are unaffected by the broken ones.

    pub fn collect(&mut self, entries: &[LogEntry]) -> Vec<DumpFailure> {
        let mut failures = vec![];
        let mut i = 0;
        while i < entries.len() {
            match self.try_ingest_dump(entries, i) {
                Ok(Some(next)) => i = next,
                Ok(None) => i += 1,
                Err(error) => {
                    failures.push(DumpFailure {
                        entry_idx: i,
                        timestamp: entries[i].timestamp,
                        error,
                    });
                    // Resume scanning for the next dump right after the marker.
                    i += 1;
                }
            }
        }
        failures
    }
}

/// Parse all of `entries` into a fresh store.

pub fn collect_stats(entries: &[LogEntry]) -> (StatsStore, Vec<DumpFailure>) {
    let mut store = StatsStore::new();
    let failures = store.collect(entries);
    (store, failures)
}

// Scan forward from just past `from` for the first line some classifier claims, in fixed
// priority order.  Returns the line index together with the matched kind and any embedded
// column family name; the index is `lines.len()` and the kind `None` when nothing matched.

fn find_next_section(
    lines: &[&str],
    from: usize,
    current: SectionKind,
) -> (usize, Option<(SectionKind, Option<Ustr>)>) {
    let mut idx = from + 1;
    while idx < lines.len() {
        let line = lines[idx];
        if let Some(cf) = CompactionStats::parse_start_line(line) {
            return (idx, Some((SectionKind::Compaction, Some(cf))));
        } else if BlobStats::is_start_line(line) {
            return (idx, Some((SectionKind::Blob, None)));
        } else if BlockCacheStats::is_start_line(line) {
            return (idx, Some((SectionKind::BlockCache, None)));
        } else if let Some(cf) = FileHistogramStats::parse_start_line(line) {
            return (idx, Some((SectionKind::CfFileHistogram, Some(cf))));
        } else if CfStallStats::is_start_line(line) && current != SectionKind::DbWide {
            return (idx, Some((SectionKind::CfStalls, None)));
        }
        idx += 1;
    }
    (idx, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::RowKey;
    use crate::dates::parse_timestamp;
    use crate::logfile::parse_log;

    // A two-family dump in the engine's own layout, plus the trailing aggregate entry.
    const LOG: &str = "\
2023/01/05-08:00:00.000000 7f4a9fdff700 [/db_impl/db_impl.cc:1082] ------- DUMPING STATS -------
2023/01/05-08:00:00.000100 7f4a9fdff700 [/db_impl/db_impl.cc:1083] ** DB Stats **
Uptime(secs): 60.1 total, 60.1 interval
Interval stall: 00:00:01.500 H:M:S, 2.50 percent
Cumulative stall: 01:00:00.000 H:M:S, 10.00 percent
** Compaction Stats [default] **
Level    Files   Size     Score
------------------------------
  L0      2/0   45.67 MB   0.5
  Sum     2/0   45.67 MB   0.5
Blob file count: 3, total size: 1.5 GB, garbage size: 0.5 GB, space amp: 1.2
Block cache LRUCache@0x5600bb634770 capacity: 8.00 MB collections: 1 last_copies: 0 last_secs: 0.000229 secs_since: 0
Block cache entry stats(count,size,portion): DataBlock(1240,3.00 MB,37.5%)
Uptime(secs): 60.1 total, 60.1 interval
Stalls(count): 12 level0_slowdown, 0 memtable_compaction, interval 12 total count
** File Read Latency Histogram By Level [default] **
** Compaction Stats [mycf] **
Level    Files   Size     Score
------------------------------
  L0      1/0    1.00 MB   0.1
  Sum     1/0    1.00 MB   0.1
Uptime(secs): 60.1 total, 60.1 interval
Stalls(count): 3 memtable_compaction, interval 3 total count
2023/01/05-08:00:00.000200 7f4a9fdff700 [/db_impl/db_impl.cc:1085] STATISTICS:
rocksdb.block.cache.miss COUNT : 61
rocksdb.db.get.micros P50 : 1.50 P95 : 2.50 P99 : 3.50 P100 : 4.50 COUNT : 10 SUM : 100
2023/01/05-08:00:01.000000 7f4a9fdff700 [/db_impl/db_impl.cc:1500] some unrelated entry
";

    #[test]
    fn test_ingest_dump() {
        let (entries, discarded) = parse_log(LOG);
        assert!(discarded == 0);
        let (store, failures) = collect_stats(&entries);
        assert!(failures.is_empty());

        // The dump's timestamp is the body entry's, right after the marker.
        let dump_time = parse_timestamp("2023/01/05-08:00:00.000100").unwrap();
        let stalls = store.db_wide.stalls();
        assert!(stalls.len() == 1);
        assert!(stalls[0].0 == dump_time);
        assert!(stalls[0].1.interval_percent == 2.5);
        assert!(stalls[0].1.cumulative_percent == 10.0);

        let default = Ustr::from("default");
        let tables = store.compaction.level_entries(default);
        assert!(tables.len() == 1);
        assert!(tables[0].0 == dump_time);
        let keys = tables[0].1.keys().copied().collect::<Vec<RowKey>>();
        assert!(keys == vec![RowKey::Level(0), RowKey::Sum]);

        let mycf = Ustr::from("mycf");
        assert!(store.compaction.level_entries(mycf).len() == 1);

        // Stall counters land on the family whose block they appear in.
        assert!(store.cf_stalls.cf_entries(default)[0].1.interval_total == 12);
        assert!(store.cf_stalls.cf_entries(mycf)[0].1.interval_total == 3);

        assert!(store.blob.cf_entries(default).len() == 1);
        assert!(store.block_cache.cache_ids().len() == 1);

        // The trailing aggregate entry was consumed with the dump.
        let miss = Ustr::from("rocksdb.block.cache.miss");
        assert!(store.counters.last_counter_value(miss) == 61);
        assert!(store.counters.counter_entries(miss)[0].time
            == parse_timestamp("2023/01/05-08:00:00.000200").unwrap());
    }

    #[test]
    fn test_not_a_dump_is_declined() {
        let (entries, _) = parse_log(
            "2023/01/05-08:00:00.000000 7f4a9fdff700 [/version_set.cc:4965] Recovered from manifest\n",
        );
        let mut store = StatsStore::new();
        assert!(matches!(store.try_ingest_dump(&entries, 0), Ok(None)));
    }

    #[test]
    fn test_missing_db_wide_header_fails() {
        let (entries, _) = parse_log(
            "2023/01/05-08:00:00.000000 7f4a9fdff700 ------- DUMPING STATS -------\n\
             2023/01/05-08:00:00.000100 7f4a9fdff700 not the stats body\n",
        );
        let mut store = StatsStore::new();
        assert!(store.try_ingest_dump(&entries, 0).is_err());

        // collect() records the failure and keeps going.
        let failures = store.collect(&entries);
        assert!(failures.len() == 1);
        assert!(failures[0].entry_idx == 0);
    }

    #[test]
    fn test_broken_dump_does_not_poison_later_dumps() {
        let broken = "\
2023/01/05-07:59:00.000000 7f4a9fdff700 ------- DUMPING STATS -------
2023/01/05-07:59:00.000100 7f4a9fdff700 ** DB Stats **
** Compaction Stats [default] **
Level    Files   Size     Score
------------------------------
  L0      2/0   45.67 MB   0.5
";
        let text = format!("{broken}{LOG}");
        let (entries, _) = parse_log(&text);
        let (store, failures) = collect_stats(&entries);

        // The first dump's level table has no Sum row; the second dump is intact.
        assert!(failures.len() == 1);
        assert!(failures[0].entry_idx == 0);
        assert!(store.compaction.level_entries(Ustr::from("default")).len() == 1);
        assert!(store.db_wide.stalls().len() == 1);
    }

    #[test]
    fn test_reingesting_appends() {
        let (entries, _) = parse_log(LOG);
        let mut store = StatsStore::new();
        assert!(store.collect(&entries).is_empty());
        assert!(store.collect(&entries).is_empty());

        // Same buffer twice: two independent, identical-valued series entries.
        let stalls = store.db_wide.stalls();
        assert!(stalls.len() == 2);
        assert!(stalls[0] == stalls[1]);
        assert!(store.compaction.level_entries(Ustr::from("default")).len() == 2);
    }
}
