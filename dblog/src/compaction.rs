/// Per-column-family compaction statistics.
///
/// The compaction section comes in two layouts, told apart by the first token of the first
/// content line.  The `Level` layout is a table: a header line, a dash separator, then one
/// row per storage level plus the aggregate `Sum`/`Int`/`User` rows.  The `Priority` layout
/// is recognized and consumed but its body is not decomposed into fields.
///
/// A header that does not look like a level table (wrong leading columns, separator not made
/// of dashes) abandons the parse for this call without storing anything and without raising;
/// an unrecognized row type or a table without the `Sum` row is a structural failure.
use crate::dates::Timestamp;
use crate::patterns;
use crate::units::value_by_unit;

use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use ustr::Ustr;

/// Key of one row of a level table.  `Level` rows sort below the aggregate rows.

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Level(u32),
    Sum,
    Interval,
    User,
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowKey::Level(n) => write!(f, "LEVEL-{n}"),
            RowKey::Sum => write!(f, "SUM"),
            RowKey::Interval => write!(f, "INTERVAL"),
            RowKey::User => write!(f, "USER"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LevelRow {
    /// File count on this level.
    pub num_files: u32,

    /// File count being compacted on this level.
    pub cf_num_files: u32,

    /// The `Size` column, resolved to bytes.
    pub size_bytes: u64,

    /// The remaining columns, keyed by the header names following `Size`, values as printed.
    pub cols: Vec<(String, String)>,
}

/// One parsed level table: rows keyed by their row key.

pub type LevelTable = BTreeMap<RowKey, LevelRow>;

pub struct CompactionStats {
    level_entries: HashMap<Ustr, Vec<(Timestamp, LevelTable)>>,
}

fn row_key(token: &str) -> Option<RowKey> {
    match token {
        "Sum" => Some(RowKey::Sum),
        "Int" => Some(RowKey::Interval),
        "User" => Some(RowKey::User),
        _ => {
            let caps = patterns::LEVEL_ROW.captures(token)?;
            Some(RowKey::Level(caps[1].parse::<u32>().ok()?))
        }
    }
}

impl CompactionStats {
    pub fn new() -> CompactionStats {
        CompactionStats {
            level_entries: HashMap::new(),
        }
    }

    /// Extract the column family name from a section header line, if it is one.

    pub fn parse_start_line(line: &str) -> Option<Ustr> {
        let caps = patterns::COMPACTION_STATS.captures(line)?;
        Some(Ustr::from(&caps[1]))
    }

    pub fn is_start_line(line: &str) -> bool {
        CompactionStats::parse_start_line(line).is_some()
    }

    /// Ingest one compaction section: `lines[0]` is the section header for `cf`, the rest is
    /// the table body in one of the two layouts.

    pub fn ingest(&mut self, time: Timestamp, cf: Ustr, lines: &[&str]) -> Result<()> {
        match lines.first().and_then(|l| CompactionStats::parse_start_line(l)) {
            Some(header_cf) if header_cf == cf => {}
            _ => bail!("compaction section header does not name column family {cf}"),
        }

        match lines.get(1).map(|l| l.split_whitespace().next()) {
            Some(Some("Level")) => self.parse_level_table(time, cf, &lines[1..]),
            Some(Some("Priority")) => {
                // Not decomposed.  Some deployments have no content here at all; fewer than
                // four body lines is a successful no-op as well.
                Ok(())
            }
            // Unrecognized layout: skip.
            _ => Ok(()),
        }
    }

    fn parse_level_table(&mut self, time: Timestamp, cf: Ustr, lines: &[&str]) -> Result<()> {
        let header = match parse_header_line(lines[0], lines.get(1).copied().unwrap_or("")) {
            Some(fields) => fields,
            None => return Ok(()),
        };

        let mut table = LevelTable::new();
        for line in &lines[2..] {
            let fields = line.split_whitespace().collect::<Vec<&str>>();
            if fields.is_empty() {
                continue;
            }

            let key = match row_key(fields[0]) {
                Some(key) => key,
                None => bail!("unrecognized row type {} in level table for {cf}", fields[0]),
            };

            let files = match fields.get(1).and_then(|f| patterns::FILES_FIELD.captures(f)) {
                Some(caps) => caps,
                // Rows without a files column: abandon the table.
                None => return Ok(()),
            };
            let num_files = files[1].parse::<u32>()?;
            let cf_num_files = files[2].parse::<u32>()?;

            let (size_value, size_unit) = match (fields.get(2), fields.get(3)) {
                (Some(v), Some(u)) => (*v, *u),
                _ => return Ok(()),
            };
            let size_bytes = value_by_unit(size_value, size_unit)?;

            // The size value and unit are two tokens, so the columns after `Size` live one
            // token further right than their header index.
            let mut cols = vec![];
            for (i, name) in header.iter().enumerate().skip(3) {
                match fields.get(i + 1) {
                    Some(v) => cols.push((name.to_string(), v.to_string())),
                    None => break,
                }
            }

            table.insert(key, LevelRow { num_files, cf_num_files, size_bytes, cols });
        }

        if !table.contains_key(&RowKey::Sum) {
            bail!("level table for {cf} has no Sum row");
        }

        self.level_entries.entry(cf).or_default().push((time, table));
        Ok(())
    }

    /// The stored tables for one column family, in ingestion order.

    pub fn level_entries(&self, cf: Ustr) -> &[(Timestamp, LevelTable)] {
        self.level_entries.get(&cf).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The column families seen so far, sorted by name.

    pub fn column_families(&self) -> Vec<Ustr> {
        let mut cfs = self.level_entries.keys().copied().collect::<Vec<Ustr>>();
        cfs.sort();
        cfs
    }

    /// Size of the column family per the Sum row of its most recent table, 0 if unknown.

    pub fn cf_size_bytes(&self, cf: Ustr) -> u64 {
        match self.level_entries(cf).last() {
            Some((_, table)) => table.get(&RowKey::Sum).map(|r| r.size_bytes).unwrap_or(0),
            None => 0,
        }
    }
}

// The separator under the header must be all dashes, and the header must open with the three
// columns every level table starts with.

fn parse_header_line<'a>(header_line: &'a str, separator_line: &str) -> Option<Vec<&'a str>> {
    let sep = separator_line.trim();
    if sep.is_empty() || !sep.chars().all(|c| c == '-') {
        return None;
    }
    let fields = header_line.split_whitespace().collect::<Vec<&str>>();
    if fields.len() < 3 || fields[0] != "Level" || fields[1] != "Files" || fields[2] != "Size" {
        return None;
    }
    Some(fields)
}

#[cfg(test)]
const LEVEL_SECTION: &[&str] = &[
    "** Compaction Stats [default] **",
    "Level    Files   Size     Score Read(GB)  Rn(GB) Rnp1(GB) Write(GB)",
    "----------------------------------------------------------------",
    "  L0      2/0   45.67 MB   0.5      0.0     0.0      0.0       0.2",
    "  L6      1/0    2.00 GB   0.0      0.0     0.0      0.0       0.0",
    "  Sum     3/0    2.04 GB   0.0      0.0     0.0      0.0       0.2",
    "  Int     0/0    0.00 KB   0.0      0.0     0.0      0.0       0.0",
];

#[cfg(test)]
fn ts(s: &str) -> Timestamp {
    crate::dates::parse_timestamp(s).unwrap()
}

#[test]
fn test_level_table() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");
    stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, LEVEL_SECTION).unwrap();

    let entries = stats.level_entries(cf);
    assert!(entries.len() == 1);
    let (_, table) = &entries[0];
    assert!(table.len() == 4);

    let l0 = table.get(&RowKey::Level(0)).unwrap();
    assert!(l0.num_files == 2 && l0.cf_num_files == 0);
    assert!(l0.size_bytes == value_by_unit("45.67", "MB").unwrap());
    // Columns after Size are aligned with their header names.
    assert!(l0.cols[0] == ("Score".to_string(), "0.5".to_string()));
    assert!(l0.cols.last().unwrap() == &("Write(GB)".to_string(), "0.2".to_string()));

    let sum = table.get(&RowKey::Sum).unwrap();
    assert!(sum.num_files == 3);
    assert!(stats.cf_size_bytes(cf) == value_by_unit("2.04", "GB").unwrap());
    assert!(stats.cf_size_bytes(Ustr::from("nosuch")) == 0);
}

#[test]
fn test_missing_sum_row_fails() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");
    let lines = &[
        "** Compaction Stats [default] **",
        "Level    Files   Size     Score",
        "------------------------------",
        "  L0      2/0   45.67 MB   0.5",
    ];
    assert!(stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, lines).is_err());
    assert!(stats.level_entries(cf).is_empty());
}

#[test]
fn test_unrecognized_row_fails() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");
    let lines = &[
        "** Compaction Stats [default] **",
        "Level    Files   Size     Score",
        "------------------------------",
        "  Bogus   2/0   45.67 MB   0.5",
    ];
    assert!(stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, lines).is_err());
}

#[test]
fn test_malformed_header_is_skipped() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");

    // Separator is not all dashes.
    let lines = &[
        "** Compaction Stats [default] **",
        "Level    Files   Size     Score",
        "---- oops ----",
        "  Sum     3/0    2.04 GB   0.0",
    ];
    stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, lines).unwrap();
    assert!(stats.level_entries(cf).is_empty());

    // Wrong leading column names.
    let lines = &[
        "** Compaction Stats [default] **",
        "Tier     Files   Size     Score",
        "------------------------------",
        "  Sum     3/0    2.04 GB   0.0",
    ];
    stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, lines).unwrap();
    assert!(stats.level_entries(cf).is_empty());
}

#[test]
fn test_priority_layout_is_inert() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");
    let lines = &["** Compaction Stats [default] **", "Priority    Files   Size"];
    stats.ingest(ts("2022/04/17-14:14:28.645150"), cf, lines).unwrap();
    assert!(stats.level_entries(cf).is_empty());
}

#[test]
fn test_repeated_entries_append() {
    let mut stats = CompactionStats::new();
    let cf = Ustr::from("default");
    let t = ts("2022/04/17-14:14:28.645150");
    stats.ingest(t, cf, LEVEL_SECTION).unwrap();
    stats.ingest(t, cf, LEVEL_SECTION).unwrap();
    // Same (cf, timestamp) twice: both are kept, history is append-only.
    assert!(stats.level_entries(cf).len() == 2);
}
