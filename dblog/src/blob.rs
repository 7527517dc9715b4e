/// Per-column-family blob file statistics.
///
/// A single-line section: file count, total and garbage sizes (always printed in GB), and
/// the space amplification ratio.
use crate::dates::Timestamp;
use crate::patterns;
use crate::units::value_by_unit;

use anyhow::{bail, Result};
use std::collections::HashMap;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct BlobRecord {
    pub file_count: u64,
    pub total_size_bytes: u64,
    pub garbage_size_bytes: u64,
    pub space_amp: f64,
}

pub struct BlobStats {
    entries: HashMap<Ustr, Vec<(Timestamp, BlobRecord)>>,
}

impl BlobStats {
    pub fn new() -> BlobStats {
        BlobStats {
            entries: HashMap::new(),
        }
    }

    pub fn is_start_line(line: &str) -> bool {
        patterns::BLOB_STATS_LINE.is_match(line)
    }

    /// Ingest one blob section; only `lines[0]` carries data.

    pub fn ingest(&mut self, time: Timestamp, cf: Ustr, lines: &[&str]) -> Result<()> {
        let caps = match lines.first().and_then(|l| patterns::BLOB_STATS_LINE.captures(l)) {
            Some(caps) => caps,
            None => bail!("blob stats section for {cf} does not open with a blob stats line"),
        };

        let record = BlobRecord {
            file_count: caps[1].parse::<u64>()?,
            total_size_bytes: value_by_unit(&caps[2], "GB")?,
            garbage_size_bytes: value_by_unit(&caps[3], "GB")?,
            space_amp: caps[4].parse::<f64>()?,
        };
        self.entries.entry(cf).or_default().push((time, record));
        Ok(())
    }

    /// The stored records for one column family, in ingestion order.

    pub fn cf_entries(&self, cf: Ustr) -> &[(Timestamp, BlobRecord)] {
        self.entries.get(&cf).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The column families seen so far, sorted by name.

    pub fn column_families(&self) -> Vec<Ustr> {
        let mut cfs = self.entries.keys().copied().collect::<Vec<Ustr>>();
        cfs.sort();
        cfs
    }
}

#[test]
fn test_blob_line() {
    let mut stats = BlobStats::new();
    let cf = Ustr::from("default");
    let time = crate::dates::parse_timestamp("2022/04/17-14:14:28.645150").unwrap();
    stats
        .ingest(
            time,
            cf,
            &["Blob file count: 12, total size: 2.5 GB, garbage size: 0.5 GB, space amp: 1.4"],
        )
        .unwrap();

    let entries = stats.cf_entries(cf);
    assert!(entries.len() == 1);
    let (t, record) = &entries[0];
    assert!(*t == time);
    assert!(record.file_count == 12);
    assert!(record.total_size_bytes == 2684354560);
    assert!(record.garbage_size_bytes == 536870912);
    assert!(record.space_amp == 1.4);

    assert!(stats.cf_entries(Ustr::from("nosuch")).is_empty());
    assert!(stats.column_families() == vec![cf]);
}

#[test]
fn test_blob_not_a_blob_line() {
    let mut stats = BlobStats::new();
    let time = crate::dates::parse_timestamp("2022/04/17-14:14:28.645150").unwrap();
    assert!(stats.ingest(time, Ustr::from("default"), &["some other line"]).is_err());
}
