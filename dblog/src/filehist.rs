/// Per-column-family file read latency histograms.
///
/// The section header is recognized so that the section scanner can delimit the section and
/// attribute the following sections to the right column family, but the body (one histogram
/// line per level) is not decomposed: ingestion consumes the lines and stores nothing.
use crate::dates::Timestamp;
use crate::patterns;

use anyhow::Result;
use ustr::Ustr;

pub struct FileHistogramStats {}

impl FileHistogramStats {
    pub fn new() -> FileHistogramStats {
        FileHistogramStats {}
    }

    /// Extract the column family name from a section header line, if it is one.

    pub fn parse_start_line(line: &str) -> Option<Ustr> {
        let caps = patterns::FILE_READ_LATENCY_STATS.captures(line)?;
        Some(Ustr::from(&caps[1]))
    }

    pub fn is_start_line(line: &str) -> bool {
        FileHistogramStats::parse_start_line(line).is_some()
    }

    pub fn ingest(&mut self, _time: Timestamp, _cf: Ustr, _lines: &[&str]) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_start_line() {
    assert!(
        FileHistogramStats::parse_start_line(
            "** File Read Latency Histogram By Level [default] **"
        ) == Some(Ustr::from("default"))
    );
    assert!(!FileHistogramStats::is_start_line("** Compaction Stats [default] **"));
}
