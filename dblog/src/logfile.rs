/// Split an engine LOG file into `LogEntry` records.
///
/// The splitter is deliberately forgiving: a line that cannot open an entry and has no entry
/// to continue is dropped silently and counted, not reported.  Engine logs get truncated,
/// rotated and appended to while being read, and a partly-written record at a boundary is
/// expected, not exceptional.  Callers that care can inspect the discarded count.
use crate::entry::LogEntry;

use anyhow::Result;

/// Parse LOG text into entries, in order of appearance.  Returns the entries and the number
/// of discarded lines.

pub fn parse_log(text: &str) -> (Vec<LogEntry>, usize) {
    let mut entries = vec![];
    let mut discarded = 0;
    let mut current: Option<LogEntry> = None;

    for (idx, line) in text.lines().enumerate() {
        if LogEntry::is_entry_start(line) {
            match LogEntry::new(idx, line) {
                Ok(e) => {
                    if let Some(mut prev) = current.replace(e) {
                        // Can't fail: the entry was assembled here and never finalized.
                        let _ = prev.finalize();
                        entries.push(prev);
                    }
                }
                Err(_) => {
                    // Looked like a start line but didn't parse as one.
                    discarded += 1;
                }
            }
        } else if let Some(ref mut e) = current {
            // Can't fail: `line` is not a start line and `e` is not finalized.
            let _ = e.add_line(line);
        } else {
            // Continuation junk before the first entry.
            discarded += 1;
        }
    }
    if let Some(mut e) = current {
        let _ = e.finalize();
        entries.push(e);
    }

    (entries, discarded)
}

/// Read and parse one LOG file.  I/O problems are errors; unparseable lines are not (see
/// `parse_log`).

pub fn parse_logfile(file_name: &str) -> Result<(Vec<LogEntry>, usize)> {
    let text = std::fs::read_to_string(file_name)?;
    Ok(parse_log(&text))
}

#[test]
fn test_parse_log() {
    let text = "\
2022/11/24-15:58:04.758402 32819 DB SUMMARY
Continuation Line 1
Continuation Line 2
2022/11/24-15:58:05.068464 32819 [/version_set.cc:4965] Recovered from manifest
2022/11/24-15:58:06.000000 32819 shutdown
";
    let (entries, discarded) = parse_log(text);
    assert!(entries.len() == 3);
    assert!(discarded == 0);
    assert!(entries[0].msg() == "DB SUMMARY\nContinuation Line 1\nContinuation Line 2");
    assert!(entries[0].lines_idx_range() == (0, 3));
    assert!(entries[1].code_pos.as_deref() == Some("/version_set.cc:4965"));
    assert!(entries.iter().all(|e| e.is_finalized()));
}

#[test]
fn test_parse_log_discards_junk() {
    let text = "\
garbage before any entry
2022/11/24-15:58:04.758
2022/11/24-15:58:04.758402 32819 DB SUMMARY
indented continuation is kept
";
    let (entries, discarded) = parse_log(text);
    assert!(entries.len() == 1);
    // The leading junk line and the cropped-timestamp line.
    assert!(discarded == 2);
    assert!(entries[0].msg_lines.len() == 2);
}

#[test]
fn test_parse_log_empty() {
    let (entries, discarded) = parse_log("");
    assert!(entries.is_empty() && discarded == 0);
}
