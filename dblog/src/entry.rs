/// A `LogEntry` is one timestamped record from an engine LOG file: a start line carrying the
/// timestamp, context (thread id), optional severity and code position, plus any number of
/// continuation lines that belong to the same record.
///
/// Entries are built incrementally: construct from the start line, `add_line` each
/// continuation line, then `finalize`.  Misuse (adding to a finalized entry, adding a start
/// line as a continuation) is an error rather than silent corruption, because the upstream
/// splitter relies on these invariants to delimit records correctly.
use crate::dates::{parse_timestamp, Timestamp};
use crate::patterns;

use anyhow::{bail, Result};
use ustr::Ustr;

/// Severity marker on a start line.  Entries without a marker are informational.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
    Fatal,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    /// The entry's own timestamp.
    pub timestamp: Timestamp,

    /// Thread id (or similar context token) from the start line.
    pub context: Ustr,

    /// For entries echoed out of order, the time the message was originally logged.
    pub orig_time: Option<Timestamp>,

    /// Severity, when the start line carries a `[WARN]`/`[ERROR]`/`[FATAL]` marker.
    pub severity: Option<Severity>,

    /// `file:line` position in the engine source, when present.
    pub code_pos: Option<String>,

    /// The message: the tail of the start line (if nonempty) plus the continuation lines,
    /// each stripped of surrounding whitespace.
    pub msg_lines: Vec<String>,

    /// Index of the start line in the containing file.
    pub start_line_idx: usize,

    finalized: bool,
}

impl LogEntry {
    /// True iff `line` can open a new entry: its first token is an entry timestamp.

    pub fn is_entry_start(line: &str) -> bool {
        match line.split_whitespace().next() {
            Some(tok) => patterns::TIMESTAMP.is_match(tok),
            None => false,
        }
    }

    /// Parse a start line into a fresh, unfinalized entry.

    pub fn new(line_idx: usize, line: &str) -> Result<LogEntry> {
        if !LogEntry::is_entry_start(line) {
            bail!("line {}: not an entry start line: {line}", line_idx + 1);
        }

        // The severity layout is tried first; the plain layout would otherwise swallow the
        // severity marker into the message.
        let (caps, severity) = if let Some(caps) = patterns::ENTRY_START_WARN.captures(line) {
            let severity = match caps.get(4).map(|m| m.as_str()) {
                Some("WARN") => Severity::Warn,
                Some("ERROR") => Severity::Error,
                _ => Severity::Fatal,
            };
            (caps, Some(severity))
        } else if let Some(caps) = patterns::ENTRY_START.captures(line) {
            (caps, None)
        } else {
            bail!("line {}: failed parsing entry start line: {line}", line_idx + 1);
        };

        // Group offsets: with a severity marker the code position and message shift by one.
        let shift = if severity.is_some() { 1 } else { 0 };

        let timestamp = parse_timestamp(&caps[1])?;
        let context = Ustr::from(&caps[2]);
        let orig_time = match caps.get(3) {
            Some(m) => Some(parse_timestamp(m.as_str())?),
            None => None,
        };
        let code_pos = caps.get(4 + shift).map(|m| m.as_str().to_string());

        let mut msg_lines = vec![];
        let first_msg = caps[5 + shift].trim();
        if !first_msg.is_empty() {
            msg_lines.push(first_msg.to_string());
        }

        Ok(LogEntry {
            timestamp,
            context,
            orig_time,
            severity,
            code_pos,
            msg_lines,
            start_line_idx: line_idx,
            finalized: false,
        })
    }

    /// Append a continuation line.  It is an error to add to a finalized entry or to add a
    /// line that opens a new entry.

    pub fn add_line(&mut self, line: &str) -> Result<()> {
        if self.finalized {
            bail!(
                "line {}: entry already finalized, can't add: {line}",
                self.start_line_idx + 1
            );
        }
        if LogEntry::is_entry_start(line) {
            bail!(
                "line {}: attempt to add an entry start line as a continuation: {line}",
                self.start_line_idx + 1
            );
        }
        self.msg_lines.push(line.trim().to_string());
        Ok(())
    }

    /// Mark the entry complete.  Finalizing twice is an error.

    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            bail!(
                "line {}: entry already finalized",
                self.start_line_idx + 1
            );
        }
        self.finalized = true;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The half-open line index range the entry occupies in its file.

    pub fn lines_idx_range(&self) -> (usize, usize) {
        // An entry with an empty start-line message still occupies its start line.
        (
            self.start_line_idx,
            self.start_line_idx + usize::max(self.msg_lines.len(), 1),
        )
    }

    /// The whole message as one newline-joined string.

    pub fn msg(&self) -> String {
        self.msg_lines.join("\n").trim().to_string()
    }
}

#[test]
fn test_is_entry_start() {
    // Dummy text
    assert!(!LogEntry::is_entry_start("XXXX"));

    // Timestamp missing its microseconds
    assert!(!LogEntry::is_entry_start("2022/11/24-15:58:04"));

    // Microseconds cropped
    assert!(!LogEntry::is_entry_start("2022/11/24-15:58:04.758"));

    assert!(LogEntry::is_entry_start("2022/11/24-15:58:04.758352 32819 "));
    assert!(!LogEntry::is_entry_start(""));
}

#[test]
fn test_basic_single_line() {
    let mut entry = LogEntry::new(100, "2022/11/24-15:58:04.758402 32819 DB SUMMARY").unwrap();
    entry.finalize().unwrap();

    assert!(entry.timestamp == parse_timestamp("2022/11/24-15:58:04.758402").unwrap());
    assert!(entry.context == Ustr::from("32819"));
    assert!(entry.start_line_idx == 100);
    assert!(entry.lines_idx_range() == (100, 101));
    assert!(entry.code_pos.is_none());
    assert!(entry.severity.is_none());
    assert!(entry.msg() == "DB SUMMARY");
    assert!(entry.is_finalized());

    assert!(entry.add_line("more text").is_err());
    assert!(entry.finalize().is_err());
}

#[test]
fn test_code_pos() {
    let mut entry = LogEntry::new(
        0,
        "2022/11/24-15:58:05.068464 32819 [/version_set.cc:4965] Recovered from manifest",
    )
    .unwrap();
    entry.finalize().unwrap();
    assert!(entry.code_pos.as_deref() == Some("/version_set.cc:4965"));
    assert!(entry.msg() == "Recovered from manifest");
}

#[test]
fn test_warn_single_line() {
    let entry = LogEntry::new(
        100,
        "2022/04/17-15:24:51.089890 7f4a9fdff700 [WARN] [/column_family.cc:932] \
         Stalling writes, L0 files 2, memtables 2",
    )
    .unwrap();
    assert!(entry.severity == Some(Severity::Warn));
    assert!(entry.code_pos.as_deref() == Some("/column_family.cc:932"));
    assert!(entry.msg() == "Stalling writes, L0 files 2, memtables 2");
}

#[test]
fn test_multi_line_entry() {
    let mut entry = LogEntry::new(100, "2022/11/24-15:58:04.758402 32819 DB SUMMARY").unwrap();
    assert!(!entry.is_finalized());

    entry.add_line("Continuation Line 1").unwrap();
    assert!(entry.lines_idx_range() == (100, 102));

    // A start line can not be added as a continuation.
    assert!(entry
        .add_line("2022/11/24-15:58:05.068464 32819 [/version_set.cc:4965] Recovered")
        .is_err());
    assert!(entry.lines_idx_range() == (100, 102));

    entry.add_line("Continuation Line 2").unwrap();
    entry.finalize().unwrap();
    assert!(entry.msg() == "DB SUMMARY\nContinuation Line 1\nContinuation Line 2");

    assert!(entry.finalize().is_err());
    assert!(entry.add_line("Continuation Line 3").is_err());
}

#[test]
fn test_invalid_entry_start() {
    assert!(LogEntry::new(10, "Not an entry start line").is_err());

    // A bare timestamp is recognized as a start but has no context token.
    assert!(LogEntry::new(10, "2022/11/24-15:58:04.758402").is_err());
}
