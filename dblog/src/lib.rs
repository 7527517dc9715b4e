/// An engine LOG is a semi-structured log: individual *log entries* start with a timestamped
/// header line and may span continuation lines.  Periodically the engine emits a *stats
/// dump*: a marker entry, one large entry holding a multi-section statistics body, and
/// optionally a trailing entry with aggregate counters and histograms.
///
/// The sections inside a dump body have no terminators.  Each one is recognized by the shape
/// of its first line (a header naming a column family, a blob summary line, a block-cache
/// line, an uptime line), and a section simply runs until the next recognizable section
/// start.  This library has as its fundamental task to re-derive those boundaries, parse
/// each section, and accumulate the results as time series keyed by timestamp and - where it
/// applies - by column family or cache id:
///
/// - Split LOG text into entries, tolerating the truncated and partly-written records that
///   live logs contain.
///
/// - Detect dump events in the entry stream and parse each one: database-wide stalls,
///   per-family compaction level tables, blob file summaries, block-cache role breakdowns,
///   per-family stall counters, and the aggregate counters/histograms entry.
///
/// - Keep every series append-only.  Records are never rewritten once stored, so read-only
///   snapshots can be handed to a reporting layer while parsing continues, provided the
///   single parsing thread remains the only writer.
///
/// Degenerate records (all-zero stall records, truncated stall-counter lines, zero-count
/// histogram observations) are dropped rather than stored; structurally broken dumps abort
/// with a diagnostic that names the offending entry, and parsing resumes at the next dump.
mod blob;
mod blockcache;
mod cfstalls;
mod compaction;
mod counters;
mod dates;
mod dbwide;
mod entry;
mod filehist;
mod logfile;
mod patterns;
mod stats;
mod units;

// Types and utilities for manipulating timestamps.

pub use dates::Timestamp;

// Parse a &str in the engine's timestamp layout into a Timestamp.

pub use dates::parse_timestamp;

// Assemble a chrono Duration from H:M:S.ms components.

pub use dates::duration_from_hms;

// Convert a (value string, unit suffix) pair into a byte count.

pub use units::value_by_unit;

// Render a byte count with a human-readable unit.

pub use units::size_for_display;

// One timestamped log record, and the severity marker it may carry.

pub use entry::LogEntry;
pub use entry::Severity;

// Split LOG text (or a LOG file) into entries, counting discarded lines.

pub use logfile::parse_log;
pub use logfile::parse_logfile;

// The per-section series stores and their record types.

pub use blob::{BlobRecord, BlobStats};
pub use blockcache::{BlockCacheStats, Cache, RoleStats};
pub use cfstalls::{CfStallStats, StallCounts};
pub use compaction::{CompactionStats, LevelRow, LevelTable, RowKey};
pub use counters::{CounterSample, CounterStats, HistogramSample};
pub use dbwide::{DbWideStats, StallRecord};
pub use filehist::FileHistogramStats;

// The dump orchestrator: all series harvested from a log, the per-dump failure record, and
// the entry points for scanning an entry stream.

pub use stats::collect_stats;
pub use stats::is_dump_start;
pub use stats::DumpFailure;
pub use stats::StatsStore;

// The pseudo column family name under which database-wide data is filed.

pub use stats::NO_COL_FAMILY;
