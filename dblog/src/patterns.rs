/// The line-pattern grammar for engine LOG files.
///
/// These patterns are a fixed contract with the engine's logging code: the parsing modules
/// treat them as given and do not invent ad hoc patterns of their own.  Every pattern is
/// compiled once, on first use.
///
/// Group conventions: a pattern named `*_LINE` or `*_START` matches a whole line (or a line
/// prefix) and its capture groups are documented next to it; predicates with no groups are
/// used with `is_match` only.
use regex::Regex;
use std::sync::LazyLock;

// `YYYY/MM/DD-HH:MM:SS.ffffff`, anchored at the start of the haystack.  The microseconds are
// always printed with six digits; a shorter fraction is not an entry timestamp.

pub static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}/\d{2}/\d{2}-\d{2}:\d{2}:\d{2}\.\d{6}").unwrap());

const TIMESTAMP_PAT: &str = r"\d{4}/\d{2}/\d{2}-\d{2}:\d{2}:\d{2}\.\d{6}";
const CODE_POS_PAT: &str = r"(?:\[(/?.*?\.[\w:]+:\d+)\])?";

// Entry start line carrying a severity marker.  Groups: timestamp, context (thread id),
// optional original log time, severity, optional code position, rest-of-line message.

pub static ENTRY_START_WARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({TIMESTAMP_PAT}) (\w+)\s*(?:\(Original Log Time ({TIMESTAMP_PAT})\))?\s*\[(WARN|ERROR|FATAL)\]\s*{CODE_POS_PAT}(.*)$"
    ))
    .unwrap()
});

// Entry start line without a severity marker.  Groups as above, minus the severity.

pub static ENTRY_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^({TIMESTAMP_PAT}) (\w+)\s*(?:\(Original Log Time ({TIMESTAMP_PAT})\))?\s*{CODE_POS_PAT}(.*)$"
    ))
    .unwrap()
});

//
// Statistics dump patterns.
//

// The entry whose message starts with this marker opens a periodic stats dump.

pub const DUMP_STATS_MARKER: &str = "------- DUMPING STATS -------";

pub static DB_STATS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*\* DB Stats \*\*\s*$").unwrap());

// Group: column family name (may be empty).

pub static COMPACTION_STATS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*\* Compaction Stats\s*\[(.*)\]\s*\*\*\s*$").unwrap());

// Group: column family name (may be empty).

pub static FILE_READ_LATENCY_STATS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*\* File Read Latency Histogram By Level\s*\[(.*)\]\s*\*\*\s*$").unwrap()
});

pub static STATS_COUNTERS_AND_HISTOGRAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*STATISTICS:\s*$").unwrap());

// Groups: total seconds, interval seconds.  This line opens both the database-wide block and
// every per-family no-file block, hence the contextual suppression in the section scanner.

pub static UPTIME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Uptime\(secs\):\s*([0-9\.]+)\s*total,\s*([0-9\.]+)\s*interval\s*$").unwrap()
});

// Groups: H, M, S, ms, percent.

pub static DB_WIDE_INTERVAL_STALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Interval stall: (\d+):(\d+):(\d+)\.(\d+) H:M:S, ([\d]+\.[\d]+) percent").unwrap()
});

pub static DB_WIDE_CUMULATIVE_STALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Cumulative stall: (\d+):(\d+):(\d+)\.(\d+) H:M:S, ([\d]+\.[\d]+) percent")
        .unwrap()
});

// Groups: file count, total size (GB), garbage size (GB), space amp.

pub static BLOB_STATS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Blob file count: ([\d]+), total size: ([\d]+\.[\d]+) GB, garbage size: ([\d]+\.[\d]+) GB, space amp: ([\d]+\.[\d]+)",
    )
    .unwrap()
});

// Groups: cache id, capacity value, capacity unit.  The `secs_since: 0` tail restricts the
// match to the fresh dump of the owning cache, not a stale echo.

pub static BLOCK_CACHE_STATS_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Block cache (.*?) capacity: ([\d]+\.[\d]+) (KB|MB|GB|TB) collections: .* last_copies: .* last_secs: .* secs_since: 0",
    )
    .unwrap()
});

// Group: the whole roles blob after the fixed prefix.

pub static BLOCK_CACHE_ENTRY_STATS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Block cache entry stats\(count,size,portion\): (.*)").unwrap());

// Group: one role name, matched just before its opening parenthesis.

pub static BLOCK_CACHE_ROLE_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]+)\(").unwrap());

// Group: the parenthesized stats blob of one role.

pub static BLOCK_CACHE_ROLE_STATS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([0-9]+,[0-9\.]+ [A-Z]+,[0-9\.]+%)+").unwrap());

// Groups: count, size value, size unit, portion percent.

pub static BLOCK_CACHE_ROLE_COMPONENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+),([0-9\.]+) ([A-Z]+),([0-9\.]+)%").unwrap());

// The per-family stall counter line starts with this fixed prefix.

pub const CF_STALLS_LINE_START: &str = "Stalls(count):";

// Groups: count, stall reason.

pub static CF_STALLS_COUNT_AND_REASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+) (.*?),").unwrap());

// Group: the trailing interval total.

pub static CF_STALLS_INTERVAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*interval (\d+) total count$").unwrap());

// Compaction level table row keys: `L<n>` carries the level number.

pub static LEVEL_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^L(\d+)$").unwrap());

// Compaction level table second column: `<files>/<cf files>`.

pub static FILES_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)$").unwrap());

// Groups: counter name, value.

pub static STATS_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w\.]+) COUNT : (\d+)\s*$").unwrap());

// Groups: histogram name, P50, P95, P99, P100, count, sum.

pub static STATS_HISTOGRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([\w\.]+) P50 : ([\d]+\.[\d]+) P95 : ([\d]+\.[\d]+) P99 : ([\d]+\.[\d]+) P100 : ([\d]+\.[\d]+) COUNT : ([\d]+) SUM : ([\d]+)",
    )
    .unwrap()
});

#[test]
fn test_timestamp_pattern() {
    assert!(TIMESTAMP.is_match("2022/11/24-15:58:04.758352"));
    assert!(TIMESTAMP.is_match("2022/11/24-15:58:04.758352 trailing"));
    assert!(!TIMESTAMP.is_match("2022/11/24-15:58:04.758"));
    assert!(!TIMESTAMP.is_match("XXXX"));
}

#[test]
fn test_section_header_patterns() {
    assert!(DB_STATS.is_match("** DB Stats **"));
    assert!(DB_STATS.is_match("  ** DB Stats **  "));
    assert!(!DB_STATS.is_match("** DB Stats ** and more"));

    let c = COMPACTION_STATS.captures("** Compaction Stats [default] **").unwrap();
    assert!(&c[1] == "default");
    let c = COMPACTION_STATS.captures("** Compaction Stats [] **").unwrap();
    assert!(&c[1] == "");

    let c = FILE_READ_LATENCY_STATS
        .captures("** File Read Latency Histogram By Level [_sample/CF_1] **")
        .unwrap();
    assert!(&c[1] == "_sample/CF_1");

    assert!(UPTIME_LINE.is_match("Uptime(secs): 3.2 total, 1.6 interval"));
    assert!(!UPTIME_LINE.is_match("Uptime(secs): 3.2 total"));
}

#[test]
fn test_stall_patterns() {
    let c = DB_WIDE_INTERVAL_STALL
        .captures("Interval stall: 00:00:01.500 H:M:S, 2.50 percent")
        .unwrap();
    assert!(&c[1] == "00" && &c[2] == "00" && &c[3] == "01" && &c[4] == "500" && &c[5] == "2.50");

    let c = DB_WIDE_CUMULATIVE_STALL
        .captures("Cumulative stall: 01:00:00.000 H:M:S, 10.00 percent")
        .unwrap();
    assert!(&c[1] == "01" && &c[5] == "10.00");
}

#[test]
fn test_counter_and_histogram_patterns() {
    let c = STATS_COUNTER.captures("rocksdb.block.cache.miss COUNT : 61").unwrap();
    assert!(&c[1] == "rocksdb.block.cache.miss" && &c[2] == "61");
    assert!(!STATS_COUNTER.is_match("rocksdb.block.cache.miss COUNT : 61 SUM : 2"));

    let c = STATS_HISTOGRAM
        .captures(
            "rocksdb.db.get.micros P50 : 1.50 P95 : 2.50 P99 : 3.50 P100 : 4.50 COUNT : 10 SUM : 100",
        )
        .unwrap();
    assert!(&c[1] == "rocksdb.db.get.micros" && &c[6] == "10" && &c[7] == "100");
}
