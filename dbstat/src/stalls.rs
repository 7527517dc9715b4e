// Print write-stall information: the database-wide stall records, and the per-family
// stall-reason counters.
//
// Durations are printed H:MM:SS.mmm; percentages as printed in the log.  Per-family reason
// counts are folded into one `reason=count;...` field so that a row stays one line in every
// output mode.

use crate::format;
use crate::CfCmdArgs;

use anyhow::Result;
use chrono::Duration;
use dblog::{StallCounts, StallRecord, StatsStore, Timestamp};
use itertools::Itertools;
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

pub fn format_duration(d: &Duration) -> String {
    let ms = d.num_milliseconds();
    format!("{}:{:02}:{:02}.{:03}", ms / 3_600_000, (ms / 60_000) % 60, (ms / 1000) % 60, ms % 1000)
}

pub fn format_time(t: &Timestamp) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

//
// Database-wide stall records.
//

type StallDatum = (Timestamp, StallRecord);

pub fn print_stalls(
    output: &mut dyn io::Write,
    store: &StatsStore,
    fmt: &Option<String>,
) -> Result<()> {
    if format::maybe_help(fmt, stalls_fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = stall_formatters();
    let spec = fmt.as_deref().unwrap_or(STALLS_FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let data = store.db_wide.stalls().to_vec();
    format::format_data(output, &fields, &formatters, &opts, &data);
    Ok(())
}

pub fn stalls_fmt_help() -> format::Help {
    let (formatters, aliases) = stall_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect(),
        aliases: aliases.into_iter().collect(),
        defaults: STALLS_FMT_DEFAULTS.to_string(),
    }
}

const STALLS_FMT_DEFAULTS: &str = "time,interval,interval%,cumulative,cumulative%";

fn stall_formatters() -> (
    HashMap<String, fn(&StallDatum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&StallDatum) -> String> = HashMap::new();
    formatters.insert("time".to_string(), |d| format_time(&d.0));
    formatters.insert("interval".to_string(), |d| format_duration(&d.1.interval_duration));
    formatters.insert("interval%".to_string(), |d| d.1.interval_percent.to_string());
    formatters.insert("cumulative".to_string(), |d| format_duration(&d.1.cumulative_duration));
    formatters.insert("cumulative%".to_string(), |d| d.1.cumulative_percent.to_string());

    let aliases = HashMap::new();
    (formatters, aliases)
}

//
// Per-family stall-reason counters.
//

type CountsDatum = (Ustr, Timestamp, StallCounts);

pub fn print_stall_counts(
    output: &mut dyn io::Write,
    store: &StatsStore,
    args: &CfCmdArgs,
) -> Result<()> {
    let fmt = &args.fmt_args.fmt;
    if format::maybe_help(fmt, counts_fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = counts_formatters();
    let spec = fmt.as_deref().unwrap_or(COUNTS_FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let mut data = vec![];
    for cf in crate::selected_cfs(&store.cf_stalls.column_families(), &args.cf) {
        for (time, counts) in store.cf_stalls.cf_entries(cf) {
            data.push((cf, *time, counts.clone()));
        }
    }
    format::format_data(output, &fields, &formatters, &opts, &data);
    Ok(())
}

pub fn counts_fmt_help() -> format::Help {
    let (formatters, aliases) = counts_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect(),
        aliases: aliases.into_iter().collect(),
        defaults: COUNTS_FMT_DEFAULTS.to_string(),
    }
}

const COUNTS_FMT_DEFAULTS: &str = "cf,time,total,counts";

fn counts_formatters() -> (
    HashMap<String, fn(&CountsDatum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&CountsDatum) -> String> = HashMap::new();
    formatters.insert("cf".to_string(), |d| d.0.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.1));
    formatters.insert("total".to_string(), |d| d.2.interval_total.to_string());
    formatters.insert("counts".to_string(), |d| {
        d.2.counts.iter().map(|(reason, count)| format!("{reason}={count}")).join(";")
    });

    let aliases = HashMap::new();
    (formatters, aliases)
}

#[test]
fn test_format_duration() {
    assert!(format_duration(&dblog::duration_from_hms(0, 0, 1, 500)) == "0:00:01.500");
    assert!(format_duration(&dblog::duration_from_hms(12, 10, 56, 123)) == "12:10:56.123");
}
