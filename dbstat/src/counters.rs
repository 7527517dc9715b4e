// Print the aggregate counters and histograms.
//
// Counters print in first-appearance order, the order the engine itself uses; `--last`
// restricts each counter to its most recent observation, which is what a quick health check
// wants.  Histograms print one row per (name, timestamp) sample.

use crate::format;
use crate::stalls::format_time;
use crate::{CounterCmdArgs, PlainCmdArgs};

use anyhow::Result;
use dblog::{CounterSample, HistogramSample, StatsStore};
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

type CounterDatum = (Ustr, CounterSample);

pub fn print_counters(
    output: &mut dyn io::Write,
    store: &StatsStore,
    args: &CounterCmdArgs,
) -> Result<()> {
    let fmt = &args.fmt_args.fmt;
    if format::maybe_help(fmt, counters_fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = counter_formatters();
    let spec = fmt.as_deref().unwrap_or(COUNTERS_FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let mut data = vec![];
    for &name in store.counters.counter_names() {
        let entries = store.counters.counter_entries(name);
        if args.last {
            if let Some(sample) = entries.last() {
                data.push((name, sample.clone()));
            }
        } else {
            for sample in entries {
                data.push((name, sample.clone()));
            }
        }
    }
    format::format_data(output, &fields, &formatters, &opts, &data);
    Ok(())
}

pub fn counters_fmt_help() -> format::Help {
    let (formatters, aliases) = counter_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect(),
        aliases: aliases.into_iter().collect(),
        defaults: COUNTERS_FMT_DEFAULTS.to_string(),
    }
}

const COUNTERS_FMT_DEFAULTS: &str = "name,time,value";

fn counter_formatters() -> (
    HashMap<String, fn(&CounterDatum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&CounterDatum) -> String> = HashMap::new();
    formatters.insert("name".to_string(), |d| d.0.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.1.time));
    formatters.insert("value".to_string(), |d| d.1.value.to_string());

    let aliases = HashMap::new();
    (formatters, aliases)
}

type HistogramDatum = (Ustr, HistogramSample);

pub fn print_histograms(
    output: &mut dyn io::Write,
    store: &StatsStore,
    args: &PlainCmdArgs,
) -> Result<()> {
    let fmt = &args.fmt_args.fmt;
    if format::maybe_help(fmt, histograms_fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = histogram_formatters();
    let spec = fmt.as_deref().unwrap_or(HISTOGRAMS_FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let mut data = vec![];
    for &name in store.counters.histogram_names() {
        for sample in store.counters.histogram_entries(name) {
            data.push((name, sample.clone()));
        }
    }
    format::format_data(output, &fields, &formatters, &opts, &data);
    Ok(())
}

pub fn histograms_fmt_help() -> format::Help {
    let (formatters, aliases) = histogram_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect(),
        aliases: aliases.into_iter().collect(),
        defaults: HISTOGRAMS_FMT_DEFAULTS.to_string(),
    }
}

const HISTOGRAMS_FMT_DEFAULTS: &str = "name,time,p50,p99,count,sum,average";

fn histogram_formatters() -> (
    HashMap<String, fn(&HistogramDatum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&HistogramDatum) -> String> = HashMap::new();
    formatters.insert("name".to_string(), |d| d.0.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.1.time));
    formatters.insert("p50".to_string(), |d| d.1.p50.to_string());
    formatters.insert("p95".to_string(), |d| d.1.p95.to_string());
    formatters.insert("p99".to_string(), |d| d.1.p99.to_string());
    formatters.insert("p100".to_string(), |d| d.1.p100.to_string());
    formatters.insert("count".to_string(), |d| d.1.count.to_string());
    formatters.insert("sum".to_string(), |d| d.1.sum.to_string());
    formatters.insert("average".to_string(), |d| d.1.average.to_string());

    let mut aliases = HashMap::new();
    aliases.insert(
        "percentiles".to_string(),
        vec![
            "name".to_string(),
            "time".to_string(),
            "p50".to_string(),
            "p95".to_string(),
            "p99".to_string(),
            "p100".to_string(),
        ],
    );
    (formatters, aliases)
}
