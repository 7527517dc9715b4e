// Print block cache usage, one row per (cache, role, timestamp).

use crate::format;
use crate::stalls::format_time;
use crate::PlainCmdArgs;

use anyhow::Result;
use dblog::{size_for_display, RoleStats, StatsStore, Timestamp};
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

type Datum = (Ustr, u64, Ustr, Timestamp, RoleStats);

pub fn print(output: &mut dyn io::Write, store: &StatsStore, args: &PlainCmdArgs) -> Result<()> {
    let fmt = &args.fmt_args.fmt;
    if format::maybe_help(fmt, fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = my_formatters();
    let spec = fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let mut data = vec![];
    for id in store.block_cache.cache_ids() {
        if let Some(cache) = store.block_cache.cache(id) {
            for (role, samples) in cache.roles() {
                for (time, stats) in samples {
                    data.push((id, cache.capacity_bytes(), *role, *time, stats.clone()));
                }
            }
        }
    }
    format::format_data(output, &fields, &formatters, &opts, &data);
    Ok(())
}

pub fn fmt_help() -> format::Help {
    let (formatters, aliases) = my_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect(),
        aliases: aliases.into_iter().collect(),
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "cache,capacity,role,time,count,size,portion";

fn my_formatters() -> (
    HashMap<String, fn(&Datum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&Datum) -> String> = HashMap::new();
    formatters.insert("cache".to_string(), |d| d.0.to_string());
    formatters.insert("capacity".to_string(), |d| size_for_display(d.1));
    formatters.insert("capacitybytes".to_string(), |d| d.1.to_string());
    formatters.insert("role".to_string(), |d| d.2.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.3));
    formatters.insert("count".to_string(), |d| d.4.count.to_string());
    formatters.insert("size".to_string(), |d| size_for_display(d.4.size_bytes));
    formatters.insert("bytes".to_string(), |d| d.4.size_bytes.to_string());
    formatters.insert("portion".to_string(), |d| format!("{}%", d.4.portion_percent));

    let aliases = HashMap::new();
    (formatters, aliases)
}
