// Print per-family blob file summaries, one row per dump timestamp.

use crate::format;
use crate::stalls::format_time;
use crate::CfCmdArgs;

use anyhow::Result;
use dblog::{size_for_display, BlobRecord, StatsStore, Timestamp};
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

type Datum = (Ustr, Timestamp, BlobRecord);

pub fn print(output: &mut dyn io::Write, store: &StatsStore, args: &CfCmdArgs) -> Result<()> {
    let fmt = &args.fmt_args.fmt;
    if format::maybe_help(fmt, fmt_help) {
        return Ok(());
    }
    let (formatters, aliases) = my_formatters();
    let spec = fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);

    let mut data = vec![];
    for cf in crate::selected_cfs(&store.blob.column_families(), &args.cf) {
        for (time, record) in store.blob.cf_entries(cf) {
            data.push((cf, *time, record.clone()));
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

const FMT_DEFAULTS: &str = "cf,time,files,size,garbage,spaceamp";

fn my_formatters() -> (
    HashMap<String, fn(&Datum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&Datum) -> String> = HashMap::new();
    formatters.insert("cf".to_string(), |d| d.0.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.1));
    formatters.insert("files".to_string(), |d| d.2.file_count.to_string());
    formatters.insert("size".to_string(), |d| size_for_display(d.2.total_size_bytes));
    formatters.insert("bytes".to_string(), |d| d.2.total_size_bytes.to_string());
    formatters.insert("garbage".to_string(), |d| size_for_display(d.2.garbage_size_bytes));
    formatters.insert("garbagebytes".to_string(), |d| d.2.garbage_size_bytes.to_string());
    formatters.insert("spaceamp".to_string(), |d| d.2.space_amp.to_string());

    let aliases = HashMap::new();
    (formatters, aliases)
}
