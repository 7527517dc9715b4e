// Print per-family compaction level tables, flattened to one row per (timestamp, table row).
//
// The `size` field is the resolved byte size printed back with a human unit; `bytes` is the
// raw count for consumers that compute.  The header-named columns after Size vary with the
// engine version, so they are folded into one `name=value;...` field rather than promoted to
// first-class fields.

use crate::format;
use crate::stalls::format_time;
use crate::CfCmdArgs;

use anyhow::Result;
use dblog::{size_for_display, LevelRow, RowKey, StatsStore, Timestamp};
use itertools::Itertools;
use std::collections::HashMap;
use std::io;
use ustr::Ustr;

type Datum = (Ustr, Timestamp, RowKey, LevelRow);

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
    for cf in crate::selected_cfs(&store.compaction.column_families(), &args.cf) {
        for (time, table) in store.compaction.level_entries(cf) {
            for (key, row) in table {
                data.push((cf, *time, *key, row.clone()));
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

const FMT_DEFAULTS: &str = "cf,time,row,files,size";

fn my_formatters() -> (
    HashMap<String, fn(&Datum) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, fn(&Datum) -> String> = HashMap::new();
    formatters.insert("cf".to_string(), |d| d.0.to_string());
    formatters.insert("time".to_string(), |d| format_time(&d.1));
    formatters.insert("row".to_string(), |d| d.2.to_string());
    formatters.insert("files".to_string(), |d| d.3.num_files.to_string());
    formatters.insert("cffiles".to_string(), |d| d.3.cf_num_files.to_string());
    formatters.insert("size".to_string(), |d| size_for_display(d.3.size_bytes));
    formatters.insert("bytes".to_string(), |d| d.3.size_bytes.to_string());
    formatters.insert("cols".to_string(), |d| {
        d.3.cols.iter().map(|(name, value)| format!("{name}={value}")).join(";")
    });

    let mut aliases = HashMap::new();
    aliases.insert(
        "all".to_string(),
        vec![
            "cf".to_string(),
            "time".to_string(),
            "row".to_string(),
            "files".to_string(),
            "cffiles".to_string(),
            "size".to_string(),
            "bytes".to_string(),
            "cols".to_string(),
        ],
    );
    (formatters, aliases)
}
