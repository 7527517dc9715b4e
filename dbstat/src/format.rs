/// Generic formatting for report rows, presented as fixed-width columns, as csv (plain or
/// field-named), or as json, with or without a header.
///
/// Each report supplies a map from field name to a formatter function plus a set of aliases;
/// the user's `--fmt` spec selects fields by name (or alias) and may carry control words
/// (csv, csvnamed, json, header, noheader).
use anyhow::{bail, Result};
use csv;
use json;
use std::collections::{HashMap, HashSet};
use std::io;

pub struct Help {
    pub fields: Vec<String>,
    pub aliases: Vec<(String, Vec<String>)>,
    pub defaults: String,
}

/// If the spec asks for help, print it and return true; the caller then prints nothing else.

pub fn maybe_help<F>(fmt: &Option<String>, f: F) -> bool
where
    F: Fn() -> Help,
{
    if let Some(ref s) = fmt {
        if s == "help" || s.starts_with("help,") {
            let mut help = f();
            println!("Syntax:\n  --fmt=(field|alias|control),...");
            println!("\nFields:");
            help.fields.sort();
            for f in help.fields {
                println!("  {f}");
            }
            if !help.aliases.is_empty() {
                println!("\nAliases:");
                help.aliases.sort();
                for (name, mut fields) in help.aliases {
                    fields.sort();
                    println!("  {name} --> {}", fields.join(","));
                }
            }
            println!("\nDefaults:\n  {}", help.defaults);
            println!("\nControl:\n  csv\n  csvnamed\n  json\n  header\n  noheader");
            return true;
        }
    }
    false
}

/// Split `spec` into the known field names (aliases expanded) and the set of other words.
/// Zero selected fields is an error.

pub fn parse_fields<'a, DataT>(
    spec: &'a str,
    formatters: &HashMap<String, fn(&DataT) -> String>,
    aliases: &'a HashMap<String, Vec<String>>,
) -> Result<(Vec<&'a str>, HashSet<&'a str>)> {
    let mut fields = vec![];
    let mut others = HashSet::new();
    for x in spec.split(',') {
        if formatters.contains_key(x) {
            fields.push(x);
        } else if let Some(expansion) = aliases.get(x) {
            for alias in expansion {
                if formatters.contains_key(alias) {
                    fields.push(alias.as_ref());
                } else {
                    others.insert(alias.as_ref());
                }
            }
        } else {
            others.insert(x);
        }
    }
    if fields.is_empty() {
        bail!("No output fields were selected")
    }
    Ok((fields, others))
}

pub struct FormatOptions {
    pub csv: bool,    // csv or csvnamed requested
    pub json: bool,   // json requested
    pub named: bool,  // csvnamed requested
    pub header: bool, // fixed output has a header unless noheader; csv only on request
}

pub fn standard_options(others: &HashSet<&str>) -> FormatOptions {
    let named = others.contains("csvnamed");
    let csv = others.contains("csv") || named;
    let json = others.contains("json") && !csv;
    let header =
        (!csv && !json && !others.contains("noheader")) || (csv && others.contains("header"));
    FormatOptions { csv, json, named, header }
}

/// Format `data` one row at a time: each selected field name is looked up in `formatters`
/// and applied to the datum.

pub fn format_data<DataT>(
    output: &mut dyn io::Write,
    fields: &[&str],
    formatters: &HashMap<String, fn(&DataT) -> String>,
    opts: &FormatOptions,
    data: &[DataT],
) {
    let rows = data
        .iter()
        .map(|d| {
            fields
                .iter()
                .map(|kwd| formatters.get(*kwd).unwrap()(d))
                .collect::<Vec<String>>()
        })
        .collect::<Vec<Vec<String>>>();

    if opts.csv {
        format_csv(output, fields, opts, &rows);
    } else if opts.json {
        format_json(output, fields, &rows);
    } else {
        format_fixed_width(output, fields, opts, &rows);
    }
}

fn format_fixed_width(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    rows: &[Vec<String>],
) {
    let mut widths = fields
        .iter()
        .map(|kwd| if opts.header { kwd.len() } else { 0 })
        .collect::<Vec<usize>>();
    for row in rows {
        for (col, val) in row.iter().enumerate() {
            widths[col] = usize::max(widths[col], val.len());
        }
    }

    let mut emit = |cells: &dyn Fn(usize) -> String| {
        let mut s = String::new();
        for (col, &w) in widths.iter().enumerate() {
            s += format!("{:w$}  ", cells(col)).as_str();
        }
        // Write errors are common for broken pipelines, ignore them.
        let _ = output.write(s.trim_end().as_bytes());
        let _ = output.write(b"\n");
    };

    if opts.header {
        emit(&|col| fields[col].to_string());
    }
    for row in rows {
        emit(&|col| row[col].clone());
    }
}

fn format_csv(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    rows: &[Vec<String>],
) {
    let mut writer = csv::WriterBuilder::new().from_writer(output);
    if opts.header {
        let _ = writer.write_record(fields);
    }
    for row in rows {
        let record = if opts.named {
            row.iter()
                .enumerate()
                .map(|(col, val)| format!("{}={}", fields[col], val))
                .collect::<Vec<String>>()
        } else {
            row.clone()
        };
        let _ = writer.write_record(&record);
    }
    let _ = writer.flush();
}

fn format_json(output: &mut dyn io::Write, fields: &[&str], rows: &[Vec<String>]) {
    let mut objects = vec![];
    for row in rows {
        let mut obj = json::JsonValue::new_object();
        for (col, val) in row.iter().enumerate() {
            obj[fields[col]] = val.clone().into();
        }
        objects.push(obj);
    }
    let _ = output.write(json::stringify(objects).as_bytes());
    let _ = output.write(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    type Row = (String, u64);

    fn fmt_name(r: &Row) -> String {
        r.0.clone()
    }
    fn fmt_value(r: &Row) -> String {
        r.1.to_string()
    }

    fn formatters() -> HashMap<String, fn(&Row) -> String> {
        let mut m: HashMap<String, fn(&Row) -> String> = HashMap::new();
        m.insert("name".to_string(), fmt_name);
        m.insert("value".to_string(), fmt_value);
        m
    }

    #[test]
    fn test_parse_fields() {
        let formatters = formatters();
        let mut aliases = HashMap::new();
        aliases.insert(
            "all".to_string(),
            vec!["name".to_string(), "value".to_string()],
        );

        let (fields, others) = parse_fields("name,csv", &formatters, &aliases).unwrap();
        assert!(fields == vec!["name"]);
        assert!(others.contains("csv"));

        let (fields, _) = parse_fields("all", &formatters, &aliases).unwrap();
        assert!(fields == vec!["name", "value"]);

        assert!(parse_fields("csv", &formatters, &aliases).is_err());
    }

    #[test]
    fn test_fixed_and_csv_output() {
        let formatters = formatters();
        let data = vec![("a".to_string(), 1), ("longer".to_string(), 22)];

        let mut out = Vec::new();
        let opts = FormatOptions { csv: false, json: false, named: false, header: true };
        format_data(&mut out, &["name", "value"], &formatters, &opts, &data);
        let text = String::from_utf8(out).unwrap();
        assert!(text == "name    value\na       1\nlonger  22\n");

        let mut out = Vec::new();
        let opts = FormatOptions { csv: true, json: false, named: true, header: false };
        format_data(&mut out, &["name", "value"], &formatters, &opts, &data);
        let text = String::from_utf8(out).unwrap();
        assert!(text == "name=a,value=1\nname=longer,value=22\n");
    }

    #[test]
    fn test_json_output() {
        let formatters = formatters();
        let data = vec![("a".to_string(), 1)];
        let mut out = Vec::new();
        let opts = FormatOptions { csv: false, json: true, named: false, header: false };
        format_data(&mut out, &["name", "value"], &formatters, &opts, &data);
        let text = String::from_utf8(out).unwrap();
        assert!(text == "[{\"name\":\"a\",\"value\":\"1\"}]\n");
    }
}
