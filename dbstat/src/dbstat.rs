/// `dbstat` -- Analyze storage engine LOG statistics dumps.
///
/// The engine periodically dumps a multi-section statistics snapshot into its LOG; `dbstat`
/// parses those dumps into time series and prints one report per subcommand.  Run with
/// `--fmt=help` under any subcommand for its fields and output controls.
///
/// Quirks
///
/// Parse problems are not fatal: a structurally broken dump is reported on stderr and the
/// series from every intact dump are printed anyway.  Only I/O problems (unreadable log
/// file) terminate the program.
///
/// Several files can be given; their series are merged into one report in file order.  That
/// is the right thing for a rotated LOG/LOG.old.1/... sequence, and confusing for unrelated
/// logs, which share nothing but the pseudo column family name.
mod blobs;
mod cache;
mod compaction;
mod counters;
mod format;
mod stalls;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dblog::{parse_logfile, StatsStore};
use std::io;
use std::process;
use ustr::Ustr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print information about the program
    Version,

    /// Print database-wide stall records
    Stalls(PlainCmdArgs),

    /// Print per-family stall-reason counters
    Stallcounts(CfCmdArgs),

    /// Print per-family compaction level tables
    Compaction(CfCmdArgs),

    /// Print per-family blob file summaries
    Blobs(CfCmdArgs),

    /// Print block cache usage by entry role
    Cache(PlainCmdArgs),

    /// Print counter histories
    Counters(CounterCmdArgs),

    /// Print histogram samples
    Histograms(PlainCmdArgs),
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// LOG file(s) to analyze
    #[arg(required = true)]
    logfiles: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Select fields and output format; "help" prints the choices
    #[arg(long)]
    fmt: Option<String>,
}

#[derive(Args, Debug)]
pub struct PlainCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    fmt_args: FmtArgs,
}

#[derive(Args, Debug)]
pub struct CfCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    fmt_args: FmtArgs,

    /// Select a single column family
    #[arg(long)]
    cf: Option<String>,
}

#[derive(Args, Debug)]
pub struct CounterCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    fmt_args: FmtArgs,

    /// Print only the most recent value of each counter
    #[arg(long)]
    last: bool,
}

fn main() {
    match dbstat() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            process::exit(1);
        }
    }
}

fn dbstat() -> Result<()> {
    let cli = Cli::parse();
    let output = &mut io::stdout();
    match cli.command {
        Commands::Version => {
            println!("dbstat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Stalls(args) => {
            let store = load(&args.source_args)?;
            stalls::print_stalls(output, &store, &args.fmt_args.fmt)
        }
        Commands::Stallcounts(args) => {
            let store = load(&args.source_args)?;
            stalls::print_stall_counts(output, &store, &args)
        }
        Commands::Compaction(args) => {
            let store = load(&args.source_args)?;
            compaction::print(output, &store, &args)
        }
        Commands::Blobs(args) => {
            let store = load(&args.source_args)?;
            blobs::print(output, &store, &args)
        }
        Commands::Cache(args) => {
            let store = load(&args.source_args)?;
            cache::print(output, &store, &args)
        }
        Commands::Counters(args) => {
            let store = load(&args.source_args)?;
            counters::print_counters(output, &store, &args)
        }
        Commands::Histograms(args) => {
            let store = load(&args.source_args)?;
            counters::print_histograms(output, &store, &args)
        }
    }
}

// Parse every log file into one store.  Discarded lines and broken dumps go to stderr; the
// intact series are what the reports run on.

fn load(source_args: &SourceArgs) -> Result<StatsStore> {
    let mut store = StatsStore::new();
    for file_name in &source_args.logfiles {
        let (entries, discarded) = parse_logfile(file_name)?;
        if discarded > 0 {
            eprintln!("{file_name}: discarded {discarded} unparseable lines");
        }
        for failure in store.collect(&entries) {
            eprintln!(
                "{file_name}: dump at entry {} ({}): {}",
                failure.entry_idx,
                failure.timestamp.format("%Y-%m-%d %H:%M:%S"),
                failure.error
            );
        }
    }
    Ok(store)
}

// Expand the --cf selection: one name when given, else every known family.

fn selected_cfs(all: &[Ustr], selected: &Option<String>) -> Vec<Ustr> {
    match selected {
        Some(name) => vec![Ustr::from(name)],
        None => all.to_vec(),
    }
}
