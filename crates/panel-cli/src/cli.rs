//! CLI argument definitions for the panel pipeline.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "panel-integrate",
    version,
    about = "Reconcile per-company, per-variable and per-year panel workbooks",
    long_about = "Reconcile spreadsheet panel data into one table per entity.\n\n\
                  Stages run in order: entities, audit, variables, years, combine.\n\
                  Every stage reads the previous stage's folder under --root."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Also write logs to a file. `auto` picks a timestamped name.
    #[arg(long = "log-file", value_name = "PATH|auto", global = true)]
    pub log_file: Option<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Clone)]
pub struct PipelineArgs {
    /// Working folder holding the stage folders and the reference table.
    #[arg(long = "root", value_name = "DIR", default_value = ".", global = true)]
    pub root: PathBuf,

    /// JSON file with pipeline options; flags override its values.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Delete outputs of a previous run and rebuild them (asks first).
    #[arg(long = "replace-existing", global = true)]
    pub replace_existing: bool,

    /// Answer yes to every confirmation.
    #[arg(long = "yes", short = 'y', global = true, conflicts_with = "assume_no")]
    pub assume_yes: bool,

    /// Answer no to every confirmation.
    #[arg(long = "no", global = true)]
    pub assume_no: bool,

    /// Print stage reports as JSON instead of tables.
    #[arg(long = "json", global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Append company workbooks onto company 1 (data-split-by-entity).
    Entities(EntitiesArgs),

    /// Report row keys missing from a variable group (data-split-by-variable).
    Audit,

    /// Outer-join variable groups onto group A (data-split-by-variable).
    Variables,

    /// Stack every year of an entity into a master table (data).
    Years(YearsArgs),

    /// Fold master tables into the combined CSV (data-2015-2024).
    Combine(CombineArgs),

    /// Run every stage in order.
    Run(RunArgs),
}

#[derive(Args, Clone, Default)]
pub struct EntitiesArgs {
    /// Number of companies expected per key.
    #[arg(long = "companies", value_name = "N")]
    pub companies: Option<u32>,
}

#[derive(Args, Clone, Default)]
pub struct YearsArgs {
    /// First year every entity must cover.
    #[arg(long = "start-year", value_name = "YEAR")]
    pub start_year: Option<i32>,

    /// Last year every entity must cover.
    #[arg(long = "end-year", value_name = "YEAR")]
    pub end_year: Option<i32>,
}

#[derive(Args, Clone, Default)]
pub struct CombineArgs {
    /// Also export the combined CSV as a workbook.
    #[arg(long = "export-xlsx")]
    pub export_xlsx: bool,
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub entities: EntitiesArgs,

    #[command(flatten)]
    pub years: YearsArgs,

    #[command(flatten)]
    pub combine: CombineArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
