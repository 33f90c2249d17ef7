//! Panel workbook pipeline CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use panel_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use panel_cli::commands::{
    apply_entities_args, apply_years_args, confirm_replacement, load_options, run_audit,
    run_combine, run_entities, run_pipeline, run_variables, run_years,
};
use panel_cli::logging::{LogConfig, LogFormat, init_logging, resolve_log_file};
use panel_cli::prompt::Confirmation;
use panel_cli::types::RunSummary;
use tracing::error;
use tracing::level_filters::LevelFilter;

mod summary;

use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(summary) => {
            if cli.pipeline.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(error) => eprintln!("error: failed to render summary: {error}"),
                }
            } else {
                print_summary(&summary);
            }
            i32::from(summary.has_failures())
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "run stopped");
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let mut options = load_options(&cli.pipeline)?;
    let confirmation =
        Confirmation::from_flags(cli.pipeline.assume_yes, cli.pipeline.assume_no);
    let dirs = options.dirs.clone();
    match &cli.command {
        Command::Entities(args) => {
            apply_entities_args(&mut options, args);
            let targets = format!("merged workbooks in {}", dirs.variables.display());
            confirm_replacement(&options, confirmation, &targets)?;
            run_entities(&options)
        }
        Command::Audit => run_audit(&options),
        Command::Variables => {
            let targets = format!("merged workbooks in {}", dirs.spans.display());
            confirm_replacement(&options, confirmation, &targets)?;
            run_variables(&options)
        }
        Command::Years(args) => {
            apply_years_args(&mut options, args);
            let targets = format!("master tables in {}", dirs.masters.display());
            confirm_replacement(&options, confirmation, &targets)?;
            run_years(&options)
        }
        Command::Combine(args) => {
            let targets = format!(
                "{}, {} and {}",
                dirs.combined_csv.display(),
                dirs.processed_log.display(),
                dirs.combined_xlsx.display()
            );
            confirm_replacement(&options, confirmation, &targets)?;
            run_combine(&options, args)
        }
        Command::Run(args) => {
            apply_entities_args(&mut options, &args.entities);
            apply_years_args(&mut options, &args.years);
            confirm_replacement(&options, confirmation, "outputs of every stage")?;
            run_pipeline(&options, args)
        }
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = resolve_log_file(cli.log_file.as_deref(), &cli.pipeline.root);
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };
    config
}
