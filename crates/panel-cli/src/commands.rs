use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use panel_merge::{
    aggregate_years, audit_row_keys, combine_master_tables, export_combined_xlsx, merge_entities,
    merge_variables,
};
use panel_model::{ExistingOutputPolicy, PipelineOptions, StageReport};
use tracing::{info, info_span, warn};

use crate::cli::{CombineArgs, EntitiesArgs, PipelineArgs, RunArgs, YearsArgs};
use crate::prompt::Confirmation;
use crate::types::RunSummary;

/// Builds pipeline options from the optional JSON config and the flags.
pub fn load_options(args: &PipelineArgs) -> Result<PipelineOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str::<PipelineOptions>(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => PipelineOptions::default(),
    };
    options.dirs = options.dirs.resolve(&args.root);
    if args.replace_existing {
        options.existing = ExistingOutputPolicy::Replace;
    }
    Ok(options)
}

/// Asks before any stage deletes outputs of a previous run. Declining stops
/// the run.
pub fn confirm_replacement(
    options: &PipelineOptions,
    confirmation: Confirmation,
    targets: &str,
) -> Result<()> {
    if !options.replaces_existing() {
        return Ok(());
    }
    let question = format!("Delete existing {targets} and rebuild them?");
    if !confirmation
        .confirm(&question)
        .context("read confirmation")?
    {
        bail!("replacement of existing {targets} declined");
    }
    info!(targets, "replacement confirmed");
    Ok(())
}

pub fn apply_entities_args(options: &mut PipelineOptions, args: &EntitiesArgs) {
    if let Some(companies) = args.companies {
        options.expected_companies = companies;
    }
}

pub fn apply_years_args(options: &mut PipelineOptions, args: &YearsArgs) {
    if let Some(start) = args.start_year {
        options.start_year = start;
    }
    if let Some(end) = args.end_year {
        options.end_year = end;
    }
}

pub fn run_entities(options: &PipelineOptions) -> Result<RunSummary> {
    let report = merge_entities(options).context("entities stage")?;
    Ok(RunSummary {
        reports: vec![report],
        ..RunSummary::default()
    })
}

pub fn run_audit(options: &PipelineOptions) -> Result<RunSummary> {
    let audit = audit_row_keys(options).context("audit stage")?;
    Ok(RunSummary {
        reports: vec![audit.report],
        gaps: audit.gaps,
        exported: None,
    })
}

pub fn run_variables(options: &PipelineOptions) -> Result<RunSummary> {
    let report = merge_variables(options).context("variables stage")?;
    Ok(RunSummary {
        reports: vec![report],
        ..RunSummary::default()
    })
}

pub fn run_years(options: &PipelineOptions) -> Result<RunSummary> {
    let report = aggregate_years(options).context("years stage")?;
    Ok(RunSummary {
        reports: vec![report],
        ..RunSummary::default()
    })
}

pub fn run_combine(options: &PipelineOptions, args: &CombineArgs) -> Result<RunSummary> {
    let report = combine_master_tables(options).context("combine stage")?;
    let exported = export_if_requested(options, args, &report)?;
    Ok(RunSummary {
        reports: vec![report],
        gaps: Vec::new(),
        exported,
    })
}

fn export_if_requested(
    options: &PipelineOptions,
    args: &CombineArgs,
    report: &StageReport,
) -> Result<Option<PathBuf>> {
    if !args.export_xlsx {
        return Ok(None);
    }
    if !options.dirs.combined_csv.is_file() {
        warn!(
            stage = %report.stage,
            csv = %options.dirs.combined_csv.display(),
            "no combined CSV to export"
        );
        return Ok(None);
    }
    let path = export_combined_xlsx(options).context("export combined workbook")?;
    Ok(Some(path))
}

/// Runs every stage in order. Key failures are reported and the next stage
/// still runs over whatever was written; process-fatal errors stop the run.
pub fn run_pipeline(options: &PipelineOptions, args: &RunArgs) -> Result<RunSummary> {
    let span = info_span!("run", root = %options.dirs.companies.display());
    let _guard = span.enter();

    let mut summary = RunSummary::default();
    summary
        .reports
        .push(merge_entities(options).context("entities stage")?);

    let audit = audit_row_keys(options).context("audit stage")?;
    summary.reports.push(audit.report);
    summary.gaps = audit.gaps;

    summary
        .reports
        .push(merge_variables(options).context("variables stage")?);
    summary
        .reports
        .push(aggregate_years(options).context("years stage")?);

    let combined = combine_master_tables(options).context("combine stage")?;
    summary.exported = export_if_requested(options, &args.combine, &combined)?;
    summary.reports.push(combined);

    info!(
        stages = summary.reports.len(),
        failed = summary.has_failures(),
        "pipeline complete"
    );
    Ok(summary)
}
