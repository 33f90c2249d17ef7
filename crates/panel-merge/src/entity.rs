//! Company merge: row-append per-company workbooks onto company 1.
//!
//! Company workbooks sharing an (entity, span, tags) key are merged into one
//! variable-group workbook. Company 1 is the template; every other company in
//! ascending order contributes its data rows, sheet by sheet, provided the
//! sheet's column extent matches the template's.

use std::collections::BTreeMap;
use std::time::Instant;

use panel_ingest::{
    RequestTableIndex, parse_company_file, read_workbook, series_for_group, validate_descriptor,
    write_counters,
};
use panel_model::{
    DescriptorLayout, Extent, KeyOutcome, MissingGroups, PipelineOptions, SourceFile,
    StageReport, Workbook, YearSpan,
};
use tracing::{debug, info, info_span, warn};

use crate::context::KeyContext;
use crate::error::{MergeError, Result};
use crate::stage::{claim_output, discover, ensure_output_dir, fail_key, file_name, persist};

type GroupKey = (String, YearSpan, String);

/// Result of merging one key.
struct MergedGroup {
    workbook: Workbook,
    contributed: Vec<u32>,
}

/// Merges every company group found in the companies directory.
pub fn merge_entities(options: &PipelineOptions) -> Result<StageReport> {
    let dirs = &options.dirs;
    let stage_span = info_span!("entities", input = %dirs.companies.display());
    let _stage_guard = stage_span.enter();
    let started = Instant::now();

    let mut report = StageReport::new("entities");
    let files = discover(&dirs.companies)?;
    ensure_output_dir(&dirs.variables)?;

    let mut groups: BTreeMap<GroupKey, BTreeMap<u32, SourceFile>> = BTreeMap::new();
    for path in files {
        let Some(source) = parse_company_file(&path) else {
            let message = format!("{}: file name not recognised, skipped", file_name(&path));
            warn!(file = %path.display(), "file name not recognised, skipped");
            report.warn(message);
            continue;
        };
        let (Some(group_index), Some(tags)) = (source.group_index, source.tags.clone()) else {
            continue;
        };
        let companies = groups
            .entry((source.entity.clone(), source.span, tags))
            .or_default();
        if let Some(existing) = companies.get(&group_index) {
            let message = format!(
                "{}: company {group_index} already provided by {}, skipped",
                source.file_name(),
                existing.file_name()
            );
            warn!(file = %source.path.display(), "{message}");
            report.warn(message);
            continue;
        }
        companies.insert(group_index, source);
    }

    info!(group_count = groups.len(), "company groups discovered");

    for ((entity, span, tags), companies) in &groups {
        let mut ctx = KeyContext::new(entity, *span, Some(tags), &dirs.variables);
        let key_span = info_span!("key", key = %ctx.key);
        let _key_guard = key_span.enter();

        if !claim_output(&ctx, options.existing, &mut report)? {
            continue;
        }

        match merge_group(&mut ctx, companies, options) {
            Ok(merged) => {
                if let Err(err) = persist(&ctx, &merged.workbook) {
                    fail_key(&mut ctx, err, &mut report)?;
                    continue;
                }
                let missing: Vec<u32> = (1..=options.expected_companies)
                    .filter(|idx| !merged.contributed.contains(idx))
                    .collect();
                info!(
                    output = %ctx.output.display(),
                    companies = ?merged.contributed,
                    "merged company workbooks"
                );
                let mut outcome = KeyOutcome::written(&ctx.key, ctx.output.clone());
                if !missing.is_empty() {
                    outcome = outcome.with_detail(format!("missing companies {missing:?}"));
                    report.missing_groups.push(MissingGroups {
                        key: ctx.key.clone(),
                        missing,
                    });
                }
                report.warnings.extend(ctx.take_warnings());
                report.push(outcome);
            }
            Err(err) => fail_key(&mut ctx, err, &mut report)?,
        }
    }

    for gap in &report.missing_groups {
        warn!(key = %gap.key, missing = ?gap.missing, "companies missing from merged output");
    }
    info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        duration_ms = started.elapsed().as_millis(),
        "entities stage complete"
    );
    Ok(report)
}

fn merge_group(
    ctx: &mut KeyContext,
    companies: &BTreeMap<u32, SourceFile>,
    options: &PipelineOptions,
) -> Result<MergedGroup> {
    let descriptor_sheet = options.descriptor_sheet.as_str();
    let template = companies.get(&1).ok_or_else(|| MergeError::MissingTemplate {
        key: ctx.key.clone(),
        expected: "company 1".to_string(),
    })?;

    let mut merged = read_workbook(&template.path).map_err(MergeError::workbook(&template.path))?;
    let index = RequestTableIndex::build(&merged, descriptor_sheet)
        .map_err(MergeError::workbook(&template.path))?;
    validate_descriptor(
        &index,
        &series_for_group(&options.series_prefix, 1),
        ctx.span,
    )
    .map_err(|source| MergeError::TemplateDescriptor {
        key: ctx.key.clone(),
        file: template.path.clone(),
        source,
    })?;
    check_sheet_count(&merged, template, descriptor_sheet)?;
    log_shapes(&merged, template, descriptor_sheet);

    let data_sheets = merged.data_sheet_names(descriptor_sheet);
    let mut appended: BTreeMap<String, usize> = BTreeMap::new();
    let mut contributed = vec![1];

    for (&group_index, source) in companies.range(2..) {
        let workbook = match read_workbook(&source.path) {
            Ok(workbook) => workbook,
            Err(err) => {
                ctx.warn(format!("{}: unreadable, skipped: {err}", source.file_name()));
                continue;
            }
        };
        let index = match RequestTableIndex::build(&workbook, descriptor_sheet) {
            Ok(index) => index,
            Err(err) => {
                ctx.warn(format!("{}: {err}, skipped", source.file_name()));
                continue;
            }
        };
        let expected_series = series_for_group(&options.series_prefix, group_index);
        if let Err(mismatch) = validate_descriptor(&index, &expected_series, ctx.span) {
            let err = MergeError::Descriptor {
                file: source.path.clone(),
                source: mismatch,
            };
            if err.is_process_fatal() {
                return Err(err);
            }
            ctx.warn(format!("{err}, skipped"));
            continue;
        }
        if let Err(err) = check_sheet_count(&workbook, source, descriptor_sheet) {
            ctx.warn(format!("{err}, skipped"));
            continue;
        }
        log_shapes(&workbook, source, descriptor_sheet);

        for name in &data_sheets {
            let Some(source_sheet) = workbook.sheet(name) else {
                ctx.warn(format!(
                    "{}: sheet '{name}' not found, append skipped",
                    source.file_name()
                ));
                continue;
            };
            let Some(target) = merged.sheet_mut(name) else {
                continue;
            };
            let target_cols = target.extent().cols;
            let source_cols = source_sheet.extent().cols;
            if target_cols != source_cols {
                ctx.warn(format!(
                    "{}: sheet '{name}' has {source_cols} columns, template has {target_cols}, append skipped",
                    source.file_name()
                ));
                continue;
            }
            let count = target.append_rows(source_sheet.data_rows());
            *appended.entry(name.clone()).or_default() += count;
            debug!(
                file = %source.file_name(),
                sheet = %name,
                rows = count,
                "appended rows"
            );
        }
        contributed.push(group_index);
    }

    rewrite_row_counters(&mut merged, &index, &appended, descriptor_sheet);
    Ok(MergedGroup {
        workbook: merged,
        contributed,
    })
}

fn check_sheet_count(workbook: &Workbook, source: &SourceFile, descriptor_sheet: &str) -> Result<()> {
    let found = workbook.data_sheet_names(descriptor_sheet).len();
    let expected = source.span.year_count();
    if found < expected {
        return Err(MergeError::TooFewSheets {
            file: source.path.clone(),
            found,
            expected,
            span: source.span,
        });
    }
    Ok(())
}

fn log_shapes(workbook: &Workbook, source: &SourceFile, descriptor_sheet: &str) {
    for sheet in workbook.sheets() {
        if sheet.name() == descriptor_sheet {
            continue;
        }
        debug!(
            file = %source.file_name(),
            sheet = %sheet.name(),
            shape = %sheet.extent(),
            "sheet shape"
        );
    }
}

/// Adds the appended row counts to each year's expected-rows counter so the
/// merged descriptor describes the merged sheets.
fn rewrite_row_counters(
    merged: &mut Workbook,
    index: &RequestTableIndex,
    appended: &BTreeMap<String, usize>,
    descriptor_sheet: &str,
) {
    let layout = DescriptorLayout::STANDARD;
    let Some(request) = merged.sheet_mut(descriptor_sheet) else {
        return;
    };
    for entry in index.entries() {
        let Some(added) = appended.get(&entry.sheet_name).copied() else {
            continue;
        };
        let (Some(rows), Some(cols)) = (entry.expected_rows, entry.expected_cols) else {
            continue;
        };
        write_counters(request, &layout, entry.row, Extent::new(rows + added, cols));
    }
}
