//! Variable merge: outer-join every variable group of a span onto group `A`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use panel_ingest::{
    RequestTableIndex, parse_variable_file, read_workbook, validate_shape, write_counters,
};
use panel_model::{
    CellValue, DescriptorLayout, Extent, KeyOutcome, PipelineOptions, Sheet, SourceFile,
    StageReport, VariableTag, Workbook, YearSpan, partition_spans,
};
use tracing::{debug, info, info_span, warn};

use crate::context::KeyContext;
use crate::error::{MergeError, Result};
use crate::join::{JoinReport, outer_join_on_key};
use crate::stage::{claim_output, discover, ensure_output_dir, fail_key, file_name, persist};

/// Merges every (entity, span) block found in the variables directory.
pub fn merge_variables(options: &PipelineOptions) -> Result<StageReport> {
    let dirs = &options.dirs;
    let stage_span = info_span!("variables", input = %dirs.variables.display());
    let _stage_guard = stage_span.enter();
    let started = Instant::now();

    let mut report = StageReport::new("variables");
    let files = discover(&dirs.variables)?;
    ensure_output_dir(&dirs.spans)?;

    let mut by_entity: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
    for path in files {
        let Some(source) = parse_variable_file(&path) else {
            warn!(file = %path.display(), "file name not recognised, skipped");
            report.warn(format!("{}: file name not recognised, skipped", file_name(&path)));
            continue;
        };
        match source.expand_tags() {
            Ok(logical) => by_entity
                .entry(source.entity.clone())
                .or_default()
                .extend(logical),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "invalid tags, skipped");
                report.warn(format!("{}: {err}, skipped", source.file_name()));
            }
        }
    }

    for (entity, sources) in &by_entity {
        let entity_span = info_span!("entity", entity = %entity);
        let _entity_guard = entity_span.enter();

        let spans: Vec<YearSpan> = sources.iter().map(|source| source.span).collect();
        let blocks = match partition_spans(&spans) {
            Ok(blocks) => blocks,
            Err(conflict) => {
                let err = MergeError::SpanConflict {
                    entity: entity.clone(),
                    conflict,
                };
                warn!(error = %err, "entity skipped");
                report.push(KeyOutcome::failed(entity, err.to_string()));
                continue;
            }
        };
        debug!(blocks = blocks.len(), "span blocks");

        for span in blocks {
            let mut ctx = KeyContext::new(entity, span, None, &dirs.spans);
            let key_span = info_span!("key", key = %ctx.key);
            let _key_guard = key_span.enter();

            if !claim_output(&ctx, options.existing, &mut report)? {
                continue;
            }
            let block: Vec<&SourceFile> = sources.iter().filter(|s| s.span == span).collect();

            match merge_block(&mut ctx, &block, options) {
                Ok(workbook) => {
                    if let Err(err) = persist(&ctx, &workbook) {
                        fail_key(&mut ctx, err, &mut report)?;
                        continue;
                    }
                    info!(output = %ctx.output.display(), "merged variable groups");
                    report.warnings.extend(ctx.take_warnings());
                    report.push(KeyOutcome::written(&ctx.key, ctx.output.clone()));
                }
                Err(err) => fail_key(&mut ctx, err, &mut report)?,
            }
        }
    }

    info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        duration_ms = started.elapsed().as_millis(),
        "variables stage complete"
    );
    Ok(report)
}

/// Orders a block's logical sources by tag. When two physical files claim
/// the same tag, the `.xlsx` file is kept.
fn sources_by_tag(ctx: &mut KeyContext, block: &[&SourceFile]) -> BTreeMap<VariableTag, SourceFile> {
    let mut by_tag: BTreeMap<VariableTag, SourceFile> = BTreeMap::new();
    for source in block {
        let Some(tag) = source.tag() else {
            continue;
        };
        match by_tag.get(&tag) {
            None => {
                by_tag.insert(tag, (*source).clone());
            }
            Some(kept) => {
                let prefer_new = !is_xlsx(&kept.path) && is_xlsx(&source.path);
                let (winner, loser) = if prefer_new {
                    (source.file_name(), kept.file_name())
                } else {
                    (kept.file_name(), source.file_name())
                };
                ctx.warn(format!("tag {tag} provided twice, using {winner} over {loser}"));
                if prefer_new {
                    by_tag.insert(tag, (*source).clone());
                }
            }
        }
    }
    by_tag
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

fn merge_block(
    ctx: &mut KeyContext,
    block: &[&SourceFile],
    options: &PipelineOptions,
) -> Result<Workbook> {
    let descriptor_sheet = options.descriptor_sheet.as_str();
    let layout = DescriptorLayout::STANDARD;
    let by_tag = sources_by_tag(ctx, block);

    let template = by_tag
        .get(&VariableTag::TEMPLATE)
        .ok_or_else(|| MergeError::MissingTemplate {
            key: ctx.key.clone(),
            expected: format!("variable group {}", VariableTag::TEMPLATE),
        })?;
    let mut merged = read_workbook(&template.path).map_err(MergeError::workbook(&template.path))?;
    let mut out_index = RequestTableIndex::build(&merged, descriptor_sheet)
        .map_err(MergeError::workbook(&template.path))?;

    let mut merged_paths: HashSet<PathBuf> = HashSet::from([template.path.clone()]);

    for (tag, source) in by_tag.iter().filter(|(tag, _)| !tag.is_template()) {
        if !merged_paths.insert(source.path.clone()) {
            debug!(tag = %tag, file = %source.file_name(), "file already merged under an earlier tag");
            continue;
        }
        let workbook = read_workbook(&source.path).map_err(MergeError::workbook(&source.path))?;
        let src_index = RequestTableIndex::build(&workbook, descriptor_sheet)
            .map_err(MergeError::workbook(&source.path))?;

        for year in ctx.span.years() {
            let src_entry = src_index
                .lookup(year)
                .map_err(|_| MergeError::YearNotFound {
                    key: ctx.key.clone(),
                    file: source.path.clone(),
                    year,
                })?;
            let src_sheet =
                workbook
                    .sheet(&src_entry.sheet_name)
                    .ok_or_else(|| MergeError::SheetMissing {
                        key: ctx.key.clone(),
                        file: source.path.clone(),
                        sheet: src_entry.sheet_name.clone(),
                        year,
                    })?;
            let src_extent = src_sheet.extent();
            validate_shape(src_entry, src_extent).map_err(|source_err| MergeError::Shape {
                key: ctx.key.clone(),
                file: source.path.clone(),
                source: source_err,
            })?;

            let out_entry = out_index
                .lookup(year)
                .map_err(|_| MergeError::YearNotFound {
                    key: ctx.key.clone(),
                    file: template.path.clone(),
                    year,
                })?
                .clone();
            let key_only;
            let (target, out_cols) = match merged.sheet(&out_entry.sheet_name) {
                Some(sheet) => {
                    let cols = out_entry.expected_cols.ok_or_else(|| MergeError::CounterMissing {
                        key: ctx.key.clone(),
                        file: template.path.clone(),
                        year,
                    })?;
                    (sheet, cols)
                }
                None => {
                    ctx.warn(format!(
                        "{year}: template has no sheet '{}', started from the key column",
                        out_entry.sheet_name
                    ));
                    key_only = Sheet::from_rows(
                        out_entry.sheet_name.as_str(),
                        vec![vec![CellValue::text(options.key_column.as_str())]],
                    );
                    (&key_only, 1)
                }
            };

            let outcome = outer_join_on_key(target, src_sheet, &options.key_column, &options.placeholder)
                .map_err(|join_err| MergeError::Join {
                    key: ctx.key.clone(),
                    file: source.path.clone(),
                    sheet: src_entry.sheet_name.clone(),
                    source: join_err,
                })?;
            log_join(ctx, *tag, year, &outcome.report);
            let joined_extent = outcome.sheet.extent();
            merged.insert_sheet(outcome.sheet);

            let cols = out_cols + src_extent.cols.saturating_sub(1);
            if out_entry.expected_rows != src_entry.expected_rows {
                let declared =
                    |rows: Option<usize>| rows.map_or_else(|| "no".to_string(), |n| n.to_string());
                ctx.warn(format!(
                    "{year}: merged descriptor declares {} rows, group {tag} declares {}",
                    declared(out_entry.expected_rows),
                    declared(src_entry.expected_rows)
                ));
            }
            if let Some(request) = merged.sheet_mut(descriptor_sheet) {
                write_counters(
                    request,
                    &layout,
                    out_entry.row,
                    Extent::new(joined_extent.rows, cols),
                );
            }
            out_index = RequestTableIndex::build(&merged, descriptor_sheet)
                .map_err(MergeError::workbook(&template.path))?;
        }
        info!(tag = %tag, file = %source.file_name(), "variable group merged");
    }

    Ok(merged)
}

fn log_join(ctx: &mut KeyContext, tag: VariableTag, year: i32, report: &JoinReport) {
    for added in &report.added {
        info!(
            tag = %tag,
            year,
            row_key = %added.key,
            row = added.row,
            "row key only in new group"
        );
    }
    for missing in &report.missing {
        warn!(
            tag = %tag,
            year,
            row_key = %missing.key,
            row = missing.row,
            "row key missing from new group"
        );
    }
    if report.dropped_source_rows > 0 {
        ctx.warn(format!(
            "group {tag}, {year}: {} rows without a row key dropped",
            report.dropped_source_rows
        ));
    }
}
