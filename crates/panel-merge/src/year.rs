//! Year aggregation: stack every year of an entity into one master table.

use std::collections::BTreeMap;
use std::time::Instant;

use panel_ingest::{
    EntityCodes, IngestError, ReferenceTable, RequestTableIndex, display_name, parse_span_file,
    read_workbook,
};
use panel_model::{
    CellValue, KeyOutcome, MASTER_PREFIX_COLUMNS, PipelineOptions, Sheet, SourceFile,
    StageReport, Workbook, YearSpan,
};
use tracing::{debug, info, info_span, warn};

use crate::context::KeyContext;
use crate::error::{MergeError, Result};
use crate::stage::{claim_output, discover, ensure_output_dir, fail_key, file_name, persist};

/// Rows collected for one entity across all of its span files.
#[derive(Debug, Clone)]
pub struct EntityAccumulator {
    entity: String,
    display: String,
    codes: EntityCodes,
    header: Option<Vec<CellValue>>,
    expected_vars: Option<usize>,
    var_counts: BTreeMap<i32, usize>,
    rows: Vec<(i32, Vec<CellValue>)>,
}

impl EntityAccumulator {
    pub fn new(entity: &str, codes: EntityCodes) -> Self {
        Self {
            entity: entity.to_string(),
            display: display_name(entity),
            codes,
            header: None,
            expected_vars: None,
            var_counts: BTreeMap::new(),
            rows: Vec::new(),
        }
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.var_counts.contains_key(&year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.var_counts.keys().copied().collect()
    }

    /// Adds one year's sheet. The first row of `rows` is the header.
    ///
    /// Returns a description of the variable-count disagreement when the
    /// year does not match the first ingested year.
    pub fn ingest_year(
        &mut self,
        year: i32,
        var_count: usize,
        rows: Vec<Vec<CellValue>>,
    ) -> std::result::Result<usize, String> {
        if let Some(expected) = self.expected_vars
            && expected != var_count
        {
            let breakdown = self
                .var_counts
                .iter()
                .map(|(y, count)| format!("{y}={count}"))
                .chain(std::iter::once(format!("{year}={var_count}")))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(format!(
                "{year}: {var_count} variables, expected {expected} ({breakdown})"
            ));
        }
        self.expected_vars = Some(var_count);
        self.var_counts.insert(year, var_count);

        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();
        if self.header.is_none() {
            self.header = Some(header);
        }
        let before = self.rows.len();
        for row in rows {
            let mut tagged = Vec::with_capacity(row.len() + MASTER_PREFIX_COLUMNS.len());
            tagged.push(CellValue::from(year));
            tagged.push(CellValue::text(&self.display));
            tagged.push(CellValue::text(&self.codes.code));
            tagged.push(CellValue::text(&self.codes.code2));
            tagged.extend(row);
            self.rows.push((year, tagged));
        }
        Ok(self.rows.len() - before)
    }

    /// Checks year completeness against `window` and builds the master sheet.
    pub fn finish(mut self, window: YearSpan, sheet_name: &str) -> Result<Sheet> {
        let present = self.years();
        let (Some(&first), Some(&last)) = (present.first(), present.last()) else {
            return Err(MergeError::NoYears {
                entity: self.entity,
            });
        };
        let gaps: Vec<i32> = (first..=last)
            .filter(|year| !self.var_counts.contains_key(year))
            .collect();
        if !gaps.is_empty() {
            return Err(MergeError::NonContiguousYears {
                entity: self.entity,
                gaps,
                present,
            });
        }
        let missing: Vec<i32> = window
            .years()
            .filter(|year| !self.var_counts.contains_key(year))
            .collect();
        if !missing.is_empty() {
            return Err(MergeError::MissingYears {
                entity: self.entity,
                missing,
                present,
            });
        }

        self.rows.sort_by_key(|(year, _)| *year);
        let mut header: Vec<CellValue> = MASTER_PREFIX_COLUMNS
            .iter()
            .map(|name| CellValue::text(*name))
            .collect();
        header.extend(self.header.unwrap_or_default());

        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(header);
        rows.extend(self.rows.into_iter().map(|(_, row)| row));
        Ok(Sheet::from_rows(sheet_name, rows))
    }
}

/// Builds one master table per entity from the span-merged workbooks.
pub fn aggregate_years(options: &PipelineOptions) -> Result<StageReport> {
    let dirs = &options.dirs;
    let window = options
        .window()
        .map_err(|source| MergeError::Window { source })?;
    let stage_span = info_span!("years", input = %dirs.spans.display(), window = %window);
    let _stage_guard = stage_span.enter();
    let started = Instant::now();

    let mut report = StageReport::new("years");
    let files = discover(&dirs.spans)?;
    let reference = ReferenceTable::load(&dirs.reference_table, &options.reference)
        .map_err(|source| MergeError::ReferenceTable { source })?;
    ensure_output_dir(&dirs.masters)?;

    let mut by_entity: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
    for path in files {
        match parse_span_file(&path) {
            Some(source) => by_entity.entry(source.entity.clone()).or_default().push(source),
            None => {
                warn!(file = %path.display(), "file name not recognised, skipped");
                report.warn(format!("{}: file name not recognised, skipped", file_name(&path)));
            }
        }
    }

    for (entity, mut sources) in by_entity {
        sources.sort_by_key(|source| source.span);
        let mut ctx = KeyContext::new(&entity, window, None, &dirs.masters);
        let key_span = info_span!("entity", entity = %entity);
        let _key_guard = key_span.enter();

        if !claim_output(&ctx, options.existing, &mut report)? {
            continue;
        }
        let display = display_name(&entity);
        if !reference.contains(&display) {
            ctx.warn(format!("'{display}' not in reference table, codes left blank"));
        }
        let accumulator = EntityAccumulator::new(&entity, reference.lookup(&display));

        let result = collect_entity(&mut ctx, accumulator, &sources, window, options)
            .and_then(|acc| acc.finish(window, &options.master_sheet));
        match result {
            Ok(sheet) => {
                let rows = sheet.extent().data_rows();
                let workbook = Workbook::from_sheets(vec![sheet]);
                if let Err(err) = persist(&ctx, &workbook) {
                    fail_key(&mut ctx, err, &mut report)?;
                    continue;
                }
                info!(output = %ctx.output.display(), rows, "master table written");
                report.warnings.extend(ctx.take_warnings());
                report.push(KeyOutcome::written(&ctx.key, ctx.output.clone()));
            }
            Err(err) => fail_key(&mut ctx, err, &mut report)?,
        }
    }

    info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        duration_ms = started.elapsed().as_millis(),
        "years stage complete"
    );
    Ok(report)
}

fn collect_entity(
    ctx: &mut KeyContext,
    mut acc: EntityAccumulator,
    sources: &[SourceFile],
    window: YearSpan,
    options: &PipelineOptions,
) -> Result<EntityAccumulator> {
    for source in sources {
        let workbook = read_workbook(&source.path).map_err(MergeError::workbook(&source.path))?;
        let index = match RequestTableIndex::build(&workbook, &options.descriptor_sheet) {
            Ok(index) => index,
            Err(err @ IngestError::DescriptorMissing { .. }) => {
                ctx.warn(format!("{}: {err}, skipped", source.file_name()));
                continue;
            }
            Err(err) => {
                return Err(MergeError::Workbook {
                    file: source.path.clone(),
                    source: err,
                });
            }
        };

        for entry in index.entries() {
            let year = entry.year;
            if !source.span.contains(year) {
                let err = MergeError::YearOutsideSpan {
                    file: source.path.clone(),
                    year,
                    span: source.span,
                };
                ctx.warn(format!("{err}, row skipped"));
                continue;
            }
            if !window.contains(year) {
                debug!(file = %source.file_name(), year, "year outside window, ignored");
                continue;
            }
            if acc.has_year(year) {
                ctx.warn(format!(
                    "{}: year {year} already ingested, skipped",
                    source.file_name()
                ));
                continue;
            }
            let Some(sheet) = workbook.sheet(&entry.sheet_name) else {
                ctx.warn(format!(
                    "{}: sheet '{}' for {year} not found, skipped",
                    source.file_name(),
                    entry.sheet_name
                ));
                continue;
            };

            let (rows, dropped) = sheet.non_blank_rows();
            if rows.is_empty() {
                ctx.warn(format!(
                    "{}: sheet '{}' for {year} is empty, skipped",
                    source.file_name(),
                    entry.sheet_name
                ));
                continue;
            }
            if dropped > 0 {
                debug!(sheet = %entry.sheet_name, year, dropped, "blank rows dropped");
            }
            let var_count = entry
                .expected_cols
                .unwrap_or_else(|| sheet.extent().cols)
                .saturating_sub(1);
            match acc.ingest_year(year, var_count, rows) {
                Ok(added) => debug!(file = %source.file_name(), year, rows = added, "year ingested"),
                Err(message) => ctx.warn(format!("{}: {message}, year skipped", source.file_name())),
            }
        }
    }
    Ok(acc)
}
