//! Combined all-entity CSV and its optional XLSX export.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use panel_ingest::{read_workbook, remove_output, write_workbook};
use panel_model::{CellValue, KeyOutcome, PipelineOptions, Sheet, StageReport, Workbook, format_numeric};
use polars::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::error::{MergeError, Result};
use crate::processed_log::ProcessedLog;
use crate::stage::{discover, file_name};

const BOM: char = '\u{feff}';

fn frame_err(file: &Path) -> impl Fn(PolarsError) -> MergeError + '_ {
    move |err| MergeError::Frame {
        file: file.to_path_buf(),
        message: err.to_string(),
    }
}

fn output_err(path: &Path) -> impl Fn(PolarsError) -> MergeError + '_ {
    move |err| MergeError::CombinedOutput {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Headers dropped from the combined output: blank ones and index leftovers.
fn is_dropped_header(name: &str) -> bool {
    name.is_empty() || name.starts_with("Unnamed")
}

/// Converts a master sheet into a frame of string columns.
pub fn sheet_to_frame(sheet: &Sheet, file: &Path) -> Result<DataFrame> {
    let rows = sheet.used_rows();
    let Some(header) = rows.first() else {
        return Err(MergeError::Frame {
            file: file.to_path_buf(),
            message: format!("sheet '{}' is empty", sheet.name()),
        });
    };

    let mut columns = Vec::with_capacity(header.len());
    for (col, cell) in header.iter().enumerate() {
        let name = cell.as_key().unwrap_or_default();
        if is_dropped_header(&name) {
            continue;
        }
        let values: Vec<Option<String>> = rows
            .iter()
            .skip(1)
            .map(|row| match &row[col] {
                CellValue::Empty => None,
                value => Some(value.to_string()),
            })
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into_column());
    }
    DataFrame::new(columns).map_err(frame_err(file))
}

/// Renders the CSV header line polars writes for `df`.
fn header_line(df: &DataFrame, file: &Path) -> Result<String> {
    let mut empty = df.head(Some(0));
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut empty)
        .map_err(frame_err(file))?;
    Ok(String::from_utf8_lossy(&buffer).trim_end().to_string())
}

/// First line of an existing CSV with the byte-order mark removed.
fn existing_header(path: &Path) -> Result<Option<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(MergeError::CombinedOutput {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|err| MergeError::CombinedOutput {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let line = line.trim_start_matches(BOM).trim_end();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

fn append_frame(df: &mut DataFrame, path: &Path, new_file: bool) -> Result<()> {
    let io_err = |err: std::io::Error| MergeError::CombinedOutput {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    CsvWriter::new(&mut file)
        .include_bom(new_file)
        .include_header(new_file)
        .finish(df)
        .map_err(output_err(path))?;
    file.sync_all().map_err(io_err)
}

fn remove_previous(options: &PipelineOptions) -> Result<()> {
    let dirs = &options.dirs;
    for path in [&dirs.combined_csv, &dirs.processed_log, &dirs.combined_xlsx] {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "removed previous combined output"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(MergeError::CombinedOutput {
                    path: path.clone(),
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Appends every master table not yet recorded in the processed log to the
/// combined CSV.
pub fn combine_master_tables(options: &PipelineOptions) -> Result<StageReport> {
    let dirs = &options.dirs;
    let stage_span = info_span!("combine", input = %dirs.masters.display());
    let _stage_guard = stage_span.enter();
    let started = Instant::now();

    if options.replaces_existing() {
        remove_previous(options)?;
    }
    let mut report = StageReport::new("combine");
    let mut log = ProcessedLog::load(&dirs.processed_log)?;
    let files = discover(&dirs.masters)?;
    info!(files = files.len(), already_processed = log.len(), "combining master tables");

    for path in files {
        let name = file_name(&path);
        if log.contains(&name) {
            debug!(file = %name, "already processed");
            report.push(KeyOutcome::skipped(&name, "already processed"));
            continue;
        }

        let mut df = match read_master_frame(&path, &options.master_sheet) {
            Ok(df) => df,
            Err(err) => {
                warn!(file = %name, error = %err, "master table unreadable, skipped");
                report.push(KeyOutcome::skipped(&name, err.to_string()));
                continue;
            }
        };
        let header = header_line(&df, &path)?;
        let existing = existing_header(&dirs.combined_csv)?;
        if let Some(existing) = &existing
            && existing != &header
        {
            warn!(file = %name, "columns differ from combined output, skipped");
            report.push(KeyOutcome::skipped(
                &name,
                format!("columns differ from {}", file_name(&dirs.combined_csv)),
            ));
            continue;
        }

        append_frame(&mut df, &dirs.combined_csv, existing.is_none())?;
        log.append(&name)?;
        info!(file = %name, rows = df.height(), "appended to combined output");
        report.push(KeyOutcome::written(&name, dirs.combined_csv.clone()));
    }

    info!(
        written = report.written_count(),
        skipped = report.skipped_count(),
        duration_ms = started.elapsed().as_millis(),
        "combine stage complete"
    );
    Ok(report)
}

fn read_master_frame(path: &Path, master_sheet: &str) -> Result<DataFrame> {
    let workbook = read_workbook(path).map_err(MergeError::workbook(path))?;
    let sheet = workbook
        .sheet(master_sheet)
        .or_else(|| workbook.sheets().first())
        .ok_or_else(|| MergeError::Frame {
            file: path.to_path_buf(),
            message: "workbook has no sheets".to_string(),
        })?;
    sheet_to_frame(sheet, path)
}

/// Converts a CSV value back to a cell, keeping text that would not survive
/// a numeric round trip (leading zeros, codes) as text.
fn csv_cell(value: Option<&str>) -> CellValue {
    let Some(value) = value else {
        return CellValue::Empty;
    };
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && format_numeric(number) == value => {
            CellValue::Number(number)
        }
        _ => CellValue::text(value),
    }
}

/// Writes the combined CSV out as a single-sheet workbook.
pub fn export_combined_xlsx(options: &PipelineOptions) -> Result<PathBuf> {
    let dirs = &options.dirs;
    let csv_path = &dirs.combined_csv;
    let xlsx_path = &dirs.combined_xlsx;
    let started = Instant::now();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(csv_path.clone()))
        .map_err(output_err(csv_path))?
        .finish()
        .map_err(output_err(csv_path))?;

    let mut header = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        header.push(CellValue::text(column.name().trim_start_matches(BOM)));
        columns.push(column.str().map_err(output_err(csv_path))?);
    }
    let mut sheet = Sheet::new(&options.master_sheet);
    sheet.push_row(header);
    for idx in 0..df.height() {
        sheet.push_row(columns.iter().map(|values| csv_cell(values.get(idx))).collect());
    }

    if remove_output(xlsx_path).map_err(MergeError::workbook(xlsx_path))? {
        debug!(path = %xlsx_path.display(), "replaced previous export");
    }
    write_workbook(&Workbook::from_sheets(vec![sheet]), xlsx_path)
        .map_err(MergeError::workbook(xlsx_path))?;
    info!(
        path = %xlsx_path.display(),
        rows = df.height(),
        duration_ms = started.elapsed().as_millis(),
        "combined workbook exported"
    );
    Ok(xlsx_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_and_blank_headers_are_dropped() {
        let sheet = Sheet::from_rows(
            "MASTER_TABLE",
            vec![
                vec![
                    CellValue::text("Unnamed: 0"),
                    CellValue::text("YEAR"),
                    CellValue::Empty,
                    CellValue::text("V1"),
                ],
                vec![
                    CellValue::number(0.0),
                    CellValue::number(2015.0),
                    CellValue::text("x"),
                    CellValue::Empty,
                ],
            ],
        );
        let df = sheet_to_frame(&sheet, Path::new("DK-2015-2015.xlsx")).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["YEAR", "V1"]);
        assert_eq!(
            header_line(&df, Path::new("DK-2015-2015.xlsx")).unwrap(),
            "YEAR,V1"
        );
    }

    #[test]
    fn csv_cells_keep_codes_as_text() {
        assert_eq!(csv_cell(Some("2015")), CellValue::Number(2015.0));
        assert_eq!(csv_cell(Some("001")), CellValue::text("001"));
        assert_eq!(csv_cell(Some("DNK")), CellValue::text("DNK"));
        assert_eq!(csv_cell(None), CellValue::Empty);
    }
}
