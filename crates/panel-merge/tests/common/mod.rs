//! Workbook fixtures shared by the stage tests.

#![allow(dead_code)]

use std::path::Path;

use panel_ingest::write_workbook;
use panel_model::{CellValue, DescriptorLayout, PipelineOptions, Sheet, Workbook};

pub fn row(values: &[&str]) -> Vec<CellValue> {
    values.iter().map(|v| CellValue::text(*v)).collect()
}

/// A source workbook with one descriptor row and one data sheet per year.
/// Counters are taken from each sheet's rows.
pub fn source_workbook(series: &str, years: &[(i32, Vec<Vec<CellValue>>)]) -> Workbook {
    let layout = DescriptorLayout::STANDARD;
    let mut request = Sheet::new("REQUEST_TABLE");
    request.set_cell(0, 0, CellValue::text("Datastream request"));
    let mut sheets = Vec::with_capacity(years.len() + 1);
    for (offset, (year, rows)) in years.iter().enumerate() {
        let line = layout.first_row + offset;
        let cols = rows.first().map_or(0, Vec::len);
        request.set_cell(line, layout.series_col, CellValue::text(series));
        request.set_cell(line, layout.year_col, CellValue::from(*year));
        request.set_cell(
            line,
            layout.reference_col,
            CellValue::text(format!("'{year}'!$A$1")),
        );
        request.set_cell(line, layout.rows_col, CellValue::Number(rows.len() as f64));
        request.set_cell(line, layout.cols_col, CellValue::Number(cols as f64));
        sheets.push(Sheet::from_rows(year.to_string(), rows.clone()));
    }
    sheets.insert(0, request);
    Workbook::from_sheets(sheets)
}

pub fn write(dir: &Path, name: &str, workbook: &Workbook) {
    std::fs::create_dir_all(dir).unwrap();
    write_workbook(workbook, &dir.join(name)).unwrap();
}

pub fn options(root: &Path) -> PipelineOptions {
    let mut options = PipelineOptions::default();
    options.dirs = options.dirs.resolve(root);
    options
}

pub fn rendered(sheet: &Sheet) -> Vec<Vec<String>> {
    sheet
        .used_rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
