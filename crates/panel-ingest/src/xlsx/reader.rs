//! Workbook loading with calamine.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use panel_model::{CellValue, Sheet, Workbook};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads every sheet of a workbook into memory.
///
/// Cells keep their absolute positions: a sheet whose used range starts at
/// `B3` still has its first value at `(2, 1)`.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut workbook = open_workbook_auto(path).map_err(|source| IngestError::WorkbookOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| IngestError::SheetRead {
                path: path.to_path_buf(),
                sheet: name.clone(),
                source,
            })?;
        let sheet = range_to_sheet(&name, &range);
        debug!(
            file = %path.display(),
            sheet = %name,
            shape = %sheet.extent(),
            "loaded sheet"
        );
        sheets.push(sheet);
    }

    Ok(Workbook::from_sheets(sheets))
}

/// Reads the first sheet of a workbook.
pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
    let workbook = read_workbook(path)?;
    workbook
        .sheets()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::SheetMissing {
            sheet: "<first>".to_string(),
        })
}

fn range_to_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);
    let Some((start_row, start_col)) = range.start() else {
        return sheet;
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    for (row_idx, row) in range.rows().enumerate() {
        for (col_idx, data) in row.iter().enumerate() {
            let value = convert_cell(data);
            if !value.is_blank() {
                sheet.set_cell(start_row + row_idx, start_col + col_idx, value);
            }
        }
    }
    sheet
}

/// Convert calamine Data to a cell value.
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(e) => CellValue::text(e.to_string()),
    }
}
