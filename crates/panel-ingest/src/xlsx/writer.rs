//! Workbook persistence with rust_xlsxwriter.

use std::path::{Path, PathBuf};

use panel_model::{CellValue, Workbook};
use rust_xlsxwriter::{Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Writes a workbook to `path`, values only.
///
/// The file is first written to a hidden sibling and renamed into place, so
/// `path` either holds the previous content or the complete new workbook.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let partial = partial_path(path);
    let result = save_to(workbook, &partial).and_then(|()| {
        std::fs::rename(&partial, path).map_err(|source| IngestError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

/// Removes a previous output if present. Missing files are not an error.
pub fn remove_output(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(IngestError::FileWrite {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

fn save_to(workbook: &Workbook, path: &Path) -> Result<()> {
    let to_error = |source: XlsxError| IngestError::WorkbookWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut xlsx = XlsxWorkbook::new();
    for sheet in workbook.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(sheet.name()).map_err(to_error)?;
        for (row_idx, row) in sheet.rows().iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                write_cell(worksheet, row_idx as u32, col_idx as u16, cell).map_err(to_error)?;
            }
        }
        debug!(sheet = %sheet.name(), shape = %sheet.extent(), "writing sheet");
    }
    xlsx.save(path).map_err(to_error)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
) -> std::result::Result<(), XlsxError> {
    match cell {
        CellValue::Empty => {}
        CellValue::Text(value) => {
            worksheet.write_string(row, col, value)?;
        }
        CellValue::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        CellValue::Bool(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
    }
    Ok(())
}
