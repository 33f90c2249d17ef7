//! Descriptor sheet index.
//!
//! Every source workbook carries a `REQUEST_TABLE` sheet listing, one row per
//! covered year, the data sheet holding that year and its expected shape.
//! Rows start at spreadsheet row 7 and continue until the year cell is blank.

use panel_model::{CellValue, DescriptorLayout, Extent, Sheet, Workbook, cell_reference};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// One descriptor row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEntry {
    pub year: i32,
    /// Series identifier (`FDEALL1` for company 1).
    pub series: String,
    /// Raw sheet reference such as `'2015'!$A$1`.
    pub sheet_ref: String,
    /// Sheet name extracted from the reference.
    pub sheet_name: String,
    /// Expected rows, header included. `None` when the cell is not numeric.
    pub expected_rows: Option<usize>,
    /// Expected columns, key column included. `None` when not numeric.
    pub expected_cols: Option<usize>,
    /// 0-based row of this entry within the descriptor sheet.
    pub row: usize,
}

impl YearEntry {
    /// Expected shape, when both counters are numeric.
    pub fn expected_extent(&self) -> Option<Extent> {
        Some(Extent::new(self.expected_rows?, self.expected_cols?))
    }

    /// 1-based spreadsheet row number, for diagnostics.
    pub fn sheet_row(&self) -> usize {
        self.row + 1
    }
}

/// Ordered descriptor entries of one workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestTableIndex {
    entries: Vec<YearEntry>,
}

impl RequestTableIndex {
    /// Scans the descriptor sheet of `workbook`.
    pub fn build(workbook: &Workbook, descriptor_sheet: &str) -> Result<Self> {
        let sheet = workbook
            .sheet(descriptor_sheet)
            .ok_or_else(|| IngestError::DescriptorMissing {
                sheet: descriptor_sheet.to_string(),
            })?;
        Self::from_sheet(sheet, &DescriptorLayout::STANDARD)
    }

    pub fn from_sheet(sheet: &Sheet, layout: &DescriptorLayout) -> Result<Self> {
        let mut entries = Vec::new();
        let mut row = layout.first_row;
        loop {
            let year_cell = sheet.cell(row, layout.year_col);
            if year_cell.is_blank() {
                break;
            }
            let year = year_cell
                .as_i64()
                .and_then(|year| i32::try_from(year).ok())
                .ok_or_else(|| IngestError::InvalidYear {
                    cell: cell_reference(row, layout.year_col),
                    value: year_cell.to_string(),
                })?;
            let sheet_ref = sheet.cell(row, layout.reference_col).to_string();
            entries.push(YearEntry {
                year,
                series: sheet.cell(row, layout.series_col).to_string().trim().to_string(),
                sheet_name: extract_sheet_name(&sheet_ref),
                sheet_ref,
                expected_rows: counter(sheet.cell(row, layout.rows_col)),
                expected_cols: counter(sheet.cell(row, layout.cols_col)),
                row,
            });
            row += 1;
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[YearEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry declaring `year`.
    pub fn lookup(&self, year: i32) -> Result<&YearEntry> {
        self.entries
            .iter()
            .find(|entry| entry.year == year)
            .ok_or(IngestError::YearNotFound { year })
    }

    /// Years in descriptor order.
    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(|entry| entry.year).collect()
    }
}

fn counter(cell: &CellValue) -> Option<usize> {
    cell.as_i64().and_then(|value| usize::try_from(value).ok())
}

/// Extracts the sheet name from a reference like `'Sheet 1'!$A$1`.
///
/// The name is the text before `!` with quotes removed. A reference without
/// `!` is taken as a bare sheet name.
pub fn extract_sheet_name(reference: &str) -> String {
    let name = reference.split('!').next().unwrap_or_default();
    name.replace('\'', "").trim().to_string()
}

/// Writes expected row and column counters into a descriptor row.
pub fn write_counters(
    sheet: &mut Sheet,
    layout: &DescriptorLayout,
    row: usize,
    extent: Extent,
) {
    sheet.set_cell(row, layout.rows_col, CellValue::Number(extent.rows as f64));
    sheet.set_cell(row, layout.cols_col, CellValue::Number(extent.cols as f64));
}
