//! In-memory sheets and workbooks.
//!
//! Sheets are ragged grids addressed with 0-based `(row, col)` indices. Edited
//! spreadsheets often carry formatting-only rows and columns past the data,
//! so every size question goes through [`Sheet::extent`], which scans back
//! from the end to the last non-blank cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Used size of a sheet, header row included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub rows: usize,
    pub cols: usize,
}

impl Extent {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of rows below the header.
    pub fn data_rows(&self) -> usize {
        self.rows.saturating_sub(1)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows x {} columns", self.rows, self.cols)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw stored rows, trailing blanks included.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Trailing-blank-aware used size.
    pub fn extent(&self) -> Extent {
        let rows = self
            .rows
            .iter()
            .rposition(|cells| cells.iter().any(|cell| !cell.is_blank()))
            .map_or(0, |idx| idx + 1);
        let cols = self.rows[..rows]
            .iter()
            .filter_map(|cells| cells.iter().rposition(|cell| !cell.is_blank()))
            .map(|idx| idx + 1)
            .max()
            .unwrap_or(0);
        Extent { rows, cols }
    }

    /// Rows inside the extent, each padded or cut to the extent width.
    pub fn used_rows(&self) -> Vec<Vec<CellValue>> {
        let extent = self.extent();
        self.rows[..extent.rows]
            .iter()
            .map(|cells| fit_width(cells, extent.cols))
            .collect()
    }

    /// Header row padded to the extent width.
    pub fn header(&self) -> Vec<CellValue> {
        let extent = self.extent();
        if extent.rows == 0 {
            return Vec::new();
        }
        fit_width(&self.rows[0], extent.cols)
    }

    /// Used rows below the header.
    pub fn data_rows(&self) -> Vec<Vec<CellValue>> {
        let mut rows = self.used_rows();
        if !rows.is_empty() {
            rows.remove(0);
        }
        rows
    }

    /// Rows holding at least one value, plus the number of blank rows dropped.
    pub fn non_blank_rows(&self) -> (Vec<Vec<CellValue>>, usize) {
        let width = self.extent().cols;
        let mut kept = Vec::new();
        let mut dropped = 0usize;
        for cells in &self.rows {
            if cells.iter().all(CellValue::is_blank) {
                dropped += 1;
            } else {
                kept.push(fit_width(cells, width));
            }
        }
        (kept, dropped)
    }

    /// Appends rows directly after the last non-blank row.
    ///
    /// Residual blank rows at the end of the sheet are discarded first so the
    /// appended block never lands below formatting-only leftovers.
    pub fn append_rows<I>(&mut self, rows: I) -> usize
    where
        I: IntoIterator<Item = Vec<CellValue>>,
    {
        let used = self.extent().rows;
        self.rows.truncate(used);
        let before = self.rows.len();
        self.rows.extend(rows);
        self.rows.len() - before
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }
}

fn fit_width(cells: &[CellValue], width: usize) -> Vec<CellValue> {
    let mut row: Vec<CellValue> = cells.iter().take(width).cloned().collect();
    row.resize(width, CellValue::Empty);
    row
}

/// Ordered collection of sheets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.sheet(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    /// Inserts a sheet, replacing any sheet with the same name in place.
    pub fn insert_sheet(&mut self, sheet: Sheet) {
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    /// Names of every sheet except the descriptor sheet, in workbook order.
    pub fn data_sheet_names(&self, descriptor_sheet: &str) -> Vec<String> {
        self.sheets
            .iter()
            .filter(|sheet| sheet.name != descriptor_sheet)
            .map(|sheet| sheet.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    #[test]
    fn extent_ignores_trailing_blank_rows_and_columns() {
        let sheet = Sheet::from_rows(
            "S",
            vec![
                row(&["Type", "V1", "", ""]),
                row(&["a", "1", "", ""]),
                row(&["", "", "", ""]),
                vec![],
            ],
        );
        assert_eq!(sheet.extent(), Extent::new(2, 2));
        assert_eq!(sheet.data_rows(), vec![row(&["a", "1"])]);
    }

    #[test]
    fn append_lands_after_last_value() {
        let mut sheet = Sheet::from_rows(
            "S",
            vec![row(&["Type", "V1"]), row(&["a", "1"]), row(&["", ""])],
        );
        let appended = sheet.append_rows(vec![row(&["b", "2"])]);
        assert_eq!(appended, 1);
        assert_eq!(sheet.rows().len(), 3);
        assert_eq!(sheet.cell(2, 0), &CellValue::text("b"));
    }

    #[test]
    fn non_blank_rows_counts_dropped() {
        let sheet = Sheet::from_rows(
            "S",
            vec![row(&["Type"]), row(&[""]), row(&["a"]), row(&[""])],
        );
        let (rows, dropped) = sheet.non_blank_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn set_cell_grows_grid() {
        let mut sheet = Sheet::new("S");
        sheet.set_cell(2, 3, CellValue::number(5.0));
        assert_eq!(sheet.extent(), Extent::new(3, 4));
        assert_eq!(sheet.cell(0, 0), &CellValue::Empty);
        assert_eq!(sheet.cell(10, 10), &CellValue::Empty);
    }

    #[test]
    fn insert_replaces_by_name() {
        let mut book = Workbook::new();
        book.insert_sheet(Sheet::new("REQUEST_TABLE"));
        book.insert_sheet(Sheet::new("2015"));
        book.insert_sheet(Sheet::from_rows("2015", vec![row(&["x"])]));
        assert_eq!(book.sheet_names(), vec!["REQUEST_TABLE", "2015"]);
        assert_eq!(book.data_sheet_names("REQUEST_TABLE"), vec!["2015"]);
        assert_eq!(book.sheet("2015").map(Sheet::extent), Some(Extent::new(1, 1)));
    }
}
