//! Fixed workbook layout: descriptor columns and master table headers.

/// Name of the descriptor sheet embedded in every source workbook.
pub const REQUEST_SHEET: &str = "REQUEST_TABLE";

/// Name of the single sheet of a per-entity master table.
pub const MASTER_SHEET: &str = "MASTER_TABLE";

pub const YEAR_COLUMN: &str = "YEAR";
pub const COUNTRY_COLUMN: &str = "COUNTRY";
pub const COUNTRY_CODE_COLUMN: &str = "COUNTRY_CODE";
pub const COUNTRY_CODE2_COLUMN: &str = "COUNTRY_CODE2";

/// Headers inserted in front of every master table row, in order.
pub const MASTER_PREFIX_COLUMNS: [&str; 4] = [
    YEAR_COLUMN,
    COUNTRY_COLUMN,
    COUNTRY_CODE_COLUMN,
    COUNTRY_CODE2_COLUMN,
];

/// Positions of the descriptor fields, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLayout {
    /// First descriptor data row (spreadsheet row 7).
    pub first_row: usize,
    /// Series identifier (column E).
    pub series_col: usize,
    /// Year (column G).
    pub year_col: usize,
    /// Sheet reference such as `'2015'!$A$1` (column K).
    pub reference_col: usize,
    /// Expected rows, header included (column N).
    pub rows_col: usize,
    /// Expected columns, key column included (column O).
    pub cols_col: usize,
}

impl DescriptorLayout {
    pub const STANDARD: DescriptorLayout = DescriptorLayout {
        first_row: 6,
        series_col: 4,
        year_col: 6,
        reference_col: 10,
        rows_col: 13,
        cols_col: 14,
    };
}

impl Default for DescriptorLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Converts a 0-based column index to its spreadsheet letter (0 -> A, 26 -> AA).
pub fn column_letter(index: usize) -> String {
    let mut result = String::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Formats a 0-based cell position as an `A1` reference.
pub fn cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(4), "E");
        assert_eq!(column_letter(14), "O");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
    }

    #[test]
    fn standard_layout_points_at_descriptor_columns() {
        let layout = DescriptorLayout::STANDARD;
        assert_eq!(cell_reference(layout.first_row, layout.year_col), "G7");
        assert_eq!(column_letter(layout.reference_col), "K");
        assert_eq!(column_letter(layout.rows_col), "N");
    }
}
