//! Validation of descriptor facts against file-name facts and sheet contents.

use std::fmt;

use panel_model::{DescriptorLayout, Extent, YearSpan, cell_reference};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request_table::{RequestTableIndex, YearEntry};

/// Series identifier a company's descriptor must declare (`FDEALL3`).
pub fn series_for_group(prefix: &str, group_index: u32) -> String {
    format!("{prefix}{group_index}")
}

/// Expected shape of a descriptor entry, or its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedShape(pub Option<Extent>);

impl fmt::Display for ExpectedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(extent) => write!(f, "{extent}"),
            None => f.write_str("no numeric row/column counters"),
        }
    }
}

/// A data sheet whose actual extent differs from its descriptor entry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("sheet '{sheet}' for {year}: expected {expected}, found {actual}")]
pub struct ShapeMismatch {
    pub sheet: String,
    pub year: i32,
    pub expected: ExpectedShape,
    pub actual: Extent,
}

/// Checks a sheet's trailing-blank-aware extent against its descriptor entry.
pub fn validate_shape(entry: &YearEntry, actual: Extent) -> Result<(), ShapeMismatch> {
    let expected = entry.expected_extent();
    if expected == Some(actual) {
        return Ok(());
    }
    Err(ShapeMismatch {
        sheet: entry.sheet_name.clone(),
        year: entry.year,
        expected: ExpectedShape(expected),
        actual,
    })
}

/// Disagreement between a descriptor and the file name that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DescriptorMismatch {
    #[error("descriptor {cell} declares series '{found}', expected '{expected}'")]
    SeriesMismatch {
        cell: String,
        found: String,
        expected: String,
    },
    #[error("descriptor {cell} declares year {found}, expected {expected}")]
    YearMismatch {
        cell: String,
        found: i32,
        expected: i32,
    },
    #[error("descriptor lists more years than the span {span} (from {cell})")]
    ExcessRows { cell: String, span: YearSpan },
    #[error("descriptor lists {found} years, span {span} requires {expected}")]
    ShortDescriptor {
        found: usize,
        expected: usize,
        span: YearSpan,
    },
}

impl DescriptorMismatch {
    /// A short descriptor stops the run; every other mismatch skips the file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ShortDescriptor { .. })
    }
}

/// Checks that the descriptor declares `expected_series` on every row and
/// lists exactly the years of `span`, strictly increasing and without gaps.
pub fn validate_descriptor(
    index: &RequestTableIndex,
    expected_series: &str,
    span: YearSpan,
) -> Result<(), DescriptorMismatch> {
    let layout = DescriptorLayout::STANDARD;
    let mut expected_years = span.years();

    for entry in index.entries() {
        if entry.series != expected_series {
            return Err(DescriptorMismatch::SeriesMismatch {
                cell: cell_reference(entry.row, layout.series_col),
                found: entry.series.clone(),
                expected: expected_series.to_string(),
            });
        }
        let Some(expected) = expected_years.next() else {
            return Err(DescriptorMismatch::ExcessRows {
                cell: cell_reference(entry.row, layout.year_col),
                span,
            });
        };
        if entry.year != expected {
            return Err(DescriptorMismatch::YearMismatch {
                cell: cell_reference(entry.row, layout.year_col),
                found: entry.year,
                expected,
            });
        }
    }

    if index.len() < span.year_count() {
        return Err(DescriptorMismatch::ShortDescriptor {
            found: index.len(),
            expected: span.year_count(),
            span,
        });
    }
    Ok(())
}
