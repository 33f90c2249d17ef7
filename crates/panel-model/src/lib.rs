//! Core types for the panel workbook pipeline.
//!
//! Cells, sheets and workbooks held in memory, year spans and the source
//! files they are decoded from, pipeline options and the per-stage reports
//! every stage returns.

pub mod cell;
pub mod error;
pub mod layout;
pub mod options;
pub mod report;
pub mod sheet;
pub mod source;
pub mod span;

pub use cell::{CellValue, format_numeric};
pub use error::{ModelError, Result};
pub use layout::{
    COUNTRY_CODE_COLUMN, COUNTRY_CODE2_COLUMN, COUNTRY_COLUMN, DescriptorLayout,
    MASTER_PREFIX_COLUMNS, MASTER_SHEET, REQUEST_SHEET, YEAR_COLUMN, cell_reference,
    column_letter,
};
pub use options::{ExistingOutputPolicy, PipelineOptions, ReferenceColumns, StageDirs};
pub use report::{KeyOutcome, KeyStatus, MissingGroups, StageReport};
pub use sheet::{Extent, Sheet, Workbook};
pub use source::{SourceFile, VariableTag, parse_tags};
pub use span::{SpanConflict, YearSpan, partition_spans};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_report_counts() {
        let mut report = StageReport::new("entities");
        report.push(KeyOutcome::written("US-2015A", "out/US-2015A.xlsx".into()));
        report.push(KeyOutcome::skipped("US-2016A", "output exists"));
        report.push(KeyOutcome::failed("FR-2015A", "missing template"));
        assert_eq!(report.written_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.has_failures());
    }

    #[test]
    fn report_serializes() {
        let mut report = StageReport::new("years");
        report.push(KeyOutcome::written("Denmark", "Denmark-2015-2024.xlsx".into()));
        let json = serde_json::to_string(&report).expect("serialize report");
        assert!(json.contains("\"status\":\"written\""));
        let round: StageReport = serde_json::from_str(&json).expect("deserialize report");
        assert_eq!(round, report);
    }
}
