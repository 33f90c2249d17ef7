//! Merge errors and their scope.

use std::path::PathBuf;

use panel_ingest::{DescriptorMismatch, IngestError, ShapeMismatch};
use panel_model::{ModelError, SpanConflict, YearSpan};
use thiserror::Error;

use crate::join::JoinError;

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorScope {
    /// Omit one unit (a file, a sheet, a descriptor row) and continue.
    Skip,
    /// Abandon the current key and remove its partial output.
    Key,
    /// Stop the run.
    Process,
}

#[derive(Debug, Error)]
pub enum MergeError {
    // === Input and output ===
    #[error("input directory not usable: {source}")]
    InputDirectory {
        #[source]
        source: IngestError,
    },

    #[error("failed to create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: {source}")]
    Workbook {
        file: PathBuf,
        #[source]
        source: IngestError,
    },

    #[error("reference table unavailable: {source}")]
    ReferenceTable {
        #[source]
        source: IngestError,
    },

    #[error("invalid year window: {source}")]
    Window {
        #[source]
        source: ModelError,
    },

    // === Templates and descriptors ===
    #[error("{key}: template {expected} not found")]
    MissingTemplate { key: String, expected: String },

    #[error("{key}: template {file}: {source}")]
    TemplateDescriptor {
        key: String,
        file: PathBuf,
        #[source]
        source: DescriptorMismatch,
    },

    #[error("{file}: {source}")]
    Descriptor {
        file: PathBuf,
        #[source]
        source: DescriptorMismatch,
    },

    #[error("{file}: {found} data sheets, span {span} requires at least {expected}")]
    TooFewSheets {
        file: PathBuf,
        found: usize,
        expected: usize,
        span: YearSpan,
    },

    #[error("{file}: descriptor year {year} lies outside the file span {span}")]
    YearOutsideSpan {
        file: PathBuf,
        year: i32,
        span: YearSpan,
    },

    // === Merge-time checks ===
    #[error("{key}: {file}: {source}")]
    Shape {
        key: String,
        file: PathBuf,
        #[source]
        source: ShapeMismatch,
    },

    #[error("{key}: {file}: descriptor has no entry for year {year}")]
    YearNotFound {
        key: String,
        file: PathBuf,
        year: i32,
    },

    #[error("{key}: {file}: sheet '{sheet}' for {year} not found")]
    SheetMissing {
        key: String,
        file: PathBuf,
        sheet: String,
        year: i32,
    },

    #[error("{key}: {file}: descriptor row for {year} has no numeric column counter")]
    CounterMissing {
        key: String,
        file: PathBuf,
        year: i32,
    },

    #[error("{key}: {file}: sheet '{sheet}': {source}")]
    Join {
        key: String,
        file: PathBuf,
        sheet: String,
        #[source]
        source: JoinError,
    },

    #[error("{entity}: {conflict}")]
    SpanConflict {
        entity: String,
        conflict: SpanConflict,
    },

    // === Year aggregation ===
    #[error("{entity}: no year of the window could be ingested")]
    NoYears { entity: String },

    #[error("{entity}: missing window years {missing:?} (present {present:?})")]
    MissingYears {
        entity: String,
        missing: Vec<i32>,
        present: Vec<i32>,
    },

    #[error("{entity}: year range has gaps at {gaps:?} (present {present:?})")]
    NonContiguousYears {
        entity: String,
        gaps: Vec<i32>,
        present: Vec<i32>,
    },

    // === Combined output ===
    #[error("{file}: {message}")]
    Frame { file: PathBuf, message: String },

    #[error("failed to write combined output {path}: {message}")]
    CombinedOutput { path: PathBuf, message: String },

    #[error("processed log {path}: {source}")]
    ProcessedLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub fn workbook(file: impl Into<PathBuf>) -> impl FnOnce(IngestError) -> MergeError {
        let file = file.into();
        move |source| MergeError::Workbook { file, source }
    }

    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Descriptor { source, .. } if source.is_fatal() => ErrorScope::Process,
            Self::TemplateDescriptor { source, .. } if source.is_fatal() => ErrorScope::Process,
            Self::Descriptor { .. }
            | Self::TooFewSheets { .. }
            | Self::YearOutsideSpan { .. }
            | Self::Frame { .. } => ErrorScope::Skip,
            Self::InputDirectory { .. }
            | Self::OutputDirectory { .. }
            | Self::ReferenceTable { .. }
            | Self::Window { .. }
            | Self::CombinedOutput { .. }
            | Self::ProcessedLog { .. } => ErrorScope::Process,
            Self::Workbook { .. }
            | Self::MissingTemplate { .. }
            | Self::TemplateDescriptor { .. }
            | Self::Shape { .. }
            | Self::YearNotFound { .. }
            | Self::SheetMissing { .. }
            | Self::CounterMissing { .. }
            | Self::Join { .. }
            | Self::SpanConflict { .. }
            | Self::NoYears { .. }
            | Self::MissingYears { .. }
            | Self::NonContiguousYears { .. } => ErrorScope::Key,
        }
    }

    pub fn is_process_fatal(&self) -> bool {
        self.scope() == ErrorScope::Process
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_descriptor_stops_the_run() {
        let span = YearSpan::new(2015, 2017).unwrap();
        let err = MergeError::Descriptor {
            file: PathBuf::from("US2-2015-2017A.xlsx"),
            source: DescriptorMismatch::ShortDescriptor {
                found: 2,
                expected: 3,
                span,
            },
        };
        assert_eq!(err.scope(), ErrorScope::Process);

        let err = MergeError::Descriptor {
            file: PathBuf::from("US3-2015A.xlsx"),
            source: DescriptorMismatch::SeriesMismatch {
                cell: "E7".to_string(),
                found: "FDEALL1".to_string(),
                expected: "FDEALL3".to_string(),
            },
        };
        assert_eq!(err.scope(), ErrorScope::Skip);
        assert_eq!(
            err.to_string(),
            "US3-2015A.xlsx: descriptor E7 declares series 'FDEALL1', expected 'FDEALL3'"
        );
    }

    #[test]
    fn merge_time_failures_abandon_the_key() {
        let err = MergeError::MissingTemplate {
            key: "US-2015A".to_string(),
            expected: "company 1".to_string(),
        };
        assert_eq!(err.scope(), ErrorScope::Key);
        assert_eq!(err.to_string(), "US-2015A: template company 1 not found");
    }
}
