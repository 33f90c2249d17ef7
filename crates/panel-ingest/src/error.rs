//! Error types for workbook ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering, reading or writing workbooks.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Workbook Errors ===
    /// The workbook container could not be opened.
    #[error("failed to open workbook {path}: {source}")]
    WorkbookOpen {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet '{sheet}' of {path}: {source}")]
    SheetRead {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to write workbook {path}: {source}")]
    WorkbookWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    // === Descriptor Errors ===
    /// The descriptor sheet is absent from the workbook.
    #[error("descriptor sheet '{sheet}' not found")]
    DescriptorMissing { sheet: String },

    /// A data sheet named by the descriptor is absent.
    #[error("sheet '{sheet}' not found")]
    SheetMissing { sheet: String },

    /// No descriptor row declares the requested year.
    #[error("descriptor has no entry for year {year}")]
    YearNotFound { year: i32 },

    /// A non-blank year cell that does not hold an integer.
    #[error("descriptor cell {cell} holds '{value}', which is not a year")]
    InvalidYear { cell: String, value: String },

    // === Reference Table Errors ===
    #[error("reference table not found: {path}")]
    ReferenceNotFound { path: PathBuf },

    #[error("reference table {path} has no column '{column}'")]
    ReferenceColumnMissing { path: PathBuf, column: String },

    #[error("reference table {path} is empty")]
    ReferenceEmpty { path: PathBuf },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
