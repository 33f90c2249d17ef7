//! Panel workbook ingestion.
//!
//! This crate provides everything the merge stages need before they touch
//! data: locating workbooks, decoding file names, reading and writing
//! workbooks, indexing the embedded descriptor sheet and validating that
//! descriptor against file names and sheet contents.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use panel_ingest::{RequestTableIndex, list_workbook_files, parse_company_file, read_workbook};
//!
//! for path in list_workbook_files(Path::new("data-split-by-entity"))? {
//!     let Some(source) = parse_company_file(&path) else { continue };
//!     let workbook = read_workbook(&path)?;
//!     let index = RequestTableIndex::build(&workbook, "REQUEST_TABLE")?;
//! }
//! ```

mod discovery;
mod error;
mod filename;
mod reference;
mod request_table;
mod shape;
mod xlsx;

// === Error Types ===
pub use error::{IngestError, Result};

// === File Discovery ===
pub use discovery::{is_lock_file, is_workbook, list_workbook_files};

// === File Name Grammar ===
pub use filename::{
    build_output_name, group_key, parse_company_file, parse_source_name, parse_span_file,
    parse_variable_file,
};

// === Descriptor Index ===
pub use request_table::{RequestTableIndex, YearEntry, extract_sheet_name, write_counters};

// === Shape Validation ===
pub use shape::{
    DescriptorMismatch, ExpectedShape, ShapeMismatch, series_for_group, validate_descriptor,
    validate_shape,
};

// === Reference Table ===
pub use reference::{EntityCodes, ReferenceTable, display_name};

// === Workbook I/O ===
pub use xlsx::{read_first_sheet, read_workbook, remove_output, write_workbook};
