//! Spreadsheet file I/O.

mod reader;
mod writer;

pub use reader::{read_first_sheet, read_workbook};
pub use writer::{remove_output, write_workbook};
