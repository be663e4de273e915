//! # sheetlens-csv
//!
//! CSV source and writer for sheetlens.
//!
//! A CSV file is exposed as a workbook with a single sheet. Values are typed
//! per cell: integers, floats, and `true`/`false` are recognized, everything
//! else stays text.

mod error;
mod options;
mod reader;
mod source;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, CsvWriteOptions, LineTerminator};
pub use reader::CsvReader;
pub use source::CsvSource;
pub use writer::CsvWriter;
