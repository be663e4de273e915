//! # sheetlens-xlsx
//!
//! Workbook source for sheetlens.
//!
//! Format parsing is delegated to `calamine`, which handles `.xlsx`, `.xlsm`,
//! `.xlsb`, `.xls` and `.ods`. This crate adapts its sheets to the
//! [`TabularSource`](sheetlens_core::TabularSource) capability.

pub mod error;
mod source;

pub use error::{XlsxError, XlsxResult};
pub use source::XlsxSource;

/// File extensions this crate can open
pub const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
