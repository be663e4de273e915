//! # sheetlens-core
//!
//! Core types for the sheetlens range engine.
//!
//! This crate provides the building blocks shared by the engine and the
//! source providers:
//! - [`column`] - Column letter codec (`A` <-> 0)
//! - [`CellAddress`], [`RangeSpec`] and [`MultiRangeSpec`] - Range addressing
//! - [`Cell`] and [`DataBlock`] - Typed values and rectangular results
//! - [`dates`] - Serial date detection and conversion
//! - [`TabularSource`] - The capability every data provider implements
//!
//! ## Example
//!
//! ```rust
//! use sheetlens_core::{MultiRangeSpec, RangeSpec};
//!
//! let spec = RangeSpec::parse("Sheet1!A1:C10").unwrap();
//! let bounds = spec.bounds();
//! assert_eq!((bounds.start_col, bounds.end_col), (0, 2));
//!
//! let list = MultiRangeSpec::parse("Sheet1!A1:B2,D4").unwrap();
//! assert_eq!(list.as_slice()[1].sheet.as_deref(), Some("Sheet1"));
//! ```

pub mod block;
pub mod cell;
pub mod column;
pub mod dates;
pub mod error;
pub mod number_format;
pub mod range;
pub mod source;

// Re-exports for convenience
pub use block::DataBlock;
pub use cell::{Cell, CellAddress};
pub use error::{Error, ErrorReport, Result};
pub use number_format::NumberFormat;
pub use range::{normalize_shell_ref, MultiRangeSpec, RangeBounds, RangeSpec};
pub use source::{FormulaCell, LoadRequest, MemorySource, SheetProbe, TabularSource, UNNAMED_PREFIX};
