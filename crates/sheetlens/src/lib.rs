//! # sheetlens
//!
//! Range addressing, bounded reads, profiling and search over large
//! spreadsheets.
//!
//! The engine never parses files itself; it drives a
//! [`TabularSource`](sheetlens_core::TabularSource) chosen by [`open`] from
//! the file extension. Everything happens inside a [`Session`], which owns the
//! source and the per-invocation caches.
//!
//! ## Features
//!
//! - Spreadsheet-style addressing: `A1`, `Sheet1!A1:C10`, `2022!H54:AT54,H149:AT149`
//! - Range, multi-range and whole-sheet reads with bounded memory
//! - Date serial detection and ISO conversion
//! - Compact, sparse output with explicit truncation metadata
//! - Literal and regex search scoped by sheet, range or column
//! - Formula listing and formula-text search for workbook sources
//!
//! ## Example
//!
//! ```rust
//! use sheetlens::prelude::*;
//!
//! let source = MemorySource::new().with_sheet(
//!     "Sales",
//!     vec![
//!         vec![Cell::from("Region"), Cell::from("Total")],
//!         vec![Cell::from("North"), Cell::from(120.5)],
//!     ],
//! );
//! let mut session = Session::new(source);
//!
//! let spec = RangeSpec::parse("Sales!A1:B2").unwrap();
//! let read = RangeReader::new(&mut session).read_range(None, &spec).unwrap();
//! assert_eq!(read.block.rows[1][0], Cell::from("North"));
//!
//! let found = SearchEngine::new(&mut session)
//!     .search("North", &SearchOptions::new())
//!     .unwrap();
//! assert_eq!(found.matches[0].cell, "A2");
//! ```

pub mod chunked;
pub mod config;
pub mod formulas;
pub mod prelude;
pub mod profile;
pub mod reader;
pub mod rows;
pub mod search;
pub mod session;
pub mod shape;

pub use chunked::{ChunkedLoader, LoadStrategy};
pub use config::EngineConfig;
pub use formulas::{FormulaEntry, FormulaRead, FormulaReader};
pub use profile::{ColumnProfile, ProfileOptions, ProfileReport, Profiler, SheetProfile};
pub use reader::{RangeRead, RangeReader, ReadOptions, SheetWindow};
pub use rows::RowMapping;
pub use search::{MatchMode, SearchEngine, SearchMatch, SearchOptions, SearchResult};
pub use session::{Session, SheetHandle};

// Re-export core types
pub use sheetlens_core::{
    normalize_shell_ref, Cell, CellAddress, DataBlock, Error, ErrorReport, FormulaCell, LoadRequest,
    MemorySource, MultiRangeSpec, NumberFormat, RangeSpec, Result, SheetProbe, TabularSource,
};

#[cfg(feature = "csv")]
pub use sheetlens_csv::{CsvError, CsvReadOptions, CsvSource, CsvWriteOptions, CsvWriter};
#[cfg(feature = "xlsx")]
pub use sheetlens_xlsx::{XlsxError, XlsxSource};

use std::path::Path;

/// Open a file as a tabular source, choosing the provider by extension
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn TabularSource>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        #[cfg(feature = "csv")]
        Some("csv") => Ok(Box::new(CsvSource::open(path)?)),
        #[cfg(feature = "xlsx")]
        Some(ext) if sheetlens_xlsx::EXTENSIONS.contains(&ext) => {
            Ok(Box::new(XlsxSource::open(path)?))
        }
        _ => Err(Error::UnsupportedFormat(path.display().to_string())),
    }
}

/// Open a file and wrap it in a session
pub fn open_session<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Session> {
    Ok(Session::with_config(open(path)?, config))
}
