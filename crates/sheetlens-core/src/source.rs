//! Tabular source capability
//!
//! The engine never parses files itself. A provider implements
//! [`TabularSource`] to expose sheet metadata and bounded loads, and the
//! engine drives everything else through that trait. [`MemorySource`] is the
//! in-memory provider used by tests and by callers that already hold data.

use crate::block::DataBlock;
use crate::cell::Cell;
use crate::column::index_to_letter;
use crate::error::{Error, Result};
use crate::number_format::NumberFormat;
use std::collections::{HashMap, HashSet};

/// Prefix given to header cells that are empty in row 1
pub const UNNAMED_PREFIX: &str = "__UNNAMED__";

/// Sheet metadata gathered without materializing cell data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetProbe {
    /// Sheet name
    pub name: String,
    /// Physical rows, counting row 1
    pub total_rows: u32,
    /// Columns in the widest row
    pub total_cols: u32,
    /// Row-1 header names, one per column
    pub headers: Vec<String>,
}

impl SheetProbe {
    /// Rows below the header row
    pub fn data_rows(&self) -> u32 {
        self.total_rows.saturating_sub(1)
    }
}

/// Bounds for a single load call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadRequest {
    /// Take header names from row 1; data then starts at row 2.
    /// Without a header, columns are named by their letters and data starts at row 1.
    pub header: bool,
    /// Data rows to skip before the first returned row
    pub skip_rows: usize,
    /// Maximum number of rows to return
    pub n_rows: Option<usize>,
    /// 0-based columns to return, in order; `None` for every column
    pub columns: Option<Vec<u32>>,
}

impl LoadRequest {
    /// Request with row 1 consumed as the header
    pub fn with_header() -> Self {
        Self {
            header: true,
            ..Default::default()
        }
    }

    /// Request that treats row 1 as data
    pub fn headerless() -> Self {
        Self::default()
    }

    /// Skip `n` data rows
    pub fn skip(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }

    /// Return at most `n` rows
    pub fn take(mut self, n: usize) -> Self {
        self.n_rows = Some(n);
        self
    }

    /// Restrict the load to the given columns
    pub fn columns(mut self, columns: Vec<u32>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// A cell holding a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaCell {
    /// 0-based row
    pub row: u32,
    /// 0-based column
    pub col: u32,
    /// Formula text including the leading `=`
    pub formula: String,
}

impl FormulaCell {
    pub fn new<S: Into<String>>(row: u32, col: u32, formula: S) -> Self {
        let formula = formula.into();
        let formula = if formula.starts_with('=') {
            formula
        } else {
            format!("={}", formula)
        };
        Self { row, col, formula }
    }
}

/// A provider of sheet metadata and bounded loads
pub trait TabularSource {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Size of the underlying data in bytes, used for strategy selection
    fn size_bytes(&self) -> u64;

    /// Metadata for one sheet
    fn probe(&mut self, sheet: &str) -> Result<SheetProbe>;

    /// Load a window of one sheet
    fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock>;

    /// Number formats of the cells in one row (1-based), indexed by column
    ///
    /// Sources without format information keep the default, and callers
    /// treat the error as "no date columns".
    fn number_formats(&mut self, _sheet: &str, _row: u32) -> Result<Vec<Option<NumberFormat>>> {
        Err(Error::Unsupported("number formats"))
    }

    /// Every formula cell of a sheet, in row-major order
    fn formulas(&mut self, _sheet: &str) -> Result<Vec<FormulaCell>> {
        Err(Error::Unsupported("formulas"))
    }
}

impl<T: TabularSource + ?Sized> TabularSource for Box<T> {
    fn sheet_names(&self) -> Vec<String> {
        (**self).sheet_names()
    }

    fn size_bytes(&self) -> u64 {
        (**self).size_bytes()
    }

    fn probe(&mut self, sheet: &str) -> Result<SheetProbe> {
        (**self).probe(sheet)
    }

    fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock> {
        (**self).load(sheet, request)
    }

    fn number_formats(&mut self, sheet: &str, row: u32) -> Result<Vec<Option<NumberFormat>>> {
        (**self).number_formats(sheet, row)
    }

    fn formulas(&mut self, sheet: &str) -> Result<Vec<FormulaCell>> {
        (**self).formulas(sheet)
    }
}

/// Text used when a cell serves as a column header
pub fn header_text(cell: &Cell) -> String {
    match cell {
        Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Build unique header names from a row-1 slice
///
/// Empty cells become `__UNNAMED__{column}`; repeated names get a `_{n}` suffix.
pub fn header_names(row: &[Cell], width: u32) -> Vec<String> {
    let mut seen = HashSet::new();
    (0..width as usize)
        .map(|col| {
            let base = row.get(col).map(header_text).unwrap_or_default();
            let base = if base.is_empty() {
                format!("{}{}", UNNAMED_PREFIX, col)
            } else {
                base
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Apply a [`LoadRequest`] to a stream of physical rows starting at row 1
///
/// Providers that can iterate their rows share this so every backend honors
/// the same header, skip, cap and column semantics. `width` is the sheet's
/// column count; requested columns beyond it are dropped.
pub fn load_window<I, R, T, F>(
    rows: I,
    width: u32,
    request: &LoadRequest,
    convert: F,
) -> Result<DataBlock>
where
    I: IntoIterator<Item = Result<R>>,
    R: AsRef<[T]>,
    F: Fn(&T) -> Cell,
{
    let columns: Vec<u32> = match &request.columns {
        Some(cols) => cols.iter().copied().filter(|&c| c < width).collect(),
        None => (0..width).collect(),
    };

    let mut rows = rows.into_iter();
    let headers = if request.header {
        let first: Vec<Cell> = match rows.next() {
            Some(row) => row?.as_ref().iter().map(&convert).collect(),
            None => Vec::new(),
        };
        let all = header_names(&first, width);
        columns.iter().map(|&c| all[c as usize].clone()).collect()
    } else {
        columns.iter().map(|&c| index_to_letter(c)).collect()
    };

    let mut block = DataBlock::new(headers);
    if request.n_rows == Some(0) {
        return Ok(block);
    }

    for (i, row) in rows.enumerate() {
        let row = row?;
        if i < request.skip_rows {
            continue;
        }
        let raw = row.as_ref();
        block.push_row(
            columns
                .iter()
                .map(|&c| raw.get(c as usize).map(&convert).unwrap_or(Cell::Null))
                .collect(),
        );
        if request.n_rows.map_or(false, |n| block.height() >= n) {
            break;
        }
    }

    Ok(block)
}

#[derive(Debug, Clone, Default)]
struct MemorySheet {
    rows: Vec<Vec<Cell>>,
    formats: HashMap<u32, Vec<Option<NumberFormat>>>,
    formulas: Vec<FormulaCell>,
}

impl MemorySheet {
    fn width(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }
}

/// In-memory [`TabularSource`]
///
/// Rows are given exactly as they appear in the sheet, row 1 first.
///
/// ```
/// use sheetlens_core::{Cell, LoadRequest, MemorySource, TabularSource};
///
/// let mut source = MemorySource::new().with_sheet(
///     "Data",
///     vec![
///         vec![Cell::from("Name"), Cell::from("Score")],
///         vec![Cell::from("Alice"), Cell::from(90)],
///     ],
/// );
/// let block = source.load("Data", &LoadRequest::with_header()).unwrap();
/// assert_eq!(block.headers, vec!["Name", "Score"]);
/// assert_eq!(block.height(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    order: Vec<String>,
    sheets: HashMap<String, MemorySheet>,
    size_bytes: Option<u64>,
    load_count: usize,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, replacing any sheet with the same name
    pub fn with_sheet<S: Into<String>>(mut self, name: S, rows: Vec<Vec<Cell>>) -> Self {
        let name = name.into();
        if !self.sheets.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sheets.insert(
            name,
            MemorySheet {
                rows,
                ..Default::default()
            },
        );
        self
    }

    /// Attach number formats to one row of a sheet
    pub fn with_formats(mut self, sheet: &str, row: u32, formats: Vec<Option<NumberFormat>>) -> Self {
        if let Some(s) = self.sheets.get_mut(sheet) {
            s.formats.insert(row, formats);
        }
        self
    }

    /// Attach formulas to a sheet; cached values stay in the rows
    pub fn with_formulas(mut self, sheet: &str, mut formulas: Vec<FormulaCell>) -> Self {
        if let Some(s) = self.sheets.get_mut(sheet) {
            formulas.sort_by_key(|f| (f.row, f.col));
            s.formulas = formulas;
        }
        self
    }

    /// Report a fixed size instead of the estimated one
    pub fn with_size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    /// Number of `load` calls served so far
    pub fn load_count(&self) -> usize {
        self.load_count
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet> {
        self.sheets.get(name).ok_or_else(|| Error::SheetNotFound {
            name: name.to_string(),
            available: self.order.clone(),
        })
    }
}

impl TabularSource for MemorySource {
    fn sheet_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn size_bytes(&self) -> u64 {
        self.size_bytes.unwrap_or_else(|| {
            self.sheets
                .values()
                .flat_map(|s| s.rows.iter())
                .map(|r| r.len() as u64 * 8)
                .sum()
        })
    }

    fn probe(&mut self, sheet: &str) -> Result<SheetProbe> {
        let s = self.sheet(sheet)?;
        let width = s.width();
        let first = s.rows.first().map(Vec::as_slice).unwrap_or(&[]);
        Ok(SheetProbe {
            name: sheet.to_string(),
            total_rows: s.rows.len() as u32,
            total_cols: width,
            headers: header_names(first, width),
        })
    }

    fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock> {
        self.load_count += 1;
        let s = self.sheet(sheet)?;
        load_window(s.rows.iter().map(Ok), s.width(), request, Cell::clone)
    }

    fn number_formats(&mut self, sheet: &str, row: u32) -> Result<Vec<Option<NumberFormat>>> {
        Ok(self.sheet(sheet)?.formats.get(&row).cloned().unwrap_or_default())
    }

    fn formulas(&mut self, sheet: &str) -> Result<Vec<FormulaCell>> {
        Ok(self.sheet(sheet)?.formulas.clone())
    }
}
