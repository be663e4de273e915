//! Workbook-backed tabular source

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use log::debug;
use sheetlens_core::source::{header_names, load_window};
use sheetlens_core::{
    Cell, DataBlock, Error, FormulaCell, LoadRequest, NumberFormat, Result, SheetProbe,
    TabularSource,
};

use crate::error::{XlsxError, XlsxResult};

/// Convert a parsed workbook value to a cell
///
/// Date-time values become their serial number; the engine turns them back
/// into dates once the column is classified as date-like.
fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::Bool(b) => Cell::Bool(*b),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) => Cell::string(s.as_str()),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) => Cell::string(s.as_str()),
        Data::DurationIso(s) => Cell::string(s.as_str()),
        Data::Error(e) => Cell::string(format!("#ERROR: {e:?}")),
    }
}

/// Format implied by a parsed value
///
/// The parser reports date, time and duration cells alike as `DateTime`.
/// Durations and serials below one day carry no calendar part and map to
/// time formats, which are never treated as dates.
fn data_format(data: &Data) -> Option<NumberFormat> {
    match data {
        Data::Empty => None,
        Data::DateTime(dt) if dt.is_duration() => {
            Some(NumberFormat::from_id(NumberFormat::ID_DURATION))
        }
        Data::DateTime(dt) if dt.as_f64() < 1.0 => Some(NumberFormat::from_id(NumberFormat::ID_TIME)),
        Data::DateTime(dt) if dt.as_f64().fract() != 0.0 => {
            Some(NumberFormat::from_id(NumberFormat::ID_DATETIME))
        }
        Data::DateTime(_) => Some(NumberFormat::from_id(NumberFormat::ID_DATE_SHORT)),
        Data::DateTimeIso(_) => Some(NumberFormat::from_string("yyyy-mm-ddThh:mm:ss")),
        _ => Some(NumberFormat::General),
    }
}

/// Absolute extent of a parsed range: (first row, first column, rows, columns)
///
/// The parser trims leading empty rows and columns, so a range may start
/// anywhere. Extents here always count from A1.
fn extent(range: &Range<Data>) -> (u32, u32, u32, u32) {
    match range.start() {
        Some((r0, c0)) => {
            let (height, width) = range.get_size();
            (r0, c0, r0 + height as u32, c0 + width as u32)
        }
        None => (0, 0, 0, 0),
    }
}

/// Rows from A1 onward, padded so column indices are absolute
fn physical_rows(range: &Range<Data>) -> impl Iterator<Item = Result<Cow<'_, [Data]>>> {
    let (r0, c0, _, _) = extent(range);
    let empty: &[Data] = &[];
    let lead = std::iter::repeat(empty)
        .take(r0 as usize)
        .map(|row| Ok(Cow::Borrowed(row)));
    let body = range.rows().map(move |row| {
        if c0 == 0 {
            Ok(Cow::Borrowed(row))
        } else {
            let mut padded = vec![Data::Empty; c0 as usize];
            padded.extend_from_slice(row);
            Ok(Cow::Owned(padded))
        }
    });
    lead.chain(body)
}

/// A workbook file exposed as a tabular source
///
/// The parser has no row index, so any access parses the whole sheet. The
/// most recently parsed sheet is kept so repeated probes and loads of the
/// same sheet within one invocation parse it only once.
pub struct XlsxSource {
    path: PathBuf,
    size: u64,
    workbook: Sheets<BufReader<File>>,
    names: Vec<String>,
    cached: Option<(String, Range<Data>)>,
}

impl XlsxSource {
    /// Open a workbook
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        let workbook = open_workbook_auto(&path)?;
        let names = workbook.sheet_names().to_vec();
        debug!("opened workbook {:?}: {} sheet(s), {} bytes", path, names.len(), size);
        Ok(Self {
            path,
            size,
            workbook,
            names,
            cached: None,
        })
    }

    /// Path the workbook was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_sheet(&self, sheet: &str) -> Result<()> {
        if self.names.iter().any(|n| n == sheet) {
            Ok(())
        } else {
            Err(Error::SheetNotFound {
                name: sheet.to_string(),
                available: self.names.clone(),
            })
        }
    }

    fn range(&mut self, sheet: &str) -> Result<&Range<Data>> {
        self.check_sheet(sheet)?;

        let range = match self.cached.take() {
            Some((name, range)) if name == sheet => range,
            _ => {
                debug!("parsing sheet '{}' of {:?}", sheet, self.path);
                self.workbook
                    .worksheet_range(sheet)
                    .map_err(XlsxError::from)?
            }
        };
        Ok(&self.cached.insert((sheet.to_string(), range)).1)
    }
}

impl TabularSource for XlsxSource {
    fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn probe(&mut self, sheet: &str) -> Result<SheetProbe> {
        let range = self.range(sheet)?;
        let (_, _, total_rows, total_cols) = extent(range);
        let first: Vec<Cell> = (0..total_cols)
            .map(|c| range.get_value((0, c)).map(data_to_cell).unwrap_or(Cell::Null))
            .collect();
        Ok(SheetProbe {
            name: sheet.to_string(),
            total_rows,
            total_cols,
            headers: header_names(&first, total_cols),
        })
    }

    fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock> {
        let range = self.range(sheet)?;
        let (_, _, _, total_cols) = extent(range);
        load_window(physical_rows(range), total_cols, request, data_to_cell)
    }

    fn number_formats(&mut self, sheet: &str, row: u32) -> Result<Vec<Option<NumberFormat>>> {
        let range = self.range(sheet)?;
        let (_, _, total_rows, total_cols) = extent(range);
        if row == 0 || row > total_rows {
            return Ok(Vec::new());
        }
        Ok((0..total_cols)
            .map(|c| range.get_value((row - 1, c)).and_then(data_format))
            .collect())
    }

    /// Formulas are parsed separately from values and are not cached
    fn formulas(&mut self, sheet: &str) -> Result<Vec<FormulaCell>> {
        self.check_sheet(sheet)?;
        debug!("parsing formulas of '{}' in {:?}", sheet, self.path);
        let range = self
            .workbook
            .worksheet_formula(sheet)
            .map_err(XlsxError::from)?;
        let (r0, c0) = range.start().unwrap_or((0, 0));
        Ok(range
            .used_cells()
            .map(|(r, c, formula)| FormulaCell::new(r0 + r as u32, c0 + c as u32, formula.as_str()))
            .collect())
    }
}
