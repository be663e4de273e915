//! Formula-aware reads
//!
//! Lists cells one by one with their cached value and, where the cell holds
//! one, the formula text. Values come from a normal headerless load, formulas
//! from [`TabularSource::formulas`].

use std::collections::HashMap;

use serde::Serialize;
use sheetlens_core::column::index_to_letter;
use sheetlens_core::{Cell, LoadRequest, RangeBounds, RangeSpec, Result, TabularSource};
use tracing::debug;

use crate::chunked::ChunkedLoader;
use crate::reader::SheetWindow;
use crate::session::Session;
use crate::shape;

/// Cells returned per requested row
pub const CELLS_PER_ROW: usize = 20;

/// One cell of a formula read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaEntry {
    /// Cell reference, e.g. `C5`
    pub cell: String,
    /// Cached value; null when the workbook was saved without results
    pub value: Cell,
    /// Formula text, `None` for plain values
    pub formula: Option<String>,
}

/// Result of a formula read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaRead {
    pub sheet: String,
    /// Range as requested, or the sheet name for whole-sheet reads
    pub range: String,
    pub cells: Vec<FormulaEntry>,
    /// Cells found before capping
    pub cell_count: usize,
    pub truncated: bool,
}

/// Reads cells together with their formulas
pub struct FormulaReader<'a, S> {
    session: &'a mut Session<S>,
    loader: ChunkedLoader,
    compact: bool,
    precision: Option<u32>,
}

impl<'a, S: TabularSource> FormulaReader<'a, S> {
    pub fn new(session: &'a mut Session<S>) -> Self {
        let loader = ChunkedLoader::from_config(session.config());
        Self {
            session,
            loader,
            compact: true,
            precision: None,
        }
    }

    /// Keep cells with neither value nor formula
    pub fn keep_blank(mut self) -> Self {
        self.compact = false;
        self
    }

    /// Round float values to `digits` decimals
    pub fn precision(mut self, digits: Option<u32>) -> Self {
        self.precision = digits;
        self
    }

    /// Read a range, or a window of rows when `spec` is `None`
    ///
    /// At most `window.limit * CELLS_PER_ROW` cells are returned; the window's
    /// offset only applies to whole-sheet reads.
    pub fn read(
        &mut self,
        sheet: Option<&str>,
        spec: Option<&RangeSpec>,
        window: SheetWindow,
    ) -> Result<FormulaRead> {
        let name = self
            .session
            .resolve_sheet(spec.and_then(|s| s.sheet.as_deref()).or(sheet))?;
        let handle = self.session.handle(&name)?.clone();
        let limit = window.limit.min(self.session.config().max_read_rows);

        let requested = match spec {
            Some(spec) => spec.bounds(),
            None => RangeBounds {
                start_col: 0,
                start_row: window.offset as u32 + 1,
                end_col: handle.total_cols.saturating_sub(1),
                end_row: (window.offset + limit) as u32,
            },
        };
        let end_row = requested.end_row.min(handle.total_rows);
        let columns: Vec<u32> = (requested.start_col..=requested.end_col)
            .filter(|&c| c < handle.total_cols)
            .collect();
        let height = end_row.saturating_sub(requested.start_row.saturating_sub(1));
        self.session
            .config()
            .check_memory(height as u64, columns.len() as u64)?;

        let request = LoadRequest::headerless()
            .skip(requested.start_row.saturating_sub(1) as usize)
            .take(height as usize)
            .columns(columns.clone());
        let mut block = self.loader.load(self.session.source_mut(), &name, &request)?;
        self.session.convert_dates(&name, &mut block, &columns);

        let mut formulas: HashMap<(u32, u32), String> = self
            .session
            .source_mut()
            .formulas(&name)?
            .into_iter()
            .filter(|f| f.row + 1 >= requested.start_row && f.row < end_row)
            .map(|f| ((f.row, f.col), f.formula))
            .collect();
        debug!(sheet = %name, formulas = formulas.len(), "formula read");

        let mut cells = Vec::new();
        for (i, row) in block.rows.into_iter().enumerate() {
            let sheet_row = requested.start_row + i as u32;
            for (value, &col) in row.into_iter().zip(&columns) {
                let formula = formulas.remove(&(sheet_row - 1, col));
                if self.compact && value.is_null() && formula.is_none() {
                    continue;
                }
                let value = match self.precision {
                    Some(digits) => value.rounded(digits),
                    None => value,
                };
                cells.push(FormulaEntry {
                    cell: format!("{}{}", index_to_letter(col), sheet_row),
                    value,
                    formula,
                });
            }
        }

        let capped = shape::cap_list(cells, limit.saturating_mul(CELLS_PER_ROW));
        Ok(FormulaRead {
            sheet: name.clone(),
            range: spec.map_or(name, RangeSpec::cells_ref),
            cells: capped.items,
            cell_count: capped.total,
            truncated: capped.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetlens_core::{FormulaCell, MemorySource};

    fn source() -> MemorySource {
        MemorySource::new()
            .with_sheet(
                "Calc",
                vec![
                    vec![Cell::from("Qty"), Cell::from("Price"), Cell::from("Total")],
                    vec![Cell::from(2), Cell::Float(1.255), Cell::Float(2.51)],
                    vec![Cell::from(3), Cell::Float(2.0), Cell::Null],
                ],
            )
            .with_formulas(
                "Calc",
                vec![FormulaCell::new(1, 2, "A2*B2"), FormulaCell::new(2, 2, "A3*B3")],
            )
    }

    fn window(limit: usize) -> SheetWindow {
        SheetWindow {
            offset: 0,
            limit,
            no_header: true,
        }
    }

    #[test]
    fn test_range_lists_values_and_formulas() {
        let mut session = Session::new(source());
        let spec = RangeSpec::parse("B2:C3").unwrap();
        let read = FormulaReader::new(&mut session)
            .read(None, Some(&spec), window(100))
            .unwrap();

        assert_eq!(read.range, "B2:C3");
        let cells: Vec<&str> = read.cells.iter().map(|c| c.cell.as_str()).collect();
        assert_eq!(cells, vec!["B2", "C2", "B3", "C3"]);
        assert_eq!(read.cells[1].formula.as_deref(), Some("=A2*B2"));
        assert_eq!(read.cells[1].value, Cell::Float(2.51));
        assert_eq!(read.cells[0].formula, None);
        // Uncached formula results still list the formula
        assert_eq!(read.cells[3].value, Cell::Null);
        assert_eq!(read.cells[3].formula.as_deref(), Some("=A3*B3"));
        assert!(!read.truncated);
    }

    #[test]
    fn test_whole_sheet_window_and_precision() {
        let mut session = Session::new(source());
        let read = FormulaReader::new(&mut session)
            .precision(Some(1))
            .read(Some("Calc"), None, window(3))
            .unwrap();
        assert_eq!(read.range, "Calc");
        assert_eq!(read.cell_count, 9);
        assert_eq!(read.cells[4].value, Cell::Float(1.3));
        assert!(!read.truncated);

        let second = FormulaReader::new(&mut session)
            .read(Some("Calc"), None, SheetWindow { offset: 1, ..window(1) })
            .unwrap();
        assert_eq!(second.cell_count, 3);
        assert_eq!(second.cells[0].cell, "A2");
    }

    #[test]
    fn test_cell_cap_per_row() {
        let row: Vec<Cell> = (0..25).map(Cell::from).collect();
        let mut session = Session::new(MemorySource::new().with_sheet("Wide", vec![row]));
        let read = FormulaReader::new(&mut session)
            .read(None, None, window(1))
            .unwrap();
        assert_eq!(read.cells.len(), CELLS_PER_ROW);
        assert_eq!(read.cell_count, 25);
        assert!(read.truncated);
    }

    #[test]
    fn test_keep_blank_cells() {
        let mut session = Session::new(MemorySource::new().with_sheet(
            "S",
            vec![vec![Cell::from("x"), Cell::Null]],
        ));
        let spec = RangeSpec::parse("A1:B1").unwrap();
        let compact = FormulaReader::new(&mut session)
            .read(None, Some(&spec), window(10))
            .unwrap();
        assert_eq!(compact.cells.len(), 1);

        let full = FormulaReader::new(&mut session)
            .keep_blank()
            .read(None, Some(&spec), window(10))
            .unwrap();
        assert_eq!(full.cells.len(), 2);
    }

    #[test]
    fn test_unknown_sheet() {
        let mut session = Session::new(source());
        let err = FormulaReader::new(&mut session)
            .read(Some("Nope"), None, window(10))
            .unwrap_err();
        assert_eq!(err.code(), "SHEET_NOT_FOUND");
    }
}
