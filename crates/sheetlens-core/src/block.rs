//! Rectangular blocks of loaded data

use crate::cell::Cell;
use serde::Serialize;

/// Headers plus row-major cells
///
/// Every row holds exactly `headers.len()` cells. Constructors pad short rows
/// with [`Cell::Null`] and cut long ones so the invariant can't be broken from
/// outside.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataBlock {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataBlock {
    /// Create an empty block with the given headers
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Create a block, fitting each row to the header width
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut block = Self::new(headers);
        block.rows.reserve(rows.len());
        for row in rows {
            block.push_row(row);
        }
        block
    }

    /// Append one row, fitted to the header width
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Null);
        self.rows.push(row);
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Copy of rows `start..end`, clamped to the block
    pub fn slice_rows(&self, start: usize, end: usize) -> DataBlock {
        let end = end.min(self.rows.len());
        let start = start.min(end);
        DataBlock {
            headers: self.headers.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Copy of the given columns in the given order; out-of-range indices are skipped
    pub fn select_columns(&self, indices: &[usize]) -> DataBlock {
        let indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.headers.len())
            .collect();
        DataBlock {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Append the rows of another block with the same column layout
    pub fn append(&mut self, other: DataBlock) {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }
        for row in other.rows {
            self.push_row(row);
        }
    }

    /// Apply `f` to every cell of one column
    pub fn map_column<F>(&mut self, index: usize, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(index) {
                *cell = f(cell);
            }
        }
    }
}
