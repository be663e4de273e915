//! Cell address type

use crate::column::{index_to_letter, letter_to_index};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Longest column part accepted in range text (`A` through `ZZZ`)
pub const MAX_COLUMN_LETTERS: usize = 3;

/// A single cell location (e.g., "A1")
///
/// Unlike the A1 text, the column is 0-based while the row keeps its
/// 1-based spreadsheet number. A row of zero never exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Column index (0-based, A=0, B=1, ...)
    pub column: u32,
    /// Row number (1-based, as displayed)
    pub row: u32,
}

impl CellAddress {
    /// Create a new cell address
    ///
    /// # Panics
    /// Panics if `row` is zero.
    pub fn new(column: u32, row: u32) -> Self {
        assert!(row >= 1, "row numbers start at 1");
        Self { column, row }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// Accepts one to three column letters (any case) followed by a row
    /// number of at least 1.
    ///
    /// # Examples
    /// ```
    /// use sheetlens_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("c10").unwrap();
    /// assert_eq!(addr.column, 2);
    /// assert_eq!(addr.row, 10);
    /// assert_eq!(addr.to_string(), "C10");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }

        if pos == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        if pos > MAX_COLUMN_LETTERS {
            return Err(Error::InvalidAddress(format!(
                "too many column letters in '{}'",
                s
            )));
        }

        let row_str = &s[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        let column = letter_to_index(&s[..pos])?;
        Ok(Self { column, row })
    }

    /// Column letters of this address
    pub fn column_letters(&self) -> String {
        index_to_letter(self.column)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", self.column_letters(), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("A1").unwrap();
        assert_eq!(addr.column, 0);
        assert_eq!(addr.row, 1);

        let addr = CellAddress::parse("ab12").unwrap();
        assert_eq!(addr.column, 27);
        assert_eq!(addr.row, 12);

        let addr = CellAddress::parse("ZZZ999").unwrap();
        assert_eq!(addr.column, 18277);
        assert_eq!(addr.row, 999);

        let addr = CellAddress::parse("  H54 ").unwrap();
        assert_eq!(addr.to_string(), "H54");
    }

    #[test]
    fn test_cell_address_parse_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("1").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("AAAA1").is_err());
        assert!(CellAddress::parse("A1B").is_err());
        assert!(CellAddress::parse("$A$1").is_err());
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(CellAddress::new(0, 1).to_string(), "A1");
        assert_eq!(CellAddress::new(2, 100).to_string(), "C100");
        assert_eq!(CellAddress::new(45, 54).to_string(), "AT54");
    }

    #[test]
    #[should_panic]
    fn test_row_zero_rejected() {
        CellAddress::new(0, 0);
    }
}
