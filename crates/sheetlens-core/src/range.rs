//! Range addressing
//!
//! Parses `A1`, `A1:C10`, `Sheet1!A1:C10` and comma separated lists of those
//! into [`RangeSpec`] values. In a list, an entry without a sheet prefix
//! inherits the sheet named most recently before it.

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Replace shell-escaped sheet separators (`\!`) with a plain `!`
///
/// Some shells require escaping `!` inside double quotes, and the backslash
/// survives into the argument.
pub fn normalize_shell_ref(text: &str) -> String {
    text.replace("\\!", "!")
}

/// A parsed range reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeSpec {
    /// Sheet named by a `Sheet!` prefix, if any
    pub sheet: Option<String>,
    /// First cell as written
    pub start: CellAddress,
    /// Last cell as written; `None` for a single cell
    pub end: Option<CellAddress>,
}

/// Normalized rectangle covered by a [`RangeSpec`]
///
/// Columns are 0-based, rows are 1-based spreadsheet rows, all inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl RangeBounds {
    /// Number of columns covered
    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    /// Number of rows covered
    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }
}

impl RangeSpec {
    /// Parse a single range reference
    ///
    /// # Examples
    /// ```
    /// use sheetlens_core::RangeSpec;
    ///
    /// let spec = RangeSpec::parse("Sheet1!a1:c10").unwrap();
    /// assert_eq!(spec.sheet.as_deref(), Some("Sheet1"));
    /// assert_eq!(spec.to_string(), "Sheet1!A1:C10");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = normalize_shell_ref(text);
        let trimmed = normalized.trim();
        let invalid = || Error::RangeInvalid(text.trim().to_string());

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (sheet, cells) = match trimmed.rfind('!') {
            Some(pos) => {
                let name = unquote_sheet(trimmed[..pos].trim());
                if name.is_empty() {
                    return Err(invalid());
                }
                (Some(name), &trimmed[pos + 1..])
            }
            None => (None, trimmed),
        };

        let mut parts = cells.splitn(2, ':');
        let start = parts
            .next()
            .ok_or_else(invalid)
            .and_then(|s| CellAddress::parse(s).map_err(|_| invalid()))?;
        let end = match parts.next() {
            Some(s) => Some(CellAddress::parse(s).map_err(|_| invalid())?),
            None => None,
        };

        Ok(Self { sheet, start, end })
    }

    /// Rectangle covered by this spec, with reversed corners normalized
    pub fn bounds(&self) -> RangeBounds {
        let end = self.end.unwrap_or(self.start);
        RangeBounds {
            start_col: self.start.column.min(end.column),
            start_row: self.start.row.min(end.row),
            end_col: self.start.column.max(end.column),
            end_row: self.start.row.max(end.row),
        }
    }

    /// The cell part of the reference without the sheet prefix
    pub fn cells_ref(&self) -> String {
        match self.end {
            Some(end) => format!("{}:{}", self.start, end),
            None => self.start.to_string(),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", sheet)?;
        }
        write!(f, "{}", self.cells_ref())
    }
}

impl FromStr for RangeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `'My Sheet'` -> `My Sheet`, with doubled quotes collapsed
fn unquote_sheet(name: &str) -> String {
    if name.len() >= 2 && name.starts_with('\'') && name.ends_with('\'') {
        name[1..name.len() - 1].replace("''", "'")
    } else {
        name.to_string()
    }
}

/// An ordered list of ranges parsed from comma separated text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiRangeSpec(Vec<RangeSpec>);

impl MultiRangeSpec {
    /// Parse a comma separated range list with sheet-context carry-forward
    ///
    /// ```
    /// use sheetlens_core::MultiRangeSpec;
    ///
    /// let specs = MultiRangeSpec::parse("2022!H54:AT54,H149:AT149").unwrap();
    /// assert!(specs.iter().all(|s| s.sheet.as_deref() == Some("2022")));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = normalize_shell_ref(text);
        let mut specs = Vec::new();
        let mut sheet_context: Option<String> = None;

        for token in normalized.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let spec = if token.contains('!') {
                let spec = RangeSpec::parse(token)?;
                sheet_context = spec.sheet.clone();
                spec
            } else {
                let mut spec = RangeSpec::parse(token)?;
                spec.sheet = sheet_context.clone();
                spec
            };
            specs.push(spec);
        }

        if specs.is_empty() {
            return Err(Error::RangeInvalid(text.trim().to_string()));
        }
        Ok(Self(specs))
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the list holds no ranges
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the ranges in input order
    pub fn iter(&self) -> std::slice::Iter<'_, RangeSpec> {
        self.0.iter()
    }

    /// Borrow the ranges as a slice
    pub fn as_slice(&self) -> &[RangeSpec] {
        &self.0
    }

    /// Take the ranges out
    pub fn into_vec(self) -> Vec<RangeSpec> {
        self.0
    }
}

impl From<Vec<RangeSpec>> for MultiRangeSpec {
    fn from(specs: Vec<RangeSpec>) -> Self {
        Self(specs)
    }
}

impl IntoIterator for MultiRangeSpec {
    type Item = RangeSpec;
    type IntoIter = std::vec::IntoIter<RangeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiRangeSpec {
    type Item = &'a RangeSpec;
    type IntoIter = std::slice::Iter<'a, RangeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_parse_sheet_range() {
        let spec = RangeSpec::parse("Sheet1!A1:C10").unwrap();
        assert_eq!(
            spec,
            RangeSpec {
                sheet: Some("Sheet1".into()),
                start: addr("A1"),
                end: Some(addr("C10")),
            }
        );
    }

    #[test]
    fn test_parse_single_cell() {
        let spec = RangeSpec::parse("A1").unwrap();
        assert_eq!(spec.sheet, None);
        assert_eq!(spec.start, addr("A1"));
        assert_eq!(spec.end, None);
    }

    #[test]
    fn test_parse_trims_and_uppercases() {
        let spec = RangeSpec::parse("   data!b2:d5  ").unwrap();
        assert_eq!(spec.to_string(), "data!B2:D5");
    }

    #[test]
    fn test_parse_shell_escaped_separator() {
        let spec = RangeSpec::parse("Sheet1\\!A1:B2").unwrap();
        assert_eq!(spec.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(spec.cells_ref(), "A1:B2");
    }

    #[test]
    fn test_parse_sheet_name_uses_last_separator() {
        let spec = RangeSpec::parse("Q1!Totals!A1").unwrap();
        assert_eq!(spec.sheet.as_deref(), Some("Q1!Totals"));
    }

    #[test]
    fn test_parse_quoted_sheet() {
        let spec = RangeSpec::parse("'My Sheet'!A1:B2").unwrap();
        assert_eq!(spec.sheet.as_deref(), Some("My Sheet"));
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["not_a_range", "", "!A1", "A1:", "A1:B", "AAAA1", "A0", "1A", "A1:B2:C3"] {
            let err = RangeSpec::parse(bad).unwrap_err();
            assert!(matches!(err, Error::RangeInvalid(_)), "{bad}");
            assert_eq!(err.code(), "RANGE_INVALID");
        }
    }

    #[test]
    fn test_bounds_normalize_reversed() {
        let bounds = RangeSpec::parse("C10:A1").unwrap().bounds();
        assert_eq!(
            bounds,
            RangeBounds {
                start_col: 0,
                start_row: 1,
                end_col: 2,
                end_row: 10,
            }
        );
        assert_eq!(bounds.width(), 3);
        assert_eq!(bounds.height(), 10);
    }

    #[test]
    fn test_multi_carries_sheet_context() {
        let specs = MultiRangeSpec::parse("2022!H54:AT54,H149:AT149").unwrap();
        assert_eq!(specs.len(), 2);
        let sheets: Vec<_> = specs.iter().map(|s| s.sheet.as_deref()).collect();
        assert_eq!(sheets, vec![Some("2022"), Some("2022")]);
        assert_eq!(specs.as_slice()[1].cells_ref(), "H149:AT149");
    }

    #[test]
    fn test_multi_keeps_explicit_sheets() {
        let specs = MultiRangeSpec::parse("Sheet1!A1:B2, Sheet2!C3:D4").unwrap();
        let sheets: Vec<_> = specs.iter().map(|s| s.sheet.clone().unwrap()).collect();
        assert_eq!(sheets, vec!["Sheet1", "Sheet2"]);
    }

    #[test]
    fn test_multi_context_switches() {
        let specs = MultiRangeSpec::parse("A1,S1!B2,C3,S2!D4,E5").unwrap();
        let sheets: Vec<_> = specs.iter().map(|s| s.sheet.as_deref()).collect();
        assert_eq!(sheets, vec![None, Some("S1"), Some("S1"), Some("S2"), Some("S2")]);
    }

    #[test]
    fn test_multi_rejects_empty_and_bad_tokens() {
        assert!(MultiRangeSpec::parse(" , ").is_err());
        assert!(MultiRangeSpec::parse("A1,bogus").is_err());
    }

    proptest! {
        #[test]
        fn prop_display_roundtrip(
            sheet in proptest::option::of("[A-Za-z0-9 ]{1,12}"),
            c1 in 0u32..18_278, r1 in 1u32..1_048_577,
            c2 in 0u32..18_278, r2 in 1u32..1_048_577,
        ) {
            let spec = RangeSpec {
                sheet: sheet.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                start: CellAddress::new(c1, r1),
                end: Some(CellAddress::new(c2, r2)),
            };
            prop_assert_eq!(RangeSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }
}
