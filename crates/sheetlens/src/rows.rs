//! Spreadsheet row <-> block row arithmetic
//!
//! A load that consumes row 1 as the header puts spreadsheet row `N` at block
//! index `N - 2`; a headerless load puts it at `N - 1`. Skipped rows shift both.
//! Every read, search and chunk path goes through [`RowMapping`] instead of
//! doing this arithmetic inline.

/// How block indices relate to spreadsheet rows for one load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMapping {
    /// Row 1 was consumed as the header, then `skip` data rows were skipped
    HeaderConsumed { skip: usize },
    /// Row 1 is data, `skip` rows were skipped
    Headerless { skip: usize },
}

impl RowMapping {
    /// Mapping for a load with the given header mode and skip
    pub fn new(header: bool, skip: usize) -> Self {
        if header {
            RowMapping::HeaderConsumed { skip }
        } else {
            RowMapping::Headerless { skip }
        }
    }

    /// Mapping for a load whose first returned row is `sheet_row`
    pub fn starting_at(header: bool, sheet_row: u32) -> Self {
        Self::new(header, Self::skip_to(header, sheet_row))
    }

    /// Rows to skip so the first returned row is `sheet_row`
    ///
    /// With a header, asking for row 1 (the header itself) starts at row 2.
    pub fn skip_to(header: bool, sheet_row: u32) -> usize {
        let first = if header { 2 } else { 1 };
        sheet_row.saturating_sub(first) as usize
    }

    /// True when row 1 was consumed as the header
    pub fn has_header(&self) -> bool {
        matches!(self, RowMapping::HeaderConsumed { .. })
    }

    /// Rows skipped after the header (if any)
    pub fn skip(&self) -> usize {
        match *self {
            RowMapping::HeaderConsumed { skip } | RowMapping::Headerless { skip } => skip,
        }
    }

    /// Spreadsheet row of block index 0
    pub fn first_row(&self) -> u32 {
        match *self {
            RowMapping::HeaderConsumed { skip } => 2 + skip as u32,
            RowMapping::Headerless { skip } => 1 + skip as u32,
        }
    }

    /// Spreadsheet row (1-based) of a block index
    pub fn sheet_row(&self, index: usize) -> u32 {
        self.first_row() + index as u32
    }

    /// Block index of a spreadsheet row, if the load can contain it
    pub fn block_index(&self, sheet_row: u32) -> Option<usize> {
        sheet_row
            .checked_sub(self.first_row())
            .map(|offset| offset as usize)
    }

    /// Mapping after dropping the first `rows` block rows
    pub fn advanced(&self, rows: usize) -> Self {
        Self::new(self.has_header(), self.skip() + rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_header_offset() {
        let m = RowMapping::new(true, 0);
        assert_eq!(m.first_row(), 2);
        assert_eq!(m.block_index(54), Some(52));
        assert_eq!(m.block_index(1), None);
        assert_eq!(m.sheet_row(0), 2);
    }

    #[test]
    fn test_headerless_offset() {
        let m = RowMapping::new(false, 0);
        assert_eq!(m.block_index(1), Some(0));
        assert_eq!(m.block_index(54), Some(53));
    }

    #[test]
    fn test_skip_to() {
        assert_eq!(RowMapping::skip_to(true, 10), 8);
        assert_eq!(RowMapping::skip_to(false, 10), 9);
        assert_eq!(RowMapping::skip_to(true, 1), 0);
        assert_eq!(RowMapping::starting_at(true, 10).first_row(), 10);
        assert_eq!(RowMapping::starting_at(false, 10).first_row(), 10);
    }

    #[test]
    fn test_advanced() {
        let m = RowMapping::new(false, 3).advanced(5);
        assert_eq!(m, RowMapping::Headerless { skip: 8 });
        assert_eq!(m.first_row(), 9);
    }

    proptest! {
        #[test]
        fn sheet_row_inverts_block_index(header: bool, skip in 0usize..10_000, idx in 0usize..10_000) {
            let m = RowMapping::new(header, skip);
            prop_assert_eq!(m.block_index(m.sheet_row(idx)), Some(idx));
        }
    }
}
