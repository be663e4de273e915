//! CSV writer

use std::io::Write;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};
use sheetlens_core::DataBlock;

/// CSV output writer for data blocks
pub struct CsvWriter;

impl CsvWriter {
    /// Write a block to a writer
    ///
    /// Nulls become empty fields; dates are written in ISO form.
    pub fn write<W: Write>(block: &DataBlock, writer: W, options: &CsvWriteOptions) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .from_writer(writer);

        if options.write_header {
            csv_writer.write_record(&block.headers)?;
        }

        for row in &block.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render a block as a CSV string
    pub fn to_csv_string(block: &DataBlock, options: &CsvWriteOptions) -> CsvResult<String> {
        let mut buf = Vec::new();
        Self::write(block, &mut buf, options)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetlens_core::Cell;

    #[test]
    fn test_write_block() {
        let block = DataBlock::from_rows(
            vec!["Name".into(), "Note".into()],
            vec![
                vec![Cell::from("Alice"), Cell::Null],
                vec![Cell::from("Bob"), Cell::from("a, b")],
            ],
        );
        let out = CsvWriter::to_csv_string(&block, &CsvWriteOptions::default()).unwrap();
        assert_eq!(out, "Name,Note\nAlice,\nBob,\"a, b\"\n");
    }

    #[test]
    fn test_write_without_header() {
        let block = DataBlock::from_rows(vec!["A".into()], vec![vec![Cell::Float(1.5)]]);
        let options = CsvWriteOptions {
            write_header: false,
            line_terminator: LineTerminator::CRLF,
            ..Default::default()
        };
        assert_eq!(CsvWriter::to_csv_string(&block, &options).unwrap(), "1.5\r\n");
    }
}
