//! CSV reader

use std::io::Read;

use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;
use sheetlens_core::Cell;

/// CSV record reader
///
/// Every record is returned, including the first; whether row 1 is a header
/// is decided by the caller.
pub struct CsvReader;

impl CsvReader {
    /// Stream raw records without converting them
    pub fn records<R: Read>(
        reader: R,
        options: &CsvReadOptions,
    ) -> impl Iterator<Item = CsvResult<Vec<String>>> {
        csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records()
            .map(|result| {
                result
                    .map(|record| record.iter().map(String::from).collect())
                    .map_err(CsvError::from)
            })
    }

    /// Convert one field, with or without type detection
    pub fn convert(field: &str, auto_detect_types: bool) -> Cell {
        if auto_detect_types {
            Self::detect_type(field)
        } else if field.is_empty() {
            Cell::Null
        } else {
            Cell::string(field)
        }
    }

    /// Detect the type of a field value
    pub fn detect_type(field: &str) -> Cell {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Cell::Null;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }

        // "nan" and "inf" parse as floats but are words here
        if trimmed.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Cell::Int(n);
            }
            if let Ok(n) = trimmed.parse::<f64>() {
                return Cell::Float(n);
            }
        }

        Cell::string(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read(data: &str, options: &CsvReadOptions) -> Vec<Vec<Cell>> {
        CsvReader::records(data.as_bytes(), options)
            .map(|record| {
                let fields = record.unwrap();
                fields
                    .iter()
                    .map(|f| CsvReader::convert(f, options.auto_detect_types))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_detect_type() {
        assert_eq!(CsvReader::detect_type(""), Cell::Null);
        assert_eq!(CsvReader::detect_type("  "), Cell::Null);
        assert_eq!(CsvReader::detect_type("42"), Cell::Int(42));
        assert_eq!(CsvReader::detect_type("-3.5"), Cell::Float(-3.5));
        assert_eq!(CsvReader::detect_type("1e3"), Cell::Float(1000.0));
        assert_eq!(CsvReader::detect_type("TRUE"), Cell::Bool(true));
        assert_eq!(CsvReader::detect_type("nan"), Cell::string("nan"));
        assert_eq!(CsvReader::detect_type("Alice"), Cell::string("Alice"));
    }

    #[test]
    fn test_read_keeps_first_row_and_ragged_rows() {
        let data = "Name,Score\nAlice,90\nBob\n";
        let rows = read(data, &CsvReadOptions::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![Cell::from("Name"), Cell::from("Score")]);
        assert_eq!(rows[1], vec![Cell::from("Alice"), Cell::Int(90)]);
        assert_eq!(rows[2], vec![Cell::from("Bob")]);
    }

    #[test]
    fn test_read_without_type_detection() {
        let options = CsvReadOptions {
            auto_detect_types: false,
            delimiter: b';',
            ..Default::default()
        };
        let rows = read("a;1;\n", &options);
        assert_eq!(rows[0], vec![Cell::from("a"), Cell::from("1"), Cell::Null]);
    }
}
