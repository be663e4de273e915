//! Serial date detection and conversion
//!
//! Spreadsheet dates are stored as a day count with the time of day in the
//! fractional part. Day 60 is the phantom 1900-02-29, so counting from
//! 1899-12-30 lands on the same calendar dates as the host application for
//! every serial from 61 onward.

use crate::cell::Cell;
use crate::number_format::NumberFormat;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Fractional remainder below which a serial is treated as date-only
pub const DEFAULT_TIME_EPSILON: f64 = 1e-9;

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a serial number with the default epsilon
///
/// ```
/// use sheetlens_core::{dates::convert_serial, Cell};
///
/// assert_eq!(convert_serial(45000.0).to_string(), "2023-03-15");
/// assert_eq!(convert_serial(-3.0), Cell::Float(-3.0));
/// ```
pub fn convert_serial(value: f64) -> Cell {
    convert_serial_with(value, DEFAULT_TIME_EPSILON)
}

/// Convert a serial number to a date cell
///
/// NaN becomes null. Zero and negative values, and serials too large for the
/// calendar, come back unchanged as floats.
pub fn convert_serial_with(value: f64, epsilon: f64) -> Cell {
    if value.is_nan() {
        return Cell::Null;
    }
    if value <= 0.0 || !value.is_finite() {
        return Cell::Float(value);
    }

    let days = value.trunc();
    let frac = value - days;
    let offset = match Duration::try_days(days as i64) {
        Some(offset) => offset,
        None => return Cell::Float(value),
    };
    let dt = match epoch().checked_add_signed(offset) {
        Some(dt) => dt,
        None => return Cell::Float(value),
    };
    if frac <= epsilon {
        return Cell::Date(dt.date());
    }

    // Whole seconds only; a remainder under one second still renders as a time
    let micros = (frac * MICROS_PER_DAY).round() as i64;
    match dt.checked_add_signed(Duration::seconds(micros / 1_000_000)) {
        Some(dt) => Cell::DateTime(dt),
        None => Cell::Float(value),
    }
}

/// Convert a cell holding a serial number, leaving anything else untouched
///
/// Integers and numeric text are accepted since headerless loads deliver
/// untyped values.
pub fn convert_cell(cell: &Cell, epsilon: f64) -> Cell {
    match cell {
        Cell::Float(f) if f.is_nan() => Cell::Null,
        Cell::Float(_) | Cell::Int(_) | Cell::Str(_) => match cell.coerce_f64() {
            Some(v) if v > 0.0 => convert_serial_with(v, epsilon),
            _ => cell.clone(),
        },
        other => other.clone(),
    }
}

/// Columns whose sample-row format looks like a date
///
/// `formats` lists the format of each cell in the sample row, indexed by
/// 0-based column. Cells without a format are `None`.
pub fn classify<'a, I>(formats: I) -> BTreeSet<u32>
where
    I: IntoIterator<Item = Option<&'a NumberFormat>>,
{
    formats
        .into_iter()
        .enumerate()
        .filter(|(_, fmt)| fmt.map_or(false, NumberFormat::has_date_token))
        .map(|(col, _)| col as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_date_only_serial() {
        assert_eq!(convert_serial(45000.0).to_string(), "2023-03-15");
        assert_eq!(convert_serial(1.0).to_string(), "1899-12-31");
        assert_eq!(convert_serial(61.0).to_string(), "1900-03-01");
    }

    #[test]
    fn test_serial_with_time() {
        let text = convert_serial(45000.5).to_string();
        assert!(text.starts_with("2023-03-15T"));
        assert_eq!(text, "2023-03-15T12:00:00");

        let quarter = convert_serial(45000.75).to_string();
        assert_eq!(quarter, "2023-03-15T18:00:00");
    }

    #[test]
    fn test_sub_second_fraction_keeps_time() {
        let half_second = 0.5 / 86_400.0;
        assert_eq!(convert_serial(45000.0 + half_second).to_string(), "2023-03-15T00:00:00");
        assert_eq!(convert_serial(45000.0 + 1e-6).to_string(), "2023-03-15T00:00:00");
    }

    #[test]
    fn test_tiny_fraction_is_date_only() {
        assert_eq!(convert_serial(45000.0 + 1e-12).to_string(), "2023-03-15");
        assert_eq!(convert_serial_with(45000.001, 0.01).to_string(), "2023-03-15");
    }

    #[test]
    fn test_non_positive_and_nan() {
        assert_eq!(convert_serial(0.0), Cell::Float(0.0));
        assert_eq!(convert_serial(-12.5), Cell::Float(-12.5));
        assert_eq!(convert_serial(f64::NAN), Cell::Null);
        assert_eq!(convert_serial(f64::INFINITY), Cell::Float(f64::INFINITY));
    }

    #[test]
    fn test_convert_cell_variants() {
        let eps = DEFAULT_TIME_EPSILON;
        assert_eq!(convert_cell(&Cell::Int(45000), eps).to_string(), "2023-03-15");
        assert_eq!(convert_cell(&Cell::string("45000"), eps).to_string(), "2023-03-15");
        assert_eq!(convert_cell(&Cell::string("n/a"), eps), Cell::string("n/a"));
        assert_eq!(convert_cell(&Cell::Int(0), eps), Cell::Int(0));
        assert_eq!(convert_cell(&Cell::Null, eps), Cell::Null);
        assert_eq!(convert_cell(&Cell::Bool(true), eps), Cell::Bool(true));
    }

    #[test]
    fn test_classify() {
        let date = NumberFormat::from_string("yyyy-mm-dd");
        let money = NumberFormat::from_string("#,##0.00");
        let cols = classify(vec![None, Some(&date), Some(&money), Some(&date)]);
        assert_eq!(cols.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
