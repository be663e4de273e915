//! Cell value type

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// A typed cell value as inferred by the tabular source
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// No value
    #[default]
    Null,
    /// Integer
    Int(i64),
    /// Floating point number (also used for unconverted date serials)
    Float(f64),
    /// Text
    Str(String),
    /// Calendar date
    Date(NaiveDate),
    /// Date with a time of day, rendered with a `THH:MM:SS` suffix even at midnight
    DateTime(NaiveDateTime),
    /// Boolean value
    Bool(bool),
}

/// Decimal places beyond which rounding cannot change a double
const MAX_ROUND_DIGITS: u32 = 17;

impl Cell {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Cell::Str(s.into())
    }

    /// Check if the cell is null
    ///
    /// A NaN float counts as null, matching how sources report missing numbers.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Try to get the value as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, also accepting numeric text
    ///
    /// Headerless reads deliver every value as text, so date-serial
    /// conversion needs to look through strings like `"45000"`.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            Cell::Str(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            other => other.as_f64(),
        }
    }

    /// Get the type name used in profiles
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Int(_) => "int",
            Cell::Float(_) => "float",
            Cell::Str(_) => "string",
            Cell::Date(_) | Cell::DateTime(_) => "date",
            Cell::Bool(_) => "boolean",
        }
    }

    /// Text used when matching search patterns; `None` for nulls
    pub fn search_text(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Round floats to `digits` decimal places, leaving other values alone
    ///
    /// Doubles carry at most 17 significant digits, so larger requests are
    /// capped there.
    pub fn rounded(self, digits: u32) -> Self {
        match self {
            Cell::Float(f) if f.is_finite() => {
                let scale = 10f64.powi(digits.min(MAX_ROUND_DIGITS) as i32);
                let rounded = (f * scale).round() / scale;
                Cell::Float(if rounded.is_finite() { rounded } else { f })
            }
            other => other,
        }
    }

    /// Date and time as one value, midnight for plain dates
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(d) => d.and_hms_opt(0, 0, 0),
            Cell::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, ""),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(n) if n.is_nan() => write!(f, ""),
            Cell::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.1}", n),
            Cell::Float(n) => write!(f, "{}", n),
            Cell::Str(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(f) if !f.is_finite() => serializer.serialize_none(),
            Cell::Float(f) => serializer.serialize_f64(*f),
            Cell::Str(s) => serializer.serialize_str(s),
            Cell::Date(_) | Cell::DateTime(_) => serializer.collect_str(self),
            Cell::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Float(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::string(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Str(s)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(dt: NaiveDateTime) -> Self {
        Cell::DateTime(dt)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::from(42), Cell::Int(42));
        assert_eq!(Cell::from(3.5), Cell::Float(3.5));
        assert_eq!(Cell::from(true), Cell::Bool(true));
        assert_eq!(Cell::from("hello").as_str(), Some("hello"));
        assert_eq!(Cell::from(None::<i64>), Cell::Null);
    }

    #[test]
    fn test_nan_is_null() {
        assert!(Cell::Float(f64::NAN).is_null());
        assert!(Cell::Null.is_null());
        assert!(!Cell::Float(0.0).is_null());
        assert!(!Cell::string("").is_null());
    }

    #[test]
    fn test_coerce_numeric_text() {
        assert_eq!(Cell::string(" 45000 ").coerce_f64(), Some(45000.0));
        assert_eq!(Cell::string("abc").coerce_f64(), None);
        assert_eq!(Cell::Int(7).coerce_f64(), Some(7.0));
    }

    #[test]
    fn test_search_text() {
        assert_eq!(Cell::Float(2.0).search_text().as_deref(), Some("2.0"));
        assert_eq!(Cell::Float(2.25).search_text().as_deref(), Some("2.25"));
        assert_eq!(Cell::Bool(false).search_text().as_deref(), Some("false"));
        assert_eq!(Cell::Null.search_text(), None);
    }

    #[test]
    fn test_iso_date_rendering() {
        let midnight = NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let afternoon = NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(Cell::Date(midnight.date()).to_string(), "2024-02-15");
        assert_eq!(Cell::DateTime(midnight).to_string(), "2024-02-15T00:00:00");
        assert_eq!(Cell::DateTime(afternoon).to_string(), "2024-02-15T14:30:00");
        assert_eq!(Cell::Date(midnight.date()).as_datetime(), Some(midnight));
        assert_eq!(Cell::Int(1).as_datetime(), None);
    }

    #[test]
    fn test_rounded() {
        assert_eq!(Cell::Float(3.14159).rounded(2), Cell::Float(3.14));
        assert_eq!(Cell::Int(3).rounded(2), Cell::Int(3));
    }

    #[test]
    fn test_rounded_huge_precision_keeps_value() {
        assert_eq!(Cell::Float(1.5).rounded(400), Cell::Float(1.5));
        assert_eq!(Cell::Float(1e300).rounded(17), Cell::Float(1e300));
        assert_eq!(Cell::Float(0.125).rounded(u32::MAX), Cell::Float(0.125));
    }
}
