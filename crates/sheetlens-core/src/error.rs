//! Error types for sheetlens-core

use serde::Serialize;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while addressing, reading, or searching a source
///
/// Parsing and existence errors abort the operation that raised them. Column
/// overruns and date-detection failures never show up here; they degrade into
/// warnings or a skipped enhancement instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed range text
    #[error("Invalid range: '{0}'")]
    RangeInvalid(String),

    /// Malformed cell address or column letters
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Sheet not found by name
    #[error("Sheet '{name}' not found")]
    SheetNotFound {
        /// Requested sheet name
        name: String,
        /// Sheet names the source does have
        available: Vec<String>,
    },

    /// A column filter entry matched neither a letter nor a header name
    #[error("Column(s) not found: {spec}")]
    InvalidColumnFilter {
        /// The unresolved entries, comma separated
        spec: String,
        /// Columns that could have matched
        available: Vec<String>,
    },

    /// Search pattern failed to compile
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A load would exceed the configured memory ceiling
    #[error("Estimated memory {estimated_mb:.0}MB exceeds limit {limit_mb:.0}MB")]
    MemoryBudgetExceeded { estimated_mb: f64, limit_mb: f64 },

    /// Input file does not exist
    #[error("The file '{0}' does not exist")]
    FileNotFound(String),

    /// Input file extension has no provider
    #[error("'{0}' is not a supported spreadsheet file")]
    UnsupportedFormat(String),

    /// The provider does not implement an optional capability
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Failure inside the tabular source provider
    #[error("Source error: {0}")]
    Source(String),
}

impl Error {
    /// Create a provider failure from any displayable error
    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        Error::Source(err.to_string())
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::RangeInvalid(_) => "RANGE_INVALID",
            Error::InvalidAddress(_) => "RANGE_INVALID",
            Error::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            Error::InvalidColumnFilter { .. } => "INVALID_COLUMN",
            Error::InvalidPattern { .. } => "INVALID_REGEX",
            Error::MemoryBudgetExceeded { .. } => "MEMORY_EXCEEDED",
            Error::FileNotFound(_) => "FILE_NOT_FOUND",
            Error::UnsupportedFormat(_) => "INVALID_FORMAT",
            Error::Unsupported(_) => "UNSUPPORTED",
            Error::Source(_) => "SOURCE_ERROR",
        }
    }

    /// Actionable hints shown alongside the message
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::RangeInvalid(_) | Error::InvalidAddress(_) => {
                vec!["Use Excel notation e.g. 'A1:C10' or 'Sheet1!A1:C10'".into()]
            }
            Error::SheetNotFound { available, .. } => {
                vec![format!("Available sheets: {}", available.join(", "))]
            }
            Error::InvalidColumnFilter { available, .. } => vec![
                format!("Available columns: {}", available.join(", ")),
                "Use column letters (A, B) or exact header names".into(),
            ],
            Error::InvalidPattern { .. } => vec![
                "Check the pattern syntax".into(),
                "Drop --regex to search for the literal text".into(),
            ],
            Error::MemoryBudgetExceeded { .. } => vec![
                "Use --limit to read fewer rows".into(),
                "Use 'probe' for a lightweight summary".into(),
            ],
            Error::FileNotFound(_) => vec![
                "Check the file path is correct".into(),
                "Ensure the file has a supported extension".into(),
            ],
            Error::UnsupportedFormat(_) => {
                vec!["Supported formats: .xlsx, .xlsm, .xlsb, .xls, .ods, .csv".into()]
            }
            Error::Unsupported(_) | Error::Source(_) => Vec::new(),
        }
    }

    /// Build the serializable report for this error
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: true,
            code: self.code(),
            message: self.to_string(),
            suggestions: self.suggestions(),
        }
    }
}

/// Structured error body emitted to callers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}
