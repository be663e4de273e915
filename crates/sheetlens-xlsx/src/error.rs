//! Workbook error types

use thiserror::Error;

/// Result type for workbook operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur while reading a workbook
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the workbook parser
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// Core error
    #[error(transparent)]
    Core(#[from] sheetlens_core::Error),
}

impl From<XlsxError> for sheetlens_core::Error {
    fn from(err: XlsxError) -> Self {
        match err {
            XlsxError::Core(inner) => inner,
            other => sheetlens_core::Error::provider(other),
        }
    }
}
