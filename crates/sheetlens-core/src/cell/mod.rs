//! Cell-related types
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`Cell`] - A typed value as delivered by a tabular source

mod address;
mod value;

pub use address::{CellAddress, MAX_COLUMN_LETTERS};
pub use value::Cell;
