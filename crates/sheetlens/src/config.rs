//! Engine policy knobs
//!
//! Every threshold the engine consults lives here so callers can tune it per
//! invocation. Nothing in this struct is ever written back to disk.

use serde::{Deserialize, Serialize};
use sheetlens_core::{Error, Result};

const MIB: u64 = 1024 * 1024;

/// Tunable limits and heuristics for one engine session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sources at or above this size are loaded in chunks (default: 100 MiB)
    pub chunk_threshold_bytes: u64,
    /// Rows per chunk when chunking (default: 100 000)
    pub chunk_rows: usize,
    /// Range-scoped searches on sources at or above this size load the whole
    /// sheet and slice instead of skipping rows (default: 10 MiB)
    pub search_full_load_threshold_bytes: u64,
    /// Ceiling for the estimated size of one range load (default: 500)
    pub memory_ceiling_mb: f64,
    /// Bytes assumed per loaded cell when estimating memory (default: 32)
    pub estimated_bytes_per_cell: u64,
    /// Hard cap on rows returned by a sheet read (default: 10 000)
    pub max_read_rows: usize,
    /// Rows returned by a sheet read without `--limit` (default: 100)
    pub default_read_limit: usize,
    /// Matches returned by a search without `--limit` (default: 25)
    pub default_search_limit: usize,
    /// Hard cap on search matches (default: 1 000)
    pub max_search_limit: usize,
    /// Hard cap on head/tail sample rows (default: 10)
    pub max_sample_rows: usize,
    /// Sample values longer than this are truncated (default: 200)
    pub sample_value_max_chars: usize,
    /// Top-value strings longer than this are truncated (default: 80)
    pub string_value_max_chars: usize,
    /// Mean length above which a string column counts as free text (default: 100)
    pub free_text_avg_length: f64,
    /// Number of frequent values listed per string column (default: 5)
    pub top_values: usize,
    /// Fractional day below which a serial is date-only (default: 1e-9)
    pub date_time_epsilon: f64,
    /// Row whose number formats classify date columns (default: 2)
    pub date_sample_row: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: 100 * MIB,
            chunk_rows: 100_000,
            search_full_load_threshold_bytes: 10 * MIB,
            memory_ceiling_mb: 500.0,
            estimated_bytes_per_cell: 32,
            max_read_rows: 10_000,
            default_read_limit: 100,
            default_search_limit: 25,
            max_search_limit: 1_000,
            max_sample_rows: 10,
            sample_value_max_chars: 200,
            string_value_max_chars: 80,
            free_text_avg_length: 100.0,
            top_values: 5,
            date_time_epsilon: sheetlens_core::dates::DEFAULT_TIME_EPSILON,
            date_sample_row: 2,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON override; missing fields keep their defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Source(format!("invalid config: {e}")))
    }

    /// Estimated megabytes for a `rows` x `cols` load
    pub fn estimate_mb(&self, rows: u64, cols: u64) -> f64 {
        (rows * cols * self.estimated_bytes_per_cell) as f64 / MIB as f64
    }

    /// Fail when a `rows` x `cols` load would exceed the memory ceiling
    pub fn check_memory(&self, rows: u64, cols: u64) -> Result<()> {
        let estimated_mb = self.estimate_mb(rows, cols);
        if estimated_mb > self.memory_ceiling_mb {
            return Err(Error::MemoryBudgetExceeded {
                estimated_mb,
                limit_mb: self.memory_ceiling_mb,
            });
        }
        Ok(())
    }
}
