//! Output shaping
//!
//! Everything that leaves the engine passes through here to keep output small:
//! all-null columns are dropped, sample rows are sparse, long strings are cut,
//! and unbounded listings are capped with a `{items, total, truncated}` record.

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use sheetlens_core::{Cell, DataBlock};

/// Marker appended to truncated strings
pub const ELLIPSIS: &str = "...";

/// Positions of the columns that hold at least one non-null value
///
/// An empty block keeps every column, and so does a block where every
/// column is null.
pub fn compact_indices(block: &DataBlock) -> Vec<usize> {
    let all: Vec<usize> = (0..block.width()).collect();
    if block.is_empty() {
        return all;
    }
    let kept: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| block.column(i).any(|c| !c.is_null()))
        .collect();
    if kept.is_empty() {
        all
    } else {
        kept
    }
}

/// Drop columns that are null in every row
pub fn compact(block: &DataBlock) -> DataBlock {
    let kept = compact_indices(block);
    if kept.len() == block.width() {
        return block.clone();
    }
    block.select_columns(&kept)
}

/// Only the non-null fields of a row, keyed by header
pub fn sparsify(headers: &[String], row: &[Cell]) -> IndexMap<String, Cell> {
    headers
        .iter()
        .zip(row)
        .filter(|(_, cell)| !cell.is_null())
        .map(|(h, cell)| (h.clone(), cell.clone()))
        .collect()
}

/// Cut `text` to `max_chars` characters, appending [`ELLIPSIS`] when cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}{}", &text[..byte], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Truncate a string cell; other cells pass through
pub fn truncate_cell(cell: Cell, max_chars: usize) -> Cell {
    match cell {
        Cell::Str(s) => Cell::Str(truncate(&s, max_chars)),
        other => other,
    }
}

/// Round every float in the block to `digits` decimals
pub fn round_precision(block: &mut DataBlock, digits: u32) {
    for row in &mut block.rows {
        for cell in row.iter_mut() {
            *cell = std::mem::take(cell).rounded(digits);
        }
    }
}

fn type_rank(cell: &Cell) -> u8 {
    match cell {
        Cell::Bool(_) => 0,
        Cell::Int(_) | Cell::Float(_) => 1,
        Cell::Date(_) | Cell::DateTime(_) => 2,
        Cell::Str(_) => 3,
        Cell::Null => 4,
    }
}

fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Bool(x), Cell::Bool(y)) => x.cmp(y),
        (Cell::Str(x), Cell::Str(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (a.as_datetime(), b.as_datetime()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => type_rank(a).cmp(&type_rank(b)),
            },
        },
    }
}

/// Stable sort by one column; nulls always sort last
///
/// Returns false when the column does not exist.
pub fn sort_rows(block: &mut DataBlock, column: &str, descending: bool) -> bool {
    let Some(idx) = block.column_index(column) else {
        return false;
    };
    block.rows.sort_by(|a, b| {
        let (x, y) = (&a[idx], &b[idx]);
        match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ if descending => compare_cells(y, x),
            _ => compare_cells(x, y),
        }
    });
    true
}

/// A listing capped at a maximum length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capped<T> {
    /// The first `max` items
    pub items: Vec<T>,
    /// Length before capping
    pub total: usize,
    /// True when items were dropped
    pub truncated: bool,
}

/// Keep the first `max` items and record what was dropped
pub fn cap_list<T>(mut items: Vec<T>, max: usize) -> Capped<T> {
    let total = items.len();
    items.truncate(max);
    Capped {
        items,
        total,
        truncated: total > max,
    }
}

/// Mean character length of the values, `None` when there are none
fn mean_length(values: &[&str]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let chars: usize = values.iter().map(|v| v.chars().count()).sum();
    Some(chars as f64 / values.len() as f64)
}

/// True when the column reads as prose rather than categories
pub fn classify_free_text(values: &[&str], avg_length_threshold: f64) -> bool {
    mean_length(values).map_or(false, |avg| avg > avg_length_threshold)
}

/// Summary of a string column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StringSummary {
    FreeText {
        unique: usize,
        avg_length: u64,
        #[serde(rename = "type")]
        kind: &'static str,
    },
    TopValues {
        unique: usize,
        top_values: Vec<String>,
    },
}

/// Limits for [`summarize_strings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringSummaryLimits {
    pub free_text_avg_length: f64,
    pub top_values: usize,
    pub value_max_chars: usize,
}

/// Summarize the non-null values of a string column
///
/// Returns `None` when there are no values.
pub fn summarize_strings(values: &[&str], limits: StringSummaryLimits) -> Option<StringSummary> {
    let avg = mean_length(values)?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for &v in values {
        let n = counts.entry(v).or_insert(0);
        if *n == 0 {
            order.push(v);
        }
        *n += 1;
    }
    let unique = order.len();

    if classify_free_text(values, limits.free_text_avg_length) {
        return Some(StringSummary::FreeText {
            unique,
            avg_length: avg.round() as u64,
            kind: "free_text",
        });
    }

    // Most frequent first; ties keep first-seen order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    let top_values = order
        .into_iter()
        .take(limits.top_values)
        .map(|v| truncate(v, limits.value_max_chars))
        .collect();
    Some(StringSummary::TopValues { unique, top_values })
}

/// Human-readable byte size, e.g. `2.4 MB`
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
