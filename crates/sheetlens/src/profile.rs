//! Sheet profiling
//!
//! The lean profile needs nothing beyond sheet metadata. Types, statistics,
//! samples and header detection each require a full sheet load and are only
//! computed when asked for.

use indexmap::IndexMap;
use serde::Serialize;
use sheetlens_core::column::index_to_letter;
use sheetlens_core::dates::convert_cell;
use sheetlens_core::{Cell, DataBlock, LoadRequest, Result, TabularSource, UNNAMED_PREFIX};
use tracing::debug;

use crate::chunked::ChunkedLoader;
use crate::session::{Session, SheetHandle};
use crate::shape::{self, StringSummary, StringSummaryLimits};

/// Rows scanned when looking for header-like rows
const HEADER_SCAN_ROWS: usize = 10;

/// What to compute beyond sheet metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileOptions {
    /// Column types and null counts
    pub types: bool,
    /// Numeric, string and date summaries; implies `types`
    pub stats: bool,
    /// Head and tail rows to include, capped by the configured maximum
    pub sample: usize,
    /// Treat row 1 as data and name columns by letter
    pub no_header: bool,
    /// Only profile the first N columns
    pub max_columns: Option<usize>,
}

impl ProfileOptions {
    fn needs_data(&self) -> bool {
        self.types || self.stats || self.sample > 0
    }
}

/// Numeric column statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: Cell,
    pub max: Cell,
    pub mean: Cell,
    pub median: Cell,
    /// Sample standard deviation; null with fewer than two values
    pub std: Cell,
}

/// Date column range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSummary {
    pub min: Cell,
    pub max: Cell,
    pub count: usize,
}

/// Summary attached to a column profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Text(StringSummary),
    Date(DateSummary),
}

/// Derived facts about one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: String,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ColumnSummary>,
}

impl ColumnProfile {
    fn is_fully_null(&self) -> bool {
        self.inferred_type == "null"
    }
}

/// A row that looks like a header in headerless data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialHeader {
    /// 1-based spreadsheet row
    pub row: u32,
    pub values: IndexMap<String, Cell>,
}

/// Sparse head and tail rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub head: Vec<IndexMap<String, Cell>>,
    pub tail: Vec<IndexMap<String, Cell>>,
}

/// Profile of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetProfile {
    pub name: String,
    pub index: usize,
    pub rows: u32,
    pub cols: u32,
    pub headers: Vec<String>,
    pub last_col: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_map: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiled_columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_counts: Option<IndexMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fully_null_columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_types: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_headers: Option<Vec<PotentialHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Sample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_summary: Option<IndexMap<String, NumericSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_summary: Option<IndexMap<String, StringSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_summary: Option<IndexMap<String, DateSummary>>,
    /// Per-column profiles behind the maps above
    #[serde(skip)]
    pub columns: Vec<ColumnProfile>,
}

impl SheetProfile {
    fn lean(handle: &SheetHandle, index: usize, no_header: bool) -> Self {
        let headers: Vec<String> = if no_header {
            (0..handle.total_cols).map(index_to_letter).collect()
        } else {
            handle.headers().to_vec()
        };
        Self {
            name: handle.name.clone(),
            index,
            rows: if no_header {
                handle.total_rows
            } else {
                handle.data_rows()
            },
            cols: handle.total_cols,
            last_col: handle.last_col().unwrap_or_else(|| "A".into()),
            column_map: (!no_header).then(|| handle.column_map()),
            headers,
            profiled_columns: None,
            columns_truncated: None,
            null_counts: None,
            fully_null_columns: None,
            column_types: None,
            potential_headers: None,
            sample: None,
            numeric_summary: None,
            string_summary: None,
            date_summary: None,
            columns: Vec::new(),
        }
    }
}

/// Profiles for the requested sheets plus an optional advisory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    pub sheets: Vec<SheetProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Builds sheet profiles through a [`Session`]
pub struct Profiler<'a, S> {
    session: &'a mut Session<S>,
    options: ProfileOptions,
    loader: ChunkedLoader,
}

impl<'a, S: TabularSource> Profiler<'a, S> {
    pub fn new(session: &'a mut Session<S>, mut options: ProfileOptions) -> Self {
        if options.stats {
            options.types = true;
        }
        let loader = ChunkedLoader::from_config(session.config());
        Self {
            session,
            options,
            loader,
        }
    }

    /// Profile one sheet, or every sheet when `sheet` is `None`
    pub fn profile(&mut self, sheet: Option<&str>) -> Result<ProfileReport> {
        let names = self.session.sheet_names();
        let targets: Vec<(usize, String)> = match sheet {
            Some(name) => {
                let name = self.session.resolve_sheet(Some(name))?;
                let index = names.iter().position(|n| *n == name).unwrap_or(0);
                vec![(index, name)]
            }
            None => names.into_iter().enumerate().collect(),
        };

        let mut sheets = Vec::with_capacity(targets.len());
        for (index, name) in targets {
            sheets.push(self.profile_sheet(index, &name)?);
        }

        let hint = if self.options.no_header || self.options.needs_data() {
            None
        } else {
            unnamed_hint(&sheets)
        };
        Ok(ProfileReport { sheets, hint })
    }

    fn profile_sheet(&mut self, index: usize, sheet: &str) -> Result<SheetProfile> {
        let handle = self.session.handle(sheet)?.clone();
        let mut profile = SheetProfile::lean(&handle, index, self.options.no_header);
        if !self.options.needs_data() {
            return Ok(profile);
        }

        self.session
            .config()
            .check_memory(handle.total_rows as u64, handle.total_cols as u64)?;
        let request = LoadRequest {
            header: !self.options.no_header,
            ..Default::default()
        };
        let mut block = self.loader.load(self.session.source_mut(), sheet, &request)?;
        debug!(sheet, rows = block.height(), "loaded sheet for profiling");

        profile.headers = block.headers.clone();
        profile.rows = block.height() as u32;
        if let Some(max) = self.options.max_columns {
            if max < block.width() {
                block = block.select_columns(&(0..max).collect::<Vec<_>>());
                profile.profiled_columns = Some(max);
                profile.columns_truncated = Some(true);
            }
        }

        let date_cols = self.session.date_columns(sheet);
        let is_date: Vec<bool> = (0..block.width() as u32).map(|c| date_cols.contains(&c)).collect();
        let eps = self.session.config().date_time_epsilon;

        if self.options.types {
            profile.columns = self.column_profiles(&block, &is_date);
            let height = block.height();
            let fully_null = profile.columns.iter().filter(|c| c.is_fully_null()).count();
            profile.null_counts = Some(
                profile
                    .columns
                    .iter()
                    .filter(|c| height == 0 || !c.is_fully_null())
                    .map(|c| (c.name.clone(), c.null_count))
                    .collect(),
            );
            if fully_null > 0 && height > 0 {
                profile.fully_null_columns = Some(fully_null);
            }
            profile.column_types = Some(
                profile
                    .columns
                    .iter()
                    .filter(|c| !c.is_fully_null())
                    .map(|c| (c.name.clone(), c.inferred_type.clone()))
                    .collect(),
            );
            if self.options.no_header {
                let found = potential_headers(&block);
                if !found.is_empty() {
                    profile.potential_headers = Some(found);
                }
            }
        }

        let sample_rows = self.options.sample.min(self.session.config().max_sample_rows);
        if sample_rows > 0 && !block.is_empty() {
            let max_chars = self.session.config().sample_value_max_chars;
            let date_typed: Vec<bool> = if profile.columns.is_empty() {
                is_date.clone()
            } else {
                profile.columns.iter().map(|c| c.inferred_type == "date").collect()
            };
            let sparse_row = |row: &Vec<Cell>| -> IndexMap<String, Cell> {
                let converted: Vec<Cell> = row
                    .iter()
                    .zip(&date_typed)
                    .map(|(cell, &date)| {
                        let cell = if date { convert_cell(cell, eps) } else { cell.clone() };
                        shape::truncate_cell(cell, max_chars)
                    })
                    .collect();
                shape::sparsify(&block.headers, &converted)
            };
            let tail_start = block.height().saturating_sub(sample_rows);
            profile.sample = Some(Sample {
                head: block.rows.iter().take(sample_rows).map(&sparse_row).collect(),
                tail: block.rows[tail_start..].iter().map(&sparse_row).collect(),
            });
        }

        if self.options.stats && !block.is_empty() {
            let mut numeric = IndexMap::new();
            let mut strings = IndexMap::new();
            let mut dates = IndexMap::new();
            for column in &profile.columns {
                match &column.summary {
                    Some(ColumnSummary::Numeric(s)) => {
                        numeric.insert(column.name.clone(), s.clone());
                    }
                    Some(ColumnSummary::Text(s)) => {
                        strings.insert(column.name.clone(), s.clone());
                    }
                    Some(ColumnSummary::Date(s)) => {
                        dates.insert(column.name.clone(), s.clone());
                    }
                    None => {}
                }
            }
            profile.numeric_summary = (!numeric.is_empty()).then_some(numeric);
            profile.string_summary = (!strings.is_empty()).then_some(strings);
            profile.date_summary = (!dates.is_empty()).then_some(dates);
        }

        Ok(profile)
    }

    fn column_profiles(&self, block: &DataBlock, is_date: &[bool]) -> Vec<ColumnProfile> {
        let config = self.session.config();
        let limits = StringSummaryLimits {
            free_text_avg_length: config.free_text_avg_length,
            top_values: config.top_values,
            value_max_chars: config.string_value_max_chars,
        };
        let height = block.height();

        block
            .headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cells: Vec<&Cell> = block.column(i).filter(|c| !c.is_null()).collect();
                let null_count = height - cells.len();
                let mut inferred_type = infer_type(&cells).to_string();
                let date_like = is_date.get(i).copied().unwrap_or(false)
                    && (self.options.no_header || inferred_type == "float64")
                    && inferred_type != "null";
                if date_like {
                    inferred_type = "date".into();
                }

                let summary = if !self.options.stats || cells.is_empty() {
                    None
                } else if date_like {
                    date_summary(&cells, config.date_time_epsilon).map(ColumnSummary::Date)
                } else if inferred_type == "int64" || inferred_type == "float64" {
                    numeric_summary(&cells).map(ColumnSummary::Numeric)
                } else if inferred_type == "string" && (null_count as f64) < 0.5 * height as f64 {
                    let values: Vec<&str> = cells.iter().filter_map(|c| c.as_str()).collect();
                    shape::summarize_strings(&values, limits).map(ColumnSummary::Text)
                } else {
                    None
                };

                ColumnProfile {
                    name: name.clone(),
                    inferred_type,
                    null_count,
                    summary,
                }
            })
            .collect()
    }
}

/// Column type from the non-null cells
///
/// Mixed integers and floats widen to float; any other mix reads as string.
fn infer_type(cells: &[&Cell]) -> &'static str {
    let mut kind: Option<&'static str> = None;
    for cell in cells {
        let this = match cell {
            Cell::Int(_) => "int64",
            Cell::Float(_) => "float64",
            Cell::Str(_) => "string",
            Cell::Bool(_) => "boolean",
            Cell::Date(_) | Cell::DateTime(_) => "datetime",
            Cell::Null => continue,
        };
        kind = match (kind, this) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some("int64"), "float64") | (Some("float64"), "int64") => Some("float64"),
            _ => return "string",
        };
    }
    kind.unwrap_or("null")
}

/// Whole numbers print as integers; others keep six decimals
fn stat_cell(value: f64) -> Cell {
    if !value.is_finite() {
        Cell::Null
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        Cell::Int(value as i64)
    } else {
        Cell::Float((value * 1e6).round() / 1e6)
    }
}

fn numeric_summary(cells: &[&Cell]) -> Option<NumericSummary> {
    let mut values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    let std = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        stat_cell(var.sqrt())
    } else {
        Cell::Null
    };
    Some(NumericSummary {
        min: stat_cell(values[0]),
        max: stat_cell(values[n - 1]),
        mean: stat_cell(mean),
        median: stat_cell(median),
        std,
    })
}

fn date_summary(cells: &[&Cell], eps: f64) -> Option<DateSummary> {
    let serials: Vec<f64> = cells.iter().filter_map(|c| c.coerce_f64()).collect();
    let min = serials.iter().copied().reduce(f64::min)?;
    let max = serials.iter().copied().reduce(f64::max)?;
    Some(DateSummary {
        min: convert_cell(&Cell::Float(min), eps),
        max: convert_cell(&Cell::Float(max), eps),
        count: cells.len(),
    })
}

fn is_numeric_text(s: &str) -> bool {
    s.replace(',', "").trim().parse::<f64>().is_ok()
}

/// Rows among the first few whose cells look like labels
///
/// A row qualifies when at least 30% of columns are non-null and at least
/// 60% of those are short (<= 20 chars) non-numeric strings.
pub fn potential_headers(block: &DataBlock) -> Vec<PotentialHeader> {
    let width = block.width();
    if width == 0 {
        return Vec::new();
    }
    block
        .rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .filter_map(|(i, row)| {
            let non_null: Vec<&Cell> = row.iter().filter(|c| !c.is_null()).collect();
            if non_null.is_empty() || (non_null.len() as f64) / (width as f64) < 0.3 {
                return None;
            }
            let labels = non_null
                .iter()
                .filter(|c| {
                    c.as_str()
                        .map_or(false, |s| s.chars().count() <= 20 && !is_numeric_text(s))
                })
                .count();
            if (labels as f64) / (non_null.len() as f64) < 0.6 {
                return None;
            }
            Some(PotentialHeader {
                row: i as u32 + 1,
                values: shape::sparsify(&block.headers, row),
            })
        })
        .collect()
}

fn unnamed_hint(sheets: &[SheetProfile]) -> Option<String> {
    let headers: Vec<&String> = sheets.iter().flat_map(|s| &s.headers).collect();
    if headers.is_empty() {
        return None;
    }
    let unnamed = headers.iter().filter(|h| h.starts_with(UNNAMED_PREFIX)).count();
    if unnamed as f64 / headers.len() as f64 > 0.5 {
        Some("Most headers are unnamed. Consider --no-header for column-letter headers.".into())
    } else {
        None
    }
}
