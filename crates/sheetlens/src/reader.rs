//! Range-scoped reads
//!
//! All range loads are headerless: spreadsheet row `N` sits at block index
//! `N - 1` and columns keep their letters until header resolution renames
//! them. Single ranges load exactly their window; two or more ranges on one
//! sheet share a single load and are sliced from it, which produces the same
//! blocks as reading each range on its own.

use indexmap::IndexMap;
use sheetlens_core::column::index_to_letter;
use sheetlens_core::{
    DataBlock, Error, LoadRequest, RangeBounds, RangeSpec, Result, TabularSource, UNNAMED_PREFIX,
};
use tracing::{debug, warn};

use crate::chunked::ChunkedLoader;
use crate::rows::RowMapping;
use crate::session::{Session, SheetHandle};
use crate::shape;

/// Post-processing applied to every read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Drop columns that are null in every row (default: true)
    pub compact: bool,
    /// Attach a letter -> row-1 header map and rename columns (default: false)
    pub resolve_headers: bool,
    /// Round floats to this many decimals
    pub precision: Option<u32>,
    /// Sort rows by this output column, descending when the flag is set
    pub sort: Option<(String, bool)>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            compact: true,
            resolve_headers: false,
            precision: None,
            sort: None,
        }
    }
}

/// Window for a whole-sheet read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetWindow {
    /// Data rows to skip
    pub offset: usize,
    /// Rows to return, capped by the configured maximum
    pub limit: usize,
    /// Treat row 1 as data and name columns by letter
    pub no_header: bool,
}

/// Result of one read
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRead {
    /// Sheet the data came from
    pub sheet: String,
    /// Cells read, e.g. `A1:C10`, or the sheet name for whole-sheet reads
    pub range: String,
    /// The data
    pub block: DataBlock,
    /// Column letter -> row-1 header name, when header resolution was asked for
    pub column_map: Option<IndexMap<String, String>>,
    /// Non-fatal advisory, e.g. columns clamped to the sheet width
    pub warning: Option<String>,
    /// True when more rows exist beyond the returned window
    pub truncated: bool,
}

/// A range's columns after clamping to the sheet
#[derive(Debug, Clone)]
struct Window {
    bounds: RangeBounds,
    columns: Vec<u32>,
    warning: Option<String>,
}

impl Window {
    fn new(spec: &RangeSpec, handle: &SheetHandle) -> Self {
        let bounds = spec.bounds();
        let total = handle.total_cols;
        let columns: Vec<u32> = (bounds.start_col..=bounds.end_col.min(total.saturating_sub(1)))
            .filter(|&c| c < total)
            .collect();

        let omitted = bounds.width() - columns.len() as u32;
        let warning = (omitted > 0).then(|| {
            let text = match handle.last_col() {
                Some(last) => format!(
                    "Requested through column {} but sheet only has data through {}. {} column(s) omitted.",
                    index_to_letter(bounds.end_col),
                    last,
                    omitted
                ),
                None => format!(
                    "Requested through column {} but sheet has no data. {} column(s) omitted.",
                    index_to_letter(bounds.end_col),
                    omitted
                ),
            };
            warn!(sheet = %handle.name, "{}", text);
            text
        });

        Self {
            bounds,
            columns,
            warning,
        }
    }

    /// Rows of this range that exist on the sheet
    fn present_rows(&self, total_rows: u32) -> u32 {
        self.bounds
            .end_row
            .min(total_rows)
            .saturating_sub(self.bounds.start_row.saturating_sub(1))
    }
}

/// Reads ranges and sheets through a [`Session`]
pub struct RangeReader<'a, S> {
    session: &'a mut Session<S>,
    options: ReadOptions,
    loader: ChunkedLoader,
}

impl<'a, S: TabularSource> RangeReader<'a, S> {
    /// Reader with default options
    pub fn new(session: &'a mut Session<S>) -> Self {
        Self::with_options(session, ReadOptions::default())
    }

    /// Reader with explicit options
    pub fn with_options(session: &'a mut Session<S>, options: ReadOptions) -> Self {
        let loader = ChunkedLoader::from_config(session.config());
        Self {
            session,
            options,
            loader,
        }
    }

    /// Read one range
    ///
    /// A sheet prefix on the range wins over `sheet`; with neither, the first sheet is used.
    pub fn read_range(&mut self, sheet: Option<&str>, spec: &RangeSpec) -> Result<RangeRead> {
        let sheet = self.session.resolve_sheet(spec.sheet.as_deref().or(sheet))?;
        let handle = self.session.handle(&sheet)?.clone();
        let window = Window::new(spec, &handle);
        self.session.config().check_memory(
            window.present_rows(handle.total_rows) as u64,
            window.columns.len() as u64,
        )?;

        let request = LoadRequest::headerless()
            .skip(RowMapping::skip_to(false, window.bounds.start_row))
            .take(window.bounds.height() as usize)
            .columns(window.columns.clone());
        let block = self.loader.load(self.session.source_mut(), &sheet, &request)?;

        Ok(self.finish(&handle, spec.cells_ref(), block, window.columns, window.warning))
    }

    /// Read several ranges, in order
    ///
    /// Ranges are grouped by sheet; a sheet with two or more ranges is loaded
    /// once and every range sliced from that load.
    pub fn read_ranges(&mut self, sheet: Option<&str>, specs: &[RangeSpec]) -> Result<Vec<RangeRead>> {
        let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (i, spec) in specs.iter().enumerate() {
            let name = self.session.resolve_sheet(spec.sheet.as_deref().or(sheet))?;
            groups.entry(name).or_default().push(i);
        }

        let mut out: Vec<Option<RangeRead>> = vec![None; specs.len()];
        for (name, indices) in groups {
            if indices.len() < 2 {
                for i in indices {
                    out[i] = Some(self.read_range(Some(&name), &specs[i])?);
                }
                continue;
            }
            let batch: Vec<&RangeSpec> = indices.iter().map(|&i| &specs[i]).collect();
            for (i, read) in indices.into_iter().zip(self.read_batch(&name, &batch)?) {
                out[i] = Some(read);
            }
        }
        Ok(out.into_iter().flatten().collect())
    }

    fn read_batch(&mut self, sheet: &str, specs: &[&RangeSpec]) -> Result<Vec<RangeRead>> {
        let handle = self.session.handle(sheet)?.clone();
        let windows: Vec<Window> = specs.iter().map(|s| Window::new(s, &handle)).collect();

        let max_row = windows.iter().map(|w| w.bounds.end_row).max().unwrap_or(0);
        let max_col = windows.iter().flat_map(|w| w.columns.last()).max().copied();
        let width = max_col.map_or(0, |c| c + 1);

        // Rows past the end of the sheet are never loaded
        let present = max_row.min(handle.total_rows);
        match self.session.config().check_memory(present as u64, width as u64) {
            Ok(()) => {}
            Err(Error::MemoryBudgetExceeded { estimated_mb, .. }) => {
                debug!(sheet, estimated_mb, "batch load over budget; reading ranges one by one");
                return specs
                    .iter()
                    .map(|spec| {
                        let mut spec = (*spec).clone();
                        spec.sheet = Some(sheet.to_string());
                        self.read_range(None, &spec)
                    })
                    .collect();
            }
            Err(err) => return Err(err),
        }

        debug!(sheet, ranges = specs.len(), max_row, width, "batch load");
        let request = LoadRequest::headerless()
            .take(max_row as usize)
            .columns((0..width).collect());
        let full = self.loader.load(self.session.source_mut(), sheet, &request)?;
        let mapping = RowMapping::new(false, 0);

        let mut reads = Vec::with_capacity(specs.len());
        for (spec, window) in specs.iter().zip(windows) {
            let start = mapping.block_index(window.bounds.start_row).unwrap_or(0);
            let end = mapping
                .block_index(window.bounds.end_row)
                .map_or(0, |i| i + 1);
            let picked: Vec<usize> = window.columns.iter().map(|&c| c as usize).collect();
            let block = full.slice_rows(start, end).select_columns(&picked);
            reads.push(self.finish(&handle, spec.cells_ref(), block, window.columns, window.warning));
        }
        Ok(reads)
    }

    /// Read a window of a whole sheet
    pub fn read_sheet(&mut self, sheet: Option<&str>, window: SheetWindow) -> Result<RangeRead> {
        let sheet = self.session.resolve_sheet(sheet)?;
        let handle = self.session.handle(&sheet)?.clone();
        let limit = window.limit.min(self.session.config().max_read_rows);
        self.session
            .config()
            .check_memory(limit as u64, handle.total_cols as u64)?;

        // One extra row tells whether anything lies past the window
        let request = LoadRequest {
            header: !window.no_header,
            skip_rows: window.offset,
            n_rows: Some(limit + 1),
            columns: None,
        };
        let mut block = self.loader.load(self.session.source_mut(), &sheet, &request)?;
        let truncated = block.height() > limit;
        block.rows.truncate(limit);

        let columns = (0..block.width() as u32).collect();
        let mut read = self.finish(&handle, sheet.clone(), block, columns, None);
        read.column_map = None;
        read.truncated = truncated;
        Ok(read)
    }

    fn finish(
        &mut self,
        handle: &SheetHandle,
        range: String,
        mut block: DataBlock,
        mut columns: Vec<u32>,
        warning: Option<String>,
    ) -> RangeRead {
        self.session.convert_dates(&handle.name, &mut block, &columns);

        if self.options.compact {
            let kept = shape::compact_indices(&block);
            if kept.len() < block.width() {
                block = block.select_columns(&kept);
                columns = kept.iter().map(|&i| columns[i]).collect();
            }
        }

        let column_map = if self.options.resolve_headers {
            Some(resolve_headers(&mut block, &columns, handle))
        } else {
            None
        };

        if let Some(digits) = self.options.precision {
            shape::round_precision(&mut block, digits);
        }
        if let Some((column, descending)) = &self.options.sort {
            shape::sort_rows(&mut block, column, *descending);
        }

        RangeRead {
            sheet: handle.name.clone(),
            range,
            block,
            column_map,
            warning,
            truncated: false,
        }
    }
}

/// Map each column letter to its row-1 header and rename named columns
///
/// Columns whose row-1 cell is empty keep their letter.
fn resolve_headers(
    block: &mut DataBlock,
    columns: &[u32],
    handle: &SheetHandle,
) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for (header, &col) in block.headers.iter_mut().zip(columns) {
        let Some(name) = handle.header(col) else {
            continue;
        };
        if name.is_empty() || name.starts_with(UNNAMED_PREFIX) {
            continue;
        }
        map.insert(index_to_letter(col), name.to_string());
        *header = name.to_string();
    }
    map
}
