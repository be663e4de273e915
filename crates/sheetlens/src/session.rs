//! Per-invocation engine context
//!
//! A [`Session`] owns the source for the duration of one command and keeps
//! the soft caches that make repeated access cheap: probed sheet metadata and
//! date-column classification. Both caches are read-through, never written
//! back to the source, and can be dropped at any time with
//! [`Session::reset_caches`].

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use sheetlens_core::column::index_to_letter;
use sheetlens_core::dates::convert_cell;
use sheetlens_core::{DataBlock, Error, Result, SheetProbe, TabularSource};
use tracing::debug;

use crate::config::EngineConfig;

/// Cached metadata for one sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHandle {
    /// Sheet name
    pub name: String,
    /// Physical rows, counting row 1
    pub total_rows: u32,
    /// Columns in the widest row
    pub total_cols: u32,
    headers: Vec<String>,
}

impl SheetHandle {
    /// Row-1 header names, one per column
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows below the header row
    pub fn data_rows(&self) -> u32 {
        self.total_rows.saturating_sub(1)
    }

    /// Letter of the last column, if the sheet has any
    pub fn last_col(&self) -> Option<String> {
        self.total_cols.checked_sub(1).map(index_to_letter)
    }

    /// Header name of a 0-based column
    pub fn header(&self, col: u32) -> Option<&str> {
        self.headers.get(col as usize).map(String::as_str)
    }

    /// Header name -> column letter, in column order
    pub fn column_map(&self) -> IndexMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), index_to_letter(i as u32)))
            .collect()
    }
}

impl From<SheetProbe> for SheetHandle {
    fn from(probe: SheetProbe) -> Self {
        Self {
            name: probe.name,
            total_rows: probe.total_rows,
            total_cols: probe.total_cols,
            headers: probe.headers,
        }
    }
}

/// Engine context for one invocation
pub struct Session<S = Box<dyn TabularSource>> {
    source: S,
    config: EngineConfig,
    handles: HashMap<String, SheetHandle>,
    date_columns: HashMap<String, BTreeSet<u32>>,
    date_heuristic_available: bool,
}

impl<S: TabularSource> Session<S> {
    /// Create a session with the default configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    /// Create a session with an explicit configuration
    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            handles: HashMap::new(),
            date_columns: HashMap::new(),
            date_heuristic_available: true,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Underlying source, mutably
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.source.sheet_names()
    }

    /// Size of the source in bytes
    pub fn size_bytes(&self) -> u64 {
        self.source.size_bytes()
    }

    /// Resolve an optional sheet name, defaulting to the first sheet
    pub fn resolve_sheet(&self, sheet: Option<&str>) -> Result<String> {
        let available = self.source.sheet_names();
        match sheet {
            Some(name) if available.iter().any(|s| s == name) => Ok(name.to_string()),
            Some(name) => Err(Error::SheetNotFound {
                name: name.to_string(),
                available,
            }),
            None => available
                .into_iter()
                .next()
                .ok_or_else(|| Error::Source("source has no sheets".into())),
        }
    }

    /// Metadata for a sheet, probing it on first use
    pub fn handle(&mut self, sheet: &str) -> Result<&SheetHandle> {
        if !self.handles.contains_key(sheet) {
            let probe = self.source.probe(sheet)?;
            debug!(
                sheet,
                rows = probe.total_rows,
                cols = probe.total_cols,
                "probed sheet"
            );
            self.handles.insert(sheet.to_string(), probe.into());
        }
        self.handles
            .get(sheet)
            .ok_or_else(|| Error::Source(format!("sheet '{sheet}' vanished from cache")))
    }

    /// Whether date classification has worked so far in this session
    pub fn date_heuristic_available(&self) -> bool {
        self.date_heuristic_available
    }

    /// 0-based columns of `sheet` whose sample-row format looks like a date
    ///
    /// Never fails: a source without format information switches the
    /// heuristic off for the rest of the session, and any other failure
    /// yields an empty set for this sheet.
    pub fn date_columns(&mut self, sheet: &str) -> BTreeSet<u32> {
        if !self.date_heuristic_available {
            return BTreeSet::new();
        }
        if let Some(cols) = self.date_columns.get(sheet) {
            return cols.clone();
        }

        let cols = match self.source.number_formats(sheet, self.config.date_sample_row) {
            Ok(formats) => sheetlens_core::dates::classify(formats.iter().map(Option::as_ref)),
            Err(Error::Unsupported(what)) => {
                debug!(sheet, what, "date detection unavailable for this source");
                self.date_heuristic_available = false;
                return BTreeSet::new();
            }
            Err(err) => {
                debug!(sheet, error = %err, "date detection failed; skipping conversion");
                BTreeSet::new()
            }
        };
        self.date_columns.insert(sheet.to_string(), cols.clone());
        cols
    }

    /// Drop all cached metadata and re-enable date detection
    pub fn reset_caches(&mut self) {
        self.handles.clear();
        self.date_columns.clear();
        self.date_heuristic_available = true;
    }

    /// Convert date serials in place
    ///
    /// `source_cols[i]` is the sheet column that block column `i` came from.
    pub(crate) fn convert_dates(&mut self, sheet: &str, block: &mut DataBlock, source_cols: &[u32]) {
        let date_cols = self.date_columns(sheet);
        if date_cols.is_empty() {
            return;
        }
        let eps = self.config.date_time_epsilon;
        for (i, col) in source_cols.iter().enumerate() {
            if date_cols.contains(col) {
                block.map_column(i, |cell| convert_cell(cell, eps));
            }
        }
    }
}
