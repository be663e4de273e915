//! Value search
//!
//! Scans columns top to bottom, one column at a time, sheet by sheet, and
//! stops as soon as one match more than the limit has been seen. Matched
//! values in date-like columns are reported as ISO dates.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use sheetlens_core::column::{index_to_letter, letter_to_index};
use sheetlens_core::dates::convert_cell;
use sheetlens_core::range::RangeBounds;
use sheetlens_core::{Cell, DataBlock, Error, LoadRequest, RangeSpec, Result, TabularSource};
use tracing::debug;

use crate::chunked::ChunkedLoader;
use crate::rows::RowMapping;
use crate::session::{Session, SheetHandle};
use crate::shape;

/// How the query is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Substring match
    #[default]
    Literal,
    /// Regular expression, matched anywhere in the value
    Regex,
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub mode: MatchMode,
    /// Match case exactly
    pub case_sensitive: bool,
    /// Comma separated column letters or row-1 header names to search
    pub columns: Option<String>,
    /// Restrict the search to one rectangle; its sheet prefix wins over `sheet`
    pub scope: Option<RangeSpec>,
    /// Maximum matches to return; the configured default when unset
    pub limit: Option<usize>,
    /// Treat row 1 as data
    pub no_header: bool,
    /// Search only this sheet instead of every sheet
    pub sheet: Option<String>,
    /// Match formula text instead of cell values
    pub in_formulas: bool,
}

impl SearchOptions {
    /// Literal, case-sensitive search with defaults for everything else
    pub fn new() -> Self {
        Self {
            case_sensitive: true,
            ..Default::default()
        }
    }
}

/// One matching cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub sheet: String,
    /// Column letter
    pub column: String,
    /// 1-based spreadsheet row
    pub row: u32,
    /// Cell reference, e.g. `B7`
    pub cell: String,
    /// Matched value; left out for formula matches
    #[serde(skip_serializing_if = "Cell::is_null")]
    pub value: Cell,
    /// Matched formula text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// Matches plus whether more were found than returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub matches: Vec<SearchMatch>,
    pub truncated: bool,
}

enum Matcher {
    Literal { needle: String, case_sensitive: bool },
    Regex(Regex),
}

impl Matcher {
    fn new(query: &str, options: &SearchOptions) -> Result<Self> {
        match options.mode {
            MatchMode::Literal => Ok(Matcher::Literal {
                needle: if options.case_sensitive {
                    query.to_string()
                } else {
                    query.to_lowercase()
                },
                case_sensitive: options.case_sensitive,
            }),
            MatchMode::Regex => RegexBuilder::new(query)
                .case_insensitive(!options.case_sensitive)
                .build()
                .map(Matcher::Regex)
                .map_err(|e| Error::InvalidPattern {
                    pattern: query.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Literal {
                needle,
                case_sensitive: true,
            } => text.contains(needle.as_str()),
            Matcher::Literal { needle, .. } => text.to_lowercase().contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

/// Resolve a column filter to 0-based sheet columns
///
/// Entries are matched against row-1 header names first, then read as
/// column letters. Duplicates are dropped; order is kept. Entries matching
/// neither are reported together in one error.
pub fn resolve_column_filter(spec: &str, headers: &[String]) -> Result<Vec<u32>> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    let mut unknown = Vec::new();

    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let col = match headers.iter().position(|h| h == entry) {
            Some(i) => Some(i as u32),
            None if is_column_letters(entry) => letter_to_index(entry)
                .ok()
                .filter(|&c| (c as usize) < headers.len()),
            None => None,
        };
        match col {
            Some(c) => {
                if seen.insert(c) {
                    resolved.push(c);
                }
            }
            None => unknown.push(entry.to_string()),
        }
    }

    if !unknown.is_empty() {
        return Err(Error::InvalidColumnFilter {
            spec: unknown.join(", "),
            available: headers.to_vec(),
        });
    }
    Ok(resolved)
}

fn is_column_letters(s: &str) -> bool {
    !s.is_empty() && s.len() <= 3 && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn capped_result(query: &str, matches: Vec<SearchMatch>, limit: usize) -> SearchResult {
    let capped = shape::cap_list(matches, limit);
    SearchResult {
        query: query.to_string(),
        matches: capped.items,
        truncated: capped.truncated,
    }
}

/// A loaded slice of one sheet ready to scan
struct Scan {
    block: DataBlock,
    /// Spreadsheet row of block index 0 and onward
    mapping: RowMapping,
    /// Sheet column of each block column
    columns: Vec<u32>,
}

/// Searches sheets through a [`Session`]
pub struct SearchEngine<'a, S> {
    session: &'a mut Session<S>,
    loader: ChunkedLoader,
}

impl<'a, S: TabularSource> SearchEngine<'a, S> {
    pub fn new(session: &'a mut Session<S>) -> Self {
        let loader = ChunkedLoader::from_config(session.config());
        Self { session, loader }
    }

    /// Run a search
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> Result<SearchResult> {
        let matcher = Matcher::new(query, options)?;
        let config = self.session.config();
        let limit = options
            .limit
            .unwrap_or(config.default_search_limit)
            .clamp(1, config.max_search_limit);

        let scope_sheet = options.scope.as_ref().and_then(|s| s.sheet.as_deref());
        let sheets = match scope_sheet.or(options.sheet.as_deref()) {
            Some(name) => vec![self.session.resolve_sheet(Some(name))?],
            None => self.session.sheet_names(),
        };
        if options.in_formulas {
            return self.search_formulas(query, &matcher, &sheets, options, limit);
        }

        let mut matches = Vec::new();
        for sheet in &sheets {
            let handle = self.session.handle(sheet)?.clone();
            let scan = self.load(&handle, options)?;
            if scan.block.is_empty() {
                continue;
            }

            let wanted = match &options.columns {
                Some(spec) => resolve_column_filter(spec, handle.headers())?,
                None => scan.columns.clone(),
            };
            let date_cols = self.session.date_columns(sheet);
            let eps = self.session.config().date_time_epsilon;

            for col in wanted {
                let Some(pos) = scan.columns.iter().position(|&c| c == col) else {
                    continue;
                };
                for (idx, cell) in scan.block.column(pos).enumerate() {
                    let Some(text) = cell.search_text() else {
                        continue;
                    };
                    if !matcher.is_match(&text) {
                        continue;
                    }

                    let value = if date_cols.contains(&col) {
                        convert_cell(cell, eps)
                    } else {
                        cell.clone()
                    };
                    let column = index_to_letter(col);
                    let row = scan.mapping.sheet_row(idx);
                    matches.push(SearchMatch {
                        sheet: sheet.clone(),
                        cell: format!("{}{}", column, row),
                        column,
                        row,
                        value,
                        formula: None,
                    });

                    if matches.len() > limit {
                        return Ok(capped_result(query, matches, limit));
                    }
                }
            }
        }

        Ok(capped_result(query, matches, limit))
    }

    /// Match formula text cell by cell, row-major within each sheet
    ///
    /// Only the scope rectangle and column filter narrow the cells; values
    /// are never loaded.
    fn search_formulas(
        &mut self,
        query: &str,
        matcher: &Matcher,
        sheets: &[String],
        options: &SearchOptions,
        limit: usize,
    ) -> Result<SearchResult> {
        let scope = options.scope.as_ref().map(RangeSpec::bounds);
        let mut matches = Vec::new();

        for sheet in sheets {
            let wanted = match &options.columns {
                Some(spec) => Some(resolve_column_filter(spec, self.session.handle(sheet)?.headers())?),
                None => None,
            };
            let formulas = self.session.source_mut().formulas(sheet)?;
            debug!(sheet = %sheet, formulas = formulas.len(), "formula search");

            for cell in formulas {
                let row = cell.row + 1;
                let in_scope = scope.map_or(true, |b| {
                    (b.start_row..=b.end_row).contains(&row)
                        && (b.start_col..=b.end_col).contains(&cell.col)
                });
                let in_columns = wanted.as_ref().map_or(true, |w| w.contains(&cell.col));
                if !in_scope || !in_columns || !matcher.is_match(&cell.formula) {
                    continue;
                }

                let column = index_to_letter(cell.col);
                matches.push(SearchMatch {
                    sheet: sheet.clone(),
                    cell: format!("{}{}", column, row),
                    column,
                    row,
                    value: Cell::Null,
                    formula: Some(cell.formula),
                });
                if matches.len() > limit {
                    return Ok(capped_result(query, matches, limit));
                }
            }
        }

        Ok(capped_result(query, matches, limit))
    }

    fn load(&mut self, handle: &SheetHandle, options: &SearchOptions) -> Result<Scan> {
        let sheet = handle.name.as_str();
        let Some(scope) = &options.scope else {
            let header = !options.no_header;
            let request = LoadRequest {
                header,
                ..Default::default()
            };
            let block = self.loader.load(self.session.source_mut(), sheet, &request)?;
            let columns = (0..block.width() as u32).collect();
            return Ok(Scan {
                block,
                mapping: RowMapping::new(header, 0),
                columns,
            });
        };

        let bounds = scope.bounds();
        let columns: Vec<u32> = (bounds.start_col..=bounds.end_col)
            .filter(|&c| c < handle.total_cols)
            .collect();

        if self.session.size_bytes() >= self.session.config().search_full_load_threshold_bytes {
            debug!(sheet, "scoped search: full load then slice");
            self.load_then_slice(sheet, bounds, columns)
        } else {
            debug!(sheet, "scoped search: windowed load");
            let mapping = RowMapping::starting_at(false, bounds.start_row);
            let request = LoadRequest::headerless()
                .skip(mapping.skip())
                .take(bounds.height() as usize)
                .columns(columns.clone());
            let block = self.loader.load(self.session.source_mut(), sheet, &request)?;
            Ok(Scan {
                block,
                mapping,
                columns,
            })
        }
    }

    fn load_then_slice(&mut self, sheet: &str, bounds: RangeBounds, columns: Vec<u32>) -> Result<Scan> {
        let full = self
            .loader
            .load(self.session.source_mut(), sheet, &LoadRequest::headerless())?;
        let mapping = RowMapping::new(false, 0);
        let start = mapping.block_index(bounds.start_row).unwrap_or(0);
        let end = mapping.block_index(bounds.end_row).map_or(0, |i| i + 1);
        let picked: Vec<usize> = columns.iter().map(|&c| c as usize).collect();
        Ok(Scan {
            block: full.slice_rows(start, end).select_columns(&picked),
            mapping: mapping.advanced(start),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetlens_core::{FormulaCell, MemorySource, NumberFormat};

    fn source() -> MemorySource {
        let mut rows = vec![vec![Cell::from("Item"), Cell::from("Note"), Cell::from("Due")]];
        for i in 1..=6i64 {
            rows.push(vec![
                Cell::string(format!("widget-{i}")),
                Cell::from(if i % 2 == 0 { "Urgent" } else { "later" }),
                Cell::Float(45000.0 + i as f64),
            ]);
        }
        MemorySource::new()
            .with_sheet("Stock", rows)
            .with_sheet(
                "Archive",
                vec![vec![Cell::from("Item")], vec![Cell::from("old widget")]],
            )
            .with_formats(
                "Stock",
                2,
                vec![None, None, Some(NumberFormat::from_id(NumberFormat::ID_DATE_SHORT))],
            )
    }

    #[test]
    fn test_literal_across_sheets() {
        let mut session = Session::new(source());
        let result = SearchEngine::new(&mut session)
            .search("widget", &SearchOptions::new())
            .unwrap();
        assert_eq!(result.matches.len(), 7);
        assert!(!result.truncated);
        assert_eq!(result.matches[0].cell, "A2");
        assert_eq!(result.matches[6].sheet, "Archive");
        assert_eq!(result.matches[6].row, 2);
    }

    #[test]
    fn test_case_and_regex() {
        let mut session = Session::new(source());
        let mut engine = SearchEngine::new(&mut session);

        let exact = engine.search("urgent", &SearchOptions::new()).unwrap();
        assert!(exact.matches.is_empty());

        let loose = SearchOptions {
            case_sensitive: false,
            ..SearchOptions::new()
        };
        assert_eq!(engine.search("urgent", &loose).unwrap().matches.len(), 3);

        let regex = SearchOptions {
            mode: MatchMode::Regex,
            ..SearchOptions::new()
        };
        let found = engine.search(r"^widget-[25]$", &regex).unwrap();
        let cells: Vec<_> = found.matches.iter().map(|m| m.cell.as_str()).collect();
        assert_eq!(cells, vec!["A3", "A6"]);

        let err = engine.search("(unclosed", &regex).unwrap_err();
        assert_eq!(err.code(), "INVALID_REGEX");
    }

    #[test]
    fn test_no_header_numbering() {
        let mut session = Session::new(source());
        let options = SearchOptions {
            no_header: true,
            sheet: Some("Stock".into()),
            ..SearchOptions::new()
        };
        let result = SearchEngine::new(&mut session).search("Item", &options).unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].cell, "A1");
    }

    #[test]
    fn test_column_filter_and_dates() {
        let mut session = Session::new(source());
        let options = SearchOptions {
            columns: Some("Due".into()),
            ..SearchOptions::new()
        };
        let result = SearchEngine::new(&mut session).search("45003", &options).unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].cell, "C4");
        assert_eq!(result.matches[0].value.to_string(), "2023-03-18");
    }

    #[test]
    fn test_resolve_column_filter() {
        let headers: Vec<String> = vec!["Item".into(), "Note".into(), "Due".into()];
        assert_eq!(resolve_column_filter("C, Item,A,C", &headers).unwrap(), vec![2, 0]);
        assert_eq!(resolve_column_filter("b,c", &headers).unwrap(), vec![1, 2]);
        let err = resolve_column_filter("Nope,Z", &headers).unwrap_err();
        assert_eq!(err.to_string(), "Column(s) not found: Nope, Z");
    }

    #[test]
    fn test_scope_strategies_agree() {
        let scope = RangeSpec::parse("Stock!A3:B6").unwrap();
        let options = SearchOptions {
            scope: Some(scope),
            sheet: Some("Archive".into()),
            case_sensitive: false,
            ..SearchOptions::new()
        };

        let mut windowed = Session::new(source());
        let a = SearchEngine::new(&mut windowed).search("e", &options).unwrap();

        let config = crate::EngineConfig {
            search_full_load_threshold_bytes: 0,
            ..Default::default()
        };
        let mut sliced = Session::with_config(source(), config);
        let b = SearchEngine::new(&mut sliced).search("e", &options).unwrap();

        assert_eq!(a, b);
        assert!(a.matches.iter().all(|m| m.sheet == "Stock" && (3..=6).contains(&m.row)));
        assert_eq!(a.matches[0].cell, "A3");
    }

    #[test]
    fn test_limit_truncates() {
        let mut session = Session::new(source());
        let options = SearchOptions {
            limit: Some(2),
            ..SearchOptions::new()
        };
        let result = SearchEngine::new(&mut session).search("widget", &options).unwrap();
        assert_eq!(result.matches.len(), 2);
        assert!(result.truncated);
    }

    #[test]
    fn test_formula_search() {
        let source = source().with_formulas(
            "Stock",
            vec![
                FormulaCell::new(1, 2, "TODAY()+1"),
                FormulaCell::new(3, 2, "SUM(C2:C3)"),
                FormulaCell::new(5, 0, "VLOOKUP(B2,Archive!A:A,1)"),
            ],
        );
        let mut session = Session::new(source);
        let mut engine = SearchEngine::new(&mut session);

        let options = SearchOptions {
            in_formulas: true,
            case_sensitive: false,
            ..SearchOptions::new()
        };
        let found = engine.search("sum(", &options).unwrap();
        assert_eq!(found.matches.len(), 1);
        assert_eq!(found.matches[0].cell, "C4");
        assert_eq!(found.matches[0].formula.as_deref(), Some("=SUM(C2:C3)"));
        assert_eq!(found.matches[0].value, Cell::Null);

        let scoped = SearchOptions {
            in_formulas: true,
            mode: MatchMode::Regex,
            scope: Some(RangeSpec::parse("Stock!A1:B10").unwrap()),
            ..SearchOptions::new()
        };
        let found = engine.search(r"^=[A-Z]+\(", &scoped).unwrap();
        let cells: Vec<_> = found.matches.iter().map(|m| m.cell.as_str()).collect();
        assert_eq!(cells, vec!["A6"]);

        let limited = SearchOptions {
            in_formulas: true,
            limit: Some(2),
            ..SearchOptions::new()
        };
        let found = engine.search("(", &limited).unwrap();
        assert_eq!(found.matches.len(), 2);
        assert!(found.truncated);
    }

    #[test]
    fn test_formula_search_needs_formula_support() {
        struct ValuesOnly(MemorySource);
        impl TabularSource for ValuesOnly {
            fn sheet_names(&self) -> Vec<String> {
                self.0.sheet_names()
            }
            fn size_bytes(&self) -> u64 {
                self.0.size_bytes()
            }
            fn probe(&mut self, sheet: &str) -> Result<sheetlens_core::SheetProbe> {
                self.0.probe(sheet)
            }
            fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock> {
                self.0.load(sheet, request)
            }
        }

        let mut session = Session::new(ValuesOnly(source()));
        let options = SearchOptions {
            in_formulas: true,
            ..SearchOptions::new()
        };
        let err = SearchEngine::new(&mut session).search("x", &options).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED");
    }
}
