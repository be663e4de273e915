//! sheetlens CLI - bounded reads, search and profiling of spreadsheets

mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use sheetlens::prelude::*;
use sheetlens::{CsvWriteOptions, CsvWriter, ErrorReport, RangeRead};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::output::{elapsed_ms, print_json, print_raw, Output};

#[derive(Parser)]
#[command(name = "sheetlens")]
#[command(
    author,
    version,
    about = "Bounded reads, search and profiling for large spreadsheets"
)]
struct Cli {
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file overriding engine limits and thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Leave out provenance and file-size metadata
    #[arg(long, global = true)]
    no_meta: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a range, several ranges, or a window of a sheet
    Read(ReadArgs),

    /// Find cells containing a value or matching a pattern
    Search(SearchArgs),

    /// Profile sheets: dimensions and headers, optionally types, stats and samples
    Probe(ProbeArgs),

    /// List the sheets of a workbook with their dimensions
    Sheets {
        /// Input spreadsheet file
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Args)]
struct ReadArgs {
    /// Input spreadsheet file (xlsx, xlsm, xlsb, xls, ods, csv)
    input: PathBuf,

    /// Range such as `A1:C10`, `Sheet1!A1:C10` or `2022!H54:AT54,H149:AT149`
    range: Option<String>,

    /// Sheet name (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Rows to return when reading a whole sheet
    #[arg(short, long)]
    limit: Option<usize>,

    /// Data rows to skip when reading a whole sheet
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Output format for single reads
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Sort rows by this output column
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    descending: bool,

    /// Treat row 1 as data and name columns by letter
    #[arg(long)]
    no_header: bool,

    /// Resolve column letters to row-1 header names in range reads
    #[arg(long)]
    headers: bool,

    /// Drop fully-null columns (default)
    #[arg(long, overrides_with = "no_compact")]
    compact: bool,

    /// Keep fully-null columns
    #[arg(long, overrides_with = "compact")]
    no_compact: bool,

    /// Read the same range(s) from every sheet
    #[arg(long)]
    all_sheets: bool,

    /// Round floats to N decimal places
    #[arg(short, long)]
    precision: Option<u32>,

    /// List cells with their formula text (workbooks only)
    #[arg(long, conflicts_with_all = ["all_sheets", "sort"])]
    formulas: bool,
}

impl ReadArgs {
    /// `--compact` and `--no-compact` override each other; the last one wins
    fn compact(&self) -> bool {
        self.compact || !self.no_compact
    }
}

#[derive(Args)]
struct SearchArgs {
    /// Input spreadsheet file
    input: PathBuf,

    /// Search term or pattern
    query: String,

    /// Treat the query as a regular expression
    #[arg(short, long)]
    regex: bool,

    /// Case-insensitive matching
    #[arg(short, long)]
    ignore_case: bool,

    /// Search only this sheet (default: every sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Comma separated column letters or header names to search
    #[arg(short, long)]
    columns: Option<String>,

    /// Restrict the search to a range, e.g. `Sheet1!A1:D500`
    #[arg(long)]
    range: Option<String>,

    /// Maximum matches to return
    #[arg(short, long)]
    limit: Option<usize>,

    /// Treat row 1 as data
    #[arg(long)]
    no_header: bool,

    /// Search formula text instead of values (workbooks only)
    #[arg(long)]
    in_formulas: bool,
}

#[derive(Args)]
struct ProbeArgs {
    /// Input spreadsheet file
    input: PathBuf,

    /// Profile only this sheet
    #[arg(short, long)]
    sheet: Option<String>,

    /// Head and tail rows to include per sheet
    #[arg(short = 'n', long, default_value_t = 0)]
    sample: usize,

    /// Numeric, string and date summaries (implies --types)
    #[arg(long)]
    stats: bool,

    /// Column types and null counts
    #[arg(long)]
    types: bool,

    /// Types, stats and a 3-row sample
    #[arg(long)]
    full: bool,

    /// Treat row 1 as data and look for header-like rows
    #[arg(long)]
    no_header: bool,

    /// Profile at most this many columns per sheet
    #[arg(long)]
    max_columns: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = match err.downcast_ref::<sheetlens::Error>() {
                Some(e) => e.report(),
                None => ErrorReport {
                    error: true,
                    code: "SOURCE_ERROR",
                    message: format!("{:#}", err),
                    suggestions: Vec::new(),
                },
            };
            if let Err(e) = print_json(&report) {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays pure JSON
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let out = Output::new(!cli.no_meta);

    match &cli.command {
        Commands::Read(args) => read(args, config, &out),
        Commands::Search(args) => search(args, config, &out),
        Commands::Probe(args) => probe(args, config, &out),
        Commands::Sheets { input } => list_sheets(input, config, &out),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config '{}'", path.display()))?;
    let config = EngineConfig::from_json_str(&text)?;
    debug!(path = %path.display(), "loaded engine config");
    Ok(config)
}

fn read(args: &ReadArgs, config: EngineConfig, out: &Output) -> Result<()> {
    let start = Instant::now();
    let mut session = open_session(&args.input, config)?;

    let specs: Vec<RangeSpec> = match &args.range {
        Some(text) => MultiRangeSpec::parse(text)?.into_vec(),
        None => Vec::new(),
    };
    if args.formulas {
        return read_formulas(args, session, &specs, start, out);
    }
    let multi = specs.len() > 1 || args.all_sheets;

    let options = ReadOptions {
        compact: args.compact(),
        // Multi-result reads resolve headers unless row 1 is data
        resolve_headers: (args.headers || multi) && !args.no_header,
        precision: args.precision,
        sort: args.sort.clone().map(|column| (column, args.descending)),
    };
    let window = SheetWindow {
        offset: args.offset,
        limit: args.limit.unwrap_or(session.config().default_read_limit),
        no_header: args.no_header,
    };

    let sheets: Vec<Option<String>> = if args.all_sheets {
        session.sheet_names().into_iter().map(Some).collect()
    } else {
        vec![args.sheet.clone()]
    };
    // Every sheet gets the same ranges, whatever sheet they were written against
    let specs: Vec<RangeSpec> = if args.all_sheets {
        specs
            .into_iter()
            .map(|mut spec| {
                spec.sheet = None;
                spec
            })
            .collect()
    } else {
        specs
    };

    let mut reader = RangeReader::with_options(&mut session, options);
    let mut reads = Vec::new();
    for sheet in &sheets {
        if specs.is_empty() {
            reads.push(reader.read_sheet(sheet.as_deref(), window)?);
        } else {
            reads.extend(reader.read_ranges(sheet.as_deref(), &specs)?);
        }
    }
    let read_time_ms = elapsed_ms(start);
    let size = session.size_bytes();

    if multi {
        if args.format == Format::Csv {
            warn!("--format csv applies to single reads; writing JSON");
        }
        let results = reads.iter().map(result_entry).collect::<Result<Vec<_>>>()?;
        let mut body = Map::new();
        body.insert("total_ranges".into(), json!(results.len()));
        body.insert("results".into(), Value::Array(results));
        body.insert("compact".into(), json!(args.compact()));
        body.insert("read_time_ms".into(), json!(read_time_ms));
        return out.data(body, size);
    }

    let read = reads.into_iter().next().context("Nothing was read")?;
    if args.format == Format::Csv {
        let text = CsvWriter::to_csv_string(&read.block, &CsvWriteOptions::default())?;
        return print_raw(&text);
    }
    let body = single_body(&read, backend_name(&args.input), read_time_ms)?;
    out.data(body, size)
}

fn read_formulas(
    args: &ReadArgs,
    mut session: Session,
    specs: &[RangeSpec],
    start: Instant,
    out: &Output,
) -> Result<()> {
    if specs.len() > 1 {
        anyhow::bail!("--formulas reads one range at a time");
    }
    let window = SheetWindow {
        offset: args.offset,
        limit: args.limit.unwrap_or(session.config().default_read_limit),
        no_header: true,
    };
    let mut reader = FormulaReader::new(&mut session).precision(args.precision);
    if !args.compact() {
        reader = reader.keep_blank();
    }
    let read = reader.read(args.sheet.as_deref(), specs.first(), window)?;

    let mut body = Map::new();
    body.insert("range".into(), json!(read.range));
    body.insert("sheet".into(), json!(read.sheet));
    body.insert("cells".into(), serde_json::to_value(&read.cells)?);
    body.insert("cell_count".into(), json!(read.cell_count));
    body.insert("truncated".into(), json!(read.truncated));
    body.insert("backend".into(), json!(backend_name(&args.input)));
    body.insert("read_time_ms".into(), json!(elapsed_ms(start)));
    out.data(body, session.size_bytes())
}

/// Payload for a single read
fn single_body(read: &RangeRead, backend: &str, read_time_ms: f64) -> Result<Map<String, Value>> {
    let mut body = Map::new();
    body.insert("range".into(), json!(read.range));
    body.insert("sheet".into(), json!(read.sheet));
    body.insert(
        "dimensions".into(),
        json!({ "rows": read.block.height(), "cols": read.block.width() }),
    );
    body.insert("headers".into(), json!(read.block.headers));
    body.insert("data".into(), serde_json::to_value(&read.block.rows)?);
    body.insert("row_count".into(), json!(read.block.height()));
    body.insert("truncated".into(), json!(read.truncated));
    body.insert("backend".into(), json!(backend));
    body.insert("read_time_ms".into(), json!(read_time_ms));
    insert_extras(&mut body, read);
    Ok(body)
}

/// One entry of a multi-result read
fn result_entry(read: &RangeRead) -> Result<Value> {
    let mut entry = Map::new();
    entry.insert("range".into(), json!(read.range));
    entry.insert("sheet".into(), json!(read.sheet));
    entry.insert("headers".into(), json!(read.block.headers));
    entry.insert("data".into(), serde_json::to_value(&read.block.rows)?);
    entry.insert("row_count".into(), json!(read.block.height()));
    if read.truncated {
        entry.insert("truncated".into(), json!(true));
    }
    insert_extras(&mut entry, read);
    Ok(Value::Object(entry))
}

fn insert_extras(body: &mut Map<String, Value>, read: &RangeRead) {
    if let Some(map) = read.column_map.as_ref().filter(|m| !m.is_empty()) {
        body.insert("column_map".into(), json!(map));
    }
    if let Some(warning) = &read.warning {
        body.insert("warning".into(), json!(warning));
    }
}

/// Provider that serves files with this extension
fn backend_name(path: &Path) -> &'static str {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        "csv"
    } else {
        "calamine"
    }
}

fn search(args: &SearchArgs, config: EngineConfig, out: &Output) -> Result<()> {
    let start = Instant::now();
    let mut session = open_session(&args.input, config)?;

    let options = SearchOptions {
        mode: if args.regex {
            MatchMode::Regex
        } else {
            MatchMode::Literal
        },
        case_sensitive: !args.ignore_case,
        columns: args.columns.clone(),
        scope: args.range.as_deref().map(RangeSpec::parse).transpose()?,
        limit: args.limit,
        no_header: args.no_header,
        sheet: args.sheet.clone(),
        in_formulas: args.in_formulas,
    };
    let result = SearchEngine::new(&mut session).search(&args.query, &options)?;

    let mut body = Map::new();
    body.insert("query".into(), json!(result.query));
    body.insert("match_count".into(), json!(result.matches.len()));
    body.insert("matches".into(), serde_json::to_value(&result.matches)?);
    body.insert("truncated".into(), json!(result.truncated));
    body.insert("search_time_ms".into(), json!(elapsed_ms(start)));
    out.data(body, session.size_bytes())
}

fn probe(args: &ProbeArgs, config: EngineConfig, out: &Output) -> Result<()> {
    let start = Instant::now();
    let mut session = open_session(&args.input, config)?;

    let mut options = ProfileOptions {
        types: args.types,
        stats: args.stats,
        sample: args.sample,
        no_header: args.no_header,
        max_columns: args.max_columns,
    };
    if args.full {
        options.types = true;
        options.stats = true;
        options.sample = options.sample.max(3);
    }
    let report = Profiler::new(&mut session, options).profile(args.sheet.as_deref())?;

    let size = session.size_bytes();
    let mut body = Map::new();
    body.insert("file".into(), json!(file_name(&args.input)));
    body.insert("size_bytes".into(), json!(size));
    body.insert("file_size_human".into(), json!(sheetlens::shape::human_size(size)));
    body.insert("format".into(), json!(extension(&args.input)));
    body.insert("probe_time_ms".into(), json!(elapsed_ms(start)));
    if let Value::Object(fields) = serde_json::to_value(&report)? {
        body.extend(fields);
    }
    out.data(body, size)
}

fn list_sheets(input: &Path, config: EngineConfig, out: &Output) -> Result<()> {
    let mut session = open_session(input, config)?;
    let names = session.sheet_names();

    let mut sheets = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let handle = session.handle(name)?;
        sheets.push(json!({
            "name": name,
            "index": index,
            "rows": handle.total_rows,
            "cols": handle.total_cols,
            "last_col": handle.last_col(),
        }));
    }

    let mut body = Map::new();
    body.insert("file".into(), json!(file_name(input)));
    body.insert("sheet_count".into(), json!(sheets.len()));
    body.insert("sheets".into(), Value::Array(sheets));
    out.data(body, session.size_bytes())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
