//! JSON output helpers

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sheetlens::shape::human_size;

/// Tag placed on every payload that carries spreadsheet content
const DATA_ORIGIN: &str = "untrusted_spreadsheet";

/// Writes command results to stdout
pub struct Output {
    meta: bool,
}

impl Output {
    pub fn new(meta: bool) -> Self {
        Self { meta }
    }

    /// Print a payload that carries spreadsheet content
    ///
    /// With metadata enabled the payload is prefixed with `_data_origin` and
    /// gains a `file_size_human` field.
    pub fn data(&self, body: Map<String, Value>, file_size: u64) -> Result<()> {
        let mut tagged = Map::new();
        if self.meta {
            tagged.insert("_data_origin".into(), json!(DATA_ORIGIN));
        }
        tagged.extend(body);
        if self.meta {
            tagged.insert("file_size_human".into(), json!(human_size(file_size)));
        }
        print_json(&tagged)
    }
}

/// Pretty-print any serializable value on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    Ok(())
}

/// Write raw text on stdout
pub fn print_raw(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    Ok(())
}

/// Milliseconds since `start`, to one decimal
pub fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 10_000.0).round() / 10.0
}
