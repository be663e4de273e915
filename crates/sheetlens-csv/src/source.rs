//! CSV-backed tabular source

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use sheetlens_core::source::{header_names, load_window};
use sheetlens_core::{DataBlock, Error, LoadRequest, Result, SheetProbe, TabularSource};

use crate::error::CsvResult;
use crate::options::CsvReadOptions;
use crate::reader::CsvReader;

/// A CSV file exposed as a single-sheet source
///
/// Every load re-reads the file from the start and stops as soon as the
/// requested window is filled, so nothing beyond one window is held in memory.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    sheet: String,
    size: u64,
    options: CsvReadOptions,
    probe: Option<SheetProbe>,
}

impl CsvSource {
    /// Open a CSV file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> CsvResult<Self> {
        Self::open_with(path, CsvReadOptions::default())
    }

    /// Open a CSV file
    pub fn open_with<P: AsRef<Path>>(path: P, options: CsvReadOptions) -> CsvResult<Self> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        let sheet = options.sheet_name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Sheet1".to_string())
        });
        debug!("opened csv source {:?} ({} bytes)", path, size);
        Ok(Self {
            path,
            sheet,
            size,
            options,
            probe: None,
        })
    }

    fn check_sheet(&self, sheet: &str) -> Result<()> {
        if sheet == self.sheet {
            Ok(())
        } else {
            Err(Error::SheetNotFound {
                name: sheet.to_string(),
                available: vec![self.sheet.clone()],
            })
        }
    }

    fn records(&self) -> CsvResult<impl Iterator<Item = CsvResult<Vec<String>>>> {
        let file = File::open(&self.path)?;
        Ok(CsvReader::records(file, &self.options))
    }
}

impl TabularSource for CsvSource {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet.clone()]
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn probe(&mut self, sheet: &str) -> Result<SheetProbe> {
        self.check_sheet(sheet)?;
        if let Some(probe) = &self.probe {
            return Ok(probe.clone());
        }

        // CSV has no index, so counting rows means one pass over the file
        let auto = self.options.auto_detect_types;
        let mut total_rows = 0u32;
        let mut total_cols = 0u32;
        let mut first = Vec::new();
        for record in self.records()? {
            let record = record?;
            if total_rows == 0 {
                first = record.iter().map(|f| CsvReader::convert(f, auto)).collect();
            }
            total_rows += 1;
            total_cols = total_cols.max(record.len() as u32);
        }

        let probe = SheetProbe {
            name: self.sheet.clone(),
            total_rows,
            total_cols,
            headers: header_names(&first, total_cols),
        };
        debug!("probed csv {:?}: {} rows x {} cols", self.path, total_rows, total_cols);
        self.probe = Some(probe.clone());
        Ok(probe)
    }

    fn load(&mut self, sheet: &str, request: &LoadRequest) -> Result<DataBlock> {
        let width = self.probe(sheet)?.total_cols;
        let auto = self.options.auto_detect_types;
        let records = self.records()?.map(|r| r.map_err(Error::from));
        load_window(records, width, request, |field: &String| {
            CsvReader::convert(field, auto)
        })
    }
}
