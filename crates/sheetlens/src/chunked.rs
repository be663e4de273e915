//! Bounded-memory loading of oversized sources
//!
//! Large sources are read in fixed-size row chunks and concatenated. The
//! concatenation is identical to one direct load over the same window; only
//! peak memory differs.

use sheetlens_core::{DataBlock, LoadRequest, Result, TabularSource};
use tracing::{debug, trace};

use crate::config::EngineConfig;

/// How a load will be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// One load call
    Direct,
    /// Sequential loads of at most `chunk_rows` rows each
    Chunked { chunk_rows: usize },
}

/// Chooses between direct and chunked loads and runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedLoader {
    /// Sources smaller than this load directly
    pub threshold_bytes: u64,
    /// Rows per chunk
    pub chunk_rows: usize,
}

impl ChunkedLoader {
    /// Create a loader
    pub fn new(threshold_bytes: u64, chunk_rows: usize) -> Self {
        Self {
            threshold_bytes,
            chunk_rows,
        }
    }

    /// Loader using the configured threshold and chunk size
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.chunk_threshold_bytes, config.chunk_rows)
    }

    /// Strategy for a source of `size_bytes` and an optional row cap
    pub fn strategy(&self, size_bytes: u64, n_rows: Option<usize>) -> LoadStrategy {
        let small = size_bytes < self.threshold_bytes;
        let narrow = n_rows.map_or(false, |n| n <= self.chunk_rows);
        if small || narrow || self.chunk_rows == 0 {
            LoadStrategy::Direct
        } else {
            LoadStrategy::Chunked {
                chunk_rows: self.chunk_rows,
            }
        }
    }

    /// Load `request` from `sheet` with the chosen strategy
    pub fn load<S>(&self, source: &mut S, sheet: &str, request: &LoadRequest) -> Result<DataBlock>
    where
        S: TabularSource + ?Sized,
    {
        match self.strategy(source.size_bytes(), request.n_rows) {
            LoadStrategy::Direct => {
                debug!(sheet, "direct load");
                source.load(sheet, request)
            }
            LoadStrategy::Chunked { chunk_rows } => {
                debug!(sheet, chunk_rows, "chunked load");
                self.load_chunked(source, sheet, request, chunk_rows)
            }
        }
    }

    fn load_chunked<S>(
        &self,
        source: &mut S,
        sheet: &str,
        request: &LoadRequest,
        chunk_rows: usize,
    ) -> Result<DataBlock>
    where
        S: TabularSource + ?Sized,
    {
        let mut out = DataBlock::default();
        let mut offset = request.skip_rows;
        let mut loaded = 0usize;

        loop {
            let want = match request.n_rows {
                Some(target) => chunk_rows.min(target - loaded),
                None => chunk_rows,
            };
            if want == 0 {
                break;
            }

            let chunk = source.load(
                sheet,
                &LoadRequest {
                    header: request.header,
                    skip_rows: offset,
                    n_rows: Some(want),
                    columns: request.columns.clone(),
                },
            )?;
            let got = chunk.height();
            trace!(sheet, offset, got, "loaded chunk");

            out.append(chunk);
            loaded += got;
            offset += got;

            if got < want {
                break;
            }
        }

        Ok(out)
    }
}

impl Default for ChunkedLoader {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetlens_core::{Cell, MemorySource};

    fn big() -> MemorySource {
        let mut rows = vec![vec![Cell::from("n"), Cell::from("sq")]];
        rows.extend((1..=25).map(|i: i64| vec![Cell::Int(i), Cell::Int(i * i)]));
        MemorySource::new().with_sheet("S", rows).with_size_bytes(1_000)
    }

    #[test]
    fn test_strategy() {
        let loader = ChunkedLoader::new(100, 10);
        assert_eq!(loader.strategy(99, None), LoadStrategy::Direct);
        assert_eq!(loader.strategy(100, Some(10)), LoadStrategy::Direct);
        assert_eq!(
            loader.strategy(100, Some(11)),
            LoadStrategy::Chunked { chunk_rows: 10 }
        );
        assert_eq!(loader.strategy(100, None), LoadStrategy::Chunked { chunk_rows: 10 });
    }

    #[test]
    fn test_chunked_matches_direct() {
        let loader = ChunkedLoader::new(100, 4);
        for request in [
            LoadRequest::with_header(),
            LoadRequest::with_header().skip(3),
            LoadRequest::with_header().skip(2).take(13),
            LoadRequest::headerless().columns(vec![1]),
        ] {
            let mut direct_src = big();
            let direct = direct_src.load("S", &request).unwrap();

            let mut chunked_src = big();
            let chunked = loader.load(&mut chunked_src, "S", &request).unwrap();
            assert_eq!(chunked, direct);
            assert!(chunked_src.load_count() > 1);
        }
    }

    #[test]
    fn test_chunked_past_end() {
        let loader = ChunkedLoader::new(100, 4);
        let mut source = big();
        let block = loader
            .load(&mut source, "S", &LoadRequest::with_header().skip(100))
            .unwrap();
        assert!(block.is_empty());
        assert_eq!(block.headers, vec!["n", "sq"]);
    }
}
