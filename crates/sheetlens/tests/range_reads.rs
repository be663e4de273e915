//! Range read behavior across the direct, batch and chunked paths

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sheetlens::prelude::*;
use sheetlens::{CellAddress, RangeRead};

/// `rows` x `cols` grid with a header row; cell (r, c) holds `r * 100 + c`
fn grid(rows: u32, cols: u32) -> MemorySource {
    let mut data = vec![(0..cols).map(|c| Cell::string(format!("H{c}"))).collect::<Vec<_>>()];
    for r in 2..=rows {
        data.push((0..cols).map(|c| Cell::Int((r * 100 + c) as i64)).collect());
    }
    MemorySource::new().with_sheet("Grid", data)
}

fn spec(text: &str) -> RangeSpec {
    RangeSpec::parse(text).unwrap()
}

#[test]
fn test_columns_past_sheet_width_are_clamped() {
    let mut session = Session::new(grid(5, 3));
    let read = RangeReader::new(&mut session)
        .read_range(None, &spec("A1:Z3"))
        .unwrap();

    assert_eq!(read.block.headers, vec!["A", "B", "C"]);
    assert_eq!(read.block.height(), 3);
    let warning = read.warning.unwrap();
    assert!(warning.contains("23 column(s) omitted"), "{warning}");
    assert!(warning.contains("through C"));
}

#[test]
fn test_batch_matches_single_reads() {
    let specs = vec![spec("A2:B3"), spec("C4:D5")];

    let mut batch_session = Session::new(grid(6, 4));
    let batch = RangeReader::new(&mut batch_session)
        .read_ranges(None, &specs)
        .unwrap();
    assert_eq!(batch_session.source().load_count(), 1);

    let mut single_session = Session::new(grid(6, 4));
    let mut reader = RangeReader::new(&mut single_session);
    let single: Vec<RangeRead> = specs
        .iter()
        .map(|s| reader.read_range(None, s).unwrap())
        .collect();

    assert_eq!(batch, single);
    assert_eq!(batch[1].block.rows[0], vec![Cell::Int(402), Cell::Int(403)]);
}

#[test]
fn test_sheet_context_carries_forward() {
    let source = MemorySource::new()
        .with_sheet("Intro", vec![vec![Cell::from("skip me")]])
        .with_sheet(
            "2022",
            (1..=6)
                .map(|r| vec![Cell::Int(r), Cell::Int(r * 10), Cell::Int(r * 100)])
                .collect(),
        );
    let mut session = Session::new(source);
    let list = MultiRangeSpec::parse("2022!A1:B2,C5:C6").unwrap();
    let reads = RangeReader::new(&mut session)
        .read_ranges(None, list.as_slice())
        .unwrap();

    assert_eq!(reads.len(), 2);
    assert!(reads.iter().all(|r| r.sheet == "2022"));
    assert_eq!(reads[1].range, "C5:C6");
    assert_eq!(reads[1].block.rows, vec![vec![Cell::Int(500)], vec![Cell::Int(600)]]);
}

#[test]
fn test_compaction_toggle() {
    let rows = vec![
        vec![Cell::from("a"), Cell::from("b"), Cell::from("c"), Cell::from("d")],
        vec![Cell::Int(1), Cell::Null, Cell::Int(3), Cell::Int(4)],
        vec![Cell::Int(5), Cell::Null, Cell::Int(7), Cell::Int(8)],
    ];
    let source = || MemorySource::new().with_sheet("S", rows.clone());

    let mut session = Session::new(source());
    let compacted = RangeReader::new(&mut session)
        .read_range(None, &spec("A2:D3"))
        .unwrap();
    assert_eq!(compacted.block.headers, vec!["A", "C", "D"]);

    let mut session = Session::new(source());
    let options = ReadOptions {
        compact: false,
        ..Default::default()
    };
    let full = RangeReader::with_options(&mut session, options)
        .read_range(None, &spec("A2:D3"))
        .unwrap();
    assert_eq!(full.block.width(), 4);
}

#[test]
fn test_chunked_reads_match_direct() {
    let chunky = EngineConfig {
        chunk_threshold_bytes: 0,
        chunk_rows: 3,
        ..Default::default()
    };
    let window = SheetWindow {
        offset: 1,
        limit: 10,
        no_header: false,
    };

    let mut direct = Session::new(grid(20, 3));
    let mut chunked = Session::with_config(grid(20, 3), chunky);

    let a = RangeReader::new(&mut direct).read_sheet(None, window).unwrap();
    let b = RangeReader::new(&mut chunked).read_sheet(None, window).unwrap();
    assert_eq!(a, b);
    assert!(a.truncated);
    assert!(chunked.source().load_count() > 1);

    let a = RangeReader::new(&mut direct).read_range(None, &spec("B3:C19")).unwrap();
    let b = RangeReader::new(&mut chunked).read_range(None, &spec("B3:C19")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_header_resolution_in_batch() {
    let mut session = Session::new(grid(6, 4));
    let options = ReadOptions {
        resolve_headers: true,
        ..Default::default()
    };
    let reads = RangeReader::with_options(&mut session, options)
        .read_ranges(None, &[spec("B2:B3"), spec("D5:D6")])
        .unwrap();
    assert_eq!(reads[0].block.headers, vec!["H1"]);
    assert_eq!(reads[1].block.headers, vec!["H3"]);
    assert_eq!(reads[1].column_map.as_ref().unwrap()["D"], "H3");
}

fn rect() -> impl Strategy<Value = String> {
    (1u32..10, 0u32..6, 1u32..10, 0u32..6).prop_map(|(r1, c1, r2, c2)| {
        let a = CellAddress::new(c1, r1);
        let b = CellAddress::new(c2, r2);
        format!("{a}:{b}")
    })
}

proptest! {
    #[test]
    fn batch_and_single_reads_agree(first in rect(), second in rect()) {
        let specs = vec![spec(&first), spec(&second)];

        let mut batch_session = Session::new(grid(7, 4));
        let batch = RangeReader::new(&mut batch_session).read_ranges(None, &specs).unwrap();

        let mut single_session = Session::new(grid(7, 4));
        let mut reader = RangeReader::new(&mut single_session);
        let single: Vec<RangeRead> = specs.iter().map(|s| reader.read_range(None, s).unwrap()).collect();

        prop_assert_eq!(batch, single);
    }
}
