//! Prelude module - common imports for sheetlens users
//!
//! ```rust
//! use sheetlens::prelude::*;
//! ```

pub use crate::{
    open,
    open_session,
    Cell,
    DataBlock,
    EngineConfig,
    FormulaReader,
    // Error types
    Error,
    MatchMode,
    MemorySource,
    MultiRangeSpec,
    ProfileOptions,
    Profiler,
    RangeReader,
    RangeSpec,
    ReadOptions,
    Result,
    SearchEngine,
    SearchOptions,
    // Main types
    Session,
    SheetWindow,
    TabularSource,
};
