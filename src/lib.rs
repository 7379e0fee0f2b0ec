//! # Plume
//!
//! An embedded inverted-index engine.
//!
//! ## Features
//!
//! - Static builds that invert a document stream with bounded memory
//! - Three-level on-disk index with two-stage binary search lookups
//! - A dynamic index that absorbs new documents and compacts in the background
//!   without readers ever seeing a partial state
//! - Query-time k-way merge with mandatory and optional terms
//! - Pluggable index and search strategies
//!
//! ## Layout
//!
//! A database directory holds the id map (`id`), fixed-size values
//! (`value.n*`), variable-size data (`data.d0`, `data.d1.blob.*`), the static
//! index (`static.index1/2/3`) and the dynamic index slots (`var.disk0/1.*`),
//! each described by a small JSON `*.stat` file.
pub mod config;
pub mod context;
pub mod data;
pub mod database;
mod error;
pub mod index;
pub mod indexer;
pub mod posting;
pub mod search;
pub mod storage;
pub mod store;
pub mod util;

// Re-exports for the public API
pub use config::{BuildConfig, DatabaseConfig, EngineConfig, EngineConfigBuilder, VarIndexConfig};
pub use context::Context;
pub use data::{
    InId, OutId, Posting, SearchResult, TermInDoc, TermInQuery, TermSign, TermWeight,
};
pub use database::{DatabaseReader, DatabaseWriter, DbBuilder, DbSearcher, Refresher};
pub use error::{PlumeError, Result};
pub use indexer::{
    BuildStats, DocSource, IndexStrategy, LineSource, OnceSource, ParsedDoc, StaticIndexer,
    VarIndexer,
};
pub use posting::PostingList;
pub use search::{MergeEngine, MergeHit, SearchStrategy, Searcher};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
