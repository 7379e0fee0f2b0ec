//! Database facades.
//!
//! A database bundles id allocation, per-document values and payloads, and an
//! inverted index behind two traits. [`DbBuilder`] writes a fresh generation
//! through the static build; [`DbSearcher`] serves reads over it and absorbs
//! new documents into the dynamic index.

pub mod builder;
pub mod refresher;
pub mod searcher;

pub use builder::DbBuilder;
pub use refresher::Refresher;
pub use searcher::DbSearcher;

use crate::data::{InId, OutId, TermInDoc, TermSign};
use crate::error::Result;
use crate::posting::PostingList;

/// Write side used by indexers.
pub trait DatabaseWriter: Send + Sync {
    fn alloc_id(&self, out_id: OutId) -> Result<InId>;

    /// Record that each of `terms` occurs in document `in_id`.
    fn write_index(&self, in_id: InId, terms: &[TermInDoc]) -> Result<()>;

    fn write_value(&self, in_id: InId, value: &[u8]) -> Result<()>;

    fn write_data(&self, in_id: InId, data: &[u8]) -> Result<()>;

    fn sync(&self) -> Result<()>;
}

/// Read side used by searchers.
pub trait DatabaseReader: Send + Sync {
    fn get_out_id(&self, in_id: InId) -> Result<OutId>;

    fn read_index(&self, term: TermSign) -> Result<PostingList>;

    fn read_value(&self, in_id: InId) -> Result<Vec<u8>>;

    fn read_data(&self, in_id: InId) -> Result<Vec<u8>>;
}
