//! Inverted index structures.
//!
//! Every structure maps a [`TermSign`] to a [`PostingList`]. Readers and
//! writers meet at two small traits so that merges and transforms can move
//! postings between any pair of structures:
//!
//! - [`disk::DiskIndex`]: immutable three-level on-disk index, written once in
//!   ascending term order and then opened read-only.
//! - [`memory::MemoryIndex`]: hash-map index for freshly written postings.
//! - [`transform`]: forward-to-inverted conversion with bounded memory.
//! - [`var::VarIndex`]: memory index in front of double-buffered disk slots.
//! - [`static_index::StaticIndex`]: the read-only index of a built database.

pub mod disk;
pub mod memory;
pub mod merge;
pub mod static_index;
pub mod transform;
pub mod var;

pub use disk::DiskIndex;
pub use memory::MemoryIndex;
pub use merge::index_merge;
pub use static_index::StaticIndex;
pub use transform::{IndexTransform, IndexTransformManager};
pub use var::VarIndex;

use crate::data::TermSign;
use crate::error::Result;
use crate::posting::PostingList;

/// Ascending stream of the terms of an index.
pub type TermIter<'a> = Box<dyn Iterator<Item = TermSign> + 'a>;

/// Read side of an index.
pub trait ReadOnlyIndex: Send + Sync {
    /// Every term, ascending.
    fn terms(&self) -> Result<TermIter<'_>>;

    /// Postings of `term`.
    fn read_index(&self, term: TermSign) -> Result<PostingList>;

    fn term_count(&self) -> u64;
}

/// Write side of an index.
pub trait WriteOnlyIndex {
    fn write_index(&mut self, term: TermSign, postings: &PostingList) -> Result<()>;
}

/// An index without terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyIndex;

impl ReadOnlyIndex for EmptyIndex {
    fn terms(&self) -> Result<TermIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn read_index(&self, _term: TermSign) -> Result<PostingList> {
        Ok(PostingList::new())
    }

    fn term_count(&self) -> u64 {
        0
    }
}
