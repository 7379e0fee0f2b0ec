//! Read-only index produced by a static build.

use std::path::Path;

use crate::data::TermSign;
use crate::error::Result;
use crate::index::{DiskIndex, ReadOnlyIndex, TermIter};
use crate::posting::PostingList;

/// Name of the disk index a static build writes.
pub const STATIC_INDEX_NAME: &str = "static";

#[derive(Debug)]
pub struct StaticIndex {
    disk: DiskIndex,
}

impl StaticIndex {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            disk: DiskIndex::open(dir, STATIC_INDEX_NAME)?,
        })
    }

    pub fn read_index(&self, term: TermSign) -> Result<PostingList> {
        self.disk.read_index(term)
    }

    pub fn term_count(&self) -> u64 {
        self.disk.term_count()
    }
}

impl ReadOnlyIndex for StaticIndex {
    fn terms(&self) -> Result<TermIter<'_>> {
        Ok(self.disk.terms())
    }

    fn read_index(&self, term: TermSign) -> Result<PostingList> {
        self.disk.read_index(term)
    }

    fn term_count(&self) -> u64 {
        self.disk.term_count()
    }
}
