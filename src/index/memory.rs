//! In-memory inverted index.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::data::TermSign;
use crate::error::Result;
use crate::index::{ReadOnlyIndex, TermIter, WriteOnlyIndex};
use crate::posting::PostingList;

/// Hash map from term to postings behind a reader-writer lock.
///
/// Writes keep each term's list ascending by internal id and hold the write
/// lock for the whole mutation. Reads return copies, so callers never hold the lock.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    lists: RwLock<AHashMap<TermSign, PostingList>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the ascending `postings` to the list of `term`. Ids past the tail
    /// are appended; earlier ones are merged into place.
    pub fn write_index(&self, term: TermSign, postings: &PostingList) {
        let mut lists = self.lists.write();
        lists.entry(term).or_default().upsert(postings);
    }

    /// Copy of the postings of `term`; empty if the term is absent.
    pub fn read_index(&self, term: TermSign) -> PostingList {
        self.lists.read().get(&term).cloned().unwrap_or_default()
    }

    /// Snapshot of the terms, ascending. Later writes are not reflected.
    pub fn sorted_terms(&self) -> Vec<TermSign> {
        let mut terms: Vec<TermSign> = self.lists.read().keys().copied().collect();
        terms.sort_unstable();
        terms
    }

    pub fn term_count(&self) -> u64 {
        self.lists.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.lists.read().is_empty()
    }

    pub fn clear(&self) {
        self.lists.write().clear();
    }
}

impl ReadOnlyIndex for MemoryIndex {
    fn terms(&self) -> Result<TermIter<'_>> {
        Ok(Box::new(self.sorted_terms().into_iter()))
    }

    fn read_index(&self, term: TermSign) -> Result<PostingList> {
        Ok(MemoryIndex::read_index(self, term))
    }

    fn term_count(&self) -> u64 {
        MemoryIndex::term_count(self)
    }
}

impl WriteOnlyIndex for MemoryIndex {
    fn write_index(&mut self, term: TermSign, postings: &PostingList) -> Result<()> {
        MemoryIndex::write_index(self, term, postings);
        Ok(())
    }
}
