//! Forward-to-inverted transformation.
//!
//! Documents arrive as `(in_id, terms)` in ascending id order. An
//! [`IndexTransform`] inverts them in memory until it has absorbed its limit
//! of term occurrences; the [`IndexTransformManager`] then spills it to a
//! temporary [`DiskIndex`] and starts a new one. The final dump k-way merges
//! all spills so the output is identical to a single unbounded transform.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use log::{debug, info, warn};

use crate::data::{InId, Posting, TermInDoc, TermSign};
use crate::error::Result;
use crate::index::{DiskIndex, TermIter, WriteOnlyIndex};
use crate::posting::PostingList;

/// Capacities of the first segments of a term's postings; later segments
/// hold [`MAX_SEGMENT_CAPACITY`] each.
const SEGMENT_CAPACITIES: [usize; 5] = [16, 256, 512, 1024, 1024];
const MAX_SEGMENT_CAPACITY: usize = 2048;

/// Directory, under the database directory, that holds spilled transforms.
pub const SPILL_DIR: &str = "_tf_tmp";

const SPILL_FILE_SIZE: u32 = 1024 * 1024 * 1024;

fn segment_capacity(index: usize) -> usize {
    SEGMENT_CAPACITIES
        .get(index)
        .copied()
        .unwrap_or(MAX_SEGMENT_CAPACITY)
}

/// Postings of one term as a chain of fixed-capacity segments.
///
/// Appends never move existing postings, so very long lists grow without
/// repeated reallocation and copying.
#[derive(Debug, Default)]
struct SegmentedPostings {
    segments: Vec<Vec<Posting>>,
    len: usize,
}

impl SegmentedPostings {
    fn push(&mut self, posting: Posting) {
        let need_segment = match self.segments.last() {
            Some(last) => last.len() == segment_capacity(self.segments.len() - 1),
            None => true,
        };
        if need_segment {
            self.segments
                .push(Vec::with_capacity(segment_capacity(self.segments.len())));
        }
        if let Some(last) = self.segments.last_mut() {
            last.push(posting);
        }
        self.len += 1;
    }

    fn into_list(self) -> PostingList {
        let mut out = Vec::with_capacity(self.len);
        for segment in self.segments {
            out.extend(segment);
        }
        out.into()
    }
}

/// In-memory inversion of a batch of documents.
#[derive(Debug)]
pub struct IndexTransform {
    lists: AHashMap<TermSign, SegmentedPostings>,
    absorbed: usize,
    max_absorbed: usize,
}

impl IndexTransform {
    /// A transform that reports full after `max_term_in_doc` term occurrences.
    pub fn new(max_term_in_doc: usize) -> Self {
        Self {
            lists: AHashMap::new(),
            absorbed: 0,
            max_absorbed: max_term_in_doc,
        }
    }

    pub fn add_doc(&mut self, in_id: InId, terms: &[TermInDoc]) {
        for term in terms {
            self.lists
                .entry(term.sign)
                .or_default()
                .push(Posting::new(in_id, term.weight));
            self.absorbed += 1;
        }
    }

    pub fn is_full(&self) -> bool {
        self.absorbed >= self.max_absorbed
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.lists.len()
    }

    /// Number of term occurrences absorbed.
    pub fn absorbed(&self) -> usize {
        self.absorbed
    }

    /// Write every term in ascending order to `dst`.
    pub fn dump(self, dst: &mut dyn WriteOnlyIndex) -> Result<()> {
        let mut lists: Vec<(TermSign, SegmentedPostings)> = self.lists.into_iter().collect();
        lists.sort_unstable_by_key(|(term, _)| *term);
        for (term, postings) in lists {
            dst.write_index(term, &postings.into_list())?;
        }
        Ok(())
    }
}

/// Inverts an unbounded document stream with bounded memory.
#[derive(Debug)]
pub struct IndexTransformManager {
    spill_dir: PathBuf,
    max_term_in_doc: usize,
    current: Option<IndexTransform>,
    spills: Vec<String>,
    term_count: u64,
}

impl IndexTransformManager {
    /// Spills go to `dir/_tf_tmp`; leftovers of an earlier run are removed.
    pub fn new(dir: &Path, max_term_in_doc: usize) -> Result<Self> {
        let spill_dir = dir.join(SPILL_DIR);
        if spill_dir.exists() {
            warn!("removing stale spill directory {}", spill_dir.display());
            fs::remove_dir_all(&spill_dir)?;
        }
        Ok(Self {
            spill_dir,
            max_term_in_doc,
            current: None,
            spills: Vec::new(),
            term_count: 0,
        })
    }

    /// Add the terms of one document.
    pub fn write_index(&mut self, in_id: InId, terms: &[TermInDoc]) -> Result<()> {
        if self.current.as_ref().is_some_and(IndexTransform::is_full) {
            self.spill()?;
        }
        let limit = self.max_term_in_doc;
        self.term_count += terms.len() as u64;
        self.current
            .get_or_insert_with(|| IndexTransform::new(limit))
            .add_doc(in_id, terms);
        Ok(())
    }

    /// Upper bound on the number of distinct terms written so far.
    pub fn term_count(&self) -> u64 {
        self.term_count
    }

    pub fn spill_count(&self) -> usize {
        self.spills.len()
    }

    fn spill(&mut self) -> Result<()> {
        let Some(transform) = self.current.take() else {
            return Ok(());
        };
        fs::create_dir_all(&self.spill_dir)?;

        let name = format!("indextransform{}", self.spills.len());
        let mut disk = DiskIndex::create(
            &self.spill_dir,
            &name,
            SPILL_FILE_SIZE,
            transform.term_count() as u64,
        )?;
        info!(
            "spilling transform {} ({} terms, {} occurrences)",
            name,
            transform.term_count(),
            transform.absorbed()
        );
        transform.dump(&mut disk)?;
        disk.close()?;
        self.spills.push(name);
        Ok(())
    }

    /// Write everything, in ascending term order, to `dst`.
    pub fn dump(mut self, dst: &mut dyn WriteOnlyIndex) -> Result<()> {
        if self.spills.is_empty() {
            if let Some(transform) = self.current.take() {
                transform.dump(dst)?;
            }
            return Ok(());
        }

        self.spill()?;
        let sources = self
            .spills
            .iter()
            .map(|name| DiskIndex::open(&self.spill_dir, name))
            .collect::<Result<Vec<_>>>()?;
        let written = merge_sources(&sources, dst)?;
        info!(
            "merged {} spilled transforms into {} terms",
            sources.len(),
            written
        );

        drop(sources);
        fs::remove_dir_all(&self.spill_dir)?;
        Ok(())
    }
}

/// K-way merge of the term streams of `sources` into `dst`.
fn merge_sources(sources: &[DiskIndex], dst: &mut dyn WriteOnlyIndex) -> Result<u64> {
    let mut iters: Vec<TermIter<'_>> = sources.iter().map(|source| source.terms()).collect();

    let mut heap: BinaryHeap<Reverse<(TermSign, usize)>> = BinaryHeap::with_capacity(iters.len());
    for (source, iter) in iters.iter_mut().enumerate() {
        if let Some(term) = iter.next() {
            heap.push(Reverse((term, source)));
        }
    }

    let mut written = 0;
    let mut group: Vec<usize> = Vec::with_capacity(sources.len());
    while let Some(Reverse((term, source))) = heap.pop() {
        group.clear();
        group.push(source);
        while let Some(Reverse((next, _))) = heap.peek() {
            if *next != term {
                break;
            }
            if let Some(Reverse((_, other))) = heap.pop() {
                group.push(other);
            }
        }

        let mut lists = Vec::with_capacity(group.len());
        for &source in &group {
            match sources[source].read_index(term) {
                Ok(list) => lists.push(list),
                Err(e) => warn!(
                    "spill {} lost term {}: {}",
                    sources[source].name(),
                    term,
                    e
                ),
            }
            if let Some(next) = iters[source].next() {
                heap.push(Reverse((next, source)));
            }
        }

        let refs: Vec<&PostingList> = lists.iter().collect();
        let mut merged = PostingList::new();
        merged.kmerge(&refs, usize::MAX);
        dst.write_index(term, &merged)?;
        written += 1;
    }

    debug!("k-way term merge wrote {written} terms");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MemoryIndex, ReadOnlyIndex};
    use tempfile::tempdir;

    fn doc_terms(in_id: InId) -> Vec<TermInDoc> {
        // Each document hits a few overlapping terms.
        (0..4)
            .map(|k| TermInDoc::new(i64::from((in_id * 7 + k * 13) % 23) - 11, k as i32 + 1))
            .collect()
    }

    fn collect(dst: &MemoryIndex) -> Vec<(TermSign, PostingList)> {
        dst.sorted_terms()
            .into_iter()
            .map(|t| (t, dst.read_index(t)))
            .collect()
    }

    #[test]
    fn test_segment_chain() {
        let mut postings = SegmentedPostings::default();
        for id in 0..5000u32 {
            postings.push(Posting::new(id, 0));
        }
        assert_eq!(postings.segments[0].len(), 16);
        assert_eq!(postings.segments[1].len(), 256);
        assert_eq!(postings.segments[5].len(), 2048);
        let list = postings.into_list();
        assert_eq!(list.len(), 5000);
        assert!(list.iter().enumerate().all(|(i, p)| p.in_id == i as u32));
    }

    #[test]
    fn test_transform_dump_sorted() {
        let mut transform = IndexTransform::new(1000);
        transform.add_doc(1, &[TermInDoc::new(9, 1), TermInDoc::new(-2, 3)]);
        transform.add_doc(2, &[TermInDoc::new(9, 2)]);
        assert_eq!(transform.term_count(), 2);
        assert_eq!(transform.absorbed(), 3);
        assert!(!transform.is_full());

        let mut dst = MemoryIndex::new();
        transform.dump(&mut dst).unwrap();
        assert_eq!(dst.sorted_terms(), vec![-2, 9]);
        let ids: Vec<InId> = dst.read_index(9).iter().map(|p| p.in_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_output_independent_of_spills() {
        let build = |limit: usize| {
            let dir = tempdir().unwrap();
            let mut manager = IndexTransformManager::new(dir.path(), limit).unwrap();
            for in_id in 1..=300u32 {
                manager.write_index(in_id, &doc_terms(in_id)).unwrap();
            }
            let spills = manager.spill_count();
            let mut dst = MemoryIndex::new();
            manager.dump(&mut dst).unwrap();
            assert!(!dir.path().join(SPILL_DIR).exists());
            (spills, collect(&dst))
        };

        let (no_spill, unbounded) = build(usize::MAX);
        let (spills, bounded) = build(50);
        assert_eq!(no_spill, 0);
        assert!(spills > 5);
        assert_eq!(unbounded, bounded);
    }

    #[test]
    fn test_dump_into_disk_index() {
        let dir = tempdir().unwrap();
        let mut manager = IndexTransformManager::new(dir.path(), 10).unwrap();
        for in_id in 1..=40u32 {
            manager.write_index(in_id, &doc_terms(in_id)).unwrap();
        }
        assert_eq!(manager.term_count(), 160);

        let mut disk = DiskIndex::create(dir.path(), "out", 1 << 16, manager.term_count()).unwrap();
        manager.dump(&mut disk).unwrap();
        disk.close().unwrap();

        let disk = DiskIndex::open(dir.path(), "out").unwrap();
        let terms: Vec<TermSign> = disk.terms().collect();
        assert!(terms.windows(2).all(|w| w[0] < w[1]));
        let total: usize = terms.iter().map(|&t| disk.read_index(t).unwrap().len()).sum();
        assert_eq!(total, 160);
        assert!(ReadOnlyIndex::term_count(&disk) <= 23);
    }

    #[test]
    fn test_stale_spill_dir_removed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(SPILL_DIR)).unwrap();
        fs::write(dir.path().join(SPILL_DIR).join("junk"), b"x").unwrap();
        IndexTransformManager::new(dir.path(), 10).unwrap();
        assert!(!dir.path().join(SPILL_DIR).exists());
    }
}
