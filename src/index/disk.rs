//! Immutable on-disk inverted index.
//!
//! Four levels, three of them on disk:
//!
//! | level | where                          | content                                  |
//! |-------|--------------------------------|------------------------------------------|
//! | 0     | memory                         | first term of every block of 1024 terms  |
//! | 1     | `{name}.index1` (mapped)       | every term as a big-endian `i64`         |
//! | 2     | `{name}.index2`                | one 9-byte blob locator per term         |
//! | 3     | `{name}.index3.blob.*`         | encoded posting lists                    |
//!
//! `{name}.index.stat` records the capacity and the number of terms written.
//! An index is created writable, filled in ascending term order, closed, and
//! then opened read-only.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::data::TermSign;
use crate::error::{PlumeError, Result};
use crate::index::{ReadOnlyIndex, TermIter, WriteOnlyIndex};
use crate::posting::{self, PostingList};
use crate::storage::stat::{load_stat, save_stat};
use crate::storage::{BlobLocator, BlobStore, FixedFile, read_exact_at, write_all_at};

/// Terms per level-0 block.
pub const DISK_INDEX_BLOCK_TERMS: u64 = 1024;

const TERM_SIZE: u64 = 8;
const LOCATOR_SIZE: u64 = BlobLocator::ENCODED_LEN as u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIndexStat {
    pub max_term_count: u64,
    pub term_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Writable,
    ReadOnly,
    Closed,
}

/// A term-sorted inverted index stored in three files.
#[derive(Debug)]
pub struct DiskIndex {
    dir: PathBuf,
    name: String,
    state: State,
    stat: DiskIndexStat,
    level0: Vec<TermSign>,
    level1: FixedFile,
    level2: File,
    level3: BlobStore,
}

impl DiskIndex {
    /// Create an empty writable index with room for `max_term_count` terms.
    pub fn create(dir: &Path, name: &str, max_file_size: u32, max_term_count: u64) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let stat = DiskIndexStat {
            max_term_count,
            term_count: 0,
        };
        save_stat(&stat_path(dir, name), &stat)?;

        let level1 = FixedFile::create(dir, &format!("{name}.index1"), level1_size(max_term_count)?)?;
        let level2 = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(dir.join(format!("{name}.index2")))?;
        let level3 = BlobStore::create(dir, &format!("{name}.index3"), max_file_size)?;

        debug!("created disk index {name} for {max_term_count} terms");
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            state: State::Writable,
            stat,
            level0: Vec::new(),
            level1,
            level2,
            level3,
        })
    }

    /// Open a closed index read-only.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let stat: DiskIndexStat = load_stat(&stat_path(dir, name))?;
        if stat.term_count > stat.max_term_count {
            return Err(PlumeError::corrupted(format!(
                "disk index {name} holds {} terms, capacity {}",
                stat.term_count, stat.max_term_count
            )));
        }

        let level3 = BlobStore::open(dir, &format!("{name}.index3"))?;
        let level2 = File::open(dir.join(format!("{name}.index2")))?;
        let level1 = FixedFile::open(
            dir,
            &format!("{name}.index1"),
            level1_size(stat.max_term_count)?,
        )?;

        let mut level0 = Vec::with_capacity((stat.term_count / DISK_INDEX_BLOCK_TERMS + 1) as usize);
        let mut pos = 0;
        while pos < stat.term_count {
            level0.push(level1.read_i64(term_offset(pos))?);
            pos += DISK_INDEX_BLOCK_TERMS;
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            state: State::ReadOnly,
            stat,
            level0,
            level1,
            level2,
            level3,
        })
    }

    /// Append the postings of `term`. Terms must arrive in ascending order.
    pub fn write_index(&mut self, term: TermSign, postings: &PostingList) -> Result<()> {
        if self.state != State::Writable {
            return Err(PlumeError::invalid_state(format!(
                "disk index {} is not writable",
                self.name
            )));
        }
        if self.stat.term_count >= self.stat.max_term_count {
            return Err(PlumeError::out_of_bounds(format!(
                "disk index {} is full at {} terms",
                self.name, self.stat.max_term_count
            )));
        }

        let pos = self.stat.term_count;
        let locator = self.level3.append(&posting::encode(postings))?;
        write_all_at(&self.level2, &locator.to_bytes(), pos * LOCATOR_SIZE)?;
        self.level1.write_i64(term_offset(pos), term)?;
        self.stat.term_count += 1;
        Ok(())
    }

    /// Persist everything written so far and stop accepting writes.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            State::Closed => Ok(()),
            State::ReadOnly => {
                self.state = State::Closed;
                Ok(())
            }
            State::Writable => {
                self.state = State::Closed;
                self.level1.flush()?;
                self.level2.sync_data()?;
                self.level3.sync()?;
                save_stat(&stat_path(&self.dir, &self.name), &self.stat)?;
                debug!(
                    "closed disk index {} with {} terms",
                    self.name, self.stat.term_count
                );
                Ok(())
            }
        }
    }

    /// Postings of `term`, or `NotFound`.
    pub fn read_index(&self, term: TermSign) -> Result<PostingList> {
        if self.state != State::ReadOnly {
            return Err(PlumeError::invalid_state(format!(
                "disk index {} is not open for reading",
                self.name
            )));
        }

        let pos = self.find(term)?.ok_or_else(|| {
            PlumeError::not_found(format!("term {} not in disk index {}", term, self.name))
        })?;

        let mut entry = [0u8; BlobLocator::ENCODED_LEN];
        read_exact_at(&self.level2, &mut entry, pos * LOCATOR_SIZE)?;
        let locator = BlobLocator::from_bytes(&entry)?;
        let bytes = self.level3.read_vec(&locator)?;
        posting::decode(&bytes)
    }

    /// Position of `term` in level 1.
    fn find(&self, term: TermSign) -> Result<Option<u64>> {
        // Last block whose head is <= term.
        let block = match self.level0.partition_point(|&head| head <= term) {
            0 => return Ok(None),
            n => (n - 1) as u64,
        };

        let mut low = block * DISK_INDEX_BLOCK_TERMS;
        let mut high = (low + DISK_INDEX_BLOCK_TERMS).min(self.stat.term_count);
        while low < high {
            let mid = low + (high - low) / 2;
            let current = self.level1.read_i64(term_offset(mid))?;
            if current < term {
                low = mid + 1;
            } else if current > term {
                high = mid;
            } else {
                return Ok(Some(mid));
            }
        }
        Ok(None)
    }

    /// Terms in the order they were written.
    pub fn terms(&self) -> TermIter<'_> {
        Box::new((0..self.stat.term_count).map_while(move |pos| {
            match self.level1.read_i64(term_offset(pos)) {
                Ok(term) => Some(term),
                Err(e) => {
                    warn!("disk index {} term {} unreadable: {}", self.name, pos, e);
                    None
                }
            }
        }))
    }

    pub fn term_count(&self) -> u64 {
        self.stat.term_count
    }

    pub fn max_term_count(&self) -> u64 {
        self.stat.max_term_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.state == State::Writable
    }
}

impl Drop for DiskIndex {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close disk index {}: {}", self.name, e);
        }
    }
}

impl ReadOnlyIndex for DiskIndex {
    fn terms(&self) -> Result<TermIter<'_>> {
        if self.state == State::Closed {
            return Err(PlumeError::invalid_state(format!(
                "disk index {} is closed",
                self.name
            )));
        }
        Ok(DiskIndex::terms(self))
    }

    fn read_index(&self, term: TermSign) -> Result<PostingList> {
        DiskIndex::read_index(self, term)
    }

    fn term_count(&self) -> u64 {
        self.stat.term_count
    }
}

impl WriteOnlyIndex for DiskIndex {
    fn write_index(&mut self, term: TermSign, postings: &PostingList) -> Result<()> {
        DiskIndex::write_index(self, term, postings)
    }
}

fn stat_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.index.stat"))
}

fn term_offset(pos: u64) -> usize {
    (pos * TERM_SIZE) as usize
}

fn level1_size(max_term_count: u64) -> Result<usize> {
    max_term_count
        .checked_mul(TERM_SIZE)
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| {
            PlumeError::invalid_argument(format!("{max_term_count} terms do not fit in memory"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Posting;
    use tempfile::tempdir;

    fn postings_for(term: TermSign) -> PostingList {
        let n = (term.unsigned_abs() % 5 + 1) as u32;
        (1..=n).map(|id| Posting::new(id * 3, term as i32)).collect()
    }

    #[test]
    fn test_write_close_open_read() {
        let dir = tempdir().unwrap();
        let terms: Vec<TermSign> = vec![-500, -7, 0, 3, 42, 1 << 40];
        {
            let mut index = DiskIndex::create(dir.path(), "t", 1 << 20, 10).unwrap();
            for &t in &terms {
                index.write_index(t, &postings_for(t)).unwrap();
            }
            assert!(index.read_index(3).is_err());
            index.close().unwrap();
            index.close().unwrap();
        }

        let index = DiskIndex::open(dir.path(), "t").unwrap();
        assert_eq!(index.term_count(), terms.len() as u64);
        for &t in &terms {
            assert_eq!(index.read_index(t).unwrap(), postings_for(t));
        }
        assert!(index.read_index(1).unwrap_err().is_not_found());
        assert!(index.read_index(-1000).unwrap_err().is_not_found());
        assert!(index.read_index(i64::MAX).unwrap_err().is_not_found());
        assert_eq!(index.terms().collect::<Vec<_>>(), terms);
    }

    #[test]
    fn test_many_blocks() {
        let dir = tempdir().unwrap();
        let count = DISK_INDEX_BLOCK_TERMS * 3 + 17;
        {
            let mut index = DiskIndex::create(dir.path(), "big", 4096, count).unwrap();
            for i in 0..count {
                let term = i as i64 * 2 - 3000;
                let list: PostingList = vec![Posting::new(i as u32 + 1, 1)].into();
                index.write_index(term, &list).unwrap();
            }
        }

        let index = DiskIndex::open(dir.path(), "big").unwrap();
        for i in (0..count).step_by(97).chain([count - 1]) {
            let term = i as i64 * 2 - 3000;
            let list = index.read_index(term).unwrap();
            assert_eq!(list.as_slice(), &[Posting::new(i as u32 + 1, 1)]);
            // Odd neighbours were never written.
            assert!(index.read_index(term + 1).is_err());
        }
    }

    #[test]
    fn test_capacity_enforced() {
        let dir = tempdir().unwrap();
        let mut index = DiskIndex::create(dir.path(), "cap", 1024, 2).unwrap();
        index.write_index(1, &PostingList::new()).unwrap();
        index.write_index(2, &PostingList::new()).unwrap();
        assert!(matches!(
            index.write_index(3, &PostingList::new()),
            Err(PlumeError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_drop_persists_partial_population() {
        let dir = tempdir().unwrap();
        {
            let mut index = DiskIndex::create(dir.path(), "partial", 1024, 100).unwrap();
            index.write_index(5, &postings_for(5)).unwrap();
            index.write_index(9, &postings_for(9)).unwrap();
        }
        let index = DiskIndex::open(dir.path(), "partial").unwrap();
        assert_eq!(index.term_count(), 2);
        assert_eq!(index.read_index(9).unwrap(), postings_for(9));
    }

    #[test]
    fn test_empty_index() {
        let dir = tempdir().unwrap();
        DiskIndex::create(dir.path(), "empty", 1024, 0)
            .unwrap()
            .close()
            .unwrap();
        let index = DiskIndex::open(dir.path(), "empty").unwrap();
        assert_eq!(index.term_count(), 0);
        assert!(index.read_index(0).unwrap_err().is_not_found());
        assert_eq!(index.terms().count(), 0);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        DiskIndex::create(dir.path(), "ro", 1024, 4).unwrap();
        let mut index = DiskIndex::open(dir.path(), "ro").unwrap();
        assert!(matches!(
            index.write_index(1, &PostingList::new()),
            Err(PlumeError::InvalidState(_))
        ));
    }
}
