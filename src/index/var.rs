//! Dynamic index for documents added after the static build.
//!
//! New postings go to a [`MemoryIndex`]. A compaction merges memory with the
//! current disk slot into the other slot (`var.disk0` / `var.disk1`), then,
//! under the reader lock, clears memory and makes the new slot current. A
//! reader holds the read side for its whole lookup, so it sees the state
//! either before or after a compaction and never a mix.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::config::VarIndexConfig;
use crate::data::TermSign;
use crate::error::Result;
use crate::index::{DiskIndex, EmptyIndex, MemoryIndex, ReadOnlyIndex, index_merge};
use crate::posting::PostingList;
use crate::storage::stat::{load_stat, save_stat};

const VAR_STAT_FILE: &str = "var.stat";
const SLOT_NAMES: [&str; 2] = ["var.disk0", "var.disk1"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct VarIndexStat {
    /// Current slot, or -1 when nothing has been compacted yet.
    current_disk: i32,
}

#[derive(Debug)]
struct Slot {
    no: usize,
    disk: DiskIndex,
}

/// Memory index in front of double-buffered disk slots.
#[derive(Debug)]
pub struct VarIndex {
    dir: PathBuf,
    config: VarIndexConfig,
    memory: MemoryIndex,
    current: RwLock<Option<Slot>>,
    /// Serializes writers and compactions; holds the time of the last one.
    writer: Mutex<Instant>,
}

impl VarIndex {
    pub fn open(dir: &Path, config: &VarIndexConfig) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let stat_path = dir.join(VAR_STAT_FILE);

        let current_disk = match load_stat::<VarIndexStat>(&stat_path) {
            Ok(stat) => stat.current_disk,
            Err(e) => {
                if stat_path.exists() {
                    warn!("ignoring unreadable {}: {}", stat_path.display(), e);
                }
                -1
            }
        };

        let current = match usize::try_from(current_disk) {
            Ok(no) if no < SLOT_NAMES.len() => Some(Slot {
                no,
                disk: DiskIndex::open(dir, SLOT_NAMES[no])?,
            }),
            Ok(no) => {
                warn!("var index slot {no} does not exist, starting empty");
                None
            }
            Err(_) => None,
        };

        save_stat(&stat_path, &VarIndexStat {
            current_disk: current.as_ref().map_or(-1, |slot| slot.no as i32),
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            config: config.clone(),
            memory: MemoryIndex::new(),
            current: RwLock::new(current),
            writer: Mutex::new(Instant::now()),
        })
    }

    /// Append `postings` to `term` in memory.
    pub fn write_index(&self, term: TermSign, postings: &PostingList) -> Result<()> {
        let _writer = self.writer.lock();
        self.memory.write_index(term, postings);
        Ok(())
    }

    /// Postings of `term` from memory and the current slot.
    pub fn read_index(&self, term: TermSign) -> Result<PostingList> {
        let current = self.current.read();
        let mut list = self.memory.read_index(term);
        if let Some(slot) = current.as_ref() {
            match slot.disk.read_index(term) {
                Ok(on_disk) => list.merge(&on_disk, usize::MAX),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(list)
    }

    /// Compact unless memory is empty or the last compaction is more recent
    /// than the configured interval. Returns whether a compaction ran.
    pub fn sync(&self) -> Result<bool> {
        let mut last = self.writer.lock();
        if self.memory.is_empty() || last.elapsed() < self.config.min_sync_interval {
            return Ok(false);
        }
        self.compact()?;
        *last = Instant::now();
        Ok(true)
    }

    /// Compact now unless memory is empty.
    pub fn sync_now(&self) -> Result<bool> {
        let mut last = self.writer.lock();
        if self.memory.is_empty() {
            return Ok(false);
        }
        self.compact()?;
        *last = Instant::now();
        Ok(true)
    }

    /// Caller holds the writer lock. On error memory and the current slot are
    /// left as they were.
    fn compact(&self) -> Result<()> {
        let current = self.current.read();
        let target = current.as_ref().map_or(0, |slot| 1 - slot.no);
        let name = SLOT_NAMES[target];

        let empty = EmptyIndex;
        let base: &dyn ReadOnlyIndex = match current.as_ref() {
            Some(slot) => &slot.disk,
            None => &empty,
        };
        let capacity = self.memory.term_count() + base.term_count();

        info!(
            "compacting var index: {} memory terms, {} disk terms into {}",
            self.memory.term_count(),
            base.term_count(),
            name
        );
        let mut next = DiskIndex::create(&self.dir, name, self.config.max_index_file_size, capacity)?;
        let written = index_merge(&self.memory, base, &mut next)?;
        next.close()?;
        drop(next);
        let next = DiskIndex::open(&self.dir, name)?;
        drop(current);

        {
            let mut current = self.current.write();
            self.memory.clear();
            *current = Some(Slot {
                no: target,
                disk: next,
            });
        }

        save_stat(&self.dir.join(VAR_STAT_FILE), &VarIndexStat {
            current_disk: target as i32,
        })?;
        info!("var index compacted into {name} with {written} terms");
        Ok(())
    }

    /// Current disk slot, if any compaction has happened.
    pub fn current_slot(&self) -> Option<usize> {
        self.current.read().as_ref().map(|slot| slot.no)
    }

    pub fn memory_term_count(&self) -> u64 {
        self.memory.term_count()
    }

    pub fn disk_term_count(&self) -> u64 {
        self.current
            .read()
            .as_ref()
            .map_or(0, |slot| slot.disk.term_count())
    }
}
