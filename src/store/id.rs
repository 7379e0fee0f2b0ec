//! Internal id allocation.
//!
//! Internal ids are dense, start at 1 and never exceed `max_id - 1`. The
//! external id of each allocated document is stored as a big-endian `u32` at
//! `in_id * 4` of the fixed file `id`; `id.stat` records the next id to hand
//! out.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::data::{InId, OutId};
use crate::error::{PlumeError, Result};
use crate::storage::FixedFile;
use crate::storage::stat::{load_stat, save_stat};

const ID_FILE: &str = "id";
const ID_STAT_FILE: &str = "id.stat";
const RECORD_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct IdStat {
    cur_id: u32,
    max_in_id: u32,
}

/// Allocates internal ids and records the external id of each one.
#[derive(Debug)]
pub struct IdManager {
    dir: PathBuf,
    file: FixedFile,
    max_in_id: u32,
    /// Next id to allocate. Held for the duration of an allocation.
    cur_id: Mutex<u32>,
}

impl IdManager {
    pub fn create(dir: &Path, max_id: u32) -> Result<Self> {
        if max_id < 2 {
            return Err(PlumeError::invalid_config(format!(
                "max_id must be at least 2, got {max_id}"
            )));
        }
        fs::create_dir_all(dir)?;

        let stat = IdStat {
            cur_id: 1,
            max_in_id: max_id,
        };
        save_stat(&dir.join(ID_STAT_FILE), &stat)?;
        FixedFile::create(dir, ID_FILE, 0)?;
        Self::with_stat(dir, stat)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let stat: IdStat = load_stat(&dir.join(ID_STAT_FILE))?;
        if stat.cur_id == 0 || stat.cur_id > stat.max_in_id {
            return Err(PlumeError::corrupted(format!(
                "id status cur_id {} outside [1, {}]",
                stat.cur_id, stat.max_in_id
            )));
        }
        Self::with_stat(dir, stat)
    }

    fn with_stat(dir: &Path, stat: IdStat) -> Result<Self> {
        let file = FixedFile::open(dir, ID_FILE, stat.max_in_id as usize * RECORD_SIZE)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            file,
            max_in_id: stat.max_in_id,
            cur_id: Mutex::new(stat.cur_id),
        })
    }

    /// Allocate the next internal id for `out_id`.
    ///
    /// The counter only moves once the record is written, so a failed write
    /// never consumes an id.
    pub fn alloc_id(&self, out_id: OutId) -> Result<InId> {
        if out_id == 0 {
            return Err(PlumeError::invalid_argument("out id 0 is reserved"));
        }

        let mut cur_id = self.cur_id.lock();
        if *cur_id >= self.max_in_id {
            return Err(PlumeError::out_of_bounds(format!(
                "id space exhausted at {}",
                self.max_in_id
            )));
        }

        let in_id = *cur_id;
        self.file.write_u32(in_id as usize * RECORD_SIZE, out_id)?;
        *cur_id += 1;
        Ok(in_id)
    }

    /// External id of `in_id`; `0` if the id was never allocated.
    pub fn get_out_id(&self, in_id: InId) -> Result<OutId> {
        if in_id >= self.max_in_id {
            return Err(PlumeError::out_of_bounds(format!(
                "in id {} >= max {}",
                in_id, self.max_in_id
            )));
        }
        self.file.read_u32(in_id as usize * RECORD_SIZE)
    }

    /// Next id to be allocated.
    pub fn cur_id(&self) -> InId {
        *self.cur_id.lock()
    }

    pub fn max_id(&self) -> u32 {
        self.max_in_id
    }

    /// Persist the counter and flush the id file.
    pub fn sync(&self) -> Result<()> {
        let cur_id = self.cur_id.lock();
        self.file.flush()?;
        save_stat(
            &self.dir.join(ID_STAT_FILE),
            &IdStat {
                cur_id: *cur_id,
                max_in_id: self.max_in_id,
            },
        )?;
        debug!("id manager synced at {}", *cur_id);
        Ok(())
    }
}
