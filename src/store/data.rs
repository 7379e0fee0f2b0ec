//! Variable-length per-document payloads.
//!
//! A directory file `data.d0` holds one 9-byte locator per internal id,
//! pointing into the blob store `data.d1`. The first byte of each entry is the
//! blob file number plus one, so a zeroed entry means "never written" and an
//! empty payload still round-trips.
//!
//! Re-appending for an id points the directory at the new bytes; the old ones
//! stay in the blob store and are never reclaimed.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::data::InId;
use crate::error::{PlumeError, Result};
use crate::storage::stat::{load_stat, save_stat};
use crate::storage::{BlobLocator, BlobStore, FixedFile};

const DIRECTORY_FILE: &str = "data.d0";
const BLOB_NAME: &str = "data.d1";
const DATA_STAT_FILE: &str = "data.stat";
const ENTRY_SIZE: usize = BlobLocator::ENCODED_LEN;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct DataStat {
    max_in_id: u32,
}

/// Variable-length payload per internal id.
#[derive(Debug)]
pub struct DataManager {
    dir: PathBuf,
    directory: FixedFile,
    blobs: BlobStore,
    max_in_id: u32,
    append_lock: Mutex<()>,
}

impl DataManager {
    pub fn create(dir: &Path, max_id: u32, max_file_size: u32) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let stat = DataStat { max_in_id: max_id };
        save_stat(&dir.join(DATA_STAT_FILE), &stat)?;

        let directory = FixedFile::create(dir, DIRECTORY_FILE, directory_size(max_id))?;
        let blobs = BlobStore::create(dir, BLOB_NAME, max_file_size)?;
        Ok(Self::new(dir, directory, blobs, max_id))
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let stat: DataStat = load_stat(&dir.join(DATA_STAT_FILE))?;
        let directory = FixedFile::open(dir, DIRECTORY_FILE, directory_size(stat.max_in_id))?;
        let blobs = BlobStore::open(dir, BLOB_NAME)?;
        Ok(Self::new(dir, directory, blobs, stat.max_in_id))
    }

    fn new(dir: &Path, directory: FixedFile, blobs: BlobStore, max_in_id: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            directory,
            blobs,
            max_in_id,
            append_lock: Mutex::new(()),
        }
    }

    fn check_id(&self, in_id: InId) -> Result<()> {
        if in_id == 0 || in_id > self.max_in_id {
            return Err(PlumeError::out_of_bounds(format!(
                "in id {} outside [1, {}]",
                in_id, self.max_in_id
            )));
        }
        Ok(())
    }

    /// Store `payload` for `in_id`.
    pub fn append(&self, in_id: InId, payload: &[u8]) -> Result<()> {
        self.check_id(in_id)?;

        let _guard = self.append_lock.lock();
        let locator = self.blobs.append(payload)?;
        let mut entry = locator.to_bytes();
        entry[0] = locator.file_no.checked_add(1).ok_or_else(|| {
            PlumeError::out_of_bounds(format!("blob file {} cannot be marked", locator.file_no))
        })?;
        self.directory
            .write_bytes(in_id as usize * ENTRY_SIZE, &entry, ENTRY_SIZE)
    }

    /// Payload stored for `in_id`; `NotFound` if nothing was ever appended.
    pub fn read_data(&self, in_id: InId) -> Result<Vec<u8>> {
        self.check_id(in_id)?;

        let entry = self
            .directory
            .read_bytes(in_id as usize * ENTRY_SIZE, ENTRY_SIZE)?;
        if entry[0] == 0 {
            return Err(PlumeError::not_found(format!("no data for in id {in_id}")));
        }
        let mut locator = BlobLocator::from_bytes(&entry)?;
        locator.file_no -= 1;
        self.blobs.read_vec(&locator)
    }

    pub fn max_id(&self) -> u32 {
        self.max_in_id
    }

    pub fn sync(&self) -> Result<()> {
        let _guard = self.append_lock.lock();
        self.directory.flush()?;
        self.blobs.sync()?;
        save_stat(
            &self.dir.join(DATA_STAT_FILE),
            &DataStat {
                max_in_id: self.max_in_id,
            },
        )
    }

    /// Final sync before the manager is dropped.
    pub fn close(&self) -> Result<()> {
        self.sync()
    }
}

fn directory_size(max_id: u32) -> usize {
    (max_id as usize + 1) * ENTRY_SIZE
}
