//! Fixed-length per-document values.
//!
//! Values are laid out by internal id across files `value.n0`, `value.n1`, ...
//! Each file holds `values_per_file` slots of `value_size` bytes; id `i` lives
//! in file `i / values_per_file` at slot `i % values_per_file`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::InId;
use crate::error::{PlumeError, Result};
use crate::storage::FixedFile;
use crate::storage::stat::{load_stat, save_stat};

/// Default cap on the size of one value file.
pub const MAX_VALUE_FILE_SIZE: usize = 512 * 1024 * 1024;

const VALUE_STAT_FILE: &str = "value.stat";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ValueStat {
    max_in_id: u32,
    value_size: u32,
    #[serde(default)]
    values_per_file: u32,
}

/// Fixed-length value per internal id.
#[derive(Debug)]
pub struct ValueManager {
    dir: PathBuf,
    files: Vec<FixedFile>,
    stat: ValueStat,
}

impl ValueManager {
    pub fn create(dir: &Path, max_id: u32, value_size: u32) -> Result<Self> {
        Self::create_with_file_limit(dir, max_id, value_size, MAX_VALUE_FILE_SIZE)
    }

    /// Like [`create`](Self::create) with an explicit per-file byte cap.
    pub fn create_with_file_limit(
        dir: &Path,
        max_id: u32,
        value_size: u32,
        file_limit: usize,
    ) -> Result<Self> {
        if value_size == 0 {
            return Err(PlumeError::invalid_config("value_size must be non-zero"));
        }
        let values_per_file = file_limit / value_size as usize;
        if values_per_file == 0 {
            return Err(PlumeError::invalid_config(format!(
                "value_size {value_size} exceeds the file limit {file_limit}"
            )));
        }
        let values_per_file = u32::try_from(values_per_file).unwrap_or(u32::MAX);

        fs::create_dir_all(dir)?;
        let stat = ValueStat {
            max_in_id: max_id,
            value_size,
            values_per_file,
        };
        save_stat(&dir.join(VALUE_STAT_FILE), &stat)?;
        for file_no in 0..file_count(&stat) {
            FixedFile::create(dir, &value_file_name(file_no), 0)?;
        }
        Self::with_stat(dir, stat)
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let mut stat: ValueStat = load_stat(&dir.join(VALUE_STAT_FILE))?;
        if stat.value_size == 0 {
            return Err(PlumeError::corrupted("value status has value_size 0"));
        }
        if stat.values_per_file == 0 {
            let per_file = MAX_VALUE_FILE_SIZE / stat.value_size as usize;
            stat.values_per_file = u32::try_from(per_file).unwrap_or(u32::MAX).max(1);
        }
        Self::with_stat(dir, stat)
    }

    fn with_stat(dir: &Path, stat: ValueStat) -> Result<Self> {
        // Ids 0..=max_in_id are addressable.
        let total = u64::from(stat.max_in_id) + 1;
        let per_file = u64::from(stat.values_per_file);
        let file_count = file_count(&stat);

        let mut files = Vec::with_capacity(file_count as usize);
        for file_no in 0..file_count {
            let first = u64::from(file_no) * per_file;
            let slots = per_file.min(total - first);
            let size = slots as usize * stat.value_size as usize;
            files.push(FixedFile::open(dir, &value_file_name(file_no), size)?);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            stat,
        })
    }

    fn locate(&self, in_id: InId) -> Result<(&FixedFile, usize)> {
        if in_id > self.stat.max_in_id {
            return Err(PlumeError::out_of_bounds(format!(
                "in id {} > max {}",
                in_id, self.stat.max_in_id
            )));
        }
        let file_no = (in_id / self.stat.values_per_file) as usize;
        let slot = (in_id % self.stat.values_per_file) as usize;
        let file = self.files.get(file_no).ok_or_else(|| {
            PlumeError::internal(format!("value file {file_no} missing for id {in_id}"))
        })?;
        Ok((file, slot * self.stat.value_size as usize))
    }

    /// Store `value` for `in_id`, truncated or zero-padded to `value_size`.
    pub fn write_value(&self, in_id: InId, value: &[u8]) -> Result<()> {
        let (file, offset) = self.locate(in_id)?;
        let size = self.value_size();
        if value.len() >= size {
            return file.write_bytes(offset, value, size);
        }
        let mut padded = vec![0u8; size];
        padded[..value.len()].copy_from_slice(value);
        file.write_bytes(offset, &padded, size)
    }

    /// Exactly `value_size` bytes for `in_id`.
    pub fn read_value(&self, in_id: InId) -> Result<Vec<u8>> {
        let (file, offset) = self.locate(in_id)?;
        file.read_bytes(offset, self.value_size())
    }

    pub fn value_size(&self) -> usize {
        self.stat.value_size as usize
    }

    pub fn max_id(&self) -> u32 {
        self.stat.max_in_id
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn sync(&self) -> Result<()> {
        for file in &self.files {
            file.flush()?;
        }
        save_stat(&self.dir.join(VALUE_STAT_FILE), &self.stat)
    }
}

fn file_count(stat: &ValueStat) -> u32 {
    stat.max_in_id / stat.values_per_file + 1
}

fn value_file_name(file_no: u32) -> String {
    format!("value.n{file_no}")
}
