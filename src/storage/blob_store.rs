//! Append-only blob storage.
//!
//! A logical store named `name` is split into physical files `name.blob.0`,
//! `name.blob.1`, ... of roughly `max_file_size` bytes each. Only the last file
//! is open for writing; when it reaches the cap it is synced, reopened
//! read-only and a fresh file is started. The file count and the write offset
//! of the last file live in `name.blob.stat`.
//!
//! Appends are serialized internally. Reads use positional I/O on shared file
//! handles and only touch bytes that a finished append has already written, so
//! they run concurrently with each other and with an append in progress.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{PlumeError, Result};
use crate::storage::stat::{load_stat, save_stat};
use crate::storage::{read_exact_at, write_all_at};

/// Address of one blob: physical file, byte offset and length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocator {
    pub file_no: u8,
    pub offset: u32,
    pub length: u32,
}

impl BlobLocator {
    /// Encoded size: `file_no` (1) + `offset` (4) + `length` (4), big-endian.
    pub const ENCODED_LEN: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[0] = self.file_no;
        buf[1..5].copy_from_slice(&self.offset.to_be_bytes());
        buf[5..9].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(PlumeError::corrupted(format!(
                "blob locator needs {} bytes, got {}",
                Self::ENCODED_LEN,
                buf.len()
            )));
        }
        let mut offset = [0u8; 4];
        let mut length = [0u8; 4];
        offset.copy_from_slice(&buf[1..5]);
        length.copy_from_slice(&buf[5..9]);
        Ok(Self {
            file_no: buf[0],
            offset: u32::from_be_bytes(offset),
            length: u32::from_be_bytes(length),
        })
    }
}

/// Persisted status of a blob store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobStoreStat {
    pub file_count: u8,
    pub last_file_offset: u32,
    pub max_file_size: u32,
}

#[derive(Debug)]
struct Writer {
    /// Read-write handle of the last physical file.
    file: Option<File>,
    stat: BlobStoreStat,
}

/// Append-only store of variable-length byte blobs.
#[derive(Debug)]
pub struct BlobStore {
    dir: PathBuf,
    name: String,
    /// Read handles, one per physical file.
    files: RwLock<Vec<Arc<File>>>,
    writer: Mutex<Writer>,
}

impl BlobStore {
    /// Create an empty store, discarding any files a previous store of the
    /// same name left in `dir`.
    pub fn create(dir: &Path, name: &str, max_file_size: u32) -> Result<Self> {
        if max_file_size == 0 {
            return Err(PlumeError::invalid_config(format!(
                "blob store {name}: max_file_size must be non-zero"
            )));
        }
        fs::create_dir_all(dir)?;
        remove_blob_files(dir, name)?;

        let stat = BlobStoreStat {
            file_count: 0,
            last_file_offset: 0,
            max_file_size,
        };
        save_stat(&stat_path(dir, name), &stat)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            files: RwLock::new(Vec::new()),
            writer: Mutex::new(Writer { file: None, stat }),
        })
    }

    /// Reopen a store from its status record.
    ///
    /// Bytes past the recorded offset of the last file belong to an append
    /// whose status was never saved; they are truncated away.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let stat: BlobStoreStat = load_stat(&stat_path(dir, name))?;
        if stat.max_file_size == 0 {
            return Err(PlumeError::corrupted(format!(
                "blob store {name}: max_file_size is zero"
            )));
        }

        let mut files = Vec::with_capacity(stat.file_count as usize);
        let mut writable = None;
        for file_no in 0..stat.file_count {
            let path = blob_path(dir, name, file_no);
            if file_no + 1 < stat.file_count {
                files.push(Arc::new(File::open(&path)?));
                continue;
            }

            let file = OpenOptions::new().read(true).write(true).open(&path)?;
            let len = file.metadata()?.len();
            let expected = u64::from(stat.last_file_offset);
            if len < expected {
                return Err(PlumeError::corrupted(format!(
                    "{} is {} bytes, status records {}",
                    path.display(),
                    len,
                    expected
                )));
            }
            if len > expected {
                warn!(
                    "truncating {} unrecorded bytes from {}",
                    len - expected,
                    path.display()
                );
                file.set_len(expected)?;
            }
            files.push(Arc::new(file.try_clone()?));
            writable = Some(file);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            files: RwLock::new(files),
            writer: Mutex::new(Writer {
                file: writable,
                stat,
            }),
        })
    }

    /// Append `bytes` and return where they were stored.
    pub fn append(&self, bytes: &[u8]) -> Result<BlobLocator> {
        let mut writer = self.writer.lock();

        if writer.file.is_none() || writer.stat.last_file_offset >= writer.stat.max_file_size {
            self.roll(&mut writer)?;
        }

        let length = u32::try_from(bytes.len()).map_err(|_| {
            PlumeError::out_of_bounds(format!("blob of {} bytes is too large", bytes.len()))
        })?;
        let offset = writer.stat.last_file_offset;
        let end = offset.checked_add(length).ok_or_else(|| {
            PlumeError::out_of_bounds(format!(
                "blob of {length} bytes at offset {offset} overflows the file"
            ))
        })?;

        let file = writer
            .file
            .as_ref()
            .ok_or_else(|| PlumeError::internal("blob store has no writable file"))?;
        write_all_at(file, bytes, u64::from(offset))?;

        writer.stat.last_file_offset = end;
        save_stat(&stat_path(&self.dir, &self.name), &writer.stat)?;

        Ok(BlobLocator {
            file_no: writer.stat.file_count - 1,
            offset,
            length,
        })
    }

    /// Seal the current file and start the next one.
    fn roll(&self, writer: &mut Writer) -> Result<()> {
        if writer.stat.file_count == u8::MAX {
            return Err(PlumeError::out_of_bounds(format!(
                "blob store {} is out of file numbers",
                self.name
            )));
        }

        if let Some(file) = writer.file.take() {
            file.sync_all()?;
            let sealed_no = writer.stat.file_count - 1;
            let sealed = File::open(blob_path(&self.dir, &self.name, sealed_no))?;
            self.files.write()[sealed_no as usize] = Arc::new(sealed);
        }

        let file_no = writer.stat.file_count;
        let path = blob_path(&self.dir, &self.name, file_no);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        self.files.write().push(Arc::new(file.try_clone()?));

        writer.file = Some(file);
        writer.stat.file_count += 1;
        writer.stat.last_file_offset = 0;
        save_stat(&stat_path(&self.dir, &self.name), &writer.stat)?;

        debug!("blob store {} opened {}", self.name, path.display());
        Ok(())
    }

    /// Read the blob at `locator` into the front of `dest`.
    pub fn read(&self, locator: &BlobLocator, dest: &mut [u8]) -> Result<()> {
        let len = locator.length as usize;
        if dest.len() < len {
            return Err(PlumeError::invalid_argument(format!(
                "destination holds {} bytes, blob has {}",
                dest.len(),
                len
            )));
        }

        let file = {
            let files = self.files.read();
            files.get(locator.file_no as usize).cloned().ok_or_else(|| {
                PlumeError::out_of_bounds(format!(
                    "blob file {} of {} does not exist",
                    locator.file_no,
                    files.len()
                ))
            })?
        };
        read_exact_at(&file, &mut dest[..len], u64::from(locator.offset))
    }

    /// Read the blob at `locator` into a new buffer.
    pub fn read_vec(&self, locator: &BlobLocator) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; locator.length as usize];
        self.read(locator, &mut buf)?;
        Ok(buf)
    }

    /// Flush the open file and persist the status record.
    pub fn sync(&self) -> Result<()> {
        let writer = self.writer.lock();
        if let Some(file) = writer.file.as_ref() {
            file.sync_data()?;
        }
        save_stat(&stat_path(&self.dir, &self.name), &writer.stat)
    }

    pub fn stat(&self) -> BlobStoreStat {
        self.writer.lock().stat
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn stat_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.blob.stat"))
}

fn blob_path(dir: &Path, name: &str, file_no: u8) -> PathBuf {
    dir.join(format!("{name}.blob.{file_no}"))
}

fn remove_blob_files(dir: &Path, name: &str) -> Result<()> {
    let prefix = format!("{name}.blob.");
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let is_blob = file_name
            .strip_prefix(&prefix)
            .is_some_and(|suffix| suffix.parse::<u8>().is_ok());
        if is_blob {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_locator_encoding() {
        let loc = BlobLocator {
            file_no: 2,
            offset: 0x0102_0304,
            length: 7,
        };
        let bytes = loc.to_bytes();
        assert_eq!(bytes, [2, 1, 2, 3, 4, 0, 0, 0, 7]);
        assert_eq!(BlobLocator::from_bytes(&bytes).unwrap(), loc);
        assert!(BlobLocator::from_bytes(&bytes[..8]).is_err());
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let store = BlobStore::create(dir.path(), "t", 1024).unwrap();

        let a = store.append(b"hello").unwrap();
        let b = store.append(b"").unwrap();
        let c = store.append(b"world!").unwrap();

        assert_eq!(a.offset, 0);
        assert_eq!(b.length, 0);
        assert_eq!(c.offset, 5);
        assert_eq!(store.read_vec(&a).unwrap(), b"hello".to_vec());
        assert!(store.read_vec(&b).unwrap().is_empty());
        assert_eq!(store.read_vec(&c).unwrap(), b"world!".to_vec());

        let mut small = [0u8; 2];
        assert!(store.read(&a, &mut small).is_err());

        let missing = BlobLocator {
            file_no: 9,
            offset: 0,
            length: 1,
        };
        assert!(matches!(
            store.read_vec(&missing),
            Err(PlumeError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_rolls_files_at_cap() {
        let dir = tempdir().unwrap();
        let store = BlobStore::create(dir.path(), "roll", 8).unwrap();

        let locs: Vec<_> = (0..5u8)
            .map(|i| store.append(&[i; 6]).unwrap())
            .collect();

        // Each file takes blobs until it reaches 8 bytes: 6, then 12.
        assert_eq!(locs[0].file_no, 0);
        assert_eq!(locs[1].file_no, 0);
        assert_eq!(locs[2].file_no, 1);
        assert_eq!(locs[4].file_no, 2);
        assert_eq!(store.stat().file_count, 3);

        for (i, loc) in locs.iter().enumerate() {
            assert_eq!(store.read_vec(loc).unwrap(), vec![i as u8; 6]);
        }
    }

    #[test]
    fn test_reopen_resumes_appends() {
        let dir = tempdir().unwrap();
        let first;
        {
            let store = BlobStore::create(dir.path(), "r", 16).unwrap();
            first = store.append(b"0123456789").unwrap();
            store.append(b"abcdefghij").unwrap();
            store.sync().unwrap();
        }

        let store = BlobStore::open(dir.path(), "r").unwrap();
        let stat = store.stat();
        assert_eq!(stat.file_count, 1);
        assert_eq!(stat.last_file_offset, 20);

        let next = store.append(b"xyz").unwrap();
        assert_eq!(next.file_no, 1);
        assert_eq!(next.offset, 0);
        assert_eq!(store.read_vec(&first).unwrap(), b"0123456789".to_vec());
        assert_eq!(store.read_vec(&next).unwrap(), b"xyz".to_vec());
    }

    #[test]
    fn test_open_truncates_unrecorded_tail() {
        let dir = tempdir().unwrap();
        {
            let store = BlobStore::create(dir.path(), "tail", 64).unwrap();
            store.append(b"keep").unwrap();
        }
        let path = dir.path().join("tail.blob.0");
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(b"garbage");
        fs::write(&path, bytes).unwrap();

        let store = BlobStore::open(dir.path(), "tail").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 4);
        let loc = store.append(b"more").unwrap();
        assert_eq!(loc.offset, 4);
    }

    #[test]
    fn test_create_discards_old_files() {
        let dir = tempdir().unwrap();
        {
            let store = BlobStore::create(dir.path(), "d", 4).unwrap();
            store.append(b"aaaa").unwrap();
            store.append(b"bbbb").unwrap();
        }
        assert!(dir.path().join("d.blob.1").exists());

        let store = BlobStore::create(dir.path(), "d", 4).unwrap();
        assert_eq!(store.stat().file_count, 0);
        assert!(!dir.path().join("d.blob.1").exists());
        assert!(dir.path().join("d.blob.stat").exists());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            BlobStore::create(dir.path(), "z", 0),
            Err(PlumeError::InvalidConfig(_))
        ));
    }
}
