//! Fixed-size memory-mapped file.
//!
//! The backing file is truncated or extended to exactly the requested size and
//! then mapped read-write. All numbers are stored big-endian. Any access whose
//! end lies past the mapping fails with [`PlumeError::OutOfBounds`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use memmap2::MmapMut;
use parking_lot::RwLock;

use crate::error::{PlumeError, Result};

/// A pre-sized random-access file backed by a memory-mapped region.
///
/// Readers share the mapping through the read side of an `RwLock`, so reads
/// never block each other; writers take the write side for the duration of a
/// single store.
#[derive(Debug)]
pub struct FixedFile {
    path: PathBuf,
    _file: File,
    /// `None` for a zero-length file, which cannot be mapped.
    map: RwLock<Option<MmapMut>>,
    len: usize,
}

impl FixedFile {
    /// Open (creating if needed) `dir/name` and size it to exactly `size` bytes.
    ///
    /// Existing contents within `size` are kept.
    #[allow(unsafe_code)] // MmapMut::map_mut requires unsafe for memory-mapped I/O.
    pub fn open(dir: &Path, name: &str, size: usize) -> Result<Self> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.set_len(size as u64)?;

        let map = if size == 0 {
            None
        } else {
            // The file is owned by this struct for the lifetime of the mapping
            // and only resized before mapping.
            let map = unsafe { MmapMut::map_mut(&file)? };
            if map.len() != size {
                return Err(PlumeError::internal(format!(
                    "mapped {} bytes of {}, expected {}",
                    map.len(),
                    path.display(),
                    size
                )));
            }
            Some(map)
        };

        Ok(Self {
            path,
            _file: file,
            map: RwLock::new(map),
            len: size,
        })
    }

    /// Like [`open`](Self::open), but discards any existing contents so the
    /// whole region starts zeroed.
    pub fn create(dir: &Path, name: &str, size: usize) -> Result<Self> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(dir.join(name))?;
        Self::open(dir, name, size)
    }

    /// Size of the mapped region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(PlumeError::out_of_bounds(format!(
                "access [{}, +{}) past end of {} ({} bytes)",
                offset,
                len,
                self.path.display(),
                self.len
            ))),
        }
    }

    /// Borrow `len` bytes at `offset` without copying.
    pub fn with_bytes<R>(&self, offset: usize, len: usize, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.check_range(offset, len)?;
        let guard = self.map.read();
        match guard.as_ref() {
            Some(map) => Ok(f(&map[offset..offset + len])),
            None => Ok(f(&[])),
        }
    }

    fn with_bytes_mut(&self, offset: usize, len: usize, f: impl FnOnce(&mut [u8])) -> Result<()> {
        self.check_range(offset, len)?;
        let mut guard = self.map.write();
        if let Some(map) = guard.as_mut() {
            f(&mut map[offset..offset + len]);
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.with_bytes(offset, 1, |b| b[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        self.with_bytes(offset, 2, BigEndian::read_u16)
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.with_bytes(offset, 4, BigEndian::read_u32)
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        self.with_bytes(offset, 8, BigEndian::read_u64)
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        self.with_bytes(offset, 4, BigEndian::read_i32)
    }

    pub fn read_i64(&self, offset: usize) -> Result<i64> {
        self.with_bytes(offset, 8, BigEndian::read_i64)
    }

    pub fn write_u8(&self, offset: usize, value: u8) -> Result<()> {
        self.with_bytes_mut(offset, 1, |b| b[0] = value)
    }

    pub fn write_u16(&self, offset: usize, value: u16) -> Result<()> {
        self.with_bytes_mut(offset, 2, |b| BigEndian::write_u16(b, value))
    }

    pub fn write_u32(&self, offset: usize, value: u32) -> Result<()> {
        self.with_bytes_mut(offset, 4, |b| BigEndian::write_u32(b, value))
    }

    pub fn write_u64(&self, offset: usize, value: u64) -> Result<()> {
        self.with_bytes_mut(offset, 8, |b| BigEndian::write_u64(b, value))
    }

    pub fn write_i32(&self, offset: usize, value: i32) -> Result<()> {
        self.with_bytes_mut(offset, 4, |b| BigEndian::write_i32(b, value))
    }

    pub fn write_i64(&self, offset: usize, value: i64) -> Result<()> {
        self.with_bytes_mut(offset, 8, |b| BigEndian::write_i64(b, value))
    }

    /// Write at most `max_len` bytes of `buf` at `offset`.
    pub fn write_bytes(&self, offset: usize, buf: &[u8], max_len: usize) -> Result<()> {
        let len = buf.len().min(max_len);
        self.with_bytes_mut(offset, len, |b| b.copy_from_slice(&buf[..len]))
    }

    /// Copy `len` bytes starting at `offset`.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        self.with_bytes(offset, len, |b| b.to_vec())
    }

    /// Flush dirty pages to the backing file.
    pub fn flush(&self) -> Result<()> {
        let guard = self.map.read();
        if let Some(map) = guard.as_ref() {
            map.flush()?;
        }
        Ok(())
    }
}
