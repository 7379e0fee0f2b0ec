//! Storage primitives underneath every index structure.
//!
//! - [`fixed_file::FixedFile`]: a pre-sized, memory-mapped file with typed
//!   big-endian accessors.
//! - [`blob_store::BlobStore`]: an append-only logical file made of size-capped
//!   physical files, addressed by [`blob_store::BlobLocator`].
//! - [`stat`]: small JSON status records describing how to reopen the binary
//!   files.

pub mod blob_store;
pub mod fixed_file;
pub mod stat;

pub use blob_store::{BlobLocator, BlobStore, BlobStoreStat};
pub use fixed_file::FixedFile;

use std::fs::File;

use crate::error::Result;

/// Read exactly `buf.len()` bytes at `offset` without moving a file cursor.
#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)?;
    Ok(())
}

#[cfg(windows)]
pub(crate) fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_read(buf, offset)?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        buf = &mut std::mem::take(&mut buf)[n..];
        offset += n as u64;
    }
    Ok(())
}

#[cfg(windows)]
pub(crate) fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_write(buf, offset)?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}
