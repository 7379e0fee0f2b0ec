//! Variable-length integer encoding utilities.
//!
//! LEB128-style encoding used by the posting list codec. Signed values are
//! zigzag mapped first so small negative weights stay short.

use crate::error::{PlumeError, Result};

/// Append a u64 value to `buf` using variable-length encoding.
pub fn encode_u64(buf: &mut Vec<u8>, value: u64) {
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        buf.push(byte);

        if val == 0 {
            break;
        }
    }
}

/// Decode a u64 value from variable-length encoding.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes {
        bytes_read += 1;

        if shift >= 64 {
            return Err(PlumeError::corrupted("varint overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, bytes_read));
        }

        shift += 7;
    }

    Err(PlumeError::corrupted("incomplete varint"))
}

/// Zigzag-map a signed value onto an unsigned one.
pub fn zigzag_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_i32`].
pub fn unzigzag_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
