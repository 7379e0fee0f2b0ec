//! Binary form of a posting list.
//!
//! Layout: varint posting count, then for each posting the varint delta of its
//! internal id from the previous one (the first from zero) followed by the
//! zigzag varint of its weight.

use crate::data::Posting;
use crate::error::{PlumeError, Result};
use crate::posting::PostingList;
use crate::util::varint::{decode_u64, encode_u64, unzigzag_i32, zigzag_i32};

pub fn encode(list: &PostingList) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + list.len() * 3);
    encode_u64(&mut buf, list.len() as u64);

    let mut prev = 0u32;
    for posting in list {
        encode_u64(&mut buf, u64::from(posting.in_id.wrapping_sub(prev)));
        encode_u64(&mut buf, u64::from(zigzag_i32(posting.weight)));
        prev = posting.in_id;
    }
    buf
}

pub fn decode(bytes: &[u8]) -> Result<PostingList> {
    let (count, mut pos) = decode_u64(bytes)?;
    // Every posting takes at least two bytes.
    if count > (bytes.len() as u64) / 2 + 1 {
        return Err(PlumeError::corrupted(format!(
            "posting count {} does not fit in {} bytes",
            count,
            bytes.len()
        )));
    }

    let mut list = PostingList::with_capacity(count as usize);
    let mut prev = 0u32;
    for _ in 0..count {
        let (delta, n) = decode_u64(&bytes[pos..])?;
        pos += n;
        let (weight, n) = decode_u64(&bytes[pos..])?;
        pos += n;

        let delta = u32::try_from(delta)
            .map_err(|_| PlumeError::corrupted(format!("in id delta {delta} overflows")))?;
        let weight = u32::try_from(weight)
            .map_err(|_| PlumeError::corrupted(format!("weight {weight} overflows")))?;

        prev = prev.wrapping_add(delta);
        list.push(Posting::new(prev, unzigzag_i32(weight)));
    }

    if pos != bytes.len() {
        return Err(PlumeError::corrupted(format!(
            "{} trailing bytes after posting list",
            bytes.len() - pos
        )));
    }
    Ok(list)
}
