//! Token to [`TermSign`] hashing.
//!
//! Index and search strategies must sign tokens the same way, so both helpers
//! here are stable across processes and platforms.

use crate::data::TermSign;

/// BKDR string hash with seed 131 over the token's chars.
pub fn sign_bkdr(text: &str) -> TermSign {
    const SEED: i64 = 131;

    text.chars().fold(0i64, |hash, c| {
        hash.wrapping_mul(SEED).wrapping_add(c as i64)
    })
}

/// Fold the first 128 bits of a BLAKE3 digest into 64 bits.
///
/// Lower collision rate than [`sign_bkdr`] at a higher per-token cost.
pub fn sign_fold(text: &str) -> TermSign {
    let digest = blake3::hash(text.as_bytes());
    let bytes = digest.as_bytes();

    let mut hi = [0u8; 8];
    let mut lo = [0u8; 8];
    hi.copy_from_slice(&bytes[0..8]);
    lo.copy_from_slice(&bytes[8..16]);

    i64::from_be_bytes(hi).wrapping_add(i64::from_be_bytes(lo))
}
