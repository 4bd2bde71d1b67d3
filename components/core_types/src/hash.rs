//! Name hashing shared by the bytecode producer and the runtime.
//!
//! Globals, classes, methods and fields are all keyed by the 32-bit hash of
//! their identifier. The compiler embeds these hashes in bytecode, so the
//! function here must never change.

/// Seed used for every identifier hash.
pub const HASH_SEED: u32 = 0xDEAD_BEEF;

const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// MurmurHash2 of `data` with the given seed.
///
/// # Examples
///
/// ```
/// use core_types::{murmur_hash, HASH_SEED};
///
/// assert_eq!(murmur_hash(b"", HASH_SEED), murmur_hash(b"", HASH_SEED));
/// assert_ne!(murmur_hash(b"Foo", HASH_SEED), murmur_hash(b"Bar", HASH_SEED));
/// ```
pub fn murmur_hash(data: &[u8], seed: u32) -> u32 {
    let mut h = seed ^ data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Hash of an identifier (global, class, method or field name).
#[inline]
pub fn hash_name(name: &str) -> u32 {
    murmur_hash(name.as_bytes(), HASH_SEED)
}

/// Hash of a script filename with its extension stripped.
///
/// `"Player.hsl"` and `"Player"` hash identically, so a source file and the
/// bytecode compiled from it share one key.
pub fn filename_hash(filename: &str) -> u32 {
    let stem = match filename.rfind('.') {
        Some(dot) => &filename[..dot],
        None => filename,
    };
    hash_name(stem)
}
