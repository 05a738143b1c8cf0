//! The hash primitive every other component in this crate is built on: a
//! seedable, non-cryptographic, platform-independent hash of a byte slice.

use xxhash_rust::xxh32::xxh32;
use xxhash_rust::xxh64::xxh64;

/// Hashes `bytes` with `seed`, returning a 64-bit digest.
///
/// Deterministic for a given `(bytes, seed)` pair, independent of host
/// endianness or word size.
pub fn hash64(bytes: &[u8], seed: u64) -> u64 {
    xxh64(bytes, seed)
}

/// Hashes `bytes` with `seed`, returning a 32-bit digest.
///
/// `xxh32` takes a 32-bit seed; the low 32 bits of `seed` are used, which is
/// sufficient since callers only ever pass a filter's own 64-bit seed here as
/// a secondary diversification input, not as the primary seed of record.
pub fn hash32(bytes: &[u8], seed: u64) -> u32 {
    xxh32(bytes, seed as u32)
}
