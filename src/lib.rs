//! Space-efficient probabilistic set-membership filters.
//!
//! This crate implements a family of filters that share a common hashing
//! substrate: a classic Bloom filter, a partitioned Bloom filter, a scalable Bloom
//! filter (a growing sequence of partitioned filters), and a cuckoo filter,
//! all sharing a seedable double-hashing substrate (`hashing`) built on a
//! non-cryptographic 64-bit hash (`hash`).
//!
//! ```
//! use approx_sets::classic::BloomFilter;
//!
//! let mut filter = BloomFilter::create(1000, 0.01).unwrap();
//! filter.add("some-key");
//! assert!(filter.has("some-key"));
//! assert!(!filter.has("absent-key"));
//! ```
//!
//! Every filter constructor takes its sizing parameters directly; there is
//! no ambient configuration layer to read from (this is a pure algorithms
//! library, not a service). Reseeding a filter after its first insert does
//! not rehash already-stored data — see each module's `set_seed` docs.

pub mod bit_vector;
pub mod bucket;
pub mod classic;
pub mod cuckoo;
pub mod error;
pub mod hash;
pub mod hashing;
pub mod partitioned;
pub mod rng;
pub mod scalable;
pub mod util;

#[cfg(feature = "serde")]
pub mod export;

pub use error::{Error, Result};

/// The library-wide default seed, used whenever a filter is constructed
/// without an explicit seed. Fixed so that filters exported by different
/// processes stay comparable.
///
/// This is the SplitMix64/golden-ratio constant — arbitrary but fixed, and
/// chosen for recognizability rather than any cryptographic property.
pub const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
