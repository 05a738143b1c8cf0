//! The classic, single-bit-array Bloom filter: one bit array and `k` hash
//! functions, sized from a target item count and false-positive rate rather
//! than from caller-supplied `m`/`k` directly.

use crate::bit_vector::BitVector;
use crate::error::{Error, Result};
use crate::hashing::{HashingService, Serialize};

/// A classic Bloom filter: one bit array, `k` hash functions.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    seed: u64,
    size: u32,
    nb_hashes: u32,
    filter: BitVector,
    length: u64,
    hashing: HashingService,
}

impl BloomFilter {
    /// Builds a filter sized for `n_items` items at a target false-positive
    /// rate of `target_fp_rate`, using the library's default seed.
    ///
    /// `m = ceil(-n * ln(p) / (ln 2)^2)`, `k = ceil((m/n) * ln 2)`.
    pub fn create(n_items: u64, target_fp_rate: f64) -> Result<Self> {
        Self::create_with_seed(n_items, target_fp_rate, crate::DEFAULT_SEED)
    }

    pub fn create_with_seed(n_items: u64, target_fp_rate: f64, seed: u64) -> Result<Self> {
        if n_items == 0 {
            return Err(Error::InvalidArgument(
                "n_items must be positive".to_string(),
            ));
        }
        if !(0.0 < target_fp_rate && target_fp_rate < 1.0) {
            return Err(Error::InvalidArgument(
                "target_fp_rate must be in (0, 1)".to_string(),
            ));
        }

        let n = n_items as f64;
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let m = (-n * target_fp_rate.ln() / ln2_sq).ceil() as u32;
        let m = m.max(1);
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        Ok(BloomFilter {
            seed,
            size: m,
            nb_hashes: k,
            filter: BitVector::new(m as usize),
            length: 0,
            hashing: HashingService::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn nb_hashes(&self) -> u32 {
        self.nb_hashes
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn filter(&self) -> &BitVector {
        &self.filter
    }

    /// Reseeds this filter. This does not rehash already-stored bits; doing
    /// so on a non-empty filter is a documented misuse.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Reconstructs a filter from its exported fields (used by the `export`
    /// module's `from_json`).
    pub fn from_parts(seed: u64, size: u32, nb_hashes: u32, filter: BitVector, length: u64) -> Self {
        BloomFilter {
            seed,
            size,
            nb_hashes,
            filter,
            length,
            hashing: HashingService::new(),
        }
    }

    /// Marks `value` as present, setting its `k` bits.
    pub fn add<T: Serialize + ?Sized>(&mut self, value: &T) {
        let indexes = self
            .hashing
            .get_distinct_indexes(value, self.size, self.nb_hashes, self.seed)
            .expect("nb_hashes <= size is guaranteed at construction time");
        for idx in indexes {
            self.filter.set(idx as usize);
        }
        self.length += 1;
    }

    /// `true` iff every one of `value`'s `k` bits is set. False positives are
    /// possible; a filter that has never been reseeded never false-negatives.
    pub fn has<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        let indexes = self
            .hashing
            .get_distinct_indexes(value, self.size, self.nb_hashes, self.seed)
            .expect("nb_hashes <= size is guaranteed at construction time");
        indexes.iter().all(|&idx| self.filter.get(idx as usize))
    }

    /// The current theoretical false-positive rate, `(1 - e^(-k*n/m))^k`.
    pub fn rate(&self) -> f64 {
        let k = f64::from(self.nb_hashes);
        let n = self.length as f64;
        let m = f64::from(self.size);
        (1.0 - (-k * n / m).exp()).powf(k)
    }
}

impl PartialEq for BloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.nb_hashes == other.nb_hashes
            && self.seed == other.seed
            && self.filter == other.filter
            && self.length == other.length
    }
}
impl Eq for BloomFilter {}
