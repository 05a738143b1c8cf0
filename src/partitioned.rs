//! Partitioned Bloom filter: `k` disjoint bit vectors, one bit set per hash
//! function.

use crate::bit_vector::BitVector;
use crate::error::{Error, Result};
use crate::hashing::{HashingService, Serialize};

/// A Bloom filter partitioned into `k` disjoint sub-vectors, one per hash
/// function, so that each hash function's bit lives in its own table.
#[derive(Debug, Clone)]
pub struct PartitionedBloomFilter {
    seed: u64,
    sub_size: u32,
    nb_hashes: u32,
    load_factor: f64,
    capacity: u64,
    filters: Vec<BitVector>,
    hashing: HashingService,
}

impl PartitionedBloomFilter {
    /// `k = ceil(log2(1/p))`; each of the `k` sub-vectors has length
    /// `ceil(n * |ln p| / (k * (ln 2)^2)) / ratio`.
    pub fn create(n: u64, p: f64, ratio: f64) -> Result<Self> {
        Self::create_with_seed(n, p, ratio, crate::DEFAULT_SEED)
    }

    pub fn create_with_seed(n: u64, p: f64, ratio: f64, seed: u64) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidArgument("n must be positive".to_string()));
        }
        if !(0.0 < p && p < 1.0) {
            return Err(Error::InvalidArgument("p must be in (0, 1)".to_string()));
        }
        if !(0.0 < ratio && ratio < 1.0) {
            return Err(Error::InvalidArgument(
                "ratio must be in (0, 1)".to_string(),
            ));
        }

        let k = (1.0 / p).log2().ceil() as u32;
        let k = k.max(1);
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let sub_size =
            ((n as f64 * p.ln().abs() / (k as f64 * ln2_sq)).ceil() / ratio).ceil() as u32;
        let sub_size = sub_size.max(1);

        Ok(PartitionedBloomFilter {
            seed,
            sub_size,
            nb_hashes: k,
            load_factor: ratio,
            capacity: n,
            filters: (0..k).map(|_| BitVector::new(sub_size as usize)).collect(),
            hashing: HashingService::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn sub_size(&self) -> u32 {
        self.sub_size
    }

    pub fn nb_hashes(&self) -> u32 {
        self.nb_hashes
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn filters(&self) -> &[BitVector] {
        &self.filters
    }

    /// Reseeds this filter. This does not rehash already-stored bits; doing
    /// so on a non-empty filter is a documented misuse.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn from_parts(
        seed: u64,
        sub_size: u32,
        nb_hashes: u32,
        load_factor: f64,
        capacity: u64,
        filters: Vec<BitVector>,
    ) -> Self {
        PartitionedBloomFilter {
            seed,
            sub_size,
            nb_hashes,
            load_factor,
            capacity,
            filters,
            hashing: HashingService::new(),
        }
    }

    /// Sets one bit per partition for `value`: a single hash pair is derived
    /// for `value`, and each partition's bit comes from double-hashing that
    /// same pair with the partition's own index as `i`.
    pub fn add<T: Serialize + ?Sized>(&mut self, value: &T) {
        let (a, b) = self.hashing.hash_int_and_string(value, self.seed);
        for (i, partition) in self.filters.iter_mut().enumerate() {
            let idx = self.hashing.double_hashing(i as u64, a, b, self.sub_size);
            partition.set(idx as usize);
        }
    }

    /// `true` iff every partition has its corresponding bit set for `value`.
    pub fn has<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        let (a, b) = self.hashing.hash_int_and_string(value, self.seed);
        self.filters.iter().enumerate().all(|(i, partition)| {
            let idx = self.hashing.double_hashing(i as u64, a, b, self.sub_size);
            partition.get(idx as usize)
        })
    }

    /// The mean fraction of set bits across all partitions.
    pub fn current_load(&self) -> f64 {
        let total: f64 = self
            .filters
            .iter()
            .map(|f| f.popcount() as f64 / f.width() as f64)
            .sum();
        total / self.filters.len() as f64
    }

    /// The current theoretical false-positive rate, approximated as
    /// `current_load^k` (each of the `k` independent partitions contributes
    /// its own load as the chance of a false collision). Used by the
    /// scalable filter's `rate()`, which delegates to its last inner
    /// filter's rate.
    pub fn rate(&self) -> f64 {
        self.current_load().powf(f64::from(self.nb_hashes))
    }
}

impl PartialEq for PartitionedBloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.sub_size == other.sub_size
            && self.nb_hashes == other.nb_hashes
            && self.load_factor == other.load_factor
            && self.capacity == other.capacity
            && self.filters == other.filters
    }
}
impl Eq for PartitionedBloomFilter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_add_has() {
        let mut f = PartitionedBloomFilter::create(100, 0.01, 0.5).unwrap();
        assert!(!f.has("foo"));
        f.add("foo");
        assert!(f.has("foo"));
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(PartitionedBloomFilter::create(0, 0.01, 0.5).is_err());
        assert!(PartitionedBloomFilter::create(10, 0.0, 0.5).is_err());
        assert!(PartitionedBloomFilter::create(10, 0.01, 1.0).is_err());
    }

    #[test]
    fn current_load_increases_with_inserts() {
        let mut f = PartitionedBloomFilter::create(200, 0.01, 0.5).unwrap();
        let before = f.current_load();
        for i in 0..100 {
            f.add(&format!("item-{i}"));
        }
        assert!(f.current_load() > before);
    }

    #[test]
    fn no_false_negatives() {
        let mut f = PartitionedBloomFilter::create(500, 0.01, 0.5).unwrap();
        let items: Vec<String> = (0..500).map(|i| format!("item-{i}")).collect();
        for item in &items {
            f.add(item);
        }
        for item in &items {
            assert!(f.has(item));
        }
    }

    #[test]
    fn equals_compares_all_fields() {
        let mut a = PartitionedBloomFilter::create_with_seed(50, 0.01, 0.5, 3).unwrap();
        let mut b = PartitionedBloomFilter::create_with_seed(50, 0.01, 0.5, 3).unwrap();
        assert_eq!(a, b);
        a.add("x");
        assert_ne!(a, b);
        b.add("x");
        assert_eq!(a, b);
    }
}
