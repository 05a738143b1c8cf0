//! Scalable Bloom filter: a growing list of partitioned Bloom filters with
//! geometrically tightening error rates, appending a new partition whenever
//! the current one saturates rather than being sized up front.

use crate::error::{Error, Result};
use crate::hashing::Serialize;
use crate::partitioned::PartitionedBloomFilter;

/// The fixed growth base `s` each new partition's target size scales by.
const GROWTH_BASE: f64 = 2.0;

/// A Bloom filter that grows by appending new partitioned filters as the
/// current one saturates, rather than being sized up front.
#[derive(Debug, Clone)]
pub struct ScalableBloomFilter {
    seed: u64,
    initial_size: u64,
    error_rate: f64,
    ratio: f64,
    filters: Vec<PartitionedBloomFilter>,
}

impl ScalableBloomFilter {
    pub fn create(initial_size: u64, error_rate: f64, ratio: f64) -> Result<Self> {
        Self::create_with_seed(initial_size, error_rate, ratio, crate::DEFAULT_SEED)
    }

    pub fn create_with_seed(
        initial_size: u64,
        error_rate: f64,
        ratio: f64,
        seed: u64,
    ) -> Result<Self> {
        if initial_size == 0 {
            return Err(Error::InvalidArgument(
                "initial_size must be positive".to_string(),
            ));
        }
        if !(0.0 < error_rate && error_rate < 1.0) {
            return Err(Error::InvalidArgument(
                "error_rate must be in (0, 1)".to_string(),
            ));
        }
        if !(0.0 < ratio && ratio < 1.0) {
            return Err(Error::InvalidArgument(
                "ratio must be in (0, 1)".to_string(),
            ));
        }

        let first = PartitionedBloomFilter::create_with_seed(initial_size, error_rate, ratio, seed)?;

        Ok(ScalableBloomFilter {
            seed,
            initial_size,
            error_rate,
            ratio,
            filters: vec![first],
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn initial_size(&self) -> u64 {
        self.initial_size
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn filters(&self) -> &[PartitionedBloomFilter] {
        &self.filters
    }

    /// Reseeds this filter and every inner partitioned filter. This does not
    /// rehash already-stored data; doing so on a non-empty filter is a
    /// documented misuse.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        for filter in &mut self.filters {
            filter.set_seed(seed);
        }
    }

    pub fn from_parts(
        seed: u64,
        initial_size: u64,
        error_rate: f64,
        ratio: f64,
        filters: Vec<PartitionedBloomFilter>,
    ) -> Self {
        ScalableBloomFilter {
            seed,
            initial_size,
            error_rate,
            ratio,
            filters,
        }
    }

    /// Appends a new partitioned filter sized and tuned for the next growth
    /// step: `size_j = initial_size * s^(j+1) * ln(2)`, `error_j = error_rate
    /// * ratio^j`, where `j` is the new filter's (0-indexed) position.
    fn grow(&mut self) {
        let j = self.filters.len();
        let size_j = (self.initial_size as f64 * GROWTH_BASE.powi((j + 1) as i32)
            * std::f64::consts::LN_2)
            .ceil() as u64;
        let size_j = size_j.max(1);
        let error_j = self.error_rate * self.ratio.powi(j as i32);

        let next = PartitionedBloomFilter::create_with_seed(size_j, error_j, self.ratio, self.seed)
            .expect("growth parameters are always in valid ranges once the filter was constructed");
        log::debug!(
            "scalable bloom filter growing: appending partition {j} (size={size_j}, error={error_j})"
        );
        self.filters.push(next);
    }

    /// Grows the filter if its last partition has saturated, then inserts
    /// into the (possibly new) last partition.
    pub fn add<T: Serialize + ?Sized>(&mut self, value: &T) {
        let last = self.filters.last().expect("always has at least one filter");
        if last.current_load() > last.load_factor() {
            self.grow();
        }
        let last = self.filters.last_mut().expect("always has at least one filter");
        last.add(value);
    }

    /// `true` iff any inner filter reports the value present.
    pub fn has<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        self.filters.iter().any(|f| f.has(value))
    }

    /// The sum of every inner filter's intended item capacity.
    pub fn capacity(&self) -> u64 {
        self.filters.iter().map(|f| f.capacity()).sum()
    }

    /// The last inner filter's theoretical false-positive rate.
    pub fn rate(&self) -> f64 {
        self.filters
            .last()
            .expect("always has at least one filter")
            .rate()
    }
}

impl PartialEq for ScalableBloomFilter {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.ratio == other.ratio
            && self.capacity() == other.capacity()
            && self.filters == other.filters
    }
}
impl Eq for ScalableBloomFilter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::Serialize as SerializeTrait;

    #[test]
    fn create_add_has() {
        let mut f = ScalableBloomFilter::create(10, 0.01, 0.9).unwrap();
        assert!(!f.has("foo"));
        f.add("foo");
        assert!(f.has("foo"));
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(ScalableBloomFilter::create(0, 0.01, 0.9).is_err());
        assert!(ScalableBloomFilter::create(10, 0.0, 0.9).is_err());
        assert!(ScalableBloomFilter::create(10, 0.01, 1.0).is_err());
    }

    #[test]
    fn grows_when_saturated() {
        let mut f = ScalableBloomFilter::create(4, 0.1, 0.9).unwrap();
        let before = f.filters().len();
        for i in 0..200 {
            f.add(&format!("item-{i}"));
        }
        assert!(f.filters().len() > before);
    }

    #[test]
    fn filter_count_is_non_decreasing() {
        let mut f = ScalableBloomFilter::create(4, 0.1, 0.9).unwrap();
        let mut last_len = f.filters().len();
        for i in 0..500 {
            f.add(&format!("item-{i}"));
            assert!(f.filters().len() >= last_len);
            last_len = f.filters().len();
        }
    }

    #[test]
    fn error_budget_converges_below_bound() {
        let error_rate = 0.1;
        let ratio = 0.9;
        let f = ScalableBloomFilter::create(4, error_rate, ratio).unwrap();
        // Partial sums of error_rate * ratio^j must stay below the infinite
        // geometric series bound, for any number of growths.
        let bound = error_rate / (1.0 - ratio);
        let partial_sum: f64 = (0..50).map(|j| error_rate * ratio.powi(j)).sum();
        assert!(partial_sum < bound);
        let _ = f; // constructed only to ground the error_rate/ratio used above
    }

    #[test]
    fn no_false_negatives_across_growth() {
        let mut f = ScalableBloomFilter::create(4, 0.05, 0.8).unwrap();
        let items: Vec<String> = (0..300).map(|i| format!("item-{i}")).collect();
        for item in &items {
            f.add(item);
        }
        for item in &items {
            assert!(f.has(item));
        }
    }

    #[test]
    fn s6_equality_under_forced_collision() {
        struct Constant(u8);
        impl SerializeTrait for Constant {
            fn to_bytes(&self) -> Vec<u8> {
                vec![1]
            }
        }

        // Both filters only ever see the byte [1] regardless of which
        // logical item was inserted, so their bit patterns must match even
        // though the "items" differ.
        let mut a = ScalableBloomFilter::create_with_seed(10, 0.01, 0.9, 1).unwrap();
        let mut b = ScalableBloomFilter::create_with_seed(10, 0.01, 0.9, 1).unwrap();
        a.add(&Constant(1));
        b.add(&Constant(2));
        assert_eq!(a, b);
    }
}
