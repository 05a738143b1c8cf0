//! Cuckoo filter: buckets of fingerprints with partial-key cuckoo hashing and
//! kick-out eviction. Fingerprint/index derivation and the bucket count
//! rounded to a power of two follow the usual partial-key cuckoo filter
//! construction; the undo-log rollback on an exhausted kick loop keeps a
//! failed, non-destructive `add` from mutating any bucket.

use crate::bucket::{Bucket, Fingerprint};
use crate::error::{Error, Result};
use crate::hash::hash64;
use crate::hashing::Serialize;
use crate::rng::SeededRng;

const DEFAULT_BUCKET_SIZE: usize = 4;
const DEFAULT_MAX_KICKS: usize = 500;

/// A cuckoo filter: an array of fixed-capacity buckets holding short
/// fingerprints, with two candidate buckets per element and a bounded
/// eviction loop used when both are full.
#[derive(Debug, Clone)]
pub struct CuckooFilter {
    seed: u64,
    size: usize,
    bucket_size: usize,
    fingerprint_length: u32,
    max_kicks: usize,
    length: u64,
    buckets: Vec<Bucket>,
    rng: SeededRng,
}

fn next_power_of_two(n: u64) -> usize {
    n.next_power_of_two() as usize
}

impl CuckooFilter {
    /// `fingerprint_length = ceil(log2(1/p) + log2(2*bucket_size))` bits;
    /// `capacity = ceil(max(n,32)/bucket_size/0.955)` rounded up to the next
    /// power of two.
    pub fn create(n: u64, p: f64, bucket_size: usize, max_kicks: usize) -> Result<Self> {
        Self::create_with_seed(n, p, bucket_size, max_kicks, crate::DEFAULT_SEED)
    }

    pub fn create_with_seed(
        n: u64,
        p: f64,
        bucket_size: usize,
        max_kicks: usize,
        seed: u64,
    ) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidArgument("n must be positive".to_string()));
        }
        if !(0.0 < p && p < 1.0) {
            return Err(Error::InvalidArgument("p must be in (0, 1)".to_string()));
        }
        if bucket_size == 0 {
            return Err(Error::InvalidArgument(
                "bucket_size must be positive".to_string(),
            ));
        }
        if max_kicks == 0 {
            return Err(Error::InvalidArgument(
                "max_kicks must be positive".to_string(),
            ));
        }

        let fingerprint_length =
            ((1.0 / p).log2() + (2.0 * bucket_size as f64).log2()).ceil() as u32;
        if fingerprint_length == 0 || fingerprint_length > 64 {
            return Err(Error::InvalidArgument(format!(
                "fingerprint_length {fingerprint_length} exceeds the 64-bit hash primitive's width"
            )));
        }

        let raw_capacity =
            (n.max(32) as f64 / bucket_size as f64 / 0.955).ceil() as u64;
        let size = next_power_of_two(raw_capacity.max(1));

        Ok(CuckooFilter {
            seed,
            size,
            bucket_size,
            fingerprint_length,
            max_kicks,
            length: 0,
            buckets: (0..size).map(|_| Bucket::new(bucket_size)).collect(),
            rng: SeededRng::from_seed(seed),
        })
    }

    pub fn with_defaults(n: u64, p: f64) -> Result<Self> {
        Self::create(n, p, DEFAULT_BUCKET_SIZE, DEFAULT_MAX_KICKS)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    pub fn fingerprint_length(&self) -> u32 {
        self.fingerprint_length
    }

    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Setting the seed later reseeds the PRNG used for eviction choices but
    /// does not rehash already-stored fingerprints; doing so on a non-empty
    /// filter is a documented misuse.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = SeededRng::from_seed(seed);
    }

    pub fn from_parts(
        seed: u64,
        size: usize,
        bucket_size: usize,
        fingerprint_length: u32,
        max_kicks: usize,
        length: u64,
        buckets: Vec<Bucket>,
    ) -> Self {
        CuckooFilter {
            seed,
            size,
            bucket_size,
            fingerprint_length,
            max_kicks,
            length,
            buckets,
            rng: SeededRng::from_seed(seed),
        }
    }

    fn fingerprint_of<T: Serialize + ?Sized>(&self, value: &T) -> (u64, Fingerprint) {
        let h = hash64(&value.to_bytes(), self.seed);
        (h, fingerprint_bytes(h, self.fingerprint_length))
    }

    /// The two candidate bucket indices and fingerprint for `value`.
    /// `second_index` is computed via the partial-key formula `first_index
    /// xor (hash(fp) mod size)`, which is algebraically identical to `(h xor
    /// hash64(fp)) mod 2^32 mod size` because `_size` is a power of two
    /// (mod-by-power-of-two distributes over xor) — the same formula the
    /// eviction loop reuses to recompute an index from a fingerprint alone.
    fn locations<T: Serialize + ?Sized>(&self, value: &T) -> (usize, usize, Fingerprint) {
        let (h, fp) = self.fingerprint_of(value);
        let first_index = (h as u32 as usize) % self.size;
        let second_index = self.alternate_index(first_index, &fp);
        (first_index, second_index, fp)
    }

    fn alternate_index(&self, index: usize, fingerprint: &[u8]) -> usize {
        let fp_hash = hash64(fingerprint, self.seed);
        index ^ ((fp_hash as u32 as usize) % self.size)
    }

    /// Inserts `value`. Returns `Ok(true)` on success, `Ok(false)` if the
    /// kick budget was exhausted and `throw_on_full` is `false`, or
    /// `Err(Error::FilterFull)` if it was exhausted and `throw_on_full` is
    /// `true`. When `destructive` is `false` (the default), an exhausted
    /// kick loop restores every bucket slot it touched to its prior value.
    pub fn add<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
        throw_on_full: bool,
        destructive: bool,
    ) -> Result<bool> {
        let (first_index, second_index, fp) = self.locations(value);

        if self.buckets[first_index].is_free() {
            self.buckets[first_index].add(fp);
            self.length += 1;
            return Ok(true);
        }
        if self.buckets[second_index].is_free() {
            self.buckets[second_index].add(fp);
            self.length += 1;
            return Ok(true);
        }

        self.evict(first_index, second_index, fp, throw_on_full, destructive)
    }

    fn evict(
        &mut self,
        first_index: usize,
        second_index: usize,
        fp: Fingerprint,
        throw_on_full: bool,
        destructive: bool,
    ) -> Result<bool> {
        let mut index = self.rng.choose_pair(first_index, second_index);
        let mut f = fp;
        let mut undo: Vec<(usize, usize, Option<Fingerprint>)> = Vec::with_capacity(self.max_kicks);

        for _ in 0..self.max_kicks {
            let bucket = &self.buckets[index];
            let slot = self.rng.gen_range_inclusive(0, bucket.capacity() - 1);
            let previous = bucket.at(slot).cloned();
            undo.push((index, slot, previous));

            let evicted = self.buckets[index]
                .swap_at(slot, f.clone())
                .expect("the full bucket that forced eviction always has an occupant at every slot");
            f = evicted;
            index = self.alternate_index(index, &f);

            if self.buckets[index].is_free() {
                self.buckets[index].add(f);
                self.length += 1;
                return Ok(true);
            }
        }

        if !destructive {
            log::warn!(
                "cuckoo filter exhausted {} kicks; rolling back {} touched slots",
                self.max_kicks,
                undo.len()
            );
            for (bucket_index, slot, previous) in undo.into_iter().rev() {
                self.buckets[bucket_index].set_at(slot, previous);
            }
        }

        if throw_on_full {
            Err(Error::FilterFull)
        } else {
            Ok(false)
        }
    }

    /// Removes the first matching fingerprint from either candidate bucket.
    pub fn remove<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        let (first_index, second_index, fp) = self.locations(value);
        if self.buckets[first_index].remove(&fp) {
            self.length -= 1;
            true
        } else if self.buckets[second_index].remove(&fp) {
            self.length -= 1;
            true
        } else {
            false
        }
    }

    /// `true` iff either candidate bucket holds `value`'s fingerprint.
    pub fn has<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        let (first_index, second_index, fp) = self.locations(value);
        self.buckets[first_index].has(&fp) || self.buckets[second_index].has(&fp)
    }

    /// The current theoretical false-positive rate. `2^(log2(2*bucket_size)
    /// - load*c)` with `c = fingerprint_length/load` cancels `load`
    /// algebraically to `2*bucket_size / 2^fingerprint_length` (independent
    /// of current occupancy) — computed directly here to avoid dividing by
    /// a zero `load` on an empty filter.
    pub fn rate(&self) -> f64 {
        (2.0 * self.bucket_size as f64) / 2f64.powi(self.fingerprint_length as i32)
    }

    /// `PartialEq` for `CuckooFilter` compares bucket contents only, which
    /// means two filters can compare equal yet still disagree on future
    /// inserts if their seed or sizing differ. Use
    /// [`CuckooFilter::deep_equals`] for a relation that also compares
    /// sizing and bookkeeping fields.
    pub fn deep_equals(&self, other: &Self) -> bool {
        self == other
            && self.seed == other.seed
            && self.length == other.length
            && self.bucket_size == other.bucket_size
            && self.fingerprint_length == other.fingerprint_length
            && self.max_kicks == other.max_kicks
    }
}

impl PartialEq for CuckooFilter {
    fn eq(&self, other: &Self) -> bool {
        self.buckets == other.buckets
    }
}
impl Eq for CuckooFilter {}

/// Packs the low `bits` bits of `h` into a big-endian byte string of length
/// `ceil(bits/8)`.
fn fingerprint_bytes(h: u64, bits: u32) -> Fingerprint {
    let byte_len = ((bits as usize) + 7) / 8;
    let mask: u64 = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let value = h & mask;
    (0..byte_len)
        .rev()
        .map(|i| ((value >> (8 * i)) & 0xFF) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_fingerprint_width_and_capacity() {
        let f = CuckooFilter::create(1000, 0.01, 4, 500).unwrap();
        assert_eq!(f.fingerprint_length(), 10);
        assert_eq!(f.size(), 512);
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(CuckooFilter::create(0, 0.01, 4, 500).is_err());
        assert!(CuckooFilter::create(10, 0.0, 4, 500).is_err());
        assert!(CuckooFilter::create(10, 0.01, 0, 500).is_err());
        assert!(CuckooFilter::create(10, 0.01, 4, 0).is_err());
    }

    #[test]
    fn rejects_fingerprint_wider_than_hash() {
        // log2(1/p) alone would need p astronomically small; force it with
        // an extreme bucket_size too, to exceed 64 bits.
        let err = CuckooFilter::create(10, 1e-300, 1 << 40, 500).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn add_and_has() {
        let mut f = CuckooFilter::with_defaults(1000, 0.01).unwrap();
        assert!(!f.has("hello"));
        assert!(f.add("hello", false, false).unwrap());
        assert!(f.has("hello"));
        assert_eq!(f.length(), 1);
    }

    #[test]
    fn remove_then_absent() {
        let mut f = CuckooFilter::with_defaults(1000, 0.01).unwrap();
        f.add("hello", false, false).unwrap();
        assert!(f.remove("hello"));
        assert!(!f.has("hello"));
        assert!(!f.remove("hello"));
    }

    #[test]
    fn no_false_negatives_without_removal() {
        let mut f = CuckooFilter::with_defaults(2000, 0.01).unwrap();
        let items: Vec<String> = (0..1500).map(|i| format!("cuckoo-item-{i}")).collect();
        for item in &items {
            f.add(item, false, false).unwrap();
        }
        for item in &items {
            assert!(f.has(item));
        }
    }

    #[test]
    fn partial_key_symmetry_holds() {
        let f = CuckooFilter::with_defaults(1000, 0.01).unwrap();
        for i in 0..200 {
            let value = format!("sym-{i}");
            let (first, second, fp) = f.locations(&value);
            let expected_second = first ^ ((hash64(&fp, f.seed()) as u32 as usize) % f.size());
            assert_eq!(second, expected_second);
        }
    }

    #[test]
    fn full_filter_rolls_back_on_exhausted_kicks() {
        // A tiny filter with a single-slot bucket saturates almost
        // immediately, forcing the eviction loop to exhaust its kicks.
        let mut f = CuckooFilter::create(4, 0.2, 1, 2).unwrap();
        let mut last_ok = true;
        for i in 0..64 {
            if !f.add(&format!("fill-{i}"), false, false).unwrap() {
                last_ok = false;
                break;
            }
        }
        assert!(!last_ok, "expected the tiny filter to eventually report full");

        let before = f.clone();
        let throw_result = f.add("one-more-overflow", true, false);
        assert!(matches!(throw_result, Err(Error::FilterFull)));
        assert_eq!(f, before, "rollback must restore bucket contents exactly");
    }

    #[test]
    fn deep_equals_checks_bookkeeping_too() {
        let a = CuckooFilter::create_with_seed(500, 0.01, 4, 500, 9).unwrap();
        let b = CuckooFilter::create_with_seed(500, 0.01, 4, 500, 9).unwrap();
        assert!(a.deep_equals(&b));

        let c = CuckooFilter::create_with_seed(500, 0.01, 4, 500, 10).unwrap();
        assert!(a == c, "PartialEq compares bucket contents only, not seed");
        assert!(!a.deep_equals(&c));
    }

    #[test]
    fn rate_depends_only_on_bucket_size_and_fingerprint_length() {
        let f = CuckooFilter::create(1000, 0.01, 4, 500).unwrap();
        let expected = 8.0 / 2f64.powi(f.fingerprint_length() as i32);
        assert!((f.rate() - expected).abs() < 1e-12);
    }
}
