//! The double-hashing service every filter in this crate sits on top of.
//!
//! Given a seed and a value to hash, this service derives an unbounded family
//! of indices into a table of any size, using a two-base-hash-plus-cubic-
//! correction double-hashing scheme.

use crate::error::{Error, Result};
use crate::hash::hash64;
use std::collections::HashSet;

/// A function that turns a hashable value into the bytes fed to the hash
/// primitive. The built-in impls encode strings as UTF-8 and integers as
/// their decimal ASCII form; a caller can implement this trait on their own
/// wrapper type to force hash collisions, e.g. for testing.
pub trait Serialize {
    fn to_bytes(&self) -> Vec<u8>;
}

impl Serialize for str {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Serialize for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

macro_rules! impl_serialize_for_int {
    ($($t:ty),*) => {
        $(
            impl Serialize for $t {
                fn to_bytes(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

impl_serialize_for_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Stateless hashing operations shared by every filter, parameterized only by
/// the filter's own seed (passed explicitly to each call rather than stored,
/// since a filter may carry several independent `HashingService` calls with
/// different seeds — e.g. one per partition's sibling hash).
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingService;

impl HashingService {
    pub fn new() -> Self {
        HashingService
    }

    /// The low and high 32 bits of `hash64(value.to_bytes(), seed)`.
    pub fn hash_int_and_string<T: Serialize + ?Sized>(&self, value: &T, seed: u64) -> (u32, u32) {
        let h = hash64(&value.to_bytes(), seed);
        ((h & 0xFFFF_FFFF) as u32, (h >> 32) as u32)
    }

    /// `(a + i*b + (i^3 - i) / 6) mod size`, all carried out in unsigned
    /// 64-bit arithmetic before being reduced into `[0, size)`.
    pub fn double_hashing(&self, i: u64, a: u32, b: u32, size: u32) -> u32 {
        assert!(size > 0, "double_hashing requires a positive size");
        let i3_minus_i = i.wrapping_mul(i).wrapping_mul(i).wrapping_sub(i) / 6;
        let sum = (a as u64)
            .wrapping_add(i.wrapping_mul(b as u64))
            .wrapping_add(i3_minus_i);
        (sum % size as u64) as u32
    }

    /// Produces `count` pairwise-distinct indices in `[0, size)` for `value`,
    /// by walking `i = 0, 1, 2, ...` through `double_hashing` and skipping
    /// repeats. Terminates for any `count <= size`; fails otherwise.
    pub fn get_distinct_indexes<T: Serialize + ?Sized>(
        &self,
        value: &T,
        size: u32,
        count: u32,
        seed: u64,
    ) -> Result<Vec<u32>> {
        if count > size {
            return Err(Error::InvalidArgument(format!(
                "cannot produce {count} distinct indexes in a table of size {size}"
            )));
        }

        let (a, b) = self.hash_int_and_string(value, seed);
        let mut seen = HashSet::with_capacity(count as usize);
        let mut out = Vec::with_capacity(count as usize);
        let mut i: u64 = 0;

        while out.len() < count as usize {
            let idx = self.double_hashing(i, a, b, size);
            if seen.insert(idx) {
                out.push(idx);
            }
            i += 1;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_double_hashing_worked_example() {
        let svc = HashingService::new();
        assert_eq!(svc.double_hashing(7, 123_456, 987_654, 1000), 90);
    }

    #[test]
    fn s2_distinct_indexes_worked_example() {
        let svc = HashingService::new();
        let key = "da5e21f8a67c4163f1a53ef43515bd027967da305ecfc741b2c3f40f832b7f82";
        let mut idxs = svc.get_distinct_indexes(key, 10_000, 10_000, 0).unwrap();
        idxs.sort_unstable();
        let expected: Vec<u32> = (0..10_000).collect();
        assert_eq!(idxs, expected);
    }

    #[test]
    fn distinct_indexes_are_pairwise_distinct() {
        let svc = HashingService::new();
        let idxs = svc.get_distinct_indexes("some-value", 50, 30, 7).unwrap();
        assert_eq!(idxs.len(), 30);
        let unique: HashSet<u32> = idxs.iter().copied().collect();
        assert_eq!(unique.len(), 30);
        assert!(idxs.iter().all(|&i| i < 50));
    }

    #[test]
    fn count_greater_than_size_is_invalid_argument() {
        let svc = HashingService::new();
        let err = svc.get_distinct_indexes("x", 10, 11, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn count_equal_to_size_terminates() {
        let svc = HashingService::new();
        let idxs = svc.get_distinct_indexes("x", 16, 16, 0).unwrap();
        assert_eq!(idxs.len(), 16);
    }

    #[test]
    fn overridden_serializer_forces_collisions() {
        struct Constant;
        impl Serialize for Constant {
            fn to_bytes(&self) -> Vec<u8> {
                vec![1]
            }
        }

        let svc = HashingService::new();
        let a = svc.hash_int_and_string(&Constant, 0);
        let b = svc.hash_int_and_string(&Constant, 0);
        assert_eq!(a, b);
    }
}
