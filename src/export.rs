//! Structural serialization for every filter in this crate, behind the
//! `serde` cargo feature. Each filter gets a separate mirror record rather
//! than deriving `Serialize`/`Deserialize` directly on it: the export field
//! names (`_nbHashes`, `_loadFactor`, ...) and the `BigIntSeed` wrapper are a
//! wire format distinct from this crate's own internal naming, so keeping
//! them in dedicated records avoids leaking on-disk field names into the
//! Rust API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_crate::{Deserialize, Serialize};

use crate::bit_vector::BitVector;
use crate::bucket::Bucket;
use crate::classic::BloomFilter;
use crate::cuckoo::CuckooFilter;
use crate::error::{Error, Result};
use crate::partitioned::PartitionedBloomFilter;
use crate::scalable::ScalableBloomFilter;

/// A seed represented as an arbitrary-precision big integer on the wire, so
/// exported filters stay byte-for-byte compatible across implementations
/// even though this crate's own seeds are plain `u64`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct BigIntSeed {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl From<u64> for BigIntSeed {
    fn from(seed: u64) -> Self {
        BigIntSeed {
            kind: "BigInt".to_string(),
            value: seed.to_string(),
        }
    }
}

impl TryFrom<BigIntSeed> for u64 {
    type Error = Error;

    fn try_from(value: BigIntSeed) -> Result<u64> {
        if value.kind != "BigInt" {
            return Err(Error::ImportError(format!(
                "expected seed type \"BigInt\", found {:?}",
                value.kind
            )));
        }
        value
            .value
            .parse()
            .map_err(|e| Error::ImportError(format!("invalid seed value: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct BitVectorRecord {
    pub size: usize,
    pub content: String,
}

impl From<&BitVector> for BitVectorRecord {
    fn from(bv: &BitVector) -> Self {
        let mut bytes = Vec::with_capacity(bv.words().len() * 8);
        for word in bv.words() {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        BitVectorRecord {
            size: bv.width(),
            content: STANDARD.encode(bytes),
        }
    }
}

impl TryFrom<&BitVectorRecord> for BitVector {
    type Error = Error;

    fn try_from(record: &BitVectorRecord) -> Result<BitVector> {
        let bytes = STANDARD
            .decode(&record.content)
            .map_err(|e| Error::ImportError(format!("invalid bit vector content: {e}")))?;
        let expected_words = (record.size.max(1) + 63) / 64;
        if bytes.len() != expected_words * 8 {
            return Err(Error::ImportError(format!(
                "bit vector content has {} bytes, expected {}",
                bytes.len(),
                expected_words * 8
            )));
        }
        let words = bytes
            .chunks_exact(8)
            .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(BitVector::from_words(record.size, words))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct ClassicBloomRecord {
    #[serde(rename = "_seed")]
    pub seed: BigIntSeed,
    #[serde(rename = "_size")]
    pub size: u32,
    #[serde(rename = "_nbHashes")]
    pub nb_hashes: u32,
    #[serde(rename = "_filter")]
    pub filter: BitVectorRecord,
    #[serde(rename = "_length")]
    pub length: u64,
}

impl From<&BloomFilter> for ClassicBloomRecord {
    fn from(f: &BloomFilter) -> Self {
        ClassicBloomRecord {
            seed: f.seed().into(),
            size: f.size(),
            nb_hashes: f.nb_hashes(),
            filter: f.filter().into(),
            length: f.length(),
        }
    }
}

impl TryFrom<ClassicBloomRecord> for BloomFilter {
    type Error = Error;

    fn try_from(record: ClassicBloomRecord) -> Result<BloomFilter> {
        let seed: u64 = record.seed.try_into()?;
        let filter: BitVector = (&record.filter).try_into()?;
        Ok(BloomFilter::from_parts(
            seed,
            record.size,
            record.nb_hashes,
            filter,
            record.length,
        ))
    }
}

pub fn classic_to_json(f: &BloomFilter) -> Result<String> {
    let record: ClassicBloomRecord = f.into();
    serde_json::to_string(&record).map_err(|e| Error::ImportError(e.to_string()))
}

pub fn classic_from_json(json: &str) -> Result<BloomFilter> {
    let record: ClassicBloomRecord =
        serde_json::from_str(json).map_err(|e| Error::ImportError(e.to_string()))?;
    record.try_into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct PartitionedBloomRecord {
    #[serde(rename = "_seed")]
    pub seed: BigIntSeed,
    #[serde(rename = "_size")]
    pub size: u32,
    #[serde(rename = "_nbHashes")]
    pub nb_hashes: u32,
    #[serde(rename = "_loadFactor")]
    pub load_factor: f64,
    #[serde(rename = "_filter")]
    pub filter: Vec<BitVectorRecord>,
    #[serde(rename = "_capacity")]
    pub capacity: u64,
}

impl From<&PartitionedBloomFilter> for PartitionedBloomRecord {
    fn from(f: &PartitionedBloomFilter) -> Self {
        PartitionedBloomRecord {
            seed: f.seed().into(),
            size: f.sub_size(),
            nb_hashes: f.nb_hashes(),
            load_factor: f.load_factor(),
            filter: f.filters().iter().map(BitVectorRecord::from).collect(),
            capacity: f.capacity(),
        }
    }
}

impl TryFrom<PartitionedBloomRecord> for PartitionedBloomFilter {
    type Error = Error;

    fn try_from(record: PartitionedBloomRecord) -> Result<PartitionedBloomFilter> {
        let seed: u64 = record.seed.try_into()?;
        let filters = record
            .filter
            .iter()
            .map(BitVector::try_from)
            .collect::<Result<Vec<_>>>()?;
        if filters.len() != record.nb_hashes as usize {
            return Err(Error::ImportError(format!(
                "expected {} partitions, found {}",
                record.nb_hashes,
                filters.len()
            )));
        }
        Ok(PartitionedBloomFilter::from_parts(
            seed,
            record.size,
            record.nb_hashes,
            record.load_factor,
            record.capacity,
            filters,
        ))
    }
}

pub fn partitioned_to_json(f: &PartitionedBloomFilter) -> Result<String> {
    let record: PartitionedBloomRecord = f.into();
    serde_json::to_string(&record).map_err(|e| Error::ImportError(e.to_string()))
}

pub fn partitioned_from_json(json: &str) -> Result<PartitionedBloomFilter> {
    let record: PartitionedBloomRecord =
        serde_json::from_str(json).map_err(|e| Error::ImportError(e.to_string()))?;
    record.try_into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct ScalableBloomRecord {
    #[serde(rename = "_seed")]
    pub seed: BigIntSeed,
    #[serde(rename = "_initial_size")]
    pub initial_size: u64,
    #[serde(rename = "_error_rate")]
    pub error_rate: f64,
    #[serde(rename = "_ratio")]
    pub ratio: f64,
    #[serde(rename = "_filters")]
    pub filters: Vec<PartitionedBloomRecord>,
}

impl From<&ScalableBloomFilter> for ScalableBloomRecord {
    fn from(f: &ScalableBloomFilter) -> Self {
        ScalableBloomRecord {
            seed: f.seed().into(),
            initial_size: f.initial_size(),
            error_rate: f.error_rate(),
            ratio: f.ratio(),
            filters: f.filters().iter().map(PartitionedBloomRecord::from).collect(),
        }
    }
}

impl TryFrom<ScalableBloomRecord> for ScalableBloomFilter {
    type Error = Error;

    fn try_from(record: ScalableBloomRecord) -> Result<ScalableBloomFilter> {
        let seed: u64 = record.seed.try_into()?;
        let filters = record
            .filters
            .into_iter()
            .map(PartitionedBloomFilter::try_from)
            .collect::<Result<Vec<_>>>()?;
        if filters.is_empty() {
            return Err(Error::ImportError(
                "a scalable bloom filter must have at least one inner filter".to_string(),
            ));
        }
        Ok(ScalableBloomFilter::from_parts(
            seed,
            record.initial_size,
            record.error_rate,
            record.ratio,
            filters,
        ))
    }
}

pub fn scalable_to_json(f: &ScalableBloomFilter) -> Result<String> {
    let record: ScalableBloomRecord = f.into();
    serde_json::to_string(&record).map_err(|e| Error::ImportError(e.to_string()))
}

pub fn scalable_from_json(json: &str) -> Result<ScalableBloomFilter> {
    let record: ScalableBloomRecord =
        serde_json::from_str(json).map_err(|e| Error::ImportError(e.to_string()))?;
    record.try_into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct CuckooBucketRecord {
    #[serde(rename = "_size")]
    pub size: usize,
    #[serde(rename = "_elements")]
    pub elements: Vec<String>,
}

impl From<&Bucket> for CuckooBucketRecord {
    fn from(b: &Bucket) -> Self {
        CuckooBucketRecord {
            size: b.capacity(),
            elements: (0..b.capacity())
                .filter_map(|i| b.at(i))
                .map(|fp| hex::encode(fp))
                .collect(),
        }
    }
}

impl TryFrom<&CuckooBucketRecord> for Bucket {
    type Error = Error;

    fn try_from(record: &CuckooBucketRecord) -> Result<Bucket> {
        if record.elements.len() > record.size {
            return Err(Error::ImportError(format!(
                "bucket has {} elements but capacity {}",
                record.elements.len(),
                record.size
            )));
        }
        let mut bucket = Bucket::new(record.size);
        for element in &record.elements {
            let fp =
                hex::decode(element).map_err(|e| Error::ImportError(format!("invalid fingerprint: {e}")))?;
            bucket.add(fp);
        }
        Ok(bucket)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct CuckooRecord {
    #[serde(rename = "_size")]
    pub size: usize,
    #[serde(rename = "_fingerprintLength")]
    pub fingerprint_length: u32,
    #[serde(rename = "_length")]
    pub length: u64,
    #[serde(rename = "_maxKicks")]
    pub max_kicks: usize,
    #[serde(rename = "_bucketSize")]
    pub bucket_size: usize,
    #[serde(rename = "_seed")]
    pub seed: BigIntSeed,
    #[serde(rename = "_filter")]
    pub filter: Vec<CuckooBucketRecord>,
}

impl From<&CuckooFilter> for CuckooRecord {
    fn from(f: &CuckooFilter) -> Self {
        CuckooRecord {
            size: f.size(),
            fingerprint_length: f.fingerprint_length(),
            length: f.length(),
            max_kicks: f.max_kicks(),
            bucket_size: f.bucket_size(),
            seed: f.seed().into(),
            filter: f.buckets().iter().map(CuckooBucketRecord::from).collect(),
        }
    }
}

impl TryFrom<CuckooRecord> for CuckooFilter {
    type Error = Error;

    fn try_from(record: CuckooRecord) -> Result<CuckooFilter> {
        let seed: u64 = record.seed.try_into()?;
        if record.filter.len() != record.size {
            return Err(Error::ImportError(format!(
                "expected {} buckets, found {}",
                record.size,
                record.filter.len()
            )));
        }
        let buckets = record
            .filter
            .iter()
            .map(Bucket::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(CuckooFilter::from_parts(
            seed,
            record.size,
            record.bucket_size,
            record.fingerprint_length,
            record.max_kicks,
            record.length,
            buckets,
        ))
    }
}

pub fn cuckoo_to_json(f: &CuckooFilter) -> Result<String> {
    let record: CuckooRecord = f.into();
    serde_json::to_string(&record).map_err(|e| Error::ImportError(e.to_string()))
}

pub fn cuckoo_from_json(json: &str) -> Result<CuckooFilter> {
    let record: CuckooRecord =
        serde_json::from_str(json).map_err(|e| Error::ImportError(e.to_string()))?;
    record.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_round_trips() {
        let mut f = BloomFilter::create_with_seed(200, 0.01, 7).unwrap();
        for i in 0..50 {
            f.add(&format!("classic-{i}"));
        }
        let json = classic_to_json(&f).unwrap();
        let restored = classic_from_json(&json).unwrap();
        assert_eq!(f, restored);
    }

    #[test]
    fn partitioned_round_trips() {
        let mut f = PartitionedBloomFilter::create_with_seed(200, 0.01, 0.5, 11).unwrap();
        for i in 0..50 {
            f.add(&format!("part-{i}"));
        }
        let json = partitioned_to_json(&f).unwrap();
        let restored = partitioned_from_json(&json).unwrap();
        assert_eq!(f, restored);
    }

    #[test]
    fn scalable_round_trips() {
        let mut f = ScalableBloomFilter::create_with_seed(4, 0.05, 0.8, 3).unwrap();
        for i in 0..300 {
            f.add(&format!("scal-{i}"));
        }
        let json = scalable_to_json(&f).unwrap();
        let restored = scalable_from_json(&json).unwrap();
        assert_eq!(f, restored);
    }

    #[test]
    fn cuckoo_round_trips() {
        let mut f = CuckooFilter::create_with_seed(1000, 0.01, 4, 500, 13).unwrap();
        for i in 0..400 {
            f.add(&format!("cuck-{i}"), false, false).unwrap();
        }
        let json = cuckoo_to_json(&f).unwrap();
        let restored = cuckoo_from_json(&json).unwrap();
        assert!(f.deep_equals(&restored));
    }

    #[test]
    fn malformed_seed_type_is_import_error() {
        let bad = BigIntSeed {
            kind: "Number".to_string(),
            value: "5".to_string(),
        };
        let err: Result<u64> = bad.try_into();
        assert!(matches!(err, Err(Error::ImportError(_))));
    }

    #[test]
    fn bit_vector_content_length_mismatch_is_import_error() {
        let record = BitVectorRecord {
            size: 128,
            content: STANDARD.encode([0u8; 4]),
        };
        let err: Result<BitVector> = (&record).try_into();
        assert!(matches!(err, Err(Error::ImportError(_))));
    }
}
