use thiserror::Error;

/// Errors produced by this crate's filters and serialization layer.
///
/// `has` and `remove` never fail — absence is expressed as `false`, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor argument was out of its valid range: a non-positive size,
    /// a false-positive rate outside `(0, 1)`, a distinct-index `count` larger
    /// than the table `size`, or a fingerprint wider than the hash primitive.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A cuckoo filter's `add` exhausted `max_kicks` evictions with
    /// `throw_on_full` set. The filter's prior state has already been restored.
    #[error("filter is full: could not insert item within the kick budget")]
    FilterFull,

    /// An exported record was malformed, missing fields, or had a shape that
    /// does not match the filter it was imported into.
    #[error("import error: {0}")]
    ImportError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
