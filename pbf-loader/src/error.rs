use std::fmt;
use std::io;

use thiserror::Error;

/// Malformed container stream. Always fatal for the whole read.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("Failed to read stream at byte {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Insufficient read at byte {offset}: got {got} of {expected} bytes")]
    ShortRead { offset: u64, got: usize, expected: usize },

    #[error("Blob header of {0} bytes exceeds the {max} byte limit", max = crate::container::MAX_BLOB_HEADER_SIZE)]
    HeaderTooLarge(u32),

    #[error("Blob of {0} bytes exceeds the {max} byte limit", max = crate::container::MAX_BLOB_SIZE)]
    BlobTooLarge(i32),

    #[error("Zero byte blob (declared size {0})")]
    EmptyBlob(i32),

    #[error("Unknown OSM blob type: {0:?}")]
    UnknownBlobType(String),

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: prost::DecodeError,
    },
}

/// The header blob describes an extract this loader cannot read. Fatal.
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Failed to unpack header blob: {0}")]
    Blob(#[from] BlockError),

    #[error("Failed to decode header block: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Unknown map required feature: {0:?}")]
    UnknownFeature(String),

    #[error("Unsupported map type, missing required feature {0:?}")]
    MissingFeature(&'static str),
}

/// A single data blob could not be turned into entities. The pipeline logs
/// and drops the blob; these never reach the caller of `read_map`.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Unsupported OSM data encoding: {0}")]
    UnsupportedEncoding(&'static str),

    #[error("Zlib blob is missing its raw size")]
    MissingRawSize,

    #[error("Negative raw size {0}")]
    NegativeRawSize(i32),

    #[error("Raw size {0} exceeds the {max} byte blob limit", max = crate::container::MAX_BLOB_SIZE)]
    RawSizeTooLarge(i32),

    #[error("Decompressed {got} bytes, blob declared {expected}")]
    SizeMismatch { got: usize, expected: usize },

    #[error("Failed to decompress blob: {0}")]
    Decompress(#[from] io::Error),

    #[error("Failed to decode primitive block: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Unexpected non-dense node {0}")]
    NonDenseNode(i64),

    #[error("Incorrect dense node lengths: {ids} ids, {lats} lats, {lons} lons")]
    DenseLengths { ids: usize, lats: usize, lons: usize },

    #[error("Dense node key/value list ends after key at position {0}")]
    DanglingKey(usize),

    #[error("{kind} {id}: {keys} keys but {vals} values")]
    AttributeLengths { kind: &'static str, id: i64, keys: usize, vals: usize },

    #[error("Relation {id}: {memids} member ids, {roles} roles, {types} types")]
    MemberLengths { id: i64, memids: usize, roles: usize, types: usize },

    #[error("Relation {id}: unknown member type {tag}")]
    UnknownMemberType { id: i64, tag: i32 },

    #[error("String index {index} out of range for a table of {len}")]
    StringIndex { index: i64, len: usize },
}

/// What had been read when a fatal error stopped the load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub bytes_consumed: u64,
    pub points: usize,
    pub ways: usize,
    pub relations: usize,
}

impl fmt::Display for LoadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes read, {} points, {} ways, {} relations",
            self.bytes_consumed, self.points, self.ways, self.relations
        )
    }
}

#[derive(Error, Debug)]
pub enum LoadErrorKind {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("Worker pool shut down before the read finished")]
    PoolDisconnected,
}

/// Fatal error from `read_map`, together with how far the load got.
#[derive(Error, Debug)]
#[error("Failed to read map ({progress}): {kind}")]
pub struct LoadError {
    #[source]
    pub kind: LoadErrorKind,
    pub progress: LoadProgress,
}

impl LoadError {
    pub fn new(kind: impl Into<LoadErrorKind>, progress: LoadProgress) -> Self {
        Self { kind: kind.into(), progress }
    }
}
