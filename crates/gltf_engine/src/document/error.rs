//! Errors raised while loading documents and reading accessor data

use std::path::PathBuf;

use super::codes::ComponentType;

/// Result type for document loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Structural failure while decoding a document
///
/// Every variant names the offending field so a broken asset can be fixed
/// without a debugger. Missing external payloads are not load errors; they
/// leave the affected buffer or image without data.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// The document file itself could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// The JSON is invalid, misses a required field or uses an unknown variant name
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The binary container header or chunk layout is broken
    #[error("invalid binary container: {0}")]
    InvalidContainer(String),

    /// A cross-reference points past the end of its target sequence
    #[error("{path}: index {index} is out of range ({len} available)")]
    IndexOutOfRange {
        /// Field holding the reference, e.g. `meshes[0].primitives[1].indices`
        path: String,
        /// Referenced index
        index: usize,
        /// Length of the referenced sequence
        len: usize,
    },

    /// A byte range does not fit inside its buffer
    #[error("{path}: range {offset}..{offset}+{length} exceeds {available} bytes")]
    RangeOutOfBounds {
        /// Field describing the range
        path: String,
        /// Start of the range
        offset: usize,
        /// Length of the range
        length: usize,
        /// Bytes available in the containing buffer
        available: usize,
    },

    /// The node graph is not a forest
    #[error("node {node}: {reason}")]
    InvalidHierarchy {
        /// Node where the problem was detected
        node: usize,
        /// What is wrong with it
        reason: String,
    },

    /// A field holds a value that is not valid where it is used
    #[error("{path}: {reason}")]
    InvalidValue {
        /// Offending field
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Failure while reading typed data through an accessor
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    /// No accessor exists at the requested index
    #[error("accessor {index} does not exist ({count} accessors)")]
    UnknownAccessor {
        /// Requested index
        index: usize,
        /// Number of accessors in the document
        count: usize,
    },

    /// The backing buffer has no resolved payload
    #[error("accessor {accessor}: buffer data is not available")]
    MissingData {
        /// Accessor being read
        accessor: usize,
    },

    /// An element lies outside the resolved bytes of its buffer view
    #[error("accessor {accessor}: {length} bytes at offset {offset} exceed {available} available")]
    OutOfBounds {
        /// Accessor being read
        accessor: usize,
        /// Byte offset of the failing read within the view
        offset: usize,
        /// Size of the failing read
        length: usize,
        /// Bytes available in the view
        available: usize,
    },

    /// The decoded element values cannot be allocated
    #[error("accessor {accessor}: {count} elements are too many to decode")]
    TooLarge {
        /// Accessor being read
        accessor: usize,
        /// Declared element count
        count: usize,
    },

    /// The component type cannot be decoded for this use
    #[error("accessor {accessor}: component type {component_type:?} is not supported here")]
    UnsupportedComponentType {
        /// Accessor being read
        accessor: usize,
        /// Offending component type
        component_type: ComponentType,
    },
}
