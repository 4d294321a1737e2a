//! Error types for the Duck exporter.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export, encode and read operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A value reached the binary encoder that the wire format cannot carry
    #[error("Cannot encode document: {0}")]
    Encode(String),

    /// Uncompressed document too large for the container size field consumers
    #[error("Document too large: {size} bytes exceeds the {limit} byte limit")]
    Capacity { size: u64, limit: u64 },

    /// Source geometry changed shape between the base mesh and a morph state
    #[error("Unable to export a morph target for \"{node}\", because the number of vertices changed ({expected} -> {actual})")]
    GeometryInvariant {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// Node refers to a mesh the scene source cannot provide
    #[error("Mesh not available for node: {0}")]
    MissingMesh(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid Duck container: expected \"fcf\" magic bytes")]
    InvalidMagic,

    /// Unsupported container format version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u32),

    /// File is truncated or corrupted
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in document
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// Type tag not part of the wire format
    #[error("Unknown type tag 0x{tag:02X} at position {pos}")]
    UnknownTag { tag: u8, pos: u64 },

    /// Inflated payload length differs from the header
    #[error("Size mismatch: header says {expected} bytes, payload has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON scene or settings error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an encode error.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

/// Result type alias for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;
