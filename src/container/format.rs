//! Container file layout.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "fcf\0"
//! 4       4     container version (u32 LE)
//! 8       4     content version (u32 LE)
//! 12      8     uncompressed document size (u64 LE)
//! 20      ..    raw deflate stream of the encoded document
//! ```

/// Magic bytes at the start of every container.
pub const MAGIC: &[u8; 4] = b"fcf\0";

/// Container layout version written and accepted.
pub const CONTAINER_VERSION: u32 = 1;

/// Version of the document schema carried in the payload.
pub const CONTENT_VERSION: u32 = 0;

pub const MAGIC_OFFSET: usize = 0;
pub const CONTAINER_VERSION_OFFSET: usize = 4;
pub const CONTENT_VERSION_OFFSET: usize = 8;
pub const SIZE_OFFSET: usize = 12;

/// Total header size; the payload starts here.
pub const HEADER_SIZE: usize = 20;

/// Largest uncompressed document accepted by consumers.
pub const MAX_DOCUMENT_SIZE: u64 = 1 << 32;

/// Default deflate level.
pub const DEFAULT_LEVEL: u32 = 6;
