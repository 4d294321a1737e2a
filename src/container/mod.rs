//! Compressed container around an encoded document.
//!
//! A container is a fixed 20-byte header followed by a raw deflate stream
//! (no zlib wrapper) of the encoded document. See [`format`] for the layout.

pub mod format;

mod reader;
mod writer;

pub use reader::{read_file, ContainerHeader, ContainerReader};
pub use writer::{check_capacity, ContainerWriter};
