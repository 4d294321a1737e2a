//! Container writer.

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::format::*;
use crate::document::{encode_object, Object};
use crate::util::{Error, Result};

/// Wraps encoded documents in a compressed container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerWriter {
    level: u32,
}

impl Default for ContainerWriter {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl ContainerWriter {
    /// Create a writer with a deflate level (0-9, clamped).
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Encode and compress `document` into a complete container.
    pub fn to_bytes(&self, document: &Object) -> Result<Vec<u8>> {
        let encoded = encode_object(document)?;
        self.wrap(&encoded)
    }

    /// Compress an already encoded document into a container.
    pub fn wrap(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let size = encoded.len() as u64;
        check_capacity(size)?;

        let mut out = Vec::with_capacity(HEADER_SIZE + encoded.len() / 4);
        out.write_all(MAGIC)?;
        out.write_u32::<LittleEndian>(CONTAINER_VERSION)?;
        out.write_u32::<LittleEndian>(CONTENT_VERSION)?;
        out.write_u64::<LittleEndian>(size)?;

        let mut encoder = DeflateEncoder::new(out, Compression::new(self.level));
        encoder.write_all(encoded)?;
        let out = encoder.finish()?;

        debug!(
            uncompressed = size,
            compressed = out.len() - HEADER_SIZE,
            level = self.level,
            "compressed document"
        );
        Ok(out)
    }

    /// Write `document` to `path`.
    ///
    /// The container is assembled in a temporary file next to `path` and
    /// renamed into place once complete, so a failed export never leaves a
    /// truncated file behind.
    pub fn write_file(&self, path: impl AsRef<Path>, document: &Object) -> Result<u64> {
        let path = path.as_ref();
        let bytes = self.to_bytes(document)?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "wrote container");
        Ok(bytes.len() as u64)
    }
}

/// Reject documents larger than consumers can load.
pub fn check_capacity(size: u64) -> Result<()> {
    if size > MAX_DOCUMENT_SIZE {
        return Err(Error::Capacity {
            size,
            limit: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    #[test]
    fn test_header_layout() {
        let doc = Object::new().with("Name", "Cube");
        let encoded = encode_object(&doc).unwrap();
        let bytes = ContainerWriter::default().to_bytes(&doc).unwrap();

        assert_eq!(&bytes[0..4], b"fcf\0");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
        assert_eq!(&bytes[12..20], &(encoded.len() as u64).to_le_bytes());

        // Raw deflate, no zlib header.
        let mut inflated = Vec::new();
        DeflateDecoder::new(&bytes[HEADER_SIZE..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, encoded);
    }

    #[test]
    fn test_level_zero_still_inflates() {
        let doc = Object::new().with("Data", vec![7u8; 1000]);
        let bytes = ContainerWriter::new(0).to_bytes(&doc).unwrap();
        let mut inflated = Vec::new();
        DeflateDecoder::new(&bytes[HEADER_SIZE..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, encode_object(&doc).unwrap());
    }

    #[test]
    fn test_capacity_limit() {
        assert!(check_capacity(MAX_DOCUMENT_SIZE).is_ok());
        assert!(matches!(
            check_capacity(MAX_DOCUMENT_SIZE + 1),
            Err(Error::Capacity { .. })
        ));
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(ContainerWriter::new(42).level(), 9);
    }

    #[test]
    fn test_write_file_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.dsc");
        std::fs::write(&path, b"stale").unwrap();

        let written = ContainerWriter::default()
            .write_file(&path, &Object::new().with("A", 1))
            .unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len() as u64, written);
        assert_eq!(&on_disk[0..4], MAGIC);

        // Only the target remains in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
