//! Container reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::debug;

use super::format::*;
use crate::document::{decode, Object};
use crate::util::{Error, Result};

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub container_version: u32,
    pub content_version: u32,
    pub uncompressed_size: u64,
}

impl ContainerHeader {
    /// Parse and validate the fixed-size header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[MAGIC_OFFSET..MAGIC_OFFSET + 4] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let container_version = LittleEndian::read_u32(&data[CONTAINER_VERSION_OFFSET..]);
        if container_version != CONTAINER_VERSION {
            return Err(Error::UnsupportedVersion(container_version));
        }
        Ok(Self {
            container_version,
            content_version: LittleEndian::read_u32(&data[CONTENT_VERSION_OFFSET..]),
            uncompressed_size: LittleEndian::read_u64(&data[SIZE_OFFSET..]),
        })
    }
}

enum Source {
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    Buffer(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Source::Mmap(mmap) => &mmap[..],
            Source::Buffer(buf) => &buf[..],
        }
    }
}

#[cfg(feature = "mmap")]
fn map_file(file: &File) -> Result<Option<Source>> {
    // Safety: the file is opened read-only and the map is dropped with the reader.
    let mmap = unsafe { Mmap::map(file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
    Ok(Some(Source::Mmap(mmap)))
}

#[cfg(not(feature = "mmap"))]
fn map_file(_file: &File) -> Result<Option<Source>> {
    Ok(None)
}

/// Read access to a container file or buffer.
pub struct ContainerReader {
    source: Source,
    header: ContainerHeader,
}

impl ContainerReader {
    /// Open a container file, memory-mapped when available.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a container file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        if use_mmap {
            if let Some(source) = map_file(&file)? {
                return Self::with_source(source);
            }
        }

        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)?;
        Self::with_source(Source::Buffer(buf))
    }

    /// Read a container held in memory.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_source(Source::Buffer(data.into()))
    }

    fn with_source(source: Source) -> Result<Self> {
        let header = ContainerHeader::parse(source.bytes())?;
        Ok(Self { source, header })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Size of the whole container in bytes.
    pub fn size(&self) -> u64 {
        self.source.bytes().len() as u64
    }

    /// Compressed payload following the header.
    pub fn payload(&self) -> &[u8] {
        &self.source.bytes()[HEADER_SIZE..]
    }

    /// Inflate the payload, checking its size against the header.
    pub fn inflate(&self) -> Result<Vec<u8>> {
        let expected = self.header.uncompressed_size;
        if expected > MAX_DOCUMENT_SIZE {
            return Err(Error::Capacity {
                size: expected,
                limit: MAX_DOCUMENT_SIZE,
            });
        }
        let mut out = Vec::with_capacity(expected as usize);
        // Read one byte past the declared size to detect oversized payloads.
        DeflateDecoder::new(self.payload())
            .take(expected + 1)
            .read_to_end(&mut out)?;
        if out.len() as u64 != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: out.len() as u64,
            });
        }
        debug!(compressed = self.payload().len(), uncompressed = expected, "inflated container");
        Ok(out)
    }

    /// Inflate and decode the document.
    pub fn document(&self) -> Result<Object> {
        decode(&self.inflate()?)
    }
}

/// Read the document stored in a container file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Object> {
    ContainerReader::open(path)?.document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerWriter;
    use crate::document::Value;

    fn sample() -> Object {
        Object::new()
            .with("Name", "Plane")
            .with("Data", vec![1u8, 2, 3, 4])
            .with("Items", vec![Value::from(1.0), Value::from(2.0)])
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let bytes = ContainerWriter::default().to_bytes(&sample()).unwrap();
        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.header().container_version, CONTAINER_VERSION);
        assert_eq!(reader.header().content_version, CONTENT_VERSION);
        assert_eq!(reader.document().unwrap(), sample());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = ContainerWriter::default().to_bytes(&sample()).unwrap();
        bytes[0] = b'x';
        assert!(matches!(ContainerReader::from_bytes(bytes), Err(Error::InvalidMagic)));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = ContainerWriter::default().to_bytes(&sample()).unwrap();
        bytes[4] = 2;
        assert!(matches!(
            ContainerReader::from_bytes(bytes),
            Err(Error::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            ContainerReader::from_bytes(b"fcf\0".to_vec()),
            Err(Error::UnexpectedEof(4))
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let mut bytes = ContainerWriter::default().to_bytes(&sample()).unwrap();
        let declared = LittleEndian::read_u64(&bytes[SIZE_OFFSET..]);
        LittleEndian::write_u64(&mut bytes[SIZE_OFFSET..SIZE_OFFSET + 8], declared - 1);
        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert!(matches!(reader.inflate(), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dsc");
        ContainerWriter::default().write_file(&path, &sample()).unwrap();
        for use_mmap in [false, true] {
            let reader = ContainerReader::open_opts(&path, use_mmap).unwrap();
            assert_eq!(reader.document().unwrap(), sample());
        }
        assert!(matches!(
            ContainerReader::open(dir.path().join("missing.dsc")),
            Err(Error::FileNotFound(_))
        ));
    }
}
