//! Binary document encoder.
//!
//! Containers are written with a placeholder length which is patched by
//! seeking back once the body is complete, so the sink must be seekable.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::trace;

use super::format::*;
use super::value::{Object, Value};
use crate::util::{Error, Result};

/// Serialize a document tree. The root must be an object.
pub fn encode(root: &Value) -> Result<Vec<u8>> {
    match root {
        Value::Object(object) => encode_object(object),
        other => Err(Error::encode(format!(
            "document root must be an object, got {}",
            other.type_name()
        ))),
    }
}

/// Serialize an object as a complete document.
pub fn encode_object(root: &Object) -> Result<Vec<u8>> {
    let mut encoder = DocumentEncoder::new(Cursor::new(Vec::new()));
    encoder.write_document(root)?;
    let bytes = encoder.into_inner().into_inner();
    trace!(bytes = bytes.len(), "encoded document");
    Ok(bytes)
}

/// Streaming encoder over any seekable sink.
pub struct DocumentEncoder<W: Write + Seek> {
    writer: W,
}

impl<W: Write + Seek> DocumentEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `root` as a top-level document at the current position.
    pub fn write_document(&mut self, root: &Object) -> Result<()> {
        self.write_object_body(root)
    }

    fn write_element(&mut self, key: &str, value: &Value) -> Result<()> {
        if key.as_bytes().contains(&0) {
            return Err(Error::encode(format!("key {:?} contains a NUL byte", key)));
        }
        self.writer.write_u8(value.tag())?;
        self.writer.write_all(key.as_bytes())?;
        self.writer.write_u8(TERMINATOR)?;
        self.write_body(value)
    }

    fn write_body(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => {}
            Value::Bool(v) => self.writer.write_u8(u8::from(*v))?,
            Value::Double(v) => self.writer.write_f64::<LittleEndian>(*v)?,
            Value::Int32(v) => self.writer.write_i32::<LittleEndian>(*v)?,
            Value::Int64(v) => match i32::try_from(*v) {
                Ok(narrow) => self.writer.write_i32::<LittleEndian>(narrow)?,
                Err(_) => self.writer.write_i64::<LittleEndian>(*v)?,
            },
            Value::String(s) => {
                // Length counts the terminator.
                self.writer.write_i32::<LittleEndian>(length_field(s.len() + 1, "string")?)?;
                self.writer.write_all(s.as_bytes())?;
                self.writer.write_u8(TERMINATOR)?;
            }
            Value::Binary(data) => {
                self.writer.write_i32::<LittleEndian>(length_field(data.len(), "binary")?)?;
                self.writer.write_u8(BINARY_SUBTYPE_GENERIC)?;
                self.writer.write_all(data)?;
            }
            Value::Object(object) => self.write_object_body(object)?,
            Value::Array(items) => self.write_array_body(items)?,
        }
        Ok(())
    }

    fn write_object_body(&mut self, object: &Object) -> Result<()> {
        let begin = self.begin_container()?;
        for (key, value) in object.sorted_entries() {
            self.write_element(key, value)?;
        }
        self.end_container(begin)
    }

    fn write_array_body(&mut self, items: &[Value]) -> Result<()> {
        let begin = self.begin_container()?;
        for (index, value) in items.iter().enumerate() {
            self.write_element(&index.to_string(), value)?;
        }
        self.end_container(begin)
    }

    /// Reserve the length field and return its position.
    fn begin_container(&mut self) -> Result<u64> {
        let begin = self.writer.stream_position()?;
        self.writer.write_i32::<LittleEndian>(0)?;
        Ok(begin)
    }

    /// Write the terminator and patch the length reserved at `begin`.
    fn end_container(&mut self, begin: u64) -> Result<()> {
        self.writer.write_u8(TERMINATOR)?;
        let resume = self.writer.stream_position()?;
        let length = length_field((resume - begin) as usize, "container")?;
        self.writer.seek(SeekFrom::Start(begin))?;
        self.writer.write_i32::<LittleEndian>(length)?;
        self.writer.seek(SeekFrom::Start(resume))?;
        Ok(())
    }
}

fn length_field(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::encode(format!("{} of {} bytes exceeds the 32-bit length field", what, len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        let bytes = encode_object(&Object::new()).unwrap();
        assert_eq!(bytes, vec![5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_root_must_be_object() {
        let err = encode(&Value::Array(vec![])).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
        assert!(encode(&Value::Int32(1)).is_err());
    }

    #[test]
    fn test_scalar_layout() {
        let doc = Object::new().with("a", 1).with("b", true);
        let bytes = encode_object(&doc).unwrap();
        let expected: Vec<u8> = vec![
            16, 0, 0, 0, // length
            TAG_INT32, b'a', 0, 1, 0, 0, 0, // a: 1
            TAG_BOOL, b'b', 0, 1, // b: true
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_string_and_binary_layout() {
        let doc = Object::new()
            .with("s", "hi")
            .with("d", vec![9u8, 8]);
        let bytes = encode_object(&doc).unwrap();
        // Keys sorted: "d" before "s".
        let expected: Vec<u8> = vec![
            25, 0, 0, 0,
            TAG_BINARY, b'd', 0, 2, 0, 0, 0, BINARY_SUBTYPE_GENERIC, 9, 8,
            TAG_STRING, b's', 0, 3, 0, 0, 0, b'h', b'i', 0,
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_array_keys_are_indices() {
        let doc = Object::new().with("v", vec![Value::Null, Value::Null]);
        let bytes = encode_object(&doc).unwrap();
        let expected: Vec<u8> = vec![
            19, 0, 0, 0,
            TAG_ARRAY, b'v', 0,
            11, 0, 0, 0, TAG_NULL, b'0', 0, TAG_NULL, b'1', 0, 0,
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_int64_chosen_by_range() {
        let small = encode_object(&Object::new().with("n", Value::Int64(3))).unwrap();
        assert_eq!(small[4], TAG_INT32);
        let large = encode_object(&Object::new().with("n", Value::Int64(1 << 40))).unwrap();
        assert_eq!(large[4], TAG_INT64);
        assert_eq!(&large[7..15], &(1i64 << 40).to_le_bytes());
    }

    #[test]
    fn test_deterministic_across_insertion_order() {
        let a = Object::new().with("z", 1.5).with("a", "x").with("m", Value::Null);
        let b = Object::new().with("m", Value::Null).with("z", 1.5).with("a", "x");
        assert_eq!(encode_object(&a).unwrap(), encode_object(&b).unwrap());
    }

    #[test]
    fn test_nul_in_key_rejected() {
        let doc = Object::new().with("bad\0key", 1);
        assert!(matches!(encode_object(&doc), Err(Error::Encode(_))));
    }
}
