//! Binary document decoder.
//!
//! Reads the wire format produced by [`super::encode`] back into a tree.
//! Array keys are skipped; objects keep the order found in the data.

use byteorder::{ByteOrder, LittleEndian};

use super::format::*;
use super::value::{Object, Value};
use crate::util::{Error, Result};

/// Parse a complete document.
pub fn decode(data: &[u8]) -> Result<Object> {
    let mut decoder = DocumentDecoder::new(data);
    let root = decoder.read_object(0)?;
    if decoder.pos != data.len() {
        return Err(Error::invalid(format!(
            "{} trailing bytes after document",
            data.len() - decoder.pos
        )));
    }
    Ok(root)
}

struct DocumentDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DocumentDecoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::UnexpectedEof(self.data.len() as u64))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    fn read_length(&mut self, what: &str) -> Result<usize> {
        let at = self.pos;
        let len = self.read_i32()?;
        usize::try_from(len)
            .map_err(|_| Error::invalid(format!("negative {} length {} at {}", what, len, at)))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::UnexpectedEof(self.data.len() as u64))?;
        let s = String::from_utf8(rest[..nul].to_vec())?;
        self.pos += nul + 1;
        Ok(s)
    }

    /// Read a container body, calling `element` for each (tag, key) pair.
    fn read_container(
        &mut self,
        depth: usize,
        mut element: impl FnMut(&mut Self, u8, String, usize) -> Result<()>,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid(format!("nesting deeper than {}", MAX_DEPTH)));
        }
        let begin = self.pos;
        let len = self.read_length("container")?;
        if len < MIN_CONTAINER_SIZE {
            return Err(Error::invalid(format!("container length {} at {} too small", len, begin)));
        }
        let end = begin
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::UnexpectedEof(self.data.len() as u64))?;

        loop {
            if self.pos >= end {
                return Err(Error::invalid(format!("container at {} overruns its length", begin)));
            }
            let tag = self.read_u8()?;
            if tag == TERMINATOR {
                break;
            }
            let key = self.read_cstring()?;
            element(self, tag, key, depth)?;
        }

        if self.pos != end {
            return Err(Error::invalid(format!(
                "container at {} declared {} bytes but used {}",
                begin,
                len,
                self.pos - begin
            )));
        }
        Ok(())
    }

    fn read_object(&mut self, depth: usize) -> Result<Object> {
        let mut object = Object::new();
        self.read_container(depth, |dec, tag, key, depth| {
            let value = dec.read_value(tag, depth)?;
            object.insert(key, value);
            Ok(())
        })?;
        Ok(object)
    }

    fn read_array(&mut self, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        self.read_container(depth, |dec, tag, _key, depth| {
            items.push(dec.read_value(tag, depth)?);
            Ok(())
        })?;
        Ok(items)
    }

    fn read_value(&mut self, tag: u8, depth: usize) -> Result<Value> {
        let value = match tag {
            TAG_NULL => Value::Null,
            TAG_BOOL => Value::Bool(self.read_u8()? != 0),
            TAG_DOUBLE => Value::Double(LittleEndian::read_f64(self.take(8)?)),
            TAG_INT32 => Value::Int32(self.read_i32()?),
            TAG_INT64 => Value::Int64(LittleEndian::read_i64(self.take(8)?)),
            TAG_STRING => {
                let len = self.read_length("string")?;
                if len == 0 {
                    return Err(Error::invalid("string length must include its terminator"));
                }
                let bytes = self.take(len)?;
                if bytes[len - 1] != TERMINATOR {
                    return Err(Error::invalid("string is not NUL-terminated"));
                }
                Value::String(String::from_utf8(bytes[..len - 1].to_vec())?)
            }
            TAG_BINARY => {
                let len = self.read_length("binary")?;
                let _subtype = self.read_u8()?;
                Value::Binary(self.take(len)?.to_vec())
            }
            TAG_OBJECT => Value::Object(self.read_object(depth + 1)?),
            TAG_ARRAY => Value::Array(self.read_array(depth + 1)?),
            other => {
                return Err(Error::UnknownTag {
                    tag: other,
                    pos: (self.pos - 1) as u64,
                })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::encode_object;

    fn sample_tree() -> Object {
        let mut root = Object::new();
        root.insert("null", Value::Null);
        root.insert("flag", false);
        root.insert("small", -7);
        root.insert("big", Value::Int64(-(1i64 << 45)));
        root.insert("pi", 3.25);
        root.insert("text", "grüße");
        root.insert("blob", vec![0u8, 1, 2, 255]);
        root.insert(
            "list",
            vec![Value::from(1), Value::from("two"), Value::from(Object::new().with("k", 3.0))],
        );
        root.object_mut("nested").insert("empty", Vec::<Value>::new());
        root
    }

    #[test]
    fn test_roundtrip() {
        let tree = sample_tree();
        let bytes = encode_object(&tree).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, tree);

        // Keys come back sorted.
        let keys: Vec<_> = decoded.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_truncated_input() {
        let bytes = encode_object(&sample_tree()).unwrap();
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(decode(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = vec![8, 0, 0, 0, 0x07, b'x', 0, 0];
        assert!(matches!(decode(&bytes), Err(Error::UnknownTag { tag: 0x07, .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let mut bytes = encode_object(&Object::new().with("a", 1)).unwrap();
        bytes[0] += 1;
        bytes.push(0);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode_object(&Object::new()).unwrap();
        bytes.push(0);
        assert!(decode(&bytes).is_err());
    }
}
