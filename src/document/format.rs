//! Binary document wire format constants.
//!
//! The layout is a BSON dialect: every element is a type tag, a
//! NUL-terminated key and a body. Objects and arrays carry a 4-byte
//! little-endian length covering the length field itself through the
//! terminating zero byte.

/// 8-byte little-endian IEEE-754 double.
pub const TAG_DOUBLE: u8 = 0x01;

/// Length-prefixed, NUL-terminated UTF-8 string.
pub const TAG_STRING: u8 = 0x02;

/// Embedded document with string keys.
pub const TAG_OBJECT: u8 = 0x03;

/// Embedded document keyed by decimal indices.
pub const TAG_ARRAY: u8 = 0x04;

/// Length-prefixed byte payload with a subtype byte.
pub const TAG_BINARY: u8 = 0x05;

/// Single byte, 0 or 1.
pub const TAG_BOOL: u8 = 0x08;

/// No body.
pub const TAG_NULL: u8 = 0x0A;

/// 4-byte little-endian signed integer.
pub const TAG_INT32: u8 = 0x10;

/// 8-byte little-endian signed integer.
pub const TAG_INT64: u8 = 0x12;

/// Binary subtype for generic data. The only subtype written.
pub const BINARY_SUBTYPE_GENERIC: u8 = 0x00;

/// Terminator closing an object or array body.
pub const TERMINATOR: u8 = 0x00;

/// Size of the length prefix on containers, strings and binaries.
pub const LENGTH_SIZE: usize = 4;

/// Smallest valid container body: length field plus terminator.
pub const MIN_CONTAINER_SIZE: usize = LENGTH_SIZE + 1;

/// Deepest nesting the decoder accepts.
pub const MAX_DEPTH: usize = 512;

/// Human-readable name of a tag, for diagnostics.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        TAG_DOUBLE => "double",
        TAG_STRING => "string",
        TAG_OBJECT => "object",
        TAG_ARRAY => "array",
        TAG_BINARY => "binary",
        TAG_BOOL => "bool",
        TAG_NULL => "null",
        TAG_INT32 => "int32",
        TAG_INT64 => "int64",
        _ => "unknown",
    }
}
