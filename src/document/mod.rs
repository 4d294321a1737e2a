//! Self-describing binary document format.
//!
//! A document is a tree of [`Value`]s rooted at an [`Object`]. The encoder
//! writes object keys in byte-wise sorted order so equal trees always
//! produce identical bytes.
//!
//! # Example
//!
//! ```
//! use duck::document::{decode, encode_object, Object};
//!
//! let doc = Object::new().with("Name", "Cube").with("Count", 3);
//! let bytes = encode_object(&doc).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), doc);
//! ```

pub mod format;

mod decoder;
mod encoder;
mod json;
mod value;

pub use decoder::decode;
pub use encoder::{encode, encode_object, DocumentEncoder};
pub use value::{Object, Value};
