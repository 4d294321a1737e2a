//! # Duck
//!
//! Exporter core for the Duck (`.dsc`) binary scene format.
//!
//! A scene is read through the [`scene::SceneSource`] trait, converted into a
//! document tree by [`export::Exporter`], encoded with the binary
//! [`document`] format and wrapped in a deflate-compressed [`container`].
//!
//! ## Modules
//!
//! - [`util`] - Errors, math helpers and value string encodings
//! - [`document`] - Binary document tree, encoder and decoder
//! - [`container`] - Compressed container files
//! - [`scene`] - Scene source trait, records and an in-memory source
//! - [`mesh`] - Vertex deduplication, submeshes, skins and morph targets
//! - [`anim`] - Animation samplers and channel compression
//! - [`export`] - Scene to document conversion
//! - [`config`] - Export settings
//!
//! ## Example
//!
//! ```no_run
//! use duck::prelude::*;
//!
//! let mut scene = MemoryScene::load("scene.json")?;
//! let settings = ExportSettings { export_animation: true, ..Default::default() };
//! Exporter::new(settings).export_file(&mut scene, "scene.dsc")?;
//! # Ok::<(), duck::Error>(())
//! ```

pub mod anim;
pub mod config;
pub mod container;
pub mod document;
pub mod export;
pub mod mesh;
pub mod scene;
pub mod util;

pub use util::{Error, Result};

/// Build date stamped by the build script.
pub const BUILD_DATE: &str = env!("DUCK_BUILD_DATE");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ExportSettings;
    pub use crate::container::{read_file, ContainerReader, ContainerWriter};
    pub use crate::document::{decode, encode_object, Object, Value};
    pub use crate::export::Exporter;
    pub use crate::scene::{MemoryScene, SceneSource};
    pub use crate::util::{Error, Result};
}
