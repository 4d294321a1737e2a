//! Utility types and functions for the exporter.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and [`BoundingVolume`]
//! - String encodings for points, quaternions and colors

mod error;
mod format;
mod math;

pub use error::*;
pub use format::*;
pub use math::*;
