//! Export settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::container::format::DEFAULT_LEVEL;
use crate::util::{Error, Result};

/// Options controlling a single export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Sample animation channels over the frame range.
    pub export_animation: bool,

    /// First frame of the inclusive range. Negative values are treated as 0.
    pub frame_begin: i32,
    /// Last frame of the inclusive range. Negative values are treated as 0.
    pub frame_end: i32,

    /// Deflate level for the container payload (0-9).
    pub compression_level: u32,

    /// Export nodes even when their export flag is off.
    pub ignore_export_flags: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            export_animation: false,
            frame_begin: 1,
            frame_end: 250,
            compression_level: DEFAULT_LEVEL,
            ignore_export_flags: false,
        }
    }
}

impl ExportSettings {
    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// First sampled frame.
    pub fn first_frame(&self) -> i32 {
        self.frame_begin.max(0)
    }

    /// Last sampled frame.
    pub fn last_frame(&self) -> i32 {
        self.frame_end.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ExportSettings::default();
        assert!(!s.export_animation);
        assert_eq!((s.first_frame(), s.last_frame()), (1, 250));
        assert_eq!(s.compression_level, 6);
    }

    #[test]
    fn test_partial_json() {
        let s = ExportSettings::from_json(r#"{ "export_animation": true, "frame_end": 10 }"#).unwrap();
        assert!(s.export_animation);
        assert_eq!(s.frame_begin, 1);
        assert_eq!(s.frame_end, 10);
    }

    #[test]
    fn test_negative_frames_clamped() {
        let s = ExportSettings {
            frame_begin: -5,
            frame_end: -1,
            ..Default::default()
        };
        assert_eq!(s.first_frame(), 0);
        assert_eq!(s.last_frame(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ExportSettings::load(dir.path().join("nope.json")),
            Err(Error::FileNotFound(_))
        ));
    }
}
