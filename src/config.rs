//! Codec configuration
//!
//! All fields have defaults matching the plain OpenRaster layout, so an empty
//! JSON object (or no config file at all) is valid.

use crate::file::archive::EntryCompression;
use crate::file::FileError;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest thumbnail side in pixels
pub const THUMB_MAX_SIZE: u32 = 256;

/// Resampling filter used for the thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFilter {
    Nearest,
    /// Bilinear
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ThumbnailFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ThumbnailFilter::Nearest => FilterType::Nearest,
            ThumbnailFilter::Triangle => FilterType::Triangle,
            ThumbnailFilter::CatmullRom => FilterType::CatmullRom,
            ThumbnailFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Compression applied to layer PNG, manifest and thumbnail entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerCompression {
    Stored,
    #[default]
    Deflated,
}

impl From<LayerCompression> for EntryCompression {
    fn from(value: LayerCompression) -> Self {
        match value {
            LayerCompression::Stored => EntryCompression::Stored,
            LayerCompression::Deflated => EntryCompression::Deflated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OraConfig {
    pub thumbnail_max_size: u32,
    pub thumbnail_filter: ThumbnailFilter,
    pub layer_compression: LayerCompression,
    /// Reject archives whose `mimetype` entry is missing or wrong
    pub strict_mimetype: bool,
}

impl Default for OraConfig {
    fn default() -> Self {
        Self {
            thumbnail_max_size: THUMB_MAX_SIZE,
            thumbnail_filter: ThumbnailFilter::default(),
            layer_compression: LayerCompression::default(),
            strict_mimetype: false,
        }
    }
}

impl OraConfig {
    pub fn from_json_str(json: &str) -> Result<Self, FileError> {
        let config: OraConfig =
            serde_json::from_str(json).map_err(|e| FileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self, FileError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!("Loaded ORA config from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), FileError> {
        if self.thumbnail_max_size == 0 {
            return Err(FileError::Config(
                "thumbnailMaxSize must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
