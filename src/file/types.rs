//! Shared types for OpenRaster import/export

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Ora,
}

impl FileFormat {
    /// Detect format from file extension
    pub fn from_path(path: &str) -> Option<Self> {
        if path.to_lowercase().ends_with(".ora") {
            Some(FileFormat::Ora)
        } else {
            None
        }
    }

    /// Get default file extension
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Ora => "ora",
        }
    }
}

/// Why a single layer could not be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum LayerFailure {
    /// The `<layer>` element has no `src` attribute
    MissingSource,
    /// `src` does not name an entry in the archive
    EntryNotFound,
    /// The entry exists but is not a decodable PNG
    Decode(String),
    /// `x`, `y` or `opacity` could not be parsed
    InvalidAttribute { attribute: String, value: String },
    /// The archive failed while reading the entry
    Archive(String),
}

impl fmt::Display for LayerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerFailure::MissingSource => write!(f, "layer has no src attribute"),
            LayerFailure::EntryNotFound => write!(f, "entry not found in archive"),
            LayerFailure::Decode(reason) => write!(f, "PNG decode failed: {}", reason),
            LayerFailure::InvalidAttribute { attribute, value } => {
                write!(f, "invalid {} attribute: '{}'", attribute, value)
            }
            LayerFailure::Archive(reason) => write!(f, "archive read failed: {}", reason),
        }
    }
}

/// Non-fatal diagnostic for a layer skipped during import
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("Could not import layer \"{name}\" from {src}: {failure}")]
pub struct LayerImportError {
    /// Position of the layer in the manifest (0 = topmost)
    pub index: usize,
    pub name: String,
    /// Archive entry named by the layer's `src` attribute (empty if absent)
    pub src: String,
    pub failure: LayerFailure,
}

/// Outcome of a successful import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub size: CanvasSize,
    /// Number of `<layer>` elements in the manifest
    pub manifest_layers: usize,
    /// Number of layers actually inserted into the stack
    pub imported_layers: usize,
    pub failures: Vec<LayerImportError>,
    /// Time spent in the whole import (ms)
    pub total_ms: f64,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fatal errors that abort a whole import or export
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Cannot open archive {path:?}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Cannot create archive {path:?}: {source}")]
    ArchiveCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read entry '{entry}': {source}")]
    ArchiveRead {
        entry: String,
        #[source]
        source: ArchiveError,
    },

    #[error("Cannot write entry '{entry}': {source}")]
    ArchiveWrite {
        entry: String,
        #[source]
        source: ArchiveError,
    },

    #[error("Invalid manifest '{entry}': {reason}")]
    ManifestParse { entry: String, reason: String },

    #[error("Invalid image dimension {attribute}={value:?}")]
    DimensionParse {
        attribute: &'static str,
        value: Option<String>,
    },

    #[error("No layers found in OpenRaster file")]
    EmptyStack,

    #[error("Invalid ORA mimetype: expected '{expected}', got {found:?}")]
    InvalidMimetype {
        expected: &'static str,
        found: Option<String>,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<FileError> for String {
    fn from(e: FileError) -> Self {
        e.to_string()
    }
}

/// Errors raised by an archive backend
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("entry '{0}' not found")]
    EntryNotFound(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
