//! File format support module
//!
//! Provides save/load functionality for OpenRaster (.ora) layered images:
//! - `archive`: zip entry access behind small capability traits
//! - `manifest`: `stack.xml` parsing and generation
//! - `thumbnail`: preview sizing and rendering
//! - `ora`: the importer and exporter

pub mod archive;
pub mod manifest;
pub mod ora;
pub mod thumbnail;
pub mod types;


pub use ora::{
    export_ora, export_to_archive, import_from_archive, import_ora, load_ora, read_thumbnail,
};
pub use types::*;
