//! OpenRaster (.ora) format support
//!
//! ORA is a ZIP archive containing:
//! - mimetype: "image/openraster" (first entry, stored, not compressed)
//! - stack.xml: Canvas size and layer structure, listed top-to-bottom
//! - data/layer<i>.png: Pixel data of stack layer `i` (0 = bottom)
//! - Thumbnails/thumbnail.png: Flattened preview, at most 256px per side

use super::archive::{ArchiveReader, ArchiveWriter, EntryCompression};
use super::manifest::{
    generate_stack_xml, parse_stack_xml, ManifestEntry, ManifestLayer, STACK_XML,
};
use super::thumbnail::{render_thumbnail, THUMBNAIL_PATH};
use super::types::{
    ArchiveError, CanvasSize, FileError, ImportReport, LayerFailure, LayerImportError,
};
use crate::config::OraConfig;
use crate::document::{Document, LayerStack, StackLayer};
use image::{imageops, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::time::Instant;
use zip::result::ZipError;
use zip::{ZipArchive, ZipWriter};

pub const ORA_MIMETYPE: &str = "image/openraster";
pub const MIMETYPE_PATH: &str = "mimetype";

/// Archive entry holding the pixels of stack layer `index`
pub fn layer_path(index: usize) -> String {
    format!("data/layer{}.png", index)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, FileError> {
    let file = File::open(path).map_err(|e| FileError::ArchiveOpen {
        path: path.to_path_buf(),
        source: ZipError::Io(e),
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| FileError::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, FileError> {
    let mut png_data = Cursor::new(Vec::new());
    img.write_to(&mut png_data, ImageFormat::Png)?;
    Ok(png_data.into_inner())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Load an ORA file into `stack`
///
/// The stack is only cleared once the manifest has been validated, so a
/// rejected file leaves the host document untouched. Layers that fail to
/// load are reported in [`ImportReport::failures`] and skipped.
pub fn import_ora<S: LayerStack>(
    path: &Path,
    stack: &mut S,
    config: &OraConfig,
) -> Result<ImportReport, FileError> {
    let total_start = Instant::now();
    tracing::info!("[ORA] Loading file: {:?}", path);

    let t1 = Instant::now();
    let mut archive = open_archive(path)?;
    tracing::info!("[ORA] Phase 1 - File open: {:.1}ms", elapsed_ms(t1));

    let mut report = import_from_archive(&mut archive, stack, config)?;
    report.total_ms = elapsed_ms(total_start);

    tracing::info!(
        "[ORA] Total load time: {:.1}ms ({}/{} layers)",
        report.total_ms,
        report.imported_layers,
        report.manifest_layers
    );
    Ok(report)
}

/// Load an ORA file into a fresh [`Document`]
pub fn load_ora(path: &Path, config: &OraConfig) -> Result<(Document, ImportReport), FileError> {
    let mut document = Document::default();
    let report = import_ora(path, &mut document, config)?;
    Ok((document, report))
}

/// Import from any archive backend
pub fn import_from_archive<A: ArchiveReader, S: LayerStack>(
    archive: &mut A,
    stack: &mut S,
    config: &OraConfig,
) -> Result<ImportReport, FileError> {
    let start = Instant::now();
    check_mimetype(archive, config)?;

    // Phase 2: manifest
    let t2 = Instant::now();
    let stack_xml = archive
        .read_entry(STACK_XML)
        .map_err(|e| FileError::ManifestParse {
            entry: STACK_XML.to_string(),
            reason: e.to_string(),
        })?;
    let manifest = parse_stack_xml(&stack_xml)?;
    drop(stack_xml);

    if manifest.layers.is_empty() {
        return Err(FileError::EmptyStack);
    }
    let size = CanvasSize::new(manifest.width, manifest.height);
    tracing::info!(
        "[ORA] Phase 2 - Manifest parse: {:.1}ms ({}, {} layers)",
        elapsed_ms(t2),
        size,
        manifest.layers.len()
    );

    stack.clear();
    stack.clear_history();
    stack.destroy_selection_layer();
    stack.set_image_size(size);

    // Phase 3: layers, manifest order is top-to-bottom
    let t3 = Instant::now();
    let mut imported_layers = 0;
    let mut failures = Vec::new();

    for (index, entry) in manifest.layers.iter().enumerate() {
        match load_layer(archive, stack, entry, index, size) {
            Ok(layer) => {
                stack.insert(layer, 0);
                imported_layers += 1;
            }
            Err(err) => {
                tracing::warn!("[ORA] {}", err);
                failures.push(err);
            }
        }
    }

    tracing::info!(
        "[ORA] Phase 3 - Decode layers: {:.1}ms ({} ok, {} failed)",
        elapsed_ms(t3),
        imported_layers,
        failures.len()
    );

    Ok(ImportReport {
        size,
        manifest_layers: manifest.layers.len(),
        imported_layers,
        failures,
        total_ms: elapsed_ms(start),
    })
}

fn check_mimetype<A: ArchiveReader>(archive: &mut A, config: &OraConfig) -> Result<(), FileError> {
    let found = archive
        .read_entry(MIMETYPE_PATH)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string());

    if found.as_deref() == Some(ORA_MIMETYPE) {
        return Ok(());
    }
    if config.strict_mimetype {
        return Err(FileError::InvalidMimetype {
            expected: ORA_MIMETYPE,
            found,
        });
    }
    tracing::warn!(
        "[ORA] Unexpected mimetype {:?}, continuing anyway",
        found.as_deref().unwrap_or("<missing>")
    );
    Ok(())
}

/// Decode one manifest layer into a new, not yet inserted, stack layer
fn load_layer<A: ArchiveReader, S: LayerStack>(
    archive: &mut A,
    stack: &S,
    entry: &ManifestLayer,
    index: usize,
    size: CanvasSize,
) -> Result<S::Layer, LayerImportError> {
    let fail = |failure: LayerFailure| LayerImportError {
        index,
        name: entry.display_name(index),
        src: entry.src.clone().unwrap_or_default(),
        failure,
    };

    let resolved = entry.resolve(index).map_err(fail)?;
    let src = resolved
        .src
        .as_deref()
        .ok_or_else(|| fail(LayerFailure::MissingSource))?;

    let png = archive.read_entry(src).map_err(|e| match e {
        ArchiveError::EntryNotFound(_) => fail(LayerFailure::EntryNotFound),
        other => fail(LayerFailure::Archive(other.to_string())),
    })?;
    tracing::debug!("[ORA] Decoding layer '{}' ({} bytes)", resolved.name, png.len());

    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .map_err(|e| fail(LayerFailure::Decode(e.to_string())))?
        .to_rgba8();
    drop(png);

    let mut layer = stack.create_layer(&resolved.name, size.width, size.height);
    layer.set_opacity(resolved.opacity);
    if resolved.hidden {
        layer.set_hidden(true);
    }
    imageops::replace(
        layer.surface_mut(),
        &decoded,
        i64::from(resolved.x),
        i64::from(resolved.y),
    );

    Ok(layer)
}

/// Read the stored thumbnail, if the archive has one
pub fn read_thumbnail(path: &Path) -> Result<Option<RgbaImage>, FileError> {
    let mut archive = open_archive(path)?;
    let data = match archive.read_entry(THUMBNAIL_PATH) {
        Ok(data) => data,
        Err(ArchiveError::EntryNotFound(_)) => return Ok(None),
        Err(source) => {
            return Err(FileError::ArchiveRead {
                entry: THUMBNAIL_PATH.to_string(),
                source,
            })
        }
    };
    let thumb = image::load_from_memory_with_format(&data, ImageFormat::Png)?.to_rgba8();
    Ok(Some(thumb))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Save `stack` as an ORA file, overwriting `path`
///
/// Any failure aborts the export and may leave a partially written file.
pub fn export_ora<S: LayerStack>(
    stack: &S,
    path: &Path,
    config: &OraConfig,
) -> Result<(), FileError> {
    let start = Instant::now();
    tracing::info!("[ORA] Saving file: {:?} ({} layers)", path, stack.count());

    if stack.count() == 0 {
        return Err(FileError::EmptyStack);
    }
    config.validate()?;

    let file = File::create(path).map_err(|source| FileError::ArchiveCreate {
        path: path.to_path_buf(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);

    export_to_archive(stack, &mut zip, config)?;

    zip.close().map_err(|source| FileError::ArchiveWrite {
        entry: "central directory".to_string(),
        source,
    })?;

    tracing::info!("[ORA] Saved in {:.1}ms", elapsed_ms(start));
    Ok(())
}

fn write_entry<W: ArchiveWriter>(
    writer: &mut W,
    name: &str,
    data: &[u8],
    compression: EntryCompression,
) -> Result<(), FileError> {
    writer
        .write_entry(name, data, compression)
        .map_err(|source| FileError::ArchiveWrite {
            entry: name.to_string(),
            source,
        })
}

/// Write every ORA entry for `stack`; the caller closes the archive
pub fn export_to_archive<S: LayerStack, W: ArchiveWriter>(
    stack: &S,
    writer: &mut W,
    config: &OraConfig,
) -> Result<(), FileError> {
    config.validate()?;
    let bottom = stack.layer(0).ok_or(FileError::EmptyStack)?;
    let (width, height) = bottom.surface().dimensions();
    let compression = EntryCompression::from(config.layer_compression);

    // 1. mimetype MUST be first and stored without compression
    write_entry(
        writer,
        MIMETYPE_PATH,
        ORA_MIMETYPE.as_bytes(),
        EntryCompression::Stored,
    )?;

    // 2. Layer data, named by stack index
    let t2 = Instant::now();
    for index in 0..stack.count() {
        let Some(layer) = stack.layer(index) else {
            continue;
        };
        let png = encode_png(layer.surface())?;
        tracing::debug!("[ORA] Layer {} '{}': {} bytes", index, layer.name(), png.len());
        write_entry(writer, &layer_path(index), &png, compression)?;
    }
    tracing::info!("[ORA] Layers encoded: {:.1}ms", elapsed_ms(t2));

    // 3. stack.xml, top-to-bottom
    let entries: Vec<ManifestEntry<'_>> = (0..stack.count())
        .rev()
        .filter_map(|index| {
            stack.layer(index).map(|layer| ManifestEntry {
                name: layer.name(),
                src: layer_path(index),
                opacity: layer.opacity(),
                hidden: layer.is_hidden(),
            })
        })
        .collect();
    let stack_xml = generate_stack_xml(width, height, &entries)?;
    write_entry(writer, STACK_XML, &stack_xml, compression)?;

    // 4. Thumbnail from the flattened stack
    let t4 = Instant::now();
    let thumb_png = {
        let flattened = stack.flatten().ok_or(FileError::EmptyStack)?;
        let thumb = render_thumbnail(
            &flattened,
            config.thumbnail_max_size,
            config.thumbnail_filter.filter_type(),
        );
        encode_png(&thumb)?
    };
    write_entry(writer, THUMBNAIL_PATH, &thumb_png, compression)?;
    tracing::info!("[ORA] Thumbnail: {:.1}ms", elapsed_ms(t4));

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::Layer;

    #[test]
    fn test_layer_path() {
        assert_eq!(layer_path(0), "data/layer0.png");
        assert_eq!(layer_path(12), "data/layer12.png");
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&RgbaImage::new(3, 2)).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_open_missing_archive() {
        let err = open_archive(Path::new("/nonexistent/dir/file.ora")).unwrap_err();
        assert!(matches!(err, FileError::ArchiveOpen { .. }));
    }

    #[test]
    fn test_export_empty_stack_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ora");
        let err = export_ora(&Document::new(4, 4), &path, &OraConfig::default()).unwrap_err();
        assert!(matches!(err, FileError::EmptyStack));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad-config.ora");
        let mut doc = Document::new(4, 4);
        doc.push(Layer::new("Only", 4, 4));
        let config = OraConfig {
            thumbnail_max_size: 0,
            ..OraConfig::default()
        };

        let err = export_ora(&doc, &path, &config).unwrap_err();
        assert!(matches!(err, FileError::Config(_)));
        assert!(!path.exists());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let err = export_to_archive(&doc, &mut zip, &config).unwrap_err();
        assert!(matches!(err, FileError::Config(_)));
    }
}
