//! `stack.xml` model, parser and generator
//!
//! Only the attributes this codec understands are modelled. Numbers are
//! parsed and printed with Rust's own formatting, which never depends on the
//! host locale.

use super::types::{FileError, LayerFailure};
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

pub const STACK_XML: &str = "stack.xml";

/// Parsed manifest, layers listed top-to-bottom
#[derive(Debug, Clone, PartialEq)]
pub struct StackManifest {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<ManifestLayer>,
}

/// Raw attributes of one `<layer>` element
///
/// Values are kept as written; empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestLayer {
    pub name: Option<String>,
    pub src: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub opacity: Option<String>,
    pub visibility: Option<String>,
}

/// Layer attributes after defaults and number parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayer {
    pub name: String,
    pub src: Option<String>,
    pub x: i32,
    pub y: i32,
    pub opacity: f64,
    pub hidden: bool,
}

impl ManifestLayer {
    /// Display name, falling back to `Layer {index}`
    pub fn display_name(&self, index: usize) -> String {
        non_empty(&self.name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Layer {}", index))
    }

    /// Apply defaults (`x`=0, `y`=0, `opacity`=1) and parse numbers
    pub fn resolve(&self, index: usize) -> Result<ResolvedLayer, LayerFailure> {
        let x = parse_attr(&self.x, "x", 0i32)?;
        let y = parse_attr(&self.y, "y", 0i32)?;
        let opacity = parse_attr(&self.opacity, "opacity", 1.0f64)?;
        if !opacity.is_finite() {
            return Err(invalid("opacity", &self.opacity));
        }

        Ok(ResolvedLayer {
            name: self.display_name(index),
            src: non_empty(&self.src).map(str::to_string),
            x,
            y,
            opacity: opacity.clamp(0.0, 1.0),
            hidden: non_empty(&self.visibility) == Some("hidden"),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn invalid(attribute: &str, value: &Option<String>) -> LayerFailure {
    LayerFailure::InvalidAttribute {
        attribute: attribute.to_string(),
        value: value.clone().unwrap_or_default(),
    }
}

fn parse_attr<T: std::str::FromStr>(
    value: &Option<String>,
    attribute: &str,
    default: T,
) -> Result<T, LayerFailure> {
    match non_empty(value) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(attribute, value)),
        None => Ok(default),
    }
}

/// Format layer opacity for the manifest: `"0"` when hidden, else two decimals
pub fn format_opacity(opacity: f64, hidden: bool) -> String {
    if hidden {
        "0".to_string()
    } else {
        format!("{:.2}", opacity)
    }
}

fn manifest_error(reason: impl Into<String>) -> FileError {
    FileError::ManifestParse {
        entry: STACK_XML.to_string(),
        reason: reason.into(),
    }
}

fn collect_attributes(attrs: Attributes<'_>) -> Result<Vec<(String, String)>, FileError> {
    let mut out = Vec::new();
    for attr in attrs {
        let attr = attr.map_err(|e| manifest_error(format!("bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| manifest_error(format!("bad attribute value: {}", e)))?
            .to_string();
        out.push((key, value));
    }
    Ok(out)
}

fn parse_dimension(
    attrs: &[(String, String)],
    attribute: &'static str,
) -> Result<u32, FileError> {
    let value = attrs
        .iter()
        .find(|(k, _)| k == attribute)
        .map(|(_, v)| v.clone());
    match value.as_deref().map(str::trim).map(str::parse::<u32>) {
        Some(Ok(n)) if n > 0 => Ok(n),
        _ => Err(FileError::DimensionParse { attribute, value }),
    }
}

fn layer_from_attributes(attrs: Vec<(String, String)>) -> ManifestLayer {
    let mut layer = ManifestLayer::default();
    for (key, value) in attrs {
        match key.as_str() {
            "name" => layer.name = Some(value),
            "src" => layer.src = Some(value),
            "x" => layer.x = Some(value),
            "y" => layer.y = Some(value),
            "opacity" => layer.opacity = Some(value),
            "visibility" => layer.visibility = Some(value),
            _ => {}
        }
    }
    layer
}

/// Walks the element tree of `stack.xml`
#[derive(Default)]
struct ManifestBuilder {
    depth: usize,
    size: Option<(u32, u32)>,
    /// Depth of the first <stack> while we are inside it
    stack_depth: Option<usize>,
    stack_seen: bool,
    layers: Vec<ManifestLayer>,
}

impl ManifestBuilder {
    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<(), FileError> {
        let name = e.name();
        let tag = name.as_ref();

        if self.depth == 0 {
            if tag != b"image" {
                return Err(manifest_error(format!(
                    "root element is <{}>, expected <image>",
                    String::from_utf8_lossy(tag)
                )));
            }
            let attrs = collect_attributes(e.attributes())?;
            self.size = Some((parse_dimension(&attrs, "w")?, parse_dimension(&attrs, "h")?));
        } else if tag == b"stack" && !self.stack_seen {
            self.stack_seen = true;
            if !is_empty {
                self.stack_depth = Some(self.depth);
            }
        } else if tag == b"layer" && self.stack_depth.is_some() {
            self.layers
                .push(layer_from_attributes(collect_attributes(e.attributes())?));
        }

        if !is_empty {
            self.depth += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.stack_depth == Some(self.depth) {
            self.stack_depth = None;
        }
    }

    fn finish(self) -> Result<StackManifest, FileError> {
        if self.depth != 0 {
            return Err(manifest_error("unexpected end of document"));
        }
        let (width, height) = self
            .size
            .ok_or_else(|| manifest_error("missing <image> element"))?;
        if !self.stack_seen {
            return Err(manifest_error("missing <stack> element"));
        }
        Ok(StackManifest {
            width,
            height,
            layers: self.layers,
        })
    }
}

/// Parse `stack.xml`
///
/// Every `<layer>` nested anywhere inside the first `<stack>` is collected in
/// document order. An empty layer list is not an error here; the importer
/// decides what to do with it.
pub fn parse_stack_xml(xml_data: &[u8]) -> Result<StackManifest, FileError> {
    let mut reader = Reader::from_reader(xml_data);
    reader.trim_text(true);

    let mut builder = ManifestBuilder::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => builder.open(e, false)?,
            Ok(Event::Empty(ref e)) => builder.open(e, true)?,
            Ok(Event::End(_)) => builder.close(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(manifest_error(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    builder.finish()
}

/// One `<layer>` element to be written
#[derive(Debug, Clone)]
pub struct ManifestEntry<'a> {
    pub name: &'a str,
    pub src: String,
    pub opacity: f64,
    pub hidden: bool,
}

/// Generate indented `stack.xml`; `layers` must already be top-to-bottom
pub fn generate_stack_xml(
    width: u32,
    height: u32,
    layers: &[ManifestEntry<'_>],
) -> Result<Vec<u8>, FileError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut image_start = BytesStart::new("image");
    image_start.push_attribute(("w", width.to_string().as_str()));
    image_start.push_attribute(("h", height.to_string().as_str()));
    writer.write_event(Event::Start(image_start))?;

    let mut stack_start = BytesStart::new("stack");
    stack_start.push_attribute(("opacity", "1"));
    stack_start.push_attribute(("name", "root"));
    writer.write_event(Event::Start(stack_start))?;

    for layer in layers {
        let mut layer_elem = BytesStart::new("layer");
        layer_elem.push_attribute((
            "opacity",
            format_opacity(layer.opacity, layer.hidden).as_str(),
        ));
        layer_elem.push_attribute(("name", layer.name));
        layer_elem.push_attribute(("src", layer.src.as_str()));
        writer.write_event(Event::Empty(layer_elem))?;
    }

    writer.write_event(Event::End(BytesEnd::new("stack")))?;
    writer.write_event(Event::End(BytesEnd::new("image")))?;

    Ok(writer.into_inner().into_inner())
}

impl From<quick_xml::Error> for FileError {
    fn from(e: quick_xml::Error) -> Self {
        manifest_error(format!("XML write error: {}", e))
    }
}
