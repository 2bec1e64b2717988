//! Layer stack contract between the ORA codec and the host editor
//!
//! Stacks are ordered bottom-to-top: index 0 is the bottom layer. The codec
//! only talks to the host through [`LayerStack`] and [`StackLayer`];
//! [`Document`] is a self-contained implementation for tools and tests.

use crate::file::CanvasSize;
use image::{Rgba, RgbaImage};

/// A single raster layer
pub trait StackLayer {
    fn name(&self) -> &str;
    fn opacity(&self) -> f64;
    fn set_opacity(&mut self, opacity: f64);
    fn is_hidden(&self) -> bool;
    fn set_hidden(&mut self, hidden: bool);
    fn surface(&self) -> &RgbaImage;
    fn surface_mut(&mut self) -> &mut RgbaImage;
}

/// Ordered layer collection owned by the host
pub trait LayerStack {
    type Layer: StackLayer;

    fn count(&self) -> usize;
    fn layer(&self, index: usize) -> Option<&Self::Layer>;

    /// Remove every layer
    fn clear(&mut self);

    /// Drop undo history. Hosts without history can ignore this.
    fn clear_history(&mut self) {}

    /// Discard any transient selection layer
    fn destroy_selection_layer(&mut self) {}

    fn set_image_size(&mut self, size: CanvasSize);

    /// Create a transparent layer; it is not part of the stack until inserted
    fn create_layer(&self, name: &str, width: u32, height: u32) -> Self::Layer;

    /// Insert at `index`, shifting layers at or above it up by one
    fn insert(&mut self, layer: Self::Layer, index: usize);

    /// Composite visible layers bottom-to-top onto a transparent canvas
    ///
    /// The canvas takes the size of the bottom layer. Returns `None` for an
    /// empty stack.
    fn flatten(&self) -> Option<RgbaImage> {
        let bottom = self.layer(0)?;
        let (width, height) = bottom.surface().dimensions();
        let mut composite = RgbaImage::new(width, height);

        for index in 0..self.count() {
            if let Some(layer) = self.layer(index) {
                if !layer.is_hidden() {
                    blend_over(&mut composite, layer.surface(), layer.opacity() as f32);
                }
            }
        }

        Some(composite)
    }
}

/// Source-over blend of `src` onto `dst` with extra opacity, straight alpha
///
/// Pixels outside the overlap of the two images are left alone.
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let width = dst.width().min(src.width());
    let height = dst.height().min(src.height());

    for y in 0..height {
        for x in 0..width {
            let s = src.get_pixel(x, y);
            let src_a = (s[3] as f32 / 255.0) * opacity;
            if src_a <= 0.0 {
                continue;
            }

            let d = dst.get_pixel(x, y);
            let dst_a = d[3] as f32 / 255.0;
            let out_a = src_a + dst_a * (1.0 - src_a);
            if out_a <= 0.0 {
                continue;
            }

            let blend = |s: u8, d: u8| -> u8 {
                let s_f = s as f32 / 255.0;
                let d_f = d as f32 / 255.0;
                let out = (s_f * src_a + d_f * dst_a * (1.0 - src_a)) / out_a;
                (out * 255.0).round().clamp(0.0, 255.0) as u8
            };

            let out = Rgba([
                blend(s[0], d[0]),
                blend(s[1], d[1]),
                blend(s[2], d[2]),
                (out_a * 255.0).round() as u8,
            ]);
            dst.put_pixel(x, y, out);
        }
    }
}

/// In-memory raster layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub opacity: f64,
    pub hidden: bool,
    pub surface: RgbaImage,
}

impl Layer {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            opacity: 1.0,
            hidden: false,
            surface: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(name: impl Into<String>, surface: RgbaImage) -> Self {
        Self {
            name: name.into(),
            opacity: 1.0,
            hidden: false,
            surface,
        }
    }
}

impl StackLayer for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut RgbaImage {
        &mut self.surface
    }
}

/// Self-contained document: canvas size, layers, undo depth and selection
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub size: Option<CanvasSize>,
    layers: Vec<Layer>,
    /// Number of undo steps recorded by the host
    pub history_len: usize,
    /// Floating selection layer, kept outside the stack
    pub selection: Option<Layer>,
}

impl Document {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Some(CanvasSize::new(width, height)),
            ..Default::default()
        }
    }

    /// Append a layer on top of the stack
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerStack for Document {
    type Layer = Layer;

    fn count(&self) -> usize {
        self.layers.len()
    }

    fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    fn clear(&mut self) {
        self.layers.clear();
    }

    fn clear_history(&mut self) {
        self.history_len = 0;
    }

    fn destroy_selection_layer(&mut self) {
        self.selection = None;
    }

    fn set_image_size(&mut self, size: CanvasSize) {
        self.size = Some(size);
    }

    fn create_layer(&self, name: &str, width: u32, height: u32) -> Layer {
        Layer::new(name, width, height)
    }

    fn insert(&mut self, layer: Layer, index: usize) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
    }
}
