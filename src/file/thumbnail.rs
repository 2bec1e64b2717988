//! Thumbnail sizing and rendering

use image::imageops::{self, FilterType};
use image::RgbaImage;

pub const THUMBNAIL_PATH: &str = "Thumbnails/thumbnail.png";

/// Fit `width`x`height` inside a `max_size` square, keeping the aspect ratio
///
/// Images already inside the box keep their size. The shorter side is
/// truncated toward zero but never drops below one pixel. A zero `max_size`
/// is treated as one.
pub fn thumbnail_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let max_size = max_size.max(1);
    if width <= max_size && height <= max_size {
        return (width, height);
    }

    let scaled = |short: u32, long: u32| -> u32 {
        let value = (short as f64 / long as f64 * max_size as f64) as u32;
        value.max(1)
    };

    if width > height {
        (max_size, scaled(height, width))
    } else {
        (scaled(width, height), max_size)
    }
}

/// Scale a flattened image down to thumbnail size
pub fn render_thumbnail(flattened: &RgbaImage, max_size: u32, filter: FilterType) -> RgbaImage {
    let (w, h) = thumbnail_dimensions(flattened.width(), flattened.height(), max_size);
    if (w, h) == flattened.dimensions() {
        return flattened.clone();
    }
    imageops::resize(flattened, w, h, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_landscape_clamped() {
        assert_eq!(thumbnail_dimensions(1000, 500, 256), (256, 128));
    }

    #[test]
    fn test_portrait_clamped() {
        assert_eq!(thumbnail_dimensions(500, 1000, 256), (128, 256));
    }

    #[test]
    fn test_zero_max_size_yields_one_pixel() {
        assert_eq!(thumbnail_dimensions(1000, 500, 0), (1, 1));
        assert_eq!(thumbnail_dimensions(3, 9, 0), (1, 1));
    }

    #[test]
    fn test_small_image_not_upscaled() {
        assert_eq!(thumbnail_dimensions(200, 100, 256), (200, 100));
        assert_eq!(thumbnail_dimensions(256, 256, 256), (256, 256));
    }

    #[test]
    fn test_square_and_truncation() {
        assert_eq!(thumbnail_dimensions(512, 512, 256), (256, 256));
        // 300 / 1000 * 256 = 76.8
        assert_eq!(thumbnail_dimensions(1000, 300, 256), (256, 76));
        assert_eq!(thumbnail_dimensions(5000, 1, 256), (256, 1));
    }

    #[test]
    fn test_render_thumbnail() {
        let img = RgbaImage::from_pixel(600, 300, Rgba([10, 20, 30, 255]));
        let thumb = render_thumbnail(&img, 256, FilterType::Triangle);
        assert_eq!(thumb.dimensions(), (256, 128));
        assert_eq!(thumb.get_pixel(100, 60), &Rgba([10, 20, 30, 255]));

        let small = RgbaImage::new(20, 10);
        assert_eq!(render_thumbnail(&small, 256, FilterType::Triangle), small);
    }
}
