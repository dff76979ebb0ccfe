//! RGBA drawing surface.

use crate::image_cache::ImageData;
use common::{CanvasSize, KitError, KitResult, Offset};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// A fixed-size RGBA pixel buffer that layers are drawn onto with
/// source-over alpha blending.
#[derive(Clone, Debug)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Create a transparent surface.
    pub fn new(size: CanvasSize) -> Self {
        Self {
            pixels: RgbaImage::new(size.width, size.height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width(), self.height())
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            pixel.0 = [0, 0, 0, 0];
        }
    }

    /// Replace the surface with a transparent one of a new size.
    pub fn resize(&mut self, size: CanvasSize) {
        if self.size() != size {
            self.pixels = RgbaImage::new(size.width, size.height);
        }
    }

    /// Draw an image scaled to cover the whole surface.
    pub fn draw_stretched(&mut self, image: &ImageData) {
        if image.width() == self.width() && image.height() == self.height() {
            imageops::overlay(&mut self.pixels, &image.pixels, 0, 0);
        } else if image.width() > 0 && image.height() > 0 {
            let scaled = imageops::resize(&image.pixels, self.width(), self.height(), FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, 0, 0);
        }
    }

    /// Draw an image at its natural size with its top-left corner at `offset`.
    /// Parts falling outside the surface are clipped.
    pub fn draw_at(&mut self, image: &ImageData, offset: Offset) {
        imageops::overlay(&mut self.pixels, &image.pixels, offset.x, offset.y);
    }

    /// Borrow the pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Copy the pixels out as image data.
    pub fn snapshot(&self) -> ImageData {
        ImageData::from_rgba(self.pixels.clone())
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> KitResult<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(self.pixels.clone())
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| KitError::internal(format!("PNG encoding failed: {e}")))?;
        Ok(bytes.into_inner())
    }

    /// Write as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> KitResult<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Color;

    #[test]
    fn test_new_surface_is_blank() {
        let surface = Surface::new(CanvasSize::new(4, 4));
        assert!(surface.is_blank());
        assert_eq!(surface.size(), CanvasSize::new(4, 4));
    }

    #[test]
    fn test_draw_stretched_covers_surface() {
        let mut surface = Surface::new(CanvasSize::new(8, 8));
        surface.draw_stretched(&ImageData::filled(2, 2, Color::RED));
        assert!(surface.pixels().pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn test_draw_order_top_wins() {
        let mut surface = Surface::new(CanvasSize::new(2, 2));
        surface.draw_stretched(&ImageData::filled(2, 2, Color::RED));
        surface.draw_stretched(&ImageData::filled(2, 2, Color::WHITE));
        assert_eq!(surface.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_transparent_layer_keeps_background() {
        let mut surface = Surface::new(CanvasSize::new(2, 2));
        surface.draw_stretched(&ImageData::filled(2, 2, Color::RED));
        surface.draw_stretched(&ImageData::filled(2, 2, Color::TRANSPARENT));
        assert_eq!(surface.pixels().get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_draw_at_clips() {
        let mut surface = Surface::new(CanvasSize::new(4, 4));
        surface.draw_at(&ImageData::filled(2, 2, Color::RED), Offset::new(3, -1));
        assert_eq!(surface.pixels().get_pixel(3, 0).0, [255, 0, 0, 255]);
        assert_eq!(surface.pixels().get_pixel(2, 0).0, [0, 0, 0, 0]);
        assert_eq!(surface.pixels().get_pixel(3, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_clear() {
        let mut surface = Surface::new(CanvasSize::new(2, 2));
        surface.draw_stretched(&ImageData::filled(1, 1, Color::RED));
        surface.clear();
        assert!(surface.is_blank());
    }

    #[test]
    fn test_png_roundtrip() {
        let mut surface = Surface::new(CanvasSize::new(3, 3));
        surface.draw_at(&ImageData::filled(1, 1, Color::RED), Offset::new(1, 1));
        let decoded = ImageData::decode(&surface.encode_png().unwrap()).unwrap();
        assert_eq!(decoded.get_pixel(1, 1), Color::RED);
        assert_eq!(decoded.get_pixel(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        Surface::new(CanvasSize::new(2, 2)).save_png(&path).unwrap();
        assert!(path.exists());
    }
}
