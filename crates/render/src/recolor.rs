//! Luminosity-preserving recolor.
//!
//! Assets meant for tinting are authored in neutral gray with the shading
//! baked in. Recoloring keeps each pixel's luminosity and replaces its hue
//! with the target color:
//!
//! ```text
//! L   = 0.299 R + 0.587 G + 0.114 B
//! out = target * (L / 255)        (per channel, alpha unchanged)
//! ```
//!
//! The result only depends on the current pixels, so tinting an already
//! tinted image discards the previous hue.

use crate::image_cache::ImageData;
use common::{Color, KitError, KitResult};
use image::RgbaImage;

/// Recolor an image towards `target`.
pub fn recolor(image: &ImageData, target: Color) -> ImageData {
    let mut pixels = image.pixels.clone();
    recolor_in_place(&mut pixels, target);
    ImageData {
        pixels,
        format: image.format,
    }
}

/// Recolor an image towards a `RRGGBB` hex color.
pub fn recolor_hex(image: &ImageData, target_hex: &str) -> KitResult<ImageData> {
    let target = Color::from_hex6(target_hex)
        .ok_or_else(|| KitError::color(format!("expected six hex digits, got {target_hex:?}")))?;
    Ok(recolor(image, target))
}

/// Recolor a pixel buffer in place.
pub fn recolor_in_place(pixels: &mut RgbaImage, target: Color) {
    for pixel in pixels.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let intensity = Color::rgb(r, g, b).luma() / 255.0;
        pixel.0 = [
            scale(target.r, intensity),
            scale(target.g, intensity),
            scale(target.b, intensity),
            a,
        ];
    }
}

#[inline]
fn scale(channel: u8, intensity: f32) -> u8 {
    (channel as f32 * intensity).round().clamp(0.0, 255.0) as u8
}
