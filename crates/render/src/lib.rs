//! Raster side of the kit creator.
//!
//! This crate handles:
//! - Image decoding and caching
//! - The RGBA surface layers are drawn onto
//! - The luminosity recolor transform

pub mod image_cache;
pub mod surface;
pub mod recolor;

pub use image_cache::{ImageCache, ImageData};
pub use recolor::{recolor, recolor_hex};
pub use surface::Surface;
