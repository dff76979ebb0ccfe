//! Common types shared across the kit creator crates.

pub mod color;
pub mod geometry;
pub mod error;

pub use color::Color;
pub use geometry::{CanvasSize, Offset};
pub use error::{KitError, KitResult};
