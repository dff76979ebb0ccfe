//! Layer compositing for the kit creator.
//!
//! This crate handles:
//! - Resolving image locators for layers, thumbnails and merge sources
//! - Drawing the current selection onto a canvas in paint order
//! - The merge tool that flattens a stack of raw images into one item

pub mod locator;
pub mod compositor;
pub mod merge;

pub use self::compositor::{Compositor, RenderOutcome, RenderReport};
pub use locator::{CacheToken, ImageLocator};
pub use merge::{placement, MergeState, MergeTarget, MergeTool, StackEntry, DEFAULT_DESTINATION};
