//! Kit structure model and layer selection store.
//!
//! A kit is an ordered list of parts; each part has numbered items and an
//! optional list of color variants. The [`SelectionStore`] records which
//! item and color is currently equipped for each part and derives the paint
//! order of the resulting layers.

pub mod part;
pub mod structure;
pub mod selection;

pub use part::{ColorVariant, Part, UNORDERED_COORDINATE};
pub use selection::{LayerSelection, SelectionStore, SORT_KEY_STRIDE};
pub use structure::{KitStructure, KitSummary, StructureAdvisories};
