//! Parts and color variants.

use common::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coordinate assigned to part folders whose name is not `X-Y`.
pub const UNORDERED_COORDINATE: i64 = 9999;

/// Folder name of the implicit color variant.
const DEFAULT_VARIANT: &str = "default";

/// A color variant of a part.
///
/// Parts without color sub-folders only have the implicit default variant,
/// whose images live directly in the part folder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorVariant {
    /// Images stored directly in the part folder.
    Default,
    /// Images stored in the named color sub-folder.
    Named(String),
}

impl ColorVariant {
    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ColorVariant::Default)
    }

    /// Folder segment used in image paths, `None` for the default variant.
    pub fn folder(&self) -> Option<&str> {
        match self {
            ColorVariant::Default => None,
            ColorVariant::Named(name) => Some(name),
        }
    }

    /// Name as sent to the backend (`"default"` for the implicit variant).
    pub fn as_str(&self) -> &str {
        match self {
            ColorVariant::Default => DEFAULT_VARIANT,
            ColorVariant::Named(name) => name,
        }
    }

    /// Swatch color for pickers.
    ///
    /// Named variants are expected to start with `RRGGBB` (for example
    /// `FF5733` or `FF5733_2`); anything else shows the neutral swatch.
    pub fn swatch(&self) -> Color {
        match self {
            ColorVariant::Default => Color::SWATCH_DEFAULT,
            ColorVariant::Named(name) => name
                .get(..6)
                .and_then(Color::from_hex6)
                .unwrap_or(Color::SWATCH_DEFAULT),
        }
    }

    /// Swatch color as `RRGGBB`.
    pub fn swatch_hex(&self) -> String {
        self.swatch().to_hex()
    }
}

impl From<String> for ColorVariant {
    fn from(name: String) -> Self {
        if name.is_empty() || name == DEFAULT_VARIANT {
            ColorVariant::Default
        } else {
            ColorVariant::Named(name)
        }
    }
}

impl From<&str> for ColorVariant {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<ColorVariant> for String {
    fn from(variant: ColorVariant) -> Self {
        match variant {
            ColorVariant::Default => DEFAULT_VARIANT.to_string(),
            ColorVariant::Named(name) => name,
        }
    }
}

impl fmt::Display for ColorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One equippable slot of a kit (hair, outfit, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Folder name, unique within the kit.
    pub folder: String,
    /// Layer-order coordinate. Not necessarily unique or contiguous.
    pub x: i64,
    /// Menu-position coordinate.
    pub y: i64,
    /// Number of selectable items, numbered `1..=items_count`.
    #[serde(default)]
    pub items_count: u32,
    /// Color sub-folders. Empty means only the default variant exists.
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub is_separated: bool,
    #[serde(default)]
    pub has_colors: bool,
    /// Number of source layers each item was built from.
    #[serde(default)]
    pub item_layer_counts: BTreeMap<u32, u32>,
}

impl Part {
    pub fn new(folder: impl Into<String>, x: i64, y: i64, items_count: u32) -> Self {
        Self {
            folder: folder.into(),
            x,
            y,
            items_count,
            colors: Vec::new(),
            is_separated: false,
            has_colors: false,
            item_layer_counts: BTreeMap::new(),
        }
    }

    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self.has_colors = !self.colors.is_empty();
        self
    }

    /// Whether the part has anything to select.
    pub fn has_items(&self) -> bool {
        self.items_count > 0
    }

    pub fn contains_item(&self, item_number: u32) -> bool {
        (1..=self.items_count).contains(&item_number)
    }

    /// The selectable color variants, in picker order.
    pub fn variants(&self) -> Vec<ColorVariant> {
        if self.colors.is_empty() {
            vec![ColorVariant::Default]
        } else {
            self.colors.iter().cloned().map(ColorVariant::from).collect()
        }
    }

    pub fn variant_count(&self) -> usize {
        self.colors.len().max(1)
    }

    /// Variant at a picker index.
    pub fn variant(&self, index: usize) -> Option<ColorVariant> {
        if self.colors.is_empty() {
            (index == 0).then_some(ColorVariant::Default)
        } else {
            self.colors.get(index).cloned().map(ColorVariant::from)
        }
    }

    /// Picker index of a variant, if the part offers it.
    pub fn variant_index(&self, variant: &ColorVariant) -> Option<usize> {
        self.variants().iter().position(|v| v == variant)
    }

    /// Number of source layers behind an item, when known.
    pub fn layer_count(&self, item_number: u32) -> Option<u32> {
        self.item_layer_counts.get(&item_number).copied()
    }

    /// Whether the folder name carried valid `X-Y` coordinates.
    pub fn is_ordered(&self) -> bool {
        self.x != UNORDERED_COORDINATE
    }
}
