//! Layer selection store.

use crate::part::{ColorVariant, Part};
use crate::structure::KitStructure;
use common::{KitError, KitResult};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Multiplier applied to a part's `x` when deriving its sort key.
///
/// Part indices are added as a tie-break, so kits are expected to have fewer
/// parts than this.
pub const SORT_KEY_STRIDE: i64 = 1000;

/// Paint-order key of a part: `x * 1000 + part_index`.
pub fn sort_key(part: &Part, part_index: usize) -> i64 {
    part.x * SORT_KEY_STRIDE + part_index as i64
}

/// The item and color currently equipped for one part.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSelection {
    /// Folder of the part the selection was made from.
    pub part_folder: String,
    pub variant: ColorVariant,
    /// Picker index of `variant` within the part's variants.
    pub variant_index: usize,
    /// Item number, at least 1.
    pub item_number: u32,
    pub sort_key: i64,
}

/// Mapping from part index to its current selection.
///
/// Iteration follows insertion order: overwriting a part keeps its slot,
/// deselecting and selecting again moves it to the end. Paint order is
/// derived from sort keys at render time, with this order breaking ties.
#[derive(Clone, Debug, Default)]
pub struct SelectionStore {
    entries: IndexMap<usize, LayerSelection>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equip an item and color for a part.
    ///
    /// The store is left unchanged when the part, item or color does not
    /// resolve against `structure`.
    pub fn select(
        &mut self,
        structure: &KitStructure,
        part_index: usize,
        item_number: u32,
        variant: ColorVariant,
        variant_index: usize,
    ) -> KitResult<&LayerSelection> {
        let part = structure
            .part(part_index)
            .ok_or(KitError::InvalidPart(part_index))?;

        if !part.contains_item(item_number) {
            return Err(KitError::selection(format!(
                "item {} is outside 1..={} for part {}",
                item_number, part.items_count, part.folder
            )));
        }

        match part.variant(variant_index) {
            Some(expected) if expected == variant => {}
            Some(expected) => {
                return Err(KitError::selection(format!(
                    "color index {} of part {} is {}, not {}",
                    variant_index, part.folder, expected, variant
                )));
            }
            None => {
                return Err(KitError::selection(format!(
                    "color index {} is outside the {} variant(s) of part {}",
                    variant_index,
                    part.variant_count(),
                    part.folder
                )));
            }
        }

        let selection = LayerSelection {
            part_folder: part.folder.clone(),
            variant,
            variant_index,
            item_number,
            sort_key: sort_key(part, part_index),
        };
        tracing::debug!(
            part_index,
            folder = %selection.part_folder,
            item = item_number,
            color = %selection.variant,
            "layer selected"
        );

        let index = match self.entries.get_full_mut(&part_index) {
            Some((index, _, slot)) => {
                *slot = selection;
                index
            }
            None => self.entries.insert_full(part_index, selection).0,
        };
        Ok(&self.entries[index])
    }

    /// Equip an item in the part's first color.
    pub fn select_item(
        &mut self,
        structure: &KitStructure,
        part_index: usize,
        item_number: u32,
    ) -> KitResult<&LayerSelection> {
        let variant = structure
            .part(part_index)
            .and_then(|p| p.variant(0))
            .ok_or(KitError::InvalidPart(part_index))?;
        self.select(structure, part_index, item_number, variant, 0)
    }

    /// Unequip a part. Returns the removed selection, if any.
    pub fn deselect(&mut self, part_index: usize) -> Option<LayerSelection> {
        self.entries.shift_remove(&part_index)
    }

    /// Remove every selection.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Give every part that has items and no selection its default layer
    /// (item 1 in the first color). Returns how many were added.
    pub fn populate_defaults(&mut self, structure: &KitStructure) -> usize {
        let mut added = 0;
        for (index, part) in structure.iter() {
            if part.has_items() && !self.entries.contains_key(&index) {
                if self.select_item(structure, index, 1).is_ok() {
                    added += 1;
                }
            }
        }
        added
    }

    /// Re-resolve existing selections after the structure was reloaded.
    ///
    /// Part folder and sort key are recomputed from the new structure so that
    /// renames and re-ordering carry over. Selections are dropped when their
    /// part index no longer exists, their item is out of range, or their
    /// color variant is gone. Returns the dropped part indices.
    pub fn rebase(&mut self, structure: &KitStructure) -> Vec<usize> {
        let mut dropped = Vec::new();
        self.entries.retain(|&index, selection| {
            let Some(part) = structure.part(index) else {
                dropped.push(index);
                return false;
            };
            let Some(variant_index) = part.variant_index(&selection.variant) else {
                dropped.push(index);
                return false;
            };
            if !part.contains_item(selection.item_number) {
                dropped.push(index);
                return false;
            }
            selection.part_folder = part.folder.clone();
            selection.variant_index = variant_index;
            selection.sort_key = sort_key(part, index);
            true
        });
        if !dropped.is_empty() {
            tracing::debug!(?dropped, "dropped stale selections after reload");
        }
        dropped
    }

    /// Pick a random look.
    ///
    /// Each part with items is cleared with probability `skip_probability`,
    /// otherwise given a uniformly random item and color. Selections for
    /// parts without items are removed, so no previous selection survives.
    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        structure: &KitStructure,
        skip_probability: f64,
        rng: &mut R,
    ) -> KitResult<()> {
        if !(0.0..=1.0).contains(&skip_probability) {
            return Err(KitError::selection(format!(
                "skip probability {skip_probability} is outside 0..=1"
            )));
        }

        self.entries.retain(|&index, _| index < structure.len());

        for (index, part) in structure.iter() {
            if !part.has_items() || rng.gen_bool(skip_probability) {
                self.entries.shift_remove(&index);
                continue;
            }
            let item_number = rng.gen_range(1..=part.items_count);
            let variant_index = rng.gen_range(0..part.variant_count());
            let variant = part
                .variant(variant_index)
                .ok_or_else(|| KitError::internal("variant index out of range"))?;
            self.select(structure, index, item_number, variant, variant_index)?;
        }
        Ok(())
    }

    pub fn get(&self, part_index: usize) -> Option<&LayerSelection> {
        self.entries.get(&part_index)
    }

    pub fn contains(&self, part_index: usize) -> bool {
        self.entries.contains_key(&part_index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &LayerSelection)> {
        self.entries.iter().map(|(&index, selection)| (index, selection))
    }

    /// Selections sorted by ascending sort key (bottom layer first).
    ///
    /// The sort is stable, so equal keys keep insertion order.
    pub fn paint_order(&self) -> Vec<(usize, LayerSelection)> {
        let mut ordered: Vec<_> = self
            .entries
            .iter()
            .map(|(&index, selection)| (index, selection.clone()))
            .collect();
        ordered.sort_by_key(|(_, selection)| selection.sort_key);
        ordered
    }
}
