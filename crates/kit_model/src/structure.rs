//! Kit structure: the ordered parts of one kit plus canvas metadata.

use crate::part::Part;
use common::CanvasSize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A kit available on the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitSummary {
    pub id: String,
    pub name: String,
    pub folder: String,
}

/// Non-fatal anomalies in a kit's ordering coordinates.
///
/// Rendering and editing never depend on these; they exist so the operator
/// can fix folder names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureAdvisories {
    /// One line per shared `x`, formatted `X=<x>: <folder>, <folder>`.
    #[serde(default)]
    pub duplicates: Vec<String>,
    /// Layer-order values absent from `1..=max(x)`.
    #[serde(default)]
    pub missing_x: Vec<i64>,
    /// Menu-position values absent from `1..=max(y)`.
    #[serde(default)]
    pub missing_y: Vec<i64>,
}

impl StructureAdvisories {
    /// Detect duplicate and missing coordinates.
    ///
    /// Parts with unparseable folder names are ignored.
    pub fn detect(parts: &[Part]) -> Self {
        let mut by_x: IndexMap<i64, Vec<&str>> = IndexMap::new();
        for part in parts.iter().filter(|p| p.is_ordered()) {
            by_x.entry(part.x).or_default().push(&part.folder);
        }

        let duplicates = by_x
            .iter()
            .filter(|(_, folders)| folders.len() > 1)
            .map(|(x, folders)| format!("X={}: {}", x, folders.join(", ")))
            .collect();

        let found_x: BTreeSet<i64> = parts.iter().filter(|p| p.is_ordered()).map(|p| p.x).collect();
        let found_y: BTreeSet<i64> = parts
            .iter()
            .filter(|p| p.y != crate::part::UNORDERED_COORDINATE)
            .map(|p| p.y)
            .collect();

        Self {
            duplicates,
            missing_x: gaps(&found_x),
            missing_y: gaps(&found_y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty() && self.missing_x.is_empty() && self.missing_y.is_empty()
    }

    /// Human-readable warning lines.
    pub fn warnings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for dup in &self.duplicates {
            lines.push(format!("duplicate layer order {dup}"));
        }
        if !self.missing_x.is_empty() {
            lines.push(format!("missing layer order values (X): {}", join(&self.missing_x)));
        }
        if !self.missing_y.is_empty() {
            lines.push(format!("missing menu position values (Y): {}", join(&self.missing_y)));
        }
        lines
    }
}

fn gaps(found: &BTreeSet<i64>) -> Vec<i64> {
    match found.iter().next_back() {
        Some(&max) => (1..=max).filter(|v| !found.contains(v)).collect(),
        None => Vec::new(),
    }
}

fn join(values: &[i64]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

/// The structure of one kit as loaded from the backend.
///
/// Part indices are positions in [`parts`](Self::parts); they are only
/// meaningful for the load that produced them.
#[derive(Clone, Debug, PartialEq)]
pub struct KitStructure {
    /// Kit folder name.
    pub kit: String,
    /// Parts in menu order.
    pub parts: Vec<Part>,
    /// Full-size canvas the part images are authored at.
    pub canvas: CanvasSize,
    /// Coordinate anomalies.
    pub advisories: StructureAdvisories,
    /// Part folders whose items were built from several source layers.
    pub separated_folders: Vec<String>,
}

impl KitStructure {
    /// Build a structure, detecting advisories from the parts themselves.
    pub fn new(kit: impl Into<String>, parts: Vec<Part>, canvas: CanvasSize) -> Self {
        let advisories = StructureAdvisories::detect(&parts);
        Self {
            kit: kit.into(),
            parts,
            canvas,
            advisories,
            separated_folders: Vec::new(),
        }
    }

    /// Replace detected advisories with ones reported by the backend.
    ///
    /// An empty report keeps the locally detected advisories.
    pub fn with_reported_advisories(mut self, reported: StructureAdvisories) -> Self {
        if !reported.is_empty() {
            self.advisories = reported;
        }
        self
    }

    pub fn with_separated_folders(mut self, folders: Vec<String>) -> Self {
        self.separated_folders = folders;
        self
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Part)> {
        self.parts.iter().enumerate()
    }

    /// Index of the part stored in `folder`.
    pub fn index_of(&self, folder: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.folder == folder)
    }

    /// Number of parts that have at least one item.
    pub fn selectable_parts(&self) -> usize {
        self.parts.iter().filter(|p| p.has_items()).count()
    }

    pub fn has_separated_layers(&self) -> bool {
        !self.separated_folders.is_empty()
    }
}
