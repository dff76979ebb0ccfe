//! Image locators.

use kit_model::{ColorVariant, LayerSelection};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cache-busting version appended to image locators.
///
/// Bumped on every structure load so edited assets are refetched, and left
/// alone across selection changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheToken(u64);

impl CacheToken {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Token derived from the current time in milliseconds.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    /// A token strictly newer than this one.
    pub fn bump(self) -> Self {
        Self(Self::now().0.max(self.0 + 1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CacheToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds server-relative image paths for one kit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageLocator {
    kit_base: String,
    kit: String,
    token: CacheToken,
}

impl ImageLocator {
    /// Create a locator for `kit` under `kit_base` (for example `downloads/`).
    pub fn new(kit_base: impl Into<String>, kit: impl Into<String>, token: CacheToken) -> Self {
        let mut kit_base = kit_base.into();
        while kit_base.ends_with('/') {
            kit_base.pop();
        }
        Self {
            kit_base,
            kit: kit.into(),
            token,
        }
    }

    pub fn kit(&self) -> &str {
        &self.kit
    }

    pub fn token(&self) -> CacheToken {
        self.token
    }

    fn folder(&self, part_folder: &str, variant: &ColorVariant) -> String {
        let mut path = String::new();
        if !self.kit_base.is_empty() {
            path.push_str(&self.kit_base);
            path.push('/');
        }
        path.push_str(&self.kit);
        path.push('/');
        path.push_str(part_folder);
        if let Some(color) = variant.folder() {
            path.push('/');
            path.push_str(color);
        }
        path
    }

    /// Full-size layer image of an item.
    pub fn layer(&self, part_folder: &str, variant: &ColorVariant, item_number: u32) -> String {
        format!("{}/{}.png?v={}", self.folder(part_folder, variant), item_number, self.token)
    }

    /// Layer image of a selection.
    pub fn for_selection(&self, selection: &LayerSelection) -> String {
        self.layer(&selection.part_folder, &selection.variant, selection.item_number)
    }

    /// Picker thumbnail of an item. Thumbnails live in the part root for
    /// every color.
    pub fn thumbnail(&self, part_folder: &str, item_number: u32) -> String {
        format!(
            "{}/thumb_{}.png?v={}",
            self.folder(part_folder, &ColorVariant::Default),
            item_number,
            self.token
        )
    }

    /// Navigation icon of a part.
    pub fn nav_icon(&self, part_folder: &str) -> String {
        format!("{}/nav.png?v={}", self.folder(part_folder, &ColorVariant::Default), self.token)
    }

    /// Raw merge source in a part's color folder.
    pub fn library_file(&self, part_folder: &str, variant: &ColorVariant, filename: &str) -> String {
        format!("{}/{}?v={}", self.folder(part_folder, variant), filename, self.token)
    }
}
