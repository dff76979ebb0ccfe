//! In-memory backend and image source.
//!
//! Used by tests and offline tooling. Behaviour mirrors the HTTP
//! implementations, including `success: false` rejections.

use crate::api::{BackendCommand, BackendReply, FolderFile, ItemLayerInfo, LibraryFile, MergeRequest, ThumbStats};
use crate::backend::{BackendError, KitBackend};
use crate::loader::{ImageSource, LoadError};
use async_trait::async_trait;
use bytes::Bytes;
use kit_model::{ColorVariant, KitStructure, KitSummary};
use parking_lot::{Mutex, RwLock};
use render::ImageData;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Backend holding kits in memory.
#[derive(Default)]
pub struct MemoryBackend {
    kits: RwLock<Vec<KitSummary>>,
    structures: RwLock<HashMap<String, KitStructure>>,
    libraries: RwLock<HashMap<String, Vec<LibraryFile>>>,
    item_layers: RwLock<HashMap<String, Vec<ItemLayerInfo>>>,
    thumb_stats: RwLock<HashMap<String, ThumbStats>>,
    archives: RwLock<HashMap<String, Bytes>>,
    folder_files: RwLock<HashMap<String, Vec<FolderFile>>>,
    rejection: Mutex<Option<String>>,
    merges: Mutex<Vec<MergeRequest>>,
    commands: Mutex<Vec<BackendCommand>>,
}

fn library_key(kit: &str, folder: &str, color: &ColorVariant) -> String {
    format!("{kit}/{folder}/{}", color.as_str())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a kit and its structure.
    pub fn insert_kit(&self, structure: KitStructure) {
        let summary = KitSummary {
            id: structure.kit.clone(),
            name: structure.kit.clone(),
            folder: structure.kit.clone(),
        };
        let mut kits = self.kits.write();
        if !kits.iter().any(|k| k.folder == summary.folder) {
            kits.push(summary);
        }
        self.structures.write().insert(structure.kit.clone(), structure);
    }

    /// Files listed for a part's color folder.
    pub fn insert_library(&self, kit: &str, folder: &str, color: &ColorVariant, files: Vec<LibraryFile>) {
        self.libraries.write().insert(library_key(kit, folder, color), files);
    }

    pub fn insert_item_layers(&self, kit: &str, folder: &str, item_number: u32, layers: Vec<ItemLayerInfo>) {
        self.item_layers
            .write()
            .insert(format!("{kit}/{folder}/{item_number}"), layers);
    }

    /// Stats reported by the next thumbnail passes over `kit`.
    pub fn insert_thumb_stats(&self, kit: &str, stats: ThumbStats) {
        self.thumb_stats.write().insert(kit.to_string(), stats);
    }

    pub fn insert_archive(&self, kit: &str, archive: impl Into<Bytes>) {
        self.archives.write().insert(kit.to_string(), archive.into());
    }

    pub fn insert_folder_files(&self, kit: &str, folder: &str, color: &ColorVariant, files: Vec<FolderFile>) {
        self.folder_files.write().insert(library_key(kit, folder, color), files);
    }

    /// Make every later mutation fail with `message`, or succeed again with `None`.
    pub fn set_rejection(&self, message: Option<&str>) {
        *self.rejection.lock() = message.map(str::to_string);
    }

    /// Merge requests received so far.
    pub fn merges(&self) -> Vec<MergeRequest> {
        self.merges.lock().clone()
    }

    /// Commands received so far.
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.commands.lock().clone()
    }

    fn rejected(&self) -> Result<(), BackendError> {
        match self.rejection.lock().as_ref() {
            Some(message) => Err(BackendError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KitBackend for MemoryBackend {
    async fn list_kits(&self) -> Result<Vec<KitSummary>, BackendError> {
        Ok(self.kits.read().clone())
    }

    async fn kit_structure(&self, kit: &str) -> Result<KitStructure, BackendError> {
        self.structures
            .read()
            .get(kit)
            .cloned()
            .ok_or_else(|| BackendError::Rejected(format!("Kit not found: {kit}")))
    }

    async fn list_part_images(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<LibraryFile>, BackendError> {
        Ok(self
            .libraries
            .read()
            .get(&library_key(kit, folder, color))
            .cloned()
            .unwrap_or_default())
    }

    async fn merge_layers(&self, request: &MergeRequest) -> Result<BackendReply, BackendError> {
        self.rejected()?;
        self.merges.lock().push(request.clone());
        Ok(BackendReply {
            success: true,
            message: format!("Merged {} layers", request.selected_files.len()),
        })
    }

    async fn item_layers(
        &self,
        kit: &str,
        folder: &str,
        item_number: u32,
    ) -> Result<Vec<ItemLayerInfo>, BackendError> {
        Ok(self
            .item_layers
            .read()
            .get(&format!("{kit}/{folder}/{item_number}"))
            .cloned()
            .unwrap_or_default())
    }

    async fn execute(&self, command: &BackendCommand) -> Result<BackendReply, BackendError> {
        self.rejected()?;
        self.commands.lock().push(command.clone());
        Ok(BackendReply {
            success: true,
            message: String::new(),
        })
    }

    async fn create_missing_thumbs(&self, kit: &str) -> Result<ThumbStats, BackendError> {
        self.rejected()?;
        if !self.structures.read().contains_key(kit) {
            return Err(BackendError::Rejected(format!("Kit not found: {kit}")));
        }
        self.commands
            .lock()
            .push(BackendCommand::AutoCreateThumbs { kit: kit.to_string() });
        Ok(self.thumb_stats.read().get(kit).cloned().unwrap_or_default())
    }

    async fn download_kit(&self, kit: &str) -> Result<Bytes, BackendError> {
        self.archives
            .read()
            .get(kit)
            .cloned()
            .ok_or_else(|| BackendError::Rejected(format!("Kit not found: {kit}")))
    }

    async fn folder_files(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<FolderFile>, BackendError> {
        self.folder_files
            .read()
            .get(&library_key(kit, folder, color))
            .cloned()
            .ok_or_else(|| BackendError::Rejected(format!("Directory not found: {folder}")))
    }
}

/// Image source serving decoded images from memory.
///
/// Locators are matched without their query string. Per-path delays let
/// tests control the order in which concurrent loads settle.
#[derive(Default)]
pub struct MemoryImageSource {
    images: RwLock<HashMap<String, Arc<ImageData>>>,
    delays: RwLock<HashMap<String, Duration>>,
    requests: Mutex<Vec<String>>,
}

fn strip_query(locator: &str) -> &str {
    locator.split('?').next().unwrap_or(locator)
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, image: ImageData) {
        self.images.write().insert(path.into(), Arc::new(image));
    }

    pub fn remove(&self, path: &str) {
        self.images.write().remove(path);
    }

    /// Delay loads of `path` by `delay`.
    pub fn set_delay(&self, path: impl Into<String>, delay: Duration) {
        self.delays.write().insert(path.into(), delay);
    }

    /// Every locator requested so far, query included.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ImageSource for MemoryImageSource {
    async fn load(&self, locator: &str) -> Result<Arc<ImageData>, LoadError> {
        self.requests.lock().push(locator.to_string());
        let path = strip_query(locator);
        let delay = self.delays.read().get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.images
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(locator.to_string()))
    }
}
