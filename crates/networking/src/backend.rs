//! The kit server as seen by the editor.

use crate::api::{
    BackendCommand, BackendReply, FolderFile, FolderFilesResponse, ItemLayerInfo, ItemLayersRequest,
    ItemLayersResponse, KitRequest, KitsListResponse, LibraryFile, ListImagesRequest,
    ListImagesResponse, MergeRequest, StructureResponse, ThumbStats, ThumbStatsResponse,
};
use crate::client::{ClientError, HttpClient};
use async_trait::async_trait;
use bytes::Bytes;
use common::KitError;
use kit_model::{ColorVariant, KitStructure, KitSummary};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Backend errors.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[from] ClientError),
    /// The server answered with `success: false`.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<BackendError> for KitError {
    fn from(err: BackendError) -> Self {
        KitError::backend(err.to_string())
    }
}

fn check(success: bool, message: &str, what: &str) -> Result<(), BackendError> {
    if success {
        Ok(())
    } else {
        Err(rejection(message, what))
    }
}

fn rejection(message: &str, what: &str) -> BackendError {
    if message.is_empty() {
        BackendError::Rejected(format!("{what} failed"))
    } else {
        BackendError::Rejected(message.to_string())
    }
}

/// Operations the editor needs from the kit server.
#[async_trait]
pub trait KitBackend: Send + Sync {
    /// Kits available for editing.
    async fn list_kits(&self) -> Result<Vec<KitSummary>, BackendError>;

    /// Parts, colors and canvas size of one kit.
    async fn kit_structure(&self, kit: &str) -> Result<KitStructure, BackendError>;

    /// Raw images available for merging in a part's color folder.
    async fn list_part_images(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<LibraryFile>, BackendError>;

    /// Flatten a stack of raw images into one item.
    async fn merge_layers(&self, request: &MergeRequest) -> Result<BackendReply, BackendError>;

    /// Source layers an item was assembled from.
    async fn item_layers(
        &self,
        kit: &str,
        folder: &str,
        item_number: u32,
    ) -> Result<Vec<ItemLayerInfo>, BackendError>;

    /// Run a file-system edit.
    async fn execute(&self, command: &BackendCommand) -> Result<BackendReply, BackendError>;

    /// Generate thumbnails for every item of a kit that lacks one.
    async fn create_missing_thumbs(&self, kit: &str) -> Result<ThumbStats, BackendError>;

    /// Zip archive of a whole kit.
    async fn download_kit(&self, kit: &str) -> Result<Bytes, BackendError>;

    /// Every file in a part folder, including shared files of the part root
    /// when a color folder is listed.
    async fn folder_files(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<FolderFile>, BackendError>;
}

#[async_trait]
impl<T: KitBackend + ?Sized> KitBackend for Arc<T> {
    async fn list_kits(&self) -> Result<Vec<KitSummary>, BackendError> {
        (**self).list_kits().await
    }

    async fn kit_structure(&self, kit: &str) -> Result<KitStructure, BackendError> {
        (**self).kit_structure(kit).await
    }

    async fn list_part_images(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<LibraryFile>, BackendError> {
        (**self).list_part_images(kit, folder, color).await
    }

    async fn merge_layers(&self, request: &MergeRequest) -> Result<BackendReply, BackendError> {
        (**self).merge_layers(request).await
    }

    async fn item_layers(
        &self,
        kit: &str,
        folder: &str,
        item_number: u32,
    ) -> Result<Vec<ItemLayerInfo>, BackendError> {
        (**self).item_layers(kit, folder, item_number).await
    }

    async fn execute(&self, command: &BackendCommand) -> Result<BackendReply, BackendError> {
        (**self).execute(command).await
    }

    async fn create_missing_thumbs(&self, kit: &str) -> Result<ThumbStats, BackendError> {
        (**self).create_missing_thumbs(kit).await
    }

    async fn download_kit(&self, kit: &str) -> Result<Bytes, BackendError> {
        (**self).download_kit(kit).await
    }

    async fn folder_files(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<FolderFile>, BackendError> {
        (**self).folder_files(kit, folder, color).await
    }
}

/// Backend reached over the server's JSON API.
pub struct HttpBackend {
    client: Arc<HttpClient>,
}

impl HttpBackend {
    /// Create a new backend over a client.
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }
}

#[async_trait]
impl KitBackend for HttpBackend {
    async fn list_kits(&self) -> Result<Vec<KitSummary>, BackendError> {
        let resp: KitsListResponse = self
            .client
            .post_json("api/get_kits_list", &serde_json::json!({}))
            .await?;
        check(resp.success, &resp.message, "Kit listing")?;
        debug!("Listed {} kits", resp.kits.len());
        Ok(resp.kits)
    }

    async fn kit_structure(&self, kit: &str) -> Result<KitStructure, BackendError> {
        let resp: StructureResponse = self
            .client
            .post_json("api/get_kit_structure", &KitRequest { kit })
            .await?;
        check(resp.success, &resp.message, "Structure load")?;
        let structure = resp.into_structure(kit);
        if !structure.advisories.is_empty() {
            warn!(kit, "Kit has coordinate advisories: {:?}", structure.advisories.warnings());
        }
        Ok(structure)
    }

    async fn list_part_images(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<LibraryFile>, BackendError> {
        let request = ListImagesRequest {
            kit,
            folder,
            color: color.as_str(),
        };
        let resp: ListImagesResponse = self.client.post_json("api/list_part_images", &request).await?;
        check(resp.success, &resp.message, "Image listing")?;
        Ok(resp.files)
    }

    async fn merge_layers(&self, request: &MergeRequest) -> Result<BackendReply, BackendError> {
        let reply: BackendReply = self.client.post_json("api/merge_layers", request).await?;
        check(reply.success, &reply.message, "Merge")?;
        Ok(reply)
    }

    async fn item_layers(
        &self,
        kit: &str,
        folder: &str,
        item_number: u32,
    ) -> Result<Vec<ItemLayerInfo>, BackendError> {
        let request = ItemLayersRequest {
            kit,
            folder,
            item_number,
        };
        let resp: ItemLayersResponse = self.client.post_json("api/get_item_layers", &request).await?;
        check(resp.success, &resp.message, "Layer listing")?;
        Ok(resp.layers)
    }

    async fn execute(&self, command: &BackendCommand) -> Result<BackendReply, BackendError> {
        let endpoint = command.endpoint();
        debug!(endpoint, "Running backend command");
        let reply: BackendReply = self.client.post_json(endpoint, command).await?;
        check(reply.success, &reply.message, endpoint)?;
        Ok(reply)
    }

    async fn create_missing_thumbs(&self, kit: &str) -> Result<ThumbStats, BackendError> {
        let command = BackendCommand::AutoCreateThumbs { kit: kit.to_string() };
        let resp: ThumbStatsResponse = self.client.post_json(command.endpoint(), &command).await?;
        check(resp.success, &resp.message, "Thumbnail generation")?;
        info!(
            kit,
            created = resp.stats.created_thumbs,
            skipped = resp.stats.skipped_thumbs,
            "Thumbnails generated"
        );
        Ok(resp.stats)
    }

    async fn download_kit(&self, kit: &str) -> Result<Bytes, BackendError> {
        let body = self.client.fetch_with_query("api/zip_kit", &[("kit", kit)]).await?;
        zip_archive(body, "Kit download")
    }

    async fn folder_files(
        &self,
        kit: &str,
        folder: &str,
        color: &ColorVariant,
    ) -> Result<Vec<FolderFile>, BackendError> {
        let mut query = vec![("kit", kit), ("folder", folder)];
        if let Some(color) = color.folder() {
            query.push(("color", color));
        }
        let resp: FolderFilesResponse = self.client.get_json("api/debug_folder_files", &query).await?;
        check(resp.success, &resp.message, "Folder listing")?;
        debug!(kit, folder, files = resp.files.len(), "Listed folder files");
        Ok(resp.files)
    }
}

/// Accept `body` if it is a zip archive. Failures come back as a JSON reply
/// instead of an archive.
fn zip_archive(body: Bytes, what: &str) -> Result<Bytes, BackendError> {
    if body.starts_with(b"PK") {
        return Ok(body);
    }
    match serde_json::from_slice::<BackendReply>(&body) {
        Ok(reply) if !reply.success => Err(rejection(&reply.message, what)),
        _ => Err(BackendError::Rejected(format!("{what} returned no archive"))),
    }
}
