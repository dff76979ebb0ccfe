//! Image loading for layer artwork.

use crate::client::{ClientError, HttpClient};
use async_trait::async_trait;
use common::KitError;
use futures::future::join_all;
use render::{ImageCache, ImageData};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Load error.
#[derive(Clone, Debug, Error)]
pub enum LoadError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error: {status}")]
    Http { status: u16 },
    #[error("Timeout")]
    Timeout,
    #[error("Invalid locator: {0}")]
    InvalidUrl(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<ClientError> for LoadError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidUrl(msg) => LoadError::InvalidUrl(msg),
            ClientError::Timeout => LoadError::Timeout,
            ClientError::Status { status } => LoadError::Http { status },
            ClientError::Connection(msg) | ClientError::Request(msg) | ClientError::Response(msg) => {
                LoadError::Network(msg)
            }
        }
    }
}

impl From<LoadError> for KitError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Decode(msg) => KitError::decode(msg),
            other => KitError::image_load(other.to_string()),
        }
    }
}

/// Something that turns an image locator into decoded pixels.
///
/// Locators are server-relative paths such as
/// `downloads/kit_1/1-1/red/3.png?v=7`.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, locator: &str) -> Result<Arc<ImageData>, LoadError>;
}

#[async_trait]
impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    async fn load(&self, locator: &str) -> Result<Arc<ImageData>, LoadError> {
        (**self).load(locator).await
    }
}

/// Load several locators concurrently, keeping request order.
pub async fn load_all<S>(source: &S, locators: &[String]) -> Vec<Result<Arc<ImageData>, LoadError>>
where
    S: ImageSource + ?Sized,
{
    join_all(locators.iter().map(|l| source.load(l))).await
}

/// Loader that fetches images from the kit server.
///
/// Decoded images are cached by full locator, so a bumped cache token
/// always misses.
pub struct ResourceLoader {
    client: Arc<HttpClient>,
    cache: Arc<ImageCache>,
}

impl ResourceLoader {
    /// Create a new loader.
    pub fn new(client: Arc<HttpClient>, cache: Arc<ImageCache>) -> Self {
        Self { client, cache }
    }

    /// Get the image cache.
    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }
}

#[async_trait]
impl ImageSource for ResourceLoader {
    async fn load(&self, locator: &str) -> Result<Arc<ImageData>, LoadError> {
        if let Some(image) = self.cache.get(locator) {
            trace!(locator, "Image cache hit");
            return Ok(image);
        }

        let bytes = self.client.fetch(locator).await.map_err(|e| match e {
            ClientError::Status { status: 404 } => LoadError::NotFound(locator.to_string()),
            other => LoadError::from(other),
        })?;
        let image = ImageData::decode(&bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        debug!(locator, width = image.width(), height = image.height(), "Loaded image");
        Ok(self.cache.insert(locator, Arc::new(image)))
    }
}

/// Loader that reads images from a local copy of the server's tree.
pub struct FileImageSource {
    root: PathBuf,
}

impl FileImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a locator, ignoring any query string.
    pub fn path_for(&self, locator: &str) -> Result<PathBuf, LoadError> {
        let path = locator.split('?').next().unwrap_or(locator).trim_start_matches('/');
        if path.is_empty() || path.split('/').any(|seg| seg == "..") {
            return Err(LoadError::InvalidUrl(locator.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn load(&self, locator: &str) -> Result<Arc<ImageData>, LoadError> {
        let path = self.path_for(locator)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(locator.to_string()),
            _ => LoadError::Network(e.to_string()),
        })?;
        let image = ImageData::decode(&bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        Ok(Arc::new(image))
    }
}
