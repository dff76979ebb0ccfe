//! Networking layer for the kit creator.
//!
//! This crate handles:
//! - The JSON API of the kit backend (structure, image lists, merges, file edits,
//!   thumbnails, archives)
//! - Fetching and decoding layer images over HTTP or from disk
//! - In-memory stand-ins for both

pub mod client;
pub mod api;
pub mod backend;
pub mod loader;
pub mod memory;

pub use api::{
    BackendCommand, BackendReply, FolderFile, FolderFileKind, ItemLayerInfo, LayerAdjustment,
    LibraryFile, MergeRequest, StructureResponse, ThumbFolderStats, ThumbStats,
};
pub use bytes::Bytes;
pub use backend::{BackendError, HttpBackend, KitBackend};
pub use client::{ClientConfig, ClientError, HttpClient, HttpClientBuilder};
pub use loader::{load_all, FileImageSource, ImageSource, LoadError, ResourceLoader};
pub use memory::{MemoryBackend, MemoryImageSource};
