//! Request and response bodies of the kit server's JSON API.

use common::{CanvasSize, Offset};
use kit_model::{ColorVariant, KitStructure, KitSummary, Part, StructureAdvisories};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generic `{success, message}` reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReply {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KitsListResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub kits: Vec<KitSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct KitRequest<'a> {
    pub kit: &'a str,
}

/// Reply to a structure request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StructureResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub has_separated_layers: bool,
    #[serde(default)]
    pub separated_folders: Vec<String>,
    #[serde(default)]
    pub duplicates: Vec<String>,
    #[serde(default)]
    pub missing_x: Vec<i64>,
    #[serde(default)]
    pub missing_y: Vec<i64>,
    pub canvas_width: Option<u32>,
    pub canvas_height: Option<u32>,
}

impl StructureResponse {
    /// Build the kit structure this reply describes.
    pub fn into_structure(self, kit: &str) -> KitStructure {
        let canvas = CanvasSize::new(
            self.canvas_width.filter(|w| *w > 0).unwrap_or(CanvasSize::DEFAULT.width),
            self.canvas_height.filter(|h| *h > 0).unwrap_or(CanvasSize::DEFAULT.height),
        );
        let reported = StructureAdvisories {
            duplicates: self.duplicates,
            missing_x: self.missing_x,
            missing_y: self.missing_y,
        };
        KitStructure::new(kit, self.parts, canvas)
            .with_reported_advisories(reported)
            .with_separated_folders(self.separated_folders)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ListImagesRequest<'a> {
    pub kit: &'a str,
    pub folder: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListImagesResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<LibraryFile>,
}

/// A raw image available for merging.
///
/// Older servers list bare filenames; newer ones add a sort order and the
/// placement the image was cropped at. Either axis may be missing, in which
/// case the image is centered along it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LibraryFileWire")]
pub struct LibraryFile {
    pub filename: String,
    pub order: Option<u32>,
    pub x: Option<i64>,
    pub y: Option<i64>,
}

impl LibraryFile {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            order: None,
            x: None,
            y: None,
        }
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.x = Some(offset.x);
        self.y = Some(offset.y);
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_x(mut self, x: i64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: i64) -> Self {
        self.y = Some(y);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryFileWire {
    Name(String),
    Entry {
        filename: String,
        order: Option<u32>,
        x: Option<i64>,
        y: Option<i64>,
    },
}

impl From<LibraryFileWire> for LibraryFile {
    fn from(wire: LibraryFileWire) -> Self {
        match wire {
            LibraryFileWire::Name(filename) => LibraryFile::new(filename),
            LibraryFileWire::Entry { filename, order, x, y } => LibraryFile { filename, order, x, y },
        }
    }
}

/// Recolor applied to one merge source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAdjustment {
    /// `RRGGBB` target, or `None` when the tint was cleared.
    pub target_color: Option<String>,
}

/// Flatten an ordered stack of raw images into one item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeRequest {
    pub kit: String,
    pub folder: String,
    pub color: ColorVariant,
    /// Paint order, bottom first.
    pub selected_files: Vec<String>,
    pub offsets: BTreeMap<String, Offset>,
    /// Item number the result is saved as.
    pub destination_name: String,
    /// Repeat the merge in every sibling color folder.
    pub bulk_apply: bool,
    pub layer_adjustments: BTreeMap<String, LayerAdjustment>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemLayersRequest<'a> {
    pub kit: &'a str,
    pub folder: &'a str,
    pub item_number: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemLayersResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub layers: Vec<ItemLayerInfo>,
}

/// One source layer an item was assembled from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ItemLayerInfo {
    /// `main` or `addon`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "index_as_string")]
    pub index: String,
    #[serde(default)]
    pub blob: Option<String>,
    #[serde(default)]
    pub layer_id: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub w: i64,
    #[serde(default)]
    pub h: i64,
}

fn index_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(i64),
        Text(String),
    }
    Ok(match Index::deserialize(deserializer)? {
        Index::Number(n) => n.to_string(),
        Index::Text(s) => s,
    })
}

/// Outcome of generating missing picker thumbnails across a kit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbStats {
    #[serde(default)]
    pub total_folders: u32,
    #[serde(default)]
    pub total_images: u32,
    #[serde(default)]
    pub created_thumbs: u32,
    /// Items that already had a thumbnail.
    #[serde(default)]
    pub skipped_thumbs: u32,
    /// Part folders that gained thumbnails.
    #[serde(default)]
    pub details: Vec<ThumbFolderStats>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbFolderStats {
    pub folder: String,
    #[serde(default)]
    pub created: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThumbStatsResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stats: ThumbStats,
}

/// A file found in a part folder by the folder browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderFile {
    pub name: String,
    /// Server-absolute URL of the file.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_image: bool,
    /// Which folder the file was found in, e.g. `Main` or `Color/Sub`.
    #[serde(default)]
    pub location: String,
}

/// Role of a folder file inside a part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FolderFileKind {
    /// `<n>.png`
    Layer(u32),
    /// `thumb_<n>.png`
    Thumbnail(u32),
    /// `nav.png`
    NavIcon,
    Other,
}

fn png_number(stem: &str) -> Option<u32> {
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

impl FolderFile {
    pub fn kind(&self) -> FolderFileKind {
        let Some(stem) = self.name.strip_suffix(".png") else {
            return FolderFileKind::Other;
        };
        if stem == "nav" {
            return FolderFileKind::NavIcon;
        }
        if let Some(n) = stem.strip_prefix("thumb_").and_then(png_number) {
            return FolderFileKind::Thumbnail(n);
        }
        png_number(stem).map_or(FolderFileKind::Other, FolderFileKind::Layer)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderFilesResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<FolderFile>,
}

/// File-system edits on the kit, each answered with a [`BackendReply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BackendCommand {
    RenameColorFolder {
        kit: String,
        part_folder: String,
        old_color: String,
        new_color: String,
    },
    DeleteColorFolders {
        kit: String,
        part_folder: String,
        colors: Vec<String>,
    },
    RenameFile {
        kit: String,
        folder: String,
        color: ColorVariant,
        old_name: String,
        new_name: String,
    },
    DeleteFile {
        kit: String,
        folder: String,
        color: ColorVariant,
        filename: String,
    },
    CreateThumbnail {
        kit: String,
        folder: String,
        color: ColorVariant,
        source_file: String,
        target_file: String,
    },
    UploadFile {
        kit: String,
        folder: String,
        color: ColorVariant,
        filename: String,
        /// Base64 file body.
        file_content: String,
    },
    FlattenColors {
        kit: String,
        folder: String,
    },
    RenamePartFolder {
        kit: String,
        old_name: String,
        new_name: String,
    },
    DeletePart {
        kit: String,
        /// Menu position of the part.
        y: i64,
    },
    /// Generate thumbnails for every item that lacks one.
    AutoCreateThumbs {
        kit: String,
    },
    /// Remove every `thumb_*.png` in the kit.
    DeleteAllThumbs {
        kit: String,
    },
}

impl BackendCommand {
    /// Build an upload, encoding the file body.
    pub fn upload(
        kit: impl Into<String>,
        folder: impl Into<String>,
        color: ColorVariant,
        filename: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        use base64::Engine;
        BackendCommand::UploadFile {
            kit: kit.into(),
            folder: folder.into(),
            color,
            filename: filename.into(),
            file_content: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// API path of the command.
    pub fn endpoint(&self) -> &'static str {
        match self {
            BackendCommand::RenameColorFolder { .. } => "api/rename_color_folder",
            BackendCommand::DeleteColorFolders { .. } => "api/delete_color_folders",
            BackendCommand::RenameFile { .. } => "api/rename_file",
            BackendCommand::DeleteFile { .. } => "api/delete_file",
            BackendCommand::CreateThumbnail { .. } => "api/create_thumb",
            BackendCommand::UploadFile { .. } => "api/upload_file",
            BackendCommand::FlattenColors { .. } => "api/flatten_colors",
            BackendCommand::RenamePartFolder { .. } => "api/rename_folder",
            BackendCommand::DeletePart { .. } => "api/delete_part",
            BackendCommand::AutoCreateThumbs { .. } => "api/auto_create_thumbs",
            BackendCommand::DeleteAllThumbs { .. } => "api/delete_all_thumbs",
        }
    }

    /// Whether a successful run changes the kit's parts, items or colors.
    ///
    /// Single thumbnails and uploads (nav icons) only touch picker artwork.
    /// Kit-wide thumbnail passes reload so every picker is refreshed.
    pub fn changes_structure(&self) -> bool {
        !matches!(
            self,
            BackendCommand::CreateThumbnail { .. } | BackendCommand::UploadFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structure_response_defaults() {
        let resp: StructureResponse = serde_json::from_value(json!({
            "success": true,
            "parts": [{"x": 1, "y": 1, "folder": "1-1", "items_count": 2, "colors": []}]
        }))
        .unwrap();
        let structure = resp.into_structure("kit_1");
        assert_eq!(structure.canvas, CanvasSize::DEFAULT);
        assert_eq!(structure.kit, "kit_1");
        assert_eq!(structure.len(), 1);
        assert!(structure.advisories.is_empty());
    }

    #[test]
    fn test_structure_response_reported_advisories() {
        let resp: StructureResponse = serde_json::from_value(json!({
            "success": true,
            "parts": [],
            "duplicates": ["X=2: 2-1, 2-3"],
            "missing_x": [1],
            "canvas_width": 800,
            "canvas_height": 600,
            "separated_folders": ["2-1"]
        }))
        .unwrap();
        let structure = resp.into_structure("k");
        assert_eq!(structure.canvas, CanvasSize::new(800, 600));
        assert_eq!(structure.advisories.duplicates.len(), 1);
        assert_eq!(structure.advisories.missing_x, vec![1]);
        assert!(structure.has_separated_layers());
    }

    #[test]
    fn test_library_file_accepts_both_forms() {
        let files: Vec<LibraryFile> = serde_json::from_value(json!([
            "3.png",
            {"filename": "1.png", "order": 1, "x": 10, "y": -4},
            {"filename": "2.png", "x": 6}
        ]))
        .unwrap();
        assert_eq!(files[0], LibraryFile::new("3.png"));
        assert_eq!(files[1], LibraryFile::new("1.png").with_offset(Offset::new(10, -4)).with_order(1));
        assert_eq!(files[2].x, Some(6));
        assert_eq!(files[2].y, None);
    }

    #[test]
    fn test_merge_request_wire_shape() {
        let mut offsets = BTreeMap::new();
        offsets.insert("1.png".to_string(), Offset::new(3, 4));
        let mut adjustments = BTreeMap::new();
        adjustments.insert(
            "2.png".to_string(),
            LayerAdjustment { target_color: Some("FF0000".into()) },
        );
        let req = MergeRequest {
            kit: "k".into(),
            folder: "2-1".into(),
            color: ColorVariant::Default,
            selected_files: vec!["1.png".into(), "2.png".into()],
            offsets,
            destination_name: "1".into(),
            bulk_apply: true,
            layer_adjustments: adjustments,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["color"], "default");
        assert_eq!(value["offsets"]["1.png"], json!({"x": 3, "y": 4}));
        assert_eq!(value["layer_adjustments"]["2.png"]["target_color"], "FF0000");
        assert_eq!(value["selected_files"], json!(["1.png", "2.png"]));
    }

    #[test]
    fn test_item_layer_index_forms() {
        let layers: Vec<ItemLayerInfo> = serde_json::from_value(json!([
            {"type": "main", "index": 0, "blob": "abc", "x": 1, "y": 2, "w": 3, "h": 4},
            {"type": "addon", "index": "0-1"}
        ]))
        .unwrap();
        assert_eq!(layers[0].index, "0");
        assert_eq!(layers[1].index, "0-1");
        assert_eq!(layers[1].blob, None);
    }

    #[test]
    fn test_command_payloads() {
        let cmd = BackendCommand::upload("k", "1-1", ColorVariant::Default, "nav.png", b"hi");
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["file_content"], "aGk=");
        assert_eq!(value["color"], "default");
        assert_eq!(cmd.endpoint(), "api/upload_file");
        assert!(!cmd.changes_structure());

        let cmd = BackendCommand::DeletePart { kit: "k".into(), y: 3 };
        assert_eq!(serde_json::to_value(&cmd).unwrap(), json!({"kit": "k", "y": 3}));
        assert!(cmd.changes_structure());
    }

    #[test]
    fn test_thumb_commands() {
        let cmd = BackendCommand::AutoCreateThumbs { kit: "k".into() };
        assert_eq!(serde_json::to_value(&cmd).unwrap(), json!({"kit": "k"}));
        assert_eq!(cmd.endpoint(), "api/auto_create_thumbs");
        assert!(cmd.changes_structure());

        let cmd = BackendCommand::DeleteAllThumbs { kit: "k".into() };
        assert_eq!(cmd.endpoint(), "api/delete_all_thumbs");
        assert!(cmd.changes_structure());
    }

    #[test]
    fn test_thumb_stats_reply() {
        let resp: ThumbStatsResponse = serde_json::from_value(json!({
            "success": true,
            "message": "done",
            "stats": {
                "total_folders": 3,
                "total_images": 12,
                "created_thumbs": 4,
                "skipped_thumbs": 8,
                "details": [{"folder": "2-1", "created": 4}]
            }
        }))
        .unwrap();
        assert!(resp.success);
        assert_eq!(resp.stats.created_thumbs, 4);
        assert_eq!(
            resp.stats.details,
            vec![ThumbFolderStats { folder: "2-1".into(), created: 4 }]
        );

        let failed: ThumbStatsResponse =
            serde_json::from_value(json!({"success": false, "message": "Kit not found"})).unwrap();
        assert_eq!(failed.stats, ThumbStats::default());
    }

    #[test]
    fn test_folder_file_kinds() {
        let files: Vec<FolderFile> = serde_json::from_value(json!([
            {"name": "3.png", "url": "/downloads/k/items_structured/2-1/3.png", "is_image": true, "location": "Main"},
            {"name": "thumb_3.png", "is_image": true},
            {"name": "nav.png"},
            {"name": "thumb_x.png"},
            {"name": "3.jpg"},
            {"name": ".png"}
        ]))
        .unwrap();
        let kinds: Vec<_> = files.iter().map(FolderFile::kind).collect();
        assert_eq!(
            kinds,
            vec![
                FolderFileKind::Layer(3),
                FolderFileKind::Thumbnail(3),
                FolderFileKind::NavIcon,
                FolderFileKind::Other,
                FolderFileKind::Other,
                FolderFileKind::Other,
            ]
        );
        assert_eq!(files[0].location, "Main");
    }
}
