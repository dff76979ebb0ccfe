//! Merge tool: stack raw images, preview them, and flatten them into an item.

use crate::locator::{CacheToken, ImageLocator};
use common::{CanvasSize, Color, KitError, KitResult, Offset};
use kit_model::ColorVariant;
use networking::{BackendReply, ImageSource, KitBackend, LayerAdjustment, LibraryFile, MergeRequest};
use rand::Rng;
use render::{recolor_hex, ImageData, Surface};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Item number a merge is saved as when none is given.
pub const DEFAULT_DESTINATION: &str = "1";

/// Merge tool state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeState {
    /// No library opened yet.
    Idle,
    /// Library listed, stack empty.
    LibraryLoaded,
    /// Stack edited, preview not yet redrawn.
    Staging,
    /// Preview shows the current stack.
    Previewing,
    /// Waiting for the backend to flatten the stack.
    Committing,
    /// Merge committed.
    Closed,
}

/// The part folder a merge reads from and writes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeTarget {
    pub kit: String,
    pub part_folder: String,
    pub variant: ColorVariant,
    /// Canvas the preview is drawn at.
    pub canvas: CanvasSize,
}

/// One layer of the merge stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackEntry {
    pub filename: String,
    /// Library placement per axis. A missing axis is centered.
    pub x: Option<i64>,
    pub y: Option<i64>,
    /// Where the last preview drew this layer.
    pub placed: Option<Offset>,
}

/// Where a preview layer lands.
///
/// Images exactly the size of the canvas are pre-aligned and always go to
/// the origin.
pub fn placement(canvas: CanvasSize, image: &ImageData, x: Option<i64>, y: Option<i64>) -> Offset {
    if canvas.matches(image.width(), image.height()) {
        return Offset::ZERO;
    }
    let centered = canvas.centered(image.width(), image.height());
    Offset::new(x.unwrap_or(centered.x), y.unwrap_or(centered.y))
}

impl StackEntry {
    /// Offset sent with the flatten request.
    ///
    /// Only entries with a library placement carry one. A missing axis takes
    /// the centered value the preview resolved for it.
    fn request_offset(&self) -> Option<Offset> {
        match (self.x, self.y, self.placed) {
            (None, None, _) => None,
            (Some(x), Some(y), _) => Some(Offset::new(x, y)),
            (_, _, placed) => placed,
        }
    }
}

/// Layer stack editor for one part color folder.
///
/// Color adjustments are keyed by filename rather than stack slot, so a
/// file keeps its tint when it is removed and added again.
pub struct MergeTool {
    backend: Arc<dyn KitBackend>,
    source: Arc<dyn ImageSource>,
    kit_base: String,
    state: MergeState,
    target: Option<MergeTarget>,
    locator: Option<ImageLocator>,
    library: Vec<LibraryFile>,
    stack: Vec<StackEntry>,
    adjustments: BTreeMap<String, LayerAdjustment>,
    preview: Surface,
}

impl MergeTool {
    /// Create a new merge tool.
    pub fn new(backend: Arc<dyn KitBackend>, source: Arc<dyn ImageSource>, kit_base: impl Into<String>) -> Self {
        Self {
            backend,
            source,
            kit_base: kit_base.into(),
            state: MergeState::Idle,
            target: None,
            locator: None,
            library: Vec::new(),
            stack: Vec::new(),
            adjustments: BTreeMap::new(),
            preview: Surface::new(CanvasSize::new(0, 0)),
        }
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn target(&self) -> Option<&MergeTarget> {
        self.target.as_ref()
    }

    /// Files available for stacking.
    pub fn library(&self) -> &[LibraryFile] {
        &self.library
    }

    /// Stack entries, bottom first.
    pub fn stack(&self) -> &[StackEntry] {
        &self.stack
    }

    pub fn adjustments(&self) -> &BTreeMap<String, LayerAdjustment> {
        &self.adjustments
    }

    pub fn adjustment(&self, filename: &str) -> Option<&LayerAdjustment> {
        self.adjustments.get(filename)
    }

    pub fn preview(&self) -> &Surface {
        &self.preview
    }

    /// List the raw images of a part color folder and start a fresh stack.
    ///
    /// On failure the tool keeps its previous state.
    pub async fn open(&mut self, target: MergeTarget, token: CacheToken) -> KitResult<&[LibraryFile]> {
        if self.state == MergeState::Committing {
            return Err(KitError::state("a merge is being committed"));
        }
        let files = self
            .backend
            .list_part_images(&target.kit, &target.part_folder, &target.variant)
            .await
            .map_err(|e| {
                error!(folder = %target.part_folder, "Listing merge sources failed: {}", e);
                KitError::from(e)
            })?;
        info!(
            folder = %target.part_folder,
            color = %target.variant,
            files = files.len(),
            "Merge library loaded"
        );

        self.locator = Some(ImageLocator::new(self.kit_base.clone(), target.kit.clone(), token));
        self.preview = Surface::new(target.canvas);
        self.target = Some(target);
        self.library = files;
        self.stack.clear();
        self.adjustments.clear();
        self.state = MergeState::LibraryLoaded;
        Ok(&self.library)
    }

    fn require_editable(&self) -> KitResult<()> {
        match self.state {
            MergeState::LibraryLoaded | MergeState::Staging | MergeState::Previewing => Ok(()),
            other => Err(KitError::state(format!("merge tool is {other:?}"))),
        }
    }

    /// Put a library file on top of the stack.
    pub async fn add_to_stack(&mut self, filename: &str) -> KitResult<usize> {
        self.require_editable()?;
        let file = self
            .library
            .iter()
            .find(|f| f.filename == filename)
            .ok_or_else(|| KitError::selection(format!("{filename} is not in the library")))?;
        self.stack.push(StackEntry {
            filename: file.filename.clone(),
            x: file.x,
            y: file.y,
            placed: None,
        });
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Take the entry at `index` off the stack.
    pub async fn remove_from_stack(&mut self, index: usize) -> KitResult<StackEntry> {
        self.require_editable()?;
        if index >= self.stack.len() {
            return Err(KitError::InvalidStackIndex {
                index,
                len: self.stack.len(),
            });
        }
        let removed = self.stack.remove(index);
        self.state = MergeState::Staging;
        self.redraw().await?;
        Ok(removed)
    }

    /// Randomly reorder the stack.
    pub async fn shuffle_stack<R: Rng + ?Sized>(&mut self, rng: &mut R) -> KitResult<usize> {
        self.require_editable()?;
        for i in (1..self.stack.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.stack.swap(i, j);
        }
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Empty the stack. Adjustments are kept.
    pub async fn clear_stack(&mut self) -> KitResult<usize> {
        self.require_editable()?;
        self.stack.clear();
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Tint `filename` towards a `RRGGBB` color.
    pub async fn set_color_adjustment(&mut self, filename: &str, hex: &str) -> KitResult<usize> {
        self.require_editable()?;
        let color = Color::from_hex6(hex)
            .ok_or_else(|| KitError::color(format!("expected six hex digits, got {hex:?}")))?;
        self.adjustments.insert(
            filename.to_string(),
            LayerAdjustment {
                target_color: Some(color.to_hex()),
            },
        );
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Remove the tint of `filename`, keeping its adjustment entry.
    pub async fn clear_tint(&mut self, filename: &str) -> KitResult<usize> {
        self.require_editable()?;
        self.adjustments.entry(filename.to_string()).or_default().target_color = None;
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Forget every adjustment of `filename`.
    pub async fn reset_adjustment(&mut self, filename: &str) -> KitResult<usize> {
        self.require_editable()?;
        self.adjustments.remove(filename);
        self.state = MergeState::Staging;
        self.redraw().await
    }

    /// Redraw the preview from the stack. Returns the number of layers drawn.
    ///
    /// Layers are loaded one at a time since each may need recoloring
    /// before the next one is drawn over it.
    pub async fn redraw(&mut self) -> KitResult<usize> {
        let (Some(target), Some(locator)) = (&self.target, &self.locator) else {
            return Err(KitError::state("no merge library is open"));
        };

        self.preview.clear();
        let mut drawn = 0;
        for entry in &mut self.stack {
            entry.placed = None;
            let path = locator.library_file(&target.part_folder, &target.variant, &entry.filename);
            let loaded = match self.source.load(&path).await {
                Ok(image) => image,
                Err(err) => {
                    warn!(file = %entry.filename, "Merge source failed to load: {}", err);
                    continue;
                }
            };

            let tinted;
            let image: &ImageData = match self
                .adjustments
                .get(&entry.filename)
                .and_then(|a| a.target_color.as_deref())
            {
                Some(hex) => {
                    tinted = recolor_hex(&loaded, hex)?;
                    &tinted
                }
                None => &*loaded,
            };

            let at = placement(target.canvas, image, entry.x, entry.y);
            entry.placed = Some(at);
            debug!(file = %entry.filename, x = at.x, y = at.y, "Drawing merge layer");
            self.preview.draw_at(image, at);
            drawn += 1;
        }

        self.state = if self.stack.is_empty() {
            MergeState::LibraryLoaded
        } else {
            MergeState::Previewing
        };
        Ok(drawn)
    }

    /// The flatten request for the current stack.
    pub fn merge_request(&self, destination: Option<&str>, bulk_apply: bool) -> KitResult<MergeRequest> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| KitError::state("no merge library is open"))?;
        if self.stack.is_empty() {
            return Err(KitError::EmptyStack);
        }

        let selected_files: Vec<String> = self.stack.iter().map(|e| e.filename.clone()).collect();
        let offsets = self
            .stack
            .iter()
            .filter_map(|e| e.request_offset().map(|o| (e.filename.clone(), o)))
            .collect();
        let layer_adjustments = self
            .adjustments
            .iter()
            .filter(|(name, _)| selected_files.contains(name))
            .map(|(name, adj)| (name.clone(), adj.clone()))
            .collect();
        let destination_name = destination
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESTINATION)
            .to_string();

        Ok(MergeRequest {
            kit: target.kit.clone(),
            folder: target.part_folder.clone(),
            color: target.variant.clone(),
            selected_files,
            offsets,
            destination_name,
            bulk_apply,
            layer_adjustments,
        })
    }

    /// Ask the backend to flatten the stack into `destination`.
    ///
    /// On success the tool closes. On failure it goes back to staging with
    /// the stack and adjustments untouched.
    pub async fn commit(&mut self, destination: Option<&str>, bulk_apply: bool) -> KitResult<BackendReply> {
        match self.state {
            MergeState::Staging | MergeState::Previewing => {}
            MergeState::LibraryLoaded => return Err(KitError::EmptyStack),
            other => return Err(KitError::state(format!("cannot commit while {other:?}"))),
        }
        let request = self.merge_request(destination, bulk_apply)?;

        self.state = MergeState::Committing;
        match self.backend.merge_layers(&request).await {
            Ok(reply) => {
                info!(
                    folder = %request.folder,
                    destination = %request.destination_name,
                    layers = request.selected_files.len(),
                    bulk_apply,
                    "Merge committed"
                );
                self.stack.clear();
                self.adjustments.clear();
                self.state = MergeState::Closed;
                Ok(reply)
            }
            Err(err) => {
                error!(folder = %request.folder, "Merge failed: {}", err);
                self.state = MergeState::Staging;
                Err(err.into())
            }
        }
    }

    /// Leave the tool without committing.
    pub fn close(&mut self) {
        if self.state != MergeState::Committing {
            self.stack.clear();
            self.adjustments.clear();
            self.state = MergeState::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use networking::{MemoryBackend, MemoryImageSource};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CANVAS: CanvasSize = CanvasSize::new(4, 4);
    const GRAY: Color = Color::rgb(128, 128, 128);

    fn target() -> MergeTarget {
        MergeTarget {
            kit: "k".into(),
            part_folder: "2-1".into(),
            variant: ColorVariant::Default,
            canvas: CANVAS,
        }
    }

    fn setup() -> (Arc<MemoryBackend>, MergeTool) {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_library(
            "k",
            "2-1",
            &ColorVariant::Default,
            vec![
                LibraryFile::new("1.png"),
                LibraryFile::new("2.png"),
                LibraryFile::new("3.png").with_offset(Offset::new(2, 2)),
                LibraryFile::new("4.png").with_x(0),
            ],
        );
        let source = Arc::new(MemoryImageSource::new());
        source.insert("downloads/k/2-1/1.png", ImageData::filled(4, 4, GRAY));
        source.insert("downloads/k/2-1/2.png", ImageData::filled(2, 2, Color::WHITE));
        source.insert("downloads/k/2-1/3.png", ImageData::filled(4, 4, Color::BLUE));
        source.insert("downloads/k/2-1/4.png", ImageData::filled(2, 2, Color::RED));
        let tool = MergeTool::new(backend.clone(), source, "downloads");
        (backend, tool)
    }

    #[tokio::test]
    async fn test_open_lists_library() {
        let (_, mut tool) = setup();
        assert_eq!(tool.state(), MergeState::Idle);
        let files = tool.open(target(), CacheToken::new(1)).await.unwrap();
        assert_eq!(files.len(), 4);
        assert_eq!(tool.state(), MergeState::LibraryLoaded);
        assert_eq!(tool.preview().size(), CANVAS);
    }

    #[tokio::test]
    async fn test_tinted_layer_paints_over_untinted() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("1.png").await.unwrap();
        tool.add_to_stack("2.png").await.unwrap();
        tool.set_color_adjustment("2.png", "FF0000").await.unwrap();
        assert_eq!(tool.state(), MergeState::Previewing);

        let preview = tool.preview().snapshot();
        assert_eq!(preview.get_pixel(0, 0), GRAY);
        // 2x2 white centered on 4x4, tinted red
        assert_eq!(preview.get_pixel(1, 1), Color::RED);
        assert_eq!(preview.get_pixel(2, 2), Color::RED);
        assert_eq!(preview.get_pixel(3, 3), GRAY);

        // re-adding 1.png moves it on top
        let removed = tool.remove_from_stack(0).await.unwrap();
        assert_eq!(removed.filename, "1.png");
        tool.add_to_stack("1.png").await.unwrap();
        assert_eq!(tool.preview().snapshot().get_pixel(1, 1), GRAY);
        assert_eq!(tool.adjustment("2.png").unwrap().target_color.as_deref(), Some("FF0000"));
    }

    #[tokio::test]
    async fn test_full_canvas_layer_ignores_offset() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("3.png").await.unwrap();
        let preview = tool.preview().snapshot();
        assert_eq!(preview.get_pixel(0, 0), Color::BLUE);
        assert_eq!(preview.get_pixel(3, 3), Color::BLUE);
    }

    #[test]
    fn test_placement_rules() {
        let small = ImageData::filled(2, 2, Color::WHITE);
        let full = ImageData::filled(4, 4, Color::WHITE);
        assert_eq!(placement(CANVAS, &small, None, None), Offset::new(1, 1));
        assert_eq!(placement(CANVAS, &small, Some(3), Some(0)), Offset::new(3, 0));
        assert_eq!(placement(CANVAS, &small, Some(0), None), Offset::new(0, 1));
        assert_eq!(placement(CANVAS, &small, None, Some(2)), Offset::new(1, 2));
        assert_eq!(placement(CANVAS, &full, Some(3), Some(0)), Offset::ZERO);
        let odd = ImageData::filled(3, 3, Color::WHITE);
        assert_eq!(placement(CANVAS, &odd, None, None), Offset::new(0, 0));
    }

    #[tokio::test]
    async fn test_remove_invalid_index() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("1.png").await.unwrap();
        match tool.remove_from_stack(5).await {
            Err(KitError::InvalidStackIndex { index: 5, len: 1 }) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(tool.stack().len(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_file_and_bad_color() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        assert!(matches!(tool.add_to_stack("9.png").await, Err(KitError::InvalidSelection(_))));
        assert!(matches!(
            tool.set_color_adjustment("1.png", "red").await,
            Err(KitError::InvalidColor(_))
        ));
        assert!(tool.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_shuffle_keeps_entries() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        for f in ["1.png", "2.png", "3.png"] {
            tool.add_to_stack(f).await.unwrap();
        }
        let mut rng = StdRng::seed_from_u64(11);
        tool.shuffle_stack(&mut rng).await.unwrap();
        let mut names: Vec<_> = tool.stack().iter().map(|e| e.filename.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["1.png", "2.png", "3.png"]);
    }

    #[tokio::test]
    async fn test_clear_and_reset_adjustments() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.set_color_adjustment("2.png", "#00ff00").await.unwrap();
        assert_eq!(tool.adjustment("2.png").unwrap().target_color.as_deref(), Some("00FF00"));

        tool.clear_tint("2.png").await.unwrap();
        assert_eq!(tool.adjustment("2.png"), Some(&LayerAdjustment { target_color: None }));

        tool.reset_adjustment("2.png").await.unwrap();
        assert!(tool.adjustment("2.png").is_none());
    }

    #[tokio::test]
    async fn test_single_axis_offset_centers_other_axis() {
        let (backend, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("4.png").await.unwrap();

        // x pinned to 0, y centered at 1
        let preview = tool.preview().snapshot();
        assert_eq!(preview.get_pixel(0, 1), Color::RED);
        assert_eq!(preview.get_pixel(1, 2), Color::RED);
        assert_eq!(preview.get_pixel(2, 1), Color::TRANSPARENT);
        assert_eq!(preview.get_pixel(0, 0), Color::TRANSPARENT);

        tool.commit(None, false).await.unwrap();
        let req = &backend.merges()[0];
        assert_eq!(req.offsets.get("4.png"), Some(&Offset::new(0, 1)));
    }

    #[tokio::test]
    async fn test_commit_payload_and_close() {
        let (backend, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("3.png").await.unwrap();
        tool.add_to_stack("2.png").await.unwrap();
        tool.set_color_adjustment("2.png", "FF0000").await.unwrap();
        tool.set_color_adjustment("1.png", "00FF00").await.unwrap();

        tool.commit(None, true).await.unwrap();
        assert_eq!(tool.state(), MergeState::Closed);

        let merges = backend.merges();
        let req = &merges[0];
        assert_eq!(req.selected_files, vec!["3.png", "2.png"]);
        assert_eq!(req.destination_name, "1");
        assert!(req.bulk_apply);
        assert_eq!(req.offsets.get("3.png"), Some(&Offset::new(2, 2)));
        assert!(!req.offsets.contains_key("2.png"));
        assert!(req.layer_adjustments.contains_key("2.png"));
        assert!(!req.layer_adjustments.contains_key("1.png"));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_stack() {
        let (backend, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        tool.add_to_stack("1.png").await.unwrap();
        tool.set_color_adjustment("1.png", "FF0000").await.unwrap();
        backend.set_rejection(Some("disk full"));

        let err = tool.commit(Some("4"), false).await.unwrap_err();
        assert!(matches!(err, KitError::Backend(_)));
        assert_eq!(tool.state(), MergeState::Staging);
        assert_eq!(tool.stack().len(), 1);
        assert!(tool.adjustment("1.png").is_some());

        backend.set_rejection(None);
        tool.commit(Some("4"), false).await.unwrap();
        assert_eq!(backend.merges()[0].destination_name, "4");
    }

    #[tokio::test]
    async fn test_commit_empty_stack() {
        let (_, mut tool) = setup();
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        assert!(matches!(tool.commit(None, false).await, Err(KitError::EmptyStack)));
        tool.add_to_stack("1.png").await.unwrap();
        tool.clear_stack().await.unwrap();
        assert!(matches!(tool.commit(None, false).await, Err(KitError::EmptyStack)));
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let (backend, mut tool) = setup();
        backend.insert_library("k", "2-1", &ColorVariant::Default, vec![LibraryFile::new("gone.png")]);
        tool.open(target(), CacheToken::new(1)).await.unwrap();
        assert_eq!(tool.add_to_stack("gone.png").await.unwrap(), 0);
        assert!(tool.preview().is_blank());
    }
}
