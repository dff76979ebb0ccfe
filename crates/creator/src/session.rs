//! Editing session: one kit, its selections and the composite.

use crate::config::CreatorConfig;
use crate::observer::SessionObserver;
use common::{KitError, KitResult};
use compositor::merge::MergeTarget;
use compositor::{CacheToken, Compositor, ImageLocator, MergeTool, RenderReport};
use kit_model::{KitStructure, KitSummary, SelectionStore};
use networking::{
    BackendCommand, BackendReply, Bytes, FolderFile, HttpBackend, HttpClientBuilder, ImageSource,
    ItemLayerInfo, KitBackend, ResourceLoader, ThumbStats,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use render::ImageCache;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Handle to a render running in the background.
pub type RenderHandle = JoinHandle<RenderReport>;

/// State of one editing session.
///
/// Every selection change starts a new render in the background and
/// returns its handle. Overlapping renders are allowed; only the latest
/// one draws.
pub struct Session {
    config: CreatorConfig,
    backend: Arc<dyn KitBackend>,
    source: Arc<dyn ImageSource>,
    compositor: Arc<Compositor>,
    observers: Vec<Arc<dyn SessionObserver>>,
    kits: Vec<KitSummary>,
    kit: Option<String>,
    structure: Option<KitStructure>,
    store: SelectionStore,
    token: CacheToken,
    rng: StdRng,
}

impl Session {
    /// Create a new session over a backend and an image source.
    pub fn new(config: CreatorConfig, backend: Arc<dyn KitBackend>, source: Arc<dyn ImageSource>) -> Self {
        let compositor = Arc::new(Compositor::new(config.render_size(config.default_canvas)));
        Self {
            config,
            backend,
            source,
            compositor,
            observers: Vec::new(),
            kits: Vec::new(),
            kit: None,
            structure: None,
            store: SelectionStore::new(),
            token: CacheToken::now(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a session talking to the configured kit server.
    pub fn connect(config: CreatorConfig) -> KitResult<Self> {
        let client = HttpClientBuilder::new(config.server_url.clone())
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| KitError::backend(e.to_string()))?;
        let client = Arc::new(client);
        let backend = Arc::new(HttpBackend::new(client.clone()));
        let cache = Arc::new(ImageCache::new(config.cache_size));
        let loader = Arc::new(ResourceLoader::new(client, cache));
        Ok(Self::new(config, backend, loader))
    }

    /// Use a seeded random source for randomize.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &CreatorConfig {
        &self.config
    }

    pub fn kits(&self) -> &[KitSummary] {
        &self.kits
    }

    /// Folder of the current kit.
    pub fn kit(&self) -> Option<&str> {
        self.kit.as_deref()
    }

    pub fn structure(&self) -> Option<&KitStructure> {
        self.structure.as_ref()
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn token(&self) -> CacheToken {
        self.token
    }

    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    /// Locator for the current kit's images.
    pub fn locator(&self) -> Option<ImageLocator> {
        self.kit
            .as_ref()
            .map(|kit| ImageLocator::new(self.config.kit_base.clone(), kit.clone(), self.token))
    }

    fn loaded(&self) -> KitResult<&KitStructure> {
        self.structure
            .as_ref()
            .ok_or_else(|| KitError::state("no kit structure loaded"))
    }

    /// Fetch the kit list. When no kit is open the first one is opened.
    pub async fn refresh_kits(&mut self) -> KitResult<Option<RenderHandle>> {
        let kits = self.backend.list_kits().await.map_err(|e| {
            error!("Listing kits failed: {}", e);
            KitError::from(e)
        })?;
        info!("Found {} kits", kits.len());
        self.kits = kits;

        if self.kit.is_some() {
            return Ok(None);
        }
        match self.kits.first().map(|k| k.folder.clone()) {
            Some(first) => self.switch_kit(&first).await.map(Some),
            None => Ok(None),
        }
    }

    /// Open another kit, dropping every selection.
    pub async fn switch_kit(&mut self, kit: &str) -> KitResult<RenderHandle> {
        let previous = self.kit.replace(kit.to_string());
        match self.load_structure(false).await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.kit = previous;
                Err(err)
            }
        }
    }

    /// Reload the current kit's structure.
    ///
    /// With `preserve`, selections are carried over onto the new structure;
    /// otherwise they are dropped. Parts left without a selection get their
    /// default layer. The cache token is bumped so edited images are
    /// fetched again. On failure the session keeps its previous state.
    pub async fn load_structure(&mut self, preserve: bool) -> KitResult<RenderHandle> {
        let kit = self
            .kit
            .clone()
            .ok_or_else(|| KitError::state("no kit selected"))?;
        let structure = self.backend.kit_structure(&kit).await.map_err(|e| {
            error!(kit = %kit, "Loading structure failed: {}", e);
            KitError::from(e)
        })?;
        info!(kit = %kit, parts = structure.len(), preserve, "Structure loaded");

        if preserve {
            self.store.rebase(&structure);
        } else {
            self.store.clear();
        }
        self.store.populate_defaults(&structure);
        self.token = self.token.bump();
        self.compositor.resize(self.config.render_size(structure.canvas));

        if !structure.advisories.is_empty() {
            for line in structure.advisories.warnings() {
                warn!(kit = %kit, "{}", line);
            }
            for observer in &self.observers {
                observer.on_advisories(&structure.advisories);
            }
        }
        self.structure = Some(structure);
        self.selection_changed()
    }

    /// Equip an item in the color at `variant_index` of a part.
    pub fn select(&mut self, part_index: usize, item_number: u32, variant_index: usize) -> KitResult<RenderHandle> {
        let structure = self
            .structure
            .as_ref()
            .ok_or_else(|| KitError::state("no kit structure loaded"))?;
        let variant = structure
            .part(part_index)
            .ok_or(KitError::InvalidPart(part_index))?
            .variant(variant_index)
            .ok_or_else(|| {
                KitError::selection(format!("part {part_index} has no color {variant_index}"))
            })?;
        self.store
            .select(structure, part_index, item_number, variant, variant_index)?;
        self.selection_changed()
    }

    /// Equip an item, keeping the part's current color when it has one.
    pub fn select_item(&mut self, part_index: usize, item_number: u32) -> KitResult<RenderHandle> {
        let variant_index = self.store.get(part_index).map_or(0, |s| s.variant_index);
        self.select(part_index, item_number, variant_index)
    }

    /// Switch a part to another color, keeping its item.
    pub fn select_color(&mut self, part_index: usize, variant_index: usize) -> KitResult<RenderHandle> {
        let item_number = self.store.get(part_index).map_or(1, |s| s.item_number);
        self.select(part_index, item_number, variant_index)
    }

    /// Unequip a part.
    pub fn deselect(&mut self, part_index: usize) -> KitResult<RenderHandle> {
        self.store.deselect(part_index);
        self.selection_changed()
    }

    /// Unequip every part.
    pub fn reset_all_layers(&mut self) -> KitResult<RenderHandle> {
        self.store.clear();
        self.selection_changed()
    }

    /// Pick a random look using the configured skip probability.
    pub fn randomize(&mut self) -> KitResult<RenderHandle> {
        let probability = self.config.skip_probability;
        self.randomize_with(probability)
    }

    pub fn randomize_with(&mut self, skip_probability: f64) -> KitResult<RenderHandle> {
        let structure = self
            .structure
            .as_ref()
            .ok_or_else(|| KitError::state("no kit structure loaded"))?;
        self.store.randomize(structure, skip_probability, &mut self.rng)?;
        self.selection_changed()
    }

    fn selection_changed(&self) -> KitResult<RenderHandle> {
        for observer in &self.observers {
            observer.on_selection_changed(&self.store);
        }
        self.spawn_render()
    }

    /// Start a render of the current selection in the background.
    pub fn spawn_render(&self) -> KitResult<RenderHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| KitError::internal(format!("no async runtime: {e}")))?;
        let layers = self.store.paint_order();
        let locator = self
            .locator()
            .unwrap_or_else(|| ImageLocator::new(self.config.kit_base.clone(), "", self.token));
        let compositor = self.compositor.clone();
        let source = self.source.clone();
        let observers = self.observers.clone();

        Ok(runtime.spawn(async move {
            let report = compositor.render(&layers, &locator, &*source).await;
            for observer in &observers {
                observer.on_render_complete(&report);
            }
            report
        }))
    }

    /// Render the current selection and wait for it.
    pub async fn render_now(&self) -> KitResult<RenderReport> {
        self.spawn_render()?
            .await
            .map_err(|e| KitError::internal(format!("render task failed: {e}")))
    }

    /// Open the merge tool on a part color folder.
    pub async fn open_merge(&self, part_index: usize, variant_index: usize) -> KitResult<MergeTool> {
        let structure = self.loaded()?;
        let part = structure
            .part(part_index)
            .ok_or(KitError::InvalidPart(part_index))?;
        let variant = part.variant(variant_index).ok_or_else(|| {
            KitError::selection(format!("part {} has no color {}", part.folder, variant_index))
        })?;
        let target = MergeTarget {
            kit: structure.kit.clone(),
            part_folder: part.folder.clone(),
            variant,
            canvas: structure.canvas,
        };

        let mut tool = MergeTool::new(self.backend.clone(), self.source.clone(), self.config.kit_base.clone());
        tool.open(target, self.token).await?;
        Ok(tool)
    }

    /// Commit a merge and reload the structure, keeping selections.
    pub async fn commit_merge(
        &mut self,
        tool: &mut MergeTool,
        destination: Option<&str>,
        bulk_apply: bool,
    ) -> KitResult<(BackendReply, RenderHandle)> {
        let reply = tool.commit(destination, bulk_apply).await?;
        let handle = self.load_structure(true).await?;
        Ok((reply, handle))
    }

    /// Run a file-system edit on the current kit.
    ///
    /// Edits that change parts, items or colors reload the structure,
    /// keeping selections.
    pub async fn execute(&mut self, command: BackendCommand) -> KitResult<(BackendReply, Option<RenderHandle>)> {
        let reply = self.backend.execute(&command).await.map_err(|e| {
            error!(endpoint = command.endpoint(), "Backend command failed: {}", e);
            KitError::from(e)
        })?;
        info!(endpoint = command.endpoint(), "{}", reply.message);
        if command.changes_structure() && self.kit.is_some() {
            let handle = self.load_structure(true).await?;
            return Ok((reply, Some(handle)));
        }
        Ok((reply, None))
    }

    /// Generate missing thumbnails across the current kit, then reload the
    /// structure keeping selections.
    pub async fn create_missing_thumbs(&mut self) -> KitResult<(ThumbStats, RenderHandle)> {
        let kit = self
            .kit
            .clone()
            .ok_or_else(|| KitError::state("no kit selected"))?;
        let stats = self.backend.create_missing_thumbs(&kit).await.map_err(|e| {
            error!(kit = %kit, "Thumbnail generation failed: {}", e);
            KitError::from(e)
        })?;
        for detail in &stats.details {
            info!(folder = %detail.folder, created = detail.created, "Thumbnails added");
        }
        let handle = self.load_structure(true).await?;
        Ok((stats, handle))
    }

    /// Remove every thumbnail of the current kit.
    pub async fn delete_all_thumbs(&mut self) -> KitResult<(BackendReply, Option<RenderHandle>)> {
        let kit = self
            .kit
            .clone()
            .ok_or_else(|| KitError::state("no kit selected"))?;
        self.execute(BackendCommand::DeleteAllThumbs { kit }).await
    }

    /// Zip archive of the current kit.
    pub async fn download_kit(&self) -> KitResult<Bytes> {
        let kit = self.kit().ok_or_else(|| KitError::state("no kit selected"))?;
        let archive = self.backend.download_kit(kit).await?;
        info!(kit, bytes = archive.len(), "Kit archive downloaded");
        Ok(archive)
    }

    /// Files in the color folder at `variant_index` of a part.
    pub async fn folder_files(&self, part_index: usize, variant_index: usize) -> KitResult<Vec<FolderFile>> {
        let structure = self.loaded()?;
        let part = structure
            .part(part_index)
            .ok_or(KitError::InvalidPart(part_index))?;
        let variant = part.variant(variant_index).ok_or_else(|| {
            KitError::selection(format!("part {} has no color {}", part.folder, variant_index))
        })?;
        Ok(self
            .backend
            .folder_files(&structure.kit, &part.folder, &variant)
            .await?)
    }

    /// Source layers an item of a part was built from.
    pub async fn item_layers(&self, part_index: usize, item_number: u32) -> KitResult<Vec<ItemLayerInfo>> {
        let structure = self.loaded()?;
        let part = structure
            .part(part_index)
            .ok_or(KitError::InvalidPart(part_index))?;
        Ok(self
            .backend
            .item_layers(&structure.kit, &part.folder, item_number)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CanvasSize, Color};
    use compositor::RenderOutcome;
    use kit_model::{Part, StructureAdvisories};
    use networking::{LibraryFile, MemoryBackend, MemoryImageSource};
    use parking_lot::Mutex;
    use render::ImageData;

    const CANVAS: CanvasSize = CanvasSize::new(4, 4);

    fn kit(parts: Vec<Part>) -> KitStructure {
        KitStructure::new("kit_1", parts, CANVAS)
    }

    fn parts() -> Vec<Part> {
        vec![
            Part::new("2-1", 2, 1, 3),
            Part::new("1-2", 1, 2, 5).with_colors(["FF0000", "00FF00"]),
            Part::new("4-3", 4, 3, 0),
        ]
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<MemoryImageSource>, Session) {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_kit(kit(parts()));
        let source = Arc::new(MemoryImageSource::new());
        let config = CreatorConfig::full_size().with_kit_base("downloads");
        let session = Session::new(config, backend.clone(), source.clone()).with_seed(3);
        (backend, source, session)
    }

    #[derive(Default)]
    struct Recorder {
        selections: Mutex<Vec<usize>>,
        renders: Mutex<Vec<RenderReport>>,
        advisories: Mutex<usize>,
    }

    impl SessionObserver for Recorder {
        fn on_selection_changed(&self, store: &SelectionStore) {
            self.selections.lock().push(store.len());
        }

        fn on_render_complete(&self, report: &RenderReport) {
            self.renders.lock().push(report.clone());
        }

        fn on_advisories(&self, _advisories: &StructureAdvisories) {
            *self.advisories.lock() += 1;
        }
    }

    #[tokio::test]
    async fn test_refresh_opens_first_kit_with_defaults() {
        let (_, _, mut session) = setup();
        let handle = session.refresh_kits().await.unwrap();
        assert!(handle.is_some());
        assert_eq!(session.kit(), Some("kit_1"));

        let store = session.store();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().item_number, 1);
        assert_eq!(store.get(1).unwrap().variant.as_str(), "FF0000");
        assert!(!store.contains(2));
    }

    #[tokio::test]
    async fn test_invalid_selection_leaves_store_unchanged() {
        let (_, _, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();
        let before: Vec<_> = session.store().paint_order();

        assert!(matches!(session.select(1, 6, 0), Err(KitError::InvalidSelection(_))));
        assert!(matches!(session.select(1, 0, 0), Err(KitError::InvalidSelection(_))));
        assert!(matches!(session.select(1, 2, 2), Err(KitError::InvalidSelection(_))));
        assert!(matches!(session.select(7, 1, 0), Err(KitError::InvalidPart(7))));
        assert_eq!(session.store().paint_order(), before);
    }

    #[tokio::test]
    async fn test_render_after_selection() {
        let (_, source, mut session) = setup();
        source.insert("downloads/kit_1/2-1/2.png", ImageData::filled(4, 4, Color::BLUE));
        source.insert("downloads/kit_1/1-2/00FF00/1.png", ImageData::filled(4, 4, Color::GREEN));
        session.switch_kit("kit_1").await.unwrap();

        session.select_color(1, 1).unwrap();
        let report = session.select_item(0, 2).unwrap().await.unwrap();
        assert_eq!(
            report.outcome,
            RenderOutcome::Drawn {
                layers: 2,
                failed: vec![]
            }
        );
        assert_eq!(session.compositor().snapshot().get_pixel(0, 0), Color::BLUE);
        assert_eq!(session.store().get(1).unwrap().item_number, 1);
    }

    #[tokio::test]
    async fn test_preserving_reload_follows_rename() {
        let (backend, source, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();
        session.select(0, 3, 0).unwrap();
        let old_token = session.token();

        let mut renamed = parts();
        renamed[0] = Part::new("3-1", 3, 1, 3);
        backend.insert_kit(kit(renamed));

        session.load_structure(true).await.unwrap().await.unwrap();
        let entry = session.store().get(0).unwrap();
        assert_eq!(entry.part_folder, "3-1");
        assert_eq!(entry.item_number, 3);
        assert_eq!(entry.sort_key, 3000);
        assert!(session.token() > old_token);

        let requested = source.requests();
        let last = requested.iter().rev().find(|r| r.contains("/3.png")).unwrap();
        assert!(last.starts_with("downloads/kit_1/3-1/3.png?v="));
    }

    #[tokio::test]
    async fn test_plain_reload_resets_selection() {
        let (_, _, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();
        session.select(0, 3, 0).unwrap();
        session.load_structure(false).await.unwrap();
        assert_eq!(session.store().get(0).unwrap().item_number, 1);
    }

    #[tokio::test]
    async fn test_randomize_bounds() {
        let (_, _, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();

        session.randomize_with(1.0).unwrap();
        assert!(session.store().is_empty());

        session.randomize_with(0.0).unwrap();
        assert_eq!(session.store().len(), 2);

        assert!(session.randomize_with(-0.5).is_err());
    }

    #[tokio::test]
    async fn test_reset_all_layers_blanks_canvas() {
        let (_, source, mut session) = setup();
        source.insert("downloads/kit_1/2-1/1.png", ImageData::filled(4, 4, Color::RED));
        session.switch_kit("kit_1").await.unwrap().await.unwrap();
        assert!(!session.compositor().with_surface(|s| s.is_blank()));

        session.reset_all_layers().unwrap().await.unwrap();
        assert!(session.store().is_empty());
        assert!(session.compositor().with_surface(|s| s.is_blank()));
    }

    #[tokio::test]
    async fn test_observers_notified() {
        let (backend, _, mut session) = setup();
        let mut dup = parts();
        dup.push(Part::new("2-4", 2, 4, 1));
        backend.insert_kit(kit(dup));

        let recorder = Arc::new(Recorder::default());
        session.add_observer(recorder.clone());
        session.switch_kit("kit_1").await.unwrap().await.unwrap();
        session.deselect(0).unwrap().await.unwrap();

        assert_eq!(*recorder.selections.lock(), vec![3, 2]);
        assert_eq!(recorder.renders.lock().len(), 2);
        assert_eq!(*recorder.advisories.lock(), 1);
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_kit() {
        let (_, _, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();
        assert!(matches!(session.switch_kit("missing").await, Err(KitError::Backend(_))));
        assert_eq!(session.kit(), Some("kit_1"));
        assert_eq!(session.store().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_merge_reloads() {
        let (backend, source, mut session) = setup();
        backend.insert_library(
            "kit_1",
            "2-1",
            &kit_model::ColorVariant::Default,
            vec![LibraryFile::new("a.png"), LibraryFile::new("b.png")],
        );
        source.insert("downloads/kit_1/2-1/a.png", ImageData::filled(4, 4, Color::RED));
        session.switch_kit("kit_1").await.unwrap();
        session.select(0, 2, 0).unwrap();
        let token = session.token();

        let mut tool = session.open_merge(0, 0).await.unwrap();
        tool.add_to_stack("a.png").await.unwrap();
        tool.add_to_stack("b.png").await.unwrap();
        let (reply, _) = session.commit_merge(&mut tool, Some("4"), false).await.unwrap();

        assert!(reply.success);
        assert_eq!(backend.merges()[0].destination_name, "4");
        assert_eq!(session.store().get(0).unwrap().item_number, 2);
        assert!(session.token() > token);
    }

    #[tokio::test]
    async fn test_execute_reloads_only_on_structure_change() {
        let (backend, _, mut session) = setup();
        session.switch_kit("kit_1").await.unwrap();

        let thumb = BackendCommand::CreateThumbnail {
            kit: "kit_1".into(),
            folder: "2-1".into(),
            color: kit_model::ColorVariant::Default,
            source_file: "1.png".into(),
            target_file: "thumb_1.png".into(),
        };
        let (_, handle) = session.execute(thumb).await.unwrap();
        assert!(handle.is_none());

        let rename = BackendCommand::RenameColorFolder {
            kit: "kit_1".into(),
            part_folder: "1-2".into(),
            old_color: "FF0000".into(),
            new_color: "0000FF".into(),
        };
        let (_, handle) = session.execute(rename).await.unwrap();
        assert!(handle.is_some());
        assert_eq!(backend.commands().len(), 2);

        backend.set_rejection(Some("exists"));
        let delete = BackendCommand::DeletePart { kit: "kit_1".into(), y: 2 };
        assert!(matches!(session.execute(delete).await, Err(KitError::Backend(_))));
    }

    #[tokio::test]
    async fn test_thumb_passes_reload_keeping_selection() {
        let (backend, _, mut session) = setup();
        assert!(matches!(session.create_missing_thumbs().await, Err(KitError::InvalidState(_))));

        backend.insert_thumb_stats(
            "kit_1",
            ThumbStats {
                total_folders: 3,
                total_images: 8,
                created_thumbs: 2,
                skipped_thumbs: 6,
                details: vec![networking::ThumbFolderStats { folder: "2-1".into(), created: 2 }],
            },
        );
        session.switch_kit("kit_1").await.unwrap();
        session.select(0, 3, 0).unwrap();
        let token = session.token();

        let (stats, _) = session.create_missing_thumbs().await.unwrap();
        assert_eq!(stats.created_thumbs, 2);
        assert_eq!(stats.details[0].folder, "2-1");
        assert!(session.token() > token);
        assert_eq!(session.store().get(0).unwrap().item_number, 3);

        let token = session.token();
        let (_, handle) = session.delete_all_thumbs().await.unwrap();
        assert!(handle.is_some());
        assert!(session.token() > token);
        assert_eq!(session.store().get(0).unwrap().item_number, 3);
        assert_eq!(
            backend.commands(),
            vec![
                BackendCommand::AutoCreateThumbs { kit: "kit_1".into() },
                BackendCommand::DeleteAllThumbs { kit: "kit_1".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_kit_archive_and_folder_files() {
        let (backend, _, mut session) = setup();
        backend.insert_archive("kit_1", &b"PK\x03\x04zip"[..]);
        backend.insert_folder_files(
            "kit_1",
            "1-2",
            &kit_model::ColorVariant::named("00FF00"),
            vec![networking::FolderFile {
                name: "thumb_1.png".into(),
                url: "/downloads/kit_1/items_structured/1-2/thumb_1.png".into(),
                is_image: true,
                location: "Main".into(),
            }],
        );
        session.switch_kit("kit_1").await.unwrap();

        assert!(session.download_kit().await.unwrap().starts_with(b"PK"));
        let files = session.folder_files(1, 1).await.unwrap();
        assert_eq!(files[0].kind(), networking::FolderFileKind::Thumbnail(1));
        assert!(matches!(session.folder_files(1, 9).await, Err(KitError::InvalidSelection(_))));
        assert!(matches!(session.folder_files(7, 0).await, Err(KitError::InvalidPart(7))));
    }
}
