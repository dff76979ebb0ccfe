//! Main compositor implementation.

use crate::locator::ImageLocator;
use common::CanvasSize;
use kit_model::LayerSelection;
use networking::ImageSource;
use parking_lot::Mutex;
use render::{ImageData, Surface};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Draws the selected layers of a kit onto one canvas.
///
/// Renders may overlap. Each one is tagged with a sequence number when it
/// starts; once its loads settle it only draws if no newer render has
/// started, so the visible frame always belongs to the latest request.
pub struct Compositor {
    /// Sequence number of the most recently started render.
    sequence: AtomicU64,
    /// Target surface.
    surface: Mutex<Surface>,
}

/// What a render did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface was cleared and redrawn.
    Drawn {
        /// Layers drawn.
        layers: usize,
        /// Locators that failed to load and were skipped.
        failed: Vec<String>,
    },
    /// A newer render started before this one's loads settled.
    Superseded,
}

/// Result of one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub sequence: u64,
    pub outcome: RenderOutcome,
}

impl RenderReport {
    pub fn is_drawn(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Drawn { .. })
    }
}

impl Compositor {
    /// Create a new compositor.
    pub fn new(size: CanvasSize) -> Self {
        Self {
            sequence: AtomicU64::new(0),
            surface: Mutex::new(Surface::new(size)),
        }
    }

    /// Resize the target surface. The content is cleared.
    pub fn resize(&self, size: CanvasSize) {
        self.surface.lock().resize(size);
    }

    pub fn size(&self) -> CanvasSize {
        self.surface.lock().size()
    }

    /// Sequence number of the latest render started.
    pub fn latest_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Render layers given bottom first.
    ///
    /// All images are requested before any is awaited. A layer whose image
    /// fails to load is skipped. Every drawn layer is stretched to the full
    /// surface.
    pub async fn render<S>(
        &self,
        layers: &[(usize, LayerSelection)],
        locator: &ImageLocator,
        source: &S,
    ) -> RenderReport
    where
        S: ImageSource + ?Sized,
    {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let locators: Vec<String> = layers
            .iter()
            .map(|(_, selection)| locator.for_selection(selection))
            .collect();
        debug!(sequence, layers = locators.len(), "Render started");

        let results = networking::load_all(source, &locators).await;

        let mut failed = Vec::new();
        let images: Vec<std::sync::Arc<ImageData>> = results
            .into_iter()
            .zip(&locators)
            .filter_map(|(result, locator)| match result {
                Ok(image) => Some(image),
                Err(err) => {
                    warn!(%locator, "Layer image failed to load: {}", err);
                    failed.push(locator.clone());
                    None
                }
            })
            .collect();

        let mut surface = self.surface.lock();
        if self.sequence.load(Ordering::SeqCst) != sequence {
            debug!(sequence, "Render superseded");
            return RenderReport {
                sequence,
                outcome: RenderOutcome::Superseded,
            };
        }

        surface.clear();
        for image in &images {
            surface.draw_stretched(image);
        }
        info!(sequence, drawn = images.len(), failed = failed.len(), "Render complete");

        RenderReport {
            sequence,
            outcome: RenderOutcome::Drawn {
                layers: images.len(),
                failed,
            },
        }
    }

    /// Copy of the current frame.
    pub fn snapshot(&self) -> ImageData {
        self.surface.lock().snapshot()
    }

    /// Current frame as PNG bytes.
    pub fn encode_png(&self) -> common::KitResult<Vec<u8>> {
        self.surface.lock().encode_png()
    }

    /// Run `f` with the surface locked.
    pub fn with_surface<R>(&self, f: impl FnOnce(&Surface) -> R) -> R {
        f(&self.surface.lock())
    }
}
