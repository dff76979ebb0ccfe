//! Session observers.

use compositor::RenderReport;
use kit_model::{SelectionStore, StructureAdvisories};

/// Receives session events. Every method defaults to doing nothing.
///
/// Render completions are delivered from the task that ran the render.
pub trait SessionObserver: Send + Sync {
    /// The layer selection changed.
    fn on_selection_changed(&self, _store: &SelectionStore) {}

    /// A render finished, drawn or superseded.
    fn on_render_complete(&self, _report: &RenderReport) {}

    /// A freshly loaded structure has coordinate anomalies.
    fn on_advisories(&self, _advisories: &StructureAdvisories) {}
}
