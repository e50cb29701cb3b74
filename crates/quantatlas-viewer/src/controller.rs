//! Viewer orchestration: selection state, progressive loading, tooltip.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use quantatlas_core::catalog::{AtlasCatalog, AGE_MAX, AGE_MIN};
use quantatlas_core::{ColorScale, EntryKey, LoadedEntry};

use crate::colorize::{colorize, ColorMode, ColorizedGeometry};
use crate::fetch::{resolve_fetch_list, AssetFetcher, BatchResult, FetchPair};
use crate::scale::compute_color_scale;
use crate::scene::{HoverEvent, SceneComposer};

/// User-facing viewer state.
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Selected age in years, within the prediction range.
    pub age: u8,
    /// Active prediction-type identifier.
    pub prediction_type: String,
    /// Selected region identifiers.
    pub selected_regions: Vec<String>,
    /// Whether bilateral structures display both hemispheres.
    pub bilateral_enabled: bool,
    /// Whether the center-of-rotation marker is shown.
    pub center_marker_enabled: bool,
    /// Active coloring mode.
    pub color_mode: ColorMode,
}

impl ViewerState {
    /// Initial state: every region selected, bilateral display on,
    /// iron median at age 30.
    #[must_use]
    pub fn initial(catalog: &AtlasCatalog) -> Self {
        Self {
            age: 30,
            prediction_type: "iron_median".to_string(),
            selected_regions: catalog.regions().ids().map(str::to_string).collect(),
            bilateral_enabled: true,
            center_marker_enabled: true,
            color_mode: ColorMode::default(),
        }
    }
}

/// Drives the loading pipeline in response to state changes and holds the
/// merged entry map.
///
/// The entry map is mutated in exactly two places: the batch reducer
/// ([`Self::apply_batch`]) and the selection-change handler; colorization
/// and scene composition read it immutably each render pass. Load cycles
/// are stamped with a generation; any state change that invalidates
/// in-flight work bumps the generation, and the reducer silently discards
/// batches from stale cycles.
pub struct ViewerController {
    catalog: Arc<AtlasCatalog>,
    state: ViewerState,
    entries: HashMap<EntryKey, LoadedEntry>,
    color_scale: ColorScale,
    progress: u8,
    failed_pairs: usize,
    generation: u64,
    hovered: Option<HoverEvent>,
    scene: SceneComposer,
}

impl ViewerController {
    /// Controller over the given catalog, in the initial state.
    #[must_use]
    pub fn new(catalog: Arc<AtlasCatalog>) -> Self {
        let state = ViewerState::initial(&catalog);
        let mut scene = SceneComposer::new();
        scene.set_expected(resolve_fetch_list(&catalog, &state.selected_regions, state.bilateral_enabled).len());
        Self {
            catalog,
            state,
            entries: HashMap::new(),
            color_scale: ColorScale::unresolved(),
            progress: 0,
            failed_pairs: 0,
            generation: 0,
            hovered: None,
            scene,
        }
    }

    /// Current viewer state.
    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// The catalog this controller was built with.
    #[must_use]
    pub fn catalog(&self) -> &AtlasCatalog {
        &self.catalog
    }

    /// Loaded entries keyed by `{region_id}-{side}`.
    #[must_use]
    pub fn entries(&self) -> &HashMap<EntryKey, LoadedEntry> {
        &self.entries
    }

    /// Entries ready for display under the active prediction type,
    /// in no particular order.
    pub fn ready_entries(&self) -> impl Iterator<Item = &LoadedEntry> {
        self.entries
            .values()
            .filter(|e| e.is_ready(&self.state.prediction_type))
    }

    /// Shared color scale for the current age and prediction type.
    #[must_use]
    pub fn color_scale(&self) -> ColorScale {
        self.color_scale
    }

    /// Load progress percentage of the current cycle.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Pairs that failed during the current cycle, for the error banner.
    #[must_use]
    pub fn failed_pairs(&self) -> usize {
        self.failed_pairs
    }

    /// Whether a load cycle is underway.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.progress > 0 && self.progress < 100
    }

    /// Current load-cycle generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Tooltip state, set from hover events.
    #[must_use]
    pub fn hovered(&self) -> Option<&HoverEvent> {
        self.hovered.as_ref()
    }

    /// The scene composer.
    #[must_use]
    pub fn scene(&self) -> &SceneComposer {
        &self.scene
    }

    /// Mutable scene composer, for the per-frame centering tick.
    pub fn scene_mut(&mut self) -> &mut SceneComposer {
        &mut self.scene
    }

    /// Pairs the current selection requires.
    #[must_use]
    pub fn fetch_list(&self) -> Vec<FetchPair> {
        resolve_fetch_list(
            &self.catalog,
            &self.state.selected_regions,
            self.state.bilateral_enabled,
        )
    }

    /// Select the displayed age. Never touches the network: the new age
    /// only changes which series key is read, so the color scale is
    /// recomputed and callers re-colorize.
    pub fn set_age(&mut self, age: u8) {
        let age = age.clamp(AGE_MIN, AGE_MAX);
        if age != self.state.age {
            self.state.age = age;
            self.recompute_scale();
        }
    }

    /// Switch the active prediction type.
    ///
    /// Keeps every loaded entry (mesh geometry is reusable); the next
    /// [`Self::reload`] fetches only the missing prediction series.
    pub fn set_prediction_type(&mut self, id: &str) {
        if self.catalog.predictions().get(id).is_none() {
            warn!(id, "unknown prediction type ignored");
            return;
        }
        if id != self.state.prediction_type {
            self.state.prediction_type = id.to_string();
            self.invalidate();
            self.recompute_scale();
        }
    }

    /// Replace the region selection.
    ///
    /// Entries outside the new selection are discarded, progress restarts
    /// from zero, and the scene re-centers once the new set has loaded.
    pub fn set_selected_regions(&mut self, ids: Vec<String>) {
        if ids != self.state.selected_regions {
            self.state.selected_regions = ids;
            self.apply_selection_change();
        }
    }

    /// Toggle bilateral display; treated as a selection change.
    pub fn set_bilateral(&mut self, enabled: bool) {
        if enabled != self.state.bilateral_enabled {
            self.state.bilateral_enabled = enabled;
            self.apply_selection_change();
        }
    }

    /// Toggle the center-of-rotation marker.
    pub fn set_center_marker(&mut self, enabled: bool) {
        self.state.center_marker_enabled = enabled;
    }

    /// Switch between heatmap and anatomical coloring.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.state.color_mode = mode;
    }

    fn apply_selection_change(&mut self) {
        let keys: Vec<EntryKey> = self.fetch_list().into_iter().map(|p| p.key).collect();
        self.entries.retain(|key, _| keys.contains(key));
        self.scene.set_expected(keys.len());
        self.hovered = None;
        self.invalidate();
        self.recompute_scale();
    }

    /// Invalidate in-flight work and restart progress accounting.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.progress = 0;
        self.failed_pairs = 0;
    }

    /// Run a full progressive load cycle for the current state.
    ///
    /// Batches apply as they complete; if a state change invalidates the
    /// cycle between batches the loop stops and the session is dropped,
    /// discarding whatever was still in flight.
    pub async fn reload(&mut self, fetcher: &mut AssetFetcher) {
        let generation = self.generation;
        let pairs = self.fetch_list();
        self.scene.set_expected(pairs.len());

        if pairs.is_empty() {
            // Nothing to load; the viewer renders an empty scene.
            self.progress = 100;
            self.recompute_scale();
            return;
        }

        self.progress = 0;
        info!(pairs = pairs.len(), prediction_type = %self.state.prediction_type, "loading");

        let mut session = fetcher.begin(pairs, &self.state.prediction_type, generation);
        while let Some(batch) = session.next_batch().await {
            if !self.apply_batch(batch) {
                break;
            }
        }
    }

    /// Reducer folding one batch into the controller state.
    ///
    /// Returns `false` when the batch belongs to a superseded cycle, in
    /// which case nothing is merged. Mesh geometry is set once per entry
    /// and never overwritten; prediction series are inserted per type.
    pub fn apply_batch(&mut self, batch: BatchResult) -> bool {
        if batch.generation != self.generation {
            debug!(
                batch = batch.generation,
                current = self.generation,
                "discarding stale batch"
            );
            return false;
        }

        for payload in batch.loaded {
            let entry = self
                .entries
                .entry(payload.key.clone())
                .or_insert_with(|| LoadedEntry::new(payload.region, payload.side));
            if entry.mesh.is_none() {
                entry.mesh = Some(payload.mesh);
            }
            entry
                .predictions
                .insert(batch.prediction_type.clone(), payload.series);
            if let Some(aabb) = entry.mesh.as_ref().and_then(|m| m.aabb()) {
                self.scene.register_bounds(payload.key, aabb);
            }
        }

        self.failed_pairs += batch.failed;
        self.progress = batch.progress;
        self.recompute_scale();
        true
    }

    /// Build the colorized geometry for one entry under the current state.
    #[must_use]
    pub fn colorized(&self, key: &EntryKey) -> Option<ColorizedGeometry> {
        let entry = self.entries.get(key)?;
        colorize(
            entry,
            &self.state.prediction_type,
            self.state.age,
            &self.color_scale,
            self.state.color_mode,
        )
    }

    /// Set tooltip state for a hovered mesh.
    pub fn hover_entry(&mut self, key: &EntryKey) {
        let Some(entry) = self.entries.get(key) else {
            return;
        };
        let event = match self.state.color_mode {
            ColorMode::Heatmap(_) => {
                let value = entry
                    .series(&self.state.prediction_type)
                    .and_then(|s| s.resolve(self.state.age))
                    .and_then(|v| v.mean());
                let unit = self
                    .catalog
                    .predictions()
                    .get(&self.state.prediction_type)
                    .map(|p| p.unit.to_string());
                HoverEvent {
                    display_name: entry.display_name(),
                    unit: value.and(unit),
                    value,
                }
            }
            ColorMode::Anatomical => HoverEvent {
                display_name: entry.display_name(),
                value: None,
                unit: None,
            },
        };
        self.hovered = Some(event);
    }

    /// Forward a hover event from the scene layer.
    pub fn apply_hover(&mut self, event: HoverEvent) {
        self.hovered = Some(event);
    }

    /// Clear tooltip state on hover end.
    pub fn hover_end(&mut self) {
        self.hovered = None;
    }

    fn recompute_scale(&mut self) {
        self.color_scale = compute_color_scale(
            self.entries.values(),
            &self.state.prediction_type,
            self.state.age,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fetch::tests::MockSource;
    use crate::scene::CenteringState;
    use crate::source::AssetSource;

    fn setup() -> (ViewerController, AssetFetcher, Arc<MockSource>) {
        let catalog = Arc::new(AtlasCatalog::standard());
        let source = Arc::new(MockSource::new());
        let fetcher = AssetFetcher::new(
            Arc::clone(&source) as Arc<dyn AssetSource>,
            Arc::clone(&catalog),
        );
        (ViewerController::new(catalog), fetcher, source)
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_initial_state() {
        let (controller, _, _) = setup();
        let state = controller.state();
        assert_eq!(state.age, 30);
        assert_eq!(state.prediction_type, "iron_median");
        assert_eq!(state.selected_regions.len(), 17);
        assert!(state.bilateral_enabled);
        assert!(!controller.is_loading());
        assert!(!controller.color_scale().is_resolved());
    }

    #[tokio::test]
    async fn test_full_load_cycle() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(ids(&["STN", "fx"]));
        controller.reload(&mut fetcher).await;

        // STN-L, STN-R, fx-L
        assert_eq!(controller.entries().len(), 3);
        assert_eq!(controller.progress(), 100);
        assert!(!controller.is_loading());
        assert!(controller.color_scale().is_resolved());
        assert_eq!(controller.ready_entries().count(), 3);

        // All bounds registered: one tick centers the scene.
        assert_eq!(controller.scene_mut().tick(), CenteringState::Centered);
    }

    #[tokio::test]
    async fn test_selection_change_resets_progress_and_entries() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(ids(&["STN", "RN"]));
        controller.reload(&mut fetcher).await;
        assert_eq!(controller.entries().len(), 4);
        assert_eq!(controller.progress(), 100);

        controller.set_selected_regions(ids(&["STN"]));
        assert_eq!(controller.progress(), 0);
        // Stale RN entries dropped immediately.
        assert_eq!(controller.entries().len(), 2);
        assert!(controller
            .entries()
            .keys()
            .all(|k| k.as_str().starts_with("STN")));
    }

    #[tokio::test]
    async fn test_prediction_switch_reuses_geometry() {
        let (mut controller, mut fetcher, source) = setup();
        controller.set_selected_regions(ids(&["STN"]));
        controller.reload(&mut fetcher).await;

        controller.set_prediction_type("qsm_median");
        assert_eq!(controller.progress(), 0);
        // Entries survive the switch; only the series is missing.
        assert_eq!(controller.entries().len(), 2);
        assert_eq!(controller.ready_entries().count(), 0);

        controller.reload(&mut fetcher).await;
        assert_eq!(controller.ready_entries().count(), 2);

        // Exactly one mesh request per pair across both cycles.
        assert_eq!(source.mesh_fetches("exported_meshes/STN-L_mesh.json"), 1);
        assert_eq!(source.mesh_fetches("exported_meshes/STN-R_mesh.json"), 1);

        // Both series retained on the entry.
        let key = EntryKey::new("STN", quantatlas_core::Side::L);
        let entry = controller.entries().get(&key).unwrap();
        assert!(entry.series("iron_median").is_some());
        assert!(entry.series("qsm_median").is_some());
    }

    #[tokio::test]
    async fn test_age_change_is_offline() {
        let (mut controller, mut fetcher, source) = setup();
        controller.set_selected_regions(ids(&["STN"]));
        controller.reload(&mut fetcher).await;
        let generation = controller.generation();
        let requests = source.pred_calls.lock().unwrap().len();

        controller.set_age(40);
        // Mock series doubles values from age 30 to 40.
        assert_eq!(controller.color_scale().max, Some(8.0));
        assert_eq!(controller.generation(), generation);
        assert_eq!(source.pred_calls.lock().unwrap().len(), requests);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_age_clamped_to_range() {
        let (mut controller, _, _) = setup();
        controller.set_age(5);
        assert_eq!(controller.state().age, AGE_MIN);
        controller.set_age(200);
        assert_eq!(controller.state().age, AGE_MAX);
    }

    #[tokio::test]
    async fn test_stale_batch_discarded() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(ids(&["STN"]));

        let generation = controller.generation();
        let pairs = controller.fetch_list();
        let mut session = fetcher.begin(pairs, "iron_median", generation);
        let batch = session.next_batch().await.unwrap();
        drop(session);

        // The selection changed again before the batch applied.
        controller.set_selected_regions(ids(&["RN"]));
        assert!(!controller.apply_batch(batch));
        assert!(controller.entries().is_empty());
        assert_eq!(controller.progress(), 0);
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(Vec::new());
        controller.reload(&mut fetcher).await;

        assert!(controller.entries().is_empty());
        assert_eq!(controller.progress(), 100);
        assert!(!controller.is_loading());
        assert!(!controller.color_scale().is_resolved());
    }

    #[tokio::test]
    async fn test_failed_pairs_surface_as_count() {
        let catalog = Arc::new(AtlasCatalog::standard());
        let source = Arc::new(MockSource::failing(&["exported_meshes/STN-R_mesh.json"]));
        let mut fetcher = AssetFetcher::new(
            Arc::clone(&source) as Arc<dyn AssetSource>,
            Arc::clone(&catalog),
        );
        let mut controller = ViewerController::new(catalog);
        controller.set_selected_regions(ids(&["STN"]));
        controller.reload(&mut fetcher).await;

        assert_eq!(controller.failed_pairs(), 1);
        // The surviving hemisphere still renders.
        assert_eq!(controller.ready_entries().count(), 1);
        assert!(controller.color_scale().is_resolved());
    }

    #[tokio::test]
    async fn test_hover_tooltip() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(ids(&["STN"]));
        controller.reload(&mut fetcher).await;

        let key = EntryKey::new("STN", quantatlas_core::Side::L);
        controller.hover_entry(&key);
        let hovered = controller.hovered().unwrap();
        assert_eq!(hovered.display_name, "Subthalamic Nucleus (L)");
        // Mock series at age 30: mean of [1,2,3,4].
        assert_eq!(hovered.value, Some(2.5));
        assert_eq!(hovered.unit.as_deref(), Some("μg/g"));

        controller.hover_end();
        assert!(controller.hovered().is_none());

        // Tooltip does not persist across selection changes.
        controller.hover_entry(&key);
        controller.set_selected_regions(ids(&["RN"]));
        assert!(controller.hovered().is_none());
    }

    #[tokio::test]
    async fn test_colorized_under_current_state() {
        let (mut controller, mut fetcher, _) = setup();
        controller.set_selected_regions(ids(&["STN"]));
        controller.reload(&mut fetcher).await;

        let key = EntryKey::new("STN", quantatlas_core::Side::L);
        let geometry = controller.colorized(&key).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.mean_value, Some(2.5));

        controller.set_color_mode(ColorMode::Anatomical);
        let flat = controller.colorized(&key).unwrap();
        assert_eq!(flat.mean_value, None);
    }

    #[test]
    fn test_unknown_prediction_type_ignored() {
        let (mut controller, _, _) = setup();
        let generation = controller.generation();
        controller.set_prediction_type("bogus");
        assert_eq!(controller.state().prediction_type, "iron_median");
        assert_eq!(controller.generation(), generation);
    }
}
