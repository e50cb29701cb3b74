//! Scene aggregation: anatomical rotation, auto-centering, hover pick-through.

use std::collections::HashMap;

use nalgebra::Vector3;
use tracing::debug;

use quantatlas_core::{Aabb, EntryKey, LoadedEntry};

use crate::colorize::ColorizedGeometry;

/// Fixed rotation of the aggregate group about the x axis, in radians.
///
/// Exported meshes use the scanner coordinate convention; rotating -90°
/// about x presents them upright in view space.
pub const ANATOMICAL_ROTATION_X: f32 = -std::f32::consts::FRAC_PI_2;

/// Centering progress of the aggregate scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CenteringState {
    /// Bounds are incomplete or the selection changed; centering pending.
    Dirty,
    /// A centering attempt is in progress this frame.
    Attempting,
    /// The aggregate is centered on the origin.
    Centered,
}

/// Per-mesh hover information forwarded to the viewer controller.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverEvent {
    /// Display name of the hovered mesh, with hemisphere suffix.
    pub display_name: String,
    /// Mean prediction value of the mesh; `None` in anatomical mode.
    pub value: Option<f64>,
    /// Unit of the active prediction type; `None` in anatomical mode.
    pub unit: Option<String>,
}

/// Aggregates the loaded geometries and centers them as a group.
///
/// Geometries finish building asynchronously, so centering is attempted
/// lazily: callers invoke [`SceneComposer::tick`] once per render frame
/// and the composer re-centers only when bounds are registered for every
/// expected mesh. Changing the expected count (a new selection) resets
/// the translation and the collected bounds.
#[derive(Debug)]
pub struct SceneComposer {
    expected: usize,
    bounds: HashMap<EntryKey, Aabb>,
    state: CenteringState,
    translation: Vector3<f32>,
}

impl SceneComposer {
    /// Empty scene expecting no meshes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected: 0,
            bounds: HashMap::new(),
            state: CenteringState::Dirty,
            translation: Vector3::zeros(),
        }
    }

    /// Set the number of meshes the current selection will display.
    ///
    /// A changed count resets centering: bounds are cleared and the
    /// translation returns to the origin until the new set is complete.
    pub fn set_expected(&mut self, expected: usize) {
        if expected != self.expected {
            debug!(from = self.expected, to = expected, "expected mesh count changed");
            self.expected = expected;
            self.reset();
        }
    }

    /// Discard collected bounds and pending centering.
    pub fn reset(&mut self) {
        self.bounds.clear();
        self.state = CenteringState::Dirty;
        self.translation = Vector3::zeros();
    }

    /// Register the bounds of a finished geometry.
    pub fn register_bounds(&mut self, key: EntryKey, aabb: Aabb) {
        self.bounds.insert(key, aabb);
    }

    /// Attempt centering for this frame.
    ///
    /// One attempt is made per dirty cycle: if bounds are still missing
    /// the composer stays dirty and retries on the next tick; once all
    /// expected bounds are present the union box's center is negated into
    /// the group translation and the state becomes [`CenteringState::Centered`].
    pub fn tick(&mut self) -> CenteringState {
        if self.state == CenteringState::Centered {
            return self.state;
        }
        self.state = CenteringState::Attempting;

        if self.expected == 0 || self.bounds.len() != self.expected {
            self.state = CenteringState::Dirty;
            return self.state;
        }

        let mut boxes = self.bounds.values();
        // bounds is non-empty here: expected > 0 and counts match.
        let Some(first) = boxes.next() else {
            self.state = CenteringState::Dirty;
            return self.state;
        };
        let union = boxes.fold(*first, |acc, b| acc.union(b));
        let center = union.center();
        self.translation = -center.coords;
        self.state = CenteringState::Centered;
        debug!(?center, "scene centered");
        self.state
    }

    /// Current centering state.
    #[must_use]
    pub fn state(&self) -> CenteringState {
        self.state
    }

    /// Translation applied to the aggregate group.
    #[must_use]
    pub fn translation(&self) -> Vector3<f32> {
        self.translation
    }

    /// Number of geometries with registered bounds.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.bounds.len()
    }

    /// Hover event for a pointer entering a mesh.
    ///
    /// Pure pick-through: builds the event from the entry and its current
    /// geometry without touching composer state. `unit` is the active
    /// prediction type's unit, passed `None` in anatomical mode.
    #[must_use]
    pub fn pointer_enter(
        entry: &LoadedEntry,
        geometry: Option<&ColorizedGeometry>,
        unit: Option<&str>,
    ) -> HoverEvent {
        let value = geometry.and_then(|g| g.mean_value);
        HoverEvent {
            display_name: entry.display_name(),
            unit: value.and(unit.map(str::to_string)),
            value,
        }
    }
}

impl Default for SceneComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Origin marker shown at the center of rotation.
///
/// Describes a small sphere on the origin and three axis-aligned bars;
/// the render layer instantiates it when the controller's center-marker
/// toggle is on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenterMarker {
    /// Radius of the origin sphere.
    pub sphere_radius: f32,
    /// Half-length of each axis bar.
    pub axis_half_length: f32,
    /// Bar thickness.
    pub axis_thickness: f32,
}

impl Default for CenterMarker {
    fn default() -> Self {
        Self {
            sphere_radius: 0.1,
            axis_half_length: 3.0,
            axis_thickness: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quantatlas_core::catalog::{RegionCatalog, Side};
    use quantatlas_core::{MeshGeometry, PredictionSeries, PredictionValues};

    fn aabb(min: [f32; 3], max: [f32; 3]) -> Aabb {
        Aabb::from_points([min, max]).unwrap()
    }

    #[test]
    fn test_waits_for_expected_count() {
        let mut scene = SceneComposer::new();
        scene.set_expected(2);
        scene.register_bounds(EntryKey::new("STN", Side::L), aabb([0.0; 3], [1.0; 3]));

        // One of two bounds registered: stays dirty, retries next frame.
        assert_eq!(scene.tick(), CenteringState::Dirty);

        scene.register_bounds(EntryKey::new("STN", Side::R), aabb([1.0; 3], [3.0; 3]));
        assert_eq!(scene.tick(), CenteringState::Centered);

        // Union spans [0,3] on every axis; center 1.5 negated.
        assert_eq!(scene.translation(), Vector3::new(-1.5, -1.5, -1.5));
    }

    #[test]
    fn test_centered_is_stable() {
        let mut scene = SceneComposer::new();
        scene.set_expected(1);
        scene.register_bounds(EntryKey::new("STN", Side::L), aabb([0.0; 3], [2.0; 3]));
        assert_eq!(scene.tick(), CenteringState::Centered);
        let t = scene.translation();
        assert_eq!(scene.tick(), CenteringState::Centered);
        assert_eq!(scene.translation(), t);
    }

    #[test]
    fn test_expected_change_resets() {
        let mut scene = SceneComposer::new();
        scene.set_expected(1);
        scene.register_bounds(EntryKey::new("STN", Side::L), aabb([2.0; 3], [4.0; 3]));
        assert_eq!(scene.tick(), CenteringState::Centered);

        // Selection changed before the new set finished loading.
        scene.set_expected(2);
        assert_eq!(scene.state(), CenteringState::Dirty);
        assert_eq!(scene.translation(), Vector3::zeros());
        assert_eq!(scene.registered(), 0);

        scene.register_bounds(EntryKey::new("RN", Side::L), aabb([0.0; 3], [1.0; 3]));
        scene.register_bounds(EntryKey::new("RN", Side::R), aabb([1.0; 3], [2.0; 3]));
        assert_eq!(scene.tick(), CenteringState::Centered);
    }

    #[test]
    fn test_empty_expectation_never_centers() {
        let mut scene = SceneComposer::new();
        assert_eq!(scene.tick(), CenteringState::Dirty);
    }

    #[test]
    fn test_hover_event() {
        let catalog = RegionCatalog::standard();
        let region = catalog.get("STN").unwrap();
        let mut entry = LoadedEntry::new(region, Side::L);
        entry.mesh = Some(Arc::new(MeshGeometry {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
        }));
        entry.predictions.insert(
            "iron_median".to_string(),
            PredictionSeries::from_entries([(30, PredictionValues::Scalar(4.2))]),
        );

        let scale = quantatlas_core::ColorScale::new(0.0, 10.0);
        let geometry = crate::colorize::colorize(
            &entry,
            "iron_median",
            30,
            &scale,
            crate::colorize::ColorMode::default(),
        )
        .unwrap();

        let event = SceneComposer::pointer_enter(&entry, Some(&geometry), Some("μg/g"));
        assert_eq!(event.display_name, "Subthalamic Nucleus (L)");
        assert_eq!(event.value, Some(4.2));
        assert_eq!(event.unit.as_deref(), Some("μg/g"));
    }

    #[test]
    fn test_hover_event_anatomical() {
        let catalog = RegionCatalog::standard();
        let region = catalog.get("fx").unwrap();
        let entry = LoadedEntry::new(region, Side::L);

        // No geometry yet: name forwards, value and unit stay empty.
        let event = SceneComposer::pointer_enter(&entry, None, Some("μg/g"));
        assert_eq!(event.display_name, "Fornix");
        assert_eq!(event.value, None);
        assert_eq!(event.unit, None);
    }
}
