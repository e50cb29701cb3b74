//! Loaded-entry aggregation keyed by region and hemisphere.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{Region, Side};
use crate::mesh::MeshGeometry;
use crate::predictions::PredictionSeries;

/// Key identifying one displayed mesh: `{region_id}-{side}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    /// Key for a region and hemisphere.
    #[must_use]
    pub fn new(region_id: &str, side: Side) -> Self {
        Self(format!("{region_id}-{side}"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(&self.0)
    }
}

/// Aggregated assets for one region and hemisphere.
///
/// Created empty when a fetch cycle first touches the pair, then populated
/// as the mesh and prediction fetches resolve. The mesh is immutable and
/// survives prediction-type changes; the series map grows one entry per
/// fetched prediction type. The whole entry is discarded when the region
/// selection changes.
#[derive(Clone, Debug)]
pub struct LoadedEntry {
    /// The region this entry displays.
    pub region: &'static Region,
    /// Hemisphere of the mesh.
    pub side: Side,
    /// Parsed mesh geometry, once fetched.
    pub mesh: Option<Arc<MeshGeometry>>,
    /// Prediction series by prediction-type id.
    pub predictions: HashMap<String, PredictionSeries>,
}

impl LoadedEntry {
    /// New empty entry for a pair.
    #[must_use]
    pub fn new(region: &'static Region, side: Side) -> Self {
        Self {
            region,
            side,
            mesh: None,
            predictions: HashMap::new(),
        }
    }

    /// Key of this entry.
    #[must_use]
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.region.id, self.side)
    }

    /// Series for a prediction type, if fetched.
    #[must_use]
    pub fn series(&self, prediction_type: &str) -> Option<&PredictionSeries> {
        self.predictions.get(prediction_type)
    }

    /// Whether both the mesh and the series for the given type are present.
    #[must_use]
    pub fn is_ready(&self, prediction_type: &str) -> bool {
        self.mesh.is_some() && self.predictions.contains_key(prediction_type)
    }

    /// Display name including the hemisphere suffix for bilateral regions.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.region.display_name(self.side)
    }
}
