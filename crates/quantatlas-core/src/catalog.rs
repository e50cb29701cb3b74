//! Region and prediction-type registries.
//!
//! The atlas ships a fixed set of subcortical structures and quantitative
//! MRI prediction types. Both registries are immutable for the process
//! lifetime: [`AtlasCatalog::standard`] is constructed once at startup and
//! passed by reference (or `Arc`) to every component that needs it.

use serde::{Deserialize, Serialize};

/// Valid age range of the prediction data, in years.
pub const AGE_MIN: u8 = 19;
/// Upper bound of the prediction age range, in years.
pub const AGE_MAX: u8 = 80;

/// Hemisphere designator for bilateral structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Left hemisphere
    L,
    /// Right hemisphere
    R,
}

impl Side {
    /// Single-letter identifier used in asset file names and entry keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::R => "R",
        }
    }
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named anatomical structure with an associated exported mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    /// Short identifier, as used in asset file names (e.g. `STN`).
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Whether the structure exists as a left/right pair.
    pub bilateral: bool,
    /// Mesh file name for structures without a left/right split.
    pub mesh_file: &'static str,
    /// Flat RGB color used in anatomical display mode.
    pub anatomical_color: [f32; 3],
}

impl Region {
    /// Display name with the hemisphere suffix for bilateral structures,
    /// e.g. `"Subthalamic Nucleus (L)"`.
    #[must_use]
    pub fn display_name(&self, side: Side) -> String {
        if self.bilateral {
            format!("{} ({side})", self.name)
        } else {
            self.name.to_string()
        }
    }

    /// Mesh asset file name for the given hemisphere.
    ///
    /// Bilateral structures follow the `{id}-{side}_mesh.json` convention;
    /// others use their fixed file name.
    #[must_use]
    pub fn mesh_file_name(&self, side: Side) -> String {
        if self.bilateral {
            format!("{}-{side}_mesh.json", self.id)
        } else {
            self.mesh_file.to_string()
        }
    }

    /// Hemispheres to display for this region.
    ///
    /// Returns `[L]` unless the structure is bilateral and bilateral display
    /// is enabled, in which case both hemispheres are listed.
    #[must_use]
    pub fn sides(&self, bilateral_enabled: bool) -> &'static [Side] {
        if self.bilateral && bilateral_enabled {
            &[Side::L, Side::R]
        } else {
            &[Side::L]
        }
    }
}

/// Registry of the standard subcortical regions.
#[derive(Debug)]
pub struct RegionCatalog {
    regions: &'static [Region],
}

/// The standard subcortical structures of the 7T quantitative atlas.
static STANDARD_REGIONS: &[Region] = &[
    Region { id: "3V", name: "3rd Ventricle", bilateral: false, mesh_file: "3V-3_mesh.json", anatomical_color: [0.44, 0.60, 0.78] },
    Region { id: "4V", name: "4th Ventricle", bilateral: false, mesh_file: "4V-4_mesh.json", anatomical_color: [0.40, 0.56, 0.74] },
    Region { id: "AMG", name: "Amygdala", bilateral: true, mesh_file: "AMG-L_mesh.json", anatomical_color: [0.78, 0.51, 0.34] },
    Region { id: "CL", name: "Claustrum", bilateral: true, mesh_file: "CL-L_mesh.json", anatomical_color: [0.66, 0.66, 0.47] },
    Region { id: "fx", name: "Fornix", bilateral: false, mesh_file: "fx-lr_mesh.json", anatomical_color: [0.85, 0.85, 0.85] },
    Region { id: "GPe", name: "Globus Pallidus External", bilateral: true, mesh_file: "GPe-L_mesh.json", anatomical_color: [0.36, 0.65, 0.52] },
    Region { id: "GPi", name: "Globus Pallidus Internal", bilateral: true, mesh_file: "GPi-L_mesh.json", anatomical_color: [0.30, 0.55, 0.44] },
    Region { id: "ic", name: "Internal Capsule", bilateral: true, mesh_file: "ic-L_mesh.json", anatomical_color: [0.80, 0.80, 0.76] },
    Region { id: "LV", name: "Lateral Ventricle", bilateral: true, mesh_file: "LV-L_mesh.json", anatomical_color: [0.49, 0.64, 0.82] },
    Region { id: "PAG", name: "Periaqueductal Gray", bilateral: true, mesh_file: "PAG-L_mesh.json", anatomical_color: [0.61, 0.47, 0.67] },
    Region { id: "PPN", name: "Pedunculopontine Nucleus", bilateral: true, mesh_file: "PPN-L_mesh.json", anatomical_color: [0.72, 0.60, 0.42] },
    Region { id: "RN", name: "Red Nucleus", bilateral: true, mesh_file: "RN-L_mesh.json", anatomical_color: [0.83, 0.33, 0.31] },
    Region { id: "SN", name: "Substantia Nigra", bilateral: true, mesh_file: "SN-L_mesh.json", anatomical_color: [0.26, 0.24, 0.25] },
    Region { id: "STN", name: "Subthalamic Nucleus", bilateral: true, mesh_file: "STN-L_mesh.json", anatomical_color: [0.89, 0.68, 0.30] },
    Region { id: "STR", name: "Striatum", bilateral: true, mesh_file: "STR-L_mesh.json", anatomical_color: [0.56, 0.42, 0.60] },
    Region { id: "THA", name: "Thalamus", bilateral: true, mesh_file: "THA-L_mesh.json", anatomical_color: [0.42, 0.54, 0.43] },
    Region { id: "VTA", name: "Ventral Tegmental Area", bilateral: true, mesh_file: "VTA-L_mesh.json", anatomical_color: [0.70, 0.44, 0.48] },
];

impl RegionCatalog {
    /// The standard atlas region set.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            regions: STANDARD_REGIONS,
        }
    }

    /// Look up a region by its short identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'static Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// All regions, in catalog order.
    #[must_use]
    pub fn all(&self) -> &'static [Region] {
        self.regions
    }

    /// Identifiers of all regions, in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.regions.iter().map(|r| r.id)
    }

    /// Number of regions in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// A quantitative MRI measurement category with its display unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionType {
    /// Identifier used in prediction asset file names (e.g. `iron_median`).
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Measurement unit string.
    pub unit: &'static str,
}

static STANDARD_PREDICTIONS: &[PredictionType] = &[
    PredictionType { id: "iron_median", name: "Iron (Median)", unit: "μg/g" },
    PredictionType { id: "iron_iqr", name: "Iron (IQR)", unit: "μg/g" },
    PredictionType { id: "myelin_median", name: "Myelin (Median)", unit: "ratio" },
    PredictionType { id: "myelin_iqr", name: "Myelin (IQR)", unit: "ratio" },
    PredictionType { id: "qpd_median", name: "QPD (Median)", unit: "ratio" },
    PredictionType { id: "qpd_iqr", name: "QPD (IQR)", unit: "ratio" },
    PredictionType { id: "qsm_median", name: "QSM (Median)", unit: "ppm" },
    PredictionType { id: "qsm_iqr", name: "QSM (IQR)", unit: "ppm" },
    PredictionType { id: "r1hz_median", name: "R1 (Median)", unit: "Hz" },
    PredictionType { id: "r1hz_iqr", name: "R1 (IQR)", unit: "Hz" },
    PredictionType { id: "r2hz_median", name: "R2 (Median)", unit: "Hz" },
    PredictionType { id: "r2hz_iqr", name: "R2 (IQR)", unit: "Hz" },
    PredictionType { id: "thickness_median", name: "Thickness (Median)", unit: "mm" },
    PredictionType { id: "thickness_iqr", name: "Thickness (IQR)", unit: "mm" },
    PredictionType { id: "volume_volume", name: "Volume", unit: "mm³" },
    PredictionType { id: "volume_voxels", name: "Volume (Voxels)", unit: "voxels" },
];

/// Registry of the available prediction types.
#[derive(Debug)]
pub struct PredictionCatalog {
    types: &'static [PredictionType],
}

impl PredictionCatalog {
    /// The standard prediction-type set.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            types: STANDARD_PREDICTIONS,
        }
    }

    /// Look up a prediction type by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'static PredictionType> {
        self.types.iter().find(|p| p.id == id)
    }

    /// All prediction types, in catalog order.
    #[must_use]
    pub fn all(&self) -> &'static [PredictionType] {
        self.types
    }
}

impl Default for PredictionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Process-wide immutable atlas configuration.
///
/// Bundles the region and prediction registries with the asset path
/// conventions. Built once at startup; components receive it by reference.
#[derive(Debug)]
pub struct AtlasCatalog {
    regions: RegionCatalog,
    predictions: PredictionCatalog,
    mesh_dir: &'static str,
    prediction_dir: &'static str,
}

impl AtlasCatalog {
    /// The standard catalog with the conventional asset directories.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            regions: RegionCatalog::standard(),
            predictions: PredictionCatalog::standard(),
            mesh_dir: "exported_meshes",
            prediction_dir: "exported_predictions",
        }
    }

    /// The region registry.
    #[must_use]
    pub fn regions(&self) -> &RegionCatalog {
        &self.regions
    }

    /// The prediction-type registry.
    #[must_use]
    pub fn predictions(&self) -> &PredictionCatalog {
        &self.predictions
    }

    /// Relative asset path for a region's mesh on the given hemisphere.
    #[must_use]
    pub fn mesh_path(&self, region: &Region, side: Side) -> String {
        format!("{}/{}", self.mesh_dir, region.mesh_file_name(side))
    }

    /// Relative asset path for a region's prediction series of the given type.
    ///
    /// Prediction files are per region, shared by both hemispheres.
    #[must_use]
    pub fn prediction_path(&self, region: &Region, prediction_type: &str) -> String {
        format!(
            "{}/{}_{prediction_type}_predictions.json",
            self.prediction_dir, region.id
        )
    }
}

impl Default for AtlasCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
