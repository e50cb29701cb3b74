//! Quantatlas Core - data model for the subcortical atlas viewer
//!
//! This crate provides the foundational types for the Quantatlas viewer
//! pipeline: the immutable region and prediction-type catalogs, mesh
//! geometry and per-age prediction series as parsed from the exported
//! asset files, the loaded-entry aggregation keyed by region and
//! hemisphere, and the shared color scale with its heatmap palettes.
//!
//! It performs no I/O; fetching and the viewer state machines live in
//! `quantatlas-viewer`.
//!
//! # Modules
//!
//! - [`catalog`]: Region and prediction-type registries, asset path conventions
//! - [`mesh`]: Mesh geometry (vertices/faces), validation, bounding boxes
//! - [`predictions`]: Per-age prediction series with deterministic fallback
//! - [`entry`]: Loaded-entry aggregation keyed by region and hemisphere
//! - [`color`]: Shared color scale and heatmap palettes
//! - [`error`]: Error taxonomy for asset loading
//!
//! # Example
//!
//! ```rust
//! use quantatlas_core::catalog::{AtlasCatalog, Side};
//!
//! let catalog = AtlasCatalog::standard();
//! let stn = catalog.regions().get("STN").unwrap();
//! assert_eq!(catalog.mesh_path(stn, Side::R), "exported_meshes/STN-R_mesh.json");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod color;
pub mod entry;
pub mod error;
pub mod mesh;
pub mod predictions;

// Re-export commonly used types at crate root
pub use catalog::{AtlasCatalog, PredictionCatalog, PredictionType, Region, RegionCatalog, Side};
pub use color::{ColorMap, ColorScale};
pub use entry::{EntryKey, LoadedEntry};
pub use error::AtlasError;
pub use mesh::{Aabb, MeshGeometry};
pub use predictions::{PredictionSeries, PredictionValues};
