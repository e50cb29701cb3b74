//! Quantatlas Viewer - progressive loading and colorization pipeline
//!
//! Drives the subcortical atlas viewer: resolves a region selection into
//! `(region, side)` fetch pairs, loads mesh and prediction assets in
//! bounded concurrent batches with progressive merging, derives the shared
//! color scale, builds colorized geometry, and composes the centered
//! scene with hover pick-through.
//!
//! # Modules
//!
//! - [`source`]: Asset retrieval seam (HTTP, local directory)
//! - [`fetch`]: Batched progressive loading with a mesh geometry cache
//! - [`scale`]: Shared color-scale computation
//! - [`colorize`]: Colorized geometry construction and lifecycle
//! - [`scene`]: Scene centering state machine and hover pick-through
//! - [`controller`]: Viewer state machine tying the pipeline together
//!
//! # Data flow
//!
//! State change → [`fetch::AssetFetcher`] (batched fetch) → merged entry
//! map → [`scale::compute_color_scale`] → [`colorize::colorize`] per
//! changed mesh → [`scene::SceneComposer`] (re-center) → hover events back
//! to the [`controller::ViewerController`] for tooltip display.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod colorize;
pub mod controller;
pub mod fetch;
pub mod scale;
pub mod scene;
pub mod source;

pub use colorize::{colorize, ColorMode, ColorizedGeometry, GeometrySlot};
pub use controller::{ViewerController, ViewerState};
pub use fetch::{resolve_fetch_list, AssetFetcher, BatchResult, FetchPair, LoadSession};
pub use scale::compute_color_scale;
pub use scene::{CenterMarker, CenteringState, HoverEvent, SceneComposer};
pub use source::{AssetSource, DirAssetSource, HttpAssetSource};
