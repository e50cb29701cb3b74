//! Colorized geometry construction and lifecycle.

use nalgebra::Vector3;

use quantatlas_core::{Aabb, ColorMap, ColorScale, LoadedEntry};

/// How vertex colors are assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// Normalize prediction values against the shared scale and map them
    /// through a heatmap palette.
    Heatmap(ColorMap),
    /// Flat per-region color, ignoring prediction values and the scale.
    Anatomical,
}

impl Default for ColorMode {
    fn default() -> Self {
        Self::Heatmap(ColorMap::default())
    }
}

/// Renderable colored mesh derived from one loaded entry.
///
/// Positions pass through from the source geometry unchanged; colors and
/// normals are derived per vertex. The mean prediction value feeds the
/// hover tooltip.
#[derive(Clone, Debug)]
pub struct ColorizedGeometry {
    /// Vertex positions, xyz interleaved.
    pub positions: Vec<f32>,
    /// Vertex colors, rgb interleaved.
    pub colors: Vec<f32>,
    /// Vertex normals, xyz interleaved.
    pub normals: Vec<f32>,
    /// Triangle indices, flattened.
    pub indices: Vec<u32>,
    /// Mean prediction value at the selected age; `None` in anatomical mode.
    pub mean_value: Option<f64>,
    /// Bounding box of the positions.
    pub aabb: Aabb,
}

impl ColorizedGeometry {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Build the colorized geometry for an entry, or `None` while not ready.
///
/// Not-ready cases (none of them errors): the mesh or the series for the
/// active prediction type has not loaded yet, or heatmap mode is selected
/// while the shared scale is still unresolved.
#[must_use]
pub fn colorize(
    entry: &LoadedEntry,
    prediction_type: &str,
    age: u8,
    scale: &ColorScale,
    mode: ColorMode,
) -> Option<ColorizedGeometry> {
    let mesh = entry.mesh.as_deref()?;
    let series = entry.series(prediction_type)?;

    let vertex_count = mesh.vertex_count();
    let mut colors = Vec::with_capacity(vertex_count * 3);
    let mean_value = match mode {
        ColorMode::Heatmap(map) => {
            if !scale.is_resolved() {
                return None;
            }
            let values = series.resolve(age)?;
            for i in 0..vertex_count {
                let t = scale.normalize(values.value_at(i));
                colors.extend_from_slice(&map.sample(t));
            }
            values.mean()
        }
        ColorMode::Anatomical => {
            for _ in 0..vertex_count {
                colors.extend_from_slice(&entry.region.anatomical_color);
            }
            None
        }
    };

    let mut positions = Vec::with_capacity(vertex_count * 3);
    for v in &mesh.vertices {
        positions.extend_from_slice(v);
    }

    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for f in &mesh.faces {
        indices.extend_from_slice(f);
    }

    Some(ColorizedGeometry {
        normals: vertex_normals(&mesh.vertices, &mesh.faces),
        aabb: mesh.aabb()?,
        positions,
        colors,
        indices,
        mean_value,
    })
}

/// Per-vertex normals from face winding.
///
/// Face normals are accumulated unnormalized onto their vertices, which
/// weights each face by its area, then the sums are normalized.
fn vertex_normals(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<f32> {
    let mut sums = vec![Vector3::<f32>::zeros(); vertices.len()];

    for face in faces {
        let a = Vector3::from(vertices[face[0] as usize]);
        let b = Vector3::from(vertices[face[1] as usize]);
        let c = Vector3::from(vertices[face[2] as usize]);
        let face_normal = (b - a).cross(&(c - a));
        for &i in face {
            sums[i as usize] += face_normal;
        }
    }

    let mut normals = Vec::with_capacity(vertices.len() * 3);
    for sum in sums {
        let n = sum.try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
    }
    normals
}

/// Owned slot for the geometry currently displayed for one entry.
///
/// All replacement goes through [`GeometrySlot::install`], which commits
/// the new geometry before the previous one is dropped, so rapid age or
/// prediction changes can neither double-release nor leak a buffer.
#[derive(Debug, Default)]
pub struct GeometrySlot {
    current: Option<ColorizedGeometry>,
}

impl GeometrySlot {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `geometry` and release whatever was displayed before.
    pub fn install(&mut self, geometry: ColorizedGeometry) {
        let previous = self.current.replace(geometry);
        drop(previous);
    }

    /// Release the displayed geometry (entry removed or viewer unmounted).
    pub fn release(&mut self) {
        self.current = None;
    }

    /// The currently displayed geometry.
    #[must_use]
    pub fn get(&self) -> Option<&ColorizedGeometry> {
        self.current.as_ref()
    }

    /// Whether the slot holds geometry.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}
