//! Mesh geometry as parsed from the exported asset files.

use nalgebra::Point3;
use serde::Deserialize;

use crate::error::AtlasError;

/// Triangle mesh geometry for one region and hemisphere.
///
/// Matches the exported asset document:
/// `{ "vertices": [[x,y,z], ...], "faces": [[i,j,k], ...] }`.
/// Immutable after parse; entries share it behind an `Arc`.
#[derive(Clone, Debug, Deserialize)]
pub struct MeshGeometry {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Vertex-index triples, counter-clockwise winding.
    pub faces: Vec<[u32; 3]>,
}

impl MeshGeometry {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Check structural validity of the parsed document.
    ///
    /// A face index past the vertex array marks the whole asset as
    /// malformed; the fetch layer reports it as a parse failure for its
    /// pair rather than letting an out-of-bounds index reach geometry
    /// construction.
    pub fn validate(&self, path: &str) -> Result<(), AtlasError> {
        if self.vertices.is_empty() {
            return Err(AtlasError::ParseFailure {
                path: path.to_string(),
                detail: "mesh has no vertices".to_string(),
            });
        }
        let limit = self.vertices.len() as u32;
        for face in &self.faces {
            if face.iter().any(|&i| i >= limit) {
                return Err(AtlasError::ParseFailure {
                    path: path.to_string(),
                    detail: format!(
                        "face index out of bounds: {face:?} with {limit} vertices"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Axis-aligned bounding box of the vertex set.
    ///
    /// `None` for an empty vertex array (rejected by [`Self::validate`]).
    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Bounding box of a point set; `None` when the set is empty.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = Point3::from(first);
        let mut max = min;
        for [x, y, z] in iter {
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        }
        Some(Self { min, max })
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Center point of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }
}
