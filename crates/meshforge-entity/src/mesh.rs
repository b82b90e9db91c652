//! Triangle mesh intermediate.
//!
//! A [`Mesh`] is what the geometry kernel or a mesh decoder produces and what
//! an encoder consumes. The pipeline only inspects it through
//! [`Mesh::validate`]; everything else is for the codecs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Per-vertex normals; empty when the source had none.
    #[serde(default)]
    pub normals: Vec<[f64; 3]>,
    /// Triangles as indices into `vertices`.
    #[serde(alias = "faces")]
    pub triangles: Vec<[usize; 3]>,
}

/// Reasons a mesh is unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// No vertices.
    #[error("mesh has no vertices")]
    NoVertices,

    /// No triangles.
    #[error("mesh has no triangles")]
    NoTriangles,

    /// A coordinate is NaN or infinite.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Offending vertex.
        index: usize,
    },

    /// A coordinate is finite but too large for the single-precision
    /// output formats.
    #[error("vertex {index} has a coordinate beyond single-precision range")]
    CoordinateOutOfRange {
        /// Offending vertex.
        index: usize,
    },

    /// A normal is non-finite or beyond single-precision range.
    #[error("normal {index} is not representable")]
    InvalidNormal {
        /// Offending normal.
        index: usize,
    },

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {vertex} but only {count} exist")]
    IndexOutOfRange {
        /// Offending triangle.
        triangle: usize,
        /// Referenced vertex index.
        vertex: usize,
        /// Number of vertices.
        count: usize,
    },

    /// Normal count differs from vertex count.
    #[error("mesh has {normals} normals for {vertices} vertices")]
    NormalCountMismatch {
        /// Number of normals.
        normals: usize,
        /// Number of vertices.
        vertices: usize,
    },
}

/// Summary returned by a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    /// Number of vertices.
    pub vertex_count: usize,
    /// Number of triangles.
    pub triangle_count: usize,
    /// Triangles that repeat a vertex index.
    pub degenerate_count: usize,
}

impl Mesh {
    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether per-vertex normals are present.
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    /// Format-neutral checks: non-empty, finite, indices in range.
    ///
    /// Degenerate triangles are counted but tolerated.
    pub fn validate(&self) -> Result<MeshStats, MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if self.triangles.is_empty() {
            return Err(MeshError::NoTriangles);
        }
        if let Some(index) = self
            .vertices
            .iter()
            .position(|v| !v.iter().all(|c| c.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex { index });
        }
        if let Some(index) = self.vertices.iter().position(|v| !fits_f32(v)) {
            return Err(MeshError::CoordinateOutOfRange { index });
        }
        if self.has_normals() && self.normals.len() != self.vertices.len() {
            return Err(MeshError::NormalCountMismatch {
                normals: self.normals.len(),
                vertices: self.vertices.len(),
            });
        }
        if let Some(index) = self.normals.iter().position(|n| !fits_f32(n)) {
            return Err(MeshError::InvalidNormal { index });
        }

        let count = self.vertices.len();
        let mut degenerate_count = 0;
        for (triangle, tri) in self.triangles.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&i| i >= count) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    vertex,
                    count,
                });
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                degenerate_count += 1;
            }
        }

        Ok(MeshStats {
            vertex_count: count,
            triangle_count: self.triangles.len(),
            degenerate_count,
        })
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(v[axis]);
                hi[axis] = hi[axis].max(v[axis]);
            }
            (lo, hi)
        });
        Some(bounds)
    }

    /// Unit normal of a triangle from its winding; zero for degenerate faces.
    pub fn face_normal(&self, triangle: [usize; 3]) -> [f64; 3] {
        let [v0, v1, v2] = triangle.map(|i| self.vertices[i]);
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > f64::EPSILON {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0, 0.0, 0.0]
        }
    }

    /// Unit cube centred on the origin, 8 vertices and 12 triangles.
    pub fn unit_cube() -> Self {
        let vertices = vec![
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ];
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [1, 2, 6],
            [1, 6, 5],
            [0, 4, 7],
            [0, 7, 3],
        ];
        Self {
            vertices,
            normals: Vec::new(),
            triangles,
        }
    }
}

/// Every component is finite and survives narrowing to `f32`.
fn fits_f32(v: &[f64; 3]) -> bool {
    v.iter().all(|c| c.is_finite() && c.abs() <= f64::from(f32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_is_valid() {
        let stats = Mesh::unit_cube().validate().expect("valid cube");
        assert_eq!(stats.vertex_count, 8);
        assert_eq!(stats.triangle_count, 12);
        assert_eq!(stats.degenerate_count, 0);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert_eq!(Mesh::default().validate(), Err(MeshError::NoVertices));

        let no_faces = Mesh {
            vertices: vec![[0.0; 3]],
            ..Default::default()
        };
        assert_eq!(no_faces.validate(), Err(MeshError::NoTriangles));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut mesh = Mesh::unit_cube();
        mesh.vertices[3][1] = f64::NAN;
        assert_eq!(mesh.validate(), Err(MeshError::NonFiniteVertex { index: 3 }));

        mesh.vertices[3][1] = f64::INFINITY;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_coordinates_beyond_f32_rejected() {
        let mut mesh = Mesh::unit_cube();
        mesh.vertices[5][0] = 1e39;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::CoordinateOutOfRange { index: 5 })
        );

        mesh.vertices[5][0] = f64::from(f32::MAX);
        assert!(mesh.validate().is_ok());

        mesh.normals = vec![[0.0, 0.0, 1.0]; 8];
        mesh.normals[2][2] = -1e40;
        assert_eq!(mesh.validate(), Err(MeshError::InvalidNormal { index: 2 }));
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let mut mesh = Mesh::unit_cube();
        mesh.triangles.push([0, 1, 8]);
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange { vertex: 8, .. })
        ));
    }

    #[test]
    fn test_degenerate_counted_not_rejected() {
        let mut mesh = Mesh::unit_cube();
        mesh.triangles.push([1, 1, 2]);
        let stats = mesh.validate().expect("degenerate tolerated");
        assert_eq!(stats.degenerate_count, 1);
    }

    #[test]
    fn test_bounds_and_normal() {
        let mesh = Mesh::unit_cube();
        let (lo, hi) = mesh.bounds().expect("bounds");
        assert_eq!(lo, [-0.5, -0.5, -0.5]);
        assert_eq!(hi, [0.5, 0.5, 0.5]);

        // Bottom face winds clockwise seen from +z, so its normal points down.
        let n = mesh.face_normal(mesh.triangles[0]);
        assert!((n[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_faces_alias() {
        let json = r#"{"vertices": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]]}"#;
        let mesh: Mesh = serde_json::from_str(json).expect("deserialize");
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
    }
}
