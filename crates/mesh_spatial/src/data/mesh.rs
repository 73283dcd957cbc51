//! Triangle dataset abstraction
//!
//! The spatial structures consume geometry through [`Dataset`]: axis-aligned
//! bounds, a point accessor, and per-triangle vertex-index triples. The
//! concrete [`TriangleMesh`] is the buffer-backed implementation used by
//! callers and throughout the tests.

use crate::data::points::PointBuffer;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::Vec3;

/// Read-only view of an indexed triangle mesh.
///
/// Implementations are never mutated by this crate; a structure built from a
/// dataset snapshot is only valid until the dataset changes, at which point
/// the caller must rebuild.
pub trait Dataset {
    /// Axis-aligned bounds of all points
    fn bounds(&self) -> Aabb;

    /// Number of points in the dataset
    fn num_points(&self) -> usize;

    /// Get a point by id, or `None` when out of range
    fn point(&self, id: usize) -> Option<Vec3>;

    /// Number of triangles in the dataset
    fn num_triangles(&self) -> usize;

    /// Vertex-index triple of a triangle, or `None` when out of range
    fn triangle(&self, id: usize) -> Option<[usize; 3]>;
}

/// An indexed triangle mesh backed by a [`PointBuffer`]
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    points: PointBuffer,
    triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from a point buffer and index triples.
    ///
    /// Triangles referencing out-of-range points are dropped.
    pub fn from_points_and_triangles(points: PointBuffer, triangles: Vec<[usize; 3]>) -> Self {
        let n = points.len();
        let triangles = triangles
            .into_iter()
            .filter(|t| t.iter().all(|&i| i < n))
            .collect();
        Self { points, triangles }
    }

    /// Build a mesh from vertex positions and a flat index list.
    ///
    /// Trailing indices that do not form a full triangle are ignored.
    pub fn from_vertices(vertices: &[Vec3], indices: &[usize]) -> Self {
        let points: PointBuffer = vertices.iter().copied().collect();
        let triangles = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::from_points_and_triangles(points, triangles)
    }

    /// The underlying point buffer
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    /// The triangle index triples
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The three corner positions of a triangle
    pub fn triangle_points(&self, id: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.triangles.get(id)?;
        Some([self.points.point(a)?, self.points.point(b)?, self.points.point(c)?])
    }
}

impl Dataset for TriangleMesh {
    fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in self.points.iter() {
            aabb.add_point(&p);
        }
        aabb
    }

    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn point(&self, id: usize) -> Option<Vec3> {
        self.points.point(id)
    }

    fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    fn triangle(&self, id: usize) -> Option<[usize; 3]> {
        self.triangles.get(id).copied()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Unit cube surface mesh with 4 points per face (24 points, 12
    /// triangles), each quad face fanned into two triangles. The duplicated
    /// face points match what a per-face-normal cube generator emits; the
    /// collision fixtures are pinned to this exact layout.
    pub(crate) fn axis_aligned_cube(center: Vec3) -> TriangleMesh {
        let h = 0.5;
        let offset = |i: usize| if i == 0 { -h } else { h };

        let mut vertices = Vec::with_capacity(24);
        // Faces normal to x, then y, then z; the face-varying coordinate is
        // the outer loop.
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    vertices.push(center + Vec3::new(offset(i), offset(j), offset(k)));
                }
            }
        }
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    vertices.push(center + Vec3::new(offset(j), offset(i), offset(k)));
                }
            }
        }
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    vertices.push(center + Vec3::new(offset(k), offset(j), offset(i)));
                }
            }
        }

        let quads = [
            [0, 1, 3, 2],
            [4, 6, 7, 5],
            [8, 10, 11, 9],
            [12, 13, 15, 14],
            [16, 18, 19, 17],
            [20, 21, 23, 22],
        ];
        let mut indices = Vec::with_capacity(quads.len() * 6);
        for [a, b, c, d] in quads {
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }

        TriangleMesh::from_vertices(&vertices, &indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vertices() {
        let vertices = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mesh = TriangleMesh::from_vertices(&vertices, &[0, 1, 2]);
        assert_eq!(mesh.num_points(), 3);
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.triangle(0), Some([0, 1, 2]));
        assert_eq!(mesh.triangle(1), None);
    }

    #[test]
    fn test_out_of_range_triangles_dropped() {
        let vertices = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let mesh = TriangleMesh::from_vertices(&vertices, &[0, 1, 7]);
        assert_eq!(mesh.num_triangles(), 0);
    }

    #[test]
    fn test_cube_fixture_shape() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let mesh = fixtures::axis_aligned_cube(center);
        assert_eq!(mesh.num_points(), 24);
        assert_eq!(mesh.num_triangles(), 12);
        let bounds = mesh.bounds();
        assert_eq!(bounds.min, center - Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(bounds.max, center + Vec3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_bounds() {
        let vertices = [
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(1.0, -3.0, 0.0),
            Vec3::new(0.0, 1.0, 5.0),
        ];
        let mesh = TriangleMesh::from_vertices(&vertices, &[0, 1, 2]);
        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, -3.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 5.0));
    }
}
