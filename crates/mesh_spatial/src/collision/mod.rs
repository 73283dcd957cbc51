//! Exact geometric intersection tests
//!
//! The narrow phase behind the broad-phase tree traversal: once two leaf
//! boxes overlap, these routines decide whether the triangles inside them
//! actually touch, and where.

pub(crate) mod triangle;

pub use triangle::{
    intersect_triangles, intersect_triangles_with_tolerance, triangle_normal,
    triangle_normal_direction, TriangleIntersection, DEFAULT_TRIANGLE_TOLERANCE,
};
