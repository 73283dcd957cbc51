//! Tree-tree collision queries
//!
//! Broad phase: simulated-recursion traversal of two trees with a
//! separating-axis test per box pair. Narrow phase: exact triangle-triangle
//! intersection on every surviving leaf pair, reported through a callback
//! and an optional polyline materialization.

use log::error;

use crate::collision::triangle::{
    intersect_triangles_with_tolerance, TriangleIntersection, DEFAULT_TRIANGLE_TOLERANCE,
};
use crate::data::mesh::Dataset;
use crate::data::points::PointBuffer;
use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::obb::node::{NodeId, ObbNode};
use crate::obb::tree::ObbTree;

/// Polyline output of a collision query: one 2-point line cell per
/// intersecting triangle pair.
#[derive(Debug, Default)]
pub struct IntersectionLines {
    points: PointBuffer,
    lines: Vec<[usize; 2]>,
}

impl IntersectionLines {
    /// An empty line set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment as a line cell
    pub fn add_segment(&mut self, a: &Vec3, b: &Vec3) {
        let ia = self.points.push(a);
        let ib = self.points.push(b);
        self.lines.push([ia, ib]);
    }

    /// Number of line cells
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// The line cells as point-id pairs
    pub fn lines(&self) -> &[[usize; 2]] {
        &self.lines
    }

    /// The segment endpoint coordinates
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }
}

/// Projection interval of a box onto an axis (the axis need not be unit
/// length; both boxes project onto the same scale).
fn project_range(corner: &Vec3, axes: &[Vec3; 3], axis: &Vec3) -> (f64, f64) {
    let mut lo = corner.dot(axis);
    let mut hi = lo;
    for edge in axes {
        let d = edge.dot(axis);
        if d > 0.0 {
            hi += d;
        } else {
            lo += d;
        }
    }
    (lo, hi)
}

/// A node's box in the frame of the other tree: corner as a position, axes
/// via transformed endpoints so affine transforms are handled.
fn box_in_frame(node: &ObbNode, xform: Option<&Mat4>) -> (Vec3, [Vec3; 3]) {
    match xform {
        None => (node.corner, node.axes),
        Some(m) => {
            let corner = transform_point(m, &node.corner);
            let axes = [
                transform_point(m, &(node.corner + node.axes[0])) - corner,
                transform_point(m, &(node.corner + node.axes[1])) - corner,
                transform_point(m, &(node.corner + node.axes[2])) - corner,
            ];
            (corner, axes)
        }
    }
}

fn triangle_points(dataset: &dyn Dataset, id: usize) -> Option<[Vec3; 3]> {
    let [a, b, c] = dataset.triangle(id)?;
    Some([dataset.point(a)?, dataset.point(b)?, dataset.point(c)?])
}

impl ObbTree {
    /// Separating-axis test between a node of this tree and a node of
    /// another tree, the latter optionally transformed into this tree's
    /// frame.
    ///
    /// The candidate axes are the center-to-center direction, the three face
    /// normals of each box, and the nine edge-edge cross products. The tree
    /// tolerance widens every comparison, so touching boxes never count as
    /// disjoint.
    pub fn disjoint_obb_nodes(&self, a: &ObbNode, b: &ObbNode, xform: Option<&Mat4>) -> bool {
        let eps = self.tolerance();
        let (corner_b, axes_b) = box_in_frame(b, xform);

        let center_a = a.center();
        let center_b = corner_b + 0.5 * (axes_b[0] + axes_b[1] + axes_b[2]);
        let a_to_b = center_b - center_a;

        let separated = |axis: &Vec3| {
            let (a_lo, a_hi) = project_range(&a.corner, &a.axes, axis);
            let (b_lo, b_hi) = project_range(&corner_b, &axes_b, axis);
            a_hi + eps < b_lo || b_hi + eps < a_lo
        };

        if separated(&a_to_b) {
            return true;
        }
        for axis in &axes_b {
            if separated(axis) {
                return true;
            }
        }
        for axis in &a.axes {
            if separated(axis) {
                return true;
            }
        }
        for edge_a in &a.axes {
            for edge_b in &axes_b {
                if separated(&edge_a.cross(edge_b)) {
                    return true;
                }
            }
        }
        false
    }

    /// Collide this tree with another, invoking `on_intersection` for every
    /// intersecting triangle pair and returning the pair count.
    ///
    /// `xform` maps the other tree (boxes and triangles) into this tree's
    /// frame before testing. The callback receives the triangle id from this
    /// tree, the triangle id from the other tree, and the intersection
    /// segment endpoints.
    pub fn intersect_with_obb_tree<F>(
        &self,
        other: &ObbTree,
        xform: Option<&Mat4>,
        mut on_intersection: F,
    ) -> usize
    where
        F: FnMut(usize, usize, (Vec3, Vec3)),
    {
        let (Some(root_a), Some(root_b)) = (self.root_id(), other.root_id()) else {
            error!("cannot intersect OBB trees - a tree has not been built");
            return 0;
        };
        let (Some(dataset_a), Some(dataset_b)) = (self.dataset(), other.dataset()) else {
            error!("cannot intersect OBB trees - a tree has no dataset");
            return 0;
        };

        let mut count = 0;
        let mut stack: Vec<(NodeId, NodeId)> = vec![(root_a, root_b)];
        while let Some((ia, ib)) = stack.pop() {
            let (Some(node_a), Some(node_b)) = (self.node(ia), other.node(ib)) else {
                continue;
            };
            if self.disjoint_obb_nodes(node_a, node_b, xform) {
                continue;
            }
            match (node_a.children, node_b.children) {
                (None, None) => {
                    count += leaf_pair_intersections(
                        dataset_a.as_ref(),
                        dataset_b.as_ref(),
                        node_a,
                        node_b,
                        xform,
                        &mut on_intersection,
                    );
                }
                (None, Some([b0, b1])) => {
                    stack.push((ia, b0));
                    stack.push((ia, b1));
                }
                (Some([a0, a1]), None) => {
                    stack.push((a0, ib));
                    stack.push((a1, ib));
                }
                (Some([a0, a1]), Some([b0, b1])) => {
                    stack.push((a0, b0));
                    stack.push((a1, b0));
                    stack.push((a0, b1));
                    stack.push((a1, b1));
                }
            }
        }
        count
    }

    /// Collide this tree with another and materialize every intersection
    /// segment into `lines`. Returns the intersecting pair count.
    pub fn find_triangle_intersections(
        &self,
        other: &ObbTree,
        xform: Option<&Mat4>,
        lines: &mut IntersectionLines,
    ) -> usize {
        self.intersect_with_obb_tree(other, xform, |_, _, (a, b)| {
            lines.add_segment(&a, &b);
        })
    }
}

/// Exact triangle tests for one surviving leaf pair
fn leaf_pair_intersections<F>(
    dataset_a: &dyn Dataset,
    dataset_b: &dyn Dataset,
    node_a: &ObbNode,
    node_b: &ObbNode,
    xform: Option<&Mat4>,
    on_intersection: &mut F,
) -> usize
where
    F: FnMut(usize, usize, (Vec3, Vec3)),
{
    let mut count = 0;
    for &tri_a in &node_a.triangles {
        let Some(points_a) = triangle_points(dataset_a, tri_a) else {
            continue;
        };
        for &tri_b in &node_b.triangles {
            let Some(mut points_b) = triangle_points(dataset_b, tri_b) else {
                continue;
            };
            if let Some(m) = xform {
                for p in &mut points_b {
                    *p = transform_point(m, p);
                }
            }
            if let TriangleIntersection::Segment { a, b } =
                intersect_triangles_with_tolerance(&points_a, &points_b, DEFAULT_TRIANGLE_TOLERANCE)
            {
                count += 1;
                on_intersection(tri_a, tri_b, (a, b));
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mesh::fixtures::axis_aligned_cube;
    use std::rc::Rc;

    fn cube_tree(center: Vec3) -> ObbTree {
        let mesh = Rc::new(axis_aligned_cube(center));
        let mut tree = ObbTree::new();
        tree.set_dataset(mesh);
        tree.build_locator().unwrap();
        tree
    }

    #[test]
    fn test_two_cube_collision() {
        // Two unit cubes offset by 0.2 along x cross each other's boundary
        // in exactly 40 triangle pairs.
        let tree_a = cube_tree(Vec3::new(0.8, 0.0, 0.0));
        let tree_b = cube_tree(Vec3::new(1.0, 0.0, 0.0));

        let mut lines = IntersectionLines::new();
        let count = tree_a.find_triangle_intersections(&tree_b, None, &mut lines);
        assert_eq!(count, 40);
        assert_eq!(lines.num_lines(), 40);
        assert_eq!(lines.points().len(), 80);
    }

    #[test]
    fn test_callback_sees_every_pair() {
        let tree_a = cube_tree(Vec3::new(0.8, 0.0, 0.0));
        let tree_b = cube_tree(Vec3::new(1.0, 0.0, 0.0));

        let mut pairs = Vec::new();
        let count = tree_a.intersect_with_obb_tree(&tree_b, None, |ta, tb, _| {
            pairs.push((ta, tb));
        });
        assert_eq!(pairs.len(), count);
        // Triangle ids come from the respective 12-triangle cubes.
        assert!(pairs.iter().all(|&(ta, tb)| ta < 12 && tb < 12));
        // No pair is reported twice.
        let mut deduped = pairs.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), pairs.len());
    }

    #[test]
    fn test_separated_cubes_do_not_collide() {
        let tree_a = cube_tree(Vec3::new(0.0, 0.0, 0.0));
        let tree_b = cube_tree(Vec3::new(5.0, 0.0, 0.0));

        let root_a = tree_a.root().unwrap();
        let root_b = tree_b.root().unwrap();
        assert!(tree_a.disjoint_obb_nodes(root_a, root_b, None));

        let count = tree_a.intersect_with_obb_tree(&tree_b, None, |_, _, _| {});
        assert_eq!(count, 0);
    }

    #[test]
    fn test_overlapping_roots_not_disjoint() {
        let tree_a = cube_tree(Vec3::new(0.8, 0.0, 0.0));
        let tree_b = cube_tree(Vec3::new(1.0, 0.0, 0.0));
        let root_a = tree_a.root().unwrap();
        let root_b = tree_b.root().unwrap();
        assert!(!tree_a.disjoint_obb_nodes(root_a, root_b, None));
    }

    #[test]
    fn test_transform_maps_other_tree_into_frame() {
        // Tree B sits far away; the transform pulls it into the same
        // configuration as the two-cube fixture.
        let tree_a = cube_tree(Vec3::new(0.8, 0.0, 0.0));
        let tree_b = cube_tree(Vec3::new(10.0, 0.0, 0.0));

        let far = tree_a.intersect_with_obb_tree(&tree_b, None, |_, _, _| {});
        assert_eq!(far, 0);

        let m = Mat4::new_translation(&Vec3::new(-9.0, 0.0, 0.0));
        let count = tree_a.intersect_with_obb_tree(&tree_b, Some(&m), |_, _, _| {});
        assert_eq!(count, 40);
    }

    #[test]
    fn test_unbuilt_tree_returns_zero() {
        let tree_a = cube_tree(Vec3::zeros());
        let tree_b = ObbTree::new();
        assert_eq!(tree_a.intersect_with_obb_tree(&tree_b, None, |_, _, _| {}), 0);
    }
}
