//! OBB tree node arena records

use crate::foundation::math::Vec3;

/// Index of a node in the tree's arena
pub type NodeId = usize;

/// One oriented box in the tree.
///
/// `corner` is the box origin and `axes` are the three edge vectors out of
/// it, ordered max/mid/min by the eigenvalue of the covariance fit; each
/// axis carries the full extent of the box along its direction, so the far
/// corner is `corner + axes[0] + axes[1] + axes[2]`. Triangle ids live on
/// leaves only.
#[derive(Debug, Clone, PartialEq)]
pub struct ObbNode {
    /// Box origin
    pub corner: Vec3,
    /// Edge vectors out of the corner, max/mid/min, full extent each
    pub axes: [Vec3; 3],
    /// Triangle ids contained in this node; empty on internal nodes
    pub triangles: Vec<usize>,
    /// Child node ids, `None` on leaves
    pub children: Option<[NodeId; 2]>,
    /// Parent node id, `None` on the root
    pub parent: Option<NodeId>,
    /// Depth of this node, root at 0
    pub level: u32,
}

impl ObbNode {
    /// An empty node at the given depth
    pub fn new(level: u32, parent: Option<NodeId>) -> Self {
        Self {
            corner: Vec3::zeros(),
            axes: [Vec3::zeros(); 3],
            triangles: Vec::new(),
            children: None,
            parent,
            level,
        }
    }

    /// True when this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Geometric center of the box
    pub fn center(&self) -> Vec3 {
        self.corner + 0.5 * (self.axes[0] + self.axes[1] + self.axes[2])
    }

    /// The eight box corners, `corner` first
    pub fn corners(&self) -> [Vec3; 8] {
        let [a, b, c] = self.axes;
        [
            self.corner,
            self.corner + a,
            self.corner + b,
            self.corner + a + b,
            self.corner + c,
            self.corner + a + c,
            self.corner + b + c,
            self.corner + a + b + c,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_and_corners() {
        let mut node = ObbNode::new(0, None);
        node.corner = Vec3::new(1.0, 1.0, 1.0);
        node.axes = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 6.0),
        ];
        assert_relative_eq!(node.center(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(node.corners()[0], Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(node.corners()[7], Vec3::new(3.0, 5.0, 7.0));
    }

    #[test]
    fn test_leaf() {
        let mut node = ObbNode::new(0, None);
        assert!(node.is_leaf());
        node.children = Some([1, 2]);
        assert!(!node.is_leaf());
    }
}
