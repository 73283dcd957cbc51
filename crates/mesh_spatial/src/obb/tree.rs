//! OBB tree construction
//!
//! Fits an oriented box to a set of triangles by the area-weighted
//! covariance of their vertices, then splits recursively: triangle
//! centroids are partitioned about their mean projection on the box's
//! longest axis until the depth or leaf-size limit is reached.

use std::collections::HashSet;
use std::rc::Rc;

use log::error;
use thiserror::Error;

use crate::data::mesh::Dataset;
use crate::foundation::math::{transform_point, transform_vector, Mat3, Mat4, Vec3};
use crate::obb::eigen::symmetric_eigen3;
use crate::obb::node::{NodeId, ObbNode};

/// Errors raised while building a tree or fitting a box
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObbTreeError {
    /// `build_locator` was called with no dataset attached
    #[error("no dataset attached to the OBB tree")]
    NoDataset,

    /// The dataset holds no points or no triangles
    #[error("cannot fit an oriented box - no data available")]
    EmptyDataset,
}

/// A fitted oriented box.
///
/// `corner` is the box origin; `axes` are the edge vectors out of it in
/// max/mid/min covariance order, each carrying the full extent along its
/// direction. `size` reports the covariance eigenvalues of the fit, a
/// measure of the mass distribution rather than the box extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    /// Box origin
    pub corner: Vec3,
    /// Edge vectors out of the corner, max/mid/min, full extent each
    pub axes: [Vec3; 3],
    /// Covariance eigenvalues of the fit, descending
    pub size: [f64; 3],
}

/// Binary tree of oriented boxes over the triangles of a dataset.
///
/// Configure, attach a dataset, then [`build_locator`](Self::build_locator).
/// Nodes live in a flat arena indexed by [`NodeId`]; the tree borrows
/// nothing from the dataset and goes stale if the dataset is mutated.
pub struct ObbTree {
    dataset: Option<Rc<dyn Dataset>>,
    max_level: usize,
    number_of_cells_per_node: usize,
    /// Slack added to the separating-axis comparisons during traversal
    tolerance: f64,
    automatic: bool,

    nodes: Vec<ObbNode>,
    root: Option<NodeId>,
    /// Deepest level reached by the last build
    level: usize,
}

impl Default for ObbTree {
    fn default() -> Self {
        Self {
            dataset: None,
            max_level: 8,
            number_of_cells_per_node: 32,
            tolerance: 0.01,
            automatic: true,
            nodes: Vec::new(),
            root: None,
            level: 0,
        }
    }
}

impl ObbTree {
    /// Create a tree with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the dataset the tree indexes
    pub fn set_dataset(&mut self, dataset: Rc<dyn Dataset>) {
        self.dataset = Some(dataset);
    }

    /// The attached dataset
    pub fn dataset(&self) -> Option<&Rc<dyn Dataset>> {
        self.dataset.as_ref()
    }

    /// Maximum tree depth
    pub fn set_max_level(&mut self, max_level: usize) {
        self.max_level = max_level;
    }

    /// Leaf-size limit: nodes holding at most this many triangles stop
    /// splitting
    pub fn set_number_of_cells_per_node(&mut self, n: usize) {
        self.number_of_cells_per_node = n.max(1);
    }

    /// Slack for the separating-axis box-box tests
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance.max(0.0);
    }

    /// Choose build parameters automatically
    pub fn set_automatic(&mut self, automatic: bool) {
        self.automatic = automatic;
    }

    /// The separating-axis slack
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether automatic parameter selection is enabled
    pub fn automatic(&self) -> bool {
        self.automatic
    }

    /// The leaf-size limit
    pub fn number_of_cells_per_node(&self) -> usize {
        self.number_of_cells_per_node
    }

    /// Deepest level of the built tree (root is level 0)
    pub fn level(&self) -> usize {
        self.level
    }

    /// The node arena
    pub fn nodes(&self) -> &[ObbNode] {
        &self.nodes
    }

    /// A node by id
    pub fn node(&self, id: NodeId) -> Option<&ObbNode> {
        self.nodes.get(id)
    }

    /// The root node id, when built
    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    /// The root node, when built
    pub fn root(&self) -> Option<&ObbNode> {
        self.root.and_then(|id| self.nodes.get(id))
    }

    /// Drop the built tree. Configuration and dataset stay attached.
    pub fn free_search_structure(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.level = 0;
    }

    /// Fit a single oriented box to a subset of the attached dataset's
    /// triangles.
    pub fn compute_obb(&self, triangle_ids: &[usize]) -> Result<Obb, ObbTreeError> {
        let dataset = self.dataset.as_ref().ok_or(ObbTreeError::NoDataset)?;
        fit_obb(dataset.as_ref(), triangle_ids).ok_or_else(|| {
            error!("cannot compute OBB - no data available");
            ObbTreeError::EmptyDataset
        })
    }

    /// Fit a single oriented box to all triangles of a dataset, without
    /// building a tree.
    pub fn compute_obb_from_dataset(dataset: &dyn Dataset) -> Result<Obb, ObbTreeError> {
        if dataset.num_points() < 1 || dataset.num_triangles() < 1 {
            error!("cannot compute OBB - no data available");
            return Err(ObbTreeError::EmptyDataset);
        }
        let triangle_ids: Vec<usize> = (0..dataset.num_triangles()).collect();
        fit_obb(dataset, &triangle_ids).ok_or(ObbTreeError::EmptyDataset)
    }

    /// Build the tree over the attached dataset, replacing any previous
    /// build.
    pub fn build_locator(&mut self) -> Result<(), ObbTreeError> {
        let Some(dataset) = self.dataset.clone() else {
            error!("cannot build OBB tree - no dataset attached");
            return Err(ObbTreeError::NoDataset);
        };
        if dataset.num_points() < 1 || dataset.num_triangles() < 1 {
            error!("cannot build OBB tree - no data available");
            return Err(ObbTreeError::EmptyDataset);
        }

        self.free_search_structure();
        self.nodes.push(ObbNode::new(0, None));
        self.root = Some(0);

        let triangles: Vec<usize> = (0..dataset.num_triangles()).collect();
        self.build_node(dataset.as_ref(), 0, triangles, 0);
        Ok(())
    }

    /// Transform every box in the tree: corners as positions, axes as
    /// directions.
    pub fn transform(&mut self, m: &Mat4) {
        for node in &mut self.nodes {
            node.corner = transform_point(m, &node.corner);
            for axis in &mut node.axes {
                *axis = transform_vector(m, axis);
            }
        }
    }

    /// Replace this tree with a copy of `source`.
    ///
    /// The node arena is cloned; the dataset handle is shared, not cloned.
    pub fn deep_copy(&mut self, source: &ObbTree) {
        self.max_level = source.max_level;
        self.number_of_cells_per_node = source.number_of_cells_per_node;
        self.tolerance = source.tolerance;
        self.automatic = source.automatic;
        self.dataset = source.dataset.clone();
        self.nodes = source.nodes.clone();
        self.root = source.root;
        self.level = source.level;
    }

    fn build_node(
        &mut self,
        dataset: &dyn Dataset,
        node_id: NodeId,
        triangles: Vec<usize>,
        level: usize,
    ) {
        self.level = self.level.max(level);

        if let Some(obb) = fit_obb(dataset, &triangles) {
            let node = &mut self.nodes[node_id];
            node.corner = obb.corner;
            node.axes = obb.axes;
        }

        if level < self.max_level && triangles.len() > self.number_of_cells_per_node {
            if let Some((left, right)) = split_triangles(dataset, &self.nodes[node_id], &triangles)
            {
                let child_level = level as u32 + 1;
                let left_id = self.nodes.len();
                self.nodes.push(ObbNode::new(child_level, Some(node_id)));
                let right_id = self.nodes.len();
                self.nodes.push(ObbNode::new(child_level, Some(node_id)));
                self.nodes[node_id].children = Some([left_id, right_id]);

                self.build_node(dataset, left_id, left, level + 1);
                self.build_node(dataset, right_id, right, level + 1);
                return;
            }
        }

        self.nodes[node_id].triangles = triangles;
    }
}

impl std::fmt::Debug for ObbTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObbTree")
            .field("max_level", &self.max_level)
            .field("number_of_cells_per_node", &self.number_of_cells_per_node)
            .field("tolerance", &self.tolerance)
            .field("automatic", &self.automatic)
            .field("num_nodes", &self.nodes.len())
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Area-weighted covariance fit of an oriented box to a triangle subset.
///
/// Returns `None` when no triangle contributes any point. A subset with
/// zero total area (degenerate triangles) falls back to world axes about
/// the vertex average.
fn fit_obb(dataset: &dyn Dataset, triangle_ids: &[usize]) -> Option<Obb> {
    let mut mean = Vec3::zeros();
    let mut moments = Mat3::zeros();
    let mut tot_mass = 0.0;
    let mut seen = HashSet::new();
    let mut points: Vec<Vec3> = Vec::new();

    for &tri_id in triangle_ids {
        let Some(ids) = dataset.triangle(tri_id) else {
            continue;
        };
        let (Some(p), Some(q), Some(r)) = (
            dataset.point(ids[0]),
            dataset.point(ids[1]),
            dataset.point(ids[2]),
        ) else {
            continue;
        };

        for (&id, point) in ids.iter().zip([p, q, r]) {
            if seen.insert(id) {
                points.push(point);
            }
        }

        let dp0 = q - p;
        let dp1 = r - p;
        let c = (p + q + r) / 3.0;
        let tri_mass = 0.5 * dp0.cross(&dp1).norm();
        tot_mass += tri_mass;
        mean += tri_mass * c;

        // Second moments of a uniform triangle, accumulated per component
        // pair.
        for i in 0..3 {
            for j in i..3 {
                moments[(i, j)] +=
                    tri_mass * (9.0 * c[i] * c[j] + p[i] * p[j] + q[i] * q[j] + r[i] * r[j]) / 12.0;
            }
        }
    }

    if points.is_empty() {
        return None;
    }

    let (mut axes, size) = if tot_mass > 0.0 {
        mean /= tot_mass;
        let mut covariance = Mat3::zeros();
        for i in 0..3 {
            for j in i..3 {
                let cov = moments[(i, j)] / tot_mass - mean[i] * mean[j];
                covariance[(i, j)] = cov;
                covariance[(j, i)] = cov;
            }
        }
        let eigen = symmetric_eigen3(&covariance);
        (eigen.vectors, eigen.values)
    } else {
        // All triangles degenerate: no covariance to diagonalize.
        mean = points.iter().sum::<Vec3>() / points.len() as f64;
        (
            [
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            [0.0; 3],
        )
    };

    // Project every vertex onto the axes to get the extents.
    let mut t_min = [f64::MAX; 3];
    let mut t_max = [-f64::MAX; 3];
    for p in &points {
        let d = p - mean;
        for i in 0..3 {
            let t = d.dot(&axes[i]);
            t_min[i] = t_min[i].min(t);
            t_max[i] = t_max[i].max(t);
        }
    }

    let mut corner = mean;
    for i in 0..3 {
        corner += t_min[i] * axes[i];
        axes[i] *= t_max[i] - t_min[i];
    }

    Some(Obb {
        corner,
        axes,
        size,
    })
}

/// Partition triangles about the mean centroid projection on the node's
/// longest axis. `None` when the split is unusable (degenerate axis or all
/// triangles on one side), which makes the node a leaf.
fn split_triangles(
    dataset: &dyn Dataset,
    node: &ObbNode,
    triangles: &[usize],
) -> Option<(Vec<usize>, Vec<usize>)> {
    let axis_len = node.axes[0].norm();
    if axis_len == 0.0 {
        return None;
    }
    let dir = node.axes[0] / axis_len;

    let mut projections = Vec::with_capacity(triangles.len());
    let mut mean_projection = 0.0;
    for &tri_id in triangles {
        let ids = dataset.triangle(tri_id)?;
        let (Some(p), Some(q), Some(r)) = (
            dataset.point(ids[0]),
            dataset.point(ids[1]),
            dataset.point(ids[2]),
        ) else {
            return None;
        };
        let t = ((p + q + r) / 3.0).dot(&dir);
        projections.push((tri_id, t));
        mean_projection += t;
    }
    mean_projection /= projections.len() as f64;

    let mut left = Vec::new();
    let mut right = Vec::new();
    for (tri_id, t) in projections {
        if t < mean_projection {
            left.push(tri_id);
        } else {
            right.push(tri_id);
        }
    }
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}
