//! Oriented-bounding-box tree
//!
//! A binary tree of oriented boxes fitted to mesh triangles by principal
//! component analysis. Built once per dataset snapshot, then used for
//! box-box rejection and exact triangle-triangle collision queries between
//! two trees.

mod eigen;
mod intersect;
mod node;
mod tree;

pub use eigen::{symmetric_eigen3, SymmetricEigen3};
pub use intersect::IntersectionLines;
pub use node::{NodeId, ObbNode};
pub use tree::{Obb, ObbTree, ObbTreeError};
