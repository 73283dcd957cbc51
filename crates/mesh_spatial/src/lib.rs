//! # Mesh Spatial
//!
//! Spatial indexing structures for triangle meshes.
//!
//! ## Features
//!
//! - **Point-Merge Locator**: Bucketed grid index that deduplicates
//!   coincident points within a tolerance and answers nearest-point queries
//! - **OBB Tree**: Binary tree of oriented bounding boxes fitted to mesh
//!   triangles by principal component analysis
//! - **Collision Queries**: Tree-vs-tree traversal down to exact
//!   triangle-triangle intersection segments
//!
//! ## Quick Start
//!
//! ```rust
//! use mesh_spatial::prelude::*;
//!
//! let mut locator = PointMergeLocator::new();
//! let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
//! locator.init_point_insertion(PointBuffer::new(), &bounds, 100)?;
//! locator.build_locator()?;
//!
//! let first = locator.insert_unique_point(&[1.0, 2.0, 3.0]);
//! let again = locator.insert_unique_point(&[1.0, 2.0, 3.0]);
//! assert!(first.was_inserted());
//! assert_eq!(again.id(), first.id());
//! # Ok::<(), mesh_spatial::locator::LocatorError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collision;
pub mod data;
pub mod foundation;
pub mod locator;
pub mod obb;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        collision::{intersect_triangles, TriangleIntersection},
        data::{Dataset, PointBuffer, TriangleMesh},
        foundation::{Aabb, Mat3, Mat4, Vec3},
        locator::{InsertResult, LocatorError, PointMergeLocator},
        obb::{IntersectionLines, ObbNode, ObbTree, ObbTreeError},
    };
}
