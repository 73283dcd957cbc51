//! Dataset abstractions consumed and produced by the spatial structures
//!
//! The locator and the OBB tree never own the geometry they index; they see
//! it through the [`Dataset`] trait and, for the merge locator, append into a
//! caller-provided [`PointBuffer`].

pub mod mesh;
pub mod points;

pub use mesh::{Dataset, TriangleMesh};
pub use points::PointBuffer;
