//! Foundation utilities shared across the crate
//!
//! Math type aliases and the axis-aligned bounding box used by the
//! grid locator and the OBB builder.

pub mod bounds;
pub mod logging;
pub mod math;

pub use bounds::Aabb;
pub use math::{Mat3, Mat4, Vec3};
