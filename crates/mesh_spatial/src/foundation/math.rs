//! Math utilities and types
//!
//! Provides the fundamental math types for the spatial indexing core.
//! Everything computes in `f64`: the covariance/eigen path and the
//! tolerance comparisons degrade visibly in single precision.

pub use nalgebra::{Matrix3, Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f64>;

/// Squared Euclidean distance between two positions
#[inline]
pub fn distance2_between_points(a: &Vec3, b: &Vec3) -> f64 {
    (a - b).norm_squared()
}

/// Apply a homogeneous transform to a position (w = 1, with perspective
/// divide)
#[inline]
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    let out = m * nalgebra::Vector4::new(p.x, p.y, p.z, 1.0);
    Vec3::new(out.x, out.y, out.z) / out.w
}

/// Apply the linear part of a homogeneous transform to a direction (w = 0)
#[inline]
pub fn transform_vector(m: &Mat4, v: &Vec3) -> Vec3 {
    let out = m * nalgebra::Vector4::new(v.x, v.y, v.z, 0.0);
    Vec3::new(out.x, out.y, out.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance2_between_points() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(1.0, 2.0, 5.0);
        assert_eq!(distance2_between_points(&a, &b), 4.0);
        assert_eq!(distance2_between_points(&a, &a), 0.0);
    }

    #[test]
    fn test_transform_point_vs_vector() {
        let m = Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0));
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(transform_point(&m, &p), Vec3::new(11.0, 2.0, 3.0));
        // Directions ignore translation.
        assert_eq!(transform_vector(&m, &p), p);
    }
}
