//! Symmetric 3x3 eigen decomposition
//!
//! Jacobi rotations, specialized for the covariance matrices the box fitter
//! produces. The ordering and sign conventions here are load-bearing: box
//! axes, corners, and everything downstream inherit them.

use crate::foundation::math::{Mat3, Vec3};

/// Maximum Jacobi sweeps; symmetric 3x3 input converges in a handful
const MAX_SWEEPS: usize = 50;

/// Eigen decomposition of a symmetric 3x3 matrix.
///
/// `values` are sorted descending; `vectors[i]` is the unit eigenvector for
/// `values[i]`.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricEigen3 {
    /// Eigenvalues, descending
    pub values: [f64; 3],
    /// Unit eigenvectors matching `values`
    pub vectors: [Vec3; 3],
}

/// Eigenvalues and eigenvectors of a symmetric 3x3 matrix.
///
/// Only the lower/upper symmetric part matters; the caller is expected to
/// pass a symmetric matrix. Conventions:
/// - eigenvalues descending; eigenvalues within a small relative epsilon
///   count as equal, and among equals the later rotation output wins the
///   earlier slot, so a multiple of the identity yields the axis permutation
///   (z, x, y) even when the diagonal carries rounding noise
/// - each eigenvector is flipped, if needed, so that at least two of its
///   components are non-negative (Jacobi is sign-ambiguous; downstream
///   consumers need a deterministic pick)
pub fn symmetric_eigen3(m: &Mat3) -> SymmetricEigen3 {
    let mut a = *m;
    let mut v = Mat3::identity();

    let scale = m.norm_squared().max(f64::MIN_POSITIVE);
    for _ in 0..MAX_SWEEPS {
        let off = a[(0, 1)] * a[(0, 1)] + a[(0, 2)] * a[(0, 2)] + a[(1, 2)] * a[(1, 2)];
        if off < f64::EPSILON * f64::EPSILON * scale {
            break;
        }
        for &(p, q) in &[(0, 1), (0, 2), (1, 2)] {
            if a[(p, q)].abs() <= f64::MIN_POSITIVE {
                continue;
            }
            let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * a[(p, q)]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            let mut j = Mat3::identity();
            j[(p, p)] = c;
            j[(q, q)] = c;
            j[(p, q)] = s;
            j[(q, p)] = -s;

            a = j.transpose() * a * j;
            v *= j;
        }
    }

    let mut values = [a[(0, 0)], a[(1, 1)], a[(2, 2)]];
    let mut vectors: [Vec3; 3] = [
        v.column(0).into_owned(),
        v.column(1).into_owned(),
        v.column(2).into_owned(),
    ];

    // Selection sort, descending; eigenvalues within rounding noise of each
    // other count as equal, and ties resolve in favor of the later column.
    // The axis permutation of degenerate input depends on this.
    let tie_tol = 1e-12 * values.iter().fold(f64::MIN_POSITIVE, |m, v| m.max(v.abs()));
    for j in 0..2 {
        let mut k = j;
        let mut max = values[k];
        for i in (j + 1)..3 {
            if values[i] >= max - tie_tol {
                k = i;
                max = values[i];
            }
        }
        if k != j {
            values.swap(j, k);
            vectors.swap(j, k);
        }
    }

    // Most-positive sign convention.
    for vector in &mut vectors {
        let non_negative = vector.iter().filter(|&&c| c >= 0.0).count();
        if non_negative < 2 {
            *vector = -*vector;
        }
    }

    SymmetricEigen3 { values, vectors }
}
