//! Uniform bucket grid
//!
//! Maps a 3D point to an integer cell triple and a flattened bucket key.
//! The grid itself stores nothing; occupancy lives in the locator's bucket
//! table, keyed by the flattened index.

use crate::foundation::bounds::Aabb;
use crate::foundation::math::Vec3;

/// A uniform grid dividing an axis-aligned box into `nx * ny * nz` buckets
#[derive(Debug, Clone)]
pub struct BucketGrid {
    divisions: [usize; 3],
    bounds: Aabb,
    /// Bucket width per axis
    h: Vec3,
    /// Reciprocal widths, precomputed for the point-to-bucket transform
    inv_h: Vec3,
    slice_size: usize,
}

impl BucketGrid {
    /// Create a grid over `bounds` with the given divisions.
    ///
    /// Divisions are clamped to at least 1 per axis; `bounds` must already be
    /// non-degenerate on every axis (see [`Aabb::min_inflate`] and
    /// [`Aabb::compute_divisions`]).
    pub fn new(bounds: Aabb, divisions: [usize; 3]) -> Self {
        let divisions = [
            divisions[0].max(1),
            divisions[1].max(1),
            divisions[2].max(1),
        ];
        let lengths = bounds.lengths();
        let h = Vec3::new(
            lengths.x / divisions[0] as f64,
            lengths.y / divisions[1] as f64,
            lengths.z / divisions[2] as f64,
        );
        let inv_h = Vec3::new(1.0 / h.x, 1.0 / h.y, 1.0 / h.z);
        Self {
            divisions,
            bounds,
            h,
            inv_h,
            slice_size: divisions[0] * divisions[1],
        }
    }

    /// Grid resolution per axis
    pub fn divisions(&self) -> [usize; 3] {
        self.divisions
    }

    /// The (possibly padded) bounds the grid covers
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Bucket width per axis
    pub fn cell_widths(&self) -> Vec3 {
        self.h
    }

    /// Smallest bucket width over the three axes
    pub fn min_cell_width(&self) -> f64 {
        self.h.x.min(self.h.y).min(self.h.z)
    }

    /// Largest division count over the three axes
    pub fn max_divisions(&self) -> usize {
        self.divisions.iter().copied().max().unwrap_or(1)
    }

    /// Total number of buckets
    pub fn num_buckets(&self) -> usize {
        self.divisions[0] * self.divisions[1] * self.divisions[2]
    }

    /// Integer cell triple of a point, clamped to the valid grid range
    pub fn bucket_ijk(&self, p: &Vec3) -> [usize; 3] {
        let mut ijk = [0usize; 3];
        for i in 0..3 {
            let f = (p[i] - self.bounds.min[i]) * self.inv_h[i];
            let cell = f.floor() as i64;
            ijk[i] = cell.clamp(0, self.divisions[i] as i64 - 1) as usize;
        }
        ijk
    }

    /// Flattened bucket key: `x + y * nx + z * nx * ny`
    pub fn bucket_key(&self, ijk: [usize; 3]) -> u64 {
        (ijk[0] + ijk[1] * self.divisions[0] + ijk[2] * self.slice_size) as u64
    }

    /// Flattened bucket key of the bucket containing a point
    pub fn bucket_key_for_point(&self, p: &Vec3) -> u64 {
        self.bucket_key(self.bucket_ijk(p))
    }

    /// Buckets forming the Chebyshev shell of radius `level` around `ijk`,
    /// clipped to the grid. Level 0 is the home bucket itself.
    pub fn neighbors(&self, ijk: [usize; 3], level: usize) -> Vec<[usize; 3]> {
        if level == 0 {
            return vec![ijk];
        }

        let level = level as i64;
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        for i in 0..3 {
            lo[i] = (ijk[i] as i64 - level).max(0);
            hi[i] = (ijk[i] as i64 + level).min(self.divisions[i] as i64 - 1);
        }

        let mut buckets = Vec::new();
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    // Shell cells only: at least one coordinate sits on the
                    // unclipped boundary of the level.
                    let on_shell = x == ijk[0] as i64 + level
                        || x == ijk[0] as i64 - level
                        || y == ijk[1] as i64 + level
                        || y == ijk[1] as i64 - level
                        || z == ijk[2] as i64 + level
                        || z == ijk[2] as i64 - level;
                    if on_shell {
                        buckets.push([x as usize, y as usize, z as usize]);
                    }
                }
            }
        }
        buckets
    }

    /// Squared distance from a point to a bucket's box (0 if inside)
    pub fn distance2_to_bucket(&self, p: &Vec3, ijk: [usize; 3]) -> f64 {
        let min = Vec3::new(
            self.bounds.min.x + ijk[0] as f64 * self.h.x,
            self.bounds.min.y + ijk[1] as f64 * self.h.y,
            self.bounds.min.z + ijk[2] as f64 * self.h.z,
        );
        Aabb::new(min, min + self.h).distance2_to_point(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> BucketGrid {
        BucketGrid::new(
            Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0)),
            [10, 10, 10],
        )
    }

    #[test]
    fn test_bucket_ijk() {
        let grid = unit_grid();
        assert_eq!(grid.bucket_ijk(&Vec3::new(0.5, 1.5, 2.5)), [0, 1, 2]);
        assert_eq!(grid.bucket_ijk(&Vec3::new(1.0, 2.0, 4.0)), [1, 2, 4]);
    }

    #[test]
    fn test_bucket_ijk_clamps_out_of_bounds() {
        let grid = unit_grid();
        assert_eq!(grid.bucket_ijk(&Vec3::new(-5.0, 50.0, 10.0)), [0, 9, 9]);
    }

    #[test]
    fn test_bucket_key_flattening() {
        let grid = unit_grid();
        assert_eq!(grid.bucket_key([0, 0, 0]), 0);
        assert_eq!(grid.bucket_key([3, 2, 1]), 3 + 2 * 10 + 100);
    }

    #[test]
    fn test_neighbors_level_zero_is_home_bucket() {
        let grid = unit_grid();
        assert_eq!(grid.neighbors([4, 4, 4], 0), vec![[4, 4, 4]]);
    }

    #[test]
    fn test_neighbors_full_shell() {
        let grid = unit_grid();
        let shell = grid.neighbors([4, 4, 4], 1);
        // A full 3x3x3 neighborhood minus the center.
        assert_eq!(shell.len(), 26);
        assert!(!shell.contains(&[4, 4, 4]));
    }

    #[test]
    fn test_neighbors_clipped_at_corner() {
        let grid = unit_grid();
        let shell = grid.neighbors([0, 0, 0], 1);
        // Only the 7 in-grid cells of the 26-cell shell survive.
        assert_eq!(shell.len(), 7);
    }

    #[test]
    fn test_distance2_to_bucket() {
        let grid = unit_grid();
        // Point inside its own bucket.
        assert_eq!(grid.distance2_to_bucket(&Vec3::new(0.5, 0.5, 0.5), [0, 0, 0]), 0.0);
        // One bucket away along x: gap of 1.5 to the face at x=2.
        let d2 = grid.distance2_to_bucket(&Vec3::new(0.5, 0.5, 0.5), [2, 0, 0]);
        assert!((d2 - 2.25).abs() < 1e-12);
    }
}
