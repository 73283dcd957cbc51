//! Axis-aligned bounding box
//!
//! Used by the grid locator to size its bucket array and by queries to
//! prune buckets that cannot contain a closer point.

use crate::foundation::math::Vec3;

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for accumulating points
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f64::MAX),
            max: Vec3::repeat(f64::MIN),
        }
    }

    /// Smallest AABB containing all given points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    /// Grow the AABB to contain a point
    pub fn add_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// True if min <= max on every axis
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the edge lengths of the AABB
    pub fn lengths(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Uniformly inflate the AABB on every side
    pub fn inflate(&mut self, delta: f64) {
        self.min -= Vec3::repeat(delta);
        self.max += Vec3::repeat(delta);
    }

    /// Bump out any zero-width side by 0.5% of the longest side so the box
    /// has volume. A fully degenerate (point) box is inflated by 0.5.
    pub fn min_inflate(&mut self) {
        let lengths = self.lengths();
        let mut max_len = 0.0;
        for i in 0..3 {
            if lengths[i] > max_len {
                max_len = lengths[i];
            }
        }

        if max_len <= 0.0 {
            self.inflate(0.5);
            return;
        }

        let d = 0.005 * max_len;
        for i in 0..3 {
            if lengths[i] <= 0.0 {
                self.min[i] -= d;
                self.max[i] += d;
            }
        }
    }

    /// Squared distance from a point to the box (0 if inside)
    pub fn distance2_to_point(&self, p: &Vec3) -> f64 {
        let mut dist2 = 0.0;
        for i in 0..3 {
            let d = if p[i] < self.min[i] {
                self.min[i] - p[i]
            } else if p[i] > self.max[i] {
                p[i] - self.max[i]
            } else {
                0.0
            };
            dist2 += d * d;
        }
        dist2
    }

    /// Compute grid divisions roughly proportional to the box edge lengths
    /// so that the grid holds about `target_bins` cells, and return them with
    /// the (possibly padded) bounds the grid should use.
    ///
    /// Zero-width sides get a single division and are padded by half a cell
    /// of the longest side; a fully degenerate box becomes one unit cell.
    pub fn compute_divisions(&self, target_bins: usize) -> ([usize; 3], Aabb) {
        let target_bins = target_bins.max(1);
        let lengths = self.lengths();
        let tot_len = lengths.x + lengths.y + lengths.z;

        // Finite tolerance when detecting zero-width sides.
        let zero_tol = tot_len * (0.001 / 3.0);

        let mut non_zero = [false; 3];
        let mut num_non_zero = 0;
        let mut max_idx = 0;
        let mut max_len = 0.0;
        for i in 0..3 {
            if lengths[i] > max_len {
                max_len = lengths[i];
                max_idx = i;
            }
            if lengths[i] > zero_tol {
                non_zero[i] = true;
                num_non_zero += 1;
            }
        }

        if num_non_zero == 0 {
            // Degenerate box: one bin of arbitrary size.
            let mut adjusted = *self;
            adjusted.inflate(0.5);
            return ([1, 1, 1], adjusted);
        }

        // Divisions in proportion to the edge lengths.
        let mut f = target_bins as f64;
        for i in 0..3 {
            if non_zero[i] {
                f /= lengths[i] / tot_len;
            }
        }
        f = f.powf(1.0 / num_non_zero as f64);

        let mut divs = [1usize; 3];
        for i in 0..3 {
            if non_zero[i] {
                divs[i] = ((f * lengths[i] / tot_len).floor() as usize).max(1);
            }
        }

        // Never exceed the requested bin count.
        while divs[0] * divs[1] * divs[2] > target_bins {
            for d in &mut divs {
                if *d > 1 {
                    *d -= 1;
                }
            }
        }

        // Pad zero-width sides so every cell has volume.
        let delta = 0.5 * lengths[max_idx] / divs[max_idx] as f64;
        let mut adjusted = *self;
        for i in 0..3 {
            if !non_zero[i] {
                adjusted.min[i] -= delta;
                adjusted.max[i] += delta;
            }
        }

        (divs, adjusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(aabb.contains_point(&Vec3::new(0.5, 0.5, 0.5)));
        assert!(aabb.contains_point(&Vec3::new(0.0, 1.0, 0.5)));
        assert!(!aabb.contains_point(&Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_distance2_to_point() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(aabb.distance2_to_point(&Vec3::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(aabb.distance2_to_point(&Vec3::new(2.0, 0.5, 0.5)), 1.0);
        assert_eq!(aabb.distance2_to_point(&Vec3::new(2.0, 2.0, 0.5)), 2.0);
    }

    #[test]
    fn test_compute_divisions_cube() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let (divs, adjusted) = aabb.compute_divisions(64);
        // The cube root of the scaled target computes just below 12, so the
        // per-axis floor lands on 3.
        assert_eq!(divs, [3, 3, 3]);
        assert_eq!(adjusted, aabb);
    }

    #[test]
    fn test_compute_divisions_never_exceeds_target() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 1.0, 0.1));
        let (divs, _) = aabb.compute_divisions(100);
        assert!(divs[0] * divs[1] * divs[2] <= 100);
        assert!(divs.iter().all(|&d| d >= 1));
    }

    #[test]
    fn test_compute_divisions_planar() {
        // Zero-width z side gets one division and padded bounds.
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 0.0));
        let (divs, adjusted) = aabb.compute_divisions(16);
        assert_eq!(divs[2], 1);
        assert!(adjusted.max.z > adjusted.min.z);
    }

    #[test]
    fn test_compute_divisions_degenerate_point() {
        let aabb = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0));
        let (divs, adjusted) = aabb.compute_divisions(1000);
        assert_eq!(divs, [1, 1, 1]);
        assert!(adjusted.lengths().x > 0.0);
    }

    #[test]
    fn test_min_inflate_planar() {
        let mut aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 0.0));
        aabb.min_inflate();
        assert!(aabb.max.z > 0.0 && aabb.min.z < 0.0);
        // Non-degenerate sides untouched.
        assert_eq!(aabb.max.x, 2.0);
    }
}
