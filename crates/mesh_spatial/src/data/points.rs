//! Growable 3-component point buffer
//!
//! Flat `f64` storage with amortized geometric growth, so long insertion
//! sequences stay near-linear instead of reallocating per point.

use crate::foundation::math::Vec3;

/// Append-only, growable sequence of 3-component coordinates.
///
/// Point ids are indices into the buffer and are stable for the lifetime of
/// the buffer: points are never removed, only appended or overwritten in
/// place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    data: Vec<f64>,
}

impl PointBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity * 3),
        }
    }

    /// Number of points in the buffer
    pub fn len(&self) -> usize {
        self.data.len() / 3
    }

    /// True if the buffer holds no points
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a point by id, or `None` when out of range
    pub fn point(&self, id: usize) -> Option<Vec3> {
        let base = id * 3;
        if base + 3 > self.data.len() {
            return None;
        }
        Some(Vec3::new(self.data[base], self.data[base + 1], self.data[base + 2]))
    }

    /// Overwrite an existing point in place. Out-of-range ids are ignored.
    pub fn set_point(&mut self, id: usize, p: &Vec3) {
        let base = id * 3;
        if base + 3 <= self.data.len() {
            self.data[base] = p.x;
            self.data[base + 1] = p.y;
            self.data[base + 2] = p.z;
        }
    }

    /// Append a point and return its id
    pub fn push(&mut self, p: &Vec3) -> usize {
        let id = self.len();
        self.data.extend_from_slice(&[p.x, p.y, p.z]);
        id
    }

    /// Resize to `n` points, truncating or zero-filling
    pub fn set_len(&mut self, n: usize) {
        self.data.resize(n * 3, 0.0);
    }

    /// Bulk read access to the flat coordinate array
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Replace the whole buffer with a flat coordinate array.
    ///
    /// Trailing components that do not form a full point are dropped.
    pub fn set_data(&mut self, data: Vec<f64>) {
        self.data = data;
        self.data.truncate(self.len() * 3);
    }

    /// Iterate over all points in id order
    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.data
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
    }
}

impl FromIterator<Vec3> for PointBuffer {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        let mut buffer = Self::new();
        for p in iter {
            buffer.push(&p);
        }
        buffer
    }
}
