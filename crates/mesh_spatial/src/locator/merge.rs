//! Point-merge locator
//!
//! Deduplicates coincident points within a tolerance and answers
//! nearest-point queries. Points live in a caller-visible [`PointBuffer`];
//! the locator appends unique points to it and indexes every point in a
//! sparse bucket table over a uniform grid.
//!
//! Ids are insertion-ordered and stable: the id returned for a point is its
//! index in the buffer forever.

use std::collections::HashMap;

use log::error;
use thiserror::Error;

use crate::data::points::PointBuffer;
use crate::foundation::bounds::Aabb;
use crate::foundation::math::{distance2_between_points, Vec3};
use crate::locator::grid::BucketGrid;

/// Errors raised while setting up a locator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// The supplied bounds were inverted or non-finite
    #[error("a valid bounding box is required for point insertion")]
    InvalidBounds,

    /// `build_locator` was called before `init_point_insertion`
    #[error("locator has not been initialized for point insertion")]
    NotInitialized,
}

/// Outcome of [`PointMergeLocator::insert_unique_point`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The point was new and appended to the buffer with this id
    Inserted(usize),
    /// An existing point within tolerance was found; nothing was appended
    Merged(usize),
    /// Invalid input or uninitialized locator; state is unchanged
    Rejected,
}

impl InsertResult {
    /// The id of the unique point, or `None` when rejected
    pub fn id(&self) -> Option<usize> {
        match self {
            Self::Inserted(id) | Self::Merged(id) => Some(*id),
            Self::Rejected => None,
        }
    }

    /// True if the call appended a new point
    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Bucketed point-merging locator.
///
/// Build once per dataset snapshot with [`init_point_insertion`] and
/// [`build_locator`], then issue queries. The locator holds no
/// change-tracking: mutate the points outside it and the answers are stale
/// until rebuilt.
///
/// [`init_point_insertion`]: Self::init_point_insertion
/// [`build_locator`]: Self::build_locator
#[derive(Debug)]
pub struct PointMergeLocator {
    divisions: [usize; 3],
    number_of_points_per_bucket: usize,
    automatic: bool,
    /// Caller-set merge tolerance; when `None` the build derives one from
    /// the bucket size.
    tolerance: Option<f64>,

    bounds: Option<Aabb>,
    estimated_points: usize,
    points: PointBuffer,

    grid: Option<BucketGrid>,
    buckets: HashMap<u64, Vec<usize>>,
    insertion_tol2: f64,
    insertion_level: usize,
}

/// Fraction of the smallest bucket width used as the default merge tolerance
const DEFAULT_TOLERANCE_FRACTION: f64 = 0.01;

const EMPTY_BUCKET: &[usize] = &[];

impl Default for PointMergeLocator {
    fn default() -> Self {
        Self {
            divisions: [50, 50, 50],
            number_of_points_per_bucket: 3,
            automatic: true,
            tolerance: None,
            bounds: None,
            estimated_points: 0,
            points: PointBuffer::new(),
            grid: None,
            buckets: HashMap::new(),
            insertion_tol2: 0.0,
            insertion_level: 1,
        }
    }
}

impl PointMergeLocator {
    /// Create a locator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit grid resolution. Disables automatic sizing.
    pub fn set_divisions(&mut self, divisions: [usize; 3]) {
        self.divisions = [
            divisions[0].max(1),
            divisions[1].max(1),
            divisions[2].max(1),
        ];
        self.automatic = false;
    }

    /// Target point count per bucket for automatic grid sizing
    pub fn set_number_of_points_per_bucket(&mut self, n: usize) {
        self.number_of_points_per_bucket = n.max(1);
    }

    /// Choose divisions automatically from the estimated point count
    pub fn set_automatic(&mut self, automatic: bool) {
        self.automatic = automatic;
    }

    /// Merge tolerance: two points within this distance are the same point.
    ///
    /// When never set, [`build_locator`](Self::build_locator) derives
    /// 1% of the smallest bucket width.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = Some(tolerance.max(0.0));
    }

    /// The effective squared merge tolerance of the last build
    pub fn tolerance2(&self) -> f64 {
        self.insertion_tol2
    }

    /// The points indexed by this locator
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    /// Recover the point buffer, resetting the locator
    pub fn take_points(&mut self) -> PointBuffer {
        self.free_search_structure();
        self.bounds = None;
        std::mem::take(&mut self.points)
    }

    /// Attach a point buffer and bounds for an insertion session.
    ///
    /// The buffer may already hold points; they are bucketed by the next
    /// [`build_locator`](Self::build_locator) call (bulk mode). An estimated
    /// final point count steers automatic grid sizing toward roughly
    /// `number_of_points_per_bucket` points per bucket.
    pub fn init_point_insertion(
        &mut self,
        points: PointBuffer,
        bounds: &Aabb,
        estimated_points: usize,
    ) -> Result<(), LocatorError> {
        if !bounds.is_valid()
            || !bounds.min.iter().all(|c| c.is_finite())
            || !bounds.max.iter().all(|c| c.is_finite())
        {
            error!("a valid bounds is required for point insertion");
            return Err(LocatorError::InvalidBounds);
        }

        self.free_search_structure();
        self.points = points;
        self.bounds = Some(*bounds);
        self.estimated_points = estimated_points;
        Ok(())
    }

    /// Size the grid, allocate the bucket table, and bucket any points
    /// already present in the attached buffer.
    pub fn build_locator(&mut self) -> Result<(), LocatorError> {
        let Some(bounds) = self.bounds else {
            error!("build_locator called before init_point_insertion");
            return Err(LocatorError::NotInitialized);
        };

        let (divisions, adjusted) = if self.automatic && self.estimated_points > 0 {
            let target_bins =
                self.estimated_points.div_ceil(self.number_of_points_per_bucket);
            bounds.compute_divisions(target_bins)
        } else {
            let mut adjusted = bounds;
            adjusted.min_inflate();
            (self.divisions, adjusted)
        };

        let grid = BucketGrid::new(adjusted, divisions);

        let tolerance = self
            .tolerance
            .unwrap_or(DEFAULT_TOLERANCE_FRACTION * grid.min_cell_width());
        self.insertion_tol2 = tolerance * tolerance;

        // Neighborhood shells to search on insertion: enough to cover the
        // tolerance, never more than the grid itself.
        let level = (tolerance / grid.min_cell_width()).ceil() as usize;
        self.insertion_level = level.min(grid.max_divisions()).max(1);

        self.buckets.clear();
        for (id, p) in self.points.iter().enumerate() {
            let key = grid.bucket_key_for_point(&p);
            self.buckets.entry(key).or_default().push(id);
        }
        self.grid = Some(grid);
        Ok(())
    }

    /// Drop the bucket table. The point buffer is untouched.
    pub fn free_search_structure(&mut self) {
        self.grid = None;
        self.buckets.clear();
        self.insertion_tol2 = 0.0;
        self.insertion_level = 1;
    }

    /// Append a point without a duplicate search and return its id.
    ///
    /// Returns `None` for invalid input or before the locator is built.
    pub fn insert_next_point(&mut self, p: &[f64]) -> Option<usize> {
        let p = validate_point(p)?;
        self.grid.as_ref()?;
        Some(self.append_point(&p))
    }

    /// Insert `p` unless a point within tolerance already exists.
    ///
    /// The home bucket and its neighbors (bounded to the valid grid range)
    /// are searched with squared-distance comparison; a hit merges, a miss
    /// appends. Invalid input is rejected without touching any state.
    pub fn insert_unique_point(&mut self, p: &[f64]) -> InsertResult {
        let Some(p) = validate_point(p) else {
            return InsertResult::Rejected;
        };
        if self.grid.is_none() {
            return InsertResult::Rejected;
        }

        match self.find_within_tolerance(&p) {
            Some(id) => InsertResult::Merged(id),
            None => InsertResult::Inserted(self.append_point(&p)),
        }
    }

    /// Id of an already-inserted point within tolerance of `p`, if any.
    ///
    /// Read-only; returns `None` for invalid input, an unbuilt locator, or
    /// no match.
    pub fn is_inserted_point(&self, p: &[f64]) -> Option<usize> {
        let p = validate_point(p)?;
        self.find_within_tolerance(&p)
    }

    /// Id of the closest indexed point to `p`, or `None` when empty.
    ///
    /// Expanding-ring search: buckets are visited shell by shell outward
    /// from the home bucket, and the search stops once the nearest possible
    /// point of the next shell cannot beat the current best.
    pub fn find_closest_point(&self, p: &[f64]) -> Option<usize> {
        let p = validate_point(p)?;
        let grid = self.grid.as_ref()?;

        let ijk = grid.bucket_ijk(&p);
        let min_h = grid.min_cell_width();
        let max_level = grid.max_divisions();

        let mut closest = None;
        let mut min_dist2 = f64::MAX;

        let mut level = 0;
        loop {
            for nei in grid.neighbors(ijk, level) {
                if grid.distance2_to_bucket(&p, nei) >= min_dist2 {
                    continue;
                }
                self.scan_bucket(grid, nei, &p, &mut closest, &mut min_dist2);
            }

            level += 1;
            if level > max_level {
                break;
            }
            if closest.is_some() {
                // Any point in shell `level` is at least level-1 whole
                // buckets away along some axis.
                let ring_min = (level as f64 - 1.0) * min_h;
                if ring_min * ring_min > min_dist2 {
                    break;
                }
            }
        }
        closest
    }

    /// Closest indexed point within `radius` of `p` and its squared
    /// distance, or `None` when nothing lies inside the sphere.
    pub fn find_closest_point_within_radius(
        &self,
        radius: f64,
        p: &[f64],
    ) -> Option<(usize, f64)> {
        let p = validate_point(p)?;
        let grid = self.grid.as_ref()?;
        if radius <= 0.0 {
            return None;
        }

        let radius2 = radius * radius;
        let mut closest = None;
        let mut min_dist2 = radius2;

        // Bucket range overlapping the search sphere.
        let r = Vec3::repeat(radius);
        let lo = grid.bucket_ijk(&(p - r));
        let hi = grid.bucket_ijk(&(p + r));

        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    let nei = [x, y, z];
                    if grid.distance2_to_bucket(&p, nei) > min_dist2 {
                        continue;
                    }
                    self.scan_bucket_within(grid, nei, &p, &mut closest, &mut min_dist2);
                }
            }
        }

        closest.map(|id| (id, min_dist2))
    }

    /// The ids stored in the bucket containing `p`
    pub fn points_in_bucket(&self, p: &[f64]) -> &[usize] {
        let Some(p) = validate_point(p) else {
            return EMPTY_BUCKET;
        };
        let Some(grid) = self.grid.as_ref() else {
            return EMPTY_BUCKET;
        };
        self.buckets
            .get(&grid.bucket_key_for_point(&p))
            .map_or(EMPTY_BUCKET, Vec::as_slice)
    }

    fn append_point(&mut self, p: &Vec3) -> usize {
        // Grid presence was checked by the caller.
        let id = self.points.push(p);
        if let Some(grid) = self.grid.as_ref() {
            let key = grid.bucket_key_for_point(p);
            self.buckets.entry(key).or_default().push(id);
        }
        id
    }

    /// First indexed point within the merge tolerance of `p`, searching the
    /// home bucket first and then outward shells up to the insertion level.
    fn find_within_tolerance(&self, p: &Vec3) -> Option<usize> {
        let grid = self.grid.as_ref()?;
        let ijk = grid.bucket_ijk(p);

        for level in 0..=self.insertion_level {
            for nei in grid.neighbors(ijk, level) {
                let Some(bucket) = self.buckets.get(&grid.bucket_key(nei)) else {
                    continue;
                };
                for &id in bucket {
                    let Some(q) = self.points.point(id) else {
                        continue;
                    };
                    if distance2_between_points(p, &q) <= self.insertion_tol2 {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    fn scan_bucket(
        &self,
        grid: &BucketGrid,
        ijk: [usize; 3],
        p: &Vec3,
        closest: &mut Option<usize>,
        min_dist2: &mut f64,
    ) {
        let Some(bucket) = self.buckets.get(&grid.bucket_key(ijk)) else {
            return;
        };
        for &id in bucket {
            let Some(q) = self.points.point(id) else {
                continue;
            };
            let dist2 = distance2_between_points(p, &q);
            if dist2 < *min_dist2 {
                *min_dist2 = dist2;
                *closest = Some(id);
            }
        }
    }

    fn scan_bucket_within(
        &self,
        grid: &BucketGrid,
        ijk: [usize; 3],
        p: &Vec3,
        closest: &mut Option<usize>,
        min_dist2: &mut f64,
    ) {
        let Some(bucket) = self.buckets.get(&grid.bucket_key(ijk)) else {
            return;
        };
        for &id in bucket {
            let Some(q) = self.points.point(id) else {
                continue;
            };
            let dist2 = distance2_between_points(p, &q);
            if dist2 <= *min_dist2 {
                *min_dist2 = dist2;
                *closest = Some(id);
            }
        }
    }
}

/// A query point must be exactly 3 finite components
fn validate_point(p: &[f64]) -> Option<Vec3> {
    if p.len() != 3 || !p.iter().all(|c| c.is_finite()) {
        return None;
    }
    Some(Vec3::new(p[0], p[1], p[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_locator() -> PointMergeLocator {
        let mut locator = PointMergeLocator::new();
        locator.set_divisions([10, 10, 10]);
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        locator
            .init_point_insertion(PointBuffer::new(), &bounds, 0)
            .unwrap();
        locator.build_locator().unwrap();
        locator
    }

    #[test]
    fn test_insert_unique_point_new_then_duplicate() {
        let mut locator = built_locator();

        let first = locator.insert_unique_point(&[1.0, 2.0, 3.0]);
        assert_eq!(first, InsertResult::Inserted(0));

        let second = locator.insert_unique_point(&[1.0, 2.0, 3.0]);
        assert_eq!(second, InsertResult::Merged(0));
        assert_eq!(locator.points().len(), 1);
    }

    #[test]
    fn test_insertion_ids_are_ordered() {
        let mut locator = built_locator();
        assert_eq!(locator.insert_unique_point(&[1.0, 2.0, 3.0]), InsertResult::Inserted(0));
        assert_eq!(locator.insert_unique_point(&[2.0, 3.0, 4.0]), InsertResult::Inserted(1));
        assert_eq!(locator.insert_unique_point(&[5.0, 6.0, 7.0]), InsertResult::Inserted(2));
        assert_eq!(locator.points().len(), 3);
    }

    #[test]
    fn test_invalid_input_never_mutates_state() {
        let mut locator = built_locator();
        locator.insert_unique_point(&[1.0, 2.0, 3.0]);

        assert_eq!(locator.insert_unique_point(&[]), InsertResult::Rejected);
        assert_eq!(locator.insert_unique_point(&[1.0, 2.0]), InsertResult::Rejected);
        assert_eq!(
            locator.insert_unique_point(&[1.0, f64::NAN, 3.0]),
            InsertResult::Rejected
        );
        assert_eq!(
            locator.insert_unique_point(&[1.0, 2.0, f64::INFINITY]),
            InsertResult::Rejected
        );
        assert_eq!(locator.points().len(), 1);
    }

    #[test]
    fn test_query_before_build_is_a_noop() {
        let mut locator = PointMergeLocator::new();
        assert_eq!(locator.insert_unique_point(&[1.0, 2.0, 3.0]), InsertResult::Rejected);
        assert_eq!(locator.is_inserted_point(&[1.0, 2.0, 3.0]), None);
        assert_eq!(locator.find_closest_point(&[1.0, 2.0, 3.0]), None);
        assert_eq!(locator.find_closest_point_within_radius(1.0, &[1.0, 2.0, 3.0]), None);
        assert_eq!(locator.points().len(), 0);
    }

    #[test]
    fn test_build_before_init_errors() {
        let mut locator = PointMergeLocator::new();
        assert_eq!(locator.build_locator(), Err(LocatorError::NotInitialized));
    }

    #[test]
    fn test_init_rejects_invalid_bounds() {
        let mut locator = PointMergeLocator::new();
        let inverted = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(
            locator.init_point_insertion(PointBuffer::new(), &inverted, 0),
            Err(LocatorError::InvalidBounds)
        );
    }

    #[test]
    fn test_is_inserted_point() {
        let mut locator = built_locator();
        locator.insert_unique_point(&[0.5, 0.5, 1.0]);
        locator.insert_unique_point(&[1.0, 1.0, 1.0]);
        locator.insert_unique_point(&[2.0, 2.0, 2.0]);

        assert_eq!(locator.is_inserted_point(&[0.5, 0.5, 1.0]), Some(0));
        assert_eq!(locator.is_inserted_point(&[1.0, 1.0, 1.0]), Some(1));
        assert_eq!(locator.is_inserted_point(&[2.0, 2.0, 2.0]), Some(2));
        assert_eq!(locator.is_inserted_point(&[9.0, 9.0, 9.0]), None);
    }

    #[test]
    fn test_merge_across_bucket_boundary_either_order() {
        // Two points straddling the boundary at x=1.0 (bucket width 1.0),
        // closer together than the default tolerance of 0.01.
        let a = [0.9999, 2.0, 4.0];
        let b = [1.0001, 2.0, 4.0];

        for pair in [[a, b], [b, a]] {
            let mut locator = built_locator();
            let first = locator.insert_unique_point(&pair[0]);
            let second = locator.insert_unique_point(&pair[1]);
            assert!(first.was_inserted());
            assert_eq!(second, InsertResult::Merged(first.id().unwrap()));
            assert_eq!(locator.points().len(), 1);
        }
    }

    #[test]
    fn test_nearby_but_distinct_points_do_not_merge() {
        let mut locator = built_locator();
        let id1 = locator.insert_unique_point(&[1.4, 2.6, 3.9]).id().unwrap();
        let id2 = locator.insert_unique_point(&[1.5, 2.7, 3.1]).id().unwrap();
        let id3 = locator.insert_unique_point(&[1.0, 2.0, 4.0]).id().unwrap();
        let id4 = locator.insert_unique_point(&[1.0, 2.0, 4.0]).id().unwrap();

        assert_ne!(id1, id2);
        assert_eq!(id3, id4);
        assert_eq!(locator.points().len(), 3);
    }

    #[test]
    fn test_explicit_tolerance_widens_merge() {
        let mut locator = PointMergeLocator::new();
        locator.set_divisions([10, 10, 10]);
        locator.set_tolerance(0.5);
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        locator
            .init_point_insertion(PointBuffer::new(), &bounds, 0)
            .unwrap();
        locator.build_locator().unwrap();

        locator.insert_unique_point(&[5.0, 5.0, 5.0]);
        assert_eq!(
            locator.insert_unique_point(&[5.3, 5.0, 5.0]),
            InsertResult::Merged(0)
        );
    }

    #[test]
    fn test_bulk_mode_buckets_existing_points() {
        let mut points = PointBuffer::new();
        points.push(&Vec3::new(1.0, 1.0, 1.0));
        points.push(&Vec3::new(8.0, 8.0, 8.0));

        let mut locator = PointMergeLocator::new();
        locator.set_divisions([10, 10, 10]);
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        locator.init_point_insertion(points, &bounds, 0).unwrap();
        locator.build_locator().unwrap();

        assert_eq!(locator.is_inserted_point(&[1.0, 1.0, 1.0]), Some(0));
        assert_eq!(
            locator.insert_unique_point(&[8.0, 8.0, 8.0]),
            InsertResult::Merged(1)
        );
    }

    #[test]
    fn test_automatic_divisions_from_estimate() {
        let mut locator = PointMergeLocator::new();
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        locator
            .init_point_insertion(PointBuffer::new(), &bounds, 3000)
            .unwrap();
        locator.build_locator().unwrap();

        // ~1000 target buckets over a cube: about 10 divisions per axis.
        let divs = locator.grid.as_ref().unwrap().divisions();
        assert!(divs.iter().all(|&d| (5..=12).contains(&d)), "divs = {divs:?}");
    }

    #[test]
    fn test_find_closest_point_matches_brute_force() {
        let mut locator = built_locator();

        // Deterministic scattered points.
        let mut coords = Vec::new();
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 11) as f64 / (1u64 << 53) as f64 * 10.0
            };
            coords.push(Vec3::new(next(), next(), next()));
        }
        for p in &coords {
            locator.insert_next_point(&[p.x, p.y, p.z]);
        }

        for query in [
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(0.1, 9.8, 3.3),
            Vec3::new(9.9, 0.0, 0.1),
        ] {
            let found = locator
                .find_closest_point(&[query.x, query.y, query.z])
                .unwrap();
            let brute = coords
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    distance2_between_points(&query, a)
                        .total_cmp(&distance2_between_points(&query, b))
                })
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(found, brute);
        }
    }

    #[test]
    fn test_find_closest_point_empty_locator() {
        let locator = built_locator();
        assert_eq!(locator.find_closest_point(&[5.0, 5.0, 5.0]), None);
    }

    #[test]
    fn test_find_closest_point_within_radius() {
        let mut locator = built_locator();
        locator.insert_unique_point(&[1.0, 1.0, 1.0]);
        locator.insert_unique_point(&[5.0, 5.0, 5.0]);

        let (id, dist2) = locator
            .find_closest_point_within_radius(2.0, &[1.5, 1.0, 1.0])
            .unwrap();
        assert_eq!(id, 0);
        assert!((dist2 - 0.25).abs() < 1e-12);

        // Nothing inside a small sphere far from both points.
        assert_eq!(
            locator.find_closest_point_within_radius(0.5, &[8.0, 8.0, 8.0]),
            None
        );

        // Candidates beyond the radius are ignored even if closest overall.
        assert_eq!(
            locator.find_closest_point_within_radius(1.0, &[3.0, 3.0, 3.0]),
            None
        );
    }

    #[test]
    fn test_points_in_bucket() {
        let mut locator = built_locator();
        locator.insert_unique_point(&[2.5, 2.5, 2.5]);
        locator.insert_unique_point(&[2.6, 2.4, 2.5]);
        locator.insert_unique_point(&[7.5, 7.5, 7.5]);

        assert_eq!(locator.points_in_bucket(&[2.5, 2.5, 2.5]), &[0, 1]);
        assert_eq!(locator.points_in_bucket(&[7.7, 7.7, 7.7]), &[2]);
        assert!(locator.points_in_bucket(&[0.1, 0.1, 0.1]).is_empty());
    }

    #[test]
    fn test_take_points_resets_locator() {
        let mut locator = built_locator();
        locator.insert_unique_point(&[1.0, 2.0, 3.0]);

        let points = locator.take_points();
        assert_eq!(points.len(), 1);
        assert_eq!(locator.insert_unique_point(&[1.0, 2.0, 3.0]), InsertResult::Rejected);
    }
}
