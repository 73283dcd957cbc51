//! Triangle-triangle intersection
//!
//! Section-line method: intersect each triangle's edges with the other
//! triangle's supporting plane, parameterize the hits along the planes'
//! common line, and report the overlap of the two parameter intervals as a
//! segment in space.

use crate::foundation::math::Vec3;

/// Default slack for the plane-side and edge-parameter tests
pub const DEFAULT_TRIANGLE_TOLERANCE: f64 = 1e-6;

/// Two supporting planes closer than this (in normal and offset) count as
/// coplanar.
const COPLANAR_EPSILON: f64 = 1e-9;

/// Outcome of a triangle-triangle intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriangleIntersection {
    /// The triangles do not touch
    Disjoint,
    /// The supporting planes coincide; coplanar overlap is not resolved
    /// into a segment
    Coplanar,
    /// The triangles cross along the segment from `a` to `b`
    Segment { a: Vec3, b: Vec3 },
}

impl TriangleIntersection {
    /// True if the test produced an intersection segment
    pub fn intersects(&self) -> bool {
        matches!(self, Self::Segment { .. })
    }

    /// The segment endpoints, when present
    pub fn segment(&self) -> Option<(Vec3, Vec3)> {
        match self {
            Self::Segment { a, b } => Some((*a, *b)),
            _ => None,
        }
    }
}

/// Non-normalized normal of the triangle `(v1, v2, v3)`.
///
/// Vertex order fixes the direction: the result is `(v3 - v2) x (v1 - v2)`.
pub fn triangle_normal_direction(v1: &Vec3, v2: &Vec3, v3: &Vec3) -> Vec3 {
    (v3 - v2).cross(&(v1 - v2))
}

/// Unit normal of the triangle `(v1, v2, v3)`.
///
/// A degenerate triangle yields the zero vector.
pub fn triangle_normal(v1: &Vec3, v2: &Vec3, v3: &Vec3) -> Vec3 {
    let n = triangle_normal_direction(v1, v2, v3);
    let length = n.norm();
    if length == 0.0 {
        return n;
    }
    n / length
}

/// Intersect the line `p1..p2` with the plane through `origin` with normal
/// `normal`. Returns the line parameter and the hit point; `None` when the
/// line is parallel to the plane.
fn intersect_plane_with_line(
    p1: &Vec3,
    p2: &Vec3,
    origin: &Vec3,
    normal: &Vec3,
) -> Option<(f64, Vec3)> {
    let p21 = p2 - p1;
    let den = normal.dot(&p21);
    if den == 0.0 {
        return None;
    }
    let num = normal.dot(origin) - normal.dot(p1);
    let t = num / den;
    Some((t, p1 + p21 * t))
}

/// Intersect two triangles with [`DEFAULT_TRIANGLE_TOLERANCE`]
pub fn intersect_triangles(t1: &[Vec3; 3], t2: &[Vec3; 3]) -> TriangleIntersection {
    intersect_triangles_with_tolerance(t1, t2, DEFAULT_TRIANGLE_TOLERANCE)
}

/// Intersect two triangles, reporting the crossing segment when they touch.
///
/// Early-outs: when either triangle lies strictly on one side of the other's
/// supporting plane the triangles are disjoint, and coplanar supporting
/// planes are reported as [`TriangleIntersection::Coplanar`] without
/// resolving any 2D overlap.
pub fn intersect_triangles_with_tolerance(
    t1: &[Vec3; 3],
    t2: &[Vec3; 3],
    tolerance: f64,
) -> TriangleIntersection {
    let n1 = triangle_normal(&t1[0], &t1[1], &t1[2]);
    let n2 = triangle_normal(&t2[0], &t2[1], &t2[2]);
    let s1 = -n1.dot(&t1[0]);
    let s2 = -n2.dot(&t2[0]);

    // Signed distances of the first triangle's vertices from the second
    // triangle's plane. All on one side means no crossing.
    let dist1 = [
        n2.dot(&t1[0]) + s2,
        n2.dot(&t1[1]) + s2,
        n2.dot(&t1[2]) + s2,
    ];
    if dist1[0] * dist1[1] > tolerance && dist1[0] * dist1[2] > tolerance {
        return TriangleIntersection::Disjoint;
    }

    let dist2 = [
        n1.dot(&t2[0]) + s1,
        n1.dot(&t2[1]) + s1,
        n1.dot(&t2[2]) + s1,
    ];
    if dist2[0] * dist2[1] > tolerance && dist2[0] * dist2[2] > tolerance {
        return TriangleIntersection::Disjoint;
    }

    if (n1.x - n2.x).abs() < COPLANAR_EPSILON
        && (n1.y - n2.y).abs() < COPLANAR_EPSILON
        && (n1.z - n2.z).abs() < COPLANAR_EPSILON
        && (s1 - s2).abs() < COPLANAR_EPSILON
    {
        return TriangleIntersection::Coplanar;
    }

    // Common line of the two supporting planes, L = p + t*v.
    let n1n2 = n1.dot(&n2);
    let denom = n1n2 * n1n2 - 1.0;
    let a = (s1 - s2 * n1n2) / denom;
    let b = (s2 - s1 * n1n2) / denom;
    let p = n1 * a + n2 * b;
    let mut v = n1.cross(&n2);
    let v_len = v.norm();
    if v_len == 0.0 {
        return TriangleIntersection::Disjoint;
    }
    v /= v_len;
    let p_along = p.dot(&v);

    // Parameterize each triangle's edge crossings along v. An edge whose
    // far endpoint sits exactly on the plane shows up on the next edge too,
    // so track it for deduplication.
    let mut t1_params = [0.0f64; 3];
    let mut t2_params = [0.0f64; 3];
    let mut count1 = 0usize;
    let mut count2 = 0usize;
    let mut endpoint1 = usize::MAX;
    let mut endpoint2 = usize::MAX;

    for i in 0..3 {
        let id1 = i;
        let id2 = (i + 1) % 3;

        if let Some((t, x)) = intersect_plane_with_line(&t1[id1], &t1[id2], &t2[0], &n2) {
            if t > -tolerance && t < 1.0 + tolerance && count1 < 3 {
                if t > 1.0 - tolerance {
                    endpoint1 = count1;
                }
                t1_params[count1] = x.dot(&v) - p_along;
                count1 += 1;
            }
        }

        if let Some((t, x)) = intersect_plane_with_line(&t2[id1], &t2[id2], &t1[0], &n1) {
            if t > -tolerance && t < 1.0 + tolerance && count2 < 3 {
                if t > 1.0 - tolerance {
                    endpoint2 = count2;
                }
                t2_params[count2] = x.dot(&v) - p_along;
                count2 += 1;
            }
        }
    }

    // Three hits mean a crossing at a shared vertex was counted by both of
    // its edges; drop the duplicate.
    if count1 > 2 {
        count1 -= 1;
        if endpoint1 < 3 {
            t1_params.swap(2, endpoint1);
        }
    }
    if count2 > 2 {
        count2 -= 1;
        if endpoint2 < 3 {
            t2_params.swap(2, endpoint2);
        }
    }
    if count1 != 2 || count2 != 2 {
        return TriangleIntersection::Disjoint;
    }

    if t1_params[0].is_nan()
        || t1_params[1].is_nan()
        || t2_params[0].is_nan()
        || t2_params[1].is_nan()
    {
        return TriangleIntersection::Disjoint;
    }

    if t1_params[0] > t1_params[1] {
        t1_params.swap(0, 1);
    }
    if t2_params[0] > t2_params[1] {
        t2_params.swap(0, 1);
    }

    // Overlap of the two parameter intervals along the common line.
    if t1_params[1] < t2_params[0] || t2_params[1] < t1_params[0] {
        return TriangleIntersection::Disjoint;
    }
    let tt1 = t1_params[0].max(t2_params[0]);
    let tt2 = t1_params[1].min(t2_params[1]);

    TriangleIntersection::Segment {
        a: p + v * tt1,
        b: p + v * tt2,
    }
}
