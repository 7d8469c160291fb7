//! Planar polygon helpers shared by the extractor and the extrusion engine.

use glam::DVec2;

/// Points closer than this are treated as the same point.
pub const POINT_EPSILON: f64 = 1e-9;

/// Longest allowed miter, as a multiple of the offset distance.
const MITER_LIMIT: f64 = 2.0;

/// Bisection steps when searching for the largest clean inset.
const INSET_SEARCH_STEPS: u32 = 40;

/// Shoelace area, positive for counter-clockwise rings
pub fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

/// Remove consecutive duplicates and the duplicated closing point.
pub fn dedup_ring(points: &mut Vec<DVec2>) {
    points.dedup_by(|b, a| a.distance(*b) <= POINT_EPSILON);
    while points.len() >= 2 && points[0].distance(points[points.len() - 1]) <= POINT_EPSILON {
        points.pop();
    }
}

/// Even-odd point-in-polygon test
pub fn contains_point(ring: &[DVec2], p: DVec2) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether ring `inner` lies inside ring `outer`.
///
/// Vertices sitting exactly on the other ring's boundary are ambiguous, so the
/// answer is taken from the majority of `inner`'s vertices.
pub fn ring_inside(inner: &[DVec2], outer: &[DVec2]) -> bool {
    if inner.is_empty() {
        return false;
    }
    let hits = inner.iter().filter(|p| contains_point(outer, **p)).count();
    hits * 2 > inner.len()
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Whether insetting every ring by `distance` leaves a valid shape.
///
/// Rings are given as (outer, holes...), outer counter-clockwise and holes
/// clockwise. Every offset edge must keep its direction and every ring its
/// winding; no two offset edges may cross, and offset holes must stay inside
/// the offset outer ring.
pub fn inset_is_simple(rings: &[&[DVec2]], distance: f64) -> bool {
    let insets: Vec<Vec<DVec2>> = rings
        .iter()
        .map(|ring| offset_ring_left(ring, distance))
        .collect();

    for (ring, inset) in rings.iter().zip(&insets) {
        if inset.len() < 3 || !inset.iter().all(|p| p.is_finite()) {
            return false;
        }
        let n = ring.len();
        for i in 0..n {
            let j = (i + 1) % n;
            if (inset[j] - inset[i]).dot(ring[j] - ring[i]) <= 0.0 {
                return false;
            }
        }
        let (before, after) = (signed_area(ring), signed_area(inset));
        if after == 0.0 || before.signum() != after.signum() {
            return false;
        }
    }

    if let Some((outer, holes)) = insets.split_first()
        && !holes.iter().all(|hole| contains_point(outer, hole[0]))
    {
        return false;
    }

    let edges: Vec<(usize, usize, DVec2, DVec2)> = insets
        .iter()
        .enumerate()
        .flat_map(|(r, ring)| {
            let n = ring.len();
            (0..n).map(move |i| (r, i, ring[i], ring[(i + 1) % n]))
        })
        .collect();
    for (k, &(ra, ia, a0, a1)) in edges.iter().enumerate() {
        for &(rb, ib, b0, b1) in &edges[k + 1..] {
            if ra == rb {
                let n = insets[ra].len();
                if ib == (ia + 1) % n || ia == (ib + 1) % n {
                    continue;
                }
            }
            if segments_intersect(a0, a1, b0, b1) {
                return false;
            }
        }
    }
    true
}

/// Largest inset up to `limit` for which [`inset_is_simple`] holds.
///
/// Returns `limit` when it already fits, otherwise bisects toward the
/// boundary from below.
pub fn max_simple_inset(rings: &[&[DVec2]], limit: f64) -> f64 {
    if limit <= 0.0 || inset_is_simple(rings, limit) {
        return limit.max(0.0);
    }
    let (mut lo, mut hi) = (0.0, limit);
    for _ in 0..INSET_SEARCH_STEPS {
        let mid = 0.5 * (lo + hi);
        if inset_is_simple(rings, mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Closed segments `a0`-`a1` and `b0`-`b1` share at least one point.
pub fn segments_intersect(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> bool {
    let orient = |p: DVec2, q: DVec2, r: DVec2| (q - p).perp_dot(r - p);
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);

    if d1 == 0.0 && d2 == 0.0 && d3 == 0.0 && d4 == 0.0 {
        // Collinear: overlap along the dominant axis
        let axis = if (a1 - a0).abs().max_element() >= (b1 - b0).abs().max_element() {
            a1 - a0
        } else {
            b1 - b0
        };
        let project = |p: DVec2| p.dot(axis);
        let (amin, amax) = min_max(project(a0), project(a1));
        let (bmin, bmax) = min_max(project(b0), project(b1));
        return amin <= bmax && bmin <= amax;
    }
    d1 * d2 <= 0.0 && d3 * d4 <= 0.0
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Offset every vertex of a ring to the left of its direction of travel.
///
/// For a counter-clockwise outer ring, or a clockwise hole, left is inward.
/// Each edge moves by `distance`; corners follow the mitered bisector, limited
/// to [`MITER_LIMIT`] times the distance.
pub fn offset_ring_left(ring: &[DVec2], distance: f64) -> Vec<DVec2> {
    let n = ring.len();
    if distance == 0.0 {
        return ring.to_vec();
    }
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            cur + miter_direction(prev, cur, next) * distance
        })
        .collect()
}

fn left_normal(d: DVec2) -> DVec2 {
    DVec2::new(-d.y, d.x)
}

fn miter_direction(prev: DVec2, cur: DVec2, next: DVec2) -> DVec2 {
    let n1 = left_normal((cur - prev).normalize_or_zero());
    let n2 = left_normal((next - cur).normalize_or_zero());
    let bisector = (n1 + n2).normalize_or_zero();
    if bisector == DVec2::ZERO {
        // Edge doubles back on itself
        return n1;
    }
    let cos_half = bisector.dot(n1);
    let scale = if cos_half > 1.0 / MITER_LIMIT {
        1.0 / cos_half
    } else {
        MITER_LIMIT
    };
    bisector * scale
}
