use nalgebra as na;

pub type Point = na::Point2<f64>;
pub type Vector = na::Vector2<f64>;

/// Tolerance applied to the parametric coordinates of the segment
/// intersection test, so that a segment touching an obstacle edge at a
/// single point still counts as a collision.
pub const EPS: f64 = 1e-9;

#[inline]
pub fn distance(a: &Point, b: &Point) -> f64 {
    na::distance(a, b)
}

/// Euclidean distance that treats a missing endpoint as infinitely far
/// away, so downstream comparisons discard it.
pub fn distance_opt(a: Option<&Point>, b: Option<&Point>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => distance(a, b),
        _ => f64::INFINITY,
    }
}

#[inline]
fn cross(a: &Vector, b: &Vector) -> f64 {
    a.x * b.y - a.y * b.x
}

fn point_on_segment(p: &Point, a: &Point, b: &Point) -> bool {
    let ab = b - a;
    let ap = p - a;
    if cross(&ab, &ap).abs() > EPS * ab.norm().max(1.0) {
        return false;
    }
    let len_sq = ab.norm_squared();
    if len_sq < EPS {
        return distance(p, a) < EPS;
    }
    let t = ap.dot(&ab) / len_sq;
    (-EPS..=1.0 + EPS).contains(&t)
}

/// Determinant-based segment intersection. Collinear overlapping segments
/// intersect, parallel disjoint segments do not, and touching at an
/// endpoint counts as an intersection.
pub fn segments_intersect(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> bool {
    let r = a2 - a1;
    let s = b2 - b1;
    let q = b1 - a1;

    let denom = cross(&r, &s);
    if denom.abs() < EPS {
        // Parallel. Only collinear segments can still intersect.
        if cross(&q, &r).abs() > EPS * r.norm().max(1.0) {
            return false;
        }
        let len_sq = r.norm_squared();
        if len_sq < EPS {
            // `a` is degenerate, fall back to a point-on-segment check.
            return point_on_segment(a1, b1, b2);
        }
        // Project both endpoints of `b` onto `a` and test interval overlap.
        let t0 = q.dot(&r) / len_sq;
        let t1 = t0 + s.dot(&r) / len_sq;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= -EPS && lo <= 1.0 + EPS;
    }

    let t = cross(&q, &s) / denom;
    let u = cross(&q, &r) / denom;
    (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u)
}

/// Axis-aligned rectangular obstacle, boundary inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Rect {
        debug_assert!(w >= 0.0 && h >= 0.0);
        Rect { x, y, w, h }
    }

    pub fn contains(&self, p: &Point) -> bool {
        (self.x..=self.x + self.w).contains(&p.x) && (self.y..=self.y + self.h).contains(&p.y)
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.w, self.y),
            Point::new(self.x + self.w, self.y + self.h),
            Point::new(self.x, self.y + self.h),
        ]
    }

    /// The four boundary edges, in drawing order.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> {
        let [a, b, c, d] = self.corners();
        [(a, b), (b, c), (c, d), (d, a)].into_iter()
    }

    pub fn intersects_segment(&self, from: &Point, to: &Point) -> bool {
        self.edges()
            .any(|(e1, e2)| segments_intersect(from, to, &e1, &e2))
    }
}

/// Wrapper giving `f64` a total order over the non-NaN values the planners
/// produce, for `min_by_key` and heap ordering.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct OrdF64(pub f64);

impl Eq for OrdF64 {}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap()
    }
}

pub trait ToOrd {
    fn to_ord(self) -> OrdF64;
}

impl ToOrd for f64 {
    #[inline]
    fn to_ord(self) -> OrdF64 {
        OrdF64(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(&p(0.0, 0.0), &p(3.0, 4.0)), 5.0);
    }

    #[test]
    fn distance_opt_discards_missing_endpoints() {
        let a = p(0.0, 0.0);
        assert_eq!(distance_opt(Some(&a), None), f64::INFINITY);
        assert_eq!(distance_opt(None, Some(&a)), f64::INFINITY);
        assert_eq!(distance_opt(Some(&a), Some(&p(3.0, 4.0))), 5.0);
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(10.0, 10.0),
            &p(0.0, 10.0),
            &p(10.0, 0.0),
        ));
    }

    #[test]
    fn parallel_disjoint_segments_do_not_intersect() {
        assert!(!segments_intersect(
            &p(0.0, 0.0),
            &p(10.0, 0.0),
            &p(0.0, 1.0),
            &p(10.0, 1.0),
        ));
    }

    #[test]
    fn collinear_overlapping_segments_intersect() {
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(10.0, 0.0),
            &p(5.0, 0.0),
            &p(15.0, 0.0),
        ));
        // Same line, disjoint intervals.
        assert!(!segments_intersect(
            &p(0.0, 0.0),
            &p(4.0, 0.0),
            &p(5.0, 0.0),
            &p(15.0, 0.0),
        ));
    }

    #[test]
    fn endpoint_touch_counts_as_intersection() {
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(5.0, 5.0),
            &p(5.0, 5.0),
            &p(10.0, 0.0),
        ));
    }

    #[test]
    fn rect_contains_is_boundary_inclusive() {
        let r = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert!(r.contains(&p(22.0, 22.0)));
        assert!(r.contains(&p(20.0, 20.0)));
        assert!(r.contains(&p(25.0, 25.0)));
        assert!(!r.contains(&p(30.0, 30.0)));
        assert!(!r.contains(&p(19.999, 22.0)));
    }

    #[test]
    fn rect_segment_collision_cases() {
        let r = Rect::new(20.0, 20.0, 5.0, 5.0);
        // Diagonal through the corner.
        assert!(r.intersects_segment(&p(19.0, 19.0), &p(23.0, 23.0)));
        // Passes through the obstacle.
        assert!(r.intersects_segment(&p(18.0, 22.0), &p(27.0, 22.0)));
        // Rides along the bottom edge.
        assert!(r.intersects_segment(&p(18.0, 20.0), &p(27.0, 20.0)));
        // Starts inside, exits through the right edge.
        assert!(r.intersects_segment(&p(22.0, 22.0), &p(27.0, 22.0)));
        // Ends inside.
        assert!(r.intersects_segment(&p(18.0, 22.0), &p(22.0, 22.0)));
        // Misses entirely.
        assert!(!r.intersects_segment(&p(10.0, 10.0), &p(30.0, 22.0)));
    }
}
