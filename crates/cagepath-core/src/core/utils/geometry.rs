use nalgebra::{Point3, Unit, Vector3};

/// Absolute tolerance used when two coordinates are compared for equality.
pub const POINT_EPSILON: f64 = 1e-6;

/// Returns `true` when every coordinate of `a` and `b` differs by at most `tolerance`.
pub fn approx_eq(a: &Point3<f64>, b: &Point3<f64>, tolerance: f64) -> bool {
    (a - b).iter().all(|d| d.abs() <= tolerance)
}

/// Midpoint of two points.
pub fn merge(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    nalgebra::center(a, b)
}

/// Unit normal of the plane through `a`, `b` and `c`.
///
/// The orientation follows the right-hand rule on `(b - a) x (c - a)`. Returns `None` when
/// the three points are (numerically) collinear and no unique plane exists.
pub fn plane_normal(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<Unit<Vector3<f64>>> {
    let normal = (b - a).cross(&(c - a));
    Unit::try_new(normal, POINT_EPSILON * POINT_EPSILON)
}

/// Unsigned distance from `point` to the plane through `origin` with unit `normal`.
pub fn distance_to_plane(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    normal: &Unit<Vector3<f64>>,
) -> f64 {
    (point - origin).dot(normal).abs()
}

/// Orthogonal projection of `point` onto the plane through `origin` with unit `normal`.
pub fn project_onto_plane(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    normal: &Unit<Vector3<f64>>,
) -> Point3<f64> {
    let offset = (point - origin).dot(normal);
    point - normal.into_inner() * offset
}

/// Closest point to `point` on the segment `[a, b]`.
pub fn closest_point_on_segment(
    point: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    if length_sq <= f64::EPSILON {
        return *a;
    }
    let t = ((point - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Euclidean distance from `point` to the segment `[a, b]`.
pub fn distance_to_segment(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (point - closest_point_on_segment(point, a, b)).norm()
}

/// Component-wise minimum and maximum of a set of points, or `None` for an empty set.
pub fn bounding_box<'a, I>(points: I) -> Option<(Point3<f64>, Point3<f64>)>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    Some(iter.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p))))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn approx_eq_respects_tolerance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-7, 2.0, 3.0 - 1e-7);
        assert!(approx_eq(&a, &b, POINT_EPSILON));
        assert!(!approx_eq(&a, &Point3::new(1.1, 2.0, 3.0), POINT_EPSILON));
    }

    #[test]
    fn merge_returns_midpoint() {
        let m = merge(&Point3::new(0.0, 0.0, 0.0), &Point3::new(2.0, -4.0, 6.0));
        assert!(approx_eq(&m, &Point3::new(1.0, -2.0, 3.0), EPS));
    }

    #[test]
    fn plane_normal_of_xy_plane_points_along_z() {
        let n = plane_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!((n.z - 1.0).abs() < EPS);
        assert!(n.x.abs() < EPS && n.y.abs() < EPS);
    }

    #[test]
    fn plane_normal_is_none_for_collinear_points() {
        let n = plane_normal(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 1.0),
            &Point3::new(2.0, 2.0, 2.0),
        );
        assert!(n.is_none());
    }

    #[test]
    fn projection_lands_on_plane_at_expected_distance() {
        let origin = Point3::origin();
        let normal = Unit::new_normalize(Vector3::z());
        let p = Point3::new(3.0, -1.0, 2.5);
        assert!((distance_to_plane(&p, &origin, &normal) - 2.5).abs() < EPS);
        let projected = project_onto_plane(&p, &origin, &normal);
        assert!(approx_eq(&projected, &Point3::new(3.0, -1.0, 0.0), EPS));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        assert!((distance_to_segment(&Point3::new(1.0, 1.0, 0.0), &a, &b) - 1.0).abs() < EPS);
        assert!((distance_to_segment(&Point3::new(-3.0, 4.0, 0.0), &a, &b) - 5.0).abs() < EPS);
        assert!((distance_to_segment(&Point3::new(5.0, 0.0, 0.0), &a, &b) - 3.0).abs() < EPS);
    }

    #[test]
    fn degenerate_segment_behaves_like_a_point() {
        let a = Point3::new(1.0, 1.0, 1.0);
        assert!((distance_to_segment(&Point3::new(1.0, 1.0, 3.0), &a, &a) - 2.0).abs() < EPS);
    }

    #[test]
    fn bounding_box_covers_all_points() {
        let points = [
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 4.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let (min, max) = bounding_box(points.iter()).unwrap();
        assert!(approx_eq(&min, &Point3::new(-1.0, -2.0, 0.0), EPS));
        assert!(approx_eq(&max, &Point3::new(1.0, 4.0, 3.0), EPS));
        assert!(bounding_box(std::iter::empty()).is_none());
    }
}
