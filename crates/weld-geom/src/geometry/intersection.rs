use super::curves::Line3d;
use super::point::{Point2d, Point3d};
use super::surfaces::Plane;

/// Intersection line of two planes. `None` when the planes are parallel
/// (coincident or disjoint) within `angular_tol`.
///
/// The line direction is `p1.normal × p2.normal`.
pub fn plane_plane(p1: &Plane, p2: &Plane, angular_tol: f64) -> Option<Line3d> {
    let dir = p1.normal.cross(&p2.normal);
    let len = dir.length();
    if len < angular_tol.max(1e-12) {
        return None;
    }
    let dir = dir / len;

    let d1 = p1.origin.to_vec3().dot(&p1.normal);
    let d2 = p2.origin.to_vec3().dot(&p2.normal);

    let n1n2 = p1.normal.dot(&p2.normal);
    let denom = 1.0 - n1n2 * n1n2;
    if denom.abs() < 1e-15 {
        return None;
    }

    let c1 = (d1 - d2 * n1n2) / denom;
    let c2 = (d2 - d1 * n1n2) / denom;
    let origin = Point3d::ORIGIN + p1.normal * c1 + p2.normal * c2;

    Some(Line3d {
        origin,
        direction: dir,
    })
}

/// Whether two closed 2D segments intersect. Endpoint contact counts.
pub fn segments_intersect_2d(a0: Point2d, a1: Point2d, b0: Point2d, b1: Point2d, tol: f64) -> bool {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.perp_dot(&db);
    let diff = b0 - a0;

    if denom.abs() < 1e-15 {
        // Parallel: only collinear overlap counts.
        if diff.perp_dot(&da).abs() > tol * da.length().max(1.0) {
            return false;
        }
        let len_sq = da.dot(&da);
        if len_sq < 1e-30 {
            return a0.distance_to(&b0) < tol;
        }
        let t0 = diff.dot(&da) / len_sq;
        let t1 = (b1 - a0).dot(&da) / len_sq;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= -tol && lo <= 1.0 + tol;
    }

    let t = diff.perp_dot(&db) / denom;
    let u = diff.perp_dot(&da) / denom;
    let eps_a = tol / da.length().max(1e-12);
    let eps_b = tol / db.length().max(1e-12);
    (-eps_a..=1.0 + eps_a).contains(&t) && (-eps_b..=1.0 + eps_b).contains(&u)
}

/// Circle through three points as (center, radius). `None` when collinear.
pub fn circle_through_points(a: Point2d, b: Point2d, c: Point2d) -> Option<(Point2d, f64)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    let scale = [a, b, c]
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0f64, f64::max);
    if d.abs() < 1e-12 * scale * scale {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = Point2d::new(ux, uy);
    Some((center, center.distance_to(&a)))
}
