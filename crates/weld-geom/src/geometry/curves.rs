use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// An infinite line through `origin` with unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Line3d {
    /// `None` when `direction` has zero length.
    pub fn new(origin: Point3d, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.normalized()?,
        })
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// Foot of the perpendicular from `p`, with its line parameter.
    pub fn closest_point(&self, p: &Point3d) -> (Point3d, f64) {
        let t = (*p - self.origin).dot(&self.direction);
        (self.evaluate(t), t)
    }

    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        self.closest_point(p).0.distance_to(p)
    }

    pub fn reversed(&self) -> Self {
        Self {
            origin: self.origin,
            direction: -self.direction,
        }
    }
}

/// A bounded straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment3d {
    pub start: Point3d,
    pub end: Point3d,
}

impl Segment3d {
    pub fn new(start: Point3d, end: Point3d) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn midpoint(&self) -> Point3d {
        self.start.midpoint(&self.end)
    }

    /// Unit direction from start to end. `None` for a degenerate segment.
    pub fn direction(&self) -> Option<Vec3> {
        (self.end - self.start).normalized()
    }

    pub fn as_line(&self) -> Option<Line3d> {
        Line3d::new(self.start, self.end - self.start)
    }

    pub fn closest_point(&self, p: &Point3d) -> Point3d {
        let d = self.end - self.start;
        let len_sq = d.length_squared();
        if len_sq < 1e-30 {
            return self.start;
        }
        let t = ((*p - self.start).dot(&d) / len_sq).clamp(0.0, 1.0);
        self.start + d * t
    }

    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        self.closest_point(p).distance_to(p)
    }

    /// Closest pair of points between two segments, self first.
    pub fn closest_points(&self, other: &Segment3d) -> (Point3d, Point3d) {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;
        let r = self.start - other.start;
        let a = d1.length_squared();
        let e = d2.length_squared();
        let f = d2.dot(&r);
        if a < 1e-30 && e < 1e-30 {
            return (self.start, other.start);
        }
        let (s, t) = if a < 1e-30 {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(&r);
            if e < 1e-30 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(&d2);
                let denom = a * e - b * b;
                let mut s = if denom > 1e-30 {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };
        (self.start + d1 * s, other.start + d2 * t)
    }

    /// True if the segments share an endpoint within `tol`.
    pub fn touches(&self, other: &Segment3d, tol: f64) -> bool {
        [self.start, self.end]
            .iter()
            .any(|a| [other.start, other.end].iter().any(|b| a.distance_to(b) < tol))
    }
}
