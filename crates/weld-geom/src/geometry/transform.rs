use serde::{Deserialize, Serialize};

use super::curves::Line3d;
use super::point::Point3d;
use super::vector::Vec3;

/// A 4x4 affine transformation matrix stored in column-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column-major 4x4 matrix entries.
    pub m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn translation(v: Vec3) -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            v.x, v.y, v.z, 1.0,
        ];
        Self { m }
    }

    /// Rotation about an axis through the origin (Rodrigues' formula).
    /// `None` when the axis has zero length.
    pub fn rotation_axis_angle(axis: Vec3, angle: f64) -> Option<Self> {
        let axis = axis.normalized()?;
        let c = angle.cos();
        let s = angle.sin();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);

        #[rustfmt::skip]
        let m = [
            t*x*x + c,     t*x*y + s*z,   t*x*z - s*y,   0.0,
            t*x*y - s*z,   t*y*y + c,     t*y*z + s*x,   0.0,
            t*x*z + s*y,   t*y*z - s*x,   t*z*z + c,     0.0,
            0.0,           0.0,           0.0,           1.0,
        ];
        Some(Self { m })
    }

    /// Rotation by `angle` radians about an arbitrary line in space.
    pub fn rotation_about_line(line: &Line3d, angle: f64) -> Option<Self> {
        let rotate = Self::rotation_axis_angle(line.direction, angle)?;
        let to_origin = Self::translation(-line.origin.to_vec3());
        let back = Self::translation(line.origin.to_vec3());
        Some(back.then(&rotate).then(&to_origin))
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.m[col * 4 + row]
    }

    pub fn transform_point(&self, p: &Point3d) -> Point3d {
        let x = self.at(0, 0) * p.x + self.at(0, 1) * p.y + self.at(0, 2) * p.z + self.at(0, 3);
        let y = self.at(1, 0) * p.x + self.at(1, 1) * p.y + self.at(1, 2) * p.z + self.at(1, 3);
        let z = self.at(2, 0) * p.x + self.at(2, 1) * p.y + self.at(2, 2) * p.z + self.at(2, 3);
        Point3d::new(x, y, z)
    }

    /// Transform a direction (no translation).
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let x = self.at(0, 0) * v.x + self.at(0, 1) * v.y + self.at(0, 2) * v.z;
        let y = self.at(1, 0) * v.x + self.at(1, 1) * v.y + self.at(1, 2) * v.z;
        let z = self.at(2, 0) * v.x + self.at(2, 1) * v.y + self.at(2, 2) * v.z;
        Vec3::new(x, y, z)
    }

    /// Matrix product `self * other`: `other` is applied first.
    pub fn then(&self, other: &Transform) -> Transform {
        let mut result = [0.0f64; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.at(row, k) * other.at(k, col);
                }
                result[col * 4 + row] = sum;
            }
        }
        Transform { m: result }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut bb = *self;
        bb.expand_to_include(&other.min);
        bb.expand_to_include(&other.max);
        bb
    }

    /// Overlap test where boxes closer than `tol` count as touching.
    pub fn intersects(&self, other: &Self, tol: f64) -> bool {
        self.min.x <= other.max.x + tol
            && self.max.x >= other.min.x - tol
            && self.min.y <= other.max.y + tol
            && self.max.y >= other.min.y - tol
            && self.min.z <= other.max.z + tol
            && self.max.z >= other.min.z - tol
    }

    /// Euclidean gap between two boxes, zero when they overlap.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let gap = |lo_a: f64, hi_a: f64, lo_b: f64, hi_b: f64| {
            (lo_b - hi_a).max(lo_a - hi_b).max(0.0)
        };
        let dx = gap(self.min.x, self.max.x, other.min.x, other.max.x);
        let dy = gap(self.min.y, self.max.y, other.min.y, other.max.y);
        let dz = gap(self.min.z, self.max.z, other.min.z, other.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f64 {
        self.size().length()
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Project the box onto a unit direction through `origin`, returning the
    /// parameter range its corners cover.
    pub fn extent_along(&self, origin: &Point3d, direction: &Vec3) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for corner in self.corners() {
            let t = (corner - *origin).dot(direction);
            lo = lo.min(t);
            hi = hi.max(t);
        }
        (lo, hi)
    }

    pub fn corners(&self) -> [Point3d; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3d::new(a.x, a.y, a.z),
            Point3d::new(b.x, a.y, a.z),
            Point3d::new(b.x, b.y, a.z),
            Point3d::new(a.x, b.y, a.z),
            Point3d::new(a.x, a.y, b.z),
            Point3d::new(b.x, a.y, b.z),
            Point3d::new(b.x, b.y, b.z),
            Point3d::new(a.x, b.y, b.z),
        ]
    }
}
