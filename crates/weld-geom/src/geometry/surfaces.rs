use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// An infinite plane with an in-plane basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub normal: Vec3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl Plane {
    /// `None` when `normal` has zero length.
    pub fn new(origin: Point3d, normal: Vec3) -> Option<Self> {
        let normal = normal.normalized()?;
        let u_axis = normal.any_perpendicular()?;
        let v_axis = normal.cross(&u_axis);
        Some(Self {
            origin,
            normal,
            u_axis,
            v_axis,
        })
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project_point(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.signed_distance(p)
    }

    /// In-plane (u, v) coordinates of the projection of `p`.
    pub fn parameters_of(&self, p: &Point3d) -> [f64; 2] {
        let d = *p - self.origin;
        [d.dot(&self.u_axis), d.dot(&self.v_axis)]
    }

    pub fn evaluate(&self, uv: [f64; 2]) -> Point3d {
        self.origin + self.u_axis * uv[0] + self.v_axis * uv[1]
    }

    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            normal: -self.normal,
            u_axis: self.v_axis,
            v_axis: self.u_axis,
        }
    }
}

/// A cylinder around an axis line. Parameters are (angle, height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    /// Point on the axis at height zero.
    pub origin: Point3d,
    /// Unit axis direction.
    pub axis: Vec3,
    pub radius: f64,
    /// Reference direction for angle zero, orthogonal to `axis`.
    pub ref_dir: Vec3,
}

impl Cylinder {
    pub fn new(origin: Point3d, axis: Vec3, radius: f64) -> Option<Self> {
        let axis = axis.normalized()?;
        let ref_dir = axis.any_perpendicular()?;
        Some(Self {
            origin,
            axis,
            radius,
            ref_dir,
        })
    }

    fn binormal(&self) -> Vec3 {
        self.axis.cross(&self.ref_dir)
    }

    pub fn evaluate(&self, param: [f64; 2]) -> Point3d {
        let [angle, height] = param;
        let radial = self.ref_dir * angle.cos() + self.binormal() * angle.sin();
        self.origin + self.axis * height + radial * self.radius
    }

    /// Outward unit normal at a parameter.
    pub fn normal_at(&self, param: [f64; 2]) -> Vec3 {
        self.ref_dir * param[0].cos() + self.binormal() * param[0].sin()
    }

    /// Parameters of the surface point nearest `p`. Points on the axis map
    /// to angle zero.
    pub fn parameters_of(&self, p: &Point3d) -> [f64; 2] {
        let d = *p - self.origin;
        let height = d.dot(&self.axis);
        let radial = d - self.axis * height;
        let angle = radial.dot(&self.binormal()).atan2(radial.dot(&self.ref_dir));
        [angle, height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_projection_and_parameters_agree() {
        let plane = Plane::new(Point3d::new(0.0, 0.0, 5.0), Vec3::Z).unwrap();
        let p = Point3d::new(3.0, -2.0, 9.0);
        assert_relative_eq!(plane.signed_distance(&p), 4.0);
        let uv = plane.parameters_of(&p);
        let back = plane.evaluate(uv);
        let proj = plane.project_point(&p);
        assert_relative_eq!(back.distance_to(&proj), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cylinder_parameters_round_trip() {
        let cyl = Cylinder::new(Point3d::ORIGIN, Vec3::Z, 2.0).unwrap();
        let p = cyl.evaluate([0.7, 3.0]);
        let param = cyl.parameters_of(&p);
        assert_relative_eq!(param[0], 0.7, epsilon = 1e-12);
        assert_relative_eq!(param[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(cyl.normal_at(param).dot(&Vec3::Z), 0.0, epsilon = 1e-12);
    }
}
