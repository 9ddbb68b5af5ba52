use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::curves::Line3d;
use crate::geometry::intersection::plane_plane;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::Plane;
use crate::geometry::vector::{Vec2, Vec3};
use crate::Tolerance;

/// Errors from frame construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// The two planes never meet; callers skip the candidate.
    #[error("planes are parallel, no intersection line")]
    ParallelPlanes,

    #[error("degenerate frame: {reason}")]
    Degenerate { reason: String },
}

/// Plane hosting a weld cross-section.
///
/// `normal` runs along the weld line, `x_axis` lies in the section plane and
/// the local y axis is `normal × x_axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeldFrame {
    pub origin: Point3d,
    pub normal: Vec3,
    pub x_axis: Vec3,
}

impl WeldFrame {
    /// Orthonormalizes `x_axis` against `normal`.
    pub fn new(origin: Point3d, normal: Vec3, x_axis: Vec3) -> Result<Self, FrameError> {
        let normal = normal.normalized().ok_or_else(|| FrameError::Degenerate {
            reason: "zero-length normal".into(),
        })?;
        let x_axis = x_axis
            .reject_from(&normal)
            .normalized()
            .ok_or_else(|| FrameError::Degenerate {
                reason: "x axis is parallel to the normal".into(),
            })?;
        Ok(Self {
            origin,
            normal,
            x_axis,
        })
    }

    /// Frame along a weld-line `tangent` whose local y axis points along
    /// `up`. The tangent sign is chosen to make the frame right-handed.
    pub fn aligned(
        origin: Point3d,
        tangent: Vec3,
        x_axis: Vec3,
        up: Vec3,
    ) -> Result<Self, FrameError> {
        let frame = Self::new(origin, tangent, x_axis)?;
        if frame.y_axis().dot(&up) < 0.0 {
            Ok(Self {
                normal: -frame.normal,
                ..frame
            })
        } else {
            Ok(frame)
        }
    }

    pub fn y_axis(&self) -> Vec3 {
        self.normal.cross(&self.x_axis)
    }

    pub fn to_local(&self, p: &Point3d) -> Point2d {
        let d = *p - self.origin;
        Point2d::new(d.dot(&self.x_axis), d.dot(&self.y_axis()))
    }

    pub fn to_world(&self, p: Point2d) -> Point3d {
        self.origin + self.x_axis * p.x + self.y_axis() * p.y
    }

    pub fn direction_to_local(&self, v: &Vec3) -> Vec2 {
        Vec2::new(v.dot(&self.x_axis), v.dot(&self.y_axis()))
    }

    pub fn direction_to_world(&self, v: Vec2) -> Vec3 {
        self.x_axis * v.x + self.y_axis() * v.y
    }

    /// Signed coordinate of `p` along the frame normal.
    pub fn depth_of(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    /// The same plane with the normal reversed; local y flips, x is kept.
    pub fn reversed(&self) -> Self {
        Self {
            normal: -self.normal,
            ..*self
        }
    }

    /// Reflection across the local line `y = level`: the origin moves by
    /// `2 * level` along y and the y axis reverses.
    pub fn mirrored_across(&self, level: f64) -> Self {
        Self {
            origin: self.origin + self.y_axis() * (2.0 * level),
            ..self.reversed()
        }
    }

    /// Move the origin along the local y axis.
    pub fn offset_y(&self, distance: f64) -> Self {
        Self {
            origin: self.origin + self.y_axis() * distance,
            ..*self
        }
    }

    pub fn plane(&self) -> Plane {
        Plane {
            origin: self.origin,
            normal: self.normal,
            u_axis: self.x_axis,
            v_axis: self.y_axis(),
        }
    }
}

/// Frame derived from two face planes, together with the in-plane face
/// directions pointing away from the intersection line into the weld.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuild {
    pub frame: WeldFrame,
    pub line: Line3d,
    pub face1_dir: Vec3,
    pub face2_dir: Vec3,
}

/// Build the weld frame at the intersection of two face planes.
///
/// The origin is the point of the intersection line closest to `reference`
/// (or the line's own origin). `face1_dir = normal × n1` runs along face 1
/// toward the side face 2 faces; `face2_dir = −(normal × n2)` likewise along
/// face 2. The frame's x axis is `face1_dir`.
pub fn build_frame(
    plane1: &Plane,
    plane2: &Plane,
    reference: Option<&Point3d>,
    tol: &Tolerance,
) -> Result<FrameBuild, FrameError> {
    let line = plane_plane(plane1, plane2, tol.angular).ok_or(FrameError::ParallelPlanes)?;
    let origin = match reference {
        Some(p) => line.closest_point(p).0,
        None => line.origin,
    };
    let normal = line.direction;

    let face1_dir = normal
        .cross(&plane1.normal)
        .normalized()
        .ok_or(FrameError::ParallelPlanes)?;
    let face2_dir = (-normal.cross(&plane2.normal))
        .normalized()
        .ok_or(FrameError::ParallelPlanes)?;

    let frame = WeldFrame::new(origin, normal, face1_dir)?;
    debug!(
        origin = ?[origin.x, origin.y, origin.z],
        dihedral = face1_dir.angle_to(&face2_dir),
        "built weld frame"
    );
    Ok(FrameBuild {
        frame,
        line,
        face1_dir,
        face2_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn corner_planes() -> (Plane, Plane) {
        // Horizontal plate top at z = 0, vertical plate side at x = 10.
        let top = Plane::new(Point3d::ORIGIN, Vec3::Z).unwrap();
        let side = Plane::new(Point3d::new(10.0, 0.0, 0.0), Vec3::X).unwrap();
        (top, side)
    }

    #[test]
    fn face_directions_point_into_the_weld() {
        let (top, side) = corner_planes();
        let build = build_frame(&top, &side, None, &Tolerance::default()).unwrap();
        assert_relative_eq!(build.face1_dir.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(build.face2_dir.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            build.face1_dir.angle_to(&build.face2_dir),
            FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn origin_is_projection_of_reference() {
        let (top, side) = corner_planes();
        let reference = Point3d::new(11.0, 42.0, 3.0);
        let build = build_frame(&top, &side, Some(&reference), &Tolerance::default()).unwrap();
        assert_relative_eq!(build.frame.origin.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(build.frame.origin.y, 42.0, epsilon = 1e-9);
        assert_relative_eq!(build.frame.origin.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn parallel_faces_yield_no_frame() {
        let a = Plane::new(Point3d::ORIGIN, Vec3::Z).unwrap();
        let b = Plane::new(Point3d::new(0.0, 0.0, 1.0), -Vec3::Z).unwrap();
        let err = build_frame(&a, &b, None, &Tolerance::default()).unwrap_err();
        assert_eq!(err, FrameError::ParallelPlanes);
    }

    #[test]
    fn local_round_trip() {
        let frame = WeldFrame::new(
            Point3d::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::X,
        )
        .unwrap();
        let p = Point2d::new(0.5, -2.0);
        let back = frame.to_local(&frame.to_world(p));
        assert_relative_eq!(back.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(back.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn aligned_frame_points_y_up() {
        let frame = WeldFrame::aligned(Point3d::ORIGIN, Vec3::Y, Vec3::X, Vec3::Z).unwrap();
        assert_relative_eq!(frame.y_axis().z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.normal.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn mirror_across_level_reverses_y() {
        let frame = WeldFrame::aligned(Point3d::ORIGIN, Vec3::Y, Vec3::X, Vec3::Z).unwrap();
        let mirrored = frame.mirrored_across(2.5);
        assert_relative_eq!(mirrored.origin.z, 5.0, epsilon = 1e-12);
        assert_relative_eq!(mirrored.y_axis().z, -1.0, epsilon = 1e-12);
        // A point at local y = 1 in the mirror sits at world z = 4.
        let p = mirrored.to_world(Point2d::new(0.0, 1.0));
        assert_relative_eq!(p.z, 4.0, epsilon = 1e-12);
    }
}
