//! Geometry for weld cross-sections: vector math, weld frames, and the
//! closed profile loops for every weld family.

pub mod frame;
pub mod geometry;
pub mod profile;

pub use frame::{build_frame, FrameBuild, FrameError, WeldFrame};
pub use geometry::curves::{Line3d, Segment3d};
pub use geometry::intersection::plane_plane;
pub use geometry::point::{Point2d, Point3d};
pub use geometry::surfaces::{Cylinder, Plane};
pub use geometry::transform::{BoundingBox, Transform};
pub use geometry::vector::{Vec2, Vec3};
pub use profile::{
    butt_section, fillet_section, leg_length, ButtSection, FilletSection, ProfileCurve,
    ProfileError, ProfileSegment, Segment, SegmentRole,
};

use serde::{Deserialize, Serialize};

/// Tolerances shared by every weld computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Points and distances closer than this are considered equal.
    pub coincidence: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// Clearance used when offsetting faces before boolean trims.
    pub boolean: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-6,
            angular: 1e-6,
            boolean: 1e-5,
        }
    }
}

impl Tolerance {
    pub fn equals(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.coincidence
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.coincidence
    }

    pub fn points_coincident(&self, a: &Point3d, b: &Point3d) -> bool {
        a.distance_to(b) < self.coincidence
    }
}
