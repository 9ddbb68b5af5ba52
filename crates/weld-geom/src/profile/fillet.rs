use std::f64::consts::PI;

use tracing::debug;
use weld_types::{DimensionConvention, SideConfig, WeldShape};

use super::{cap_offset, ProfileCurve, ProfileError, ProfileSegment, Segment, SegmentRole};
use crate::geometry::point::Point2d;
use crate::geometry::vector::Vec2;
use crate::Tolerance;

/// Fillet cross-section and the measurements it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct FilletSection {
    pub curve: ProfileCurve,
    /// Distance from the root to each leg end.
    pub leg_length: f64,
    /// Angle between the two face directions.
    pub dihedral: f64,
    /// Distance from the root to the chord mid-point.
    pub apex_distance: f64,
    /// Leg end points on face 1 and face 2.
    pub legs: [Point2d; 2],
}

/// Leg length for a requested `size` at dihedral `theta`.
pub fn leg_length(
    size: f64,
    theta: f64,
    convention: DimensionConvention,
) -> Result<f64, ProfileError> {
    let divisor = match convention {
        DimensionConvention::Side => 1.0,
        DimensionConvention::Height => (theta / 2.0).cos(),
        DimensionConvention::Perpendicular => theta.sin(),
    };
    if divisor.abs() < 1e-12 {
        return Err(ProfileError::DegenerateAngle { angle: theta });
    }
    Ok(size / divisor)
}

/// Build the fillet loop in frame-local coordinates.
///
/// `d1` and `d2` are the local directions of face 1 and face 2 running away
/// from the root at the origin. Loop order is leg 1, cap, leg 2.
pub fn fillet_section(
    d1: Vec2,
    d2: Vec2,
    side: &SideConfig,
    tol: &Tolerance,
) -> Result<FilletSection, ProfileError> {
    let size = side
        .size
        .ok_or(ProfileError::MissingParameter { name: "size" })?;
    if !size.is_finite() || size <= 0.0 {
        return Err(ProfileError::InvalidParameter {
            name: "size",
            reason: format!("must be positive, got {size}"),
        });
    }

    let (d1, d2) = match (d1.normalized(), d2.normalized()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(ProfileError::DegenerateAngle { angle: 0.0 }),
    };
    let theta = d1.angle_to(&d2);
    if theta < tol.angular || theta > PI - tol.angular {
        return Err(ProfileError::DegenerateAngle { angle: theta });
    }

    let leg = leg_length(size, theta, side.dimension)?;
    let apex = leg * (theta / 2.0).cos();
    let origin = Point2d::ORIGIN;
    let p1 = origin + d1 * leg;
    let p2 = origin + d2 * leg;

    let cap = match side.shape {
        WeldShape::Flat => Segment::line(p1, p2),
        shape => {
            let offset = cap_offset(side, apex)?;
            let bisector = (d1 + d2)
                .normalized()
                .ok_or(ProfileError::DegenerateAngle { angle: theta })?;
            let reach = match shape {
                WeldShape::Convex => apex + offset,
                _ => {
                    if offset >= apex {
                        return Err(ProfileError::InvalidParameter {
                            name: "offset",
                            reason: format!(
                                "concave offset {offset} reaches the root (apex at {apex})"
                            ),
                        });
                    }
                    apex - offset
                }
            };
            Segment::arc(p1, origin + bisector * reach, p2)
        }
    };

    let segments = vec![
        ProfileSegment::new(SegmentRole::Leg1, Segment::line(origin, p1)),
        ProfileSegment::new(SegmentRole::Cap, cap),
        ProfileSegment::new(SegmentRole::Leg2, Segment::line(p2, origin)),
    ];
    let curve = ProfileCurve::from_segments(segments, tol.coincidence)?;
    debug!(leg, theta, apex, shape = ?side.shape, "fillet section");

    Ok(FilletSection {
        curve,
        leg_length: leg,
        dihedral: theta,
        apex_distance: apex,
        legs: [p1, p2],
    })
}
