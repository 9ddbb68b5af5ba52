use std::f64::consts::FRAC_PI_2;

use tracing::debug;
use weld_types::{RootGap, SideConfig, WeldFamily, WeldShape};

use super::{cap_offset, ProfileCurve, ProfileError, ProfileSegment, Segment, SegmentRole};
use crate::geometry::point::Point2d;
use crate::Tolerance;

/// Butt groove cross-section.
///
/// Coordinates are plate-local: x across the seam, y up from the base at 0
/// to the plate face at `thickness`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtSection {
    pub curve: ProfileCurve,
    /// Signed half-width of the top opening. Single-sided families carry
    /// the side the groove opens toward in the sign.
    pub dist_out: f64,
    pub thickness: f64,
}

/// One groove wall from the root corner up to the top corner.
struct Wall {
    segments: Vec<ProfileSegment>,
    top: Point2d,
}

impl Wall {
    fn straight(from: Point2d, to: Point2d) -> Self {
        Self {
            segments: vec![ProfileSegment::new(SegmentRole::Wall, Segment::line(from, to))],
            top: to,
        }
    }

    /// Root arc centred above `from`, tangent to a wall leaning out by
    /// `angle` from vertical, then a straight run to the plate face.
    fn rounded(from: Point2d, radius: f64, angle: f64, thickness: f64) -> Result<Self, ProfileError> {
        let centre = Point2d::new(from.x, from.y + radius);
        let at = |phi: f64| Point2d::new(centre.x + radius * phi.cos(), centre.y + radius * phi.sin());
        let tangent_point = at(-angle);
        if tangent_point.y > thickness {
            return Err(ProfileError::OutOfBounds {
                reason: format!(
                    "root radius {radius} does not fit below the plate face at {thickness}"
                ),
            });
        }
        let mid = at((-FRAC_PI_2 - angle) / 2.0);
        let top = Point2d::new(
            tangent_point.x + (thickness - tangent_point.y) * angle.tan(),
            thickness,
        );
        let mut segments = vec![ProfileSegment::new(
            SegmentRole::RootArc,
            Segment::arc(from, mid, tangent_point),
        )];
        if tangent_point.distance_to(&top) > 1e-12 {
            segments.push(ProfileSegment::new(
                SegmentRole::Wall,
                Segment::line(tangent_point, top),
            ));
        }
        Ok(Self { segments, top })
    }

    fn mirrored(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|s| ProfileSegment::new(s.role, mirror_segment(&s.geometry)))
                .collect(),
            top: mirror(self.top),
        }
    }

    /// The same wall walked from top to root.
    fn descending(&self) -> Vec<ProfileSegment> {
        self.segments
            .iter()
            .rev()
            .map(|s| ProfileSegment::new(s.role, s.geometry.reversed()))
            .collect()
    }
}

fn mirror(p: Point2d) -> Point2d {
    Point2d::new(-p.x, p.y)
}

fn mirror_segment(segment: &Segment) -> Segment {
    match *segment {
        Segment::Line { start, end } => Segment::line(mirror(start), mirror(end)),
        Segment::Arc { start, mid, end } => Segment::arc(mirror(start), mirror(mid), mirror(end)),
    }
}

fn positive(value: Option<f64>, name: &'static str) -> Result<f64, ProfileError> {
    let v = value.ok_or(ProfileError::MissingParameter { name })?;
    if !v.is_finite() || v <= 0.0 {
        return Err(ProfileError::InvalidParameter {
            name,
            reason: format!("must be positive, got {v}"),
        });
    }
    Ok(v)
}

fn groove_angle(side: &SideConfig) -> Result<f64, ProfileError> {
    let a = side
        .angle
        .ok_or(ProfileError::MissingParameter { name: "angle" })?;
    if !a.is_finite() || !(0.0..FRAC_PI_2).contains(&a) {
        return Err(ProfileError::InvalidParameter {
            name: "angle",
            reason: format!("must lie in [0, π/2), got {a}"),
        });
    }
    Ok(a)
}

/// Build the groove loop for one side of a butt joint.
///
/// Angle conventions: V and U take the half of the included angle, Bevel
/// and J the full angle of their single prepared wall, Scarf the slant from
/// the plate normal. `opposite` mirrors single-sided grooves onto the other
/// plate; symmetric grooves ignore it.
pub fn butt_section(
    side: &SideConfig,
    thickness: f64,
    root_gap: Option<&RootGap>,
    opposite: bool,
    tol: &Tolerance,
) -> Result<ButtSection, ProfileError> {
    let t = thickness;
    if !t.is_finite() || t <= tol.coincidence {
        return Err(ProfileError::InvalidParameter {
            name: "thickness",
            reason: format!("plate thickness must be positive, got {t}"),
        });
    }
    let (w, h) = match root_gap {
        Some(gap) => (gap.width, gap.height),
        None => (0.0, 0.0),
    };
    if !w.is_finite() || w < 0.0 {
        return Err(ProfileError::InvalidParameter {
            name: "rootGapWidth",
            reason: format!("must not be negative, got {w}"),
        });
    }
    if !h.is_finite() || h < 0.0 || h >= t {
        return Err(ProfileError::InvalidParameter {
            name: "rootGapHeight",
            reason: format!("must lie in [0, {t}), got {h}"),
        });
    }

    let bl = Point2d::new(-w / 2.0, h);
    let br = Point2d::new(w / 2.0, h);

    let (right, left, dist_out) = match side.family {
        WeldFamily::Fillet => {
            return Err(ProfileError::InvalidParameter {
                name: "family",
                reason: "fillet has no butt groove".into(),
            })
        }
        WeldFamily::SquareButt => {
            let d = positive(side.size, "size")?;
            let b = if root_gap.is_some() { w / 2.0 } else { d };
            let bl = Point2d::new(-b, h);
            let br = Point2d::new(b, h);
            (
                Wall::straight(br, Point2d::new(d, t)),
                Wall::straight(bl, Point2d::new(-d, t)),
                d,
            )
        }
        WeldFamily::VButt => {
            let a = groove_angle(side)?;
            let d = a.tan() * (t - h) + w / 2.0;
            (
                Wall::straight(br, Point2d::new(d, t)),
                Wall::straight(bl, Point2d::new(-d, t)),
                d,
            )
        }
        WeldFamily::BevelButt => {
            let a = groove_angle(side)?;
            let d = a.tan() * (t - h) + w / 2.0;
            (
                Wall::straight(br, Point2d::new(d, t)),
                Wall::straight(bl, Point2d::new(-w / 2.0, t)),
                d,
            )
        }
        WeldFamily::UButt => {
            let a = groove_angle(side)?;
            let r = positive(side.radius, "radius")?;
            let right = Wall::rounded(br, r, a, t)?;
            let left = right.mirrored();
            let d = right.top.x;
            (right, left, d)
        }
        WeldFamily::JButt => {
            let a = groove_angle(side)?;
            let r = positive(side.radius, "radius")?;
            let right = Wall::rounded(br, r, a, t)?;
            let d = right.top.x;
            (right, Wall::straight(bl, Point2d::new(-w / 2.0, t)), d)
        }
        WeldFamily::ScarfButt => {
            let a = groove_angle(side)?;
            let b = if root_gap.is_some() {
                w / 2.0
            } else {
                positive(side.size, "size")?
            };
            let shift = a.tan() * (t - h);
            let bl = Point2d::new(-b, h);
            let br = Point2d::new(b, h);
            (
                Wall::straight(br, Point2d::new(b + shift, t)),
                Wall::straight(bl, Point2d::new(-b + shift, t)),
                b + shift,
            )
        }
    };

    let tr = right.top;
    let tl = left.top;
    let cap = match side.shape {
        WeldShape::Flat => Segment::line(tr, tl),
        WeldShape::Convex => {
            return Err(ProfileError::UnsupportedShape {
                shape: WeldShape::Convex,
                family: side.family.label(),
            })
        }
        WeldShape::Concave => {
            let half_opening = (tr.x - tl.x).abs() / 2.0;
            let offset = cap_offset(side, half_opening)?;
            let mid = Point2d::new((tr.x + tl.x) / 2.0, t - offset);
            Segment::arc(tr, mid, tl)
        }
    };

    let root_start = right.segments.first().map(|s| s.geometry.start()).unwrap_or(br);
    let root_end = left.segments.first().map(|s| s.geometry.start()).unwrap_or(bl);
    let mut segments = Vec::new();
    if root_end.distance_to(&root_start) > tol.coincidence {
        segments.push(ProfileSegment::new(
            SegmentRole::Root,
            Segment::line(root_end, root_start),
        ));
    }
    segments.extend(right.segments.iter().copied());
    segments.push(ProfileSegment::new(SegmentRole::Cap, cap));
    segments.extend(left.descending());

    let sigma = if opposite && side.family.is_single_sided() {
        -1.0
    } else {
        1.0
    };
    if sigma < 0.0 {
        segments = segments
            .iter()
            .map(|s| ProfileSegment::new(s.role, mirror_segment(&s.geometry)))
            .collect();
    }

    let curve = ProfileCurve::from_segments(segments, tol.coincidence)?;
    for p in curve.polyline() {
        if p.y < -tol.coincidence || p.y > t + tol.coincidence {
            return Err(ProfileError::OutOfBounds {
                reason: format!("vertex at height {} outside [0, {t}]", p.y),
            });
        }
    }

    let dist_out = if side.family.is_single_sided() {
        sigma * dist_out
    } else {
        dist_out
    };
    debug!(family = %side.family, thickness = t, dist_out, "butt section");
    Ok(ButtSection {
        curve,
        dist_out,
        thickness: t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;
    use weld_types::ConvexityConvention;

    fn v_side(angle: f64) -> SideConfig {
        SideConfig::new(WeldFamily::VButt).with_angle(angle)
    }

    #[test]
    fn v_groove_without_root_gap_is_a_triangle() {
        let s = butt_section(&v_side(FRAC_PI_4), 10.0, None, false, &Tolerance::default()).unwrap();
        assert_relative_eq!(s.dist_out, 10.0, epsilon = 1e-12);
        assert_eq!(s.curve.segments().len(), 3);
        assert_relative_eq!(s.curve.area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn v_groove_root_gap_formula() {
        let gap = RootGap {
            width: 2.0,
            height: 1.0,
        };
        let s = butt_section(&v_side(FRAC_PI_4), 10.0, Some(&gap), false, &Tolerance::default())
            .unwrap();
        assert_relative_eq!(s.dist_out, 9.0 + 1.0, epsilon = 1e-12);
        let root = s.curve.with_role(SegmentRole::Root).next().unwrap();
        assert_relative_eq!(root.geometry.start().y, 1.0);
        assert_relative_eq!(
            root.geometry.start().distance_to(&root.geometry.end()),
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn bevel_sign_flips_with_opposite_direction() {
        let side = SideConfig::new(WeldFamily::BevelButt).with_angle(0.5);
        let tol = Tolerance::default();
        let a = butt_section(&side, 8.0, None, false, &tol).unwrap();
        let b = butt_section(&side, 8.0, None, true, &tol).unwrap();
        assert!(a.dist_out > 0.0);
        assert_relative_eq!(a.dist_out, -b.dist_out, epsilon = 1e-12);
        assert_relative_eq!(a.curve.area(), b.curve.area(), epsilon = 1e-9);
    }

    #[test]
    fn symmetric_groove_ignores_opposite_direction() {
        let tol = Tolerance::default();
        let a = butt_section(&v_side(0.3), 8.0, None, false, &tol).unwrap();
        let b = butt_section(&v_side(0.3), 8.0, None, true, &tol).unwrap();
        assert_eq!(a.dist_out, b.dist_out);
    }

    #[test]
    fn u_groove_matches_closed_form_opening() {
        let (t, h, w, r, a) = (12.0, 1.0, 2.0, 3.0, 0.2);
        let side = SideConfig::new(WeldFamily::UButt).with_angle(a).with_radius(r);
        let gap = RootGap {
            width: w,
            height: h,
        };
        let s = butt_section(&side, t, Some(&gap), false, &Tolerance::default()).unwrap();
        let expected = w / 2.0 + r * a.cos() + (t - (h + r - r * a.sin())) * a.tan();
        assert_relative_eq!(s.dist_out, expected, epsilon = 1e-9);
        assert_eq!(s.curve.with_role(SegmentRole::RootArc).count(), 2);
    }

    #[test]
    fn u_radius_taller_than_plate_is_out_of_bounds() {
        let side = SideConfig::new(WeldFamily::UButt).with_angle(0.1).with_radius(20.0);
        let err = butt_section(&side, 5.0, None, false, &Tolerance::default()).unwrap_err();
        assert!(matches!(err, ProfileError::OutOfBounds { .. }));
    }

    #[test]
    fn j_groove_has_one_root_arc() {
        let side = SideConfig::new(WeldFamily::JButt).with_angle(0.2).with_radius(2.0);
        let gap = RootGap {
            width: 1.0,
            height: 0.5,
        };
        let s = butt_section(&side, 10.0, Some(&gap), true, &Tolerance::default()).unwrap();
        assert_eq!(s.curve.with_role(SegmentRole::RootArc).count(), 1);
        assert!(s.dist_out < 0.0);
    }

    #[test]
    fn scarf_band_shifts_by_slant() {
        let side = SideConfig::new(WeldFamily::ScarfButt)
            .with_angle(FRAC_PI_4)
            .with_size(1.0);
        let s = butt_section(&side, 4.0, None, false, &Tolerance::default()).unwrap();
        assert_relative_eq!(s.dist_out, 5.0, epsilon = 1e-12);
        assert_relative_eq!(s.curve.area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn square_groove_is_a_rectangle() {
        let side = SideConfig::new(WeldFamily::SquareButt).with_size(1.5);
        let s = butt_section(&side, 6.0, None, false, &Tolerance::default()).unwrap();
        assert_relative_eq!(s.curve.area(), 18.0, epsilon = 1e-9);
        assert_relative_eq!(s.dist_out, 1.5);
    }

    #[test]
    fn concave_cap_dips_below_the_face() {
        let side = v_side(FRAC_PI_4)
            .with_shape(WeldShape::Concave)
            .with_convexity(ConvexityConvention::Legacy);
        let flat = butt_section(&v_side(FRAC_PI_4), 10.0, None, false, &Tolerance::default())
            .unwrap();
        let s = butt_section(&side, 10.0, None, false, &Tolerance::default()).unwrap();
        assert!(s.curve.area() < flat.curve.area());
        let (_, hi) = s.curve.bounds();
        assert!(hi.y <= 10.0 + 1e-9);
    }

    #[test]
    fn convex_butt_cap_is_unsupported() {
        let side = v_side(0.4).with_shape(WeldShape::Convex).with_offset(1.0);
        let err = butt_section(&side, 10.0, None, false, &Tolerance::default()).unwrap_err();
        assert!(matches!(err, ProfileError::UnsupportedShape { .. }));
    }

    #[test]
    fn root_height_at_thickness_is_rejected() {
        let gap = RootGap {
            width: 1.0,
            height: 10.0,
        };
        let err = butt_section(&v_side(0.4), 10.0, Some(&gap), false, &Tolerance::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ProfileError::InvalidParameter {
                name: "rootGapHeight",
                ..
            }
        ));
    }
}
