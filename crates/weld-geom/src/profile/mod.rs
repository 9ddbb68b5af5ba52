//! Closed 2D cross-section loops.
//!
//! A [`ProfileCurve`] is an ordered loop of line and three-point arc segments.
//! Construction validates the loop (closed, strictly positive area, no
//! self-intersections) and normalizes it to counter-clockwise winding, so
//! every curve handed to a kernel sketch is well formed.

mod butt;
mod fillet;

pub use butt::{butt_section, ButtSection};
pub use fillet::{fillet_section, leg_length, FilletSection};

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

use weld_types::{ConvexityConvention, SideConfig, WeldShape};

use crate::geometry::intersection::{circle_through_points, segments_intersect_2d};
use crate::geometry::point::Point2d;

/// Arc mid-point multiplier applied to the reference distance for Convex
/// caps under the legacy convexity convention.
pub const LEGACY_CONVEX_FACTOR: f64 = 0.15;
/// Same, for Concave caps.
pub const LEGACY_CONCAVE_FACTOR: f64 = 0.25;

/// Largest angle one flattened chord may span on an arc.
const ARC_CHORD_ANGLE: f64 = PI / 48.0;

/// Errors from profile synthesis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile is not closed: gap of {gap} after segment {index}")]
    Open { index: usize, gap: f64 },

    #[error("profile encloses no area")]
    ZeroArea,

    #[error("profile self-intersects between segments {first} and {second}")]
    SelfIntersecting { first: usize, second: usize },

    #[error("arc segment {index} has collinear points")]
    DegenerateArc { index: usize },

    #[error("dihedral angle {angle} rad cannot host a weld")]
    DegenerateAngle { angle: f64 },

    #[error("profile leaves the plate: {reason}")]
    OutOfBounds { reason: String },

    #[error("missing parameter: {name}")]
    MissingParameter { name: &'static str },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{shape:?} caps are not supported for {family}")]
    UnsupportedShape {
        shape: WeldShape,
        family: &'static str,
    },
}

/// What a segment represents. Becomes the sketch entity name so the faces
/// the kernel derives from it can be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentRole {
    /// Fillet leg lying on the first face.
    Leg1,
    /// Fillet leg lying on the second face.
    Leg2,
    /// Exposed bead surface.
    Cap,
    /// Groove side wall.
    Wall,
    /// Flat root land.
    Root,
    /// Rounded root of U and J grooves.
    RootArc,
}

impl fmt::Display for SegmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentRole::Leg1 => "leg1",
            SegmentRole::Leg2 => "leg2",
            SegmentRole::Cap => "cap",
            SegmentRole::Wall => "wall",
            SegmentRole::Root => "root",
            SegmentRole::RootArc => "rootArc",
        };
        f.write_str(name)
    }
}

/// Line or three-point arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Line {
        start: Point2d,
        end: Point2d,
    },
    Arc {
        start: Point2d,
        mid: Point2d,
        end: Point2d,
    },
}

impl Segment {
    pub fn line(start: Point2d, end: Point2d) -> Self {
        Segment::Line { start, end }
    }

    pub fn arc(start: Point2d, mid: Point2d, end: Point2d) -> Self {
        Segment::Arc { start, mid, end }
    }

    pub fn start(&self) -> Point2d {
        match self {
            Segment::Line { start, .. } | Segment::Arc { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Point2d {
        match self {
            Segment::Line { end, .. } | Segment::Arc { end, .. } => *end,
        }
    }

    pub fn reversed(&self) -> Self {
        match *self {
            Segment::Line { start, end } => Segment::Line {
                start: end,
                end: start,
            },
            Segment::Arc { start, mid, end } => Segment::Arc {
                start: end,
                mid,
                end: start,
            },
        }
    }

    /// Points along the segment from start to end, inclusive of both.
    pub fn flatten(&self) -> Option<Vec<Point2d>> {
        match *self {
            Segment::Line { start, end } => Some(vec![start, end]),
            Segment::Arc { start, mid, end } => {
                let (center, radius) = circle_through_points(start, mid, end)?;
                let angle_of = |p: Point2d| (p.y - center.y).atan2(p.x - center.x);
                let a0 = angle_of(start);
                let ccw = |a: f64| (a - a0).rem_euclid(TAU);
                let to_mid = ccw(angle_of(mid));
                let to_end = ccw(angle_of(end));
                let sweep = if to_mid < to_end { to_end } else { to_end - TAU };
                let steps = ((sweep.abs() / ARC_CHORD_ANGLE).ceil() as usize).max(4);
                let mut pts: Vec<Point2d> = (0..steps)
                    .map(|i| {
                        let a = a0 + sweep * (i as f64) / (steps as f64);
                        Point2d::new(center.x + radius * a.cos(), center.y + radius * a.sin())
                    })
                    .collect();
                pts.push(end);
                Some(pts)
            }
        }
    }
}

/// A segment tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSegment {
    pub role: SegmentRole,
    pub geometry: Segment,
}

impl ProfileSegment {
    pub fn new(role: SegmentRole, geometry: Segment) -> Self {
        Self { role, geometry }
    }
}

/// Validated closed loop, counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCurve {
    segments: Vec<ProfileSegment>,
}

impl ProfileCurve {
    /// Validate and normalize a loop.
    pub fn from_segments(segments: Vec<ProfileSegment>, tol: f64) -> Result<Self, ProfileError> {
        if segments.len() < 2 {
            return Err(ProfileError::ZeroArea);
        }
        for (i, seg) in segments.iter().enumerate() {
            let next = &segments[(i + 1) % segments.len()];
            let gap = seg.geometry.end().distance_to(&next.geometry.start());
            if gap > tol {
                return Err(ProfileError::Open { index: i, gap });
            }
        }

        let mut chords: Vec<(usize, Point2d, Point2d)> = Vec::new();
        for (i, seg) in segments.iter().enumerate() {
            let pts = seg
                .geometry
                .flatten()
                .ok_or(ProfileError::DegenerateArc { index: i })?;
            for pair in pts.windows(2) {
                chords.push((i, pair[0], pair[1]));
            }
        }

        let area = shoelace(chords.iter().map(|c| c.1));
        if area.abs() < tol * tol {
            return Err(ProfileError::ZeroArea);
        }
        check_simple(&chords, tol)?;

        let segments = if area < 0.0 {
            segments
                .iter()
                .rev()
                .map(|s| ProfileSegment::new(s.role, s.geometry.reversed()))
                .collect()
        } else {
            segments
        };
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[ProfileSegment] {
        &self.segments
    }

    /// Segments with the given role, in loop order.
    pub fn with_role(&self, role: SegmentRole) -> impl Iterator<Item = &ProfileSegment> {
        self.segments.iter().filter(move |s| s.role == role)
    }

    /// Sketch entity names, unique within the loop: role plus ordinal.
    pub fn entity_names(&self) -> Vec<String> {
        let mut counts = std::collections::HashMap::new();
        self.segments
            .iter()
            .map(|s| {
                let n = counts.entry(s.role).or_insert(0usize);
                let name = format!("{}{}", s.role, n);
                *n += 1;
                name
            })
            .collect()
    }

    /// Flattened loop, arcs sampled into chords. First point not repeated.
    pub fn polyline(&self) -> Vec<Point2d> {
        let mut out = Vec::new();
        for seg in &self.segments {
            if let Some(mut pts) = seg.geometry.flatten() {
                pts.pop();
                out.extend(pts);
            }
        }
        out
    }

    /// Enclosed area (positive).
    pub fn area(&self) -> f64 {
        shoelace(self.polyline().into_iter()).abs()
    }

    /// Segment endpoints and arc mid-points.
    pub fn vertices(&self) -> Vec<Point2d> {
        self.segments
            .iter()
            .flat_map(|s| match s.geometry {
                Segment::Line { start, .. } => vec![start],
                Segment::Arc { start, mid, .. } => vec![start, mid],
            })
            .collect()
    }

    /// (min, max) corners of the flattened loop.
    pub fn bounds(&self) -> (Point2d, Point2d) {
        let pts = self.polyline();
        let mut lo = Point2d::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Point2d::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in pts {
            lo = Point2d::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Point2d::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        (lo, hi)
    }
}

fn shoelace(points: impl Iterator<Item = Point2d>) -> f64 {
    let pts: Vec<Point2d> = points.collect();
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Non-adjacent chords must not touch.
fn check_simple(chords: &[(usize, Point2d, Point2d)], tol: f64) -> Result<(), ProfileError> {
    let n = chords.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (si, a0, a1) = chords[i];
            let (sj, b0, b1) = chords[j];
            if segments_intersect_2d(a0, a1, b0, b1, tol) {
                return Err(ProfileError::SelfIntersecting {
                    first: si,
                    second: sj,
                });
            }
        }
    }
    Ok(())
}

/// Distance the cap arc mid-point sits from the chord.
///
/// `reference` is the distance the legacy multipliers scale: the apex
/// distance for fillets, the half opening for butt grooves.
pub(crate) fn cap_offset(side: &SideConfig, reference: f64) -> Result<f64, ProfileError> {
    match (side.shape, side.convexity) {
        (WeldShape::Flat, _) => Ok(0.0),
        (WeldShape::Convex, ConvexityConvention::Legacy) => Ok(LEGACY_CONVEX_FACTOR * reference),
        (WeldShape::Concave, ConvexityConvention::Legacy) => Ok(LEGACY_CONCAVE_FACTOR * reference),
        (_, ConvexityConvention::Explicit) => {
            let offset = side
                .offset
                .ok_or(ProfileError::MissingParameter { name: "offset" })?;
            if !offset.is_finite() || offset <= 0.0 {
                return Err(ProfileError::InvalidParameter {
                    name: "offset",
                    reason: format!("curved caps need a positive offset, got {offset}"),
                });
            }
            Ok(offset)
        }
    }
}
