//! Candidate selection for both weld families.
//!
//! Fillet welds pair every face of side 1 with every face of side 2 and keep
//! the pairs that are close enough. Butt welds start from a weld-line edge
//! and look for the matching edge and face on the nearest other plate.

use tracing::debug;
use weld_geom::{Point3d, Segment3d, Tolerance};
use weld_kernel::{KernelId, KernelIntrospect, KernelSolidHandle, OpId, SurfaceClass};

use crate::types::{Diagnostics, OpError, ValidationError};

/// Surface-type combination of a fillet candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    PlanePlane,
    /// Two planes meeting at a right angle; the bead needs extra trimming.
    Perpendicular,
    /// Curved face first, planar face second.
    CurvedPlane,
    /// No planner exists for this combination.
    CurvedCurved,
}

/// One fillet face pair that survived the gap filter.
#[derive(Debug, Clone)]
pub struct FacePairCandidate {
    /// Position in the enumeration, used for the candidate's op id.
    pub index: usize,
    pub face1: KernelId,
    pub face2: KernelId,
    pub class1: SurfaceClass,
    pub class2: SurfaceClass,
    pub gap: f64,
    /// Closest points on face 1 and face 2.
    pub points: [Point3d; 2],
    /// Surface parameters of the closest points.
    pub parameters: [[f64; 2]; 2],
    pub kind: PairKind,
    /// The pair was reordered from the selection's side order.
    pub swapped: bool,
}

impl FacePairCandidate {
    /// Mid-point of the two closest points.
    pub fn reference(&self) -> Point3d {
        self.points[0].midpoint(&self.points[1])
    }
}

/// Faces of a side, optionally grown through smooth neighbours.
/// Order is preserved and duplicates are dropped.
pub fn expand_faces(
    kb: &dyn KernelIntrospect,
    faces: &[KernelId],
    propagate: bool,
) -> Result<Vec<KernelId>, OpError> {
    let mut out: Vec<KernelId> = Vec::new();
    for face in faces {
        let grown = if propagate {
            kb.tangent_connected_faces(*face)?
        } else {
            vec![*face]
        };
        for f in grown {
            if !out.contains(&f) {
                out.push(f);
            }
        }
    }
    Ok(out)
}

fn classify_pair(class1: &SurfaceClass, class2: &SurfaceClass, tol: &Tolerance) -> PairKind {
    match (class1, class2) {
        (SurfaceClass::Plane { plane: a }, SurfaceClass::Plane { plane: b }) => {
            if a.normal.is_perpendicular_to(&b.normal, tol.angular) {
                PairKind::Perpendicular
            } else {
                PairKind::PlanePlane
            }
        }
        (SurfaceClass::Plane { .. }, _) | (_, SurfaceClass::Plane { .. }) => PairKind::CurvedPlane,
        _ => PairKind::CurvedCurved,
    }
}

/// Enumerate side1 × side2 and keep the pairs within `max_gap`.
///
/// Rejected pairs and failed distance queries become diagnostics under the
/// pair's op id. Curved-planar pairs come back in canonical order with the
/// distance re-evaluated against the unbounded plane.
pub fn fillet_candidates(
    kb: &dyn KernelIntrospect,
    op: &OpId,
    side1: &[KernelId],
    side2: &[KernelId],
    max_gap: f64,
    tol: &Tolerance,
    diagnostics: &mut Diagnostics,
) -> Vec<FacePairCandidate> {
    let mut out = Vec::new();
    let mut index = 0;
    for f1 in side1 {
        for f2 in side2 {
            let pair_op = op.unstable("pair", index);
            match evaluate_pair(kb, *f1, *f2, index, max_gap, tol) {
                Ok(Some(candidate)) => out.push(candidate),
                Ok(None) => {
                    debug!(op = %pair_op, "face pair beyond the gap threshold");
                    diagnostics.warn(&pair_op, format!("faces {f1} and {f2} are too far apart"));
                }
                Err(e) => diagnostics.warn(&pair_op, format!("distance query failed: {e}")),
            }
            index += 1;
        }
    }
    out
}

fn evaluate_pair(
    kb: &dyn KernelIntrospect,
    f1: KernelId,
    f2: KernelId,
    index: usize,
    max_gap: f64,
    tol: &Tolerance,
) -> Result<Option<FacePairCandidate>, OpError> {
    let measured = kb.distance(f1, f2, false)?;
    if measured.distance > max_gap + tol.coincidence {
        return Ok(None);
    }

    let class1 = kb.classify_surface(f1)?;
    let class2 = kb.classify_surface(f2)?;
    let kind = classify_pair(&class1, &class2, tol);

    let candidate = if kind == PairKind::CurvedPlane {
        let swapped = class1.is_planar();
        let (curved, planar, curved_class, planar_class) = if swapped {
            (f2, f1, class2, class1)
        } else {
            (f1, f2, class1, class2)
        };
        let extended = kb.distance(curved, planar, true)?;
        FacePairCandidate {
            index,
            face1: curved,
            face2: planar,
            class1: curved_class,
            class2: planar_class,
            gap: measured.distance,
            points: extended.points,
            parameters: extended.parameters,
            kind,
            swapped,
        }
    } else {
        FacePairCandidate {
            index,
            face1: f1,
            face2: f2,
            class1,
            class2,
            gap: measured.distance,
            points: measured.points,
            parameters: measured.parameters,
            kind,
            swapped: false,
        }
    };
    Ok(Some(candidate))
}

/// Everything the butt planner needs to know about one weld-line edge.
#[derive(Debug, Clone)]
pub struct ButtMatch {
    pub edge: KernelId,
    pub segment: Segment3d,
    pub owner: KernelSolidHandle,
    /// Nearest other plate.
    pub other: KernelSolidHandle,
    /// Parallel edge on the other plate.
    pub mate: KernelId,
    pub mate_segment: Segment3d,
    /// Butt face of the owner at the weld line.
    pub face: KernelId,
    /// Butt face of the other plate.
    pub mate_face: KernelId,
    /// Face of the owner the groove opens from.
    pub top_face: KernelId,
    pub thickness: f64,
    /// Distance between the two edges.
    pub gap: f64,
}

/// Locate the plates, mate edge, and butt faces for a weld-line edge.
///
/// Fewer than two solids and a mate edge that is not parallel are fatal.
pub fn match_butt_edge(
    kb: &dyn KernelIntrospect,
    edge: KernelId,
    tol: &Tolerance,
) -> Result<ButtMatch, OpError> {
    let segment = *kb
        .edge_geometry(edge)?
        .as_segment()
        .ok_or_else(|| {
            ValidationError::new("weld-line edges must be straight")
                .parameter("edges")
                .entities([edge])
        })?;
    let direction = segment.direction().ok_or_else(|| OpError::Topology {
        reason: format!("edge {edge} has zero length"),
    })?;

    let owner = kb.owner_body(edge)?;
    let solids = kb.solids();
    if solids.len() < 2 {
        return Err(ValidationError::new("a butt weld needs at least two solids")
            .parameter("edges")
            .entities([edge])
            .into());
    }

    let other = solids
        .iter()
        .filter(|s| **s != owner)
        .filter_map(|s| kb.body_distance(owner, *s).ok().map(|d| (*s, d)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s)
        .ok_or_else(|| {
            ValidationError::new("no second solid found next to the weld edge")
                .parameter("edges")
                .entities([edge])
        })?;

    let reference = segment.midpoint();
    let mut best: Option<(KernelId, Segment3d, f64)> = None;
    for candidate in kb.body_edges(other)? {
        let Some(seg) = kb.edge_geometry(candidate)?.as_segment().copied() else {
            continue;
        };
        let Some(dir) = seg.direction() else {
            continue;
        };
        if !dir.is_parallel_to(&direction, tol.angular) {
            continue;
        }
        let d = seg.distance_to_point(&reference);
        if best.as_ref().map_or(true, |b| d < b.2) {
            best = Some((candidate, seg, d));
        }
    }
    let (mate, mate_segment, _) = best.ok_or_else(|| {
        ValidationError::new("weld edges are not parallel")
            .parameter("edges")
            .entities([edge])
    })?;

    let own_faces = kb.edge_faces(edge)?;
    let mate_faces = kb.edge_faces(mate)?;
    let mut best_faces: Option<(KernelId, KernelId, f64)> = None;
    for fa in &own_faces {
        let ca = kb.face_centroid(*fa)?;
        for fb in &mate_faces {
            let d = ca.distance_squared_to(&kb.face_centroid(*fb)?);
            if best_faces.as_ref().map_or(true, |b| d < b.2) {
                best_faces = Some((*fa, *fb, d));
            }
        }
    }
    let (face, mate_face, _) = best_faces.ok_or_else(|| OpError::Topology {
        reason: format!("edges {edge} and {mate} have no adjacent faces"),
    })?;
    let top_face = own_faces
        .iter()
        .copied()
        .find(|f| *f != face)
        .ok_or_else(|| OpError::Topology {
            reason: format!("edge {edge} borders a single face"),
        })?;

    let thickness = plate_thickness(kb, face, &segment, tol)?;
    let (p, q) = segment.closest_points(&mate_segment);
    let gap = p.distance_to(&q);
    debug!(%edge, %mate, thickness, gap, "matched butt edge");

    Ok(ButtMatch {
        edge,
        segment,
        owner,
        other,
        mate,
        mate_segment,
        face,
        mate_face,
        top_face,
        thickness,
        gap,
    })
}

/// Length of an edge of the butt face that leaves the weld line.
fn plate_thickness(
    kb: &dyn KernelIntrospect,
    face: KernelId,
    weld_line: &Segment3d,
    tol: &Tolerance,
) -> Result<f64, OpError> {
    let direction = weld_line.direction().ok_or_else(|| OpError::Topology {
        reason: "weld line has zero length".into(),
    })?;
    for edge in kb.face_edges(face)? {
        let Some(seg) = kb.edge_geometry(edge)?.as_segment().copied() else {
            continue;
        };
        let parallel = seg
            .direction()
            .map_or(true, |d| d.is_parallel_to(&direction, tol.angular));
        if !parallel && seg.touches(weld_line, tol.coincidence) {
            return Ok(seg.length());
        }
    }
    Err(OpError::Topology {
        reason: format!("face {face} has no edge across the plate"),
    })
}
