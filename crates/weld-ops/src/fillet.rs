//! Fillet weld planner.
//!
//! Every face pair that survives the gap filter gets its own frame, profile,
//! and bead. A pair that fails is skipped with a diagnostic; only input
//! validation aborts the whole evaluation.

use tracing::{debug, info, instrument, warn};
use weld_geom::{build_frame, fillet_section, FilletSection, FrameBuild, Plane, SegmentRole, Tolerance};
use weld_kernel::{
    BooleanKind, EdgeGeometry, ExtrudeBounds, KernelId, KernelIntrospect, KernelSolidHandle, OpId,
};
use weld_types::{CornerTreatment, WeldConfig};

use crate::end_cap::match_end_caps;
use crate::kernel_ext::KernelBundle;
use crate::pairing::{expand_faces, fillet_candidates, FacePairCandidate, PairKind};
use crate::sketch::{sketch_profile, SketchedProfile};
use crate::types::{
    EndFace, OpError, Scratch, SectionRecord, ValidationError, WeldOutput, WeldSide,
};

/// A finished bead for one face pair.
struct Bead {
    body: KernelSolidHandle,
    caps: Vec<KernelId>,
    section: SectionRecord,
}

/// Plan fillet welds between the two selected face sets.
#[instrument(skip(kb, config, tol), fields(op = %op))]
pub fn synthesize(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    tol: &Tolerance,
) -> Result<WeldOutput, OpError> {
    let selection = &config.selection;
    if selection.side1.is_empty() {
        return Err(ValidationError::new("select at least one face for side 1")
            .parameter("side1")
            .into());
    }
    if selection.side2.is_empty() {
        return Err(ValidationError::new("select at least one face for side 2")
            .parameter("side2")
            .into());
    }
    let shared: Vec<KernelId> = selection
        .side1
        .iter()
        .copied()
        .filter(|f| selection.side2.contains(f))
        .collect();
    if !shared.is_empty() {
        return Err(ValidationError::new("side 1 and side 2 share faces")
            .parameter("side1")
            .parameter("side2")
            .entities(shared)
            .into());
    }

    let side1 = expand_faces(kb.as_introspect(), &selection.side1, config.tangent_propagation)?;
    let side2 = expand_faces(kb.as_introspect(), &selection.side2, config.tangent_propagation)?;

    let mut output = WeldOutput::default();
    let candidates = fillet_candidates(
        kb.as_introspect(),
        op,
        &side1,
        &side2,
        config.max_gap,
        tol,
        &mut output.diagnostics,
    );
    debug!(candidates = candidates.len(), "enumerated face pairs");

    for candidate in &candidates {
        let pair_op = op.unstable("pair", candidate.index);
        match plan_pair(kb, &pair_op, config, candidate, tol, &mut output) {
            Ok(bead) => {
                output
                    .end_faces
                    .extend(bead.caps.iter().map(|face| EndFace {
                        face: *face,
                        body: bead.body,
                    }));
                output.sections.push(bead.section);
                output.bodies.push(bead.body);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(op = %pair_op, error = %e, "skipping face pair");
                output.diagnostics.warn(&pair_op, format!("no weld for this pair: {e}"));
            }
        }
    }

    if matches!(config.corner, CornerTreatment::Round | CornerTreatment::Miter) {
        let mut owners: Vec<KernelSolidHandle> = output.end_faces.iter().map(|e| e.body).collect();
        owners.dedup();
        if owners.len() >= 2 {
            let ends = match_end_caps(
                kb,
                &op.child("ends"),
                &output.end_faces,
                config.corner,
                tol,
            );
            output.treated_ends = ends.treated;
            output.bodies.extend(ends.bodies);
        }
    }

    if output.bodies.len() >= 2 {
        let union_op = op.child("union");
        let (first, rest) = output.bodies.split_at(1);
        match kb.boolean(&union_op, rest, first, BooleanKind::Union, false) {
            Ok(merged) => output.bodies = merged,
            Err(e) => {
                warn!(op = %union_op, error = %e, "weld beads left separate");
                output.diagnostics.warn(&union_op, format!("beads not merged: {e}"));
            }
        }
    }

    info!(bodies = output.bodies.len(), "fillet weld planned");
    Ok(output)
}

fn plan_pair(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    candidate: &FacePairCandidate,
    tol: &Tolerance,
    output: &mut WeldOutput,
) -> Result<Bead, OpError> {
    match candidate.kind {
        PairKind::CurvedCurved => Err(OpError::UnsupportedPair {
            reason: format!(
                "faces {} and {} are both curved",
                candidate.face1, candidate.face2
            ),
        }),
        PairKind::CurvedPlane => plan_curved(kb, op, config, candidate, tol, output),
        PairKind::PlanePlane | PairKind::Perpendicular => {
            plan_planar(kb, op, config, candidate, tol, output)
        }
    }
}

/// Frame and section for two face planes.
fn frame_and_section(
    p1: &Plane,
    p2: &Plane,
    config: &WeldConfig,
    candidate: &FacePairCandidate,
    tol: &Tolerance,
) -> Result<(FrameBuild, FilletSection), OpError> {
    let build = build_frame(p1, p2, Some(&candidate.reference()), tol)?;
    let d1 = build.frame.direction_to_local(&build.face1_dir);
    let d2 = build.frame.direction_to_local(&build.face2_dir);
    let section = fillet_section(d1, d2, &config.primary, tol)?;
    Ok((build, section))
}

fn record(op: &OpId, build: &FrameBuild, section: &FilletSection) -> SectionRecord {
    SectionRecord {
        op: op.clone(),
        side: WeldSide::Primary,
        frame: build.frame,
        dist_out: 0.0,
        depth: section.leg_length,
    }
}

fn plan_planar(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    candidate: &FacePairCandidate,
    tol: &Tolerance,
    output: &mut WeldOutput,
) -> Result<Bead, OpError> {
    let p1 = kb.face_plane(candidate.face1)?;
    let p2 = kb.face_plane(candidate.face2)?;
    let (build, section) = frame_and_section(&p1, &p2, config, candidate, tol)?;
    let profile = sketch_profile(kb, &op.child("profile"), &build.frame, &section.curve, &mut output.scratch)?;

    let primary = trimmed_bead(kb, op, candidate, &build, &profile, tol, &mut output.scratch);
    let (body, caps) = match primary {
        Ok(done) => done,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!(op = %op, error = %e, "through-all bead failed, trying a bounded extrude");
            output
                .diagnostics
                .warn(op, format!("unbounded bead failed, used face bounds: {e}"));
            bounded_bead(kb, op, candidate, &build, &profile).map_err(|fallback| {
                OpError::StrategiesExhausted {
                    reason: format!("through-all: {e}; bounded: {fallback}"),
                }
            })?
        }
    };
    Ok(Bead {
        body,
        caps,
        section: record(op, &build, &section),
    })
}

/// Primary strategy: an unbounded bead trimmed back by the plates.
fn trimmed_bead(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    candidate: &FacePairCandidate,
    build: &FrameBuild,
    profile: &SketchedProfile,
    tol: &Tolerance,
    scratch: &mut Vec<Scratch>,
) -> Result<(KernelSolidHandle, Vec<KernelId>), OpError> {
    let bead = kb.extrude(
        &op.child("extrude"),
        &[profile.region],
        build.frame.normal,
        ExtrudeBounds::ThroughAll,
    )?;
    // Until the trim succeeds the bead is disposable.
    scratch.push(Scratch::Body(bead));

    let trim = op.child("trim");
    let mut legs = profile.faces_of(kb.as_introspect(), SegmentRole::Leg1);
    legs.extend(profile.faces_of(kb.as_introspect(), SegmentRole::Leg2));
    if legs.is_empty() {
        return Err(OpError::Topology {
            reason: "bead has no leg faces".into(),
        });
    }
    kb.offset_face(&trim.child("offsetFaces"), &legs, tol.boolean)?;

    let mut plates = vec![kb.owner_body(candidate.face1)?];
    let owner2 = kb.owner_body(candidate.face2)?;
    if !plates.contains(&owner2) {
        plates.push(owner2);
    }
    kb.boolean(&trim.child("boolean"), &plates, &[bead], BooleanKind::Subtraction, true)?;

    if candidate.kind == PairKind::Perpendicular {
        let cuts = [
            (SegmentRole::Leg1, build.face2_dir, "extrude1"),
            (SegmentRole::Leg2, build.face1_dir, "extrude2"),
        ];
        let mut tools = Vec::new();
        for (role, direction, name) in cuts {
            let faces = profile.faces_of(kb.as_introspect(), role);
            if faces.is_empty() {
                continue;
            }
            let tool = kb.extrude(
                &trim.child(name),
                &faces,
                direction,
                ExtrudeBounds::ThroughAllForward,
            )?;
            scratch.push(Scratch::Body(tool));
            tools.push(tool);
        }
        if !tools.is_empty() {
            kb.boolean(&trim.child("booleanCut"), &tools, &[bead], BooleanKind::Subtraction, false)?;
        }
    }

    replace_legs(kb, &trim, candidate, profile)?;
    let caps = kb.cap_faces(bead)?;
    scratch.retain(|s| *s != Scratch::Body(bead));
    Ok((bead, caps))
}

/// Fallback: a blind extrude spanning the overlap of the two faces along
/// the weld line.
fn bounded_bead(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    candidate: &FacePairCandidate,
    build: &FrameBuild,
    profile: &SketchedProfile,
) -> Result<(KernelSolidHandle, Vec<KernelId>), OpError> {
    let box1 = kb.face_box(candidate.face1, &build.frame)?;
    let box2 = kb.face_box(candidate.face2, &build.frame)?;
    let from = box1.min.z.max(box2.min.z);
    let to = box1.max.z.min(box2.max.z);
    if to <= from {
        return Err(OpError::Topology {
            reason: format!("faces do not overlap along the weld line ({from} to {to})"),
        });
    }
    let bead = kb.extrude(
        &op.child("extrudeBounded"),
        &[profile.region],
        build.frame.normal,
        ExtrudeBounds::Range { from, to },
    )?;
    let caps = kb.cap_faces(bead)?;
    Ok((bead, caps))
}

/// Extend the bead's leg faces onto the selected faces.
fn replace_legs(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    candidate: &FacePairCandidate,
    profile: &SketchedProfile,
) -> Result<(), OpError> {
    let legs = [
        (SegmentRole::Leg1, candidate.face1, "replaceFace1"),
        (SegmentRole::Leg2, candidate.face2, "replaceFace2"),
    ];
    for (role, template, name) in legs {
        let faces = profile.faces_of(kb.as_introspect(), role);
        if !faces.is_empty() {
            kb.replace_face(&op.child(name), &faces, template, true)?;
        }
    }
    Ok(())
}

/// Curved face against a plane: the profile sits on the tangent plane at the
/// closest point and is swept along the curved face's nearest edge.
fn plan_curved(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    candidate: &FacePairCandidate,
    tol: &Tolerance,
    output: &mut WeldOutput,
) -> Result<Bead, OpError> {
    let curved = candidate.face1;
    let point = candidate.points[0];
    let tangent = kb.tangent_plane(curved, candidate.parameters[0])?;
    let planar = kb.face_plane(candidate.face2)?;

    let build = build_frame(&tangent, &planar, Some(&point), tol)?;
    let d1 = build.frame.direction_to_local(&build.face1_dir);
    let d2 = build.frame.direction_to_local(&build.face2_dir);
    let section = fillet_section(d1, d2, &config.primary, tol)?;
    let profile = sketch_profile(kb, &op.child("profile"), &build.frame, &section.curve, &mut output.scratch)?;

    let path = nearest_edge(kb.as_introspect(), curved, &point)?;
    let bead = kb.sweep(&op.child("sweep"), profile.region, path, Some(curved))?;
    let caps = kb.cap_faces(bead)?;

    if let Err(e) = replace_legs(kb, op, candidate, &profile) {
        debug!(op = %op, error = %e, "legs left unextended");
        output
            .diagnostics
            .warn(op, format!("leg faces not extended to the selection: {e}"));
    }
    Ok(Bead {
        body: bead,
        caps,
        section: record(op, &build, &section),
    })
}

/// Edge of `face` closest to `point`.
fn nearest_edge(
    kb: &dyn KernelIntrospect,
    face: KernelId,
    point: &weld_geom::Point3d,
) -> Result<KernelId, OpError> {
    let mut best: Option<(KernelId, f64)> = None;
    for edge in kb.face_edges(face)? {
        let d = match kb.edge_geometry(edge)? {
            EdgeGeometry::Line(seg) => seg.distance_to_point(point),
            EdgeGeometry::Arc { start, mid, end } => [start, mid, end]
                .iter()
                .map(|p| p.distance_to(point))
                .fold(f64::INFINITY, f64::min),
            EdgeGeometry::Circle {
                center,
                axis,
                radius,
            } => {
                let offset = *point - center;
                let along = offset.dot(&axis);
                let radial = offset.reject_from(&axis).length();
                (along * along + (radial - radius) * (radial - radius)).sqrt()
            }
        };
        if best.map_or(true, |b| d < b.1) {
            best = Some((edge, d));
        }
    }
    best.map(|b| b.0).ok_or_else(|| OpError::Topology {
        reason: format!("curved face {face} has no edges to sweep along"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_geom::{Point3d, Vec3};
    use weld_kernel::MockKernel;

    #[test]
    fn overlapping_sides_are_rejected() {
        let mut kernel = MockKernel::new();
        let plate = kernel
            .add_box(Point3d::ORIGIN, Point3d::new(10.0, 10.0, 1.0))
            .unwrap();
        let top = kernel.face_on(plate, Vec3::Z).unwrap();
        let config = WeldConfig::fillet(2.0, vec![top], vec![top]);
        let err = synthesize(&mut kernel, &OpId::root("w"), &config, &Tolerance::default())
            .unwrap_err();
        assert!(err.is_fatal());
        match err {
            OpError::Validation(v) => assert_eq!(v.entities, vec![top]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn empty_side_names_the_parameter() {
        let mut kernel = MockKernel::new();
        let config = WeldConfig::fillet(2.0, vec![KernelId(1)], Vec::new());
        match synthesize(&mut kernel, &OpId::root("w"), &config, &Tolerance::default()) {
            Err(OpError::Validation(v)) => assert_eq!(v.parameters, vec!["side2".to_string()]),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
