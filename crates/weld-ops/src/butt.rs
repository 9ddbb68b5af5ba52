//! Butt weld planner.
//!
//! Each selected weld-line edge is matched against the nearest other plate.
//! The groove section is placed across the seam, carved out of both plates
//! with an oversized tool and filled with an exact-length bead.

use tracing::{debug, info, instrument, warn};
use weld_geom::{butt_section, Line3d, Tolerance, Transform, WeldFrame};
use weld_kernel::{BooleanKind, ExtrudeBounds, KernelSolidHandle, OpId};
use weld_types::{SideConfig, WeldConfig, WeldFamily};

use crate::kernel_ext::KernelBundle;
use crate::pairing::{match_butt_edge, ButtMatch};
use crate::sketch::sketch_profile;
use crate::types::{OpError, Scratch, SectionRecord, ValidationError, WeldOutput, WeldSide};

/// Plan butt welds along the selected edges.
#[instrument(skip(kb, config, tol), fields(op = %op, edges = config.selection.edges.len()))]
pub fn synthesize(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    tol: &Tolerance,
) -> Result<WeldOutput, OpError> {
    if config.selection.edges.is_empty() {
        return Err(ValidationError::new("select at least one weld-line edge")
            .parameter("edges")
            .into());
    }

    let mut output = WeldOutput::default();
    for (i, edge) in config.selection.edges.iter().enumerate() {
        let edge_op = op.unstable("edge", i);
        let planned = match_butt_edge(kb.as_introspect(), *edge, tol)
            .and_then(|m| plan_edge(kb, &edge_op, config, &m, tol, &mut output));
        match planned {
            Ok(body) => output.bodies.push(body),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(op = %edge_op, error = %e, "skipping weld edge");
                output
                    .diagnostics
                    .warn(&edge_op, format!("no weld along edge {edge}: {e}"));
            }
        }
    }

    info!(bodies = output.bodies.len(), "butt weld planned");
    Ok(output)
}

/// Seam frame at the base of the joint: the normal runs along the weld line,
/// x crosses the seam toward the mate plate and local y points out of the
/// groove face.
///
/// The groove opens on the face next to the selected edge. With `flip` it
/// opens on the far face instead: the base moves to the selected edge and
/// both y and the frame normal reverse.
fn seam_frame(
    kb: &dyn KernelBundle,
    m: &ButtMatch,
    flip: bool,
    tol: &Tolerance,
) -> Result<WeldFrame, OpError> {
    let tangent = m.segment.direction().ok_or_else(|| OpError::Topology {
        reason: format!("edge {} has zero length", m.edge),
    })?;
    let across = kb.face_plane(m.face)?.normal;
    let top = kb.face_plane(m.top_face)?.normal;

    let mid = m.segment.midpoint();
    let seam = if m.gap > tol.coincidence {
        mid.midpoint(&m.mate_segment.closest_point(&mid))
    } else {
        mid
    };
    let (base, up) = if flip {
        (seam, -top)
    } else {
        (seam - top * m.thickness, top)
    };
    Ok(WeldFrame::aligned(base, tangent, across, up)?)
}

fn plan_edge(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    config: &WeldConfig,
    m: &ButtMatch,
    tol: &Tolerance,
    output: &mut WeldOutput,
) -> Result<KernelSolidHandle, OpError> {
    let frame = seam_frame(kb, m, config.flip_direction, tol)?;
    let length = m.segment.length();

    if m.gap > tol.coincidence {
        debug!(gap = m.gap, "closing the gap between plates");
        kb.offset_face(&op.child("closeGap"), &[m.face, m.mate_face], m.gap / 2.0)?;
    }

    let mut sides: Vec<(WeldSide, &SideConfig, WeldFrame, f64)> = Vec::new();
    match &config.other_side {
        None => sides.push((WeldSide::Primary, &config.primary, frame, m.thickness)),
        Some(other) => {
            let half = m.thickness / 2.0;
            let mid_plane = frame.offset_y(half);
            sides.push((WeldSide::Primary, &config.primary, mid_plane, half));
            sides.push((WeldSide::Other, other, mid_plane.mirrored_across(0.0), half));
        }
    }

    let mut beads = Vec::new();
    let mut slanted = false;
    for (side, side_config, side_frame, depth) in sides {
        let side_op = match side {
            WeldSide::Primary => op.child("primary"),
            WeldSide::Other => op.child("other"),
        };
        let section = butt_section(
            side_config,
            depth,
            config.root_gap.as_ref(),
            config.opposite_direction,
            tol,
        )?;
        let profile = sketch_profile(kb, &side_op.child("profile"), &side_frame, &section.curve, &mut output.scratch)?;

        let direction = side_frame.normal;
        let tool = kb.extrude(
            &side_op.child("cutTool"),
            &[profile.region],
            direction,
            ExtrudeBounds::ThroughAll,
        )?;
        output.scratch.push(Scratch::Body(tool));
        let bead = kb.extrude(
            &side_op.child("bead"),
            &[profile.region],
            direction,
            ExtrudeBounds::Symmetric {
                half_depth: length / 2.0,
            },
        )?;
        output.scratch.push(Scratch::Body(bead));
        beads.push(bead);

        // The butt faces are shared by both sides, so they tilt once.
        if !slanted {
            slanted = slant_scarf(kb, &side_op, side_config, config.opposite_direction, m, &side_frame)?;
        }
        kb.boolean(
            &side_op.child("cut"),
            &[tool],
            &[m.owner, m.other],
            BooleanKind::Subtraction,
            false,
        )?;

        output.sections.push(SectionRecord {
            op: side_op,
            side,
            frame: side_frame,
            dist_out: section.dist_out,
            depth,
        });
    }

    let body = match beads.as_slice() {
        [bead] => *bead,
        [first, rest @ ..] => {
            let merged = kb.boolean(&op.child("union"), rest, &[*first], BooleanKind::Union, false)?;
            merged.first().copied().ok_or_else(|| OpError::Topology {
                reason: "union of the two sides left no body".into(),
            })?
        }
        [] => {
            return Err(OpError::Topology {
                reason: "no side was planned".into(),
            })
        }
    };
    // Beads stay scratch until the whole edge succeeded.
    output
        .scratch
        .retain(|s| !matches!(s, Scratch::Body(b) if beads.contains(b)));
    Ok(body)
}

/// Tilt both butt faces about the weld line so the scarf cut is angled.
/// Returns whether the faces were moved.
fn slant_scarf(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    side: &SideConfig,
    opposite: bool,
    m: &ButtMatch,
    frame: &WeldFrame,
) -> Result<bool, OpError> {
    let angle = match side.angle {
        Some(a) if side.family == WeldFamily::ScarfButt && a > 0.0 => a,
        _ => return Ok(false),
    };
    let sigma = if opposite { -1.0 } else { 1.0 };
    let axis = Line3d::new(frame.origin, frame.normal).ok_or_else(|| OpError::Topology {
        reason: "weld line has no direction".into(),
    })?;
    let rotation = Transform::rotation_about_line(&axis, sigma * angle).ok_or_else(|| {
        OpError::Topology {
            reason: "degenerate scarf rotation".into(),
        }
    })?;
    debug!(angle = sigma * angle, "slanting scarf faces");
    kb.move_face(&op.child("scarf"), &[m.face, m.mate_face], &rotation)?;
    Ok(true)
}
