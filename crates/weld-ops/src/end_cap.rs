use std::f64::consts::FRAC_PI_2;

use tracing::{debug, instrument};
use weld_geom::{Line3d, Plane, Tolerance, Transform};
use weld_kernel::{KernelSolidHandle, LoftContinuity, OpId};
use weld_types::CornerTreatment;

use crate::kernel_ext::KernelBundle;
use crate::types::{EndFace, OpError};

/// What the end-cap pass added.
#[derive(Debug, Clone, Default)]
pub struct EndTreatment {
    /// Solids bridging round corners.
    pub bodies: Vec<KernelSolidHandle>,
    /// Number of pairs that were treated.
    pub treated: usize,
}

/// Pair colliding termination faces of different beads and finish each
/// pair round or mitered.
///
/// A face takes part in at most one pair, and only once its treatment
/// succeeded. Failing pairs are skipped quietly; they never affect the weld
/// bodies themselves.
#[instrument(skip(kb, ends, tol), fields(op = %op, ends = ends.len()))]
pub fn match_end_caps(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    ends: &[EndFace],
    corner: CornerTreatment,
    tol: &Tolerance,
) -> EndTreatment {
    let mut result = EndTreatment::default();
    if corner == CornerTreatment::None {
        return result;
    }

    let mut used = vec![false; ends.len()];
    let mut index = 0;
    for i in 0..ends.len() {
        for j in (i + 1)..ends.len() {
            if used[i] {
                break;
            }
            if used[j] || ends[i].body == ends[j].body {
                continue;
            }
            match kb.collision(ends[i].face, ends[j].face, tol.coincidence) {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    debug!(error = %e, "collision query failed");
                    continue;
                }
            }

            let pair_op = op.unstable("end", index);
            index += 1;
            let outcome = match corner {
                CornerTreatment::Round => round(kb, &pair_op, &ends[i], &ends[j], tol).map(Some),
                _ => miter(kb, &pair_op, &ends[i], &ends[j], tol).map(|_| None),
            };
            match outcome {
                Ok(body) => {
                    used[i] = true;
                    used[j] = true;
                    result.treated += 1;
                    result.bodies.extend(body);
                }
                Err(e) => {
                    debug!(op = %pair_op, error = %e, "end treatment skipped");
                }
            }
        }
    }
    result
}

fn planes(kb: &dyn KernelBundle, a: &EndFace, b: &EndFace) -> Result<(Plane, Plane), OpError> {
    Ok((kb.face_plane(a.face)?, kb.face_plane(b.face)?))
}

fn rotation(line: &Line3d, angle: f64) -> Result<Transform, OpError> {
    Transform::rotation_about_line(line, angle).ok_or_else(|| OpError::Topology {
        reason: "degenerate rotation axis".into(),
    })
}

/// Quarter turn of equal faces becomes a revolve, anything else a loft.
fn round(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    a: &EndFace,
    b: &EndFace,
    tol: &Tolerance,
) -> Result<KernelSolidHandle, OpError> {
    let (pa, pb) = planes(kb, a, b)?;
    let angle = pa.normal.angle_to(&(-pb.normal));
    let (area_a, area_b) = (kb.face_area(a.face)?, kb.face_area(b.face)?);
    let equal_areas = (area_a - area_b).abs() <= tol.coincidence.max(1e-9 * area_a.max(area_b));

    if equal_areas && (angle - FRAC_PI_2).abs() < tol.angular {
        let line = kb
            .intersect_planes(&pa, &pb, tol.angular)
            .ok_or_else(|| OpError::Topology {
                reason: "end faces do not intersect".into(),
            })?;
        let start = kb.face_centroid(a.face)?;
        let target = kb.face_centroid(b.face)?;
        let mut best = (angle, f64::INFINITY);
        for signed in [angle, -angle] {
            let landed = rotation(&line, signed)?.transform_point(&start);
            let miss = landed.distance_to(&target);
            if miss < best.1 {
                best = (signed, miss);
            }
        }
        debug!(angle = best.0, "revolving end face");
        Ok(kb.revolve(&op.child("revolve"), a.face, &line, best.0)?)
    } else {
        debug!(angle, area_a, area_b, "lofting end faces");
        Ok(kb.loft(&op.child("loft"), &[a.face, b.face], LoftContinuity::Curvature)?)
    }
}

/// Rotate both faces by half their angle about the shared line so they
/// meet on the bisecting plane.
fn miter(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    a: &EndFace,
    b: &EndFace,
    tol: &Tolerance,
) -> Result<(), OpError> {
    let (pa, pb) = planes(kb, a, b)?;
    let line = kb
        .intersect_planes(&pa, &pb, tol.angular)
        .ok_or_else(|| OpError::Topology {
            reason: "end faces do not intersect".into(),
        })?;
    let half = pa.normal.angle_to(&(-pb.normal)) / 2.0;

    let mut best: Option<(Transform, Transform, f64)> = None;
    for (sa, sb) in [(1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0)] {
        let ra = rotation(&line, sa * half)?;
        let rb = rotation(&line, sb * half)?;
        let facing = ra
            .transform_vector(&pa.normal)
            .dot(&rb.transform_vector(&pb.normal));
        if best.as_ref().map_or(true, |b| facing < b.2) {
            best = Some((ra, rb, facing));
        }
    }
    let (ra, rb, _) = best.ok_or_else(|| OpError::Topology {
        reason: "no miter rotation found".into(),
    })?;
    kb.move_face(&op.child("miter1"), &[a.face], &ra)?;
    kb.move_face(&op.child("miter2"), &[b.face], &rb)?;
    Ok(())
}
