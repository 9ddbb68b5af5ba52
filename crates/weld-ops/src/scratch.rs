use tracing::{debug, warn};
use weld_kernel::{KernelSolidHandle, OpId};

use crate::kernel_ext::KernelBundle;
use crate::types::{Diagnostics, Scratch};

/// Delete every scratch entry that is still alive, once.
///
/// Bodies consumed by a boolean in the meantime are skipped. Failures are
/// reported as diagnostics; the finished welds stay valid either way.
pub fn delete_scratch(kb: &mut dyn KernelBundle, op: &OpId, scratch: &[Scratch]) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let live = kb.solids();
    let mut bodies: Vec<KernelSolidHandle> = Vec::new();
    let mut sketch_index = 0;

    for entry in scratch {
        match entry {
            Scratch::Sketch(sketch) => {
                let sub = op.unstable("deleteSketch", sketch_index);
                sketch_index += 1;
                if let Err(e) = kb.delete_sketch(&sub, *sketch) {
                    warn!(op = %sub, error = %e, "could not delete scratch sketch");
                    diagnostics.warn(&sub, format!("scratch sketch not deleted: {e}"));
                }
            }
            Scratch::Body(body) => {
                if live.contains(body) && !bodies.contains(body) {
                    bodies.push(*body);
                }
            }
        }
    }

    if !bodies.is_empty() {
        let sub = op.child("deleteBodies");
        debug!(op = %sub, count = bodies.len(), "deleting scratch bodies");
        if let Err(e) = kb.delete_bodies(&sub, &bodies) {
            warn!(op = %sub, error = %e, "could not delete scratch bodies");
            diagnostics.warn(&sub, format!("scratch bodies not deleted: {e}"));
        }
    }
    diagnostics
}
