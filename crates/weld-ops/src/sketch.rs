use weld_geom::{ProfileCurve, Segment, SegmentRole, WeldFrame};
use weld_kernel::{KernelId, KernelIntrospect, OpId, SketchId};

use crate::kernel_ext::KernelBundle;
use crate::types::{OpError, Scratch};

/// A profile loop turned into a solved kernel sketch.
#[derive(Debug, Clone)]
pub struct SketchedProfile {
    pub sketch: SketchId,
    /// Region face bounded by the loop.
    pub region: KernelId,
    entities: Vec<(SegmentRole, String)>,
}

impl SketchedProfile {
    /// Name of the first entity with `role`.
    pub fn entity(&self, role: SegmentRole) -> Option<&str> {
        self.entities
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, name)| name.as_str())
    }

    /// Live faces derived from every entity with `role`.
    pub fn faces_of(&self, kb: &dyn KernelIntrospect, role: SegmentRole) -> Vec<KernelId> {
        self.entities
            .iter()
            .filter(|(r, _)| *r == role)
            .flat_map(|(_, name)| kb.sketch_entity_faces(self.sketch, name))
            .collect()
    }
}

/// Sketch `curve` on `frame` and solve it.
///
/// The sketch is recorded as scratch as soon as it exists, so a failed
/// solve still gets cleaned up.
pub fn sketch_profile(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    frame: &WeldFrame,
    curve: &ProfileCurve,
    scratch: &mut Vec<Scratch>,
) -> Result<SketchedProfile, OpError> {
    let sketch = kb.create_sketch(&op.child("sketch"), frame)?;
    scratch.push(Scratch::Sketch(sketch));

    let names = curve.entity_names();
    let mut entities = Vec::with_capacity(names.len());
    for (segment, name) in curve.segments().iter().zip(names) {
        match segment.geometry {
            Segment::Line { start, end } => kb.add_line(sketch, &name, start, end)?,
            Segment::Arc { start, mid, end } => kb.add_arc(sketch, &name, start, mid, end)?,
        }
        entities.push((segment.role, name));
    }
    let region = kb.solve_sketch(sketch)?;
    Ok(SketchedProfile {
        sketch,
        region,
        entities,
    })
}
