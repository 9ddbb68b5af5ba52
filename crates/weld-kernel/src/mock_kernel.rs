//! MockKernel: a deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Bodies are analytic prisms, tubes, and lumps with stable face and edge
//! ids, so every weld planner can run end to end in tests. The mock models
//! the observable effects the planners rely on, not a B-rep: subtracting
//! plates from an unbounded bead trims the bead to the plates' common extent
//! along its axis, and cutting a plate only records the cut.
//!
//! Accepted mutating requests are logged as [`KernelCall`]s. Any request
//! kind can be made to fail with [`MockKernel::reject`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::f64::consts::TAU;

use tracing::debug;
use weld_geom::{
    BoundingBox, Cylinder, Line3d, Plane, Point2d, Point3d, Segment, Transform, Vec3, WeldFrame,
};

use crate::mock_shapes::{
    ccw_outline, face_distance, flatten, parameters_on, planar_outline, revolve_samples,
    ring_samples, FaceGeom, Lump, OutlineSegment, Prism, Shape, StaticFace, Tube,
};
use crate::traits::{CounterStore, Kernel, KernelIntrospect};
use crate::types::*;

/// Kinds of mutating requests, for logging and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelOp {
    CreateSketch,
    SolveSketch,
    DeleteSketch,
    Extrude,
    ExtrudeThroughAll,
    Union,
    Subtraction,
    Intersection,
    Sweep,
    ReplaceFace,
    OffsetFace,
    MoveFace,
    Revolve,
    Loft,
    DeleteBodies,
    SetProperty,
}

impl From<BooleanKind> for KernelOp {
    fn from(kind: BooleanKind) -> Self {
        match kind {
            BooleanKind::Union => KernelOp::Union,
            BooleanKind::Subtraction => KernelOp::Subtraction,
            BooleanKind::Intersection => KernelOp::Intersection,
        }
    }
}

/// One accepted request.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelCall {
    pub op: OpId,
    pub kind: KernelOp,
}

#[derive(Debug, Clone)]
struct MockBody {
    shape: Shape,
    faces: Vec<KernelId>,
    edges: Vec<KernelId>,
    merged_into: Option<KernelSolidHandle>,
    deleted: bool,
    properties: Vec<BodyProperty>,
    cuts: usize,
}

#[derive(Debug, Clone, Copy)]
struct TopoRef {
    body: KernelSolidHandle,
    slot: usize,
}

#[derive(Debug, Clone)]
struct MockSketch {
    frame: WeldFrame,
    entities: Vec<OutlineSegment>,
    region: Option<KernelId>,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct Region {
    sketch: SketchId,
    frame: WeldFrame,
    outline: Vec<OutlineSegment>,
}

/// Deterministic test double for the solid-modeling kernel.
#[derive(Debug, Clone)]
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    next_sketch: u64,
    bodies: BTreeMap<KernelSolidHandle, MockBody>,
    faces: HashMap<KernelId, TopoRef>,
    edges: HashMap<KernelId, TopoRef>,
    sketches: HashMap<SketchId, MockSketch>,
    regions: HashMap<KernelId, Region>,
    face_transforms: HashMap<KernelId, Transform>,
    replaced: HashMap<KernelId, (KernelId, bool)>,
    counters: HashMap<String, u64>,
    calls: Vec<KernelCall>,
    rejected: HashSet<KernelOp>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            next_sketch: 1,
            bodies: BTreeMap::new(),
            faces: HashMap::new(),
            edges: HashMap::new(),
            sketches: HashMap::new(),
            regions: HashMap::new(),
            face_transforms: HashMap::new(),
            replaced: HashMap::new(),
            counters: HashMap::new(),
            calls: Vec::new(),
            rejected: HashSet::new(),
        }
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn insert_body(&mut self, shape: Shape) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        let faces: Vec<KernelId> = (0..shape.face_count()).map(|_| self.alloc_id()).collect();
        let edges: Vec<KernelId> = (0..shape.edge_count()).map(|_| self.alloc_id()).collect();
        for (slot, id) in faces.iter().enumerate() {
            self.faces.insert(*id, TopoRef { body: handle, slot });
        }
        for (slot, id) in edges.iter().enumerate() {
            self.edges.insert(*id, TopoRef { body: handle, slot });
        }
        self.bodies.insert(
            handle,
            MockBody {
                shape,
                faces,
                edges,
                merged_into: None,
                deleted: false,
                properties: Vec::new(),
                cuts: 0,
            },
        );
        handle
    }

    // ── Scene construction ──────────────────────────────────────────

    /// Axis-aligned plate. Faces, in order: the four sides (-y, +x, +y, -x),
    /// then bottom (-z) and top (+z).
    pub fn add_box(&mut self, min: Point3d, max: Point3d) -> Result<KernelSolidHandle, KernelError> {
        let frame = WeldFrame::new(min, Vec3::Z, Vec3::X).map_err(|e| KernelError::Other {
            message: e.to_string(),
        })?;
        let (w, h) = (max.x - min.x, max.y - min.y);
        let corners = [
            Point2d::new(0.0, 0.0),
            Point2d::new(w, 0.0),
            Point2d::new(w, h),
            Point2d::new(0.0, h),
        ];
        self.add_prism(frame, &corners, max.z - min.z)
    }

    /// Straight prism: a polygon in `frame` extruded `depth` along the normal.
    pub fn add_prism(
        &mut self,
        frame: WeldFrame,
        polygon: &[Point2d],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let n = polygon.len();
        let outline = (0..n)
            .map(|i| OutlineSegment {
                name: None,
                segment: Segment::line(polygon[i], polygon[(i + 1) % n]),
            })
            .collect();
        let prism = Prism::new(frame, outline, 0.0, depth)?;
        Ok(self.insert_body(Shape::Prism(prism)))
    }

    /// Solid cylinder standing on `base`. Faces: lateral, bottom, top.
    pub fn add_cylinder(
        &mut self,
        base: Point3d,
        axis: Vec3,
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let cylinder = Cylinder::new(base, axis, radius).ok_or_else(|| KernelError::Rejected {
            operation: "add_cylinder".into(),
            reason: "zero-length axis".into(),
        })?;
        Ok(self.insert_body(Shape::Tube(Tube {
            cylinder,
            h0: 0.0,
            h1: height,
        })))
    }

    // ── Lookups for tests ──────────────────────────────────────────

    /// Planar face of `body` whose outward normal is `normal`.
    pub fn face_on(&self, body: KernelSolidHandle, normal: Vec3) -> Option<KernelId> {
        let normal = normal.normalized()?;
        self.body_faces(body).ok()?.into_iter().find(|f| {
            self.face_geom(*f)
                .ok()
                .and_then(|g| g.surface.as_plane().map(|p| p.normal.dot(&normal) > 1.0 - 1e-9))
                .unwrap_or(false)
        })
    }

    /// Non-planar faces of `body`.
    pub fn curved_faces(&self, body: KernelSolidHandle) -> Vec<KernelId> {
        self.body_faces(body)
            .unwrap_or_default()
            .into_iter()
            .filter(|f| {
                self.face_geom(*f)
                    .map(|g| !g.surface.is_planar())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Edge shared by two faces.
    pub fn edge_between(&self, a: KernelId, b: KernelId) -> Option<KernelId> {
        let eb = self.face_edges(b).ok()?;
        self.face_edges(a).ok()?.into_iter().find(|e| eb.contains(e))
    }

    pub fn calls(&self) -> &[KernelCall] {
        &self.calls
    }

    pub fn count(&self, kind: KernelOp) -> usize {
        self.calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Make every later request of `kind` fail.
    pub fn reject(&mut self, kind: KernelOp) {
        self.rejected.insert(kind);
    }

    pub fn allow(&mut self, kind: KernelOp) {
        self.rejected.remove(&kind);
    }

    pub fn name_of(&self, body: KernelSolidHandle) -> Option<&str> {
        self.bodies.get(&body)?.properties.iter().find_map(|p| match p {
            BodyProperty::Name(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn properties_of(&self, body: KernelSolidHandle) -> &[BodyProperty] {
        self.bodies
            .get(&body)
            .map(|b| b.properties.as_slice())
            .unwrap_or(&[])
    }

    /// Number of subtractions that cut into `body` without trimming it.
    pub fn cut_count(&self, body: KernelSolidHandle) -> usize {
        self.bodies.get(&body).map(|b| b.cuts).unwrap_or(0)
    }

    pub fn live_sketch_count(&self) -> usize {
        self.sketches.values().filter(|s| !s.deleted).count()
    }

    /// Length of a prism body along its extrusion axis.
    pub fn axial_length(&self, body: KernelSolidHandle) -> Option<f64> {
        match &self.bodies.get(&body)?.shape {
            Shape::Prism(p) => Some(p.z1 - p.z0),
            _ => None,
        }
    }

    // ── Internals ──────────────────────────────────────────

    fn check(&self, kind: KernelOp) -> Result<(), KernelError> {
        if self.rejected.contains(&kind) {
            return Err(KernelError::Rejected {
                operation: format!("{kind:?}"),
                reason: "rejected by the mock kernel".into(),
            });
        }
        Ok(())
    }

    fn log(&mut self, op: &OpId, kind: KernelOp) {
        debug!(%op, ?kind, "mock kernel call");
        self.calls.push(KernelCall {
            op: op.clone(),
            kind,
        });
    }

    fn resolve(&self, mut body: KernelSolidHandle) -> KernelSolidHandle {
        while let Some(next) = self.bodies.get(&body).and_then(|b| b.merged_into) {
            body = next;
        }
        body
    }

    fn live(&self, body: KernelSolidHandle) -> Result<&MockBody, KernelError> {
        match self.bodies.get(&body) {
            Some(b) if !b.deleted && b.merged_into.is_none() => Ok(b),
            _ => Err(KernelError::BodyNotFound { body }),
        }
    }

    fn face_ref(&self, face: KernelId) -> Result<TopoRef, KernelError> {
        let r = *self
            .faces
            .get(&face)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        match self.bodies.get(&r.body) {
            Some(b) if !b.deleted => Ok(r),
            _ => Err(KernelError::EntityNotFound { id: face }),
        }
    }

    fn edge_ref(&self, edge: KernelId) -> Result<TopoRef, KernelError> {
        let r = *self
            .edges
            .get(&edge)
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        match self.bodies.get(&r.body) {
            Some(b) if !b.deleted => Ok(r),
            _ => Err(KernelError::EntityNotFound { id: edge }),
        }
    }

    fn shape_of(&self, body: KernelSolidHandle) -> Result<&Shape, KernelError> {
        self.bodies
            .get(&body)
            .map(|b| &b.shape)
            .ok_or(KernelError::BodyNotFound { body })
    }

    fn region_geom(region: &Region) -> FaceGeom {
        let pts: Vec<Point3d> = region
            .outline
            .iter()
            .flat_map(|s| {
                let mut p = flatten(&s.segment);
                p.pop();
                p
            })
            .map(|p| region.frame.to_world(p))
            .collect();
        let surface = SurfaceClass::Plane {
            plane: region.frame.plane(),
        };
        let area = {
            let local: Vec<Point2d> = pts.iter().map(|p| region.frame.to_local(p)).collect();
            let n = local.len();
            (0..n)
                .map(|i| {
                    let (a, b) = (local[i], local[(i + 1) % n]);
                    a.x * b.y - b.x * a.y
                })
                .sum::<f64>()
                .abs()
                / 2.0
        };
        FaceGeom {
            surface,
            points: pts,
            area,
        }
    }

    /// Current geometry of a face: moves and replacements applied.
    fn face_geom(&self, face: KernelId) -> Result<FaceGeom, KernelError> {
        if let Some(region) = self.regions.get(&face) {
            return Ok(Self::region_geom(region));
        }
        let r = self.face_ref(face)?;
        let mut geom = self.shape_of(r.body)?.face(r.slot);
        if let Some(t) = self.face_transforms.get(&face) {
            geom = geom.transformed(t);
        }
        if let Some((template, opposite)) = self.replaced.get(&face) {
            if *template != face {
                let surface = self.face_geom(*template)?.surface;
                geom.surface = match (surface, opposite) {
                    (SurfaceClass::Plane { plane }, true) => SurfaceClass::Plane {
                        plane: plane.flipped(),
                    },
                    (s, _) => s,
                };
            }
        }
        Ok(geom)
    }

    /// Radius of a sphere around `origin` that contains the whole scene.
    fn scene_reach(&self, origin: &Point3d) -> f64 {
        let mut bb = BoundingBox::empty();
        for (h, b) in &self.bodies {
            if b.deleted {
                continue;
            }
            if let Ok(bx) = self.body_box(self.resolve(*h)) {
                bb = bb.union(&bx);
            }
        }
        if !bb.is_valid() {
            return 1.0;
        }
        origin.distance_to(&bb.center()) + bb.diagonal() + 1.0
    }

    /// Bodies whose faces belong to `body`: itself and everything merged in.
    fn members(&self, body: KernelSolidHandle) -> Vec<KernelSolidHandle> {
        self.bodies
            .iter()
            .filter(|(h, b)| !b.deleted && self.resolve(**h) == body)
            .map(|(h, _)| *h)
            .collect()
    }

    /// Common extent of `tools` along a prism axis.
    fn common_extent(
        &self,
        tools: &[KernelSolidHandle],
        frame: &WeldFrame,
    ) -> Result<(f64, f64), KernelError> {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for tool in tools {
            let (a, b) = self
                .body_box(*tool)?
                .extent_along(&frame.origin, &frame.normal);
            lo = lo.max(a);
            hi = hi.min(b);
        }
        Ok((lo, hi))
    }

    /// Order sketch entities into a closed chain, flipping any that run
    /// backwards.
    fn chain(entities: &[OutlineSegment]) -> Option<Vec<OutlineSegment>> {
        const TOL: f64 = 1e-9;
        let mut remaining: Vec<OutlineSegment> = entities.to_vec();
        if remaining.is_empty() {
            return None;
        }
        let mut out = vec![remaining.remove(0)];
        while !remaining.is_empty() {
            let tail = out.last()?.segment.end();
            let idx = remaining.iter().position(|s| {
                s.segment.start().distance_to(&tail) < TOL
                    || s.segment.end().distance_to(&tail) < TOL
            })?;
            let mut next = remaining.remove(idx);
            if next.segment.start().distance_to(&tail) >= TOL {
                next.segment = next.segment.reversed();
            }
            out.push(next);
        }
        let closed = out.last()?.segment.end().distance_to(&out[0].segment.start()) < TOL;
        closed.then_some(out)
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for MockKernel {
    fn create_sketch(&mut self, op: &OpId, frame: &WeldFrame) -> Result<SketchId, KernelError> {
        self.check(KernelOp::CreateSketch)?;
        let id = SketchId(self.next_sketch);
        self.next_sketch += 1;
        self.sketches.insert(
            id,
            MockSketch {
                frame: *frame,
                entities: Vec::new(),
                region: None,
                deleted: false,
            },
        );
        self.log(op, KernelOp::CreateSketch);
        Ok(id)
    }

    fn add_line(
        &mut self,
        sketch: SketchId,
        name: &str,
        start: Point2d,
        end: Point2d,
    ) -> Result<(), KernelError> {
        let s = self
            .sketches
            .get_mut(&sketch)
            .filter(|s| !s.deleted)
            .ok_or_else(|| KernelError::Rejected {
                operation: "add_line".into(),
                reason: "sketch does not exist".into(),
            })?;
        s.entities.push(OutlineSegment {
            name: Some(name.to_string()),
            segment: Segment::line(start, end),
        });
        Ok(())
    }

    fn add_arc(
        &mut self,
        sketch: SketchId,
        name: &str,
        start: Point2d,
        mid: Point2d,
        end: Point2d,
    ) -> Result<(), KernelError> {
        let s = self
            .sketches
            .get_mut(&sketch)
            .filter(|s| !s.deleted)
            .ok_or_else(|| KernelError::Rejected {
                operation: "add_arc".into(),
                reason: "sketch does not exist".into(),
            })?;
        s.entities.push(OutlineSegment {
            name: Some(name.to_string()),
            segment: Segment::arc(start, mid, end),
        });
        Ok(())
    }

    fn solve_sketch(&mut self, sketch: SketchId) -> Result<KernelId, KernelError> {
        self.check(KernelOp::SolveSketch)?;
        let s = self
            .sketches
            .get(&sketch)
            .filter(|s| !s.deleted)
            .ok_or_else(|| KernelError::Rejected {
                operation: "solve_sketch".into(),
                reason: "sketch does not exist".into(),
            })?;
        let frame = s.frame;
        let chained = Self::chain(&s.entities).ok_or_else(|| KernelError::Rejected {
            operation: "solve_sketch".into(),
            reason: "sketch entities do not form a closed loop".into(),
        })?;
        let outline = ccw_outline(chained)?;
        let id = self.alloc_id();
        self.regions.insert(
            id,
            Region {
                sketch,
                frame,
                outline,
            },
        );
        if let Some(s) = self.sketches.get_mut(&sketch) {
            s.region = Some(id);
        }
        let op = OpId::root(format!("sketch{}", sketch.0));
        self.log(&op, KernelOp::SolveSketch);
        Ok(id)
    }

    fn delete_sketch(&mut self, op: &OpId, sketch: SketchId) -> Result<(), KernelError> {
        self.check(KernelOp::DeleteSketch)?;
        let s = self
            .sketches
            .get_mut(&sketch)
            .filter(|s| !s.deleted)
            .ok_or_else(|| KernelError::Rejected {
                operation: "delete_sketch".into(),
                reason: "sketch does not exist".into(),
            })?;
        s.deleted = true;
        if let Some(region) = s.region.take() {
            self.regions.remove(&region);
        }
        self.log(op, KernelOp::DeleteSketch);
        Ok(())
    }

    fn extrude(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        direction: Vec3,
        bounds: ExtrudeBounds,
    ) -> Result<KernelSolidHandle, KernelError> {
        let through_all = matches!(
            bounds,
            ExtrudeBounds::ThroughAll | ExtrudeBounds::ThroughAllForward
        );
        let kind = if through_all {
            KernelOp::ExtrudeThroughAll
        } else {
            KernelOp::Extrude
        };
        self.check(kind)?;
        let face = match faces {
            [face] => *face,
            _ => {
                return Err(KernelError::NotSupported {
                    operation: format!("extrude of {} faces", faces.len()),
                })
            }
        };

        let (frame, outline, sketch) = match self.regions.get(&face) {
            Some(region) => (region.frame, region.outline.clone(), Some(region.sketch)),
            None => {
                let (frame, outline) = planar_outline(&self.face_geom(face)?)?;
                (frame, outline, None)
            }
        };
        let dir = direction.normalized().ok_or_else(|| KernelError::Rejected {
            operation: "extrude".into(),
            reason: "zero-length direction".into(),
        })?;
        let cos = dir.dot(&frame.normal);
        if cos.abs() < 1e-9 {
            return Err(KernelError::Rejected {
                operation: "extrude".into(),
                reason: "direction lies in the profile plane".into(),
            });
        }
        let reach = self.scene_reach(&frame.origin);
        let (a, b) = match bounds {
            ExtrudeBounds::ThroughAll => (-reach, reach),
            ExtrudeBounds::ThroughAllForward => (0.0, reach),
            ExtrudeBounds::Symmetric { half_depth } => (-half_depth, half_depth),
            ExtrudeBounds::Range { from, to } => (from, to),
        };
        if b - a <= 1e-12 {
            return Err(KernelError::Rejected {
                operation: "extrude".into(),
                reason: format!("empty depth range [{a}, {b}]"),
            });
        }
        let mut prism = Prism::new(frame, outline, a * cos, b * cos)?;
        prism.sketch = sketch;
        prism.through_all = through_all;
        let handle = self.insert_body(Shape::Prism(prism));
        self.log(op, kind);
        Ok(handle)
    }

    fn boolean(
        &mut self,
        op: &OpId,
        tools: &[KernelSolidHandle],
        targets: &[KernelSolidHandle],
        kind: BooleanKind,
        keep_tools: bool,
    ) -> Result<Vec<KernelSolidHandle>, KernelError> {
        self.check(kind.into())?;
        for h in tools.iter().chain(targets) {
            self.live(*h)?;
        }

        let result = match kind {
            BooleanKind::Union => {
                let mut all: Vec<KernelSolidHandle> = Vec::new();
                for h in targets.iter().chain(tools) {
                    if !all.contains(h) {
                        all.push(*h);
                    }
                }
                let first = *all.first().ok_or_else(|| KernelError::BooleanFailed {
                    reason: "union of nothing".into(),
                })?;
                for h in &all[1..] {
                    if let Some(b) = self.bodies.get_mut(h) {
                        b.merged_into = Some(first);
                    }
                }
                vec![first]
            }
            BooleanKind::Subtraction | BooleanKind::Intersection => {
                if targets.is_empty() {
                    return Err(KernelError::BooleanFailed {
                        reason: "no targets".into(),
                    });
                }
                for target in targets {
                    let frame = match &self.shape_of(*target)? {
                        Shape::Prism(p)
                            if p.through_all || kind == BooleanKind::Intersection =>
                        {
                            Some(p.frame)
                        }
                        _ => None,
                    };
                    let extent = match frame {
                        Some(frame) => Some(self.common_extent(tools, &frame)?),
                        None => None,
                    };
                    let body = self
                        .bodies
                        .get_mut(target)
                        .ok_or(KernelError::BodyNotFound { body: *target })?;
                    match (&mut body.shape, extent) {
                        (Shape::Prism(p), Some((lo, hi))) => {
                            if !p.clip(lo, hi) {
                                return Err(KernelError::BooleanFailed {
                                    reason: format!("{kind:?} leaves nothing of {target}"),
                                });
                            }
                        }
                        _ => body.cuts += 1,
                    }
                }
                if !keep_tools {
                    for tool in tools {
                        if let Some(b) = self.bodies.get_mut(tool) {
                            b.deleted = true;
                        }
                    }
                }
                targets.to_vec()
            }
        };
        self.log(op, kind.into());
        Ok(result)
    }

    fn sweep(
        &mut self,
        op: &OpId,
        profile: KernelId,
        path: KernelId,
        _lock: Option<KernelId>,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.check(KernelOp::Sweep)?;
        let region = self
            .regions
            .get(&profile)
            .cloned()
            .ok_or_else(|| KernelError::Rejected {
                operation: "sweep".into(),
                reason: "profile is not a sketch region".into(),
            })?;
        let shape = match self.edge_geometry(path)? {
            EdgeGeometry::Line(seg) => {
                let dir = seg.direction().ok_or_else(|| KernelError::Rejected {
                    operation: "sweep".into(),
                    reason: "degenerate path".into(),
                })?;
                if dir.dot(&region.frame.normal).abs() < 1.0 - 1e-6 {
                    return Err(KernelError::Rejected {
                        operation: "sweep".into(),
                        reason: "path is not normal to the profile plane".into(),
                    });
                }
                let za = region.frame.depth_of(&seg.start);
                let zb = region.frame.depth_of(&seg.end);
                let mut prism = Prism::new(region.frame, region.outline.clone(), za, zb)?;
                prism.sketch = Some(region.sketch);
                Shape::Prism(prism)
            }
            EdgeGeometry::Circle {
                center,
                axis,
                radius,
            } => {
                let faces = region
                    .outline
                    .iter()
                    .map(|s| {
                        let pts: Vec<Point3d> = flatten(&s.segment)
                            .into_iter()
                            .map(|p| region.frame.to_world(p))
                            .collect();
                        let length: f64 = pts.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
                        StaticFace {
                            surface: SurfaceClass::OtherCurved,
                            points: ring_samples(&pts, center, axis),
                            area: length * TAU * radius,
                            entity: s.name.clone().map(|n| (region.sketch, n)),
                        }
                    })
                    .collect();
                Shape::Lump(Lump {
                    faces,
                    caps: Vec::new(),
                })
            }
            EdgeGeometry::Arc { .. } => {
                return Err(KernelError::NotSupported {
                    operation: "sweep along an arc".into(),
                })
            }
        };
        let handle = self.insert_body(shape);
        self.log(op, KernelOp::Sweep);
        Ok(handle)
    }

    fn replace_face(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        template: KernelId,
        opposite_sense: bool,
    ) -> Result<(), KernelError> {
        self.check(KernelOp::ReplaceFace)?;
        self.face_geom(template)?;
        for face in faces {
            self.face_ref(*face)?;
        }
        for face in faces {
            self.replaced.insert(*face, (template, opposite_sense));
        }
        self.log(op, KernelOp::ReplaceFace);
        Ok(())
    }

    fn offset_face(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        distance: f64,
    ) -> Result<(), KernelError> {
        self.check(KernelOp::OffsetFace)?;
        for face in faces {
            let r = self.face_ref(*face)?;
            let body = self
                .bodies
                .get_mut(&r.body)
                .ok_or(KernelError::EntityNotFound { id: *face })?;
            match &mut body.shape {
                Shape::Prism(p) => {
                    let n = p.outline.len();
                    if r.slot < n {
                        p.offset_side(r.slot, distance)?;
                    } else {
                        p.offset_cap(r.slot > n, distance);
                    }
                }
                Shape::Tube(t) => match r.slot {
                    0 => t.cylinder.radius += distance,
                    1 => t.h0 -= distance,
                    _ => t.h1 += distance,
                },
                Shape::Lump(_) => {
                    return Err(KernelError::NotSupported {
                        operation: "offset of a lofted or revolved face".into(),
                    })
                }
            }
        }
        self.log(op, KernelOp::OffsetFace);
        Ok(())
    }

    fn move_face(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        transform: &Transform,
    ) -> Result<(), KernelError> {
        self.check(KernelOp::MoveFace)?;
        for face in faces {
            self.face_ref(*face)?;
        }
        for face in faces {
            let composed = match self.face_transforms.get(face) {
                Some(existing) => transform.then(existing),
                None => *transform,
            };
            self.face_transforms.insert(*face, composed);
        }
        self.log(op, KernelOp::MoveFace);
        Ok(())
    }

    fn revolve(
        &mut self,
        op: &OpId,
        face: KernelId,
        axis: &Line3d,
        angle: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.check(KernelOp::Revolve)?;
        if angle.abs() < 1e-12 {
            return Err(KernelError::Rejected {
                operation: "revolve".into(),
                reason: "zero angle".into(),
            });
        }
        let start = self.face_geom(face)?;
        let rotation =
            Transform::rotation_about_line(axis, angle).ok_or_else(|| KernelError::Rejected {
                operation: "revolve".into(),
                reason: "degenerate axis".into(),
            })?;
        let end = start.transformed(&rotation);
        let lateral = StaticFace {
            surface: SurfaceClass::OtherCurved,
            points: revolve_samples(&start.points, axis, angle, 8),
            area: 0.0,
            entity: None,
        };
        let lump = Lump {
            faces: vec![
                StaticFace {
                    surface: start.surface,
                    points: start.points.clone(),
                    area: start.area,
                    entity: None,
                },
                StaticFace {
                    surface: end.surface,
                    points: end.points,
                    area: end.area,
                    entity: None,
                },
                lateral,
            ],
            caps: vec![0, 1],
        };
        let handle = self.insert_body(Shape::Lump(lump));
        self.log(op, KernelOp::Revolve);
        Ok(handle)
    }

    fn loft(
        &mut self,
        op: &OpId,
        profiles: &[KernelId],
        _continuity: LoftContinuity,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.check(KernelOp::Loft)?;
        if profiles.len() < 2 {
            return Err(KernelError::Rejected {
                operation: "loft".into(),
                reason: "a loft needs at least two profiles".into(),
            });
        }
        let geoms = profiles
            .iter()
            .map(|f| self.face_geom(*f))
            .collect::<Result<Vec<_>, _>>()?;
        let mut faces: Vec<StaticFace> = geoms
            .iter()
            .map(|g| StaticFace {
                surface: g.surface,
                points: g.points.clone(),
                area: g.area,
                entity: None,
            })
            .collect();
        let last = faces.len() - 1;
        faces.push(StaticFace {
            surface: SurfaceClass::OtherCurved,
            points: geoms.iter().flat_map(|g| g.points.iter().copied()).collect(),
            area: 0.0,
            entity: None,
        });
        let handle = self.insert_body(Shape::Lump(Lump {
            faces,
            caps: vec![0, last],
        }));
        self.log(op, KernelOp::Loft);
        Ok(handle)
    }

    fn delete_bodies(
        &mut self,
        op: &OpId,
        bodies: &[KernelSolidHandle],
    ) -> Result<(), KernelError> {
        self.check(KernelOp::DeleteBodies)?;
        for body in bodies {
            self.live(*body)?;
        }
        for body in bodies {
            if let Some(b) = self.bodies.get_mut(body) {
                b.deleted = true;
            }
        }
        self.log(op, KernelOp::DeleteBodies);
        Ok(())
    }

    fn set_property(
        &mut self,
        op: &OpId,
        bodies: &[KernelSolidHandle],
        property: BodyProperty,
    ) -> Result<(), KernelError> {
        self.check(KernelOp::SetProperty)?;
        for body in bodies {
            self.live(*body)?;
        }
        for body in bodies {
            if let Some(b) = self.bodies.get_mut(body) {
                b.properties.retain(|p| {
                    std::mem::discriminant(p) != std::mem::discriminant(&property)
                });
                b.properties.push(property.clone());
            }
        }
        self.log(op, KernelOp::SetProperty);
        Ok(())
    }
}

impl KernelIntrospect for MockKernel {
    fn classify_surface(&self, face: KernelId) -> Result<SurfaceClass, KernelError> {
        Ok(self.face_geom(face)?.surface)
    }

    fn distance(
        &self,
        a: KernelId,
        b: KernelId,
        extend_b: bool,
    ) -> Result<DistanceResult, KernelError> {
        let ga = self.face_geom(a)?;
        let gb = self.face_geom(b)?;
        let (distance, pa, pb) = face_distance(&ga, &gb, extend_b);
        if !distance.is_finite() {
            return Err(KernelError::Other {
                message: format!("no distance between {a} and {b}"),
            });
        }
        Ok(DistanceResult {
            distance,
            points: [pa, pb],
            parameters: [parameters_on(&ga.surface, &pa), parameters_on(&gb.surface, &pb)],
        })
    }

    fn body_distance(
        &self,
        a: KernelSolidHandle,
        b: KernelSolidHandle,
    ) -> Result<f64, KernelError> {
        Ok(self.body_box(a)?.distance_to(&self.body_box(b)?))
    }

    fn tangent_plane(&self, face: KernelId, parameter: [f64; 2]) -> Result<Plane, KernelError> {
        match self.face_geom(face)?.surface {
            SurfaceClass::Plane { plane } => Ok(plane),
            SurfaceClass::Cylinder { cylinder } => {
                Plane::new(cylinder.evaluate(parameter), cylinder.normal_at(parameter)).ok_or_else(
                    || KernelError::Other {
                        message: "degenerate tangent plane".into(),
                    },
                )
            }
            SurfaceClass::OtherCurved => Err(KernelError::NotSupported {
                operation: "tangent plane of a free-form face".into(),
            }),
        }
    }

    fn owner_body(&self, entity: KernelId) -> Result<KernelSolidHandle, KernelError> {
        let r = self
            .face_ref(entity)
            .or_else(|_| self.edge_ref(entity))?;
        Ok(self.resolve(r.body))
    }

    fn solids(&self) -> Vec<KernelSolidHandle> {
        self.bodies
            .iter()
            .filter(|(_, b)| !b.deleted && b.merged_into.is_none())
            .map(|(h, _)| *h)
            .collect()
    }

    fn body_faces(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError> {
        self.live(body)?;
        Ok(self
            .members(body)
            .iter()
            .filter_map(|h| self.bodies.get(h))
            .flat_map(|b| b.faces.iter().copied())
            .collect())
    }

    fn body_edges(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError> {
        self.live(body)?;
        Ok(self
            .members(body)
            .iter()
            .filter_map(|h| self.bodies.get(h))
            .flat_map(|b| b.edges.iter().copied())
            .collect())
    }

    fn body_box(&self, body: KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        let mut bb = BoundingBox::empty();
        for face in self.body_faces(body)? {
            for p in self.face_geom(face)?.points {
                bb.expand_to_include(&p);
            }
        }
        Ok(bb)
    }

    fn face_edges(&self, face: KernelId) -> Result<Vec<KernelId>, KernelError> {
        let r = self.face_ref(face)?;
        let body = self
            .bodies
            .get(&r.body)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        Ok(body
            .shape
            .face_edge_slots(r.slot)
            .into_iter()
            .filter_map(|slot| body.edges.get(slot).copied())
            .collect())
    }

    fn edge_faces(&self, edge: KernelId) -> Result<Vec<KernelId>, KernelError> {
        let r = self.edge_ref(edge)?;
        let body = self
            .bodies
            .get(&r.body)
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        Ok(body
            .shape
            .edge_face_slots(r.slot)
            .into_iter()
            .filter_map(|slot| body.faces.get(slot).copied())
            .collect())
    }

    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError> {
        let r = self.edge_ref(edge)?;
        Ok(self.shape_of(r.body)?.edge(r.slot))
    }

    fn face_centroid(&self, face: KernelId) -> Result<Point3d, KernelError> {
        Ok(self.face_geom(face)?.centroid())
    }

    fn face_area(&self, face: KernelId) -> Result<f64, KernelError> {
        Ok(self.face_geom(face)?.area)
    }

    fn face_box(&self, face: KernelId, frame: &WeldFrame) -> Result<BoundingBox, KernelError> {
        let points: Vec<Point3d> = self
            .face_geom(face)?
            .points
            .iter()
            .map(|p| {
                let local = frame.to_local(p);
                Point3d::new(local.x, local.y, frame.depth_of(p))
            })
            .collect();
        Ok(BoundingBox::from_points(&points))
    }

    fn tangent_connected_faces(&self, face: KernelId) -> Result<Vec<KernelId>, KernelError> {
        let start = self.face_geom(face)?;
        let mut seen = vec![face];
        let mut queue = VecDeque::from([(face, start.surface)]);
        while let Some((current, surface)) = queue.pop_front() {
            for edge in self.face_edges(current)? {
                for next in self.edge_faces(edge)? {
                    if seen.contains(&next) {
                        continue;
                    }
                    let other = self.face_geom(next)?.surface;
                    let smooth = match (&surface, &other) {
                        (SurfaceClass::Plane { plane: a }, SurfaceClass::Plane { plane: b }) => {
                            a.normal.dot(&b.normal) > 1.0 - 1e-9
                        }
                        (
                            SurfaceClass::Cylinder { cylinder: a },
                            SurfaceClass::Cylinder { cylinder: b },
                        ) => {
                            a.axis.is_parallel_to(&b.axis, 1e-9)
                                && (a.radius - b.radius).abs() < 1e-9
                        }
                        _ => false,
                    };
                    if smooth {
                        seen.push(next);
                        queue.push_back((next, other));
                    }
                }
            }
        }
        Ok(seen)
    }

    fn cap_faces(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError> {
        let b = self.live(body)?;
        Ok(b.shape
            .cap_slots()
            .into_iter()
            .filter_map(|slot| b.faces.get(slot).copied())
            .collect())
    }

    fn sketch_entity_faces(&self, sketch: SketchId, name: &str) -> Vec<KernelId> {
        let mut out = Vec::new();
        for b in self.bodies.values().filter(|b| !b.deleted) {
            for slot in 0..b.shape.face_count() {
                if b.shape.entity(slot) == Some((sketch, name)) {
                    if let Some(face) = b.faces.get(slot) {
                        out.push(*face);
                    }
                }
            }
        }
        out
    }

    fn collision(
        &self,
        tool: KernelId,
        target: KernelId,
        tol: f64,
    ) -> Result<Option<Collision>, KernelError> {
        let a = self.face_geom(tool)?.bbox();
        let b = self.face_geom(target)?.bbox();
        if !a.intersects(&b, tol) {
            return Ok(None);
        }
        let overlap = BoundingBox::new(
            Point3d::new(a.min.x.max(b.min.x), a.min.y.max(b.min.y), a.min.z.max(b.min.z)),
            Point3d::new(a.max.x.min(b.max.x), a.max.y.min(b.max.y), a.max.z.min(b.max.z)),
        );
        Ok(Some(Collision {
            tool,
            target,
            overlap,
        }))
    }
}

impl CounterStore for MockKernel {
    fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }

    fn set_counter(&mut self, key: &str, value: u64) {
        self.counters.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plate(kernel: &mut MockKernel, min: [f64; 3], max: [f64; 3]) -> KernelSolidHandle {
        kernel
            .add_box(
                Point3d::new(min[0], min[1], min[2]),
                Point3d::new(max[0], max[1], max[2]),
            )
            .unwrap()
    }

    #[test]
    fn test_box_topology_counts() {
        let mut kernel = MockKernel::new();
        let body = plate(&mut kernel, [0.0; 3], [1.0, 2.0, 3.0]);
        let faces = kernel.body_faces(body).unwrap();
        let edges = kernel.body_edges(body).unwrap();
        assert_eq!(faces.len(), 6);
        assert_eq!(edges.len(), 12);
        for face in &faces {
            assert_eq!(kernel.face_edges(*face).unwrap().len(), 4);
        }
        for edge in &edges {
            assert_eq!(kernel.edge_faces(*edge).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_face_on_finds_outward_faces() {
        let mut kernel = MockKernel::new();
        let body = plate(&mut kernel, [0.0; 3], [4.0, 2.0, 1.0]);
        let top = kernel.face_on(body, Vec3::Z).unwrap();
        let right = kernel.face_on(body, Vec3::X).unwrap();
        assert_relative_eq!(kernel.face_area(top).unwrap(), 8.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.face_centroid(right).unwrap().x, 4.0, epsilon = 1e-12);

        let edge = kernel.edge_between(top, right).unwrap();
        let seg = *kernel.edge_geometry(edge).unwrap().as_segment().unwrap();
        assert_relative_eq!(seg.start.x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(seg.start.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(seg.length(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sketch_extrude_tracks_entities() {
        let mut kernel = MockKernel::new();
        let op = OpId::root("weld");
        let frame = WeldFrame::new(Point3d::ORIGIN, Vec3::Y, Vec3::X).unwrap();
        let sketch = kernel.create_sketch(&op.child("sketch"), &frame).unwrap();
        let (a, b) = (Point2d::new(3.0, 0.0), Point2d::new(0.0, 3.0));
        kernel.add_line(sketch, "leg0", Point2d::ORIGIN, a).unwrap();
        kernel.add_line(sketch, "cap0", a, b).unwrap();
        kernel.add_line(sketch, "leg1", b, Point2d::ORIGIN).unwrap();
        let region = kernel.solve_sketch(sketch).unwrap();

        let body = kernel
            .extrude(
                &op.child("extrude"),
                &[region],
                Vec3::Y,
                ExtrudeBounds::Symmetric { half_depth: 5.0 },
            )
            .unwrap();
        assert_eq!(kernel.sketch_entity_faces(sketch, "leg0").len(), 1);
        assert_eq!(kernel.sketch_entity_faces(sketch, "cap0").len(), 1);
        assert_eq!(kernel.cap_faces(body).unwrap().len(), 2);
        assert_relative_eq!(kernel.axial_length(body).unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(kernel.count(KernelOp::Extrude), 1);
    }

    #[test]
    fn test_open_sketch_is_rejected() {
        let mut kernel = MockKernel::new();
        let frame = WeldFrame::new(Point3d::ORIGIN, Vec3::Z, Vec3::X).unwrap();
        let sketch = kernel.create_sketch(&OpId::root("s"), &frame).unwrap();
        kernel
            .add_line(sketch, "a", Point2d::ORIGIN, Point2d::new(1.0, 0.0))
            .unwrap();
        kernel
            .add_line(sketch, "b", Point2d::new(1.0, 0.0), Point2d::new(1.0, 1.0))
            .unwrap();
        assert!(matches!(
            kernel.solve_sketch(sketch),
            Err(KernelError::Rejected { .. })
        ));
    }

    #[test]
    fn test_through_all_bead_is_trimmed_by_plates() {
        let mut kernel = MockKernel::new();
        let base = plate(&mut kernel, [0.0, 0.0, -10.0], [100.0, 60.0, 0.0]);
        let wall = plate(&mut kernel, [0.0, 10.0, 0.0], [10.0, 50.0, 40.0]);
        let frame = WeldFrame::new(Point3d::new(10.0, 0.0, 0.0), Vec3::Y, Vec3::X).unwrap();
        let sketch = kernel.create_sketch(&OpId::root("s"), &frame).unwrap();
        let (a, b) = (Point2d::new(5.0, 0.0), Point2d::new(0.0, -5.0));
        kernel.add_line(sketch, "l1", Point2d::ORIGIN, a).unwrap();
        kernel.add_line(sketch, "c", a, b).unwrap();
        kernel.add_line(sketch, "l2", b, Point2d::ORIGIN).unwrap();
        let region = kernel.solve_sketch(sketch).unwrap();
        let bead = kernel
            .extrude(&OpId::root("e"), &[region], Vec3::Y, ExtrudeBounds::ThroughAll)
            .unwrap();
        assert!(kernel.axial_length(bead).unwrap() > 100.0);

        kernel
            .boolean(
                &OpId::root("b"),
                &[base, wall],
                &[bead],
                BooleanKind::Subtraction,
                true,
            )
            .unwrap();
        assert_relative_eq!(kernel.axial_length(bead).unwrap(), 40.0, epsilon = 1e-9);
        assert_eq!(kernel.solids().len(), 3);
    }

    #[test]
    fn test_rejected_request_is_not_logged() {
        let mut kernel = MockKernel::new();
        let body = plate(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
        let top = kernel.face_on(body, Vec3::Z).unwrap();
        kernel.reject(KernelOp::ExtrudeThroughAll);
        let err = kernel
            .extrude(&OpId::root("e"), &[top], Vec3::Z, ExtrudeBounds::ThroughAll)
            .unwrap_err();
        assert!(matches!(err, KernelError::Rejected { .. }));
        assert!(kernel.calls().is_empty());

        kernel.allow(KernelOp::ExtrudeThroughAll);
        kernel
            .extrude(&OpId::root("e"), &[top], Vec3::Z, ExtrudeBounds::ThroughAll)
            .unwrap();
        assert_eq!(kernel.count(KernelOp::ExtrudeThroughAll), 1);
    }

    #[test]
    fn test_union_merges_bodies() {
        let mut kernel = MockKernel::new();
        let a = plate(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
        let b = plate(&mut kernel, [1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let face_b = kernel.face_on(b, Vec3::X).unwrap();
        let result = kernel
            .boolean(&OpId::root("u"), &[b], &[a], BooleanKind::Union, false)
            .unwrap();
        assert_eq!(result, vec![a]);
        assert_eq!(kernel.solids(), vec![a]);
        assert_eq!(kernel.owner_body(face_b).unwrap(), a);
        assert_eq!(kernel.body_faces(a).unwrap().len(), 12);
        assert_relative_eq!(kernel.body_box(a).unwrap().max.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_face_distance_reports_gap() {
        let mut kernel = MockKernel::new();
        let base = plate(&mut kernel, [0.0, 0.0, -1.0], [10.0, 10.0, 0.0]);
        let wall = plate(&mut kernel, [4.0, 0.0, 2.0], [5.0, 10.0, 8.0]);
        let top = kernel.face_on(base, Vec3::Z).unwrap();
        let side = kernel.face_on(wall, Vec3::X).unwrap();
        let d = kernel.distance(top, side, false).unwrap();
        assert_relative_eq!(d.distance, 2.0, epsilon = 1e-9);
        assert_relative_eq!(d.points[0].z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(d.points[1].z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cylinder_tangent_plane_touches_surface() {
        let mut kernel = MockKernel::new();
        let tube = kernel
            .add_cylinder(Point3d::ORIGIN, Vec3::Z, 2.0, 10.0)
            .unwrap();
        let lateral = kernel.curved_faces(tube)[0];
        let plane = kernel.tangent_plane(lateral, [0.0, 3.0]).unwrap();
        assert_relative_eq!(plane.origin.distance_to(&Point3d::new(0.0, 0.0, 3.0)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(plane.normal.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_face_extends_plate() {
        let mut kernel = MockKernel::new();
        let body = plate(&mut kernel, [0.0; 3], [10.0, 5.0, 2.0]);
        let right = kernel.face_on(body, Vec3::X).unwrap();
        kernel.offset_face(&OpId::root("o"), &[right], 1.5).unwrap();
        assert_relative_eq!(kernel.body_box(body).unwrap().max.x, 11.5, epsilon = 1e-12);
    }

    #[test]
    fn test_replaced_face_takes_template_plane() {
        let mut kernel = MockKernel::new();
        let a = plate(&mut kernel, [0.0; 3], [1.0, 1.0, 1.0]);
        let b = plate(&mut kernel, [0.0, 0.0, 5.0], [1.0, 1.0, 6.0]);
        let top_a = kernel.face_on(a, Vec3::Z).unwrap();
        let bottom_b = kernel.face_on(b, -Vec3::Z).unwrap();
        kernel
            .replace_face(&OpId::root("r"), &[top_a], bottom_b, true)
            .unwrap();
        let plane = kernel.face_plane(top_a).unwrap();
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.origin.z, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_counters_persist() {
        let mut kernel = MockKernel::new();
        assert_eq!(kernel.get_counter("weldNumber"), None);
        kernel.set_counter("weldNumber", 3);
        assert_eq!(kernel.get_counter("weldNumber"), Some(3));
    }
}
