use weld_geom::{
    plane_plane, BoundingBox, Line3d, Plane, Point2d, Point3d, Transform, Vec3, WeldFrame,
};

use crate::types::*;

/// Solid-modeling requests issued by the weld planners.
///
/// Every request carries an [`OpId`] so that the entities it creates can be
/// told apart from those of sibling requests. Requests are synchronous and
/// each may fail independently.
pub trait Kernel {
    /// Start an empty sketch on the plane of `frame`.
    fn create_sketch(&mut self, op: &OpId, frame: &WeldFrame) -> Result<SketchId, KernelError>;

    /// Add a named line in frame-local coordinates.
    fn add_line(
        &mut self,
        sketch: SketchId,
        name: &str,
        start: Point2d,
        end: Point2d,
    ) -> Result<(), KernelError>;

    /// Add a named three-point arc in frame-local coordinates.
    fn add_arc(
        &mut self,
        sketch: SketchId,
        name: &str,
        start: Point2d,
        mid: Point2d,
        end: Point2d,
    ) -> Result<(), KernelError>;

    /// Close the sketch and return the region face bounded by its entities.
    fn solve_sketch(&mut self, sketch: SketchId) -> Result<KernelId, KernelError>;

    fn delete_sketch(&mut self, op: &OpId, sketch: SketchId) -> Result<(), KernelError>;

    /// Extrude planar faces along `direction`.
    fn extrude(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        direction: Vec3,
        bounds: ExtrudeBounds,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Combine bodies. Union merges everything into one body; subtraction
    /// and intersection modify each target. Returns the resulting bodies.
    fn boolean(
        &mut self,
        op: &OpId,
        tools: &[KernelSolidHandle],
        targets: &[KernelSolidHandle],
        kind: BooleanKind,
        keep_tools: bool,
    ) -> Result<Vec<KernelSolidHandle>, KernelError>;

    /// Sweep a region face along an edge. `lock` keeps the profile oriented
    /// relative to that face.
    fn sweep(
        &mut self,
        op: &OpId,
        profile: KernelId,
        path: KernelId,
        lock: Option<KernelId>,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Replace faces by the surface of `template`.
    fn replace_face(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        template: KernelId,
        opposite_sense: bool,
    ) -> Result<(), KernelError>;

    /// Move faces along their normals, growing the body for positive values.
    fn offset_face(&mut self, op: &OpId, faces: &[KernelId], distance: f64)
        -> Result<(), KernelError>;

    fn move_face(
        &mut self,
        op: &OpId,
        faces: &[KernelId],
        transform: &Transform,
    ) -> Result<(), KernelError>;

    fn revolve(
        &mut self,
        op: &OpId,
        face: KernelId,
        axis: &Line3d,
        angle: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    fn loft(
        &mut self,
        op: &OpId,
        profiles: &[KernelId],
        continuity: LoftContinuity,
    ) -> Result<KernelSolidHandle, KernelError>;

    fn delete_bodies(&mut self, op: &OpId, bodies: &[KernelSolidHandle])
        -> Result<(), KernelError>;

    fn set_property(
        &mut self,
        op: &OpId,
        bodies: &[KernelSolidHandle],
        property: BodyProperty,
    ) -> Result<(), KernelError>;
}

/// Read-only queries on the kernel session.
pub trait KernelIntrospect {
    fn classify_surface(&self, face: KernelId) -> Result<SurfaceClass, KernelError>;

    /// Plane of a planar face.
    fn face_plane(&self, face: KernelId) -> Result<Plane, KernelError> {
        match self.classify_surface(face)? {
            SurfaceClass::Plane { plane } => Ok(plane),
            _ => Err(KernelError::Rejected {
                operation: "face_plane".into(),
                reason: format!("face {face} is not planar"),
            }),
        }
    }

    /// Closest points between two faces. With `extend_b` the second face
    /// is treated as its unbounded surface.
    fn distance(
        &self,
        a: KernelId,
        b: KernelId,
        extend_b: bool,
    ) -> Result<DistanceResult, KernelError>;

    fn body_distance(
        &self,
        a: KernelSolidHandle,
        b: KernelSolidHandle,
    ) -> Result<f64, KernelError>;

    /// Tangent plane of a face at surface parameters.
    fn tangent_plane(&self, face: KernelId, parameter: [f64; 2]) -> Result<Plane, KernelError>;

    /// Intersection line of two planes, `None` when parallel.
    fn intersect_planes(&self, a: &Plane, b: &Plane, angular_tol: f64) -> Option<Line3d> {
        plane_plane(a, b, angular_tol)
    }

    /// Body owning a face or an edge.
    fn owner_body(&self, entity: KernelId) -> Result<KernelSolidHandle, KernelError>;

    /// Live solid bodies, in creation order.
    fn solids(&self) -> Vec<KernelSolidHandle>;

    fn body_faces(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError>;

    fn body_edges(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError>;

    fn body_box(&self, body: KernelSolidHandle) -> Result<BoundingBox, KernelError>;

    fn face_edges(&self, face: KernelId) -> Result<Vec<KernelId>, KernelError>;

    fn edge_faces(&self, edge: KernelId) -> Result<Vec<KernelId>, KernelError>;

    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError>;

    fn face_centroid(&self, face: KernelId) -> Result<Point3d, KernelError>;

    fn face_area(&self, face: KernelId) -> Result<f64, KernelError>;

    /// Tight box of a face in `frame` coordinates: x and y along the frame
    /// axes, z along the frame normal.
    fn face_box(&self, face: KernelId, frame: &WeldFrame) -> Result<BoundingBox, KernelError>;

    /// Faces reachable from `face` across smooth edges, `face` included.
    fn tangent_connected_faces(&self, face: KernelId) -> Result<Vec<KernelId>, KernelError>;

    /// Start and end cap faces of a body built by extrude or sweep.
    fn cap_faces(&self, body: KernelSolidHandle) -> Result<Vec<KernelId>, KernelError>;

    /// Live faces derived from the named sketch entity.
    fn sketch_entity_faces(&self, sketch: SketchId, name: &str) -> Vec<KernelId>;

    /// Overlap between two faces, `None` when they are apart by more than
    /// `tol`.
    fn collision(
        &self,
        tool: KernelId,
        target: KernelId,
        tol: f64,
    ) -> Result<Option<Collision>, KernelError>;
}

/// Persistent integer variables scoped to a document session.
pub trait CounterStore {
    fn get_counter(&self, key: &str) -> Option<u64>;

    fn set_counter(&mut self, key: &str, value: u64);
}
