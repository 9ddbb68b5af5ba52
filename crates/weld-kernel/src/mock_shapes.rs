//! Analytic shapes behind the mock kernel's bodies.
//!
//! Every body is one of three shapes. A prism is a closed 2D outline in a
//! frame extruded along the frame normal; plates, beads, and cut tools are
//! all prisms. A tube is a solid cylinder. A lump is an opaque body built
//! by revolve, loft, or a sweep around a circle, whose faces are stored as
//! sampled points.

use std::f64::consts::TAU;

use weld_geom::geometry::intersection::circle_through_points;
use weld_geom::{
    BoundingBox, Cylinder, Plane, Point2d, Point3d, Segment, Segment3d, Transform, Vec2, Vec3,
    WeldFrame,
};

use crate::types::{EdgeGeometry, KernelError, SketchId, SurfaceClass};

const CIRCLE_SAMPLES: usize = 24;

/// Outline segment of a prism, named after the sketch entity it came from.
#[derive(Debug, Clone)]
pub(crate) struct OutlineSegment {
    pub name: Option<String>,
    pub segment: Segment,
}

#[derive(Debug, Clone)]
pub(crate) struct Prism {
    pub frame: WeldFrame,
    /// Counter-clockwise in frame coordinates.
    pub outline: Vec<OutlineSegment>,
    pub z0: f64,
    pub z1: f64,
    pub sketch: Option<SketchId>,
    /// Built by an unbounded extrude and not yet trimmed.
    pub through_all: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Tube {
    pub cylinder: Cylinder,
    pub h0: f64,
    pub h1: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct StaticFace {
    pub surface: SurfaceClass,
    pub points: Vec<Point3d>,
    pub area: f64,
    pub entity: Option<(SketchId, String)>,
}

#[derive(Debug, Clone)]
pub(crate) struct Lump {
    pub faces: Vec<StaticFace>,
    pub caps: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Prism(Prism),
    Tube(Tube),
    Lump(Lump),
}

/// Geometry of one face, resolved for distance and overlap queries.
#[derive(Debug, Clone)]
pub(crate) struct FaceGeom {
    pub surface: SurfaceClass,
    /// Ordered boundary for planar faces, surface samples otherwise.
    pub points: Vec<Point3d>,
    pub area: f64,
}

impl FaceGeom {
    pub fn transformed(&self, t: &Transform) -> Self {
        let surface = match self.surface {
            SurfaceClass::Plane { plane } => SurfaceClass::Plane {
                plane: Plane {
                    origin: t.transform_point(&plane.origin),
                    normal: t.transform_vector(&plane.normal),
                    u_axis: t.transform_vector(&plane.u_axis),
                    v_axis: t.transform_vector(&plane.v_axis),
                },
            },
            SurfaceClass::Cylinder { cylinder } => SurfaceClass::Cylinder {
                cylinder: Cylinder {
                    origin: t.transform_point(&cylinder.origin),
                    axis: t.transform_vector(&cylinder.axis),
                    radius: cylinder.radius,
                    ref_dir: t.transform_vector(&cylinder.ref_dir),
                },
            },
            SurfaceClass::OtherCurved => SurfaceClass::OtherCurved,
        };
        Self {
            surface,
            points: self.points.iter().map(|p| t.transform_point(p)).collect(),
            area: self.area,
        }
    }

    pub fn centroid(&self) -> Point3d {
        Point3d::centroid(&self.points).unwrap_or(Point3d::ORIGIN)
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }
}

pub(crate) fn flatten(segment: &Segment) -> Vec<Point2d> {
    segment
        .flatten()
        .unwrap_or_else(|| vec![segment.start(), segment.end()])
}

fn polygon_area(points: &[Point2d]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

fn polyline_length(points: &[Point2d]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Reverse a closed outline when it runs clockwise. Rejects empty loops.
pub(crate) fn ccw_outline(outline: Vec<OutlineSegment>) -> Result<Vec<OutlineSegment>, KernelError> {
    let pts: Vec<Point2d> = outline
        .iter()
        .flat_map(|s| {
            let mut p = flatten(&s.segment);
            p.pop();
            p
        })
        .collect();
    let area = polygon_area(&pts);
    if area.abs() < 1e-12 {
        return Err(KernelError::Rejected {
            operation: "profile".into(),
            reason: "outline encloses no area".into(),
        });
    }
    if area > 0.0 {
        return Ok(outline);
    }
    Ok(outline
        .into_iter()
        .rev()
        .map(|s| OutlineSegment {
            name: s.name,
            segment: s.segment.reversed(),
        })
        .collect())
}

impl Prism {
    pub fn new(
        frame: WeldFrame,
        outline: Vec<OutlineSegment>,
        z0: f64,
        z1: f64,
    ) -> Result<Self, KernelError> {
        Ok(Self {
            frame,
            outline: ccw_outline(outline)?,
            z0: z0.min(z1),
            z1: z0.max(z1),
            sketch: None,
            through_all: false,
        })
    }

    pub fn world(&self, p: Point2d, z: f64) -> Point3d {
        self.frame.to_world(p) + self.frame.normal * z
    }

    fn n(&self) -> usize {
        self.outline.len()
    }

    fn outline_points(&self) -> Vec<Point2d> {
        self.outline
            .iter()
            .flat_map(|s| {
                let mut p = flatten(&s.segment);
                p.pop();
                p
            })
            .collect()
    }

    /// Outward unit normal of a straight outline segment, in frame coordinates.
    fn side_normal(segment: &Segment) -> Option<Vec2> {
        match *segment {
            Segment::Line { start, end } => {
                let d = end - start;
                Vec2::new(d.y, -d.x).normalized()
            }
            Segment::Arc { .. } => None,
        }
    }

    fn side_face(&self, i: usize) -> FaceGeom {
        let seg = &self.outline[i].segment;
        let pts = flatten(seg);
        let height = self.z1 - self.z0;
        let zm = (self.z0 + self.z1) / 2.0;
        let surface = match *seg {
            Segment::Line { start, end } => match Self::side_normal(seg) {
                Some(n) => {
                    let normal = self.frame.direction_to_world(n);
                    Plane::new(self.world(start.midpoint(&end), zm), normal)
                        .map(|plane| SurfaceClass::Plane { plane })
                        .unwrap_or(SurfaceClass::OtherCurved)
                }
                None => SurfaceClass::OtherCurved,
            },
            Segment::Arc { start, mid, end } => match circle_through_points(start, mid, end) {
                Some((c, r)) => Cylinder::new(self.world(c, 0.0), self.frame.normal, r)
                    .map(|cylinder| SurfaceClass::Cylinder { cylinder })
                    .unwrap_or(SurfaceClass::OtherCurved),
                None => SurfaceClass::OtherCurved,
            },
        };
        let mut points: Vec<Point3d> = pts.iter().map(|p| self.world(*p, self.z0)).collect();
        points.extend(pts.iter().rev().map(|p| self.world(*p, self.z1)));
        FaceGeom {
            surface,
            points,
            area: polyline_length(&pts) * height,
        }
    }

    fn cap_face(&self, end: bool) -> FaceGeom {
        let z = if end { self.z1 } else { self.z0 };
        let normal = if end {
            self.frame.normal
        } else {
            -self.frame.normal
        };
        let pts = self.outline_points();
        let points: Vec<Point3d> = pts.iter().map(|p| self.world(*p, z)).collect();
        let centre = Point3d::centroid(&points).unwrap_or(self.frame.origin);
        let surface = Plane::new(centre, normal)
            .map(|plane| SurfaceClass::Plane { plane })
            .unwrap_or(SurfaceClass::OtherCurved);
        FaceGeom {
            surface,
            points,
            area: polygon_area(&pts).abs(),
        }
    }

    /// Move a straight side outward, dragging the neighbouring ends along.
    pub fn offset_side(&mut self, i: usize, distance: f64) -> Result<(), KernelError> {
        let n = self.n();
        let normal = Self::side_normal(&self.outline[i].segment).ok_or_else(|| {
            KernelError::NotSupported {
                operation: "offset of a curved side".into(),
            }
        })?;
        let shift = normal * distance;
        let (start, end) = (
            self.outline[i].segment.start() + shift,
            self.outline[i].segment.end() + shift,
        );
        self.outline[i].segment = Segment::line(start, end);
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        self.outline[prev].segment = with_end(&self.outline[prev].segment, start);
        self.outline[next].segment = with_start(&self.outline[next].segment, end);
        Ok(())
    }

    pub fn offset_cap(&mut self, end: bool, distance: f64) {
        if end {
            self.z1 += distance;
        } else {
            self.z0 -= distance;
        }
    }

    /// Intersect the axial range with `[lo, hi]`. False when nothing is left.
    pub fn clip(&mut self, lo: f64, hi: f64) -> bool {
        let z0 = self.z0.max(lo);
        let z1 = self.z1.min(hi);
        if z1 - z0 <= 1e-9 {
            return false;
        }
        self.z0 = z0;
        self.z1 = z1;
        self.through_all = false;
        true
    }

    fn lateral_edge(&self, i: usize) -> EdgeGeometry {
        let p = self.outline[i].segment.start();
        EdgeGeometry::Line(Segment3d::new(self.world(p, self.z0), self.world(p, self.z1)))
    }

    fn cap_edge(&self, i: usize, end: bool) -> EdgeGeometry {
        let z = if end { self.z1 } else { self.z0 };
        match self.outline[i].segment {
            Segment::Line { start, end } => {
                EdgeGeometry::Line(Segment3d::new(self.world(start, z), self.world(end, z)))
            }
            Segment::Arc { start, mid, end } => EdgeGeometry::Arc {
                start: self.world(start, z),
                mid: self.world(mid, z),
                end: self.world(end, z),
            },
        }
    }
}

fn with_end(segment: &Segment, p: Point2d) -> Segment {
    match *segment {
        Segment::Line { start, .. } => Segment::line(start, p),
        Segment::Arc { start, mid, .. } => Segment::arc(start, mid, p),
    }
}

fn with_start(segment: &Segment, p: Point2d) -> Segment {
    match *segment {
        Segment::Line { end, .. } => Segment::line(p, end),
        Segment::Arc { mid, end, .. } => Segment::arc(p, mid, end),
    }
}

impl Tube {
    fn circle(&self, h: f64) -> Vec<Point3d> {
        (0..CIRCLE_SAMPLES)
            .map(|k| {
                self.cylinder
                    .evaluate([TAU * k as f64 / CIRCLE_SAMPLES as f64, h])
            })
            .collect()
    }

    fn lateral(&self) -> FaceGeom {
        let mut points = Vec::new();
        for step in 0..=4 {
            let h = self.h0 + (self.h1 - self.h0) * step as f64 / 4.0;
            points.extend(self.circle(h));
        }
        FaceGeom {
            surface: SurfaceClass::Cylinder {
                cylinder: self.cylinder,
            },
            points,
            area: TAU * self.cylinder.radius * (self.h1 - self.h0),
        }
    }

    fn cap(&self, end: bool) -> FaceGeom {
        let (h, normal) = if end {
            (self.h1, self.cylinder.axis)
        } else {
            (self.h0, -self.cylinder.axis)
        };
        let centre = self.cylinder.origin + self.cylinder.axis * h;
        let surface = Plane::new(centre, normal)
            .map(|plane| SurfaceClass::Plane { plane })
            .unwrap_or(SurfaceClass::OtherCurved);
        FaceGeom {
            surface,
            points: self.circle(h),
            area: std::f64::consts::PI * self.cylinder.radius * self.cylinder.radius,
        }
    }
}

impl Shape {
    pub fn face_count(&self) -> usize {
        match self {
            Shape::Prism(p) => p.n() + 2,
            Shape::Tube(_) => 3,
            Shape::Lump(l) => l.faces.len(),
        }
    }

    pub fn edge_count(&self) -> usize {
        match self {
            Shape::Prism(p) => 3 * p.n(),
            Shape::Tube(_) => 2,
            Shape::Lump(_) => 0,
        }
    }

    pub fn face(&self, slot: usize) -> FaceGeom {
        match self {
            Shape::Prism(p) => {
                let n = p.n();
                if slot < n {
                    p.side_face(slot)
                } else {
                    p.cap_face(slot > n)
                }
            }
            Shape::Tube(t) => match slot {
                0 => t.lateral(),
                1 => t.cap(false),
                _ => t.cap(true),
            },
            Shape::Lump(l) => {
                let f = &l.faces[slot.min(l.faces.len().saturating_sub(1))];
                FaceGeom {
                    surface: f.surface,
                    points: f.points.clone(),
                    area: f.area,
                }
            }
        }
    }

    pub fn edge(&self, slot: usize) -> EdgeGeometry {
        match self {
            Shape::Prism(p) => {
                let n = p.n();
                if slot < n {
                    p.lateral_edge(slot)
                } else if slot < 2 * n {
                    p.cap_edge(slot - n, false)
                } else {
                    p.cap_edge(slot - 2 * n, true)
                }
            }
            Shape::Tube(t) => {
                let h = if slot == 0 { t.h0 } else { t.h1 };
                EdgeGeometry::Circle {
                    center: t.cylinder.origin + t.cylinder.axis * h,
                    axis: t.cylinder.axis,
                    radius: t.cylinder.radius,
                }
            }
            Shape::Lump(_) => EdgeGeometry::Line(Segment3d::new(Point3d::ORIGIN, Point3d::ORIGIN)),
        }
    }

    /// Edge slots bounding a face slot.
    pub fn face_edge_slots(&self, slot: usize) -> Vec<usize> {
        match self {
            Shape::Prism(p) => {
                let n = p.n();
                if slot < n {
                    vec![slot, (slot + 1) % n, n + slot, 2 * n + slot]
                } else if slot == n {
                    (n..2 * n).collect()
                } else {
                    (2 * n..3 * n).collect()
                }
            }
            Shape::Tube(_) => match slot {
                0 => vec![0, 1],
                1 => vec![0],
                _ => vec![1],
            },
            Shape::Lump(_) => Vec::new(),
        }
    }

    /// Face slots meeting at an edge slot.
    pub fn edge_face_slots(&self, slot: usize) -> Vec<usize> {
        match self {
            Shape::Prism(p) => {
                let n = p.n();
                if slot < n {
                    vec![(slot + n - 1) % n, slot]
                } else if slot < 2 * n {
                    vec![slot - n, n]
                } else {
                    vec![slot - 2 * n, n + 1]
                }
            }
            Shape::Tube(_) => vec![0, slot + 1],
            Shape::Lump(_) => Vec::new(),
        }
    }

    pub fn cap_slots(&self) -> Vec<usize> {
        match self {
            Shape::Prism(p) => vec![p.n(), p.n() + 1],
            Shape::Tube(_) => vec![1, 2],
            Shape::Lump(l) => l.caps.clone(),
        }
    }

    /// Sketch entity a face slot was derived from.
    pub fn entity(&self, slot: usize) -> Option<(SketchId, &str)> {
        match self {
            Shape::Prism(p) => {
                let sketch = p.sketch?;
                let name = p.outline.get(slot)?.name.as_deref()?;
                Some((sketch, name))
            }
            Shape::Tube(_) => None,
            Shape::Lump(l) => l
                .faces
                .get(slot)
                .and_then(|f| f.entity.as_ref())
                .map(|(s, n)| (*s, n.as_str())),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for slot in 0..self.face_count() {
            for p in self.face(slot).points {
                bb.expand_to_include(&p);
            }
        }
        bb
    }
}

/// Point-in-polygon on a plane, boundary included.
fn inside_polygon(plane: &Plane, polygon: &[Point3d], p: &Point3d, tol: f64) -> bool {
    let uv: Vec<[f64; 2]> = polygon.iter().map(|q| plane.parameters_of(q)).collect();
    let [x, y] = plane.parameters_of(p);
    let n = uv.len();
    let mut inside = false;
    for i in 0..n {
        let [xi, yi] = uv[i];
        let [xj, yj] = uv[(i + n - 1) % n];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
    }
    inside
        || (0..n).any(|i| {
            Segment3d::new(polygon[i], polygon[(i + 1) % n]).distance_to_point(p) < tol
        })
}

fn polygon_edges(polygon: &[Point3d]) -> impl Iterator<Item = Segment3d> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| Segment3d::new(polygon[i], polygon[(i + 1) % n]))
}

/// Closest point of a planar polygon to `p`.
fn closest_on_polygon(plane: &Plane, polygon: &[Point3d], p: &Point3d) -> Point3d {
    let q = plane.project_point(p);
    if inside_polygon(plane, polygon, &q, 1e-12) {
        return q;
    }
    polygon_edges(polygon)
        .map(|e| e.closest_point(p))
        .min_by(|a, b| a.distance_to(p).total_cmp(&b.distance_to(p)))
        .unwrap_or(q)
}

/// Where a segment pierces a planar polygon.
fn pierce(plane: &Plane, polygon: &[Point3d], seg: &Segment3d) -> Option<Point3d> {
    let da = plane.signed_distance(&seg.start);
    let db = plane.signed_distance(&seg.end);
    if da * db > 0.0 || (da - db).abs() < 1e-15 {
        return None;
    }
    let t = da / (da - db);
    let p = seg.start + (seg.end - seg.start) * t;
    inside_polygon(plane, polygon, &p, 1e-9).then_some(p)
}

/// Closest points between two faces. With `extend_b` the second face is its
/// unbounded plane.
pub(crate) fn face_distance(a: &FaceGeom, b: &FaceGeom, extend_b: bool) -> (f64, Point3d, Point3d) {
    let mut best = (f64::INFINITY, Point3d::ORIGIN, Point3d::ORIGIN);
    let mut consider = |pa: Point3d, pb: Point3d| {
        let d = pa.distance_to(&pb);
        if d < best.0 {
            best = (d, pa, pb);
        }
    };

    match (a.surface.as_plane(), b.surface.as_plane()) {
        (_, Some(pb)) if extend_b => {
            for p in &a.points {
                consider(*p, pb.project_point(p));
            }
        }
        (Some(pa), Some(pb)) => {
            for p in &a.points {
                consider(*p, closest_on_polygon(pb, &b.points, p));
            }
            for p in &b.points {
                consider(closest_on_polygon(pa, &a.points, p), *p);
            }
            for ea in polygon_edges(&a.points) {
                for eb in polygon_edges(&b.points) {
                    let (p, q) = ea.closest_points(&eb);
                    consider(p, q);
                }
                if let Some(p) = pierce(pb, &b.points, &ea) {
                    consider(p, p);
                }
            }
            for eb in polygon_edges(&b.points) {
                if let Some(p) = pierce(pa, &a.points, &eb) {
                    consider(p, p);
                }
            }
        }
        (None, Some(pb)) => {
            for p in &a.points {
                consider(*p, closest_on_polygon(pb, &b.points, p));
            }
        }
        (Some(pa), None) => {
            for p in &b.points {
                consider(closest_on_polygon(pa, &a.points, p), *p);
            }
        }
        (None, None) => {
            for p in &a.points {
                for q in &b.points {
                    consider(*p, *q);
                }
            }
        }
    }
    best
}

/// Surface parameters of a point on a face.
pub(crate) fn parameters_on(surface: &SurfaceClass, p: &Point3d) -> [f64; 2] {
    match surface {
        SurfaceClass::Plane { plane } => plane.parameters_of(p),
        SurfaceClass::Cylinder { cylinder } => cylinder.parameters_of(p),
        SurfaceClass::OtherCurved => [0.0, 0.0],
    }
}

/// Frame for an arbitrary planar face, with its boundary as a CCW outline.
pub(crate) fn planar_outline(face: &FaceGeom) -> Result<(WeldFrame, Vec<OutlineSegment>), KernelError> {
    let plane = face.surface.as_plane().ok_or_else(|| KernelError::Rejected {
        operation: "extrude".into(),
        reason: "face is not planar".into(),
    })?;
    let origin = face.centroid();
    let frame = WeldFrame::new(origin, plane.normal, plane.u_axis).map_err(|e| KernelError::Other {
        message: e.to_string(),
    })?;
    let pts: Vec<Point2d> = face.points.iter().map(|p| frame.to_local(p)).collect();
    let n = pts.len();
    let outline = (0..n)
        .map(|i| OutlineSegment {
            name: None,
            segment: Segment::line(pts[i], pts[(i + 1) % n]),
        })
        .filter(|s| s.segment.start().distance_to(&s.segment.end()) > 1e-12)
        .collect();
    Ok((frame, outline))
}

/// Sample points of a face revolved about a line at evenly spaced angles.
pub(crate) fn revolve_samples(points: &[Point3d], axis: &weld_geom::Line3d, angle: f64, steps: usize) -> Vec<Point3d> {
    let mut out = Vec::new();
    for k in 0..=steps {
        if let Some(t) = Transform::rotation_about_line(axis, angle * k as f64 / steps as f64) {
            out.extend(points.iter().map(|p| t.transform_point(p)));
        }
    }
    out
}

/// Samples of an outline segment swept once around a circle.
pub(crate) fn ring_samples(points: &[Point3d], center: Point3d, axis: Vec3) -> Vec<Point3d> {
    match weld_geom::Line3d::new(center, axis) {
        Some(line) => revolve_samples(points, &line, TAU, CIRCLE_SAMPLES),
        None => points.to_vec(),
    }
}
