use serde::{Deserialize, Serialize};
use std::fmt;

use weld_geom::{BoundingBox, Cylinder, Plane, Point3d, Segment3d, Vec3};

pub use weld_types::{KernelId, OpId};

/// Opaque handle to a solid body in the kernel session.
/// NEVER persisted. Valid only until the session is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for KernelSolidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Handle to a sketch created on a weld frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SketchId(pub(crate) u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("entity not found: {id}")]
    EntityNotFound { id: KernelId },

    #[error("body not found: {body}")]
    BodyNotFound { body: KernelSolidHandle },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// Surface type of a face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceClass {
    Plane { plane: Plane },
    Cylinder { cylinder: Cylinder },
    OtherCurved,
}

impl SurfaceClass {
    pub fn is_planar(&self) -> bool {
        matches!(self, SurfaceClass::Plane { .. })
    }

    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            SurfaceClass::Plane { plane } => Some(plane),
            _ => None,
        }
    }
}

/// Result of a closest-point query between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub distance: f64,
    /// Closest point on each side.
    pub points: [Point3d; 2],
    /// Surface parameters of each closest point.
    pub parameters: [[f64; 2]; 2],
}

/// Depth specification for an extrude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExtrudeBounds {
    /// Unbounded in both directions.
    ThroughAll,
    /// Unbounded along the direction only.
    ThroughAllForward,
    /// `half_depth` to each side of the profile.
    Symmetric { half_depth: f64 },
    /// From `from` to `to`, measured along the direction from the profile.
    Range { from: f64, to: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanKind {
    Union,
    Subtraction,
    Intersection,
}

/// Continuity requested at loft ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoftContinuity {
    Tangent,
    Curvature,
}

/// Part properties the host assigns to finished weld bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyProperty {
    Name(String),
    Material(String),
    Appearance(String),
    ExcludeFromBom(bool),
}

/// Geometry of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EdgeGeometry {
    Line(Segment3d),
    Arc {
        start: Point3d,
        mid: Point3d,
        end: Point3d,
    },
    Circle {
        center: Point3d,
        axis: Vec3,
        radius: f64,
    },
}

impl EdgeGeometry {
    /// Straight segment, if the edge is one.
    pub fn as_segment(&self) -> Option<&Segment3d> {
        match self {
            EdgeGeometry::Line(seg) => Some(seg),
            _ => None,
        }
    }
}

/// Overlap found by a collision query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub tool: KernelId,
    pub target: KernelId,
    pub overlap: BoundingBox,
}
