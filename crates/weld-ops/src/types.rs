use std::fmt;

use weld_geom::{FrameError, ProfileError, WeldFrame};
use weld_kernel::{KernelError, KernelId, KernelSolidHandle, OpId, SketchId};

/// Complete result of one planner call.
///
/// The host deletes `scratch` exactly once after the call returns, then
/// names and decorates `bodies`.
#[derive(Debug, Clone, Default)]
pub struct WeldOutput {
    /// Finished weld bodies.
    pub bodies: Vec<KernelSolidHandle>,
    /// Temporary sketches and bodies still alive in the session.
    pub scratch: Vec<Scratch>,
    /// One record per planned cross-section.
    pub sections: Vec<SectionRecord>,
    /// Termination faces of the produced beads.
    pub end_faces: Vec<EndFace>,
    /// Number of termination pairs that received a round or miter treatment.
    pub treated_ends: usize,
    /// Non-fatal, per-candidate problems.
    pub diagnostics: Diagnostics,
}

/// Temporary geometry created during synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scratch {
    Sketch(SketchId),
    Body(KernelSolidHandle),
}

/// Which side of a butt joint a section was planned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeldSide {
    Primary,
    Other,
}

/// A cross-section as it was placed in the model.
#[derive(Debug, Clone)]
pub struct SectionRecord {
    pub op: OpId,
    pub side: WeldSide,
    pub frame: WeldFrame,
    /// Signed half-width of the opening; zero for fillets.
    pub dist_out: f64,
    /// Leg length for fillets, covered plate thickness for butt joints.
    pub depth: f64,
}

/// Termination face of a weld bead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndFace {
    pub face: KernelId,
    pub body: KernelSolidHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub op: OpId,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.op, self.message)
    }
}

/// Non-fatal diagnostics from a planner.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn warn(&mut self, op: &OpId, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            op: op.clone(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings.iter()
    }

    /// True if any message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.warnings.iter().any(|d| d.message.contains(needle))
    }
}

/// A problem with the user's input that aborts the whole evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Offending parameter names.
    pub parameters: Vec<String>,
    /// Implicated geometry.
    pub entities: Vec<KernelId>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameters: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    pub fn entities(mut self, ids: impl IntoIterator<Item = KernelId>) -> Self {
        self.entities.extend(ids);
        self
    }
}

/// Errors from weld planning.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("unsupported face pair: {reason}")]
    UnsupportedPair { reason: String },

    #[error("unexpected topology: {reason}")]
    Topology { reason: String },

    #[error("every strategy failed: {reason}")]
    StrategiesExhausted { reason: String },
}

impl OpError {
    /// Validation errors abort the evaluation; everything else only loses
    /// the candidate it happened in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OpError::Validation(_))
    }
}
