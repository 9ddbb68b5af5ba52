use serde::{Deserialize, Serialize};
use uuid::Uuid;
use weld_kernel::{KernelError, KernelSolidHandle};
use weld_ops::{Diagnostics, OpError, SectionRecord, ValidationError};
use weld_types::WeldConfig;

/// The ordered list of weld features in a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureList {
    /// Evaluated front to back.
    pub features: Vec<WeldFeature>,
}

impl FeatureList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features that take part in a rebuild, with their position in the
    /// full list. Suppressing a feature keeps the positions of the others.
    pub fn active_features(&self) -> impl Iterator<Item = (usize, &WeldFeature)> {
        self.features.iter().enumerate().filter(|(_, f)| !f.suppressed)
    }
}

/// One weld feature as the user configured it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeldFeature {
    pub id: Uuid,
    /// User-visible feature name, e.g. "Weld feature 2".
    pub name: String,
    pub config: WeldConfig,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default)]
    pub properties: BodyProperties,
}

/// Part properties assigned to every body a feature creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyProperties {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub exclude_from_bom: bool,
}

/// What one successful feature evaluation left in the session.
#[derive(Debug, Clone, Default)]
pub struct FeatureResult {
    pub bodies: Vec<KernelSolidHandle>,
    /// Final body names, parallel to `bodies`.
    pub names: Vec<String>,
    /// Weld numbers, parallel to `bodies`.
    pub numbers: Vec<u64>,
    pub sections: Vec<SectionRecord>,
    pub treated_ends: usize,
    pub diagnostics: Diagnostics,
}

/// Errors from the weld engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("feature not found: {id}")]
    FeatureNotFound { id: Uuid },

    #[error("invalid weld: {0}")]
    Validation(#[from] ValidationError),

    #[error("operation error: {0}")]
    Op(OpError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("weld failed: no weld body was created")]
    WeldFailed {
        /// Everything the planner reported while trying.
        diagnostics: Diagnostics,
    },

    #[error("could not fingerprint feature {id}: {reason}")]
    Fingerprint { id: Uuid, reason: String },
}

impl From<OpError> for EngineError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Validation(v) => EngineError::Validation(v),
            other => EngineError::Op(other),
        }
    }
}

impl EngineError {
    /// Parameter names a validation failure points at.
    pub fn parameters(&self) -> &[String] {
        match self {
            EngineError::Validation(v) => &v.parameters,
            _ => &[],
        }
    }
}
