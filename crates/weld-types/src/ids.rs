use serde::{Deserialize, Serialize};
use std::fmt;

/// Transient kernel entity identifier (face, edge or vertex).
/// Stable within a single kernel session but NOT across regenerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(pub u64);

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hierarchical operation identifier attached to every kernel request.
///
/// Ids are built by appending components to a root (`weld1.pair0.extrude`),
/// so two evaluations of the same configuration issue the same ids in the
/// same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(Vec<String>);

impl OpId {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Append a named component.
    pub fn child(&self, component: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(component.into());
        Self(parts)
    }

    /// Append an enumerated component, e.g. `pair3`.
    /// Used for candidates whose count depends on the input geometry.
    pub fn unstable(&self, prefix: &str, index: usize) -> Self {
        self.child(format!("{prefix}{index}"))
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True if `self` equals `ancestor` or was derived from it.
    pub fn starts_with(&self, ancestor: &OpId) -> bool {
        self.0.len() >= ancestor.0.len() && self.0[..ancestor.0.len()] == ancestor.0[..]
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
