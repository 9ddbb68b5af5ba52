pub mod counter;
pub mod dispatch;
pub mod rebuild;
pub mod tree;
pub mod types;

use std::collections::HashMap;
use uuid::Uuid;

use weld_geom::Tolerance;
use weld_ops::KernelBundle;
use weld_types::WeldConfig;

pub use counter::{Reservations, SessionCounters, WeldCounter, WELD_NUMBER_KEY};
pub use dispatch::{evaluate, validate};
pub use types::*;

/// The weld feature engine.
///
/// Owns the feature list and the session-scoped weld numbering. Every
/// change triggers a full rebuild; the caller passes a kernel session that
/// was regenerated to the pre-weld model.
pub struct WeldEngine {
    /// The weld features in evaluation order.
    pub features: FeatureList,
    pub tolerance: Tolerance,
    /// Weld numbers handed out in this document session.
    pub counters: SessionCounters,
    reservations: Reservations,
    /// Results from the last rebuild.
    pub feature_results: HashMap<Uuid, FeatureResult>,
    /// Warnings from the last rebuild.
    pub warnings: Vec<String>,
    /// Errors from the last rebuild.
    pub errors: Vec<(Uuid, EngineError)>,
}

impl WeldEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self::with_tolerance(Tolerance::default())
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            features: FeatureList::new(),
            tolerance,
            counters: SessionCounters::new(),
            reservations: Reservations::new(),
            feature_results: HashMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Create an engine for an existing feature list, e.g. a loaded document.
    pub fn from_features(features: FeatureList) -> Self {
        Self {
            features,
            ..Self::new()
        }
    }

    /// Add a feature and rebuild.
    pub fn add_feature(
        &mut self,
        name: Option<String>,
        config: WeldConfig,
        kb: &mut dyn KernelBundle,
    ) -> Uuid {
        let name = name.unwrap_or_else(|| self.features.next_name());
        let id = self.features.add_feature(name, config);
        self.rebuild(kb);
        id
    }

    /// Remove a feature and rebuild. Its weld numbers are not handed out
    /// again.
    pub fn remove_feature(&mut self, id: Uuid, kb: &mut dyn KernelBundle) -> Result<(), EngineError> {
        self.features.remove_feature(id)?;
        self.reservations.release(id);
        self.rebuild(kb);
        Ok(())
    }

    /// Replace a feature's configuration and rebuild.
    pub fn edit_feature(
        &mut self,
        id: Uuid,
        config: WeldConfig,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let feature = self
            .features
            .find_feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        feature.config = config;
        self.rebuild(kb);
        Ok(())
    }

    /// Change the part properties of a feature's bodies and rebuild.
    pub fn set_properties(
        &mut self,
        id: Uuid,
        properties: BodyProperties,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        let feature = self
            .features
            .find_feature_mut(id)
            .ok_or(EngineError::FeatureNotFound { id })?;
        feature.properties = properties;
        self.rebuild(kb);
        Ok(())
    }

    /// Suppress/unsuppress a feature and rebuild.
    pub fn set_suppressed(
        &mut self,
        id: Uuid,
        suppressed: bool,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        self.features.set_suppressed(id, suppressed)?;
        self.rebuild(kb);
        Ok(())
    }

    /// Move a feature in evaluation order and rebuild.
    pub fn reorder_feature(
        &mut self,
        id: Uuid,
        new_pos: usize,
        kb: &mut dyn KernelBundle,
    ) -> Result<(), EngineError> {
        self.features.reorder_feature(id, new_pos)?;
        self.rebuild(kb);
        Ok(())
    }

    /// Re-evaluate every active feature against `kb`.
    pub fn rebuild(&mut self, kb: &mut dyn KernelBundle) {
        let state = rebuild::rebuild(
            &self.features,
            kb,
            &mut self.counters,
            &mut self.reservations,
            &self.tolerance,
        );
        self.feature_results = state.feature_results;
        self.warnings = state.warnings;
        self.errors = state.errors;
    }

    /// Start numbering from 1 again, as a new document session does.
    pub fn reset_session(&mut self) {
        self.counters.clear();
        self.reservations.clear();
    }

    /// Get the result of a feature from the last rebuild.
    pub fn get_result(&self, feature_id: Uuid) -> Option<&FeatureResult> {
        self.feature_results.get(&feature_id)
    }

    /// Get the error of a feature from the last rebuild.
    pub fn get_error(&self, feature_id: Uuid) -> Option<&EngineError> {
        self.errors
            .iter()
            .find(|(id, _)| *id == feature_id)
            .map(|(_, e)| e)
    }
}

impl Default for WeldEngine {
    fn default() -> Self {
        Self::new()
    }
}
