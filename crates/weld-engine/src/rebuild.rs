use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;
use weld_geom::Tolerance;
use weld_kernel::{CounterStore, OpId};
use weld_ops::KernelBundle;

use crate::counter::Reservations;
use crate::dispatch::{apply_properties, evaluate};
use crate::types::{EngineError, FeatureList, FeatureResult, WeldFeature};

/// State of the engine after a rebuild.
#[derive(Debug, Default)]
pub struct RebuildState {
    /// Result for each feature that produced welds.
    pub feature_results: HashMap<Uuid, FeatureResult>,
    /// Non-fatal diagnostics, prefixed with the feature name.
    pub warnings: Vec<String>,
    /// Features that failed, in evaluation order.
    pub errors: Vec<(Uuid, EngineError)>,
}

/// Evaluate every active feature in order against `kb`.
///
/// `kb` must hold the model as it was before any weld feature ran. A
/// failing feature is recorded and the remaining features still run.
pub fn rebuild(
    list: &FeatureList,
    kb: &mut dyn KernelBundle,
    counters: &mut dyn CounterStore,
    reservations: &mut Reservations,
    tol: &Tolerance,
) -> RebuildState {
    let mut state = RebuildState::default();

    for (index, feature) in list.active_features() {
        let op = OpId::root(format!("weld{}", index + 1));
        match rebuild_feature(feature, &op, kb, counters, reservations, tol) {
            Ok(result) => {
                state.warnings.extend(
                    result
                        .diagnostics
                        .iter()
                        .map(|d| format!("{}: {d}", feature.name)),
                );
                state.feature_results.insert(feature.id, result);
            }
            Err(e) => {
                warn!(feature = %feature.name, error = %e, "weld feature failed");
                state.errors.push((feature.id, e));
            }
        }
    }

    info!(
        built = state.feature_results.len(),
        failed = state.errors.len(),
        "rebuild finished"
    );
    state
}

fn rebuild_feature(
    feature: &WeldFeature,
    op: &OpId,
    kb: &mut dyn KernelBundle,
    counters: &mut dyn CounterStore,
    reservations: &mut Reservations,
    tol: &Tolerance,
) -> Result<FeatureResult, EngineError> {
    let fingerprint =
        serde_json::to_string(&feature.config).map_err(|e| EngineError::Fingerprint {
            id: feature.id,
            reason: e.to_string(),
        })?;
    let reserved = reservations.reusable(feature.id, &fingerprint).to_vec();

    let mut result = evaluate(kb, counters, &reserved, op, &feature.config, tol)?;
    reservations.record(feature.id, fingerprint, result.numbers.clone());

    for failure in apply_properties(kb, &op.child("properties"), &result.bodies, &feature.properties) {
        result.diagnostics.warn(op, failure);
    }
    Ok(result)
}
