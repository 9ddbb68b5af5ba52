//! Schema migrations for weld documents.
//!
//! Version 1 stored one fillet weld per entry with flat, prefixed fields
//! (`weldType`, `filletEntities1`, `filletSize`, ...). Version 2 stores a
//! full [`WeldConfig`] per feature.

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;
use weld_engine::{BodyProperties, WeldFeature};
use weld_types::{
    ConvexityConvention, CornerTreatment, DimensionConvention, KernelId, SideConfig, WeldConfig,
    WeldFamily, WeldShape,
};

use crate::errors::LoadError;

/// Apply format migrations from `from_version` to `to_version`.
///
/// Migrations are applied sequentially: v1→v2, v2→v3, etc.
pub fn migrate(
    welds: serde_json::Value,
    from_version: u32,
    to_version: u32,
) -> Result<Vec<WeldFeature>, LoadError> {
    match (from_version, to_version) {
        (1, 2) => migrate_v1_to_v2(welds),
        _ => Err(LoadError::MigrationFailed {
            from: from_version,
            to: to_version,
            reason: format!("no migration path from v{from_version} to v{to_version}"),
        }),
    }
}

/// One weld entry of a version 1 document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyWeld {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    suppressed: bool,
    weld_type: String,
    #[serde(default)]
    fillet_entities1: Vec<u64>,
    #[serde(default)]
    fillet_entities2: Vec<u64>,
    #[serde(default)]
    fillet_shape: Option<String>,
    #[serde(default)]
    fillet_size: Option<f64>,
    #[serde(default)]
    fillet_weld_gap: f64,
    #[serde(default)]
    fillet_propagation: bool,
    #[serde(default)]
    fillet_corner_shape: Option<String>,
}

fn migrate_v1_to_v2(welds: serde_json::Value) -> Result<Vec<WeldFeature>, LoadError> {
    let failed = |reason: String| LoadError::MigrationFailed {
        from: 1,
        to: 2,
        reason,
    };
    let legacy: Vec<LegacyWeld> =
        serde_json::from_value(welds).map_err(|e| failed(e.to_string()))?;

    legacy
        .into_iter()
        .enumerate()
        .map(|(index, weld)| {
            if weld.weld_type != "FILLET_WELD" {
                return Err(LoadError::UnsupportedWeldType {
                    index,
                    weld_type: weld.weld_type,
                });
            }
            let shape = match weld.fillet_shape.as_deref() {
                None | Some("CONVEX") => WeldShape::Convex,
                Some("CONCAVE") => WeldShape::Concave,
                Some(other) => return Err(failed(format!("weld {index}: unknown shape {other}"))),
            };
            let corner = match weld.fillet_corner_shape.as_deref() {
                Some("ROUND") => CornerTreatment::Round,
                Some("MITER") => CornerTreatment::Miter,
                None | Some("NONE") => CornerTreatment::None,
                Some(other) => {
                    return Err(failed(format!("weld {index}: unknown corner style {other}")))
                }
            };

            let mut primary = SideConfig::new(WeldFamily::Fillet)
                .with_shape(shape)
                .with_dimension(DimensionConvention::Perpendicular)
                .with_convexity(ConvexityConvention::Legacy);
            primary.size = weld.fillet_size;

            let config = WeldConfig {
                primary,
                ..WeldConfig::fillet(
                    0.0,
                    weld.fillet_entities1.into_iter().map(KernelId).collect(),
                    weld.fillet_entities2.into_iter().map(KernelId).collect(),
                )
            }
            .with_max_gap(weld.fillet_weld_gap)
            .with_propagation(weld.fillet_propagation)
            .with_corner(corner);

            let id = weld.id.unwrap_or_else(Uuid::new_v4);
            debug!(index, %id, "migrated legacy fillet weld");
            Ok(WeldFeature {
                id,
                name: weld
                    .name
                    .unwrap_or_else(|| format!("Weld feature {}", index + 1)),
                config,
                suppressed: weld.suppressed,
                properties: BodyProperties::default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_fillet_keeps_its_geometry_conventions() {
        let welds = json!([{
            "weldType": "FILLET_WELD",
            "filletEntities1": [3],
            "filletEntities2": [9, 10],
            "filletShape": "CONCAVE",
            "filletSize": 6.0,
            "filletWeldGap": 0.5,
            "filletPropagation": true,
            "filletCornerShape": "ROUND"
        }]);
        let features = migrate(welds, 1, 2).unwrap();
        assert_eq!(features.len(), 1);
        let config = &features[0].config;
        assert_eq!(config.primary.size, Some(6.0));
        assert_eq!(config.primary.shape, WeldShape::Concave);
        assert_eq!(config.primary.dimension, DimensionConvention::Perpendicular);
        assert_eq!(config.primary.convexity, ConvexityConvention::Legacy);
        assert_eq!(config.selection.side2, vec![KernelId(9), KernelId(10)]);
        assert_eq!(config.max_gap, 0.5);
        assert!(config.tangent_propagation);
        assert_eq!(config.corner, CornerTreatment::Round);
        assert_eq!(features[0].name, "Weld feature 1");
    }

    #[test]
    fn missing_size_is_left_for_validation() {
        let welds = json!([{ "weldType": "FILLET_WELD" }]);
        let features = migrate(welds, 1, 2).unwrap();
        assert_eq!(features[0].config.primary.size, None);
    }

    #[test]
    fn legacy_v_butt_is_unsupported() {
        let welds = json!([
            { "weldType": "FILLET_WELD", "filletSize": 2.0 },
            { "weldType": "V_BUTT_WELD" }
        ]);
        match migrate(welds, 1, 2) {
            Err(LoadError::UnsupportedWeldType { index, weld_type }) => {
                assert_eq!(index, 1);
                assert_eq!(weld_type, "V_BUTT_WELD");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn unknown_corner_style_fails_migration() {
        let welds = json!([{ "weldType": "FILLET_WELD", "filletCornerShape": "BEVEL" }]);
        assert!(matches!(
            migrate(welds, 1, 2),
            Err(LoadError::MigrationFailed { from: 1, to: 2, .. })
        ));
    }

    #[test]
    fn no_path_between_unknown_versions() {
        assert!(matches!(
            migrate(json!([]), 0, 2),
            Err(LoadError::MigrationFailed { from: 0, .. })
        ));
    }
}
