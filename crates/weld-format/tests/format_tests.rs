use std::f64::consts::FRAC_PI_4;

use weld_engine::{BodyProperties, FeatureList, WeldEngine};
use weld_format::{
    load_document, save_document, DocumentMetadata, LoadError, FORMAT_ID, FORMAT_VERSION,
};
use weld_geom::{Point3d, Vec3};
use weld_kernel::{KernelIntrospect, MockKernel};
use weld_types::{
    ConvexityConvention, CornerTreatment, DimensionConvention, KernelId, SideConfig, WeldConfig,
    WeldFamily, WeldShape,
};

// ── Helper Functions ─────────────────────────────────────────────────────

fn sample_features() -> FeatureList {
    let mut list = FeatureList::new();
    list.add_feature(
        "Corner".into(),
        WeldConfig::fillet(5.0, vec![KernelId(4)], vec![KernelId(11)])
            .with_shape(WeldShape::Convex)
            .with_offset(0.8)
            .with_corner(CornerTreatment::Round)
            .with_max_gap(0.2),
    );
    let seam = list.add_feature(
        "Seam".into(),
        WeldConfig::butt(WeldFamily::VButt, vec![KernelId(7)])
            .with_angle(FRAC_PI_4)
            .with_root_gap(2.0, 1.0)
            .with_other_side(SideConfig::new(WeldFamily::BevelButt).with_angle(0.4))
            .opposite(true),
    );
    if let Some(f) = list.find_feature_mut(seam) {
        f.suppressed = true;
        f.properties = BodyProperties {
            material: Some("S235".into()),
            appearance: Some("weld-grey".into()),
            exclude_from_bom: true,
        };
    }
    list
}

fn legacy_document(welds: &str) -> String {
    format!(
        r#"{{
            "format": "weld-joint",
            "version": 1,
            "document": {{
                "name": "legacy",
                "created": "2021-03-04T10:00:00Z",
                "modified": "2021-03-05T10:00:00Z"
            }},
            "welds": {welds}
        }}"#
    )
}

// ── Save / load ──────────────────────────────────────────────────────────

#[test]
fn saved_document_carries_format_and_version() {
    let json = save_document(&sample_features(), &DocumentMetadata::new("frame")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["format"], FORMAT_ID);
    assert_eq!(value["version"], FORMAT_VERSION);
    assert_eq!(value["document"]["name"], "frame");
    assert_eq!(value["welds"].as_array().map(Vec::len), Some(2));
}

#[test]
fn save_then_load_preserves_features() {
    let features = sample_features();
    let metadata = DocumentMetadata::new("frame");

    let json = save_document(&features, &metadata).unwrap();
    let (loaded, loaded_meta) = load_document(&json).unwrap();

    assert_eq!(loaded.features, features.features);
    assert_eq!(loaded_meta, metadata);
}

#[test]
fn unknown_format_is_rejected() {
    let json = r#"{"format":"cad-sketch","version":1,"document":{"name":"x","created":"2024-01-01T00:00:00Z","modified":"2024-01-01T00:00:00Z"},"welds":[]}"#;
    assert!(matches!(load_document(json), Err(LoadError::UnknownFormat(f)) if f == "cad-sketch"));
}

#[test]
fn future_version_is_rejected() {
    let json = save_document(&FeatureList::new(), &DocumentMetadata::new("x"))
        .unwrap()
        .replace("\"version\": 2", "\"version\": 3");
    match load_document(&json) {
        Err(LoadError::FutureVersion {
            file_version,
            supported_version,
        }) => {
            assert_eq!(file_version, 3);
            assert_eq!(supported_version, FORMAT_VERSION);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(load_document("{ not json"), Err(LoadError::ParseError(_))));
    let bad_weld = save_document(&FeatureList::new(), &DocumentMetadata::new("x"))
        .unwrap()
        .replace("\"welds\": []", "\"welds\": [{\"id\": 3}]");
    assert!(matches!(load_document(&bad_weld), Err(LoadError::ParseError(_))));
}

#[test]
fn missing_welds_loads_empty() {
    let json = r#"{"format":"weld-joint","version":2,"document":{"name":"x","created":"2024-01-01T00:00:00Z","modified":"2024-01-01T00:00:00Z"}}"#;
    let (features, _) = load_document(json).unwrap();
    assert!(features.features.is_empty());
}

// ── Version 1 migration ──────────────────────────────────────────────────

#[test]
fn version_1_document_migrates_to_fillet_features() {
    let json = legacy_document(
        r#"[{
            "id": "6f1c1c57-2f2f-4c1e-9a53-4f0b9f7ad001",
            "name": "Weld 1",
            "weldType": "FILLET_WELD",
            "filletEntities1": [12],
            "filletEntities2": [30],
            "filletShape": "CONVEX",
            "filletSize": 4.0,
            "filletWeldGap": 0.0,
            "filletPropagation": false,
            "filletCornerShape": "NONE"
        }]"#,
    );

    let (features, meta) = load_document(&json).unwrap();

    assert_eq!(meta.name, "legacy");
    let feature = &features.features[0];
    assert_eq!(feature.id.to_string(), "6f1c1c57-2f2f-4c1e-9a53-4f0b9f7ad001");
    assert_eq!(feature.name, "Weld 1");
    assert_eq!(feature.config.family(), WeldFamily::Fillet);
    assert_eq!(feature.config.primary.dimension, DimensionConvention::Perpendicular);
    assert_eq!(feature.config.primary.convexity, ConvexityConvention::Legacy);
    assert_eq!(feature.config.selection.side1, vec![KernelId(12)]);
    assert_eq!(feature.config.corner, CornerTreatment::None);
}

#[test]
fn version_1_v_butt_is_rejected() {
    let json = legacy_document(r#"[{ "weldType": "V_BUTT_WELD" }]"#);
    assert!(matches!(
        load_document(&json),
        Err(LoadError::UnsupportedWeldType { index: 0, .. })
    ));
}

#[test]
fn migrated_document_saves_as_current_version() {
    let json = legacy_document(r#"[{ "weldType": "FILLET_WELD", "filletSize": 3.0 }]"#);
    let (features, meta) = load_document(&json).unwrap();

    let saved = save_document(&features, &meta).unwrap();
    let (reloaded, _) = load_document(&saved).unwrap();

    assert!(saved.contains("\"version\": 2"));
    assert_eq!(reloaded.features, features.features);
}

// ── Loaded documents rebuild ─────────────────────────────────────────────

#[test]
fn loaded_document_rebuilds_in_the_engine() {
    let scene = || {
        let mut kernel = MockKernel::new();
        kernel
            .add_box(Point3d::new(0.0, 0.0, -10.0), Point3d::new(100.0, 60.0, 0.0))
            .unwrap();
        kernel
            .add_box(Point3d::new(0.0, 0.0, 0.0), Point3d::new(10.0, 60.0, 40.0))
            .unwrap();
        kernel
    };
    let kernel = scene();
    let solids = kernel.solids();
    let top = kernel.face_on(solids[0], Vec3::Z).unwrap();
    let side = kernel.face_on(solids[1], Vec3::X).unwrap();

    let mut list = FeatureList::new();
    list.add_feature("Corner".into(), WeldConfig::fillet(5.0, vec![top], vec![side]));
    let json = save_document(&list, &DocumentMetadata::new("corner")).unwrap();

    let (loaded, _) = load_document(&json).unwrap();
    let mut engine = WeldEngine::from_features(loaded);
    engine.rebuild(&mut scene());

    assert!(engine.errors.is_empty(), "{:?}", engine.errors);
    let id = engine.features.features[0].id;
    assert_eq!(engine.get_result(id).unwrap().names, ["Weld 1 (Fillet)"]);
}
