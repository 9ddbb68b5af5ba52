//! Tests for the WeldBench workflow API.

use std::f64::consts::FRAC_PI_4;

use test_harness::{HarnessError, Side, WeldBench};
use weld_kernel::KernelIntrospect;
use weld_types::{WeldConfig, WeldFamily};

fn joint() -> WeldBench {
    let mut b = WeldBench::new();
    b.plate("a", [0.0, 0.0, 0.0], [50.0, 100.0, 10.0])
        .unwrap()
        .plate("b", [50.0, 0.0, 0.0], [100.0, 100.0, 10.0])
        .unwrap();
    b
}

#[test]
fn parts_are_regenerated_in_order() {
    let b = joint();
    let kernel = b.regenerate().unwrap();
    assert_eq!(kernel.solids().len(), 2);
    assert_eq!(b.kernel().solids(), kernel.solids());
}

#[test]
fn duplicate_part_names_are_rejected() {
    let mut b = joint();
    let err = b.plate("a", [0.0; 3], [1.0; 3]).err();
    assert!(matches!(err, Some(HarnessError::DuplicateName { name }) if name == "a"));
}

#[test]
fn lookups_are_stable_across_regeneration() {
    let b = joint();
    let first = b.edge("a", Side::PlusX, Side::Top).unwrap();
    let second = b.edge("a", Side::PlusX, Side::Top).unwrap();
    assert_eq!(first, second);
    assert_ne!(b.face("a", Side::Top).unwrap(), b.face("b", Side::Top).unwrap());
}

#[test]
fn unknown_part_and_feature_names_are_reported() {
    let b = joint();
    assert!(matches!(b.face("c", Side::Top), Err(HarnessError::PartNotFound { .. })));
    assert!(matches!(b.curved_face("a"), Err(HarnessError::TopologyNotFound { .. })));
    assert!(matches!(b.result("seam"), Err(HarnessError::FeatureNotFound { .. })));
}

#[test]
fn weld_by_name() {
    let mut b = joint().with_auto_check();
    let edge = b.edge("a", Side::PlusX, Side::Top).unwrap();
    let id = b
        .weld("seam", WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4))
        .unwrap();
    assert_eq!(b.feature_id("seam").unwrap(), id);
    b.assert_body_names("seam", &["Weld 1 (V-Butt)"]).unwrap();
    assert_eq!(b.kernel().solids().len(), 3);
}

#[test]
fn duplicate_feature_names_are_rejected() {
    let mut b = joint();
    let edge = b.edge("a", Side::PlusX, Side::Top).unwrap();
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);
    b.weld("seam", config.clone()).unwrap();
    assert!(matches!(b.weld("seam", config), Err(HarnessError::DuplicateName { .. })));
}

#[test]
fn auto_check_surfaces_feature_errors() {
    let mut b = joint().with_auto_check();
    let edge = b.edge("a", Side::PlusX, Side::Top).unwrap();
    let err = b.weld("seam", WeldConfig::butt(WeldFamily::VButt, vec![edge])).unwrap_err();
    assert!(err.to_string().contains("angle"), "{err}");
}

#[test]
fn remove_forgets_the_name() {
    let mut b = joint();
    let edge = b.edge("a", Side::PlusX, Side::Top).unwrap();
    b.weld("seam", WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4))
        .unwrap();
    b.remove("seam").unwrap();
    assert!(b.feature_id("seam").is_err());
    assert_eq!(b.kernel().solids().len(), 2);
}
