//! Tests for the report module.

use std::f64::consts::FRAC_PI_4;

use test_harness::{Side, WeldBench};
use weld_types::{WeldConfig, WeldFamily};

fn seam_bench() -> WeldBench {
    let mut b = WeldBench::new();
    b.plate("a", [0.0, 0.0, 0.0], [50.0, 100.0, 10.0])
        .unwrap()
        .plate("b", [50.0, 0.0, 0.0], [100.0, 100.0, 10.0])
        .unwrap();
    let edge = b.edge("a", Side::PlusX, Side::Top).unwrap();
    b.weld("seam", WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4))
        .unwrap();
    b
}

#[test]
fn empty_bench_report() {
    let text = WeldBench::new().report().to_text();
    assert!(text.contains("Welds (0 features"));
    assert!(text.contains("Weld counter: 0"));
    assert!(text.contains("Errors: none"));
}

#[test]
fn report_lists_bodies_and_sections() {
    let text = seam_bench().report().to_text();
    assert!(text.contains("[0] V-Butt \"seam\""), "{text}");
    assert!(text.contains("Bodies: Weld 1 (V-Butt)"), "{text}");
    assert!(text.contains("Section weld1.edge0.primary (primary): depth 10.000"), "{text}");
    assert!(text.contains("Solids: 3"), "{text}");
    assert!(text.contains("Weld counter: 1"), "{text}");
}

#[test]
fn report_marks_suppressed_features() {
    let mut b = seam_bench();
    b.suppress("seam", true).unwrap();
    let text = b.report().to_string();
    assert!(text.contains("1 suppressed"), "{text}");
    assert!(text.contains("[SUPPRESSED]"), "{text}");
    assert!(!text.contains("Bodies:"), "{text}");
}

#[test]
fn report_names_failing_features() {
    let mut b = seam_bench();
    let edge = b.edge("b", Side::PlusX, Side::Top).unwrap();
    b.weld("broken", WeldConfig::butt(WeldFamily::UButt, vec![edge]).with_angle(0.3))
        .unwrap();
    let text = b.report().to_text();
    assert!(text.contains("Errors (1):"), "{text}");
    assert!(text.contains("broken: invalid weld"), "{text}");
}
