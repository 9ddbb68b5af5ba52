use std::f64::consts::FRAC_PI_4;

use approx::assert_relative_eq;
use weld_geom::{Point2d, Point3d, Tolerance, Vec3, WeldFrame};
use weld_kernel::{KernelIntrospect, KernelOp, KernelSolidHandle, MockKernel, OpId};
use weld_ops::{
    delete_scratch, match_butt_edge, synthesize_butt, synthesize_fillet, OpError, Scratch,
    WeldSide,
};
use weld_types::{CornerTreatment, SideConfig, WeldConfig, WeldFamily};

fn plate(kernel: &mut MockKernel, min: [f64; 3], max: [f64; 3]) -> KernelSolidHandle {
    kernel
        .add_box(
            Point3d::new(min[0], min[1], min[2]),
            Point3d::new(max[0], max[1], max[2]),
        )
        .unwrap()
}

fn tol() -> Tolerance {
    Tolerance::default()
}

/// Base plate with a wall standing on it; returns (kernel, base, wall).
fn l_corner() -> (MockKernel, KernelSolidHandle, KernelSolidHandle) {
    let mut kernel = MockKernel::new();
    let base = plate(&mut kernel, [0.0, 0.0, -10.0], [100.0, 60.0, 0.0]);
    let wall = plate(&mut kernel, [0.0, 0.0, 0.0], [10.0, 60.0, 40.0]);
    (kernel, base, wall)
}

fn l_corner_config(kernel: &MockKernel, base: KernelSolidHandle, wall: KernelSolidHandle) -> WeldConfig {
    let top = kernel.face_on(base, Vec3::Z).unwrap();
    let side = kernel.face_on(wall, Vec3::X).unwrap();
    WeldConfig::fillet(5.0, vec![top], vec![side])
}

/// Two 10 mm plates side by side along x; the second starts at `x0`.
fn butt_plates(x0: f64) -> (MockKernel, KernelSolidHandle, KernelSolidHandle) {
    let mut kernel = MockKernel::new();
    let a = plate(&mut kernel, [0.0, 0.0, 0.0], [50.0, 100.0, 10.0]);
    let b = plate(&mut kernel, [x0, 0.0, 0.0], [x0 + 50.0, 100.0, 10.0]);
    (kernel, a, b)
}

fn weld_edge(kernel: &MockKernel, a: KernelSolidHandle) -> weld_kernel::KernelId {
    let side = kernel.face_on(a, Vec3::X).unwrap();
    let top = kernel.face_on(a, Vec3::Z).unwrap();
    kernel.edge_between(side, top).unwrap()
}

// ── Fillet planner ─────────────────────────────────────────────────────────

#[test]
fn fillet_l_corner_produces_one_trimmed_bead() {
    let (mut kernel, base, wall) = l_corner();
    let config = l_corner_config(&kernel, base, wall);

    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1, "one pair, one bead");
    assert_eq!(output.sections.len(), 1);
    assert_relative_eq!(output.sections[0].depth, 5.0, epsilon = 1e-9);
    assert!(kernel.count(KernelOp::ExtrudeThroughAll) >= 1);
    assert_eq!(kernel.count(KernelOp::Extrude), 0, "no fallback needed");
    assert_eq!(kernel.count(KernelOp::ReplaceFace), 2);
    let length = kernel.axial_length(output.bodies[0]).unwrap();
    assert_relative_eq!(length, 60.0, epsilon = 1e-6);
    assert_eq!(output.end_faces.len(), 2, "both caps are termination faces");
}

#[test]
fn fillet_perpendicular_pair_gets_overhang_cuts() {
    let (mut kernel, base, wall) = l_corner();
    let config = l_corner_config(&kernel, base, wall);

    synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    let cut_ops: Vec<String> = kernel
        .calls()
        .iter()
        .filter(|c| c.kind == KernelOp::Subtraction)
        .map(|c| c.op.to_string())
        .collect();
    assert!(cut_ops.iter().any(|op| op.ends_with("trim.boolean")), "{cut_ops:?}");
    assert!(cut_ops.iter().any(|op| op.ends_with("trim.booleanCut")), "{cut_ops:?}");
}

#[test]
fn fillet_falls_back_to_bounded_extrude() {
    let (mut kernel, base, wall) = l_corner();
    let config = l_corner_config(&kernel, base, wall);
    kernel.reject(KernelOp::ExtrudeThroughAll);

    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    assert_eq!(kernel.count(KernelOp::ExtrudeThroughAll), 0);
    assert_eq!(kernel.count(KernelOp::Extrude), 1);
    assert!(output.diagnostics.mentions("face bounds"));
    let length = kernel.axial_length(output.bodies[0]).unwrap();
    assert_relative_eq!(length, 60.0, epsilon = 1e-6);
}

#[test]
fn fillet_pair_fails_when_every_strategy_is_rejected() {
    let (mut kernel, base, wall) = l_corner();
    let config = l_corner_config(&kernel, base, wall);
    kernel.reject(KernelOp::ExtrudeThroughAll);
    kernel.reject(KernelOp::Extrude);

    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert!(output.bodies.is_empty());
    assert!(output.diagnostics.mentions("no weld for this pair"));
}

#[test]
fn fillet_skips_pairs_beyond_the_gap() {
    let mut kernel = MockKernel::new();
    let base = plate(&mut kernel, [0.0, 0.0, -10.0], [100.0, 60.0, 0.0]);
    let wall = plate(&mut kernel, [10.0, 0.0, 5.0], [20.0, 60.0, 45.0]);
    let top = kernel.face_on(base, Vec3::Z).unwrap();
    let side = kernel.face_on(wall, -Vec3::X).unwrap();

    let config = WeldConfig::fillet(5.0, vec![top], vec![side]);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();
    assert!(output.bodies.is_empty());
    assert!(output.diagnostics.mentions("too far apart"));
    assert_eq!(kernel.count(KernelOp::CreateSketch), 0);

    let widened = config.with_max_gap(6.0);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld2"), &widened, &tol()).unwrap();
    assert_eq!(output.bodies.len(), 1);
}

#[test]
fn fillet_curved_against_planar_sweeps_around_the_tube() {
    let mut kernel = MockKernel::new();
    let base = plate(&mut kernel, [0.0, 0.0, -10.0], [100.0, 100.0, 0.0]);
    let tube = kernel
        .add_cylinder(Point3d::new(50.0, 50.0, 0.0), Vec3::Z, 5.0, 40.0)
        .unwrap();
    let lateral = kernel.curved_faces(tube)[0];
    let top = kernel.face_on(base, Vec3::Z).unwrap();

    let config = WeldConfig::fillet(3.0, vec![lateral], vec![top]);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    assert_eq!(kernel.count(KernelOp::Sweep), 1);
    assert_eq!(kernel.count(KernelOp::ExtrudeThroughAll), 0);
}

#[test]
fn fillet_curved_pair_is_reported_and_skipped() {
    let mut kernel = MockKernel::new();
    let a = kernel
        .add_cylinder(Point3d::new(0.0, 0.0, 0.0), Vec3::Z, 5.0, 20.0)
        .unwrap();
    let b = kernel
        .add_cylinder(Point3d::new(10.0, 0.0, 0.0), Vec3::Z, 5.0, 20.0)
        .unwrap();
    let fa = kernel.curved_faces(a)[0];
    let fb = kernel.curved_faces(b)[0];

    let config = WeldConfig::fillet(2.0, vec![fa], vec![fb]).with_max_gap(2.0);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert!(output.bodies.is_empty());
    assert!(output.diagnostics.mentions("both curved"));
    assert_eq!(kernel.count(KernelOp::CreateSketch), 0);
}

// ── End caps ───────────────────────────────────────────────────────────────

/// Two walls meeting at a corner on a base plate.
fn corner_scene(corner: CornerTreatment) -> (MockKernel, WeldConfig) {
    let mut kernel = MockKernel::new();
    let base = plate(&mut kernel, [0.0, 0.0, -10.0], [100.0, 100.0, 0.0]);
    let wall_a = plate(&mut kernel, [0.0, 0.0, 0.0], [10.0, 50.0, 40.0]);
    let wall_b = plate(&mut kernel, [10.0, 50.0, 0.0], [60.0, 60.0, 40.0]);
    let top = kernel.face_on(base, Vec3::Z).unwrap();
    let a_side = kernel.face_on(wall_a, Vec3::X).unwrap();
    let b_side = kernel.face_on(wall_b, -Vec3::Y).unwrap();
    let config = WeldConfig::fillet(5.0, vec![top], vec![a_side, b_side]).with_corner(corner);
    (kernel, config)
}

#[test]
fn round_corner_revolves_one_end_into_the_other() {
    let (mut kernel, config) = corner_scene(CornerTreatment::Round);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.treated_ends, 1);
    assert_eq!(kernel.count(KernelOp::Revolve), 1);
    assert_eq!(kernel.count(KernelOp::Loft), 0);
    assert_eq!(output.bodies.len(), 1, "beads and corner are united");
    assert_eq!(kernel.count(KernelOp::Union), 1);
}

#[test]
fn miter_corner_moves_both_end_faces() {
    let (mut kernel, config) = corner_scene(CornerTreatment::Miter);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.treated_ends, 1);
    assert_eq!(kernel.count(KernelOp::MoveFace), 2);
    assert_eq!(kernel.count(KernelOp::Revolve), 0);
    assert_eq!(output.bodies.len(), 1);
}

#[test]
fn corner_none_leaves_ends_alone() {
    let (mut kernel, config) = corner_scene(CornerTreatment::None);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.treated_ends, 0);
    assert_eq!(kernel.count(KernelOp::Revolve), 0);
    assert_eq!(kernel.count(KernelOp::MoveFace), 0);
    assert_eq!(output.end_faces.len(), 4);
}

#[test]
fn failed_corner_treatment_does_not_block_the_weld() {
    let (mut kernel, config) = corner_scene(CornerTreatment::Round);
    kernel.reject(KernelOp::Revolve);
    let output = synthesize_fillet(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.treated_ends, 0);
    assert_eq!(output.bodies.len(), 1, "the two beads are still united");
}

// ── Butt planner ───────────────────────────────────────────────────────────

#[test]
fn butt_match_finds_mate_and_thickness() {
    let (kernel, a, b) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);

    let m = match_butt_edge(&kernel, edge, &tol()).unwrap();
    assert_eq!(m.owner, a);
    assert_eq!(m.other, b);
    assert_eq!(m.face, kernel.face_on(a, Vec3::X).unwrap());
    assert_eq!(m.mate_face, kernel.face_on(b, -Vec3::X).unwrap());
    assert_eq!(m.top_face, kernel.face_on(a, Vec3::Z).unwrap());
    assert_relative_eq!(m.thickness, 10.0, epsilon = 1e-9);
    assert_relative_eq!(m.gap, 0.0, epsilon = 1e-9);
}

#[test]
fn v_butt_cuts_both_plates_and_fills_the_groove() {
    let (mut kernel, a, b) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);

    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    assert_eq!(kernel.cut_count(a), 1);
    assert_eq!(kernel.cut_count(b), 1);
    assert_eq!(kernel.count(KernelOp::ExtrudeThroughAll), 1, "cut tool");
    assert_eq!(kernel.count(KernelOp::Extrude), 1, "bead");
    assert_eq!(kernel.count(KernelOp::OffsetFace), 0, "no gap to close");

    let section = &output.sections[0];
    assert_eq!(section.side, WeldSide::Primary);
    assert_relative_eq!(section.dist_out, 10.0, epsilon = 1e-9);
    assert_relative_eq!(section.depth, 10.0, epsilon = 1e-9);
    assert_relative_eq!(section.frame.origin.x, 50.0, epsilon = 1e-9);
    assert_relative_eq!(section.frame.origin.z, 0.0, epsilon = 1e-9);
    assert_relative_eq!(section.frame.y_axis().z, 1.0, epsilon = 1e-9);

    let bead = output.bodies[0];
    assert_relative_eq!(kernel.axial_length(bead).unwrap(), 100.0, epsilon = 1e-9);
}

#[test]
fn butt_cut_tool_is_consumed_and_only_the_sketch_is_scratch() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);
    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    let diagnostics = delete_scratch(&mut kernel, &OpId::root("weld1").child("cleanup"), &output.scratch);
    assert!(diagnostics.is_empty());
    assert_eq!(kernel.live_sketch_count(), 0);
    assert_eq!(kernel.count(KernelOp::DeleteBodies), 0, "the tool died in the cut");
    assert!(output.scratch.iter().any(|s| matches!(s, Scratch::Body(_))));
}

#[test]
fn bevel_opening_flips_with_opposite_direction() {
    let edge_config = |opposite: bool| {
        let (mut kernel, a, _) = butt_plates(60.0);
        let edge = weld_edge(&kernel, a);
        let config = WeldConfig::butt(WeldFamily::BevelButt, vec![edge])
            .with_angle(FRAC_PI_4)
            .opposite(opposite);
        let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();
        (kernel, output)
    };

    let (kernel, forward) = edge_config(false);
    let (_, reversed) = edge_config(true);
    assert!(forward.sections[0].dist_out > 0.0);
    assert_relative_eq!(
        forward.sections[0].dist_out,
        -reversed.sections[0].dist_out,
        epsilon = 1e-9
    );
    assert_eq!(kernel.count(KernelOp::OffsetFace), 1, "the gap is closed first");
    assert_relative_eq!(forward.sections[0].frame.origin.x, 55.0, epsilon = 1e-9);
}

#[test]
fn flipped_groove_opens_from_the_far_face() {
    let plan = |flip: bool| {
        let (mut kernel, a, _) = butt_plates(50.0);
        let edge = weld_edge(&kernel, a);
        let config = WeldConfig::butt(WeldFamily::BevelButt, vec![edge])
            .with_angle(FRAC_PI_4)
            .flipped(flip);
        let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();
        (kernel, output)
    };

    let (kernel, forward) = plan(false);
    let bead = forward.bodies[0];
    assert!(kernel.face_on(bead, Vec3::Z).is_some(), "opening on the top face");
    assert!(kernel.face_on(bead, -Vec3::Z).is_none());

    let (kernel, flipped) = plan(true);
    let bead = flipped.bodies[0];
    assert!(kernel.face_on(bead, -Vec3::Z).is_some(), "opening on the bottom face");
    assert!(kernel.face_on(bead, Vec3::Z).is_none());

    let (f, r) = (&forward.sections[0].frame, &flipped.sections[0].frame);
    assert_relative_eq!(f.origin.z, 0.0, epsilon = 1e-9);
    assert_relative_eq!(r.origin.z, 10.0, epsilon = 1e-9);
    assert_relative_eq!(r.y_axis().z, -1.0, epsilon = 1e-9);
    assert_relative_eq!(f.normal.dot(&r.normal), -1.0, epsilon = 1e-9);
    assert_relative_eq!(flipped.sections[0].dist_out, forward.sections[0].dist_out, epsilon = 1e-9);
    assert_relative_eq!(kernel.axial_length(bead).unwrap(), 100.0, epsilon = 1e-9);
}

#[test]
fn scarf_on_the_other_side_still_slants() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge])
        .with_angle(FRAC_PI_4)
        .with_other_side(
            SideConfig::new(WeldFamily::ScarfButt)
                .with_angle(0.3)
                .with_size(2.0),
        );

    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    let moved: Vec<String> = kernel
        .calls()
        .iter()
        .filter(|c| c.kind == KernelOp::MoveFace)
        .map(|c| c.op.to_string())
        .collect();
    assert_eq!(moved, ["weld1.edge0.other.scarf"]);
}

#[test]
fn double_scarf_slants_the_faces_once() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let scarf = SideConfig::new(WeldFamily::ScarfButt).with_angle(0.3).with_size(2.0);
    let config = WeldConfig::butt(WeldFamily::ScarfButt, vec![edge])
        .with_angle(0.3)
        .with_size(2.0)
        .with_other_side(scarf);

    synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(kernel.count(KernelOp::MoveFace), 1);
}

#[test]
fn double_sided_butt_mirrors_at_the_mid_plane() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge])
        .with_angle(FRAC_PI_4)
        .with_other_side(SideConfig::new(WeldFamily::VButt).with_angle(FRAC_PI_4 / 2.0));

    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    assert_eq!(output.sections.len(), 2);
    let (primary, other) = (&output.sections[0], &output.sections[1]);
    assert_eq!(primary.side, WeldSide::Primary);
    assert_eq!(other.side, WeldSide::Other);
    assert_relative_eq!(primary.depth, 5.0, epsilon = 1e-9);
    assert_relative_eq!(primary.frame.origin.z, 5.0, epsilon = 1e-9);
    assert_relative_eq!(other.frame.origin.z, 5.0, epsilon = 1e-9);
    assert_relative_eq!(other.frame.y_axis().z, -1.0, epsilon = 1e-9);
    assert_eq!(kernel.count(KernelOp::Union), 1);
    assert_eq!(kernel.count(KernelOp::Subtraction), 2);
}

#[test]
fn scarf_butt_slants_the_butt_faces() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::ScarfButt, vec![edge])
        .with_angle(0.3)
        .with_size(2.0);

    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();

    assert_eq!(output.bodies.len(), 1);
    assert_eq!(kernel.count(KernelOp::MoveFace), 1);
    let moved = kernel
        .calls()
        .iter()
        .find(|c| c.kind == KernelOp::MoveFace)
        .map(|c| c.op.to_string());
    assert_eq!(moved.as_deref(), Some("weld1.edge0.primary.scarf"));
}

#[test]
fn butt_with_one_solid_is_fatal() {
    let mut kernel = MockKernel::new();
    let a = plate(&mut kernel, [0.0, 0.0, 0.0], [50.0, 100.0, 10.0]);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);

    let err = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("two solids"));
}

#[test]
fn butt_against_a_rotated_plate_is_fatal() {
    let mut kernel = MockKernel::new();
    let a = plate(&mut kernel, [0.0, 0.0, 0.0], [50.0, 100.0, 10.0]);
    let (c, s) = (0.2_f64.cos(), 0.2_f64.sin());
    let square = [(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 50.0)]
        .map(|(x, y)| Point2d::new(x * c - y * s, x * s + y * c));
    let frame = WeldFrame::new(Point3d::new(55.0, 20.0, 0.0), Vec3::Z, Vec3::X).unwrap();
    kernel.add_prism(frame, &square, 10.0).unwrap();
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);

    match synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()) {
        Err(OpError::Validation(v)) => {
            assert!(v.message.contains("not parallel"));
            assert_eq!(v.entities, vec![edge]);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn rejected_cut_skips_the_edge_without_failing() {
    let (mut kernel, a, _) = butt_plates(50.0);
    let edge = weld_edge(&kernel, a);
    let config = WeldConfig::butt(WeldFamily::VButt, vec![edge]).with_angle(FRAC_PI_4);
    kernel.reject(KernelOp::Subtraction);

    let output = synthesize_butt(&mut kernel, &OpId::root("weld1"), &config, &tol()).unwrap();
    assert!(output.bodies.is_empty());
    assert!(output.diagnostics.mentions("no weld along edge"));
    assert!(!output.scratch.is_empty(), "tool and sketch still need cleanup");
}

#[test]
fn solids_are_listed_in_creation_order() {
    let (kernel, a, b) = butt_plates(50.0);
    assert_eq!(kernel.solids(), vec![a, b]);
}
