//! Helper functions: error type, tracing setup, scene geometry.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use weld_geom::{Point3d, Vec3};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("feature not found: {name}")]
    FeatureNotFound { name: String },

    #[error("part not found: {name}")]
    PartNotFound { name: String },

    #[error("no {what} on part {part}")]
    TopologyNotFound { part: String, what: String },

    #[error("no result for feature: {name}")]
    NoResult { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("kernel error: {0}")]
    Kernel(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },
}

// ── Tracing ─────────────────────────────────────────────────────────────────

static TRACING: Once = Once::new();

/// Install a test subscriber once per process. `RUST_LOG` selects the
/// level, e.g. `RUST_LOG=weld_ops=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// ── Geometry ────────────────────────────────────────────────────────────────

pub fn point(p: [f64; 3]) -> Point3d {
    Point3d::new(p[0], p[1], p[2])
}

/// Degrees to radians, for readable weld angles.
pub fn deg(degrees: f64) -> f64 {
    degrees.to_radians()
}

/// Axis-aligned face directions, named the way tests talk about plates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    PlusX,
    MinusX,
    PlusY,
    MinusY,
    Top,
    Bottom,
}

impl Side {
    pub fn normal(self) -> Vec3 {
        match self {
            Side::PlusX => Vec3::X,
            Side::MinusX => -Vec3::X,
            Side::PlusY => Vec3::Y,
            Side::MinusY => -Vec3::Y,
            Side::Top => Vec3::Z,
            Side::Bottom => -Vec3::Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_are_unit_axes() {
        for side in [Side::PlusX, Side::MinusX, Side::PlusY, Side::MinusY, Side::Top, Side::Bottom] {
            assert!((side.normal().length() - 1.0).abs() < 1e-12);
        }
        assert_eq!(Side::Bottom.normal(), -Side::Top.normal());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
