//! WeldBench: a fluent API for scripting weld scenarios in tests.
//!
//! A bench holds a recipe of named parts. Every engine call runs against a
//! freshly regenerated `MockKernel`, the way a host regenerates the model
//! before weld features are re-evaluated. All methods accept names instead
//! of ids for readability.

use std::collections::HashMap;

use uuid::Uuid;
use weld_engine::{BodyProperties, EngineError, FeatureResult, WeldCounter, WeldEngine};
use weld_format::{load_document, save_document, DocumentMetadata};
use weld_geom::{Point2d, Vec3, WeldFrame};
use weld_kernel::{KernelId, KernelIntrospect, KernelOp, KernelSolidHandle, MockKernel};
use weld_types::WeldConfig;

use crate::helpers::*;

#[derive(Debug, Clone)]
enum Part {
    Plate {
        min: [f64; 3],
        max: [f64; 3],
    },
    Cylinder {
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    },
    TurnedPlate {
        corner: [f64; 3],
        size: [f64; 2],
        thickness: f64,
        angle: f64,
    },
}

/// A fluent builder for weld scenarios.
pub struct WeldBench {
    pub engine: WeldEngine,
    parts: Vec<(String, Part)>,
    kernel: MockKernel,
    named_features: HashMap<String, Uuid>,
    rejected: Vec<KernelOp>,
    auto_check: bool,
}

impl WeldBench {
    /// Create an empty bench.
    pub fn new() -> Self {
        init_tracing();
        Self {
            engine: WeldEngine::new(),
            parts: Vec::new(),
            kernel: MockKernel::new(),
            named_features: HashMap::new(),
            rejected: Vec::new(),
            auto_check: false,
        }
    }

    /// Enable auto-checking: after every operation, verify no engine errors.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    // ── Scene ───────────────────────────────────────────────────────────

    /// Add an axis-aligned plate.
    pub fn plate(&mut self, name: &str, min: [f64; 3], max: [f64; 3]) -> Result<&mut Self, HarnessError> {
        self.add_part(name, Part::Plate { min, max })
    }

    /// Add a cylinder standing on `base` along `axis`.
    pub fn cylinder(
        &mut self,
        name: &str,
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.add_part(
            name,
            Part::Cylinder {
                base,
                axis,
                radius,
                height,
            },
        )
    }

    /// Add a plate lying on z = `corner.z`, turned by `angle` (radians)
    /// about the vertical through `corner`.
    pub fn turned_plate(
        &mut self,
        name: &str,
        corner: [f64; 3],
        size: [f64; 2],
        thickness: f64,
        angle: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.add_part(
            name,
            Part::TurnedPlate {
                corner,
                size,
                thickness,
                angle,
            },
        )
    }

    /// Make every regenerated session reject `kind`.
    pub fn reject(&mut self, kind: KernelOp) -> &mut Self {
        self.rejected.push(kind);
        self
    }

    fn add_part(&mut self, name: &str, part: Part) -> Result<&mut Self, HarnessError> {
        if self.parts.iter().any(|(n, _)| n == name) {
            return Err(HarnessError::DuplicateName { name: name.into() });
        }
        self.parts.push((name.to_string(), part));
        self.kernel = self.regenerate()?;
        Ok(self)
    }

    /// Build the pre-weld model from the part recipe.
    pub fn regenerate(&self) -> Result<MockKernel, HarnessError> {
        let mut kernel = MockKernel::new();
        for (_, part) in &self.parts {
            let added = match part {
                Part::Plate { min, max } => kernel.add_box(point(*min), point(*max)),
                Part::Cylinder {
                    base,
                    axis,
                    radius,
                    height,
                } => kernel.add_cylinder(
                    point(*base),
                    Vec3::new(axis[0], axis[1], axis[2]),
                    *radius,
                    *height,
                ),
                Part::TurnedPlate {
                    corner,
                    size,
                    thickness,
                    angle,
                } => {
                    let (c, s) = (angle.cos(), angle.sin());
                    let outline = [(0.0, 0.0), (size[0], 0.0), (size[0], size[1]), (0.0, size[1])]
                        .map(|(x, y)| Point2d::new(x * c - y * s, x * s + y * c));
                    let frame = WeldFrame::new(point(*corner), Vec3::Z, Vec3::X)
                        .map_err(|e| HarnessError::Kernel(e.to_string()))?;
                    kernel.add_prism(frame, &outline, *thickness)
                }
            };
            added.map_err(|e| HarnessError::Kernel(e.to_string()))?;
        }
        for kind in &self.rejected {
            kernel.reject(*kind);
        }
        Ok(kernel)
    }

    /// Handle of a part in a freshly regenerated session.
    fn part_handle(&self, kernel: &MockKernel, name: &str) -> Result<KernelSolidHandle, HarnessError> {
        let index = self
            .parts
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| HarnessError::PartNotFound { name: name.into() })?;
        kernel
            .solids()
            .get(index)
            .copied()
            .ok_or_else(|| HarnessError::PartNotFound { name: name.into() })
    }

    // ── Topology lookup ─────────────────────────────────────────────────

    /// Planar face of a part facing `side`.
    pub fn face(&self, part: &str, side: Side) -> Result<KernelId, HarnessError> {
        let kernel = self.regenerate()?;
        let body = self.part_handle(&kernel, part)?;
        kernel
            .face_on(body, side.normal())
            .ok_or_else(|| HarnessError::TopologyNotFound {
                part: part.into(),
                what: format!("{side:?} face"),
            })
    }

    /// The curved face of a cylinder part.
    pub fn curved_face(&self, part: &str) -> Result<KernelId, HarnessError> {
        let kernel = self.regenerate()?;
        let body = self.part_handle(&kernel, part)?;
        kernel
            .curved_faces(body)
            .first()
            .copied()
            .ok_or_else(|| HarnessError::TopologyNotFound {
                part: part.into(),
                what: "curved face".into(),
            })
    }

    /// Edge shared by the `a` and `b` faces of a part.
    pub fn edge(&self, part: &str, a: Side, b: Side) -> Result<KernelId, HarnessError> {
        let fa = self.face(part, a)?;
        let fb = self.face(part, b)?;
        self.regenerate()?
            .edge_between(fa, fb)
            .ok_or_else(|| HarnessError::TopologyNotFound {
                part: part.into(),
                what: format!("{a:?}/{b:?} edge"),
            })
    }

    // ── Weld features ───────────────────────────────────────────────────

    /// Add a weld feature and rebuild.
    pub fn weld(&mut self, name: &str, config: WeldConfig) -> Result<Uuid, HarnessError> {
        self.check_name_available(name)?;
        let mut kernel = self.regenerate()?;
        let id = self
            .engine
            .add_feature(Some(name.to_string()), config, &mut kernel);
        self.named_features.insert(name.to_string(), id);
        self.finish(kernel)?;
        Ok(id)
    }

    /// Replace a feature's configuration and rebuild.
    pub fn edit(&mut self, name: &str, config: WeldConfig) -> Result<(), HarnessError> {
        let id = self.feature_id(name)?;
        let mut kernel = self.regenerate()?;
        self.engine
            .edit_feature(id, config, &mut kernel)
            .map_err(engine_error)?;
        self.finish(kernel)
    }

    pub fn suppress(&mut self, name: &str, suppressed: bool) -> Result<(), HarnessError> {
        let id = self.feature_id(name)?;
        let mut kernel = self.regenerate()?;
        self.engine
            .set_suppressed(id, suppressed, &mut kernel)
            .map_err(engine_error)?;
        self.finish(kernel)
    }

    pub fn set_properties(&mut self, name: &str, properties: BodyProperties) -> Result<(), HarnessError> {
        let id = self.feature_id(name)?;
        let mut kernel = self.regenerate()?;
        self.engine
            .set_properties(id, properties, &mut kernel)
            .map_err(engine_error)?;
        self.finish(kernel)
    }

    pub fn remove(&mut self, name: &str) -> Result<(), HarnessError> {
        let id = self.feature_id(name)?;
        let mut kernel = self.regenerate()?;
        self.engine
            .remove_feature(id, &mut kernel)
            .map_err(engine_error)?;
        self.named_features.remove(name);
        self.finish(kernel)
    }

    /// Re-evaluate every feature against a fresh session.
    pub fn rebuild(&mut self) -> Result<(), HarnessError> {
        let mut kernel = self.regenerate()?;
        self.engine.rebuild(&mut kernel);
        self.finish(kernel)
    }

    fn finish(&mut self, kernel: MockKernel) -> Result<(), HarnessError> {
        self.kernel = kernel;
        if self.auto_check {
            self.assert_no_errors()?;
        }
        Ok(())
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Save the weld features as a document.
    pub fn save(&self, document: &str) -> Result<String, HarnessError> {
        save_document(&self.engine.features, &DocumentMetadata::new(document))
            .map_err(|e| HarnessError::Format(e.to_string()))
    }

    /// Replace the engine with the features of a saved document and rebuild.
    /// Weld numbering starts over, as it does for a newly opened document.
    pub fn open(&mut self, json: &str) -> Result<(), HarnessError> {
        let (features, _) = load_document(json).map_err(|e| HarnessError::Format(e.to_string()))?;
        self.named_features = features
            .features
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect();
        self.engine = WeldEngine::from_features(features);
        self.rebuild()
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The session left by the last engine call.
    pub fn kernel(&self) -> &MockKernel {
        &self.kernel
    }

    pub fn feature_id(&self, name: &str) -> Result<Uuid, HarnessError> {
        self.named_features
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::FeatureNotFound { name: name.into() })
    }

    pub fn result(&self, name: &str) -> Result<&FeatureResult, HarnessError> {
        let id = self.feature_id(name)?;
        self.engine
            .get_result(id)
            .ok_or_else(|| HarnessError::NoResult { name: name.into() })
    }

    pub fn error(&self, name: &str) -> Result<Option<&EngineError>, HarnessError> {
        Ok(self.engine.get_error(self.feature_id(name)?))
    }

    /// Body names a feature produced, in body order.
    pub fn body_names(&self, name: &str) -> Result<Vec<String>, HarnessError> {
        Ok(self.result(name)?.names.clone())
    }

    /// Last weld number handed out in this session.
    pub fn weld_counter(&self) -> u64 {
        WeldCounter.get(&self.engine.counters)
    }

    pub fn feature_name(&self, id: Uuid) -> Option<&str> {
        self.named_features
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.named_features.contains_key(name) {
            return Err(HarnessError::DuplicateName { name: name.into() });
        }
        Ok(())
    }
}

impl Default for WeldBench {
    fn default() -> Self {
        Self::new()
    }
}

fn engine_error(e: EngineError) -> HarnessError {
    HarnessError::Engine(e.to_string())
}
