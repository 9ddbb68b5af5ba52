use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::KernelId;

/// Weld family. Selects both the planner and the cross-section formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WeldFamily {
    Fillet,
    SquareButt,
    VButt,
    BevelButt,
    UButt,
    JButt,
    ScarfButt,
}

impl WeldFamily {
    pub const ALL: [WeldFamily; 7] = [
        WeldFamily::Fillet,
        WeldFamily::SquareButt,
        WeldFamily::VButt,
        WeldFamily::BevelButt,
        WeldFamily::UButt,
        WeldFamily::JButt,
        WeldFamily::ScarfButt,
    ];

    pub fn is_butt(self) -> bool {
        !matches!(self, WeldFamily::Fillet)
    }

    /// Families whose groove is prepared on one plate only. Their opening
    /// flips sides with `opposite_direction`.
    pub fn is_single_sided(self) -> bool {
        matches!(
            self,
            WeldFamily::BevelButt | WeldFamily::JButt | WeldFamily::ScarfButt
        )
    }

    /// User-facing label used in body names, e.g. "Weld 3 (V-Butt)".
    pub fn label(self) -> &'static str {
        match self {
            WeldFamily::Fillet => "Fillet",
            WeldFamily::SquareButt => "Square-Butt",
            WeldFamily::VButt => "V-Butt",
            WeldFamily::BevelButt => "Bevel-Butt",
            WeldFamily::UButt => "U-Butt",
            WeldFamily::JButt => "J-Butt",
            WeldFamily::ScarfButt => "Scarf-Butt",
        }
    }

    /// Numeric parameters that must be present for this family.
    pub fn required_parameters(self) -> &'static [Parameter] {
        match self {
            WeldFamily::Fillet | WeldFamily::SquareButt => &[Parameter::Size],
            WeldFamily::VButt | WeldFamily::BevelButt => &[Parameter::Angle],
            WeldFamily::UButt | WeldFamily::JButt => &[Parameter::Angle, Parameter::Radius],
            WeldFamily::ScarfButt => &[Parameter::Angle, Parameter::Size],
        }
    }
}

impl fmt::Display for WeldFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named numeric parameter of a [`SideConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Size,
    Offset,
    Angle,
    Radius,
}

impl Parameter {
    pub fn name(self) -> &'static str {
        match self {
            Parameter::Size => "size",
            Parameter::Offset => "offset",
            Parameter::Angle => "angle",
            Parameter::Radius => "radius",
        }
    }
}

/// Shape of the exposed bead surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WeldShape {
    Convex,
    Concave,
    #[default]
    Flat,
}

/// How fillet weld terminations that touch each other are finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CornerTreatment {
    Round,
    Miter,
    #[default]
    None,
}

/// Which measurement the fillet `size` parameter denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DimensionConvention {
    /// Leg length along each face.
    #[default]
    Side,
    /// Throat height from the root to the chord.
    Height,
    /// Perpendicular distance from a leg end to the opposite face.
    Perpendicular,
}

/// How the cap arc offset of Convex/Concave beads is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConvexityConvention {
    /// Fixed multiple of the reference distance.
    Legacy,
    /// The `offset` parameter, verbatim.
    #[default]
    Explicit,
}

/// Land left at the root of a butt joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootGap {
    pub width: f64,
    pub height: f64,
}

/// Family, shape and numeric parameters of one side of a joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    pub family: WeldFamily,
    #[serde(default)]
    pub shape: WeldShape,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
    /// Radians.
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub dimension: DimensionConvention,
    #[serde(default)]
    pub convexity: ConvexityConvention,
}

impl SideConfig {
    pub fn new(family: WeldFamily) -> Self {
        Self {
            family,
            shape: WeldShape::Flat,
            size: None,
            offset: None,
            angle: None,
            radius: None,
            dimension: DimensionConvention::Side,
            convexity: ConvexityConvention::Explicit,
        }
    }

    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Size => self.size,
            Parameter::Offset => self.offset,
            Parameter::Angle => self.angle,
            Parameter::Radius => self.radius,
        }
    }

    /// Required parameters that are absent, in declaration order.
    pub fn missing_parameters(&self) -> Vec<Parameter> {
        let mut missing: Vec<Parameter> = self
            .family
            .required_parameters()
            .iter()
            .copied()
            .filter(|p| self.value(*p).is_none())
            .collect();
        if self.needs_offset() && self.offset.is_none() {
            missing.push(Parameter::Offset);
        }
        missing
    }

    /// An explicit cap offset is only read for curved caps.
    pub fn needs_offset(&self) -> bool {
        self.shape != WeldShape::Flat && self.convexity == ConvexityConvention::Explicit
    }

    pub fn with_shape(mut self, shape: WeldShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_dimension(mut self, dimension: DimensionConvention) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_convexity(mut self, convexity: ConvexityConvention) -> Self {
        self.convexity = convexity;
        self
    }
}

/// Geometry the weld is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Fillet: faces on the first side.
    #[serde(default)]
    pub side1: Vec<KernelId>,
    /// Fillet: faces on the second side.
    #[serde(default)]
    pub side2: Vec<KernelId>,
    /// Butt: weld-line edges.
    #[serde(default)]
    pub edges: Vec<KernelId>,
}

/// Complete, immutable description of one weld feature evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeldConfig {
    pub primary: SideConfig,
    /// Butt welds only: independently configured second side.
    #[serde(default)]
    pub other_side: Option<SideConfig>,
    #[serde(default)]
    pub root_gap: Option<RootGap>,
    /// Open butt grooves from the plate face opposite the selected edge.
    /// This reverses the seam frame normal. Fillet welds ignore it.
    #[serde(default)]
    pub flip_direction: bool,
    /// Mirror single-sided grooves onto the other plate.
    #[serde(default)]
    pub opposite_direction: bool,
    #[serde(default)]
    pub corner: CornerTreatment,
    #[serde(default)]
    pub tangent_propagation: bool,
    /// Largest face gap a fillet pair may have and still be welded.
    #[serde(default)]
    pub max_gap: f64,
    #[serde(default)]
    pub selection: Selection,
}

impl WeldConfig {
    /// A flat fillet weld of leg `size` between two face sets.
    pub fn fillet(size: f64, side1: Vec<KernelId>, side2: Vec<KernelId>) -> Self {
        Self {
            primary: SideConfig::new(WeldFamily::Fillet).with_size(size),
            other_side: None,
            root_gap: None,
            flip_direction: false,
            opposite_direction: false,
            corner: CornerTreatment::None,
            tangent_propagation: false,
            max_gap: 0.0,
            selection: Selection {
                side1,
                side2,
                edges: Vec::new(),
            },
        }
    }

    /// A butt weld along the given edges. Family parameters are set with the
    /// `with_*` builders.
    pub fn butt(family: WeldFamily, edges: Vec<KernelId>) -> Self {
        Self {
            primary: SideConfig::new(family),
            other_side: None,
            root_gap: None,
            flip_direction: false,
            opposite_direction: false,
            corner: CornerTreatment::None,
            tangent_propagation: false,
            max_gap: 0.0,
            selection: Selection {
                side1: Vec::new(),
                side2: Vec::new(),
                edges,
            },
        }
    }

    pub fn family(&self) -> WeldFamily {
        self.primary.family
    }

    /// Label for body names. Double-sided joints with differing families
    /// list both, e.g. "V-Butt + Bevel-Butt".
    pub fn label(&self) -> String {
        match &self.other_side {
            Some(other) if other.family != self.primary.family => {
                format!("{} + {}", self.primary.family, other.family)
            }
            _ => self.primary.family.label().to_string(),
        }
    }

    pub fn with_shape(mut self, shape: WeldShape) -> Self {
        self.primary.shape = shape;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.primary.size = Some(size);
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.primary.offset = Some(offset);
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.primary.angle = Some(angle);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.primary.radius = Some(radius);
        self
    }

    pub fn with_dimension(mut self, dimension: DimensionConvention) -> Self {
        self.primary.dimension = dimension;
        self
    }

    pub fn with_convexity(mut self, convexity: ConvexityConvention) -> Self {
        self.primary.convexity = convexity;
        self
    }

    pub fn with_root_gap(mut self, width: f64, height: f64) -> Self {
        self.root_gap = Some(RootGap { width, height });
        self
    }

    pub fn with_other_side(mut self, side: SideConfig) -> Self {
        self.other_side = Some(side);
        self
    }

    pub fn with_corner(mut self, corner: CornerTreatment) -> Self {
        self.corner = corner;
        self
    }

    pub fn with_propagation(mut self, tangent_propagation: bool) -> Self {
        self.tangent_propagation = tangent_propagation;
        self
    }

    pub fn with_max_gap(mut self, max_gap: f64) -> Self {
        self.max_gap = max_gap;
        self
    }

    pub fn opposite(mut self, opposite_direction: bool) -> Self {
        self.opposite_direction = opposite_direction;
        self
    }

    pub fn flipped(mut self, flip_direction: bool) -> Self {
        self.flip_direction = flip_direction;
        self
    }
}
