//! Weld type dispatch: validate a configuration, route it to its planner and
//! finish the planner's output on the host side.

use std::f64::consts::FRAC_PI_2;

use tracing::{debug, info, instrument, warn};
use weld_geom::Tolerance;
use weld_kernel::{BodyProperty, CounterStore, KernelSolidHandle, OpId};
use weld_ops::{delete_scratch, synthesize_butt, synthesize_fillet, KernelBundle, ValidationError};
use weld_types::{Parameter, SideConfig, WeldConfig, WeldFamily, WeldShape};

use crate::counter::WeldCounter;
use crate::types::{BodyProperties, EngineError, FeatureResult};

/// Check everything about `config` that does not need the model.
///
/// The first problem found is returned, naming the offending parameters.
pub fn validate(config: &WeldConfig) -> Result<(), ValidationError> {
    let family = config.family();
    match (&config.other_side, family) {
        (Some(_), WeldFamily::Fillet) => {
            return Err(
                ValidationError::new("unsupported weld type: fillet welds have no other side")
                    .parameter("other_side"),
            )
        }
        (Some(other), _) if other.family == WeldFamily::Fillet => {
            return Err(ValidationError::new(
                "unsupported weld type: the other side of a butt weld cannot be a fillet",
            )
            .parameter("other_side.family"))
        }
        _ => {}
    }

    let root_width = config.root_gap.as_ref().map_or(0.0, |g| g.width);
    validate_side(&config.primary, "", root_width)?;
    if let Some(other) = &config.other_side {
        validate_side(other, "other_side.", root_width)?;
    }

    if let Some(gap) = &config.root_gap {
        let bad = |v: f64| !v.is_finite() || v < 0.0;
        if bad(gap.width) || bad(gap.height) {
            return Err(
                ValidationError::new("root gap width and height must not be negative")
                    .parameter("root_gap"),
            );
        }
    }
    if !config.max_gap.is_finite() || config.max_gap < 0.0 {
        return Err(ValidationError::new("maximum gap must not be negative").parameter("max_gap"));
    }

    let selection = &config.selection;
    if family.is_butt() {
        if selection.edges.is_empty() {
            return Err(
                ValidationError::new("select at least one weld-line edge").parameter("edges"),
            );
        }
    } else {
        if selection.side1.is_empty() {
            return Err(
                ValidationError::new("select at least one face for side 1").parameter("side1"),
            );
        }
        if selection.side2.is_empty() {
            return Err(
                ValidationError::new("select at least one face for side 2").parameter("side2"),
            );
        }
    }
    Ok(())
}

fn validate_side(side: &SideConfig, prefix: &str, root_width: f64) -> Result<(), ValidationError> {
    let name = |p: Parameter| format!("{prefix}{}", p.name());

    let missing = side.missing_parameters();
    if !missing.is_empty() {
        let list: Vec<&str> = missing.iter().map(|p| p.name()).collect();
        let mut err = ValidationError::new(format!(
            "{} weld needs {}",
            side.family,
            list.join(", ")
        ));
        for p in missing {
            err = err.parameter(name(p));
        }
        return Err(err);
    }

    for p in [Parameter::Size, Parameter::Radius] {
        if let Some(v) = side.value(p) {
            if !v.is_finite() || v <= 0.0 {
                return Err(
                    ValidationError::new(format!("{} must be positive", p.name()))
                        .parameter(name(p)),
                );
            }
        }
    }
    if let Some(angle) = side.angle {
        if !angle.is_finite() || !(0.0..FRAC_PI_2).contains(&angle) {
            return Err(ValidationError::new("angle must lie in [0, 90) degrees")
                .parameter(name(Parameter::Angle)));
        }
        // Without a root gap these grooves take all their width from the angle.
        let angled = matches!(side.family, WeldFamily::VButt | WeldFamily::BevelButt);
        if angled && angle == 0.0 && root_width <= 0.0 {
            return Err(ValidationError::new(format!(
                "{} weld without a root gap needs a positive angle",
                side.family
            ))
            .parameter(name(Parameter::Angle)));
        }
    }
    if let Some(offset) = side.offset {
        if !offset.is_finite() {
            return Err(ValidationError::new("offset must be a finite number")
                .parameter(name(Parameter::Offset)));
        }
    }
    if side.family.is_butt() && side.shape == WeldShape::Convex {
        return Err(ValidationError::new(format!(
            "unsupported shape: {} welds cannot be convex",
            side.family
        ))
        .parameter(format!("{prefix}shape")));
    }
    Ok(())
}

/// Evaluate one weld feature.
///
/// Validates `config`, runs its planner, deletes the planner's scratch
/// geometry once and names every created body "Weld n (Label)". Numbers in
/// `reserved` are reused in body order before new ones are drawn from
/// `counters`.
#[instrument(skip(kb, counters, reserved, config, tol), fields(op = %op, family = %config.family()))]
pub fn evaluate(
    kb: &mut dyn KernelBundle,
    counters: &mut dyn CounterStore,
    reserved: &[u64],
    op: &OpId,
    config: &WeldConfig,
    tol: &Tolerance,
) -> Result<FeatureResult, EngineError> {
    validate(config)?;

    let output = if config.family().is_butt() {
        synthesize_butt(kb, op, config, tol)?
    } else {
        synthesize_fillet(kb, op, config, tol)?
    };

    let mut diagnostics = output.diagnostics;
    let cleanup = delete_scratch(kb, &op.child("cleanup"), &output.scratch);
    diagnostics.warnings.extend(cleanup.warnings);

    if output.bodies.is_empty() {
        warn!(diagnostics = diagnostics.len(), "weld produced no bodies");
        return Err(EngineError::WeldFailed { diagnostics });
    }

    let label = config.label();
    let mut result = FeatureResult {
        bodies: output.bodies,
        sections: output.sections,
        treated_ends: output.treated_ends,
        ..FeatureResult::default()
    };
    for (i, body) in result.bodies.iter().enumerate() {
        let (number, name) = match reserved.get(i) {
            Some(n) => (*n, WeldCounter::name(*n, &label)),
            None => WeldCounter.increment(counters, &label),
        };
        let name_op = op.unstable("name", i);
        if let Err(e) = kb.set_property(&name_op, &[*body], BodyProperty::Name(name.clone())) {
            warn!(op = %name_op, error = %e, "could not name weld body");
            diagnostics.warn(&name_op, format!("body not named: {e}"));
        }
        debug!(%body, %name, "named weld body");
        result.numbers.push(number);
        result.names.push(name);
    }
    result.diagnostics = diagnostics;

    info!(bodies = result.bodies.len(), "weld evaluated");
    Ok(result)
}

/// Assign material, appearance and BOM exclusion to finished bodies.
///
/// Failures are returned as diagnostics; the bodies are kept either way.
pub fn apply_properties(
    kb: &mut dyn KernelBundle,
    op: &OpId,
    bodies: &[KernelSolidHandle],
    properties: &BodyProperties,
) -> Vec<String> {
    let mut requests = Vec::new();
    if let Some(material) = &properties.material {
        requests.push(("material", BodyProperty::Material(material.clone())));
    }
    if let Some(appearance) = &properties.appearance {
        requests.push(("appearance", BodyProperty::Appearance(appearance.clone())));
    }
    if properties.exclude_from_bom {
        requests.push(("bom", BodyProperty::ExcludeFromBom(true)));
    }

    let mut failures = Vec::new();
    for (key, property) in requests {
        let sub = op.child(key);
        if let Err(e) = kb.set_property(&sub, bodies, property) {
            warn!(op = %sub, error = %e, "property not assigned");
            failures.push(format!("{sub}: {key} not assigned: {e}"));
        }
    }
    failures
}
