//! Speed/feed/depth recommendations per operation
//!
//! A stored envelope is used when the record has one and every sub-field is
//! ordered. Otherwise the envelope is derived: speeds by inverting Taylor over
//! the configured tool-life window, feed and depth from the operation
//! baselines scaled by 1 / power_factor.

use serde::Serialize;
use tracing::{debug, warn};

use super::{kienzle, taylor, EvalError, Evaluated, KienzleCorrections, ModelWarning};
use crate::catalog::{Bounds, MaterialRecord, Operation, OperationEnvelope};
use crate::config::EvaluatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeSource {
    Stored,
    Derived,
}

impl std::fmt::Display for EnvelopeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeSource::Stored => write!(f, "stored"),
            EnvelopeSource::Derived => write!(f, "derived"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub material_id: String,
    pub operation: Operation,
    pub source: EnvelopeSource,
    #[serde(flatten)]
    pub envelope: OperationEnvelope,
    /// Taylor life at the optimal speed, reference coolant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_life_at_optimal_min: Option<f64>,
    /// Turning only: kc at h = optimal feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_cutting_force_n_mm2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutting_power_kw: Option<f64>,
}

pub fn recommend(
    material: &MaterialRecord,
    operation: Operation,
    config: &EvaluatorConfig,
) -> Result<Evaluated<Recommendation>, EvalError> {
    let mut warnings = Vec::new();

    let (envelope, source) = match material.recommendations.get(&operation) {
        Some(stored) => {
            check_envelope(material, operation, stored)?;
            if let Some(deviation) = compare_with_model(material, operation, stored, config) {
                warnings.push(deviation);
            }
            debug!(material = %material.id, %operation, "using stored envelope");
            (stored.clone(), EnvelopeSource::Stored)
        }
        None => {
            let derived = derive_envelope(material, operation, config)?;
            debug!(material = %material.id, %operation, speed = derived.speed.optimal, "derived envelope");
            (derived, EnvelopeSource::Derived)
        }
    };

    let profile = config.operations.get(operation);
    // A stored envelope names its own operating depth
    let life_depth_mm = match (source, envelope.depth) {
        (EnvelopeSource::Stored, Some(depth)) => depth.optimal,
        _ => profile.taylor_depth_mm,
    };
    let tool_life_at_optimal_min = match taylor::tool_life(
        envelope.speed.optimal,
        life_depth_mm,
        &config.reference_coolant,
        &material.taylor,
        config.max_tool_life_min,
    ) {
        Ok(life) => {
            warnings.extend(life.warnings);
            Some(life.value)
        }
        Err(e) => {
            debug!(material = %material.id, error = %e, "no tool-life estimate");
            None
        }
    };

    let (specific_cutting_force_n_mm2, cutting_power_kw) = match operation {
        Operation::Turning => match cutting_load(material, &envelope, config) {
            Ok(load) => {
                warnings.extend(load.warnings);
                (Some(load.value.0), Some(load.value.1))
            }
            Err(e) => {
                debug!(material = %material.id, error = %e, "no cutting force estimate");
                (None, None)
            }
        },
        Operation::Milling | Operation::Drilling => (None, None),
    };

    Ok(Evaluated {
        value: Recommendation {
            material_id: material.id.clone(),
            operation,
            source,
            envelope,
            tool_life_at_optimal_min,
            specific_cutting_force_n_mm2,
            cutting_power_kw,
        },
        warnings,
    })
}

/// Every sub-field must satisfy min <= optimal <= max
pub fn check_envelope(
    material: &MaterialRecord,
    operation: Operation,
    envelope: &OperationEnvelope,
) -> Result<(), EvalError> {
    for (field, bounds) in envelope.fields() {
        if !bounds.is_consistent() {
            return Err(EvalError::InconsistentEnvelope {
                material: material.id.clone(),
                operation,
                field,
                min: bounds.min,
                optimal: bounds.optimal,
                max: bounds.max,
            });
        }
    }
    Ok(())
}

/// Model speeds for `operation` over the configured tool-life window
pub fn derive_speed(
    material: &MaterialRecord,
    operation: Operation,
    config: &EvaluatorConfig,
) -> Result<Bounds, EvalError> {
    let profile = config.operations.get(operation);
    let wear = material.machinability.tool_wear_factor;
    super::ensure_positive("tool wear factor", wear)?;

    let speed_at = |life_min: f64| {
        taylor::speed_for_tool_life(
            life_min * wear,
            profile.taylor_depth_mm,
            &config.reference_coolant,
            &material.taylor,
        )
        .map(|v| v * profile.speed_factor)
    };

    let [shortest, longest] = config.tool_life_window_min;
    // Longer life means slower cutting
    Ok(Bounds::new(
        speed_at(longest)?,
        speed_at(config.target_tool_life_min)?,
        speed_at(shortest)?,
    ))
}

pub fn derive_envelope(
    material: &MaterialRecord,
    operation: Operation,
    config: &EvaluatorConfig,
) -> Result<OperationEnvelope, EvalError> {
    let profile = config.operations.get(operation);
    let power_factor = material.machinability.power_factor;
    super::ensure_positive("power factor", power_factor)?;
    let scale = 1.0 / power_factor;

    Ok(OperationEnvelope {
        speed: derive_speed(material, operation, config)?,
        feed: profile.feed.scaled(scale),
        depth: profile.depth.map(|d| d.scaled(scale)),
        // Engagement is a geometry choice, not a material one
        radial_depth_percent: profile.radial_depth_percent,
    })
}

fn compare_with_model(
    material: &MaterialRecord,
    operation: Operation,
    stored: &OperationEnvelope,
    config: &EvaluatorConfig,
) -> Option<ModelWarning> {
    let derived = match derive_speed(material, operation, config) {
        Ok(speed) => speed,
        Err(e) => {
            debug!(material = %material.id, %operation, error = %e, "cannot cross-check stored envelope");
            return None;
        }
    };

    let deviation = (stored.speed.optimal - derived.optimal).abs() / derived.optimal;
    if deviation > config.envelope_deviation_tolerance {
        warn!(
            material = %material.id,
            %operation,
            stored = stored.speed.optimal,
            derived = derived.optimal,
            "stored speed deviates from model"
        );
        Some(ModelWarning::StoredEnvelopeDeviates {
            operation,
            stored_speed: stored.speed.optimal,
            derived_speed: derived.optimal,
            deviation,
        })
    } else {
        None
    }
}

/// kc (N/mm²) and power (kW) at the optimal turning point
fn cutting_load(
    material: &MaterialRecord,
    envelope: &OperationEnvelope,
    config: &EvaluatorConfig,
) -> Result<Evaluated<(f64, f64)>, EvalError> {
    let depth = envelope
        .depth
        .ok_or(EvalError::invalid("depth of cut", f64::NAN, "turning envelope has no depth"))?;
    let corrections = KienzleCorrections {
        geometry: true,
        temperature_c: None,
        speed_m_min: Some(envelope.speed.optimal),
    };

    let kc = kienzle::specific_cutting_force(
        envelope.feed.optimal,
        &material.kienzle,
        &corrections,
        &config.kienzle_reference(),
    )?;
    super::ensure_positive("chip width", depth.optimal)?;
    let force = kc.value * depth.optimal * envelope.feed.optimal;
    let power = kienzle::cutting_power_kw(force, envelope.speed.optimal)?;
    Ok(kc.map(|kc| (kc, power)))
}
