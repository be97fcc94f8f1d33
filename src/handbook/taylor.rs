//! Extended Taylor tool-life model
//!
//! v · Tⁿ · d^x = C · k_H · k_cool[coolant]
//!
//! Solved for tool life T (min) or, inverted, for the cutting speed v (m/min)
//! that yields a target life.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{ensure_positive, EvalError, Evaluated, ModelWarning};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaylorParams {
    /// Taylor constant C: speed (m/min) for one minute of life at unit depth
    #[serde(alias = "C")]
    pub c: f64,
    /// Tool-life exponent n
    pub n: f64,
    /// Exponent of the cutting-temperature correction (catalog data only)
    pub temperature_exponent: f64,
    pub hardness_factor: f64,
    /// Coolant name -> multiplier on C
    pub coolant_factor: BTreeMap<String, f64>,
    /// Exponent x of the depth of cut
    pub depth_exponent: f64,
}

impl TaylorParams {
    /// Multiplier for `coolant`. Unknown coolants are an error, never a default.
    pub fn coolant_multiplier(&self, coolant: &str) -> Result<f64, EvalError> {
        self.coolant_factor
            .get(coolant)
            .copied()
            .ok_or_else(|| EvalError::InvalidCoolant {
                coolant: coolant.to_string(),
                available: self.coolants().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn coolants(&self) -> impl Iterator<Item = &str> {
        self.coolant_factor.keys().map(String::as_str)
    }

    /// Right-hand side C · k_H · k_cool
    pub fn effective_constant(&self, coolant: &str) -> Result<f64, EvalError> {
        ensure_positive("Taylor constant C", self.c)?;
        ensure_positive("hardness factor", self.hardness_factor)?;
        let multiplier = self.coolant_multiplier(coolant)?;
        ensure_positive("coolant factor", multiplier)?;
        Ok(self.c * self.hardness_factor * multiplier)
    }
}

/// Expected tool life (min) at cutting speed `speed_m_min` and depth `depth_mm`.
///
/// Results beyond `max_life_min` (including overflow to infinity at very low
/// speed) are capped and flagged.
pub fn tool_life(
    speed_m_min: f64,
    depth_mm: f64,
    coolant: &str,
    params: &TaylorParams,
    max_life_min: f64,
) -> Result<Evaluated<f64>, EvalError> {
    ensure_positive("cutting speed", speed_m_min)?;
    ensure_positive("depth of cut", depth_mm)?;
    ensure_positive("Taylor exponent n", params.n)?;
    let constant = params.effective_constant(coolant)?;

    let ratio = constant / (speed_m_min * depth_mm.powf(params.depth_exponent));
    let life = ratio.powf(1.0 / params.n);

    if !life.is_finite() || life > max_life_min {
        debug!(raw = life, cap = max_life_min, "tool life capped");
        return Ok(Evaluated::new(max_life_min).with_warning(ModelWarning::ToolLifeCapped {
            raw_min: life,
            cap_min: max_life_min,
        }));
    }

    Ok(Evaluated::new(life))
}

/// Cutting speed (m/min) that gives `life_min` minutes of tool life
pub fn speed_for_tool_life(
    life_min: f64,
    depth_mm: f64,
    coolant: &str,
    params: &TaylorParams,
) -> Result<f64, EvalError> {
    ensure_positive("tool life", life_min)?;
    ensure_positive("depth of cut", depth_mm)?;
    ensure_positive("Taylor exponent n", params.n)?;
    let constant = params.effective_constant(coolant)?;

    Ok(constant / (life_min.powf(params.n) * depth_mm.powf(params.depth_exponent)))
}
