//! Kienzle specific cutting force model
//!
//! kc = kc1.1 · h^(-mc) · K, with K the product of the requested corrections.
//! Fc = kc · b · h, Pc = Fc · vc / 60 000.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ensure_positive, EvalError, Evaluated, ModelWarning};

/// Kienzle coefficients for one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KienzleParams {
    /// Specific cutting force at h = 1 mm, b = 1 mm (N/mm²)
    pub kc1_1: f64,
    /// Chip-thickness exponent of the power law
    pub mc: f64,
    /// Relative change of kc per °C away from the reference temperature
    pub kc_temp_coefficient: f64,
    /// Change of kc per unit of ln(v / v_ref)
    pub kc_speed_coefficient: f64,
    pub rake_angle_correction: f64,
    /// Exponent fitted independently of `mc`; only used for data checks
    pub chip_thickness_exponent: f64,
    pub cutting_edge_correction: f64,
    pub engagement_factor: f64,
}

impl KienzleParams {
    /// Combined rake, edge and engagement multiplier
    pub fn geometry_factor(&self) -> f64 {
        self.rake_angle_correction * self.cutting_edge_correction * self.engagement_factor
    }
}

/// Optional corrections applied on top of the nominal power law
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KienzleCorrections {
    /// Apply rake-angle, cutting-edge and engagement corrections
    pub geometry: bool,
    pub temperature_c: Option<f64>,
    pub speed_m_min: Option<f64>,
}

/// Reference state the temperature and speed corrections are relative to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KienzleReference {
    pub temperature_c: f64,
    pub speed_m_min: f64,
}

impl Default for KienzleReference {
    fn default() -> Self {
        Self {
            temperature_c: 20.0,
            speed_m_min: 100.0,
        }
    }
}

/// Specific cutting force (N/mm²) for undeformed chip thickness `h` (mm)
pub fn specific_cutting_force(
    chip_thickness_mm: f64,
    params: &KienzleParams,
    corrections: &KienzleCorrections,
    reference: &KienzleReference,
) -> Result<Evaluated<f64>, EvalError> {
    ensure_positive("chip thickness", chip_thickness_mm)?;

    let mut kc = params.kc1_1 * chip_thickness_mm.powf(-params.mc);

    if corrections.geometry {
        kc *= params.geometry_factor();
    }

    if let Some(temperature) = corrections.temperature_c {
        if !temperature.is_finite() {
            return Err(EvalError::invalid("temperature", temperature, "must be finite"));
        }
        kc *= 1.0 + params.kc_temp_coefficient * (temperature - reference.temperature_c);
    }

    if let Some(speed) = corrections.speed_m_min {
        ensure_positive("cutting speed", speed)?;
        ensure_positive("reference cutting speed", reference.speed_m_min)?;
        kc *= 1.0 + params.kc_speed_coefficient * (speed / reference.speed_m_min).ln();
    }

    if kc < 0.0 {
        warn!(raw = kc, "corrected specific cutting force is negative, clamping to zero");
        return Ok(Evaluated::new(0.0).with_warning(ModelWarning::NegativeCuttingForce { raw_n_mm2: kc }));
    }

    Ok(Evaluated::new(kc))
}

/// Main cutting force Fc (N) for chip thickness `h` and chip width `b` (mm)
pub fn cutting_force(
    chip_thickness_mm: f64,
    chip_width_mm: f64,
    params: &KienzleParams,
    corrections: &KienzleCorrections,
    reference: &KienzleReference,
) -> Result<Evaluated<f64>, EvalError> {
    ensure_positive("chip width", chip_width_mm)?;
    let kc = specific_cutting_force(chip_thickness_mm, params, corrections, reference)?;
    Ok(kc.map(|kc| kc * chip_width_mm * chip_thickness_mm))
}

/// Cutting power in kW for force Fc (N) at cutting speed vc (m/min)
pub fn cutting_power_kw(force_n: f64, speed_m_min: f64) -> Result<f64, EvalError> {
    ensure_positive("cutting speed", speed_m_min)?;
    if !force_n.is_finite() || force_n < 0.0 {
        return Err(EvalError::invalid("cutting force", force_n, "must be finite and non-negative"));
    }
    Ok(force_n * speed_m_min / 60_000.0)
}
