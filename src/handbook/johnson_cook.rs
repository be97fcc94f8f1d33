//! Johnson-Cook flow stress model
//!
//! σ = (A + B·εⁿ) · (1 + C·ln(ε̇/ε̇₀)) · (1 − T*ᵐ),  T* = (T − T_room) / (T_melt − T_room)

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EvalError, Evaluated, ModelWarning};

/// Johnson-Cook constants for one material. Stresses in MPa, temperatures in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JohnsonCookParams {
    /// Initial yield stress A
    #[serde(alias = "A")]
    pub a: f64,
    /// Hardening modulus B
    #[serde(alias = "B")]
    pub b: f64,
    /// Strain-rate sensitivity C
    #[serde(alias = "C")]
    pub c: f64,
    /// Hardening exponent
    pub n: f64,
    /// Thermal softening exponent
    pub m: f64,
    pub melting_temp: f64,
    /// ε̇₀ (1/s)
    pub reference_strain_rate: f64,
}

/// The three multiplicative terms of the model, evaluated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowStressTerms {
    pub hardening: f64,
    pub rate_factor: f64,
    pub thermal_factor: f64,
}

impl FlowStressTerms {
    pub fn stress(&self) -> f64 {
        self.hardening * self.rate_factor * self.thermal_factor
    }
}

/// Flow stress (MPa) at plastic strain `strain`, strain rate `strain_rate` (1/s)
/// and temperature `temperature_c`.
pub fn flow_stress(
    strain: f64,
    strain_rate: f64,
    temperature_c: f64,
    params: &JohnsonCookParams,
    room_temperature_c: f64,
) -> Result<Evaluated<f64>, EvalError> {
    flow_stress_terms(strain, strain_rate, temperature_c, params, room_temperature_c)
        .map(|terms| terms.map(|t| t.stress()))
}

pub fn flow_stress_terms(
    strain: f64,
    strain_rate: f64,
    temperature_c: f64,
    params: &JohnsonCookParams,
    room_temperature_c: f64,
) -> Result<Evaluated<FlowStressTerms>, EvalError> {
    if !strain.is_finite() || strain < 0.0 {
        return Err(EvalError::invalid("plastic strain", strain, "must be finite and non-negative"));
    }
    if !temperature_c.is_finite() {
        return Err(EvalError::invalid("temperature", temperature_c, "must be finite"));
    }
    if !strain_rate.is_finite() {
        return Err(EvalError::invalid("strain rate", strain_rate, "must be finite"));
    }
    if !(params.reference_strain_rate > 0.0) {
        return Err(EvalError::invalid(
            "reference strain rate",
            params.reference_strain_rate,
            "must be positive",
        ));
    }
    if !(params.melting_temp > room_temperature_c) {
        return Err(EvalError::invalid(
            "melting temperature",
            params.melting_temp,
            "must exceed room temperature",
        ));
    }

    let mut warnings = Vec::new();

    let hardening = params.a + params.b * strain.powf(params.n);

    // Non-positive rates carry no rate information; treat as quasi-static.
    let mut rate_factor = if strain_rate > 0.0 {
        1.0 + params.c * (strain_rate / params.reference_strain_rate).ln()
    } else {
        debug!(strain_rate, "non-positive strain rate, rate term ignored");
        1.0
    };
    if rate_factor < 0.0 {
        warnings.push(ModelWarning::RateFactorClamped { raw: rate_factor });
        rate_factor = 0.0;
    }

    let thermal_factor = if temperature_c >= params.melting_temp {
        warn!(
            temperature_c,
            melting_temp = params.melting_temp,
            "temperature at or above melting point, flow stress clamped to zero"
        );
        warnings.push(ModelWarning::AboveMeltingPoint {
            temperature_c,
            melting_temp_c: params.melting_temp,
        });
        0.0
    } else {
        let homologous = (temperature_c - room_temperature_c) / (params.melting_temp - room_temperature_c);
        // No softening at or below room temperature
        if homologous <= 0.0 {
            1.0
        } else {
            1.0 - homologous.powf(params.m)
        }
    };

    Ok(Evaluated {
        value: FlowStressTerms {
            hardening,
            rate_factor,
            thermal_factor,
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROOM: f64 = 20.0;

    fn a2_annealed() -> JohnsonCookParams {
        JohnsonCookParams {
            a: 480.0,
            b: 780.0,
            c: 0.014,
            n: 0.29,
            m: 1.03,
            melting_temp: 1420.0,
            reference_strain_rate: 1.0,
        }
    }

    #[test]
    fn test_reference_state_equals_a() {
        let params = a2_annealed();
        let sigma = flow_stress(0.0, params.reference_strain_rate, ROOM, &params, ROOM).unwrap();
        assert_eq!(sigma.value, params.a);
        assert!(sigma.warnings.is_empty());
    }

    #[test]
    fn test_reference_state_equals_a_with_zero_softening_exponent() {
        let params = JohnsonCookParams {
            m: 0.0,
            ..a2_annealed()
        };
        let sigma = flow_stress(0.0, 1.0, ROOM, &params, ROOM).unwrap();
        assert_eq!(sigma.value, params.a);
    }

    #[test]
    fn test_full_expression() {
        let p = a2_annealed();
        let (eps, rate, t) = (0.2f64, 1000.0, 500.0);
        let expected = (p.a + p.b * eps.powf(p.n))
            * (1.0 + p.c * (rate / p.reference_strain_rate).ln())
            * (1.0 - ((t - ROOM) / (p.melting_temp - ROOM)).powf(p.m));

        let sigma = flow_stress(eps, rate, t, &p, ROOM).unwrap();
        assert_relative_eq!(sigma.value, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_strain_hardens_and_heat_softens() {
        let p = a2_annealed();
        let low = flow_stress(0.05, 1.0, ROOM, &p, ROOM).unwrap().value;
        let high = flow_stress(0.5, 1.0, ROOM, &p, ROOM).unwrap().value;
        let hot = flow_stress(0.5, 1.0, 800.0, &p, ROOM).unwrap().value;
        assert!(high > low, "more strain should harden");
        assert!(hot < high, "heat should soften");
    }

    #[test]
    fn test_non_positive_strain_rate_is_rate_insensitive() {
        let p = a2_annealed();
        let quasi_static = flow_stress(0.1, 0.0, ROOM, &p, ROOM).unwrap();
        let reference = flow_stress(0.1, p.reference_strain_rate, ROOM, &p, ROOM).unwrap();
        assert_eq!(quasi_static.value, reference.value);

        let negative = flow_stress(0.1, -5.0, ROOM, &p, ROOM).unwrap();
        assert_eq!(negative.value, reference.value);
    }

    #[test]
    fn test_above_melting_point_clamps_with_warning() {
        let p = a2_annealed();
        for t in [p.melting_temp, p.melting_temp + 200.0] {
            let sigma = flow_stress(0.1, 100.0, t, &p, ROOM).unwrap();
            assert_eq!(sigma.value, 0.0);
            assert!(matches!(
                sigma.warnings.as_slice(),
                [ModelWarning::AboveMeltingPoint { .. }]
            ));
        }
    }

    #[test]
    fn test_below_room_temperature_does_not_soften() {
        let p = a2_annealed();
        let cold = flow_stress(0.1, 1.0, -40.0, &p, ROOM).unwrap();
        let room = flow_stress(0.1, 1.0, ROOM, &p, ROOM).unwrap();
        assert_eq!(cold.value, room.value);
        assert!(cold.value.is_finite());
    }

    #[test]
    fn test_very_slow_rate_clamps_rate_factor() {
        let p = JohnsonCookParams {
            c: 0.5,
            ..a2_annealed()
        };
        let sigma = flow_stress(0.1, 1e-6, ROOM, &p, ROOM).unwrap();
        assert_eq!(sigma.value, 0.0);
        assert!(matches!(
            sigma.warnings.as_slice(),
            [ModelWarning::RateFactorClamped { .. }]
        ));
    }

    #[test]
    fn test_non_finite_strain_rate_rejected() {
        let p = a2_annealed();
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = flow_stress(0.1, rate, ROOM, &p, ROOM).unwrap_err();
            assert!(matches!(err, EvalError::InvalidInput { quantity: "strain rate", .. }));
        }
    }

    #[test]
    fn test_negative_strain_rejected() {
        let err = flow_stress(-0.1, 1.0, ROOM, &a2_annealed(), ROOM).unwrap_err();
        assert!(matches!(err, EvalError::InvalidInput { quantity: "plastic strain", .. }));
    }
}
