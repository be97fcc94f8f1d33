//! The Handbook - machining model evaluator
//!
//! Empirical models evaluated per material record:
//! - Kienzle specific cutting force (N/mm²)
//! - Johnson-Cook flow stress (MPa)
//! - Extended Taylor tool life (min)
//! - Speed/feed/depth recommendations for turning, milling and drilling
//!
//! Every evaluation is a pure function of the record and the evaluator
//! configuration. Fatal conditions are `EvalError`s; recoverable ones are
//! clamped and reported as `ModelWarning`s next to the value.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, MaterialRecord, Operation};
use crate::config::EvaluatorConfig;

pub mod johnson_cook;
pub mod kienzle;
pub mod recommend;
pub mod taylor;
pub mod validators;

pub use kienzle::{KienzleCorrections, KienzleReference};
pub use recommend::{EnvelopeSource, Recommendation};
pub use validators::{Severity, ValidationIssue};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("invalid {quantity}: {value} ({reason})")]
    InvalidInput {
        quantity: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("coolant '{coolant}' has no tool-life factor (available: {available})")]
    InvalidCoolant { coolant: String, available: String },

    #[error("unsupported operation '{0}': expected turning, milling or drilling")]
    UnsupportedOperation(String),

    #[error(
        "inconsistent {field} envelope for {material} {operation}: \
         min {min}, optimal {optimal}, max {max}"
    )]
    InconsistentEnvelope {
        material: String,
        operation: Operation,
        field: &'static str,
        min: f64,
        optimal: f64,
        max: f64,
    },

    #[error("unknown material: {0}")]
    UnknownMaterial(String),
}

impl EvalError {
    pub(crate) fn invalid(quantity: &'static str, value: f64, reason: &'static str) -> Self {
        EvalError::InvalidInput {
            quantity,
            value,
            reason,
        }
    }
}

pub(crate) fn ensure_positive(quantity: &'static str, value: f64) -> Result<(), EvalError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EvalError::invalid(quantity, value, "must be positive and finite"))
    }
}

/// Non-fatal condition raised while evaluating a model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelWarning {
    AboveMeltingPoint { temperature_c: f64, melting_temp_c: f64 },
    NegativeCuttingForce { raw_n_mm2: f64 },
    RateFactorClamped { raw: f64 },
    ToolLifeCapped { raw_min: f64, cap_min: f64 },
    StoredEnvelopeDeviates {
        operation: Operation,
        stored_speed: f64,
        derived_speed: f64,
        deviation: f64,
    },
}

impl std::fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelWarning::AboveMeltingPoint {
                temperature_c,
                melting_temp_c,
            } => write!(
                f,
                "{:.0} °C is at or above the melting point ({:.0} °C); flow stress clamped to 0",
                temperature_c, melting_temp_c
            ),
            ModelWarning::NegativeCuttingForce { raw_n_mm2 } => write!(
                f,
                "corrections drove kc negative ({:.1} N/mm²); clamped to 0",
                raw_n_mm2
            ),
            ModelWarning::RateFactorClamped { raw } => {
                write!(f, "strain-rate factor {:.3} below zero; clamped to 0", raw)
            }
            ModelWarning::ToolLifeCapped { raw_min, cap_min } => write!(
                f,
                "tool life {:.3e} min exceeds the cap; reported as {:.0} min",
                raw_min, cap_min
            ),
            ModelWarning::StoredEnvelopeDeviates {
                operation,
                stored_speed,
                derived_speed,
                deviation,
            } => write!(
                f,
                "stored {} speed {:.1} m/min deviates {:.0}% from model speed {:.1} m/min",
                operation,
                stored_speed,
                deviation * 100.0,
                derived_speed
            ),
        }
    }
}

/// A model result with the warnings raised while computing it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluated<T> {
    pub value: T,
    pub warnings: Vec<ModelWarning>,
}

impl<T> Evaluated<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: ModelWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Evaluated<U> {
        Evaluated {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Outcome of one record in a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub material_id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Ok(Evaluated<Recommendation>),
    Error(String),
}

/// Handbook - evaluates the models against a catalog
pub struct Handbook<'c> {
    catalog: &'c Catalog,
    config: EvaluatorConfig,
}

impl<'c> Handbook<'c> {
    pub fn new(catalog: &'c Catalog, config: EvaluatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn material(&self, id: &str) -> Result<&'c MaterialRecord, EvalError> {
        self.catalog.require(id)
    }

    /// Kienzle kc (N/mm²) for a catalog material
    pub fn specific_cutting_force(
        &self,
        material_id: &str,
        chip_thickness_mm: f64,
        corrections: &KienzleCorrections,
    ) -> Result<Evaluated<f64>, EvalError> {
        let material = self.material(material_id)?;
        kienzle::specific_cutting_force(
            chip_thickness_mm,
            &material.kienzle,
            corrections,
            &self.config.kienzle_reference(),
        )
    }

    /// Kienzle cutting force Fc (N)
    pub fn cutting_force(
        &self,
        material_id: &str,
        chip_thickness_mm: f64,
        chip_width_mm: f64,
        corrections: &KienzleCorrections,
    ) -> Result<Evaluated<f64>, EvalError> {
        let material = self.material(material_id)?;
        kienzle::cutting_force(
            chip_thickness_mm,
            chip_width_mm,
            &material.kienzle,
            corrections,
            &self.config.kienzle_reference(),
        )
    }

    /// Johnson-Cook flow stress (MPa)
    pub fn flow_stress(
        &self,
        material_id: &str,
        strain: f64,
        strain_rate: f64,
        temperature_c: f64,
    ) -> Result<Evaluated<f64>, EvalError> {
        let material = self.material(material_id)?;
        johnson_cook::flow_stress(
            strain,
            strain_rate,
            temperature_c,
            &material.johnson_cook,
            self.config.room_temperature_c,
        )
    }

    /// Taylor tool life (min)
    pub fn tool_life(
        &self,
        material_id: &str,
        speed_m_min: f64,
        depth_mm: f64,
        coolant: &str,
    ) -> Result<Evaluated<f64>, EvalError> {
        let material = self.material(material_id)?;
        taylor::tool_life(
            speed_m_min,
            depth_mm,
            coolant,
            &material.taylor,
            self.config.max_tool_life_min,
        )
    }

    /// Inverse Taylor: cutting speed (m/min) for a target tool life
    pub fn speed_for_tool_life(
        &self,
        material_id: &str,
        life_min: f64,
        depth_mm: f64,
        coolant: &str,
    ) -> Result<f64, EvalError> {
        let material = self.material(material_id)?;
        taylor::speed_for_tool_life(life_min, depth_mm, coolant, &material.taylor)
    }

    pub fn recommend(
        &self,
        material_id: &str,
        operation: Operation,
    ) -> Result<Evaluated<Recommendation>, EvalError> {
        let material = self.material(material_id)?;
        recommend::recommend(material, operation, &self.config)
    }

    /// Same as `recommend`, with the operation given by name
    pub fn recommend_named(
        &self,
        material_id: &str,
        operation: &str,
    ) -> Result<Evaluated<Recommendation>, EvalError> {
        let operation: Operation = operation.parse()?;
        self.recommend(material_id, operation)
    }

    /// Recommend `operation` for every catalog material in parallel.
    ///
    /// A failing record is reported in its entry and does not stop the batch.
    /// Entries come back in catalog ID order.
    pub fn recommend_batch(&self, operation: Operation) -> Vec<BatchEntry> {
        let materials: Vec<&MaterialRecord> = self.catalog.iter().collect();
        info!(%operation, materials = materials.len(), "batch recommendation");

        let entries: Vec<BatchEntry> = materials
            .par_iter()
            .map(|material| {
                let outcome = match recommend::recommend(material, operation, &self.config) {
                    Ok(recommendation) => BatchOutcome::Ok(recommendation),
                    Err(e) => {
                        warn!(material = %material.id, error = %e, "recommendation failed");
                        BatchOutcome::Error(e.to_string())
                    }
                };
                BatchEntry {
                    material_id: material.id.clone(),
                    outcome,
                }
            })
            .collect();

        let failed = entries
            .iter()
            .filter(|e| matches!(e.outcome, BatchOutcome::Error(_)))
            .count();
        debug!(failed, "batch complete");
        entries
    }

    /// Data-quality checks over the whole catalog
    pub fn validate_catalog(&self) -> Vec<ValidationIssue> {
        validators::validate_catalog(self.catalog, &self.config)
    }
}
