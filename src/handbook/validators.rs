//! Catalog data-quality checks

use serde::Serialize;

use super::recommend::check_envelope;
use crate::catalog::{Catalog, MaterialRecord};
use crate::config::EvaluatorConfig;

/// Allowed gap between the typical composition sum and 100 %
const COMPOSITION_SUM_TOLERANCE: f64 = 1.5;
const CHIP_EXPONENT_TOLERANCE: f64 = 0.05;

/// Validation issue with severity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub material: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Run every record check plus the per-alloy hardness ordering check
pub fn validate_catalog(catalog: &Catalog, config: &EvaluatorConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for material in catalog.iter() {
        issues.extend(validate_record(material, config));
    }
    for group in catalog.by_alloy().values() {
        issues.extend(check_hardness_order(group));
    }

    issues
}

/// Checks that need only one record
pub fn validate_record(material: &MaterialRecord, config: &EvaluatorConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (element, range) in &material.composition {
        if range.typical < range.min || range.typical > range.max {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "COMPOSITION_OUT_OF_RANGE".to_string(),
                material: material.id.clone(),
                message: format!(
                    "{} typical {}% lies outside [{}, {}]%",
                    element, range.typical, range.min, range.max
                ),
                suggestion: None,
            });
        }
    }

    let total = material.composition_total();
    if (total - 100.0).abs() > COMPOSITION_SUM_TOLERANCE {
        issues.push(ValidationIssue {
            severity: Severity::Info,
            code: "COMPOSITION_SUM".to_string(),
            material: material.id.clone(),
            message: format!("typical composition sums to {:.2}%", total),
            suggestion: Some("Check the balance element (usually Fe)".to_string()),
        });
    }

    for (operation, envelope) in &material.recommendations {
        if let Err(e) = check_envelope(material, *operation, envelope) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "ENVELOPE_ORDER".to_string(),
                material: material.id.clone(),
                message: e.to_string(),
                suggestion: Some("Stored envelopes need min <= optimal <= max".to_string()),
            });
        }
    }

    let kienzle = &material.kienzle;
    if (kienzle.chip_thickness_exponent - kienzle.mc).abs() > CHIP_EXPONENT_TOLERANCE {
        issues.push(ValidationIssue {
            severity: Severity::Info,
            code: "CHIP_EXPONENT_MISMATCH".to_string(),
            material: material.id.clone(),
            message: format!(
                "chip_thickness_exponent {} differs from mc {}",
                kienzle.chip_thickness_exponent, kienzle.mc
            ),
            suggestion: None,
        });
    }

    if !material.taylor.coolant_factor.contains_key(&config.reference_coolant) {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "MISSING_REFERENCE_COOLANT".to_string(),
            material: material.id.clone(),
            message: format!(
                "no tool-life factor for reference coolant '{}'; envelopes cannot be derived",
                config.reference_coolant
            ),
            suggestion: Some(format!(
                "Add it or pick one of: {}",
                material.taylor.coolants().collect::<Vec<_>>().join(", ")
            )),
        });
    }

    issues
}

/// Harder records of one alloy must cut harder: higher kc1.1, lower Taylor C.
/// `group` is sorted by hardness.
fn check_hardness_order(group: &[&MaterialRecord]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for pair in group.windows(2) {
        let (softer, harder) = (pair[0], pair[1]);
        if harder.hardness.rockwell_c <= softer.hardness.rockwell_c {
            continue;
        }

        if harder.kienzle.kc1_1 <= softer.kienzle.kc1_1 {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "HARDNESS_KC_ORDER".to_string(),
                material: harder.id.clone(),
                message: format!(
                    "{} HRC {} has kc1.1 {} but softer {} has {}",
                    harder.id,
                    harder.hardness.rockwell_c,
                    harder.kienzle.kc1_1,
                    softer.id,
                    softer.kienzle.kc1_1
                ),
                suggestion: Some("Refit the Kienzle coefficients".to_string()),
            });
        }

        if harder.taylor.c >= softer.taylor.c {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "HARDNESS_TAYLOR_ORDER".to_string(),
                material: harder.id.clone(),
                message: format!(
                    "{} HRC {} has Taylor C {} but softer {} has {}",
                    harder.id,
                    harder.hardness.rockwell_c,
                    harder.taylor.c,
                    softer.id,
                    softer.taylor.c
                ),
                suggestion: Some("Refit the Taylor constants".to_string()),
            });
        }
    }

    issues
}
