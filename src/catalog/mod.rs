//! Material catalog - tool steel records keyed by material ID
//!
//! Records are assembled from a base-alloy descriptor (composition, physical
//! data, model defaults shared by every heat treatment) and a condition overlay
//! (hardness, fitted model coefficients, stored recommendations). The two are
//! merged once at load time; after that a record is read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::handbook::johnson_cook::JohnsonCookParams;
use crate::handbook::kienzle::KienzleParams;
use crate::handbook::taylor::TaylorParams;
use crate::handbook::EvalError;

pub mod loader;

pub use loader::{Catalog, CatalogError};

/// Machining operation a recommendation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Turning,
    Milling,
    Drilling,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Turning, Operation::Milling, Operation::Drilling];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Turning => "turning",
            Operation::Milling => "milling",
            Operation::Drilling => "drilling",
        }
    }

    /// Feed unit for this operation
    pub fn feed_unit(&self) -> &'static str {
        match self {
            Operation::Milling => "mm/tooth",
            Operation::Turning | Operation::Drilling => "mm/rev",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turning" => Ok(Operation::Turning),
            "milling" => Ok(Operation::Milling),
            "drilling" => Ok(Operation::Drilling),
            _ => Err(EvalError::UnsupportedOperation(s.to_string())),
        }
    }
}

/// Heat-treatment condition of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Annealed,
    Normalized,
    Prehardened,
    Hardened,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Annealed => write!(f, "annealed"),
            Condition::Normalized => write!(f, "normalized"),
            Condition::Prehardened => write!(f, "prehardened"),
            Condition::Hardened => write!(f, "hardened"),
        }
    }
}

/// A (min, optimal, max) triple. Used for every stored and derived envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub optimal: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, optimal: f64, max: f64) -> Self {
        Self { min, optimal, max }
    }

    /// min <= optimal <= max, all finite and non-negative
    pub fn is_consistent(&self) -> bool {
        [self.min, self.optimal, self.max]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
            && self.min <= self.optimal
            && self.optimal <= self.max
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            optimal: self.optimal * factor,
            max: self.max * factor,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Composition limits for one element, mass percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionRange {
    pub min: f64,
    pub max: f64,
    pub typical: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hardness {
    pub rockwell_c: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brinell: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperties {
    pub density_kg_m3: f64,
    pub thermal_conductivity_w_mk: f64,
    pub specific_heat_j_kgk: f64,
    pub elastic_modulus_gpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicalProperties {
    pub tensile_strength_mpa: f64,
    pub yield_strength_mpa: f64,
    pub elongation_percent: f64,
}

/// Difficulty class, ordinal 1 (easy) to 4 (very difficult)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "DifficultyRepr")]
pub enum DifficultyClass {
    Easy,
    Moderate,
    Difficult,
    VeryDifficult,
}

impl DifficultyClass {
    pub fn ordinal(&self) -> u8 {
        match self {
            DifficultyClass::Easy => 1,
            DifficultyClass::Moderate => 2,
            DifficultyClass::Difficult => 3,
            DifficultyClass::VeryDifficult => 4,
        }
    }
}

impl std::fmt::Display for DifficultyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyClass::Easy => write!(f, "easy"),
            DifficultyClass::Moderate => write!(f, "moderate"),
            DifficultyClass::Difficult => write!(f, "difficult"),
            DifficultyClass::VeryDifficult => write!(f, "very difficult"),
        }
    }
}

// Catalogs carry the class either by name or by ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
enum DifficultyRepr {
    Ordinal(u8),
    Name(String),
}

impl TryFrom<DifficultyRepr> for DifficultyClass {
    type Error = String;

    fn try_from(repr: DifficultyRepr) -> Result<Self, Self::Error> {
        match repr {
            DifficultyRepr::Ordinal(1) => Ok(DifficultyClass::Easy),
            DifficultyRepr::Ordinal(2) => Ok(DifficultyClass::Moderate),
            DifficultyRepr::Ordinal(3) => Ok(DifficultyClass::Difficult),
            DifficultyRepr::Ordinal(4) => Ok(DifficultyClass::VeryDifficult),
            DifficultyRepr::Ordinal(n) => Err(format!("difficulty class must be 1-4, got {}", n)),
            DifficultyRepr::Name(name) => match name.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
                "easy" => Ok(DifficultyClass::Easy),
                "moderate" => Ok(DifficultyClass::Moderate),
                "difficult" => Ok(DifficultyClass::Difficult),
                "very_difficult" => Ok(DifficultyClass::VeryDifficult),
                other => Err(format!("unknown difficulty class '{}'", other)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machinability {
    /// AISI machinability rating, percent
    pub aisi_rating: f64,
    /// Fraction of the removal rate achievable in AISI 1212
    pub relative_to_1212: f64,
    /// Cutting power multiplier; feed and depth scale by its inverse
    pub power_factor: f64,
    /// Relative tool wear rate; stretches the tool-life target
    pub tool_wear_factor: f64,
    pub surface_finish_factor: f64,
    pub difficulty_class: DifficultyClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipForm {
    Continuous,
    Segmented,
    Discontinuous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipDescriptor {
    pub form: ChipForm,
    /// 0 = stringy, 1 = breaks readily
    pub breakability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalDescriptor {
    pub heat_partition_to_chip: f64,
    pub max_cutting_temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tendency {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribologyDescriptor {
    pub friction_coefficient: f64,
    pub adhesion_tendency: Tendency,
}

/// Stored speed/feed/depth envelope for one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEnvelope {
    /// m/min
    pub speed: Bounds,
    /// mm/rev (turning, drilling) or mm/tooth (milling)
    pub feed: Bounds,
    /// Cut depth in mm; milling records call it `axial_depth`
    #[serde(default, alias = "axial_depth", skip_serializing_if = "Option::is_none")]
    pub depth: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_depth_percent: Option<Bounds>,
}

impl OperationEnvelope {
    /// Named sub-fields, in display order
    pub fn fields(&self) -> Vec<(&'static str, Bounds)> {
        let mut fields = vec![("speed", self.speed), ("feed", self.feed)];
        if let Some(depth) = self.depth {
            fields.push(("depth", depth));
        }
        if let Some(radial) = self.radial_depth_percent {
            fields.push(("radial_depth_percent", radial));
        }
        fields
    }
}

/// Flat, fully merged material record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub id: String,
    /// Base alloy key the record was merged from (e.g. "A2")
    pub alloy: String,
    pub name: String,
    #[serde(default)]
    pub designation: String,
    pub condition: Condition,
    pub composition: BTreeMap<String, CompositionRange>,
    pub hardness: Hardness,
    pub physical: PhysicalProperties,
    pub mechanical: MechanicalProperties,
    pub kienzle: KienzleParams,
    pub johnson_cook: JohnsonCookParams,
    pub taylor: TaylorParams,
    pub machinability: Machinability,
    pub chip: ChipDescriptor,
    pub thermal: ThermalDescriptor,
    pub tribology: TribologyDescriptor,
    #[serde(default)]
    pub recommendations: BTreeMap<Operation, OperationEnvelope>,
}

impl MaterialRecord {
    /// Sum of typical composition percentages
    pub fn composition_total(&self) -> f64 {
        self.composition.values().map(|c| c.typical).sum()
    }

    pub fn is_hardened(&self) -> bool {
        self.condition == Condition::Hardened || self.hardness.rockwell_c >= 50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse() {
        assert_eq!("turning".parse::<Operation>().unwrap(), Operation::Turning);
        assert_eq!(" Milling ".parse::<Operation>().unwrap(), Operation::Milling);
        assert_eq!("DRILLING".parse::<Operation>().unwrap(), Operation::Drilling);

        let err = "facing".parse::<Operation>().unwrap_err();
        assert_eq!(err, EvalError::UnsupportedOperation("facing".to_string()));
    }

    #[test]
    fn test_bounds_consistency() {
        assert!(Bounds::new(1.0, 2.0, 3.0).is_consistent());
        assert!(Bounds::new(2.0, 2.0, 2.0).is_consistent());
        assert!(!Bounds::new(3.0, 2.0, 4.0).is_consistent());
        assert!(!Bounds::new(1.0, 5.0, 4.0).is_consistent());
        assert!(!Bounds::new(-1.0, 0.0, 1.0).is_consistent());
        assert!(!Bounds::new(1.0, f64::NAN, 2.0).is_consistent());
    }

    #[test]
    fn test_difficulty_class_accepts_name_or_ordinal() {
        let by_name: DifficultyClass = serde_json::from_str("\"difficult\"").unwrap();
        let by_ordinal: DifficultyClass = serde_json::from_str("3").unwrap();
        let spaced: DifficultyClass = serde_json::from_str("\"Very Difficult\"").unwrap();

        assert_eq!(by_name, DifficultyClass::Difficult);
        assert_eq!(by_ordinal, DifficultyClass::Difficult);
        assert_eq!(spaced, DifficultyClass::VeryDifficult);
        assert_eq!(spaced.ordinal(), 4);

        assert!(serde_json::from_str::<DifficultyClass>("7").is_err());
        assert!(serde_json::from_str::<DifficultyClass>("\"trivial\"").is_err());
    }

    #[test]
    fn test_milling_envelope_reads_axial_depth() {
        let json = r#"{
            "speed": { "min": 100.0, "optimal": 150.0, "max": 200.0 },
            "feed": { "min": 0.05, "optimal": 0.1, "max": 0.15 },
            "axial_depth": { "min": 0.5, "optimal": 1.5, "max": 2.5 },
            "radial_depth_percent": { "min": 20.0, "optimal": 30.0, "max": 40.0 }
        }"#;

        let envelope: OperationEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.depth, Some(Bounds::new(0.5, 1.5, 2.5)));

        let names: Vec<_> = envelope.fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["speed", "feed", "depth", "radial_depth_percent"]);
    }
}
