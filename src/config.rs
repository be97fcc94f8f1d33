//! Evaluator configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! gives the stock evaluator.
//!
//! ```toml
//! reference_coolant = "mist"
//! tool_life_window_min = [10.0, 40.0]
//!
//! [operations.milling]
//! speed_factor = 0.9
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Bounds, Operation};
use crate::handbook::KienzleReference;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Baseline envelope for one operation, at power factor 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationProfile {
    /// Multiplier on the Taylor-derived speeds
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f64,
    /// Depth of cut used when evaluating Taylor for this operation
    pub taylor_depth_mm: f64,
    pub feed: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_depth_percent: Option<Bounds>,
}

fn default_speed_factor() -> f64 {
    1.0
}

impl OperationProfile {
    fn turning() -> Self {
        Self {
            speed_factor: 1.0,
            taylor_depth_mm: 2.0,
            feed: Bounds::new(0.15, 0.25, 0.35),
            depth: Some(Bounds::new(1.0, 2.0, 3.0)),
            radial_depth_percent: None,
        }
    }

    fn milling() -> Self {
        Self {
            speed_factor: 1.0,
            taylor_depth_mm: 1.5,
            feed: Bounds::new(0.06, 0.10, 0.14),
            depth: Some(Bounds::new(0.5, 1.5, 2.5)),
            radial_depth_percent: Some(Bounds::new(20.0, 30.0, 40.0)),
        }
    }

    // Drill point geometry runs slower than an insert at the same life
    fn drilling() -> Self {
        Self {
            speed_factor: 0.6,
            taylor_depth_mm: 1.0,
            feed: Bounds::new(0.08, 0.15, 0.22),
            depth: None,
            radial_depth_percent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationProfiles {
    #[serde(default = "OperationProfile::turning")]
    pub turning: OperationProfile,
    #[serde(default = "OperationProfile::milling")]
    pub milling: OperationProfile,
    #[serde(default = "OperationProfile::drilling")]
    pub drilling: OperationProfile,
}

impl Default for OperationProfiles {
    fn default() -> Self {
        Self {
            turning: OperationProfile::turning(),
            milling: OperationProfile::milling(),
            drilling: OperationProfile::drilling(),
        }
    }
}

impl OperationProfiles {
    pub fn get(&self, operation: Operation) -> &OperationProfile {
        match operation {
            Operation::Turning => &self.turning,
            Operation::Milling => &self.milling,
            Operation::Drilling => &self.drilling,
        }
    }
}

/// Evaluator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Johnson-Cook room temperature (°C)
    pub room_temperature_c: f64,
    pub kienzle_reference_temperature_c: f64,
    pub kienzle_reference_speed_m_min: f64,

    /// Tool life the optimal speed is derived for (min)
    pub target_tool_life_min: f64,
    /// [shortest, longest] acceptable tool life; maps to [max, min] speed
    pub tool_life_window_min: [f64; 2],
    /// Cap on reported tool life (min)
    pub max_tool_life_min: f64,

    /// Coolant assumed when deriving envelopes
    pub reference_coolant: String,
    /// Relative optimal-speed deviation above which a stored envelope is flagged
    pub envelope_deviation_tolerance: f64,

    pub operations: OperationProfiles,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            room_temperature_c: 20.0,
            kienzle_reference_temperature_c: 20.0,
            kienzle_reference_speed_m_min: 100.0,
            target_tool_life_min: 20.0,
            tool_life_window_min: [15.0, 30.0],
            max_tool_life_min: 100_000.0,
            reference_coolant: "flood".to_string(),
            envelope_deviation_tolerance: 0.35,
            operations: OperationProfiles::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Load from a TOML file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded evaluator config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EvaluatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [shortest, longest] = self.tool_life_window_min;
        if !(shortest > 0.0 && shortest <= longest && longest.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "tool_life_window_min must be positive and ordered, got [{}, {}]",
                shortest, longest
            )));
        }
        if !(self.target_tool_life_min >= shortest && self.target_tool_life_min <= longest) {
            return Err(ConfigError::Invalid(format!(
                "target_tool_life_min {} lies outside the window [{}, {}]",
                self.target_tool_life_min, shortest, longest
            )));
        }
        if !(self.max_tool_life_min.is_finite() && self.max_tool_life_min > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_tool_life_min must be finite and positive, got {}",
                self.max_tool_life_min
            )));
        }
        if !(self.kienzle_reference_speed_m_min > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "kienzle_reference_speed_m_min must be positive, got {}",
                self.kienzle_reference_speed_m_min
            )));
        }
        if !(self.envelope_deviation_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "envelope_deviation_tolerance must be non-negative, got {}",
                self.envelope_deviation_tolerance
            )));
        }

        for operation in Operation::ALL {
            let profile = self.operations.get(operation);
            if !(profile.speed_factor > 0.0 && profile.taylor_depth_mm > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} profile needs positive speed_factor and taylor_depth_mm",
                    operation
                )));
            }
            let baselines = [Some(profile.feed), profile.depth, profile.radial_depth_percent];
            if baselines.iter().flatten().any(|b| !b.is_consistent()) {
                return Err(ConfigError::Invalid(format!(
                    "{} profile has an unordered baseline envelope",
                    operation
                )));
            }
        }

        Ok(())
    }

    pub fn kienzle_reference(&self) -> KienzleReference {
        KienzleReference {
            temperature_c: self.kienzle_reference_temperature_c,
            speed_m_min: self.kienzle_reference_speed_m_min,
        }
    }
}
