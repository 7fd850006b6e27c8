//! Solver requests and per-request configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Constraint, MembraneError, Result};
use crate::PHYSIOLOGICAL_TEMPERATURE;

use super::{ensure_non_negative, ensure_positive};

/// Default lysis threshold as a multiple of the initial volume.
pub const DEFAULT_LYSIS_THRESHOLD: f64 = 1.4;

/// Default osmotically inactive volume fraction.
pub const DEFAULT_INACTIVE_FRACTION: f64 = 0.3;

/// Default simulated duration for volume dynamics (s).
pub const DEFAULT_DURATION: f64 = 30.0;

/// Default osmotic relaxation time constant (s).
pub const DEFAULT_TIME_CONSTANT: f64 = 10.0;

/// Largest number of generated samples a request may ask for.
pub const MAX_STEP_COUNT: usize = 10_000;

/// Identifier of every solver in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverId {
    OsmolarityComparison,
    Tonicity,
    CellVolume,
    VolumeDynamics,
    Nernst,
    Goldman,
    IvCurve,
    SingleChannel,
}

impl SolverId {
    /// Every registered solver, in documentation order.
    pub const ALL: [SolverId; 8] = [
        SolverId::OsmolarityComparison,
        SolverId::Tonicity,
        SolverId::CellVolume,
        SolverId::VolumeDynamics,
        SolverId::Nernst,
        SolverId::Goldman,
        SolverId::IvCurve,
        SolverId::SingleChannel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverId::OsmolarityComparison => "osmolarity_comparison",
            SolverId::Tonicity => "tonicity",
            SolverId::CellVolume => "cell_volume",
            SolverId::VolumeDynamics => "volume_dynamics",
            SolverId::Nernst => "nernst",
            SolverId::Goldman => "goldman",
            SolverId::IvCurve => "iv_curve",
            SolverId::SingleChannel => "single_channel",
        }
    }
}

impl fmt::Display for SolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverId {
    type Err = MembraneError;

    fn from_str(s: &str) -> Result<Self> {
        SolverId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| MembraneError::UnknownSolver { id: s.to_string() })
    }
}

/// Language of error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

/// Name of a recognized configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Temperature,
    Duration,
    StepCount,
    LysisThreshold,
    AmplitudeThreshold,
    TimeConstant,
    InactiveFraction,
    Locale,
}

impl ConfigKey {
    /// Key as spelled in request JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Temperature => "temperature_K",
            ConfigKey::Duration => "duration_s",
            ConfigKey::StepCount => "step_count",
            ConfigKey::LysisThreshold => "lysis_threshold",
            ConfigKey::AmplitudeThreshold => "amplitude_threshold",
            ConfigKey::TimeConstant => "time_constant_s",
            ConfigKey::InactiveFraction => "inactive_fraction",
            ConfigKey::Locale => "locale",
        }
    }
}

impl Serialize for ConfigKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Optional per-request settings. Absent values fall back to the
/// documented defaults of the solver that reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Absolute temperature (K), default 310
    #[serde(rename = "temperature_K", default, skip_serializing_if = "Option::is_none")]
    pub temperature_k: Option<f64>,
    /// Simulated duration (s), default 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    /// Number of generated samples, default depends on the solver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_count: Option<usize>,
    /// Relative volume at which a cell lyses, default 1.4
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lysis_threshold: Option<f64>,
    /// Open/closed current threshold (pA), default half the open amplitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_threshold: Option<f64>,
    /// Osmotic relaxation time constant (s), default 10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_constant_s: Option<f64>,
    /// Osmotically inactive volume fraction, default 0.3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_fraction: Option<f64>,
    /// Language of error messages, default English
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
}

impl RequestConfig {
    /// Create a configuration with every option at its default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, kelvin: f64) -> Self {
        self.temperature_k = Some(kelvin);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_s = Some(seconds);
        self
    }

    pub fn with_step_count(mut self, steps: usize) -> Self {
        self.step_count = Some(steps);
        self
    }

    pub fn with_lysis_threshold(mut self, threshold: f64) -> Self {
        self.lysis_threshold = Some(threshold);
        self
    }

    pub fn with_amplitude_threshold(mut self, threshold: f64) -> Self {
        self.amplitude_threshold = Some(threshold);
        self
    }

    pub fn with_time_constant(mut self, seconds: f64) -> Self {
        self.time_constant_s = Some(seconds);
        self
    }

    pub fn with_inactive_fraction(mut self, fraction: f64) -> Self {
        self.inactive_fraction = Some(fraction);
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Keys explicitly set in this configuration.
    pub fn present_keys(&self) -> Vec<ConfigKey> {
        let mut keys = Vec::new();
        if self.temperature_k.is_some() {
            keys.push(ConfigKey::Temperature);
        }
        if self.duration_s.is_some() {
            keys.push(ConfigKey::Duration);
        }
        if self.step_count.is_some() {
            keys.push(ConfigKey::StepCount);
        }
        if self.lysis_threshold.is_some() {
            keys.push(ConfigKey::LysisThreshold);
        }
        if self.amplitude_threshold.is_some() {
            keys.push(ConfigKey::AmplitudeThreshold);
        }
        if self.time_constant_s.is_some() {
            keys.push(ConfigKey::TimeConstant);
        }
        if self.inactive_fraction.is_some() {
            keys.push(ConfigKey::InactiveFraction);
        }
        if self.locale.is_some() {
            keys.push(ConfigKey::Locale);
        }
        keys
    }

    pub fn locale(&self) -> Locale {
        self.locale.unwrap_or_default()
    }

    /// Temperature in kelvin, validated > 0.
    pub fn temperature(&self) -> Result<f64> {
        ensure_positive(
            ConfigKey::Temperature.as_str(),
            self.temperature_k.unwrap_or(PHYSIOLOGICAL_TEMPERATURE),
        )
    }

    /// Duration in seconds, validated > 0.
    pub fn duration(&self) -> Result<f64> {
        ensure_positive(ConfigKey::Duration.as_str(), self.duration_s.unwrap_or(DEFAULT_DURATION))
    }

    /// Time constant in seconds, validated > 0.
    pub fn time_constant(&self) -> Result<f64> {
        ensure_positive(
            ConfigKey::TimeConstant.as_str(),
            self.time_constant_s.unwrap_or(DEFAULT_TIME_CONSTANT),
        )
    }

    /// Number of samples, validated in [2, MAX_STEP_COUNT].
    pub fn step_count_or(&self, default: usize) -> Result<usize> {
        let steps = self.step_count.unwrap_or(default);
        let key = ConfigKey::StepCount.as_str();
        if steps < 2 {
            return Err(MembraneError::invalid(key, Constraint::AtLeast(2)));
        }
        if steps > MAX_STEP_COUNT {
            return Err(MembraneError::invalid(key, Constraint::AtMost(MAX_STEP_COUNT)));
        }
        Ok(steps)
    }

    /// Lysis threshold, validated > 1.
    pub fn lysis_threshold(&self) -> Result<f64> {
        let key = ConfigKey::LysisThreshold.as_str();
        let threshold = ensure_positive(key, self.lysis_threshold.unwrap_or(DEFAULT_LYSIS_THRESHOLD))?;
        if threshold <= 1.0 {
            return Err(MembraneError::invalid(key, Constraint::GreaterThanOne));
        }
        Ok(threshold)
    }

    /// Inactive volume fraction, validated in [0, 1).
    pub fn inactive_fraction(&self) -> Result<f64> {
        let key = ConfigKey::InactiveFraction.as_str();
        let b = ensure_non_negative(key, self.inactive_fraction.unwrap_or(DEFAULT_INACTIVE_FRACTION))?;
        if b >= 1.0 {
            return Err(MembraneError::invalid(key, Constraint::FractionBelowOne));
        }
        Ok(b)
    }

    /// Explicit amplitude threshold (pA), validated >= 0 when present.
    pub fn amplitude_threshold(&self) -> Result<Option<f64>> {
        self.amplitude_threshold
            .map(|t| ensure_non_negative(ConfigKey::AmplitudeThreshold.as_str(), t))
            .transpose()
    }
}

/// A named request: raw parameters plus configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverRequest {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub config: RequestConfig,
}

impl SolverRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse a request from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
