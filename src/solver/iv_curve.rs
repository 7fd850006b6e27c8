//! Current-voltage relations, generated or fitted.
//!
//! With `samples` the solver fits `I = g (V - E_rev)` by ordinary least
//! squares. Without them it generates the curve from a given conductance and
//! reversal potential, optionally rectifying.

use serde::Deserialize;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{
    ensure_finite, ensure_positive, ConfigKey, ExperimentalSample, RequestConfig, SeriesPoint,
    SolverId, SolverResult,
};
use crate::error::{Constraint, DomainReason, MembraneError, Result};

use super::Solver;

/// Default number of generated points.
pub const DEFAULT_IV_STEPS: usize = 50;

/// Default generated voltage range (mV).
pub const DEFAULT_VOLTAGE_RANGE: (f64, f64) = (-120.0, 60.0);

/// Voltage scale of the rectification sigmoid (mV).
const RECTIFICATION_SCALE: f64 = 20.0;

/// Names of the generator parameters, which cannot be mixed with `samples`.
const THEORETICAL_PARAMS: [&str; 5] = [
    "conductance",
    "reversal_potential",
    "voltage_min",
    "voltage_max",
    "rectification",
];

/// Voltage dependence of the generated conductance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rectification {
    #[default]
    None,
    /// Passes inward current more readily (Kir-like)
    Inward,
    /// Passes outward current more readily
    Outward,
}

impl Rectification {
    /// Effective conductance at voltage `v`.
    pub fn conductance(&self, g: f64, v: f64, reversal: f64) -> f64 {
        let x = (v - reversal) / RECTIFICATION_SCALE;
        match self {
            Rectification::None => g,
            Rectification::Inward => g * (1.0 + 0.5 * (-x).tanh()),
            Rectification::Outward => g * (1.0 + 0.5 * x.tanh()),
        }
    }
}

/// Ion selectivity suggested by a reversal potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selectivity {
    Potassium,
    Chloride,
    NonselectiveCation,
    Sodium,
}

impl Selectivity {
    pub fn from_reversal(e_rev: f64) -> Option<Self> {
        if (-95.0..=-75.0).contains(&e_rev) {
            Some(Selectivity::Potassium)
        } else if e_rev > -75.0 && e_rev <= -60.0 {
            Some(Selectivity::Chloride)
        } else if (-20.0..=20.0).contains(&e_rev) {
            Some(Selectivity::NonselectiveCation)
        } else if (50.0..=70.0).contains(&e_rev) {
            Some(Selectivity::Sodium)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Selectivity::Potassium => "potassium_selective",
            Selectivity::Chloride => "chloride_selective",
            Selectivity::NonselectiveCation => "nonselective_cation",
            Selectivity::Sodium => "sodium_selective",
        }
    }
}

/// Parameters of either mode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IvCurveParams {
    /// Conductance (nS)
    #[serde(default)]
    pub conductance: Option<f64>,
    /// Reversal potential (mV)
    #[serde(default)]
    pub reversal_potential: Option<f64>,
    #[serde(default)]
    pub voltage_min: Option<f64>,
    #[serde(default)]
    pub voltage_max: Option<f64>,
    #[serde(default)]
    pub rectification: Option<Rectification>,
    #[serde(default)]
    pub samples: Option<Vec<ExperimentalSample>>,
}

impl IvCurveParams {
    fn theoretical_param_present(&self) -> Option<&'static str> {
        let present = [
            self.conductance.is_some(),
            self.reversal_potential.is_some(),
            self.voltage_min.is_some(),
            self.voltage_max.is_some(),
            self.rectification.is_some(),
        ];
        THEORETICAL_PARAMS
            .iter()
            .zip(present)
            .find_map(|(name, set)| set.then_some(*name))
    }
}

/// Least-squares line through I-V samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Slope (nS)
    pub conductance: f64,
    /// Current at 0 mV (pA)
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    /// Ordinary least squares over the samples.
    pub fn fit(samples: &[ExperimentalSample]) -> Result<Self> {
        if samples.len() < 2 {
            return Err(MembraneError::TooFewPoints {
                subject: "samples".to_string(),
                required: 2,
                found: samples.len(),
            });
        }
        for (i, s) in samples.iter().enumerate() {
            s.validate(i)?;
        }

        let first = samples[0].voltage;
        if samples.iter().all(|s| s.voltage == first) {
            return Err(MembraneError::ZeroVariance {
                subject: "samples".to_string(),
            });
        }

        let n = samples.len() as f64;
        let mean_v = samples.iter().map(|s| s.voltage).sum::<f64>() / n;
        let mean_i = samples.iter().map(|s| s.current).sum::<f64>() / n;

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for s in samples {
            let dv = s.voltage - mean_v;
            let di = s.current - mean_i;
            sxx += dv * dv;
            sxy += dv * di;
            syy += di * di;
        }

        // Correlations at rounding level are a flat line, not a tiny slope
        let noise = f64::EPSILON * n;
        let flat_current = syy <= (noise * mean_i).powi(2);
        let flat = flat_current || sxy.abs() <= noise * (sxx * syy).sqrt();

        let conductance = if flat { 0.0 } else { sxy / sxx };
        let r_squared = if flat_current { 1.0 } else { sxy * sxy / (sxx * syy) };

        Ok(Self {
            conductance,
            intercept: mean_i - conductance * mean_v,
            r_squared,
        })
    }

    /// Voltage at which the fitted current is zero.
    pub fn reversal_potential(&self) -> Result<f64> {
        if self.conductance == 0.0 {
            return Err(MembraneError::undefined(
                "reversal_potential",
                DomainReason::ZeroSlope,
            ));
        }
        Ok(-self.intercept / self.conductance)
    }

    pub fn quality(&self) -> &'static str {
        if self.r_squared > 0.99 {
            "ohmic"
        } else if self.r_squared > 0.95 {
            "good"
        } else if self.r_squared > 0.90 {
            "moderate"
        } else {
            "poor"
        }
    }
}

fn selectivity_phrase(selectivity: Option<Selectivity>) -> &'static str {
    match selectivity {
        Some(Selectivity::Potassium) => "consistent with a K+ selective channel",
        Some(Selectivity::Chloride) => "consistent with a Cl- selective channel",
        Some(Selectivity::NonselectiveCation) => "consistent with a non-selective cation channel",
        Some(Selectivity::Sodium) => "consistent with a Na+ selective channel",
        None => "not characteristic of a single ion",
    }
}

/// Current-voltage relation of a conductance.
pub struct IvCurve;

impl IvCurve {
    fn theoretical(params: IvCurveParams, config: &RequestConfig) -> Result<SolverResult> {
        let g = ensure_positive(
            "conductance",
            params.conductance.ok_or_else(|| MembraneError::missing("conductance"))?,
        )?;
        let reversal = ensure_finite(
            "reversal_potential",
            params
                .reversal_potential
                .ok_or_else(|| MembraneError::missing("reversal_potential"))?,
        )?;
        let v_min = ensure_finite("voltage_min", params.voltage_min.unwrap_or(DEFAULT_VOLTAGE_RANGE.0))?;
        let v_max = ensure_finite("voltage_max", params.voltage_max.unwrap_or(DEFAULT_VOLTAGE_RANGE.1))?;
        if v_min >= v_max {
            return Err(MembraneError::invalid("voltage_min", Constraint::Below("voltage_max")));
        }
        let steps = config.step_count_or(DEFAULT_IV_STEPS)?;
        let rectification = params.rectification.unwrap_or_default();

        let series = (0..steps)
            .map(|i| {
                let v = v_min + (v_max - v_min) * i as f64 / (steps - 1) as f64;
                let g_eff = rectification.conductance(g, v, reversal);
                SeriesPoint::new(v, g_eff * (v - reversal))
            })
            .collect();

        let selectivity = Selectivity::from_reversal(reversal);
        let mut result = SolverResult::new(Self::ID)
            .with_output("conductance", g, "nS")
            .with_output("reversal_potential", reversal, "mV")
            .with_interpretation(format!(
                "Generated I-V curve for g = {:.3} nS from {:.0} to {:.0} mV; E_rev = {:.1} mV is {}.",
                g,
                v_min,
                v_max,
                reversal,
                selectivity_phrase(selectivity)
            ))
            .with_series(series);
        if rectification != Rectification::None {
            let label = match rectification {
                Rectification::Inward => "inward",
                _ => "outward",
            };
            result = result.with_label("rectification", label);
        }
        if let Some(s) = selectivity {
            result = result.with_classification(s.as_str());
        }
        Ok(result)
    }

    fn experimental(samples: Vec<ExperimentalSample>) -> Result<SolverResult> {
        let fit = LinearFit::fit(&samples)?;
        let reversal = fit.reversal_potential()?;
        let selectivity = Selectivity::from_reversal(reversal);
        log::debug!(
            "I-V fit over {} samples: g = {:.4} nS, E_rev = {:.2} mV, R² = {:.4}",
            samples.len(),
            fit.conductance,
            reversal,
            fit.r_squared
        );

        let series = samples
            .iter()
            .map(|s| SeriesPoint::new(s.voltage, s.current))
            .collect();

        let mut result = SolverResult::new(Self::ID)
            .with_output("conductance", fit.conductance, "nS")
            .with_output("reversal_potential", reversal, "mV")
            .with_output("r_squared", fit.r_squared, "")
            .with_label("fit_quality", fit.quality())
            .with_interpretation(format!(
                "Linear fit gives g = {:.3} nS and E_rev = {:.1} mV (R² = {:.4}, {}); the reversal potential is {}.",
                fit.conductance,
                reversal,
                fit.r_squared,
                fit.quality(),
                selectivity_phrase(selectivity)
            ))
            .with_series(series);
        if let Some(s) = selectivity {
            result = result.with_classification(s.as_str());
        }
        Ok(result)
    }
}

impl Solver for IvCurve {
    const ID: SolverId = SolverId::IvCurve;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::optional("conductance", ParamKind::Number),
            ParamSpec::optional("reversal_potential", ParamKind::Number),
            ParamSpec::optional("voltage_min", ParamKind::Number),
            ParamSpec::optional("voltage_max", ParamKind::Number),
            ParamSpec::optional("rectification", ParamKind::String),
            ParamSpec::optional("samples", ParamKind::Array),
        ],
        config: &[ConfigKey::StepCount],
    };
    type Params = IvCurveParams;

    fn solve(mut params: IvCurveParams, config: &RequestConfig) -> Result<SolverResult> {
        match params.samples.take() {
            Some(samples) => {
                if let Some(name) = params.theoretical_param_present() {
                    return Err(MembraneError::invalid("samples", Constraint::ExclusiveWith(name)));
                }
                Self::experimental(samples)
            }
            None => Self::theoretical(params, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_abs_diff_eq;

    fn samples(points: &[(f64, f64)]) -> Vec<ExperimentalSample> {
        points.iter().map(|&(v, i)| ExperimentalSample::new(v, i)).collect()
    }

    fn fit(points: &[(f64, f64)]) -> Result<SolverResult> {
        let params = IvCurveParams {
            samples: Some(samples(points)),
            ..Default::default()
        };
        IvCurve::solve(params, &RequestConfig::new())
    }

    #[test]
    fn test_fit_recovers_line() {
        let result = fit(&[(-60.0, -10.0), (-40.0, -6.0), (-20.0, -2.0), (0.0, 2.0)]).unwrap();
        assert_abs_diff_eq!(result.output("conductance").unwrap().value, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(result.output("reversal_potential").unwrap().value, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.output("r_squared").unwrap().value, 1.0, epsilon = 1e-12);
        assert_eq!(result.label("fit_quality"), Some("ohmic"));
        assert_eq!(result.classification(), Some("nonselective_cation"));
        // Series keeps input order
        assert_eq!(result.series().unwrap()[0], SeriesPoint::new(-60.0, -10.0));
    }

    #[test]
    fn test_fit_potassium_channel() {
        // I = 1.5 (V + 85)
        let points: Vec<_> = [-120.0, -90.0, -60.0, -30.0]
            .iter()
            .map(|&v| (v, 1.5 * (v + 85.0)))
            .collect();
        let result = fit(&points).unwrap();
        assert_eq!(result.classification(), Some("potassium_selective"));
    }

    #[test]
    fn test_too_few_points() {
        let err = fit(&[(-60.0, -10.0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_zero_variance() {
        let err = fit(&[(-40.0, -1.0), (-40.0, 3.0), (-40.0, 2.0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_flat_line_has_no_reversal() {
        let err = fit(&[(-40.0, 3.0), (0.0, 3.0), (40.0, 3.0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainError);
    }

    #[test]
    fn test_rounding_noise_is_a_flat_line() {
        // 0.1 is not representable, so the deviations from the mean are not exactly zero
        let points = [(-60.0, 0.1), (-40.0, 0.1), (-10.0, 0.1)];
        let line = LinearFit::fit(&samples(&points)).unwrap();
        assert_eq!(line.conductance, 0.0);
        assert_abs_diff_eq!(line.intercept, 0.1, epsilon = 1e-12);

        let err = fit(&points).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainError);
        assert!(err.to_string().contains("reversal_potential"));
    }

    #[test]
    fn test_small_real_slope_is_kept() {
        let line = LinearFit::fit(&samples(&[(-60.0, 0.1), (0.0, 0.1001), (60.0, 0.1002)])).unwrap();
        assert_abs_diff_eq!(line.conductance, 0.1 / 60.0 * 1e-3, epsilon = 1e-12);
        assert!(line.reversal_potential().is_ok());
    }

    #[test]
    fn test_theoretical_series() {
        let params = IvCurveParams {
            conductance: Some(2.0),
            reversal_potential: Some(60.0),
            ..Default::default()
        };
        let result = IvCurve::solve(params, &RequestConfig::new()).unwrap();
        let series = result.series().unwrap();
        assert_eq!(series.len(), DEFAULT_IV_STEPS);
        assert_abs_diff_eq!(series[0].x, -120.0);
        assert_abs_diff_eq!(series[0].y, 2.0 * (-180.0));
        assert_abs_diff_eq!(series[DEFAULT_IV_STEPS - 1].y, 0.0, epsilon = 1e-9);
        assert_eq!(result.classification(), Some("sodium_selective"));
    }

    #[test]
    fn test_inward_rectifier_passes_more_inward_current() {
        let r = Rectification::Inward;
        let below = r.conductance(1.0, -120.0, -80.0);
        let above = r.conductance(1.0, -40.0, -80.0);
        assert!(below > 1.0 && above < 1.0);
        assert_abs_diff_eq!(r.conductance(1.0, -80.0, -80.0), 1.0);
    }

    #[test]
    fn test_theoretical_requires_conductance() {
        let params = IvCurveParams {
            reversal_potential: Some(0.0),
            ..Default::default()
        };
        let err = IvCurve::solve(params, &RequestConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientInput);
    }

    #[test]
    fn test_samples_exclude_generator_params() {
        let params = IvCurveParams {
            conductance: Some(1.0),
            samples: Some(samples(&[(-60.0, -10.0), (0.0, 2.0)])),
            ..Default::default()
        };
        let err = IvCurve::solve(params, &RequestConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("conductance"));
    }
}
