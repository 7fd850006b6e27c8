//! Osmolarity and tonicity classification.

use serde::Deserialize;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{ensure_positive, ConfigKey, RequestConfig, SolverId, SolverResult, SoluteSet};
use crate::error::{MembraneError, Result};
use crate::PLASMA_OSMOLARITY;

use super::volume::equilibrium_volume;
use super::{Relation, Solver};

/// Solute sets on both sides of the membrane.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompartmentParams {
    pub intracellular: SoluteSet,
    pub extracellular: SoluteSet,
}

impl CompartmentParams {
    /// Validate both sets and require at least one solute.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.intracellular.is_empty() && self.extracellular.is_empty() {
            return Err(MembraneError::empty("solutes"));
        }
        self.intracellular.validate("intracellular")?;
        self.extracellular.validate("extracellular")
    }

    /// Effective (intracellular, extracellular) osmolarities after validation.
    pub(crate) fn effective_osmolarities(&self) -> Result<(f64, f64)> {
        self.validate()?;
        Ok((
            self.intracellular.effective_osmolarity(),
            self.extracellular.effective_osmolarity(),
        ))
    }
}

fn osmotic_class(relation: Relation) -> &'static str {
    match relation {
        Relation::Iso => "isosmotic",
        Relation::Above => "hyperosmotic",
        Relation::Below => "hypoosmotic",
    }
}

fn tonicity_class(relation: Relation) -> &'static str {
    match relation {
        Relation::Iso => "isotonic",
        Relation::Above => "hypertonic",
        Relation::Below => "hypotonic",
    }
}

/// Position of the extracellular solution relative to the cell, with the
/// iso band taken as a fraction of the extracellular value.
fn compare(extracellular: f64, intracellular: f64) -> Relation {
    Relation::within(extracellular, intracellular, extracellular)
}

/// Expected behavior of a cell placed in the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellResponse {
    Equilibrium,
    Shrinking,
    Swelling,
    Lysis,
}

impl CellResponse {
    /// Response to a medium in `relation` to the cell. `predicted_volume` is
    /// `None` when no impermeant solute is outside, so water keeps entering.
    pub fn predict(relation: Relation, predicted_volume: Option<f64>, lysis_threshold: f64) -> Self {
        match relation {
            Relation::Iso => CellResponse::Equilibrium,
            Relation::Above => CellResponse::Shrinking,
            Relation::Below => match predicted_volume {
                Some(v) if v < lysis_threshold => CellResponse::Swelling,
                _ => CellResponse::Lysis,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellResponse::Equilibrium => "equilibrium",
            CellResponse::Shrinking => "shrinking",
            CellResponse::Swelling => "swelling",
            CellResponse::Lysis => "lysis",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            CellResponse::Equilibrium => "no net water movement, the cell keeps its volume",
            CellResponse::Shrinking => "water leaves the cell and it shrinks",
            CellResponse::Swelling => "water enters the cell and it swells",
            CellResponse::Lysis => "water enters until the membrane ruptures (lysis)",
        }
    }
}

/// Compares intracellular and extracellular solute sets.
pub struct OsmolarityComparison;

impl Solver for OsmolarityComparison {
    const ID: SolverId = SolverId::OsmolarityComparison;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("intracellular", ParamKind::Object),
            ParamSpec::required("extracellular", ParamKind::Object),
        ],
        config: &[
            ConfigKey::Temperature,
            ConfigKey::LysisThreshold,
            ConfigKey::InactiveFraction,
        ],
    };
    type Params = CompartmentParams;

    fn solve(params: CompartmentParams, config: &RequestConfig) -> Result<SolverResult> {
        params.validate()?;
        let temperature = config.temperature()?;
        let inactive_fraction = config.inactive_fraction()?;
        let lysis_threshold = config.lysis_threshold()?;

        let total_in = params.intracellular.total_osmolarity();
        let total_out = params.extracellular.total_osmolarity();
        let eff_in = params.intracellular.effective_osmolarity();
        let eff_out = params.extracellular.effective_osmolarity();

        let osmotic = compare(total_out, total_in);
        let tonic = compare(eff_out, eff_in);
        let predicted_volume =
            (eff_out > 0.0).then(|| equilibrium_volume(inactive_fraction, eff_in, eff_out));
        let response = CellResponse::predict(tonic, predicted_volume, lysis_threshold);
        log::debug!(
            "osmolarity comparison: total {:.1}/{:.1}, effective {:.1}/{:.1}",
            total_in,
            total_out,
            eff_in,
            eff_out
        );

        let mut result = SolverResult::new(Self::ID)
            .with_output("intracellular_osmolarity", total_in, "mOsm/L")
            .with_output("extracellular_osmolarity", total_out, "mOsm/L")
            .with_output("intracellular_effective_osmolarity", eff_in, "mOsm/L")
            .with_output("extracellular_effective_osmolarity", eff_out, "mOsm/L")
            .with_output("temperature", temperature, "K");

        if let Some(v) = predicted_volume {
            result = result
                .with_output("effective_osmolarity_ratio", eff_in / eff_out, "ratio")
                .with_output("predicted_volume", v, "fraction");
        }

        let interpretation = format!(
            "The extracellular solution is {} ({:.1} vs {:.1} mOsm/L) and {} ({:.1} vs {:.1} mOsm/L effective): {}.",
            osmotic_class(osmotic),
            total_out,
            total_in,
            tonicity_class(tonic),
            eff_out,
            eff_in,
            response.describe()
        );

        Ok(result
            .with_classification(tonicity_class(tonic))
            .with_label("osmotic_class", osmotic_class(osmotic))
            .with_label("tonicity", tonicity_class(tonic))
            .with_label("cell_response", response.as_str())
            .with_interpretation(interpretation))
    }
}

/// A single medium and the reference it is judged against.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TonicityParams {
    pub extracellular: SoluteSet,
    /// Intracellular osmolarity (mOsm/L), defaults to plasma
    #[serde(default)]
    pub reference_osmolarity: Option<f64>,
}

/// Relative deviation bands for the severity label.
const MILD_DEVIATION: f64 = 0.12;
const MODERATE_DEVIATION: f64 = 0.30;

fn severity(relation: Relation, deviation: f64) -> &'static str {
    if relation == Relation::Iso {
        "none"
    } else if deviation.abs() < MILD_DEVIATION {
        "mild"
    } else if deviation.abs() < MODERATE_DEVIATION {
        "moderate"
    } else {
        "severe"
    }
}

/// Classifies one medium against a reference intracellular osmolarity.
pub struct Tonicity;

impl Solver for Tonicity {
    const ID: SolverId = SolverId::Tonicity;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("extracellular", ParamKind::Object),
            ParamSpec::optional("reference_osmolarity", ParamKind::Number),
        ],
        config: &[ConfigKey::LysisThreshold, ConfigKey::InactiveFraction],
    };
    type Params = TonicityParams;

    fn solve(params: TonicityParams, config: &RequestConfig) -> Result<SolverResult> {
        if params.extracellular.is_empty() {
            return Err(MembraneError::empty("extracellular"));
        }
        params.extracellular.validate("extracellular")?;
        let reference = ensure_positive(
            "reference_osmolarity",
            params.reference_osmolarity.unwrap_or(PLASMA_OSMOLARITY),
        )?;
        let inactive_fraction = config.inactive_fraction()?;
        let lysis_threshold = config.lysis_threshold()?;

        let total = params.extracellular.total_osmolarity();
        let effective = params.extracellular.effective_osmolarity();
        let deviation = (effective - reference) / reference;
        let tonic = compare(effective, reference);
        let predicted_volume =
            (effective > 0.0).then(|| equilibrium_volume(inactive_fraction, reference, effective));
        let response = CellResponse::predict(tonic, predicted_volume, lysis_threshold);
        let severity = severity(tonic, deviation);

        let mut result = SolverResult::new(Self::ID)
            .with_output("total_osmolarity", total, "mOsm/L")
            .with_output("effective_osmolarity", effective, "mOsm/L")
            .with_output("reference_osmolarity", reference, "mOsm/L")
            .with_output("deviation", deviation * 100.0, "%");
        if let Some(v) = predicted_volume {
            result = result.with_output("predicted_volume", v, "fraction");
        }

        let interpretation = if tonic == Relation::Iso {
            format!(
                "The medium is isotonic ({:.1} mOsm/L effective against {:.1}): {}.",
                effective,
                reference,
                response.describe()
            )
        } else {
            format!(
                "The medium is {} {} ({:.1} mOsm/L effective, {:+.1}% from {:.1}): {}.",
                severity,
                tonicity_class(tonic),
                effective,
                deviation * 100.0,
                reference,
                response.describe()
            )
        };

        Ok(result
            .with_classification(tonicity_class(tonic))
            .with_label("osmotic_class", osmotic_class(compare(total, reference)))
            .with_label("severity", severity)
            .with_label("cell_response", response.as_str())
            .with_interpretation(interpretation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Solute;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    fn set(solutes: Vec<Solute>) -> SoluteSet {
        solutes.into_iter().collect()
    }

    #[test]
    fn test_equal_nacl_is_isotonic() {
        let params = CompartmentParams {
            intracellular: set(vec![Solute::new("NaCl", 150.0)]),
            extracellular: set(vec![Solute::new("NaCl", 150.0)]),
        };
        let result = OsmolarityComparison::solve(params, &RequestConfig::new()).unwrap();
        assert_eq!(result.label("osmotic_class"), Some("isosmotic"));
        assert_eq!(result.classification(), Some("isotonic"));
        assert_eq!(result.label("cell_response"), Some("equilibrium"));
        assert_relative_eq!(result.output("predicted_volume").unwrap().value, 1.0);
    }

    #[test]
    fn test_penetrating_solute_is_hyperosmotic_but_hypotonic() {
        // Urea raises the total but not the effective osmolarity outside
        let params = CompartmentParams {
            intracellular: set(vec![Solute::new("KCl", 150.0).with_dissociation(2)]),
            extracellular: set(vec![
                Solute::new("NaCl", 100.0).with_dissociation(2),
                Solute::new("Urea", 300.0).penetrating(),
            ]),
        };
        let result = OsmolarityComparison::solve(params, &RequestConfig::new()).unwrap();
        assert_eq!(result.label("osmotic_class"), Some("hyperosmotic"));
        assert_eq!(result.label("tonicity"), Some("hypotonic"));
        // V = 0.3 + 0.7 * 300/200 = 1.35, below the default 1.4 threshold
        assert_eq!(result.label("cell_response"), Some("swelling"));
    }

    #[test]
    fn test_lysis_when_no_impermeant_outside() {
        let params = CompartmentParams {
            intracellular: set(vec![Solute::new("KCl", 150.0)]),
            extracellular: set(vec![Solute::new("Glycerol", 300.0).penetrating()]),
        };
        let result = OsmolarityComparison::solve(params, &RequestConfig::new()).unwrap();
        assert_eq!(result.label("cell_response"), Some("lysis"));
        assert!(result.output("predicted_volume").is_none());
    }

    #[test]
    fn test_hypertonic_shrinks() {
        let params = CompartmentParams {
            intracellular: set(vec![Solute::new("KCl", 150.0)]),
            extracellular: set(vec![Solute::new("NaCl", 200.0)]),
        };
        let result = OsmolarityComparison::solve(params, &RequestConfig::new()).unwrap();
        assert_eq!(result.classification(), Some("hypertonic"));
        assert_eq!(result.label("cell_response"), Some("shrinking"));
    }

    fn sugar(intra: f64, extra: f64) -> CompartmentParams {
        CompartmentParams {
            intracellular: set(vec![Solute::new("Sucrose", intra)]),
            extracellular: set(vec![Solute::new("Sucrose", extra)]),
        }
    }

    #[test]
    fn test_iso_band_is_relative_to_extracellular() {
        // int/ext = 0.9801, inside 1 ± 2 %
        let result = OsmolarityComparison::solve(sugar(100.0, 102.03), &RequestConfig::new()).unwrap();
        assert_eq!(result.label("osmotic_class"), Some("isosmotic"));
        assert_eq!(result.classification(), Some("isotonic"));

        let result = OsmolarityComparison::solve(sugar(100.0, 102.1), &RequestConfig::new()).unwrap();
        assert_eq!(result.label("osmotic_class"), Some("hyperosmotic"));
        assert_eq!(result.classification(), Some("hypertonic"));
    }

    #[test]
    fn test_iso_band_lower_edge() {
        // int/ext = 1.01999
        let result = OsmolarityComparison::solve(sugar(100.0, 98.04), &RequestConfig::new()).unwrap();
        assert_eq!(result.classification(), Some("isotonic"));
        assert_eq!(result.label("cell_response"), Some("equilibrium"));

        let result = OsmolarityComparison::solve(sugar(100.0, 97.9), &RequestConfig::new()).unwrap();
        assert_eq!(result.label("osmotic_class"), Some("hypoosmotic"));
        assert_eq!(result.classification(), Some("hypotonic"));
    }

    #[test]
    fn test_lysis_threshold_moves_response() {
        // V = 0.3 + 0.7 * 300/200 = 1.35
        let config = RequestConfig::new().with_lysis_threshold(1.3);
        let result = OsmolarityComparison::solve(sugar(300.0, 200.0), &config).unwrap();
        assert_eq!(result.label("cell_response"), Some("lysis"));

        let result = OsmolarityComparison::solve(sugar(300.0, 200.0), &RequestConfig::new()).unwrap();
        assert_eq!(result.label("cell_response"), Some("swelling"));
    }

    #[test]
    fn test_cell_response_prediction() {
        assert_eq!(CellResponse::predict(Relation::Iso, Some(1.0), 1.4), CellResponse::Equilibrium);
        assert_eq!(CellResponse::predict(Relation::Above, Some(0.8), 1.4), CellResponse::Shrinking);
        assert_eq!(CellResponse::predict(Relation::Below, Some(1.2), 1.4), CellResponse::Swelling);
        assert_eq!(CellResponse::predict(Relation::Below, Some(1.4), 1.4), CellResponse::Lysis);
        assert_eq!(CellResponse::predict(Relation::Below, None, 1.4), CellResponse::Lysis);
    }

    #[test]
    fn test_comparison_failures() {
        let err = OsmolarityComparison::solve(CompartmentParams::default(), &RequestConfig::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientInput);

        let params = CompartmentParams {
            intracellular: set(vec![Solute::new("KCl", -5.0)]),
            extracellular: SoluteSet::new(),
        };
        let err = OsmolarityComparison::solve(params, &RequestConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_tonicity_severity() {
        let medium = |mosm: f64| TonicityParams {
            extracellular: set(vec![Solute::new("NaCl", mosm / 2.0).with_dissociation(2)]),
            reference_osmolarity: None,
        };

        let iso = Tonicity::solve(medium(290.0), &RequestConfig::new()).unwrap();
        assert_eq!(iso.classification(), Some("isotonic"));
        assert_eq!(iso.label("severity"), Some("none"));

        let mild = Tonicity::solve(medium(310.0), &RequestConfig::new()).unwrap();
        assert_eq!(mild.classification(), Some("hypertonic"));
        assert_eq!(mild.label("severity"), Some("mild"));

        let severe = Tonicity::solve(medium(150.0), &RequestConfig::new()).unwrap();
        assert_eq!(severe.classification(), Some("hypotonic"));
        assert_eq!(severe.label("severity"), Some("severe"));
        // 0.3 + 0.7 * 285/150 = 1.63
        assert_eq!(severe.label("cell_response"), Some("lysis"));
    }

    #[test]
    fn test_tonicity_reference_must_be_positive() {
        let params = TonicityParams {
            extracellular: set(vec![Solute::new("NaCl", 150.0)]),
            reference_osmolarity: Some(0.0),
        };
        assert!(Tonicity::solve(params, &RequestConfig::new()).is_err());
    }
}
