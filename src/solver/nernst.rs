//! Nernst equilibrium potentials.

use serde::Deserialize;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{validate_ion_table, ConfigKey, IonSpecies, RequestConfig, SeriesPoint, SolverId, SolverResult};
use crate::error::{DomainReason, MembraneError, Result};
use crate::{thermal_voltage_mv, RESTING_POTENTIAL};

use super::Solver;

/// Half-width of the band around the resting potential counted as "near rest" (mV).
pub const REST_BAND: f64 = 2.0;

/// Effect of opening a channel for the ion on a cell at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestingEffect {
    Depolarizing,
    Hyperpolarizing,
    NearRest,
}

impl RestingEffect {
    pub fn of(potential: f64) -> Self {
        if potential > RESTING_POTENTIAL + REST_BAND {
            RestingEffect::Depolarizing
        } else if potential < RESTING_POTENTIAL - REST_BAND {
            RestingEffect::Hyperpolarizing
        } else {
            RestingEffect::NearRest
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestingEffect::Depolarizing => "depolarizing",
            RestingEffect::Hyperpolarizing => "hyperpolarizing",
            RestingEffect::NearRest => "near_rest",
        }
    }
}

/// Ions whose equilibrium potentials are requested. Listing the preset
/// symbols alone compares the typical gradients of every common ion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NernstParams {
    pub ions: Vec<IonSpecies>,
}

/// Equilibrium potential (mV) of one ion at `temperature` (K).
///
/// Both concentrations must be positive.
pub fn equilibrium_potential(ion: &IonSpecies, temperature: f64) -> Result<f64> {
    if !ion.has_defined_gradient() {
        return Err(MembraneError::undefined(
            ion.symbol.as_str(),
            DomainReason::ZeroConcentration,
        ));
    }
    Ok(thermal_voltage_mv(temperature) / ion.valence as f64
        * (ion.extracellular / ion.intracellular).ln())
}

/// Per-ion Nernst potentials.
pub struct Nernst;

impl Solver for Nernst {
    const ID: SolverId = SolverId::Nernst;
    const SCHEMA: Schema = Schema {
        params: &[ParamSpec::required("ions", ParamKind::Array)],
        config: &[ConfigKey::Temperature],
    };
    type Params = NernstParams;

    fn solve(params: NernstParams, config: &RequestConfig) -> Result<SolverResult> {
        validate_ion_table(&params.ions)?;
        let temperature = config.temperature()?;

        let mut result = SolverResult::new(Self::ID);
        let mut series = Vec::with_capacity(params.ions.len());
        let mut lines = Vec::with_capacity(params.ions.len());
        let mut effects = Vec::with_capacity(params.ions.len());

        for (i, ion) in params.ions.iter().enumerate() {
            let potential = equilibrium_potential(ion, temperature)?;
            let effect = RestingEffect::of(potential);
            log::trace!("E_{} = {:.2} mV at {} K", ion.symbol, potential, temperature);

            result = result
                .with_output(format!("E_{}", ion.symbol), potential, "mV")
                .with_label(ion.symbol.as_str(), effect.as_str());
            series.push(SeriesPoint::new(i as f64, potential));
            lines.push(format!(
                "E_{} = {:.1} mV ({})",
                ion.symbol,
                potential,
                effect.as_str().replace('_', " ")
            ));
            effects.push(effect);
        }

        if let [effect] = effects.as_slice() {
            result = result.with_classification(effect.as_str());
        }

        Ok(result
            .with_interpretation(format!(
                "{}, relative to a resting potential of {:.0} mV.",
                lines.join("; "),
                RESTING_POTENTIAL
            ))
            .with_series(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::PHYSIOLOGICAL_TEMPERATURE;
    use approx::assert_abs_diff_eq;

    fn solve(ions: Vec<IonSpecies>) -> Result<SolverResult> {
        Nernst::solve(NernstParams { ions }, &RequestConfig::new())
    }

    #[test]
    fn test_potassium_potential() {
        let result = solve(vec![IonSpecies::new("K", 140.0, 5.0, 1)]).unwrap();
        let e_k = result.output("E_K").unwrap();
        assert_abs_diff_eq!(e_k.value, -89.0, epsilon = 0.1);
        assert_eq!(e_k.unit, "mV");
        assert_eq!(result.classification(), Some("hyperpolarizing"));
    }

    #[test]
    fn test_equal_concentrations_give_zero() {
        for (symbol, conc, z) in [("Na", 145.0, 1), ("Ca", 2.0, 2), ("Cl", 110.0, -1)] {
            let ion = IonSpecies::new(symbol, conc, conc, z);
            assert_abs_diff_eq!(
                equilibrium_potential(&ion, PHYSIOLOGICAL_TEMPERATURE).unwrap(),
                0.0
            );
        }
    }

    #[test]
    fn test_divalent_halves_potential() {
        let mono = IonSpecies::new("X", 1.0, 10.0, 1);
        let di = IonSpecies::new("Y", 1.0, 10.0, 2);
        let t = PHYSIOLOGICAL_TEMPERATURE;
        assert_abs_diff_eq!(
            equilibrium_potential(&mono, t).unwrap(),
            2.0 * equilibrium_potential(&di, t).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_multiple_ions_have_no_classification() {
        let result = solve(vec![
            IonSpecies::new("Na", 12.0, 145.0, 1),
            IonSpecies::new("K", 140.0, 5.0, 1),
        ])
        .unwrap();
        assert_eq!(result.classification(), None);
        assert_eq!(result.label("Na"), Some("depolarizing"));
        assert_eq!(result.series().unwrap().len(), 2);
    }

    #[test]
    fn test_zero_concentration_names_ion() {
        let err = solve(vec![IonSpecies::new("Na", 12.0, 0.0, 1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainError);
        assert!(err.to_string().contains("Na"));
    }

    #[test]
    fn test_preset_symbols_compare_common_ions() {
        let ions: Vec<_> = crate::domain::ION_PRESETS
            .iter()
            .map(|p| serde_json::json!({"symbol": p.symbol}))
            .collect();
        let params: NernstParams = serde_json::from_value(serde_json::json!({ "ions": ions })).unwrap();
        let result = Nernst::solve(params, &RequestConfig::new()).unwrap();

        assert_abs_diff_eq!(result.output("E_K+").unwrap().value, -89.0, epsilon = 0.1);
        assert_abs_diff_eq!(result.output("E_Na+").unwrap().value, 66.6, epsilon = 0.1);
        assert_abs_diff_eq!(result.output("E_Cl-").unwrap().value, -90.9, epsilon = 0.1);
        assert_abs_diff_eq!(result.output("E_Ca2+").unwrap().value, 135.3, epsilon = 0.1);
        assert_abs_diff_eq!(result.output("E_Mg2+").unwrap().value, 14.7, epsilon = 0.1);
        assert_eq!(result.series().unwrap().len(), 5);
        assert_eq!(result.label("Ca2+"), Some("depolarizing"));
    }

    #[test]
    fn test_empty_ion_list() {
        assert_eq!(solve(vec![]).unwrap_err().kind(), ErrorKind::InsufficientInput);
    }
}
