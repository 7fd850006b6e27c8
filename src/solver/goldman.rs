//! Goldman-Hodgkin-Katz membrane potential.
//!
//! ```text
//! Vm = (RT/F) ln( (Σ P_c [c]_o + Σ P_a [a]_i) / (Σ P_c [c]_i + Σ P_a [a]_o) )
//! ```
//!
//! Anions enter with their compartments swapped. Only monovalent ions are
//! supported.
//!
//! With a `phase`, the K+, Na+ and Cl- permeabilities follow the
//! [`ActionPotentialPhase`] table and the result also sweeps every phase.

use serde::Deserialize;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{
    validate_ion_table, ConfigKey, IonPreset, IonSpecies, RequestConfig, SeriesPoint, SolverId,
    SolverResult,
};
use crate::error::{Constraint, DomainReason, MembraneError, Result};
use crate::thermal_voltage_mv;

use super::nernst::equilibrium_potential;
use super::Solver;

/// Lower bound of the resting range (mV).
pub const RESTING_MIN: f64 = -80.0;

/// Upper bound of the resting range (mV).
pub const RESTING_MAX: f64 = -60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembraneState {
    Resting,
    Depolarized,
    Hyperpolarized,
}

impl MembraneState {
    pub fn of(potential: f64) -> Self {
        if potential > RESTING_MAX {
            MembraneState::Depolarized
        } else if potential < RESTING_MIN {
            MembraneState::Hyperpolarized
        } else {
            MembraneState::Resting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembraneState::Resting => "resting",
            MembraneState::Depolarized => "depolarized",
            MembraneState::Hyperpolarized => "hyperpolarized",
        }
    }
}

/// Stage of an action potential, by its relative permeabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPotentialPhase {
    Rest,
    Depolarization,
    Repolarization,
    Hyperpolarization,
}

impl ActionPotentialPhase {
    /// Every phase, in the order they occur.
    pub const ALL: [ActionPotentialPhase; 4] = [
        ActionPotentialPhase::Rest,
        ActionPotentialPhase::Depolarization,
        ActionPotentialPhase::Repolarization,
        ActionPotentialPhase::Hyperpolarization,
    ];

    /// Relative permeabilities (P_K, P_Na, P_Cl).
    pub fn permeabilities(&self) -> (f64, f64, f64) {
        match self {
            ActionPotentialPhase::Rest => (1.0, 0.04, 0.45),
            ActionPotentialPhase::Depolarization => (1.0, 20.0, 0.45),
            ActionPotentialPhase::Repolarization => (5.0, 0.04, 0.45),
            ActionPotentialPhase::Hyperpolarization => (3.0, 0.04, 0.45),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPotentialPhase::Rest => "rest",
            ActionPotentialPhase::Depolarization => "depolarization",
            ActionPotentialPhase::Repolarization => "repolarization",
            ActionPotentialPhase::Hyperpolarization => "hyperpolarization",
        }
    }

    /// Copy of `ions` with the phase's K+, Na+ and Cl- permeabilities.
    pub fn apply(&self, ions: &[IonSpecies]) -> Vec<IonSpecies> {
        let (p_k, p_na, p_cl) = self.permeabilities();
        ions.iter()
            .map(|ion| {
                let permeability = match IonPreset::lookup(&ion.symbol).map(|p| p.element) {
                    Some("K") => Some(p_k),
                    Some("Na") => Some(p_na),
                    Some("Cl") => Some(p_cl),
                    _ => ion.permeability,
                };
                IonSpecies {
                    permeability,
                    ..ion.clone()
                }
            })
            .collect()
    }
}

/// Permeant ions, each with a relative permeability.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldmanParams {
    pub ions: Vec<IonSpecies>,
    /// Take K+, Na+ and Cl- permeabilities from this phase
    #[serde(default)]
    pub phase: Option<ActionPotentialPhase>,
}

/// An ion that passed GHK validation.
struct Permeant<'a> {
    ion: &'a IonSpecies,
    permeability: f64,
}

impl Permeant<'_> {
    /// Weighted (numerator, denominator) terms.
    fn terms(&self) -> (f64, f64) {
        let p = self.permeability;
        if self.ion.is_cation() {
            (p * self.ion.extracellular, p * self.ion.intracellular)
        } else {
            (p * self.ion.intracellular, p * self.ion.extracellular)
        }
    }

    fn weight(&self) -> f64 {
        self.permeability * (self.ion.intracellular + self.ion.extracellular)
    }
}

fn permeants(ions: &[IonSpecies]) -> Result<Vec<Permeant<'_>>> {
    validate_ion_table(ions)?;

    let permeants = ions
        .iter()
        .map(|ion| {
            if ion.valence.abs() != 1 {
                return Err(MembraneError::invalid(
                    format!("ions.{}.valence", ion.symbol),
                    Constraint::Monovalent,
                ));
            }
            let permeability = ion
                .permeability
                .ok_or_else(|| MembraneError::missing(format!("ions.{}.permeability", ion.symbol)))?;
            Ok(Permeant { ion, permeability })
        })
        .collect::<Result<Vec<_>>>()?;

    if permeants.iter().all(|p| p.permeability == 0.0) {
        return Err(MembraneError::invalid("ions.permeability", Constraint::NotAllZero));
    }

    Ok(permeants)
}

/// GHK potential (mV) of validated permeants.
fn membrane_potential(permeants: &[Permeant<'_>], temperature: f64) -> Result<f64> {
    let (numerator, denominator) = permeants
        .iter()
        .map(Permeant::terms)
        .fold((0.0, 0.0), |(n, d), (tn, td)| (n + tn, d + td));
    if numerator == 0.0 || denominator == 0.0 {
        return Err(MembraneError::undefined(
            "membrane_potential",
            DomainReason::LogarithmOfZero,
        ));
    }
    log::trace!("GHK: {:.4}/{:.4}", numerator, denominator);
    Ok(thermal_voltage_mv(temperature) * (numerator / denominator).ln())
}

/// Resting membrane potential from several permeant ions.
pub struct Goldman;

impl Solver for Goldman {
    const ID: SolverId = SolverId::Goldman;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("ions", ParamKind::Array),
            ParamSpec::optional("phase", ParamKind::String),
        ],
        config: &[ConfigKey::Temperature],
    };
    type Params = GoldmanParams;

    fn solve(params: GoldmanParams, config: &RequestConfig) -> Result<SolverResult> {
        let ions = match params.phase {
            Some(phase) => phase.apply(&params.ions),
            None => params.ions.clone(),
        };
        let permeants = permeants(&ions)?;
        let temperature = config.temperature()?;

        let potential = membrane_potential(&permeants, temperature)?;
        let state = MembraneState::of(potential);
        log::debug!("GHK at {} K: {:.2} mV", temperature, potential);

        let mut result = SolverResult::new(Self::ID)
            .with_output("membrane_potential", potential, "mV")
            .with_classification(state.as_str());

        for p in permeants.iter().filter(|p| p.ion.has_defined_gradient()) {
            let e = equilibrium_potential(p.ion, temperature)?;
            result = result.with_output(format!("E_{}", p.ion.symbol), e, "mV");
        }

        let mut dominant = &permeants[0];
        for p in &permeants[1..] {
            if p.weight() > dominant.weight() {
                dominant = p;
            }
        }

        let mut interpretation = format!(
            "Membrane potential is {:.1} mV ({}), dominated by {} permeability.",
            potential,
            state.as_str(),
            dominant.ion.symbol
        );
        result = result.with_label("dominant_ion", dominant.ion.symbol.as_str());

        if let Some(phase) = params.phase {
            let mut sweep = Vec::with_capacity(ActionPotentialPhase::ALL.len());
            for (i, p) in ActionPotentialPhase::ALL.iter().enumerate() {
                let phase_ions = p.apply(&params.ions);
                let v = membrane_potential(&self::permeants(&phase_ions)?, temperature)?;
                sweep.push(SeriesPoint::new(i as f64, v));
            }
            let path: Vec<String> = sweep.iter().map(|p| format!("{:.1}", p.y)).collect();
            interpretation.push_str(&format!(
                " Phase '{}'; across the action potential the potential moves through {} mV.",
                phase.as_str(),
                path.join(" -> ")
            ));
            result = result.with_label("phase", phase.as_str()).with_series(sweep);
        }

        Ok(result.with_interpretation(interpretation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_abs_diff_eq;

    fn solve(ions: Vec<IonSpecies>) -> Result<SolverResult> {
        Goldman::solve(GoldmanParams { ions, phase: None }, &RequestConfig::new())
    }

    fn presets() -> Vec<IonSpecies> {
        ["K+", "Na+", "Cl-"]
            .iter()
            .map(|s| IonPreset::lookup(s).unwrap().species())
            .collect()
    }

    fn vm(result: &SolverResult) -> f64 {
        result.output("membrane_potential").unwrap().value
    }

    fn neuron() -> Vec<IonSpecies> {
        vec![
            IonSpecies::new("K", 140.0, 5.0, 1).with_permeability(1.0),
            IonSpecies::new("Na", 12.0, 145.0, 1).with_permeability(0.04),
            IonSpecies::new("Cl", 10.0, 110.0, -1).with_permeability(0.45),
        ]
    }

    #[test]
    fn test_typical_resting_potential() {
        let result = solve(neuron()).unwrap();
        let v = vm(&result);
        assert!(v > -80.0 && v < -60.0, "Vm = {}", v);
        assert_eq!(result.classification(), Some("resting"));
        assert_eq!(result.label("dominant_ion"), Some("K"));
        assert!(result.output("E_Na").is_some());
    }

    #[test]
    fn test_single_cation_matches_nernst_and_swaps_sign() {
        let k = IonSpecies::new("K", 140.0, 5.0, 1).with_permeability(1.0);
        let forward = vm(&solve(vec![k.clone()]).unwrap());
        let nernst = equilibrium_potential(&k, crate::PHYSIOLOGICAL_TEMPERATURE).unwrap();
        assert_abs_diff_eq!(forward, nernst, epsilon = 1e-9);

        let swapped = IonSpecies::new("K", 5.0, 140.0, 1).with_permeability(1.0);
        let backward = vm(&solve(vec![swapped]).unwrap());
        assert_abs_diff_eq!(forward, -backward, epsilon = 1e-9);
    }

    #[test]
    fn test_divalent_rejected() {
        let mut ions = neuron();
        ions.push(IonSpecies::new("Ca", 0.0001, 2.0, 2).with_permeability(0.01));
        let err = solve(ions).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("ions.Ca.valence"));
    }

    #[test]
    fn test_missing_permeability_names_ion() {
        let err = solve(vec![IonSpecies::new("K", 140.0, 5.0, 1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientInput);
        assert!(err.to_string().contains("ions.K.permeability"));
    }

    #[test]
    fn test_all_zero_permeability_rejected() {
        let ions = vec![
            IonSpecies::new("K", 140.0, 5.0, 1).with_permeability(0.0),
            IonSpecies::new("Na", 12.0, 145.0, 1).with_permeability(0.0),
        ];
        assert_eq!(solve(ions).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_zero_numerator_is_domain_error() {
        let ions = vec![IonSpecies::new("K", 140.0, 0.0, 1).with_permeability(1.0)];
        assert_eq!(solve(ions).unwrap_err().kind(), ErrorKind::DomainError);
    }

    #[test]
    fn test_presets_give_resting_potential() {
        // (5 + 5.8 + 1.8) / (140 + 0.48 + 54) at 310 K
        let result = solve(presets()).unwrap();
        assert_abs_diff_eq!(vm(&result), -73.1, epsilon = 0.1);
        assert_eq!(result.classification(), Some("resting"));
        assert!(result.series().is_none());
    }

    #[test]
    fn test_depolarization_phase() {
        let params = GoldmanParams {
            ions: presets(),
            phase: Some(ActionPotentialPhase::Depolarization),
        };
        let result = Goldman::solve(params, &RequestConfig::new()).unwrap();
        // (5 + 2900 + 1.8) / (140 + 240 + 54)
        assert_abs_diff_eq!(vm(&result), 50.8, epsilon = 0.1);
        assert_eq!(result.classification(), Some("depolarized"));
        assert_eq!(result.label("phase"), Some("depolarization"));
        assert_eq!(result.label("dominant_ion"), Some("Na+"));

        let sweep = result.series().unwrap();
        assert_eq!(sweep.len(), 4);
        assert_abs_diff_eq!(sweep[0].y, -73.1, epsilon = 0.1);
        assert_abs_diff_eq!(sweep[1].y, vm(&result), epsilon = 1e-12);
        assert!(sweep[2].y < sweep[0].y && sweep[3].y < sweep[0].y);
    }

    #[test]
    fn test_phase_keeps_other_permeabilities() {
        let mut ions = presets();
        ions.push(IonSpecies::new("Li", 1.0, 10.0, 1).with_permeability(0.2));
        let shifted = ActionPotentialPhase::Repolarization.apply(&ions);
        assert_eq!(shifted[0].permeability, Some(5.0));
        assert_eq!(shifted[1].permeability, Some(0.04));
        assert_eq!(shifted[3].permeability, Some(0.2));
    }
}
