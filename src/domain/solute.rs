//! Solutes and per-compartment solute sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Constraint, MembraneError, Result};

use super::{ensure_finite, ensure_non_negative};

/// Dissociation and permeance of a common solute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutePreset {
    pub name: &'static str,
    pub dissociation: u32,
    pub penetrating: bool,
}

/// Solutes whose factors are applied by name.
pub const SOLUTE_PRESETS: [SolutePreset; 9] = [
    SolutePreset { name: "NaCl", dissociation: 2, penetrating: false },
    SolutePreset { name: "KCl", dissociation: 2, penetrating: false },
    SolutePreset { name: "CaCl2", dissociation: 3, penetrating: false },
    SolutePreset { name: "MgCl2", dissociation: 3, penetrating: false },
    SolutePreset { name: "NaHCO3", dissociation: 2, penetrating: false },
    SolutePreset { name: "Glucose", dissociation: 1, penetrating: false },
    SolutePreset { name: "Sucrose", dissociation: 1, penetrating: false },
    SolutePreset { name: "Mannitol", dissociation: 1, penetrating: false },
    SolutePreset { name: "Urea", dissociation: 1, penetrating: true },
];

impl SolutePreset {
    pub fn lookup(name: &str) -> Option<&'static SolutePreset> {
        SOLUTE_PRESETS.iter().find(|p| p.name == name)
    }
}

/// A dissolved species in one compartment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solute {
    pub name: String,
    /// Concentration in mM
    pub concentration: f64,
    /// Reflection/osmotic coefficient (0 to 1)
    pub coefficient: f64,
    /// Particles released per formula unit (NaCl = 2, CaCl2 = 3)
    pub dissociation: u32,
    /// Charge number, 0 for non-electrolytes
    pub valence: i32,
    /// Whether the solute crosses the membrane
    pub penetrating: bool,
}

impl Solute {
    /// Create a non-penetrating, non-dissociating solute with coefficient 1.
    pub fn new(name: impl Into<String>, concentration: f64) -> Self {
        Self {
            name: name.into(),
            concentration,
            coefficient: 1.0,
            dissociation: 1,
            valence: 0,
            penetrating: false,
        }
    }

    /// Create a solute with the preset factors for `name`, if there are any.
    pub fn preset(name: impl Into<String>, concentration: f64) -> Self {
        let solute = Self::new(name, concentration);
        match SolutePreset::lookup(&solute.name) {
            Some(p) => Self {
                dissociation: p.dissociation,
                penetrating: p.penetrating,
                ..solute
            },
            None => solute,
        }
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_dissociation(mut self, dissociation: u32) -> Self {
        self.dissociation = dissociation;
        self
    }

    pub fn with_valence(mut self, valence: i32) -> Self {
        self.valence = valence;
        self
    }

    /// Mark the solute as membrane-permeant.
    pub fn penetrating(mut self) -> Self {
        self.penetrating = true;
        self
    }

    /// Osmolarity contributed to the compartment total (mOsm/L).
    pub fn osmolar_contribution(&self) -> f64 {
        self.concentration * self.dissociation as f64 * self.coefficient
    }

    /// Osmolarity contributed to the effective (tonicity-setting) total.
    pub fn effective_contribution(&self) -> f64 {
        if self.penetrating {
            0.0
        } else {
            self.osmolar_contribution()
        }
    }

    /// Check the solute invariants. `path` prefixes parameter names in errors.
    pub fn validate(&self, path: &str) -> Result<()> {
        ensure_non_negative(&format!("{}.{}.concentration", path, self.name), self.concentration)?;

        let coefficient_param = format!("{}.{}.coefficient", path, self.name);
        ensure_finite(&coefficient_param, self.coefficient)?;
        if !(0.0..=1.0).contains(&self.coefficient) {
            return Err(MembraneError::invalid(coefficient_param, Constraint::UnitInterval));
        }

        if self.dissociation == 0 {
            return Err(MembraneError::invalid(
                format!("{}.{}.dissociation", path, self.name),
                Constraint::Positive,
            ));
        }

        Ok(())
    }
}

/// Solute fields as they appear in a request, keyed by name. Factors left
/// out come from the solute's preset, if it has one.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoluteFields {
    concentration: f64,
    #[serde(default = "default_coefficient")]
    coefficient: f64,
    #[serde(default)]
    dissociation: Option<u32>,
    #[serde(default)]
    valence: i32,
    #[serde(default)]
    penetrating: Option<bool>,
}

fn default_coefficient() -> f64 {
    1.0
}

/// The solutes of one compartment, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, SoluteFields>")]
pub struct SoluteSet {
    solutes: BTreeMap<String, Solute>,
}

impl From<BTreeMap<String, SoluteFields>> for SoluteSet {
    fn from(map: BTreeMap<String, SoluteFields>) -> Self {
        let solutes = map
            .into_iter()
            .map(|(name, f)| {
                let preset = Solute::preset(name.clone(), f.concentration);
                let solute = Solute {
                    coefficient: f.coefficient,
                    dissociation: f.dissociation.unwrap_or(preset.dissociation),
                    valence: f.valence,
                    penetrating: f.penetrating.unwrap_or(preset.penetrating),
                    ..preset
                };
                (name, solute)
            })
            .collect();
        Self { solutes }
    }
}

impl FromIterator<Solute> for SoluteSet {
    fn from_iter<I: IntoIterator<Item = Solute>>(iter: I) -> Self {
        let mut set = Self::new();
        for solute in iter {
            set.insert(solute);
        }
        set
    }
}

impl SoluteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a solute, replacing any previous one with the same name.
    pub fn insert(&mut self, solute: Solute) {
        self.solutes.insert(solute.name.clone(), solute);
    }

    pub fn get(&self, name: &str) -> Option<&Solute> {
        self.solutes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solute> {
        self.solutes.values()
    }

    pub fn len(&self) -> usize {
        self.solutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutes.is_empty()
    }

    /// Validate every solute, naming the compartment in errors.
    pub fn validate(&self, side: &str) -> Result<()> {
        self.solutes.values().try_for_each(|s| s.validate(side))
    }

    /// Total osmolarity (mOsm/L) over all solutes.
    pub fn total_osmolarity(&self) -> f64 {
        self.iter().map(Solute::osmolar_contribution).sum()
    }

    /// Effective osmolarity (mOsm/L) over non-penetrating solutes.
    pub fn effective_osmolarity(&self) -> f64 {
        self.iter().map(Solute::effective_contribution).sum()
    }
}
