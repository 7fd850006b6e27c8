//! Ion species with their transmembrane gradient.

use serde::{Deserialize, Serialize};

use crate::error::{Constraint, MembraneError, Result};

use super::{ensure_finite, ensure_non_negative};

/// Typical mammalian values for a common ion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonPreset {
    /// Symbol with its charge, e.g. `K+`
    pub symbol: &'static str,
    /// Bare element symbol, accepted as an alias
    pub element: &'static str,
    pub intracellular: f64,
    pub extracellular: f64,
    pub valence: i32,
    /// Resting permeability relative to K+, for ions the GHK equation uses
    pub permeability: Option<f64>,
}

/// Typical concentrations (mM) and resting permeabilities.
pub const ION_PRESETS: [IonPreset; 5] = [
    IonPreset {
        symbol: "K+",
        element: "K",
        intracellular: 140.0,
        extracellular: 5.0,
        valence: 1,
        permeability: Some(1.0),
    },
    IonPreset {
        symbol: "Na+",
        element: "Na",
        intracellular: 12.0,
        extracellular: 145.0,
        valence: 1,
        permeability: Some(0.04),
    },
    IonPreset {
        symbol: "Cl-",
        element: "Cl",
        intracellular: 4.0,
        extracellular: 120.0,
        valence: -1,
        permeability: Some(0.45),
    },
    IonPreset {
        symbol: "Ca2+",
        element: "Ca",
        intracellular: 0.0001,
        extracellular: 2.5,
        valence: 2,
        permeability: None,
    },
    IonPreset {
        symbol: "Mg2+",
        element: "Mg",
        intracellular: 0.5,
        extracellular: 1.5,
        valence: 2,
        permeability: None,
    },
];

impl IonPreset {
    /// Find the preset for a symbol, with or without its charge.
    pub fn lookup(symbol: &str) -> Option<&'static IonPreset> {
        ION_PRESETS
            .iter()
            .find(|p| p.symbol == symbol || p.element == symbol)
    }

    pub fn species(&self) -> IonSpecies {
        IonSpecies {
            symbol: self.symbol.to_string(),
            intracellular: self.intracellular,
            extracellular: self.extracellular,
            valence: self.valence,
            permeability: self.permeability,
        }
    }
}

/// An ion with intracellular and extracellular concentrations (mM).
///
/// In requests, fields left out of a preset ion (`{"symbol": "K+"}`) take
/// the preset's typical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IonFields")]
pub struct IonSpecies {
    pub symbol: String,
    pub intracellular: f64,
    pub extracellular: f64,
    pub valence: i32,
    /// Relative permeability, required by the GHK equation only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permeability: Option<f64>,
}

/// Ion fields as they appear in a request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct IonFields {
    symbol: String,
    #[serde(default, alias = "intra")]
    intracellular: Option<f64>,
    #[serde(default, alias = "extra")]
    extracellular: Option<f64>,
    #[serde(default)]
    valence: Option<i32>,
    #[serde(default)]
    permeability: Option<f64>,
}

impl TryFrom<IonFields> for IonSpecies {
    type Error = String;

    fn try_from(fields: IonFields) -> std::result::Result<Self, String> {
        let preset = IonPreset::lookup(&fields.symbol);
        let missing = |field: &str| {
            format!(
                "ion '{}' has no preset values, '{}' is required",
                fields.symbol, field
            )
        };

        let intracellular = fields
            .intracellular
            .or(preset.map(|p| p.intracellular))
            .ok_or_else(|| missing("intracellular"))?;
        let extracellular = fields
            .extracellular
            .or(preset.map(|p| p.extracellular))
            .ok_or_else(|| missing("extracellular"))?;
        let valence = fields
            .valence
            .or(preset.map(|p| p.valence))
            .ok_or_else(|| missing("valence"))?;

        Ok(IonSpecies {
            permeability: fields.permeability.or(preset.and_then(|p| p.permeability)),
            symbol: fields.symbol,
            intracellular,
            extracellular,
            valence,
        })
    }
}

impl IonSpecies {
    /// Create an ion without a permeability.
    pub fn new(symbol: impl Into<String>, intracellular: f64, extracellular: f64, valence: i32) -> Self {
        Self {
            symbol: symbol.into(),
            intracellular,
            extracellular,
            valence,
            permeability: None,
        }
    }

    pub fn with_permeability(mut self, permeability: f64) -> Self {
        self.permeability = Some(permeability);
        self
    }

    pub fn is_cation(&self) -> bool {
        self.valence > 0
    }

    /// Check concentration, valence and permeability invariants.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative(&format!("ions.{}.intracellular", self.symbol), self.intracellular)?;
        ensure_non_negative(&format!("ions.{}.extracellular", self.symbol), self.extracellular)?;

        if self.valence == 0 {
            return Err(MembraneError::invalid(
                format!("ions.{}.valence", self.symbol),
                Constraint::NonZero,
            ));
        }

        if let Some(p) = self.permeability {
            let param = format!("ions.{}.permeability", self.symbol);
            ensure_finite(&param, p)?;
            if p < 0.0 {
                return Err(MembraneError::invalid(param, Constraint::NonNegative));
            }
        }

        Ok(())
    }

    /// Both concentrations strictly positive, so ln(out/in) is defined.
    pub fn has_defined_gradient(&self) -> bool {
        self.intracellular > 0.0 && self.extracellular > 0.0
    }
}

/// Reject empty ion tables and duplicate symbols, then validate each ion.
pub(crate) fn validate_ion_table(ions: &[IonSpecies]) -> Result<()> {
    if ions.is_empty() {
        return Err(MembraneError::empty("ions"));
    }

    for (i, ion) in ions.iter().enumerate() {
        if ions[..i].iter().any(|other| other.symbol == ion.symbol) {
            return Err(MembraneError::invalid(
                format!("ions.{}.symbol", ion.symbol),
                Constraint::Unique,
            ));
        }
        ion.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_short_aliases() {
        let json = r#"{"symbol": "Li", "intra": 12, "extra": 145, "valence": 1}"#;
        let ion: IonSpecies = serde_json::from_str(json).unwrap();
        assert_eq!(ion.intracellular, 12.0);
        assert_eq!(ion.extracellular, 145.0);
        assert_eq!(ion.permeability, None);
    }

    #[test]
    fn test_bare_preset_symbol_is_filled() {
        let ion: IonSpecies = serde_json::from_str(r#"{"symbol": "K+"}"#).unwrap();
        assert_eq!(ion, ION_PRESETS[0].species());
        assert_eq!(ion.permeability, Some(1.0));

        // Given fields win over the preset, the element alias resolves too
        let ion: IonSpecies = serde_json::from_str(r#"{"symbol": "Na", "extra": 100}"#).unwrap();
        assert_eq!(ion.intracellular, 12.0);
        assert_eq!(ion.extracellular, 100.0);
        assert_eq!(ion.valence, 1);
    }

    #[test]
    fn test_unknown_symbol_needs_every_field() {
        let err = serde_json::from_str::<IonSpecies>(r#"{"symbol": "Li", "intra": 1}"#).unwrap_err();
        assert!(err.to_string().contains("'extracellular' is required"));
    }

    #[test]
    fn test_divalent_presets_have_no_permeability() {
        let ca = IonPreset::lookup("Ca2+").unwrap();
        assert_eq!(ca.valence, 2);
        assert_eq!(ca.permeability, None);
        assert_eq!(IonPreset::lookup("Mg").unwrap().symbol, "Mg2+");
    }

    #[test]
    fn test_zero_valence_rejected() {
        let ion = IonSpecies::new("X", 1.0, 1.0, 0);
        assert!(ion.validate().is_err());
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let ions = vec![IonSpecies::new("K", 140.0, 5.0, 1), IonSpecies::new("K", 4.0, 4.0, 1)];
        let err = validate_ion_table(&ions).unwrap_err();
        assert!(err.to_string().contains("ions.K.symbol"));
    }

    #[test]
    fn test_zero_concentration_is_valid_input() {
        // Undefined potentials are a domain error raised by the solver, not an input error
        let ion = IonSpecies::new("Ca", 0.0, 2.5, 2);
        assert!(ion.validate().is_ok());
        assert!(!ion.has_defined_gradient());
    }
}
