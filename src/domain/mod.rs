//! Domain entities shared by every solver.
//!
//! These are plain data containers: solutes and ions as the user describes
//! them, experimental samples, and the request/result envelope of the
//! dispatch contract. The only behavior they carry is checking their own
//! invariants.

mod ion;
mod request;
mod result;
mod sample;
mod solute;

pub use ion::{IonPreset, IonSpecies, ION_PRESETS};
pub(crate) use ion::validate_ion_table;
pub use request::{ConfigKey, Locale, RequestConfig, SolverId, SolverRequest, MAX_STEP_COUNT};
pub use result::{Quantity, SeriesPoint, SolverResult};
pub use sample::ExperimentalSample;
pub use solute::{Solute, SolutePreset, SoluteSet, SOLUTE_PRESETS};

use crate::error::{Constraint, MembraneError, Result};

/// Reject NaN and infinities.
pub(crate) fn ensure_finite(param: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MembraneError::invalid(param, Constraint::Finite))
    }
}

/// Require a finite value >= 0.
pub(crate) fn ensure_non_negative(param: &str, value: f64) -> Result<f64> {
    ensure_finite(param, value)?;
    if value < 0.0 {
        return Err(MembraneError::invalid(param, Constraint::NonNegative));
    }
    Ok(value)
}

/// Require a finite value > 0.
pub(crate) fn ensure_positive(param: &str, value: f64) -> Result<f64> {
    ensure_finite(param, value)?;
    if value <= 0.0 {
        return Err(MembraneError::invalid(param, Constraint::Positive));
    }
    Ok(value)
}
