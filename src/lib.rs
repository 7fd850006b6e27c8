//! # Membrane Core
//!
//! A calculation engine for membrane biophysics.
//!
//! This library provides:
//! - Osmolarity, tonicity and Boyle–van't Hoff cell volume (static and time course)
//! - Nernst equilibrium potentials and the Goldman-Hodgkin-Katz membrane potential
//! - Patch-clamp analysis: I-V curves (generated or fitted) and single-channel statistics
//! - One request/result contract shared by every solver
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`domain`] - Solutes, ions, samples and the request/result envelope
//! - [`solver`] - One type per calculation, each implementing [`solver::Solver`]
//! - [`dispatch`] - Request validation and routing to the named solver
//! - [`error`] - Error type and stable error kinds
//! - [`io`] - Request/result JSON on files and standard streams (CLI only)
//!
//! ## Usage
//!
//! ### Library
//!
//! ```
//! use membrane_core::{dispatch, SolverRequest};
//! use serde_json::json;
//!
//! let request = SolverRequest::new().with_param(
//!     "ions",
//!     json!([{"symbol": "K", "intra": 140, "extra": 5, "valence": 1}]),
//! );
//! let result = dispatch("nernst", &request).unwrap();
//! assert!(result.output("E_K").unwrap().value < -88.0);
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! echo '{"params": {"ions": [{"symbol": "K", "intra": 140, "extra": 5, "valence": 1}]}}' | membrane nernst
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { dispatch_json } from 'membrane_core';
//!
//! const result = JSON.parse(dispatch_json('nernst', requestJson));
//! ```
//!
//! ## Units
//!
//! Concentrations in mM, osmolarities in mOsm/L, potentials in mV, currents
//! in pA, conductances in nS (pS for single channels), times in s, volumes
//! relative to the initial volume.

pub mod dispatch;
pub mod domain;
pub mod error;
pub mod solver;

#[cfg(feature = "cli")]
pub mod io;

// Re-export main types for convenience
pub use dispatch::{dispatch, DispatchError};
pub use domain::{RequestConfig, SolverId, SolverRequest, SolverResult};
pub use error::{ErrorKind, MembraneError, Result};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

/// Gas constant in J/(mol·K)
pub const GAS_CONSTANT: f64 = 8.314;

/// Faraday constant in C/mol
pub const FARADAY_CONSTANT: f64 = 96485.0;

/// Body temperature in K
pub const PHYSIOLOGICAL_TEMPERATURE: f64 = 310.0;

/// Reference plasma osmolarity in mOsm/L
pub const PLASMA_OSMOLARITY: f64 = 285.0;

/// Typical resting membrane potential in mV
pub const RESTING_POTENTIAL: f64 = -70.0;

/// Thermal voltage RT/F in mV (about 26.7 mV at 310 K).
pub fn thermal_voltage_mv(temperature: f64) -> f64 {
    GAS_CONSTANT * temperature / FARADAY_CONSTANT * 1000.0
}
