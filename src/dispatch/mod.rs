//! Solver orchestration.
//!
//! [`dispatch`] is the single entry point used by every transport: it
//! resolves the solver, checks the request against the solver's
//! [`Schema`], decodes the typed parameters, runs the solver and refuses to
//! return non-finite numbers. Every failure becomes a [`DispatchError`]
//! carrying a stable [`ErrorKind`] and a localized message.

mod schema;

pub use schema::{ParamKind, ParamSpec, Schema};

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{Locale, SolverId, SolverRequest, SolverResult};
use crate::error::{DomainReason, ErrorKind, MembraneError, Result};
use crate::solver::{
    CellVolume, Goldman, IvCurve, Nernst, OsmolarityComparison, SingleChannel, Solver, Tonicity,
    VolumeDynamics,
};

/// A failed dispatch, ready to hand back to the caller.
#[derive(Debug, Serialize)]
pub struct DispatchError {
    pub solver_id: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip)]
    source: MembraneError,
}

impl DispatchError {
    /// Wrap an error raised while serving `solver_id`.
    pub fn new(solver_id: &str, error: MembraneError, locale: Locale) -> Self {
        Self {
            solver_id: solver_id.to_string(),
            kind: error.kind(),
            message: error.localized(locale),
            source: error,
        }
    }

    /// The underlying error.
    pub fn error(&self) -> &MembraneError {
        &self.source
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.solver_id, self.kind, self.message)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Run the named solver on a request.
pub fn dispatch(solver_id: &str, request: &SolverRequest) -> std::result::Result<SolverResult, DispatchError> {
    log::debug!("dispatch '{}' with {} parameter(s)", solver_id, request.params.len());

    let outcome = solver_id
        .parse::<SolverId>()
        .and_then(|id| dispatch_id(id, request));

    match outcome {
        Ok(result) => {
            log::debug!(
                "'{}' -> {}",
                solver_id,
                result.classification().unwrap_or("unclassified")
            );
            Ok(result)
        }
        Err(error) => {
            log::debug!("'{}' failed: {}", solver_id, error);
            Err(DispatchError::new(solver_id, error, request.config.locale()))
        }
    }
}

/// Run a solver selected by identifier.
pub fn dispatch_id(id: SolverId, request: &SolverRequest) -> Result<SolverResult> {
    match id {
        SolverId::OsmolarityComparison => run::<OsmolarityComparison>(request),
        SolverId::Tonicity => run::<Tonicity>(request),
        SolverId::CellVolume => run::<CellVolume>(request),
        SolverId::VolumeDynamics => run::<VolumeDynamics>(request),
        SolverId::Nernst => run::<Nernst>(request),
        SolverId::Goldman => run::<Goldman>(request),
        SolverId::IvCurve => run::<IvCurve>(request),
        SolverId::SingleChannel => run::<SingleChannel>(request),
    }
}

/// Declared parameters and configuration keys of a solver.
pub fn solver_schema(id: SolverId) -> Schema {
    match id {
        SolverId::OsmolarityComparison => OsmolarityComparison::SCHEMA,
        SolverId::Tonicity => Tonicity::SCHEMA,
        SolverId::CellVolume => CellVolume::SCHEMA,
        SolverId::VolumeDynamics => VolumeDynamics::SCHEMA,
        SolverId::Nernst => Nernst::SCHEMA,
        SolverId::Goldman => Goldman::SCHEMA,
        SolverId::IvCurve => IvCurve::SCHEMA,
        SolverId::SingleChannel => SingleChannel::SCHEMA,
    }
}

fn run<S: Solver>(request: &SolverRequest) -> Result<SolverResult> {
    S::SCHEMA.check(&request.params, &request.config)?;

    let params: S::Params = serde_json::from_value(Value::Object(request.params.clone()))
        .map_err(|e| MembraneError::MalformedParameter {
            param: "params".to_string(),
            message: e.to_string(),
        })?;

    let result = S::solve(params, &request.config)?;

    if let Some(name) = result.first_non_finite() {
        return Err(MembraneError::undefined(name, DomainReason::NonFinite));
    }
    Ok(result)
}
