//! Membrane biophysics solvers.
//!
//! Each solver is a unit type implementing [`Solver`]: it declares the
//! parameters it accepts, decodes them into a typed struct and computes a
//! [`SolverResult`]. Solvers are pure functions of their inputs.
//!
//! ## Osmotic
//!
//! - [`OsmolarityComparison`] - total and effective osmolarity on both sides of the membrane
//! - [`Tonicity`] - a single medium against a reference osmolarity
//! - [`CellVolume`] - Boyle–van't Hoff equilibrium volume
//! - [`VolumeDynamics`] - exponential relaxation toward that volume
//!
//! ## Electrophysiology
//!
//! - [`Nernst`] - equilibrium potential per ion
//! - [`Goldman`] - GHK membrane potential for monovalent ions
//! - [`IvCurve`] - theoretical or fitted current-voltage relation
//! - [`SingleChannel`] - unitary conductance and open probability
//!
//! Every iso- classification uses the same relative tolerance,
//! [`ISO_TOLERANCE`].

mod goldman;
mod iv_curve;
mod nernst;
mod osmotic;
mod single_channel;
mod volume;

pub use goldman::{ActionPotentialPhase, Goldman, GoldmanParams, MembraneState};
pub use iv_curve::{IvCurve, IvCurveParams, LinearFit, Rectification, Selectivity};
pub use nernst::{Nernst, NernstParams, RestingEffect};
pub use osmotic::{CellResponse, CompartmentParams, OsmolarityComparison, Tonicity, TonicityParams};
pub use single_channel::{SingleChannel, SingleChannelParams};
pub use volume::{equilibrium_volume, CellVolume, VolumeClass, VolumeDynamics, VolumeTrajectory};

use serde::de::DeserializeOwned;

use crate::dispatch::Schema;
use crate::domain::{RequestConfig, SolverId, SolverResult};
use crate::error::Result;

/// Relative tolerance for iso- classifications (2 %).
pub const ISO_TOLERANCE: f64 = 0.02;

/// A solver variant in the registry.
pub trait Solver {
    /// Registry identifier.
    const ID: SolverId;
    /// Declared parameters and accepted configuration keys.
    const SCHEMA: Schema;
    /// Typed parameters decoded from the request.
    type Params: DeserializeOwned;

    /// Compute the result. Numeric bounds are enforced here.
    fn solve(params: Self::Params, config: &RequestConfig) -> Result<SolverResult>;
}

/// Position of a value relative to a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Within [`ISO_TOLERANCE`] of the reference
    Iso,
    Above,
    Below,
}

impl Relation {
    /// Compare `value` with `reference`, the band being a fraction of `reference`.
    pub fn of(value: f64, reference: f64) -> Self {
        Self::within(value, reference, reference)
    }

    /// Compare `value` with `reference`, the band being a fraction of `scale`.
    ///
    /// Osmotic comparisons size the band from the extracellular side, which
    /// is the compared value rather than the reference.
    pub fn within(value: f64, reference: f64, scale: f64) -> Self {
        if (value - reference).abs() <= ISO_TOLERANCE * scale.abs() {
            Relation::Iso
        } else if value > reference {
            Relation::Above
        } else {
            Relation::Below
        }
    }
}
