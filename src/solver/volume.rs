//! Cell volume from the Boyle–van't Hoff relation.
//!
//! The osmotically active compartment scales inversely with the effective
//! extracellular osmolarity, while a fraction `b` of the initial volume
//! (proteins, organelles) does not exchange water:
//!
//! ```text
//! V / V0 = b + (1 - b) * π_int / π_ext
//! ```
//!
//! [`VolumeDynamics`] relaxes exponentially from V0 toward that equilibrium.

use std::f64::consts::LN_2;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{ConfigKey, RequestConfig, SeriesPoint, SolverId, SolverResult};
use crate::error::{DomainReason, MembraneError, Result};

use super::osmotic::CompartmentParams;
use super::Solver;

/// Default number of points on the Boyle–van't Hoff curve.
pub const DEFAULT_CURVE_STEPS: usize = 100;

/// Default number of trajectory samples.
pub const DEFAULT_TRAJECTORY_STEPS: usize = 300;

/// Fraction of the active compartment below which shrinkage is critical.
pub const CRITICAL_SHRINKAGE: f64 = 0.05;

/// Extracellular range of the Boyle–van't Hoff curve, as multiples of the
/// intracellular osmolarity.
const CURVE_RANGE: (f64, f64) = (0.35, 2.1);

/// Equilibrium relative volume for the given effective osmolarities.
///
/// `extracellular` must be positive.
pub fn equilibrium_volume(inactive_fraction: f64, intracellular: f64, extracellular: f64) -> f64 {
    inactive_fraction + (1.0 - inactive_fraction) * intracellular / extracellular
}

/// Qualitative outcome of a volume change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeClass {
    Lysis,
    CriticalShrinkage,
    Equilibrium,
    Swelling,
    Shrinking,
}

impl VolumeClass {
    pub fn classify(volume: f64, inactive_fraction: f64, lysis_threshold: f64) -> Self {
        if volume >= lysis_threshold {
            VolumeClass::Lysis
        } else if volume - inactive_fraction <= CRITICAL_SHRINKAGE * (1.0 - inactive_fraction) {
            VolumeClass::CriticalShrinkage
        } else if (volume - 1.0).abs() <= super::ISO_TOLERANCE {
            VolumeClass::Equilibrium
        } else if volume > 1.0 {
            VolumeClass::Swelling
        } else {
            VolumeClass::Shrinking
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeClass::Lysis => "lysis",
            VolumeClass::CriticalShrinkage => "critical_shrinkage",
            VolumeClass::Equilibrium => "equilibrium",
            VolumeClass::Swelling => "swelling",
            VolumeClass::Shrinking => "shrinking",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            VolumeClass::Lysis => "the cell swells past its lysis threshold and ruptures",
            VolumeClass::CriticalShrinkage => {
                "the osmotically active compartment collapses onto the inactive volume"
            }
            VolumeClass::Equilibrium => "the cell keeps its volume",
            VolumeClass::Swelling => "water enters and the cell swells",
            VolumeClass::Shrinking => "water leaves and the cell shrinks",
        }
    }
}

/// Validated inputs shared by both volume solvers.
struct Osmotic {
    intracellular: f64,
    extracellular: f64,
    inactive_fraction: f64,
    lysis_threshold: f64,
}

impl Osmotic {
    fn prepare(params: &CompartmentParams, config: &RequestConfig) -> Result<Self> {
        let (intracellular, extracellular) = params.effective_osmolarities()?;
        let inactive_fraction = config.inactive_fraction()?;
        let lysis_threshold = config.lysis_threshold()?;

        if extracellular == 0.0 {
            return Err(MembraneError::undefined(
                "equilibrium_volume",
                DomainReason::UnboundedVolume,
            ));
        }

        Ok(Self {
            intracellular,
            extracellular,
            inactive_fraction,
            lysis_threshold,
        })
    }

    fn equilibrium(&self) -> f64 {
        equilibrium_volume(self.inactive_fraction, self.intracellular, self.extracellular)
    }

    fn classify(&self, volume: f64) -> VolumeClass {
        VolumeClass::classify(volume, self.inactive_fraction, self.lysis_threshold)
    }
}

/// Equilibrium cell volume after transfer to a new medium.
pub struct CellVolume;

impl Solver for CellVolume {
    const ID: SolverId = SolverId::CellVolume;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("intracellular", ParamKind::Object),
            ParamSpec::required("extracellular", ParamKind::Object),
        ],
        config: &[
            ConfigKey::LysisThreshold,
            ConfigKey::InactiveFraction,
            ConfigKey::StepCount,
        ],
    };
    type Params = CompartmentParams;

    fn solve(params: CompartmentParams, config: &RequestConfig) -> Result<SolverResult> {
        let osmotic = Osmotic::prepare(&params, config)?;
        let steps = config.step_count_or(DEFAULT_CURVE_STEPS)?;
        let volume = osmotic.equilibrium();
        let class = osmotic.classify(volume);

        // With no intracellular solute the curve is flat at b; span it over the medium instead
        let span = if osmotic.intracellular > 0.0 {
            osmotic.intracellular
        } else {
            osmotic.extracellular
        };
        let (lo, hi) = (CURVE_RANGE.0 * span, CURVE_RANGE.1 * span);
        let series = (0..steps)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / (steps - 1) as f64;
                let y = equilibrium_volume(osmotic.inactive_fraction, osmotic.intracellular, x);
                SeriesPoint::new(x, y)
            })
            .collect();

        Ok(SolverResult::new(Self::ID)
            .with_output("equilibrium_volume", volume, "fraction")
            .with_output("volume_change", (volume - 1.0) * 100.0, "%")
            .with_output("intracellular_effective_osmolarity", osmotic.intracellular, "mOsm/L")
            .with_output("extracellular_effective_osmolarity", osmotic.extracellular, "mOsm/L")
            .with_output(
                "osmotic_ratio",
                osmotic.intracellular / osmotic.extracellular,
                "ratio",
            )
            .with_classification(class.as_str())
            .with_interpretation(format!(
                "Equilibrium volume is {:.1}% of the initial volume: {}.",
                volume * 100.0,
                class.describe()
            ))
            .with_series(series))
    }
}

/// Exponential relaxation V(t) = V_eq + (1 - V_eq)·e^(-t/τ), sampled
/// uniformly over `[0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeTrajectory {
    pub equilibrium: f64,
    pub time_constant: f64,
    pub duration: f64,
    pub steps: usize,
}

impl VolumeTrajectory {
    pub fn new(equilibrium: f64, time_constant: f64, duration: f64, steps: usize) -> Self {
        Self {
            equilibrium,
            time_constant,
            duration,
            steps,
        }
    }

    /// Relative volume at time `t` (s).
    pub fn volume_at(&self, t: f64) -> f64 {
        self.equilibrium + (1.0 - self.equilibrium) * (-t / self.time_constant).exp()
    }

    /// Time of sample `i`.
    pub fn time_of(&self, i: usize) -> f64 {
        if self.steps < 2 {
            return 0.0;
        }
        self.duration * i as f64 / (self.steps - 1) as f64
    }

    /// Lazily generated (time, volume) samples. Each call starts over.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = SeriesPoint> {
        let trajectory = *self;
        (0..self.steps).map(move |i| {
            let t = trajectory.time_of(i);
            SeriesPoint::new(t, trajectory.volume_at(t))
        })
    }

    /// Time to cover half the distance to equilibrium.
    pub fn half_time(&self) -> f64 {
        self.time_constant * LN_2
    }
}

/// Time course of the volume change after transfer to a new medium.
pub struct VolumeDynamics;

impl Solver for VolumeDynamics {
    const ID: SolverId = SolverId::VolumeDynamics;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("intracellular", ParamKind::Object),
            ParamSpec::required("extracellular", ParamKind::Object),
        ],
        config: &[
            ConfigKey::Duration,
            ConfigKey::StepCount,
            ConfigKey::TimeConstant,
            ConfigKey::LysisThreshold,
            ConfigKey::InactiveFraction,
        ],
    };
    type Params = CompartmentParams;

    fn solve(params: CompartmentParams, config: &RequestConfig) -> Result<SolverResult> {
        let osmotic = Osmotic::prepare(&params, config)?;
        let trajectory = VolumeTrajectory::new(
            osmotic.equilibrium(),
            config.time_constant()?,
            config.duration()?,
            config.step_count_or(DEFAULT_TRAJECTORY_STEPS)?,
        );
        let class = osmotic.classify(trajectory.equilibrium);

        let series: Vec<SeriesPoint> = trajectory.samples().collect();
        let final_volume = series.last().map_or(1.0, |p| p.y);
        let lysis_time = series
            .iter()
            .find(|p| p.y >= osmotic.lysis_threshold)
            .map(|p| p.x);

        let mut result = SolverResult::new(Self::ID)
            .with_output("equilibrium_volume", trajectory.equilibrium, "fraction")
            .with_output("final_volume", final_volume, "fraction")
            .with_output("half_time", trajectory.half_time(), "s")
            .with_classification(class.as_str());

        let interpretation = match lysis_time {
            Some(t) => {
                result = result.with_output("lysis_time", t, "s");
                format!(
                    "The cell reaches its lysis threshold ({:.2}x) after {:.1} s.",
                    osmotic.lysis_threshold, t
                )
            }
            None => format!(
                "Volume relaxes toward {:.1}% with a half-time of {:.1} s and reaches {:.1}% after {:.1} s: {}.",
                trajectory.equilibrium * 100.0,
                trajectory.half_time(),
                final_volume * 100.0,
                trajectory.duration,
                class.describe()
            ),
        };

        Ok(result.with_interpretation(interpretation).with_series(series))
    }
}
