//! Single-channel recordings: unitary conductance and open probability.

use serde::Deserialize;

use crate::dispatch::{ParamKind, ParamSpec, Schema};
use crate::domain::{ensure_finite, ConfigKey, RequestConfig, SeriesPoint, SolverId, SolverResult};
use crate::error::{DomainReason, MembraneError, Result};

use super::Solver;

/// Largest gap (pA) between sorted observations of one amplitude level.
pub const CLUSTER_GAP: f64 = 0.5;

/// Levels whose mean magnitude is at most this (pA) are the closed baseline.
pub const BASELINE_AMPLITUDE: f64 = 0.5;

/// Open probability separating low from high activity.
const HIGH_ACTIVITY: f64 = 0.5;

/// A recorded current trace at fixed voltage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleChannelParams {
    /// Current samples (pA)
    pub observations: Vec<f64>,
    /// Holding voltage (mV)
    pub voltage: f64,
    /// Reversal potential (mV), 0 when unknown
    #[serde(default)]
    pub reversal_potential: Option<f64>,
}

/// A group of observations at one amplitude level.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Level {
    mean: f64,
    count: usize,
}

/// Group sorted currents into levels separated by more than [`CLUSTER_GAP`].
fn amplitude_levels(observations: &[f64]) -> Vec<Level> {
    let mut sorted = observations.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut levels = Vec::new();
    let mut start = 0;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i] - sorted[i - 1] > CLUSTER_GAP {
            let group = &sorted[start..i];
            levels.push(Level {
                mean: group.iter().sum::<f64>() / group.len() as f64,
                count: group.len(),
            });
            start = i;
        }
    }
    levels
}

/// Mean current of the most populated open level, ties to the larger magnitude.
fn dominant_amplitude(observations: &[f64]) -> Option<f64> {
    amplitude_levels(observations)
        .into_iter()
        .filter(|level| level.mean.abs() > BASELINE_AMPLITUDE)
        .max_by(|a, b| {
            a.count
                .cmp(&b.count)
                .then(a.mean.abs().total_cmp(&b.mean.abs()))
        })
        .map(|level| level.mean)
}

fn activity(open_probability: f64) -> &'static str {
    if open_probability == 0.0 {
        "silent"
    } else if open_probability < HIGH_ACTIVITY {
        "low_activity"
    } else {
        "high_activity"
    }
}

/// Unitary conductance and gating of one channel.
pub struct SingleChannel;

impl Solver for SingleChannel {
    const ID: SolverId = SolverId::SingleChannel;
    const SCHEMA: Schema = Schema {
        params: &[
            ParamSpec::required("observations", ParamKind::Array),
            ParamSpec::required("voltage", ParamKind::Number),
            ParamSpec::optional("reversal_potential", ParamKind::Number),
        ],
        config: &[ConfigKey::AmplitudeThreshold],
    };
    type Params = SingleChannelParams;

    fn solve(params: SingleChannelParams, config: &RequestConfig) -> Result<SolverResult> {
        let observations = params.observations;
        if observations.is_empty() {
            return Err(MembraneError::TooFewPoints {
                subject: "observations".to_string(),
                required: 1,
                found: 0,
            });
        }
        for (i, &current) in observations.iter().enumerate() {
            ensure_finite(&format!("observations[{}]", i), current)?;
        }
        let voltage = ensure_finite("voltage", params.voltage)?;
        let reversal = ensure_finite("reversal_potential", params.reversal_potential.unwrap_or(0.0))?;
        let explicit_threshold = config.amplitude_threshold()?;

        let driving_force = voltage - reversal;
        if driving_force == 0.0 {
            return Err(MembraneError::undefined(
                "conductance",
                DomainReason::ZeroDrivingForce,
            ));
        }

        let amplitude = dominant_amplitude(&observations);
        let threshold = explicit_threshold
            .or_else(|| amplitude.map(|a| a.abs() / 2.0))
            .unwrap_or(BASELINE_AMPLITUDE);
        let is_open = |current: f64| amplitude.is_some() && current.abs() > threshold;

        let open_count = observations.iter().filter(|&&c| is_open(c)).count();
        let open_probability = open_count as f64 / observations.len() as f64;
        // Each run of consecutive open samples is one opening
        let openings = observations
            .iter()
            .enumerate()
            .filter(|&(i, &c)| is_open(c) && (i == 0 || !is_open(observations[i - 1])))
            .count();
        let class = activity(open_probability);
        log::debug!(
            "single channel: amplitude {:?} pA, threshold {:.2} pA, Po {:.3}",
            amplitude,
            threshold,
            open_probability
        );

        let series = observations
            .iter()
            .enumerate()
            .map(|(i, &c)| SeriesPoint::new(i as f64, c))
            .collect();

        let mut result = SolverResult::new(Self::ID)
            .with_output("open_probability", open_probability, "fraction")
            .with_output("threshold", threshold, "pA")
            .with_output("openings", openings as f64, "count")
            .with_output("driving_force", driving_force, "mV")
            .with_classification(class);

        let interpretation = match amplitude {
            Some(a) => {
                let conductance = a / driving_force * 1000.0;
                result = result
                    .with_output("amplitude", a, "pA")
                    .with_output("conductance", conductance, "pS");
                format!(
                    "Unitary current of {:.2} pA at {:.1} mV driving force gives γ = {:.1} pS; the channel is open {:.1}% of the time over {} openings.",
                    a,
                    driving_force,
                    conductance,
                    open_probability * 100.0,
                    openings
                )
            }
            None => "No open level above the baseline: the channel stayed closed.".to_string(),
        };

        Ok(result.with_interpretation(interpretation).with_series(series))
    }
}
