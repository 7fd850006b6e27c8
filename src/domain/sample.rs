//! Experimental voltage-clamp samples.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::ensure_finite;

/// One I-V measurement: holding voltage (mV) and recorded current (pA).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentalSample {
    pub voltage: f64,
    pub current: f64,
}

impl ExperimentalSample {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }

    /// Reject non-finite readings; `index` locates the sample in errors.
    pub fn validate(&self, index: usize) -> Result<()> {
        ensure_finite(&format!("samples[{}].voltage", index), self.voltage)?;
        ensure_finite(&format!("samples[{}].current", index), self.current)?;
        Ok(())
    }
}
