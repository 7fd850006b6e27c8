//! The uniform result envelope returned by every solver.

use std::collections::BTreeMap;

use serde::Serialize;

use super::SolverId;

/// A numeric output with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: &'static str,
}

/// One point of a plot series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

impl SeriesPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for SeriesPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Outputs, classification and interpretation of one solver invocation.
///
/// Built by the solver, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverResult {
    solver_id: SolverId,
    outputs: BTreeMap<String, Quantity>,
    classification: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    interpretation: String,
    series: Option<Vec<SeriesPoint>>,
}

impl SolverResult {
    pub(crate) fn new(solver_id: SolverId) -> Self {
        Self {
            solver_id,
            outputs: BTreeMap::new(),
            classification: None,
            labels: BTreeMap::new(),
            interpretation: String::new(),
            series: None,
        }
    }

    pub(crate) fn with_output(mut self, name: impl Into<String>, value: f64, unit: &'static str) -> Self {
        self.outputs.insert(name.into(), Quantity { value, unit });
        self
    }

    pub(crate) fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub(crate) fn with_label(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(name.into(), label.into());
        self
    }

    pub(crate) fn with_interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.interpretation = interpretation.into();
        self
    }

    pub(crate) fn with_series(mut self, series: Vec<SeriesPoint>) -> Self {
        self.series = Some(series);
        self
    }

    pub fn solver_id(&self) -> SolverId {
        self.solver_id
    }

    pub fn outputs(&self) -> &BTreeMap<String, Quantity> {
        &self.outputs
    }

    /// Look up one output by name.
    pub fn output(&self, name: &str) -> Option<Quantity> {
        self.outputs.get(name).copied()
    }

    pub fn classification(&self) -> Option<&str> {
        self.classification.as_deref()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn interpretation(&self) -> &str {
        &self.interpretation
    }

    pub fn series(&self) -> Option<&[SeriesPoint]> {
        self.series.as_deref()
    }

    /// Name of the first output or series coordinate that is NaN or infinite.
    pub(crate) fn first_non_finite(&self) -> Option<String> {
        if let Some((name, _)) = self.outputs.iter().find(|(_, q)| !q.value.is_finite()) {
            return Some(name.clone());
        }
        self.series
            .iter()
            .flatten()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
            .map(|i| format!("series[{}]", i))
    }
}
