//! Fit-vs-truth comparison in units of standard error.
//!
//! This is a diagnostic. No threshold is enforced; values within about ±2
//! are what a well-specified fit to noisy data usually produces.

use serde::{Deserialize, Serialize};

use crate::domain::{FitResult, N_PARAMS, PARAM_NAMES, PARAM_UNITS, ParameterSet};

/// Elementwise `(optimized - truth) / stderr`.
///
/// Plain IEEE division: a zero or `NaN` standard error yields `±inf`/`NaN`.
pub fn discrepancy(
    optimized: &ParameterSet,
    standard_errors: &[f64; N_PARAMS],
    truth: &ParameterSet,
) -> [f64; N_PARAMS] {
    let opt = optimized.to_array();
    let tru = truth.to_array();
    let mut z = [0.0; N_PARAMS];
    for i in 0..N_PARAMS {
        z[i] = (opt[i] - tru[i]) / standard_errors[i];
    }
    z
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyRow {
    pub name: String,
    pub unit: String,
    pub truth: f64,
    pub optimized: f64,
    pub stderr: f64,
    pub z: f64,
}

/// Per-parameter discrepancy rows in solver order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    pub rows: Vec<DiscrepancyRow>,
}

impl DiscrepancyReport {
    pub fn new(fit: &FitResult, truth: &ParameterSet) -> Self {
        let se = fit.standard_errors();
        let z = discrepancy(&fit.parameters, &se, truth);
        let opt = fit.parameters.to_array();
        let tru = truth.to_array();

        let rows = (0..N_PARAMS)
            .map(|i| DiscrepancyRow {
                name: PARAM_NAMES[i].to_string(),
                unit: PARAM_UNITS[i].to_string(),
                truth: tru[i],
                optimized: opt[i],
                stderr: se[i],
                z: z[i],
            })
            .collect();
        Self { rows }
    }

    /// Largest finite `|z|`, if any.
    pub fn max_abs_z(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| r.z.abs())
            .filter(|z| z.is_finite())
            .fold(None, |acc, z| Some(acc.map_or(z, |a: f64| a.max(z))))
    }
}
