//! Starting-guess grid for multi-start calibration.
//!
//! `Ea` and `dH` are the parameters the local solver is most sensitive to,
//! so the grid spans those two and keeps `logA` and `dS` at the base guess.
//! Candidates are enumerated deterministically (`Ea` outer, `dH` inner).

use crate::domain::{GridAxis, ParameterSet};
use crate::error::CalibrationError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// A single step yields `[min]`.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, CalibrationError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(CalibrationError::InvalidGrid(format!(
            "range min={min}, max={max} must be finite with max >= min"
        )));
    }
    if steps == 0 {
        return Err(CalibrationError::InvalidGrid("steps must be >= 1".to_string()));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}

/// Ordered list of starting guesses.
#[derive(Debug, Clone, PartialEq)]
pub struct StartGrid {
    pub guesses: Vec<ParameterSet>,
}

impl StartGrid {
    /// Cartesian product of the `Ea` and `dH` axes around `base`.
    pub fn around(
        base: &ParameterSet,
        ea: &GridAxis,
        dh: &GridAxis,
    ) -> Result<Self, CalibrationError> {
        if !base.is_finite() {
            return Err(CalibrationError::InvalidGrid(
                "base guess must be finite".to_string(),
            ));
        }
        let ea_values = lin_space(ea.min, ea.max, ea.steps)?;
        let dh_values = lin_space(dh.min, dh.max, dh.steps)?;

        let mut guesses = Vec::with_capacity(ea_values.len() * dh_values.len());
        for &ea in &ea_values {
            for &dh in &dh_values {
                guesses.push(ParameterSet { ea, dh, ..*base });
            }
        }
        Ok(Self { guesses })
    }

    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }
}
