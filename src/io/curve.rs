//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a calibration:
//! - starting guess, optimized parameters, covariance and quality
//! - the experiments that were fitted
//! - a precomputed fitted grid per experiment for quick plotting
//!
//! The schema is defined by `domain::FitFile`. Non-finite covariance entries
//! and standard errors are written as `null` and read back as `NaN`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, ExperimentData, FitFile, FitResult, ParameterSet};
use crate::error::AppError;
use crate::models::predict_series;

/// Points per fitted grid.
pub const GRID_POINTS: usize = 101;

/// Assemble the fit file payload (timestamped now).
pub fn build_fit_file(
    initial_guess: &ParameterSet,
    fit: &FitResult,
    experiments: &[ExperimentData],
) -> FitFile {
    let grids = experiments
        .iter()
        .map(|exp| build_grid(exp, &fit.parameters, GRID_POINTS))
        .collect();

    FitFile {
        tool: "kfit".to_string(),
        generated_at: Utc::now(),
        initial_guess: *initial_guess,
        fit: fit.clone(),
        standard_errors: fit.standard_errors(),
        experiments: experiments.to_vec(),
        grids,
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit_file: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, fit_file)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit_file: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    if fit_file.grids.len() != fit_file.experiments.len() {
        return Err(AppError::new(
            2,
            format!(
                "Fit JSON has {} grids for {} experiments.",
                fit_file.grids.len(),
                fit_file.experiments.len()
            ),
        ));
    }
    Ok(fit_file)
}

/// Fitted `Ca` on `n` evenly spaced times from 0 to the last sample time.
pub fn build_grid(exp: &ExperimentData, params: &ParameterSet, n: usize) -> CurveGrid {
    let n = n.max(2);
    let t_max = match exp.times.last() {
        Some(&t) if t.is_finite() && t > 0.0 => t,
        _ => 1.0,
    };

    let time: Vec<f64> = (0..n)
        .map(|i| t_max * i as f64 / (n as f64 - 1.0))
        .collect();
    let c_a = predict_series(&time, params, &exp.conditions());

    CurveGrid {
        label: exp.display_label(),
        temperature: exp.temperature,
        time,
        c_a,
    }
}
