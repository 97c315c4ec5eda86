//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load experiments -> select -> calibrate (single or multi-start) -> residuals -> discrepancy
//!
//! The CLI handlers can then focus on presentation (printing and exports).

use log::info;

use crate::data::reference_experiments;
use crate::domain::{ExperimentData, FitConfig, FitResult, PointResidual};
use crate::error::AppError;
use crate::fit::{
    DiscrepancyReport, MultiStartOutcome, StartGrid, calibrate, calibrate_multistart,
    compute_residuals,
};
use crate::io::read_experiments_json;
use crate::math::SolverOptions;

/// All computed outputs of a single `kfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The experiments that were fitted, in fit order.
    pub experiments: Vec<ExperimentData>,
    pub fit: FitResult,
    pub multistart: Option<MultiStartOutcome>,
    pub residuals: Vec<PointResidual>,
    pub discrepancy: Option<DiscrepancyReport>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load experiments (file or bundled reference data).
    let all = match &config.data_path {
        Some(path) => read_experiments_json(path)?,
        None => reference_experiments(),
    };

    // 2) Keep the requested subset.
    let experiments = select_experiments(all, &config.experiments)?;

    run_fit_with_experiments(config, experiments)
}

/// Execute the fitting pipeline on already-loaded experiments.
pub fn run_fit_with_experiments(
    config: &FitConfig,
    experiments: Vec<ExperimentData>,
) -> Result<RunOutput, AppError> {
    let opts = SolverOptions {
        max_iterations: config.max_iterations,
        ..SolverOptions::default()
    };

    // 3) Calibrate.
    let (fit, multistart) = if config.multistart {
        let grid = StartGrid::around(&config.initial_guess, &config.grid_ea, &config.grid_dh)?;
        info!("multi-start over {} starting guesses", grid.len());
        let outcome = calibrate_multistart(&experiments, &grid, &opts)?;
        (outcome.best.clone(), Some(outcome))
    } else {
        (calibrate(&experiments, &config.initial_guess, &opts)?, None)
    };

    // 4) Residuals and discrepancy.
    let residuals = compute_residuals(&experiments, &fit.parameters);
    let discrepancy = config
        .truth
        .as_ref()
        .map(|truth| DiscrepancyReport::new(&fit, truth));

    Ok(RunOutput {
        experiments,
        fit,
        multistart,
        residuals,
        discrepancy,
    })
}

/// Keep the experiments at `indices` (in the given order); empty keeps all.
pub fn select_experiments(
    all: Vec<ExperimentData>,
    indices: &[usize],
) -> Result<Vec<ExperimentData>, AppError> {
    if indices.is_empty() {
        return Ok(all);
    }
    let mut out = Vec::with_capacity(indices.len());
    for &idx in indices {
        let exp = all.get(idx).ok_or_else(|| {
            AppError::new(
                2,
                format!("Experiment index {idx} out of range (have {}).", all.len()),
            )
        })?;
        out.push(exp.clone());
    }
    Ok(out)
}
