//! Multi-start calibration.
//!
//! Each starting guess is refined by the local solver, one after another.
//! Selection rules:
//! 1. Failed starts are recorded and skipped
//! 2. The lowest SSE wins
//! 3. Ties go to the earlier grid index
//!
//! If every start fails the first failure is returned.

use log::{debug, info};

use crate::domain::{ExperimentData, FitResult, ParameterSet};
use crate::error::CalibrationError;
use crate::fit::fitter::calibrate;
use crate::fit::start_grid::StartGrid;
use crate::math::SolverOptions;

/// One refined starting guess.
#[derive(Debug, Clone)]
pub struct StartAttempt {
    pub guess: ParameterSet,
    pub result: Result<FitResult, CalibrationError>,
}

/// Output of a multi-start run.
#[derive(Debug, Clone)]
pub struct MultiStartOutcome {
    pub best: FitResult,
    /// Index of `best` within `attempts` (and the grid).
    pub best_index: usize,
    pub attempts: Vec<StartAttempt>,
}

impl MultiStartOutcome {
    pub fn failures(&self) -> usize {
        self.attempts.iter().filter(|a| a.result.is_err()).count()
    }
}

pub fn calibrate_multistart(
    experiments: &[ExperimentData],
    grid: &StartGrid,
    opts: &SolverOptions,
) -> Result<MultiStartOutcome, CalibrationError> {
    if grid.is_empty() {
        return Err(CalibrationError::NoCandidates);
    }

    let mut attempts = Vec::with_capacity(grid.len());
    for (idx, guess) in grid.guesses.iter().enumerate() {
        let result = calibrate(experiments, guess, opts);
        match &result {
            Ok(fit) => debug!("start {idx} ({guess}): S={:.6e}", fit.quality.sse),
            Err(err) => debug!("start {idx} ({guess}) failed: {err}"),
        }
        attempts.push(StartAttempt {
            guess: *guess,
            result,
        });
    }

    let Some(best_index) = select_best(&attempts) else {
        let first_err = attempts
            .iter()
            .find_map(|a| a.result.as_ref().err().cloned())
            .unwrap_or(CalibrationError::NoCandidates);
        return Err(first_err);
    };
    let best = match &attempts[best_index].result {
        Ok(fit) => fit.clone(),
        Err(err) => return Err(err.clone()),
    };

    let outcome = MultiStartOutcome {
        best,
        best_index,
        attempts,
    };
    info!(
        "multi-start: {} of {} starts converged; best is #{best_index} (S={:.6e})",
        outcome.attempts.len() - outcome.failures(),
        outcome.attempts.len(),
        outcome.best.quality.sse
    );
    Ok(outcome)
}

/// Index of the successful attempt with the smallest SSE (earliest on ties).
///
/// Non-finite SSEs never win.
fn select_best(attempts: &[StartAttempt]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, attempt) in attempts.iter().enumerate() {
        let Ok(fit) = &attempt.result else {
            continue;
        };
        let sse = fit.quality.sse;
        if !sse.is_finite() {
            continue;
        }
        match best {
            Some((_, best_sse)) if sse >= best_sse => {}
            _ => best = Some((idx, sse)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::{REFERENCE_TRUTH, reference_experiments};
    use crate::domain::{FitQuality, GridAxis, N_PARAMS, Termination};
    use crate::models::predict_series;

    fn attempt(sse: Option<f64>) -> StartAttempt {
        let guess = ParameterSet::new(6.0, 45.0, -10000.0, -50.0);
        let result = match sse {
            Some(sse) => Ok(FitResult {
                parameters: guess,
                covariance: [[0.0; N_PARAMS]; N_PARAMS],
                quality: FitQuality {
                    sse,
                    rmse: 0.0,
                    n: 30,
                    dof: 26,
                    iterations: 1,
                    evaluations: 1,
                    termination: Termination::Ftol,
                },
            }),
            None => Err(CalibrationError::NotConverged { iterations: 5 }),
        };
        StartAttempt { guess, result }
    }

    #[test]
    fn selection_prefers_lowest_sse_then_earliest_index() {
        let attempts = vec![
            attempt(None),
            attempt(Some(0.5)),
            attempt(Some(0.2)),
            attempt(Some(f64::NAN)),
            attempt(Some(0.2)),
        ];
        assert_eq!(select_best(&attempts), Some(2));
        assert_eq!(select_best(&[attempt(None), attempt(None)]), None);
    }

    #[test]
    fn empty_grid_has_no_candidates() {
        let grid = StartGrid { guesses: vec![] };
        let err = calibrate_multistart(&reference_experiments(), &grid, &SolverOptions::default())
            .unwrap_err();
        assert_eq!(err, CalibrationError::NoCandidates);
    }

    #[test]
    fn all_failing_starts_surface_the_first_failure() {
        let grid = StartGrid {
            guesses: vec![
                ParameterSet::new(400.0, 45.0, -10000.0, -50.0),
                ParameterSet::new(500.0, 45.0, -10000.0, -50.0),
            ],
        };
        let err = calibrate_multistart(&reference_experiments(), &grid, &SolverOptions::default())
            .unwrap_err();
        assert_eq!(err, CalibrationError::NonFiniteStart);
    }

    #[test]
    fn multistart_recovers_noise_free_parameters() {
        let exps: Vec<ExperimentData> = reference_experiments()
            .into_iter()
            .map(|mut exp| {
                exp.c_a = predict_series(&exp.times, &REFERENCE_TRUTH, &exp.conditions());
                exp
            })
            .collect();

        // The overflowing guess is skipped; the rest are refined.
        let mut grid = StartGrid::around(
            &ParameterSet::new(6.5, 47.0, -12000.0, -45.0),
            &GridAxis { min: 47.0, max: 47.0, steps: 1 },
            &GridAxis { min: -12000.0, max: -12000.0, steps: 1 },
        )
        .unwrap();
        grid.guesses.insert(0, ParameterSet::new(400.0, 45.0, -10000.0, -50.0));

        let outcome = calibrate_multistart(&exps, &grid, &SolverOptions::default()).unwrap();
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.failures(), 1);
        assert_eq!(outcome.best_index, 1);
        for (got, want) in outcome
            .best
            .parameters
            .to_array()
            .iter()
            .zip(REFERENCE_TRUTH.to_array().iter())
        {
            assert_relative_eq!(*got, *want, max_relative = 1e-6);
        }
    }
}
