//! Pooled calibration of the kinetics model.
//!
//! Given:
//! - one or more experiments (each at its own temperature and initial state)
//! - a starting `ParameterSet`
//!
//! we minimize the pooled sum of squared residuals
//!
//! ```text
//! S(θ) = Σ_e Σ_i (Ca(t_ei; θ, T_e, cA0_e, cB0_e) - cA_ei)²
//! ```
//!
//! with Levenberg–Marquardt, then estimate the parameter covariance as
//! `(JᵀJ)⁺ · S / (n - 4)` from the Jacobian at the optimum.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{
    ExperimentData, FitQuality, FitResult, N_PARAMS, PARAM_NAMES, ParameterSet, PointResidual,
};
use crate::error::CalibrationError;
use crate::math::{SolverOptions, minimize, normal_pseudo_inverse};
use crate::models::predict_series;

/// A parameter counts as undetermined when it has at least this much weight
/// in a discarded singular direction.
const NULL_SPACE_LOADING: f64 = 1e-8;

/// Fit the four kinetic parameters to all experiments at once.
pub fn calibrate(
    experiments: &[ExperimentData],
    initial_guess: &ParameterSet,
    opts: &SolverOptions,
) -> Result<FitResult, CalibrationError> {
    for exp in experiments {
        exp.validate()?;
    }
    let n_obs: usize = experiments.iter().map(ExperimentData::len).sum();
    if n_obs == 0 {
        return Err(CalibrationError::EmptyData);
    }

    let residual_fn = |x: &DVector<f64>| {
        let params = ParameterSet::from_slice(x.as_slice());
        DVector::from_vec(pooled_residuals(experiments, &params, n_obs))
    };
    let x0 = DVector::from_row_slice(&initial_guess.to_array());
    let sol = minimize(residual_fn, &x0, opts)?;

    let parameters = ParameterSet::from_slice(sol.x.as_slice());
    let covariance = covariance_from_jacobian(&sol.jacobian, sol.sse, n_obs);
    let quality = FitQuality {
        sse: sol.sse,
        rmse: (sol.sse / n_obs as f64).sqrt(),
        n: n_obs,
        dof: n_obs.saturating_sub(N_PARAMS),
        iterations: sol.iterations,
        evaluations: sol.evaluations,
        termination: sol.termination,
    };

    debug!("calibrated {parameters} (S={:.6e}, n={n_obs})", quality.sse);

    let fit = FitResult {
        parameters,
        covariance,
        quality,
    };
    if fit.is_degenerate() {
        warn!(
            "Covariance is degenerate; standard errors: {:?}",
            fit.standard_errors()
        );
    }
    Ok(fit)
}

/// Model minus observation for every point, experiments concatenated in order.
fn pooled_residuals(experiments: &[ExperimentData], params: &ParameterSet, n_obs: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n_obs);
    for exp in experiments {
        let fitted = predict_series(&exp.times, params, &exp.conditions());
        out.extend(fitted.iter().zip(exp.c_a.iter()).map(|(f, o)| f - o));
    }
    out
}

/// Scaled pseudo-inverse covariance.
///
/// Degenerate outcomes are encoded in the values, never as an error:
/// - `n <= 4`: no residual degrees of freedom, every entry is `+inf`
/// - non-finite Jacobian: every entry is `NaN`
/// - rank deficiency: rows/columns of parameters that load on a discarded
///   direction are `NaN`; the rest stay finite
pub fn covariance_from_jacobian(
    jacobian: &DMatrix<f64>,
    sse: f64,
    n_obs: usize,
) -> [[f64; N_PARAMS]; N_PARAMS] {
    if n_obs <= N_PARAMS {
        warn!("{n_obs} observations for {N_PARAMS} parameters; covariance is undefined");
        return [[f64::INFINITY; N_PARAMS]; N_PARAMS];
    }
    let Some(pinv) = normal_pseudo_inverse(jacobian) else {
        warn!("Jacobian at the optimum is not finite; covariance is undefined");
        return [[f64::NAN; N_PARAMS]; N_PARAMS];
    };

    let s_sq = sse / (n_obs - N_PARAMS) as f64;
    let mut cov = [[0.0; N_PARAMS]; N_PARAMS];
    for (i, row) in cov.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = pinv.matrix[(i, j)] * s_sq;
        }
    }

    for dir in &pinv.null_space {
        for (p, name) in PARAM_NAMES.iter().enumerate() {
            if dir[p].abs() > NULL_SPACE_LOADING {
                warn!("{name} is not determined by the data");
                for k in 0..N_PARAMS {
                    cov[p][k] = f64::NAN;
                    cov[k][p] = f64::NAN;
                }
            }
        }
    }

    cov
}

/// `sqrt(diag(cov))`; negative or non-finite variances give `NaN`.
pub fn standard_errors(cov: &[[f64; N_PARAMS]; N_PARAMS]) -> [f64; N_PARAMS] {
    let mut out = [f64::NAN; N_PARAMS];
    for (i, v) in out.iter_mut().enumerate() {
        let var = cov[i][i];
        if var.is_finite() && var >= 0.0 {
            *v = var.sqrt();
        }
    }
    out
}

/// Observed vs fitted for every point.
pub fn compute_residuals(experiments: &[ExperimentData], params: &ParameterSet) -> Vec<PointResidual> {
    let mut out = Vec::new();
    for (idx, exp) in experiments.iter().enumerate() {
        let fitted = predict_series(&exp.times, params, &exp.conditions());
        for ((&time, &c_a_obs), &c_a_fit) in exp.times.iter().zip(exp.c_a.iter()).zip(fitted.iter()) {
            out.push(PointResidual {
                experiment: idx,
                temperature: exp.temperature,
                time,
                c_a_obs,
                c_a_fit,
                residual: c_a_obs - c_a_fit,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::{REFERENCE_GUESS, REFERENCE_TRUTH, reference_experiments};
    use crate::domain::Termination;
    use crate::models::concentration_a;

    /// Noise-free copies of the reference experiments.
    fn exact_experiments(truth: &ParameterSet) -> Vec<ExperimentData> {
        reference_experiments()
            .into_iter()
            .map(|mut exp| {
                let cond = exp.conditions();
                exp.c_a = exp.times.iter().map(|&t| concentration_a(t, truth, &cond)).collect();
                exp
            })
            .collect()
    }

    #[test]
    fn recovers_exact_parameters_from_noise_free_data() {
        let truth = REFERENCE_TRUTH;
        let exps = exact_experiments(&truth);
        let guess = ParameterSet::new(6.5, 47.0, -12000.0, -45.0);

        let fit = calibrate(&exps, &guess, &SolverOptions::default()).unwrap();
        for (got, want) in fit.parameters.to_array().iter().zip(truth.to_array().iter()) {
            assert_relative_eq!(*got, *want, max_relative = 1e-6);
        }
        assert!(fit.quality.sse < 1e-12);
    }

    #[test]
    fn single_temperature_fit_converges_with_usable_covariance() {
        let exps = reference_experiments();
        let fit = calibrate(&exps[..1], &REFERENCE_GUESS, &SolverOptions::default()).unwrap();

        assert!(fit.parameters.is_finite());
        for i in 0..N_PARAMS {
            assert!(fit.covariance[i][i] >= 0.0, "diag[{i}] = {}", fit.covariance[i][i]);
        }
        assert_eq!(fit.quality.n, 10);
        assert_eq!(fit.quality.dof, 6);
        assert!(fit.quality.rmse < 0.1);
    }

    #[test]
    fn pooled_fit_lands_within_three_standard_errors_of_truth() {
        let exps = reference_experiments();
        let fit = calibrate(&exps, &REFERENCE_GUESS, &SolverOptions::default()).unwrap();

        assert!(!fit.is_degenerate());
        let se = fit.standard_errors();
        let z = crate::fit::discrepancy(&fit.parameters, &se, &REFERENCE_TRUTH);
        for (i, zi) in z.iter().enumerate() {
            assert!(zi.abs() < 3.0, "{} z = {zi}", PARAM_NAMES[i]);
        }
        assert_eq!(fit.quality.n, 30);
        assert!(fit.quality.iterations >= 1);
        assert_ne!(fit.quality.termination, Termination::ExactFit);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = calibrate(&[], &REFERENCE_GUESS, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, CalibrationError::EmptyData);
    }

    #[test]
    fn mismatched_arrays_fail_fast() {
        let mut exps = reference_experiments();
        exps[0].c_a.pop();
        let err = calibrate(&exps, &REFERENCE_GUESS, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, CalibrationError::ShapeMismatch { expected: 10, found: 9 });
    }

    #[test]
    fn overflowing_start_is_a_fit_failure() {
        let exps = reference_experiments();
        let guess = ParameterSet::new(400.0, 45.0, -10000.0, -50.0);
        let err = calibrate(&exps, &guess, &SolverOptions::default()).unwrap_err();
        assert_eq!(err, CalibrationError::NonFiniteStart);
    }

    #[test]
    fn non_finite_observation_is_an_input_error() {
        let mut exps = reference_experiments();
        exps[1].c_a[4] = f64::NAN;
        let err = calibrate(&exps, &REFERENCE_GUESS, &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidConditions(_)), "{err:?}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn overflow_during_the_search_is_only_a_rejected_step() {
        // dH = +50 kJ/mol pushes kr toward overflow on early trial steps.
        let exps = reference_experiments();
        let far = ParameterSet::new(6.0, 45.0, 50000.0, -50.0);
        let fit = calibrate(&exps, &far, &SolverOptions::default()).unwrap();
        let reference = calibrate(&exps, &REFERENCE_GUESS, &SolverOptions::default()).unwrap();

        assert!(fit.parameters.is_finite());
        assert!(!fit.is_degenerate());
        for (got, want) in fit
            .parameters
            .to_array()
            .iter()
            .zip(reference.parameters.to_array().iter())
        {
            assert_relative_eq!(*got, *want, max_relative = 1e-3);
        }
        let z = crate::fit::discrepancy(&fit.parameters, &fit.standard_errors(), &REFERENCE_TRUTH);
        assert!(z.iter().all(|zi| zi.abs() < 3.0), "z = {z:?}");
    }

    #[test]
    fn stalled_fit_from_a_far_start_is_detectably_degenerate() {
        // At Ea = 200 kJ/mol the reaction is frozen: every Jacobian column vanishes.
        let exps = reference_experiments();
        let guess = ParameterSet::new(6.0, 200.0, -10000.0, -50.0);
        let fit = calibrate(&exps, &guess, &SolverOptions::default()).unwrap();

        assert!(fit.is_degenerate());
        assert!(fit.standard_errors().iter().all(|se| se.is_nan()));
        assert_eq!(fit.quality.n, 30);
    }

    #[test]
    fn covariance_flags_undetermined_parameters() {
        // dS has no influence on the residuals here.
        let j = DMatrix::from_row_slice(
            6,
            4,
            &[
                1.0, 0.0, 0.5, 0.0, //
                0.0, 1.0, 0.2, 0.0, //
                1.0, 1.0, 0.0, 0.0, //
                2.0, 0.0, 1.0, 0.0, //
                0.0, 3.0, 0.1, 0.0, //
                1.0, 0.5, 2.0, 0.0,
            ],
        );
        let cov = covariance_from_jacobian(&j, 0.2, 6);
        let se = standard_errors(&cov);
        assert!(se[0].is_finite() && se[1].is_finite() && se[2].is_finite());
        assert!(se[3].is_nan());
    }

    #[test]
    fn covariance_without_degrees_of_freedom_is_infinite() {
        let j = DMatrix::<f64>::identity(4, 4);
        let cov = covariance_from_jacobian(&j, 0.0, 4);
        assert!(cov.iter().flatten().all(|v| *v == f64::INFINITY));
        assert!(standard_errors(&cov).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn covariance_from_non_finite_jacobian_is_nan() {
        let mut j = DMatrix::<f64>::identity(6, 4);
        j[(2, 1)] = f64::INFINITY;
        let cov = covariance_from_jacobian(&j, 1.0, 6);
        assert!(cov.iter().flatten().all(|v| v.is_nan()));
    }

    #[test]
    fn residuals_follow_experiment_order() {
        let exps = reference_experiments();
        let res = compute_residuals(&exps, &REFERENCE_TRUTH);
        assert_eq!(res.len(), 30);
        assert_eq!(res[0].experiment, 0);
        assert_eq!(res[29].experiment, 2);
        assert_eq!(res[10].time, exps[1].times[0]);
        for r in &res {
            assert_relative_eq!(r.residual, r.c_a_obs - r.c_a_fit);
            assert!(r.residual.abs() < 0.25);
        }
    }
}
