//! Levenberg–Marquardt for small dense nonlinear least squares problems.
//!
//! We minimize `S(x) = Σ r_i(x)²` for a residual function `r: ℝⁿ → ℝᵐ`.
//! Each iteration:
//!
//! - builds a forward-difference Jacobian `J` at the current point
//! - solves the damped step `min ‖J δ + r‖² + λ ‖D^{1/2} δ‖²` via SVD
//!   (`D` = running maximum of squared column norms, Marquardt scaling)
//! - accepts the step if `S` decreases, otherwise raises `λ` and retries
//!
//! A trial point whose residuals are not finite counts as `S = +∞`, so
//! overflow in the model just looks like a bad step.
//!
//! Stopping rules follow MINPACK in spirit:
//! - `ftol`: accepted step reduced `S` by less than `ftol · S`
//! - `xtol`: scaled step length `‖D^{1/2} δ‖ ≤ xtol · (‖D^{1/2} x‖ + xtol)`
//! - `gtol`: largest cosine between `r` and a column of `J` is `≤ gtol`

use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::Termination;
use crate::error::CalibrationError;
use crate::math::lstsq::solve_least_squares;

const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e20;

/// Solver tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Maximum number of outer (Jacobian) iterations.
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Initial damping factor λ.
    pub lambda_init: f64,
    /// Multiplier applied to λ after a rejected step.
    pub lambda_up: f64,
    /// Multiplier applied to λ after an accepted step.
    pub lambda_down: f64,
    /// Relative finite-difference step: `h_j = fd_step · max(|x_j|, 1)`.
    pub fd_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-14,
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            fd_step: f64::EPSILON.sqrt(),
        }
    }
}

/// Converged solver state.
#[derive(Debug, Clone)]
pub struct Solution {
    pub x: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Forward-difference Jacobian at `x` (may hold non-finite entries).
    pub jacobian: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Minimize `Σ r_i(x)²` starting from `x0`.
///
/// Errors:
/// - `EmptyData` if the residual vector is empty
/// - `NonFiniteStart` if `r(x0)` is not finite
/// - `NotConverged` if no stopping rule fires within `max_iterations`
pub fn minimize<F>(
    residual_fn: F,
    x0: &DVector<f64>,
    opts: &SolverOptions,
) -> Result<Solution, CalibrationError>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let n = x0.len();
    let mut evaluations = 0usize;
    let mut eval = |x: &DVector<f64>| -> DVector<f64> {
        evaluations += 1;
        residual_fn(x)
    };

    let mut x = x0.clone();
    let mut r = eval(&x);
    if r.is_empty() {
        return Err(CalibrationError::EmptyData);
    }
    let mut sse = sum_of_squares(&r);
    if !sse.is_finite() {
        return Err(CalibrationError::NonFiniteStart);
    }

    let mut lambda = opts.lambda_init;
    let mut scale = DVector::<f64>::zeros(n);
    let mut iterations = 0usize;

    let termination = 'outer: loop {
        if sse == 0.0 {
            break Termination::ExactFit;
        }
        if iterations >= opts.max_iterations {
            warn!("Levenberg–Marquardt hit the iteration limit ({iterations}); S={sse:.6e}");
            return Err(CalibrationError::NotConverged { iterations });
        }
        iterations += 1;

        let mut jac = forward_jacobian(&mut eval, &x, &r, opts.fd_step);
        zero_non_finite_columns(&mut jac);

        for j in 0..n {
            scale[j] = scale[j].max(jac.column(j).norm_squared());
        }

        if gradient_cosine(&jac, &r, sse) <= opts.gtol {
            break Termination::Gtol;
        }

        // Inner loop: raise λ until a step decreases S.
        loop {
            let step = match damped_step(&jac, &r, &scale, lambda) {
                Some(step) => step,
                None => {
                    lambda *= opts.lambda_up;
                    if lambda > LAMBDA_MAX {
                        return Err(CalibrationError::NotConverged { iterations });
                    }
                    continue;
                }
            };

            let trial = &x + &step;
            let r_trial = eval(&trial);
            let sse_trial = sum_of_squares(&r_trial);

            let step_norm = scaled_norm(&step, &scale);
            let x_norm = scaled_norm(&x, &scale);
            let small_step = step_norm <= opts.xtol * (x_norm + opts.xtol);

            if sse_trial < sse {
                let reduction = sse - sse_trial;
                x = trial;
                r = r_trial;
                sse = sse_trial;
                lambda = (lambda * opts.lambda_down).max(LAMBDA_MIN);
                trace!("iter {iterations}: accepted, S={sse:.6e}, lambda={lambda:.3e}");

                if sse == 0.0 {
                    break 'outer Termination::ExactFit;
                }
                if reduction <= opts.ftol * sse {
                    break 'outer Termination::Ftol;
                }
                if small_step {
                    break 'outer Termination::Xtol;
                }
                break;
            }

            lambda *= opts.lambda_up;
            trace!("iter {iterations}: rejected (S_trial={sse_trial:.6e}), lambda={lambda:.3e}");
            if small_step {
                break 'outer Termination::Xtol;
            }
            if lambda > LAMBDA_MAX {
                return Err(CalibrationError::NotConverged { iterations });
            }
        }
    };

    let jacobian = forward_jacobian(&mut eval, &x, &r, opts.fd_step);
    debug!(
        "Levenberg–Marquardt stopped after {iterations} iterations ({}): S={sse:.6e}",
        termination.display_name()
    );

    Ok(Solution {
        x,
        residuals: r,
        jacobian,
        sse,
        iterations,
        evaluations,
        termination,
    })
}

/// `Σ r_i²`, or `+∞` if any residual is not finite.
pub fn sum_of_squares(r: &DVector<f64>) -> f64 {
    if r.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    r.norm_squared()
}

/// Forward differences; columns that overflow are retried with a backward step.
fn forward_jacobian<F>(eval: &mut F, x: &DVector<f64>, r0: &DVector<f64>, fd_step: f64) -> DMatrix<f64>
where
    F: FnMut(&DVector<f64>) -> DVector<f64>,
{
    let m = r0.len();
    let n = x.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);

    for j in 0..n {
        let h = fd_step * x[j].abs().max(1.0);
        let mut xp = x.clone();
        xp[j] += h;
        let mut rp = eval(&xp);
        let mut hh = h;
        if rp.iter().any(|v| !v.is_finite()) {
            xp[j] = x[j] - h;
            rp = eval(&xp);
            hh = -h;
        }
        for i in 0..m {
            jac[(i, j)] = (rp[i] - r0[i]) / hh;
        }
    }

    jac
}

fn zero_non_finite_columns(jac: &mut DMatrix<f64>) {
    for j in 0..jac.ncols() {
        if jac.column(j).iter().any(|v| !v.is_finite()) {
            warn!("Jacobian column {j} is not finite; freezing that parameter for this iteration");
            jac.column_mut(j).fill(0.0);
        }
    }
}

/// Solve `[J; sqrt(λ D)] δ = [-r; 0]` in the least squares sense.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    scale: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.rows_mut(0, m).copy_from(jac);
    for j in 0..n {
        a[(m + j, j)] = (lambda * scale[j]).sqrt();
    }
    let mut b = DVector::<f64>::zeros(m + n);
    for i in 0..m {
        b[i] = -r[i];
    }
    solve_least_squares(&a, &b)
}

fn scaled_norm(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    v.iter()
        .zip(scale.iter())
        .map(|(vi, di)| vi * vi * di)
        .sum::<f64>()
        .sqrt()
}

fn gradient_cosine(jac: &DMatrix<f64>, r: &DVector<f64>, sse: f64) -> f64 {
    let g = jac.tr_mul(r);
    let r_norm = sse.sqrt();
    let mut worst = 0.0_f64;
    for j in 0..jac.ncols() {
        let col_norm = jac.column(j).norm();
        if col_norm > 0.0 {
            worst = worst.max(g[j].abs() / (col_norm * r_norm));
        }
    }
    worst
}
