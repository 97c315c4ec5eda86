//! SVD-based least squares helpers.
//!
//! Two small dense problems come up repeatedly:
//!
//! ```text
//! minimize ‖A x - b‖²            (damped Levenberg–Marquardt step)
//! (JᵀJ)⁺ = V Σ⁻² Vᵀ              (parameter covariance)
//! ```
//!
//! Both go through a thin SVD. Singular values below
//! `ε · max(rows, cols) · σ_max` are treated as zero, so rank-deficient
//! systems return the minimum-norm solution instead of blowing up. The
//! discarded directions are reported so callers can flag what the data
//! does not determine.

use nalgebra::{DMatrix, DVector};

/// Cutoff below which singular values are discarded.
fn rank_tolerance(rows: usize, cols: usize, sigma_max: f64) -> f64 {
    f64::EPSILON * rows.max(cols) as f64 * sigma_max
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the inputs are non-finite or the solve fails.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    let (rows, cols) = a.shape();
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let tol = rank_tolerance(rows, cols, sigma_max);

    let x = svd.solve(b, tol).ok()?;
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Moore–Penrose inverse of `JᵀJ` plus the directions it had to discard.
#[derive(Debug, Clone)]
pub struct NormalPseudoInverse {
    pub matrix: DMatrix<f64>,
    /// Right singular vectors whose singular value fell below the cutoff.
    pub null_space: Vec<DVector<f64>>,
}

/// Moore–Penrose inverse of `JᵀJ`, computed from the SVD of `J`.
///
/// The result is symmetric positive semi-definite by construction, so its
/// diagonal is never negative. Returns `None` if `J` holds non-finite values
/// or has fewer rows than columns.
pub fn normal_pseudo_inverse(j: &DMatrix<f64>) -> Option<NormalPseudoInverse> {
    if j.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (rows, cols) = j.shape();
    if rows < cols {
        return None;
    }
    let svd = j.clone().svd(false, true);
    let v_t = svd.v_t?;
    let sigma = &svd.singular_values;
    let tol = rank_tolerance(rows, cols, sigma.max());

    let mut matrix = DMatrix::<f64>::zeros(cols, cols);
    let mut null_space = Vec::new();
    for (k, &s) in sigma.iter().enumerate() {
        let v = v_t.row(k).transpose();
        if s <= tol || s == 0.0 {
            null_space.push(v);
            continue;
        }
        matrix += (&v * v.transpose()) / (s * s);
    }
    Some(NormalPseudoInverse { matrix, null_space })
}
