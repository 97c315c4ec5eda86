//! Closed-form batch trajectory for `A ⇌ B`.
//!
//! Rate constants:
//!
//! ```text
//! kf = 10^logA · exp(-Ea·1000 / (R·T))
//! kr = kf / exp((dH - T·dS) / (R·T))
//! ```
//!
//! With `k = kf + kr` and the equilibrium level `Ca_eq = kr·(cA0 + cB0) / k`,
//! the linear ODE `dCa/dt = kr·Cb - kf·Ca` integrates to:
//!
//! ```text
//! Ca(t) = Ca_eq + (cA0 - Ca_eq)·exp(-k·t)
//! ```
//!
//! Nothing here clamps or validates. Implausible parameters overflow to
//! `inf`/`NaN` and the solver treats that as a bad step.

use crate::domain::{ParameterSet, ReactionConditions};

/// Gas constant (J/mol/K).
pub const GAS_CONSTANT: f64 = 8.314;

/// Forward and reverse first-order rate constants (1/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateConstants {
    pub kf: f64,
    pub kr: f64,
}

impl RateConstants {
    /// Relaxation rate `kf + kr`.
    pub fn total(self) -> f64 {
        self.kf + self.kr
    }
}

/// Evaluate both rate constants at temperature `t_kelvin`.
pub fn rate_constants(params: &ParameterSet, t_kelvin: f64) -> RateConstants {
    let rt = GAS_CONSTANT * t_kelvin;
    let kf = 10f64.powf(params.log_a) * (-params.ea * 1000.0 / rt).exp();
    let kr = kf / ((params.dh - t_kelvin * params.ds) / rt).exp();
    RateConstants { kf, kr }
}

/// Equilibrium constant `Kc = kf / kr`.
pub fn equilibrium_constant(params: &ParameterSet, t_kelvin: f64) -> f64 {
    let k = rate_constants(params, t_kelvin);
    k.kf / k.kr
}

/// Long-time limit of `Ca`.
pub fn equilibrium_concentration(params: &ParameterSet, cond: &ReactionConditions) -> f64 {
    let k = rate_constants(params, cond.temperature);
    k.kr * (cond.c_a0 + cond.c_b0) / k.total()
}

/// Predicted concentration of A at time `t`.
pub fn concentration_a(t: f64, params: &ParameterSet, cond: &ReactionConditions) -> f64 {
    let k = rate_constants(params, cond.temperature);
    concentration_a_with(t, k, cond)
}

/// Predicted concentration of B at time `t` (mass balance).
pub fn concentration_b(t: f64, params: &ParameterSet, cond: &ReactionConditions) -> f64 {
    cond.c_a0 + cond.c_b0 - concentration_a(t, params, cond)
}

/// Predicted `Ca` for every time in `times` (same length and order).
pub fn predict_series(times: &[f64], params: &ParameterSet, cond: &ReactionConditions) -> Vec<f64> {
    // Rate constants do not depend on t; evaluate them once.
    let k = rate_constants(params, cond.temperature);
    times
        .iter()
        .map(|&t| concentration_a_with(t, k, cond))
        .collect()
}

fn concentration_a_with(t: f64, k: RateConstants, cond: &ReactionConditions) -> f64 {
    if t == 0.0 {
        // Exact initial condition, even when the rate constants overflow.
        return cond.c_a0;
    }
    let total = k.total();
    let eq = k.kr * (cond.c_a0 + cond.c_b0) / total;
    eq + (cond.c_a0 - eq) * (-total * t).exp()
}
