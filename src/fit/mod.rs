//! Calibration orchestration.
//!
//! Responsibilities:
//!
//! - fit the kinetic parameters to pooled experiments (Levenberg–Marquardt)
//! - turn the Jacobian at the optimum into covariance and standard errors
//! - compare a fit against known parameters (z-scores)
//! - run deterministic multi-start over a grid of starting guesses

pub mod discrepancy;
pub mod fitter;
pub mod selection;
pub mod start_grid;

pub use discrepancy::*;
pub use fitter::*;
pub use selection::*;
pub use start_grid::*;
