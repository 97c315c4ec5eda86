//! Numerical building blocks: SVD least squares and the Levenberg–Marquardt solver.

pub mod lm;
pub mod lstsq;

pub use lm::*;
pub use lstsq::*;
