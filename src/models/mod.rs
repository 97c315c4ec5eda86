//! Reversible first-order A⇌B kinetics.
//!
//! The model is implemented as small, pure functions so that the calibration code
//! can stay generic.

pub mod model;

pub use model::*;
