//! `kinetics-fit` library crate.
//!
//! Calibrates the reversible first-order reaction `A ⇌ B` against measured
//! concentration data: Levenberg–Marquardt fit of `logA`, `Ea`, `dH`, `dS`,
//! covariance-based standard errors, and a z-score comparison against known
//! parameters.
//!
//! The binary (`kfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
