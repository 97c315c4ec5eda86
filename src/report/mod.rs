//! Reporting utilities: fit summaries, parameter tables and residuals.

pub mod format;

pub use format::*;
