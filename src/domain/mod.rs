//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the physical parameter vector (`ParameterSet`) and reaction conditions
//! - experiment records (`ExperimentData`)
//! - fit outputs (`FitResult`, `FitQuality`, `PointResidual`, etc.)
//! - run configuration and the JSON file schemas

pub mod types;

pub use types::*;
