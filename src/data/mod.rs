//! Experiment data sources.
//!
//! - bundled reference experiments and their ground truth (`reference`)
//! - seeded synthetic experiment generation (`synthetic`)

pub mod reference;
pub mod synthetic;

pub use reference::*;
pub use synthetic::*;
