//! Input/output helpers.
//!
//! - experiment JSON read/write + validation (`experiments`)
//! - fit JSON read/write with fitted grids (`curve`)
//! - residual CSV export (`export`)

pub mod curve;
pub mod experiments;
pub mod export;

pub use curve::*;
pub use experiments::*;
pub use export::*;
