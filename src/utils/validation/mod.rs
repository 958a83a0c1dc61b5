//! Validation utilities for pipeline parameters

pub mod numeric;

pub use numeric::{NumericValidator, MAX_SIGMA};
