//! Shared utilities

pub mod validation;

pub use validation::{NumericValidator, MAX_SIGMA};
