//! Numeric transforms on volumetric samples.

pub mod signlog;

pub use signlog::{decompose, recompose};
