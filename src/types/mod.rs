//! Core data types for the cubez crate.

pub mod cube;
pub mod threshold;

// Re-export commonly used items
pub use cube::{
    AxisSpec, CubeError, CubeHeader, Dims, Field, GeomAtom, OrbitalInfo, SampleArrays,
};
pub use threshold::{Band, ThresholdMode, ThresholdSpec};
