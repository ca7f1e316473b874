//! Lossy archival compression for Gaussian CUBE volumetric files.
//!
//! Samples are thresholded, split into sign and `log10` magnitude, and
//! stored in a gzipped MessagePack `.cubez` archive alongside the header.

pub mod adapters;
pub mod archive;
pub mod codec;
pub mod config;
pub mod cube;
pub mod ops;
pub mod types;

#[cfg(feature = "python")]
pub mod python;

pub use codec::{
    archive_bytes_to_cube, archive_file_to_cube, cube_file_to_archive, cube_to_archive_bytes,
    decode, encode,
};
pub use config::{DecodeOptions, EncodeOptions};
pub use types::{CubeError, CubeHeader, Field, SampleArrays, ThresholdSpec};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule(name = "cubez")]
fn cubez(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(python::cube_to_archive, m)?)?;
    m.add_function(wrap_pyfunction!(python::archive_to_cube, m)?)?;
    m.add_function(wrap_pyfunction!(python::encode_cube_bytes, m)?)?;
    m.add_function(wrap_pyfunction!(python::decode_archive_bytes, m)?)?;
    Ok(())
}
