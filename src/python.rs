//! Python bindings for file and byte-level conversion.

use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::codec;
use crate::config::{
    DecodeOptions, EncodeOptions, DEFAULT_COMPRESSION, DEFAULT_PRECISION, DEFAULT_TRUNCATE,
};
use crate::types::cube::CubeError;

fn to_py_err(e: CubeError) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
}

/// Compress a `.cube` file, returning the path of the written archive.
#[pyfunction]
#[pyo3(signature = (path, truncate=DEFAULT_TRUNCATE, compression=DEFAULT_COMPRESSION))]
pub fn cube_to_archive(path: PathBuf, truncate: u32, compression: u32) -> PyResult<PathBuf> {
    let options = EncodeOptions {
        truncate,
        compression,
        ..Default::default()
    };
    codec::cube_file_to_archive(&path, &options).map_err(to_py_err)
}

/// Expand a `.cubez` archive, returning the path of the written `.cube` file.
#[pyfunction]
#[pyo3(signature = (path, precision=DEFAULT_PRECISION))]
pub fn archive_to_cube(path: PathBuf, precision: usize) -> PyResult<PathBuf> {
    codec::archive_file_to_cube(&path, &DecodeOptions { precision }).map_err(to_py_err)
}

#[pyfunction]
pub fn encode_cube_bytes<'py>(py: Python<'py>, text: &str) -> PyResult<Bound<'py, PyBytes>> {
    let bytes =
        codec::cube_to_archive_bytes(text, &EncodeOptions::default()).map_err(to_py_err)?;
    Ok(PyBytes::new(py, &bytes))
}

#[pyfunction]
#[pyo3(signature = (data, precision=DEFAULT_PRECISION))]
pub fn decode_archive_bytes(data: &[u8], precision: usize) -> PyResult<String> {
    codec::archive_bytes_to_cube(data, &DecodeOptions { precision }).map_err(to_py_err)
}
