//! Top-level encode/decode between CUBE text and `.cubez` archives.

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::archive::{archive_to_cube, cube_to_archive};
use crate::config::{DecodeOptions, EncodeOptions};
use crate::cube::{parse_header, render_cube, scan_samples, LineReader};
use crate::ops::signlog::{decompose, recompose};
use crate::types::cube::{CubeError, CubeHeader, SampleArrays};
use crate::types::threshold::ThresholdSpec;

pub const ARCHIVE_EXTENSION: &str = "cubez";
pub const CUBE_EXTENSION: &str = "cube";

/// Parse CUBE text and split its samples into signs and log magnitudes.
pub fn encode(
    text: &str,
    threshold: &ThresholdSpec,
) -> Result<(CubeHeader, SampleArrays), CubeError> {
    let mut lines = LineReader::new(text);
    let header = parse_header(&mut lines)?;
    let dims = header.dims();
    log::debug!(
        "header parsed: {} atoms, orbital={}, grid {:?}, volumetric data from line {}",
        header.natoms(),
        header.is_orbital(),
        dims.as_slice(),
        lines.line_no() + 1
    );

    let values = scan_samples(lines.remainder(), &dims)?;
    Ok((header, decompose(values, threshold)))
}

/// Render a header and its decomposed samples as CUBE text.
pub fn decode(header: &CubeHeader, samples: &SampleArrays, precision: usize) -> String {
    render_cube(header, &recompose(samples), precision)
}

pub fn cube_to_archive_bytes(text: &str, options: &EncodeOptions) -> Result<Vec<u8>, CubeError> {
    options.validate()?;
    let (header, samples) = encode(text, &options.threshold)?;
    cube_to_archive(&header, &samples, options.truncate, options.compression)
}

pub fn archive_bytes_to_cube(bytes: &[u8], options: &DecodeOptions) -> Result<String, CubeError> {
    options.validate()?;
    let (header, samples) = archive_to_cube(bytes)?;
    Ok(decode(&header, &samples, options.precision))
}

/// Compress `path` into `<stem>.cubez` beside it, returning the new path.
///
/// Nothing is written unless the whole file parses.
pub fn cube_file_to_archive(path: &Path, options: &EncodeOptions) -> Result<PathBuf, CubeError> {
    let text = fs::read_to_string(path)?;
    let bytes = cube_to_archive_bytes(&text, options)?;
    let out = archive_path(path);
    replace_file(&out, &bytes)?;
    log::info!(
        "{} -> {} ({} -> {} bytes)",
        path.display(),
        out.display(),
        text.len(),
        bytes.len()
    );
    Ok(out)
}

/// Expand `path` into `<stem>.cube` beside it, returning the new path.
pub fn archive_file_to_cube(path: &Path, options: &DecodeOptions) -> Result<PathBuf, CubeError> {
    let bytes = fs::read(path)?;
    let text = archive_bytes_to_cube(&bytes, options)?;
    let out = cube_path(path);
    replace_file(&out, text.as_bytes())?;
    log::info!(
        "{} -> {} ({} -> {} bytes)",
        path.display(),
        out.display(),
        bytes.len(),
        text.len()
    );
    Ok(out)
}

pub fn archive_path(cube: &Path) -> PathBuf {
    cube.with_extension(ARCHIVE_EXTENSION)
}

pub fn cube_path(archive: &Path) -> PathBuf {
    archive.with_extension(CUBE_EXTENSION)
}

/// Write `bytes` to `path`, removing whatever was there first.
pub fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), CubeError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}
