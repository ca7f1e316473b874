//! Gaussian CUBE text format: header parsing, volumetric scanning and writing.
//!
//! ```ignore
//! let mut lines = cubez::cube::LineReader::new(&text);
//! let header = cubez::cube::parse_header(&mut lines)?;
//! let grid = cubez::cube::scan_samples(lines.remainder(), &header.dims())?;
//! ```

pub mod header;
pub mod scan;
pub mod tokens;
pub mod write;

pub use header::parse_header;
pub use scan::{scan_samples, SciTokens};
pub use tokens::{Fields, LineReader};
pub use write::{exp_format, render_cube, write_header};
