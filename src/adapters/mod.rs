//! Adapters between the CUBE model and storage formats.

pub mod archive;

pub use archive::{archive_to_cube, cube_to_archive};
