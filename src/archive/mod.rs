//! Compressed named-dataset store behind `.cubez` files.

pub mod container;
mod encoding;
pub mod error;
mod msgpack;

pub use container::{Archive, ArchiveWriter, DatasetValue, Filters, FORMAT_NAME, FORMAT_VERSION};
pub use error::ArchiveError;
