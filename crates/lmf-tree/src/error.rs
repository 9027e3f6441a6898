//! Error type shared by tree construction, extraction and the codec.

use thiserror::Error;

/// Result type for partitioning and export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while partitioning or exporting a mesh.
///
/// Every error is terminal for the export call that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// The geometry source is unusable: no geometry at all, non-triangle
    /// polygons, or indices pointing outside the source buffers.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A requested vertex channel is not available on the source geometry.
    #[error("Vertex format mismatch: {0}")]
    FormatMismatch(String),

    /// Build or export parameters are out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A count or index does not fit the 16-bit fields of the binary layout.
    #[error("{what} ({count}) does not fit in a 16-bit field")]
    CountOverflow { what: &'static str, count: usize },

    /// A binary file could not be decoded.
    #[error("Malformed file: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Checks that `count` fits a `u16` field, naming the field on failure.
    pub(crate) fn check_u16(what: &'static str, count: usize) -> Result<u16> {
        u16::try_from(count).map_err(|_| Error::CountOverflow { what, count })
    }
}
