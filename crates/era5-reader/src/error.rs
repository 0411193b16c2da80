//! Error types for reading ERA5 grids.

use thiserror::Error;

/// Result type for ERA5 reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Error types for opening and scanning ERA5 sources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// The file could not be opened as NetCDF
    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    /// Missing required dimension or variable
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Variable has an unexpected shape or element count
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// A per-timestamp slice could not be read
    #[error("Failed to read {metric} at time index {index}: {reason}")]
    SliceRead {
        metric: &'static str,
        index: usize,
        reason: String,
    },
}
