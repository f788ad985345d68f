//! Error types for ebsdview-core.

use thiserror::Error;

use crate::status::PatternStatus;

/// Result type alias for ebsdview operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for ebsdview operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Image dimensions with a zero extent.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Requested slice lies past the end of the data buffer.
    #[error("slice {slice} of {width}x{height} exceeds buffer of {len} values")]
    SliceOutOfRange {
        slice: usize,
        width: usize,
        height: usize,
        len: usize,
    },

    /// Pattern status change that is not allowed within a run.
    #[error("invalid status transition for pattern {index}: {from} -> {to}")]
    InvalidStatusTransition {
        index: usize,
        from: PatternStatus,
        to: PatternStatus,
    },

    /// Pattern index outside the current run.
    #[error("pattern index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Euler angle buffer whose length is not a multiple of three.
    #[error("euler angle list of length {0} is not a multiple of 3")]
    InvalidAngleCount(usize),

    /// Detector geometry error.
    #[error("invalid detector parameters: {0}")]
    InvalidDetector(String),

    /// Master pattern arrays inconsistent with their dimensions.
    #[error("invalid master pattern data: {0}")]
    InvalidMasterData(String),

    /// Master pattern file could not be read.
    #[error("failed to read master pattern file: {0}")]
    ReadError(String),

    /// Work observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,
}
