//! I/O error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No master file path was given.
    #[error("The master file path must be set.")]
    MissingPath,

    /// The master file path does not exist.
    #[error("The master file path '{}' does not exist.", .0.display())]
    NotFound(PathBuf),

    /// The master file path does not carry an HDF5 suffix.
    #[error("The master file path '{}' is not an HDF5 file.", .0.display())]
    NotHdf5(PathBuf),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] ebsdview_core::Error),
}
