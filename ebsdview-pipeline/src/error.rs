//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A generation run was requested while the previous one is still active.
    #[error("pattern generation is already running")]
    RunInProgress,

    /// Pattern generation was requested before a master file was loaded.
    #[error("no master pattern file has been loaded")]
    NoMasterData,

    /// The master file was read but holds no energy levels.
    #[error("The master file '{}' contains no energy levels.", .0.display())]
    NoEnergyLevels(PathBuf),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Input validation or file error.
    #[error(transparent)]
    Io(#[from] ebsdview_io::Error),

    /// Core library error.
    #[error(transparent)]
    Core(#[from] ebsdview_core::Error),
}
