//! ebsdview-io: File input for ebsdview.
//!
//! This crate validates master-pattern paths, reads Euler-angle lists and,
//! with the `hdf5` feature, reads master-pattern files.
//!

pub mod angles;
mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod validate;

pub use angles::{parse_angles, read_angle_file};
pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{read_master_pattern, write_master_pattern, Hdf5MasterPatternReader};
pub use validate::{complete_suffix, path_summary, validate_master_path, MASTER_FILE_SUFFIXES};
