//! ebsdview-core: Core types for EBSD pattern display and generation.
//!
//! This crate provides the foundational abstractions shared by the
//! projection, I/O and pipeline crates: pattern status tracking, cooperative
//! cancellation, image generation from raw slices, the master-pattern data
//! model, detector parameters and the synthesizer/loader traits.
//!

pub mod cancel;
pub mod detector;
pub mod error;
pub mod image;
pub mod master;
pub mod status;
pub mod synth;

pub use cancel::CancellationToken;
pub use detector::{DetectorData, PatternDisplayData};
pub use error::{Error, Result};
pub use image::{generate_image, GeneratedImage, ImageData, PixelValue};
pub use master::{format_dims, Hemisphere, MasterPatternData, MasterPatternLoader};
pub use status::PatternStatus;
pub use synth::{DetectorPattern, PatternRequest, PatternSynthesizer};
