//! ebsdview-projection: Projection math and detector-pattern synthesis.
//!
//! This crate provides:
//! - **Modified Lambert** mapping between the unit sphere and the square
//!   grids master patterns are stored on
//! - **Projection conversion** of Lambert squares into Lambert-circle and
//!   stereographic images
//! - **De-hyperslabbing** of Monte-Carlo energy histograms
//! - **`LambertSynthesizer`**, the default [`PatternSynthesizer`]
//!
//! [`PatternSynthesizer`]: ebsdview_core::PatternSynthesizer
#![warn(missing_docs)]

mod conversion;
mod hyperslab;
pub mod lambert;
pub mod rotation;
mod synthesizer;

pub use conversion::{convert_square_slice, convert_square_stack, ProjectionType};
pub use hyperslab::de_hyperslab;
pub use synthesizer::LambertSynthesizer;
