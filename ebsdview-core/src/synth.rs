//! Detector-pattern synthesizer interface.

use crate::cancel::CancellationToken;
use crate::detector::{DetectorData, PatternDisplayData};
use crate::error::Result;

/// Input for synthesizing one detector pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternRequest<'a> {
    /// Pattern index within the run.
    pub index: usize,
    /// Bunge Euler angles `(phi1, Phi, phi2)` in radians.
    pub euler: [f32; 3],
    pub detector: &'a DetectorData,
    pub display: &'a PatternDisplayData,
}

/// A simulated detector pattern in row-major order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorPattern {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

/// Computes detector patterns.
///
/// Implementations are CPU-bound and called concurrently from the scheduler's
/// worker threads. They must check `cancel` at regular checkpoints and return
/// [`Error::Cancelled`](crate::Error::Cancelled) once it is set.
pub trait PatternSynthesizer: Send + Sync {
    /// Synthesizes the pattern described by `request`.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid or the work was cancelled.
    fn synthesize(
        &self,
        request: &PatternRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<DetectorPattern>;
}
