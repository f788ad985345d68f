//! Workbench event types.
//!
//! Events are sent from the controller and the scheduler's worker threads to
//! whoever owns the receiving end of the channel (a UI or the CLI).

use ebsdview_core::ImageData;

/// Events emitted by [`PatternDisplayController`](crate::PatternDisplayController)
/// and [`PatternScheduler`](crate::PatternScheduler).
#[derive(Debug, Clone, PartialEq)]
pub enum WorkbenchEvent {
    /// Informational text line.
    StdOutput(String),

    /// Error text line.
    Error(String),

    /// Energy (keV) of every master-pattern bin after a file load.
    EnergyLevelsChanged(Vec<f32>),

    /// Valid 1-based energy-bin range for the default projection.
    ImageRangeChanged { min: usize, max: usize },

    /// Every display-cache slot has been populated.
    MasterMonteCarloFinished,

    /// All worker tasks of a generation run have returned.
    PatternGenerationFinished,

    /// Number of finished patterns in the current run.
    ProgressValue(usize),

    /// Number of patterns in the current run.
    ProgressMaximum(usize),

    /// The status of a pattern row changed.
    RowChanged(usize),

    /// A detector pattern has been rendered.
    PatternImageReady { index: usize, image: ImageData },

    /// Response to a master-pattern display request.
    MasterImageReady(ImageData),

    /// Response to a Monte-Carlo display request.
    MonteCarloImageReady(ImageData),
}
