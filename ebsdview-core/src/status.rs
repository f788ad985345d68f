//! Per-pattern load status.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Load status of one detector pattern in the pattern list.
///
/// Within a run a pattern moves `WaitingToLoad -> Loading -> {Loaded, Error}`.
/// Any status may be reset to `WaitingToLoad` when a new run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PatternStatus {
    /// Never scheduled.
    #[default]
    NotStarted,
    /// Queued in the current run.
    WaitingToLoad,
    /// Claimed by a worker.
    Loading,
    /// Generated successfully.
    Loaded,
    /// Generation failed or was aborted.
    Error,
}

impl PatternStatus {
    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(self, next: PatternStatus) -> bool {
        matches!(
            (self, next),
            (_, PatternStatus::WaitingToLoad)
                | (PatternStatus::WaitingToLoad, PatternStatus::Loading)
                | (
                    PatternStatus::Loading,
                    PatternStatus::Loaded | PatternStatus::Error
                )
        )
    }

    /// Returns true once a pattern can no longer change within its run.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, PatternStatus::Loaded | PatternStatus::Error)
    }
}

impl std::fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternStatus::NotStarted => write!(f, "Not Started"),
            PatternStatus::WaitingToLoad => write!(f, "Waiting to Load"),
            PatternStatus::Loading => write!(f, "Loading"),
            PatternStatus::Loaded => write!(f, "Loaded"),
            PatternStatus::Error => write!(f, "Error"),
        }
    }
}
