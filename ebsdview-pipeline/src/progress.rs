//! Progress counters and per-pattern status.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ebsdview_core::{Error, PatternStatus, Result};

/// Finished count, run maximum and one [`PatternStatus`] per pattern.
///
/// The finished count and the status list sit behind separate locks so a
/// worker updating one never waits on the other.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    finished: Mutex<usize>,
    maximum: AtomicUsize,
    statuses: Mutex<Vec<PatternStatus>>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares a run of `count` patterns: clears the finished count and
    /// marks every pattern [`PatternStatus::WaitingToLoad`].
    pub fn reset(&self, count: usize) {
        *relock(&self.finished) = 0;
        self.maximum.store(count, Ordering::SeqCst);
        let mut statuses = relock(&self.statuses);
        statuses.clear();
        statuses.resize(count, PatternStatus::WaitingToLoad);
    }

    /// Records one finished pattern and returns the new count.
    pub fn increment_finished(&self) -> usize {
        let mut finished = relock(&self.finished);
        *finished += 1;
        *finished
    }

    #[must_use]
    pub fn finished(&self) -> usize {
        *relock(&self.finished)
    }

    #[must_use]
    pub fn maximum(&self) -> usize {
        self.maximum.load(Ordering::SeqCst)
    }

    /// Moves pattern `index` to `status`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] for an unknown index and
    /// [`Error::InvalidStatusTransition`] if the change is not allowed.
    pub fn set_status(&self, index: usize, status: PatternStatus) -> Result<()> {
        let mut statuses = relock(&self.statuses);
        let count = statuses.len();
        let current = statuses
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, count })?;
        if !current.can_transition_to(status) {
            log::warn!("rejected status change for pattern {index}: {current} -> {status}");
            return Err(Error::InvalidStatusTransition {
                index,
                from: *current,
                to: status,
            });
        }
        *current = status;
        Ok(())
    }

    #[must_use]
    pub fn status(&self, index: usize) -> Option<PatternStatus> {
        relock(&self.statuses).get(index).copied()
    }

    /// Copy of every pattern status.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PatternStatus> {
        relock(&self.statuses).clone()
    }
}
