//! Shared backlog of pattern indices with jump-ahead requests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ebsdview_core::CancellationToken;

#[derive(Debug, Default)]
struct QueueState {
    backlog: VecDeque<usize>,
    priority: VecDeque<usize>,
    /// `pending[i]` is true until index `i` has been claimed.
    pending: Vec<bool>,
    remaining: usize,
}

impl QueueState {
    fn take(&mut self, index: usize) -> bool {
        if self.pending.get(index).copied().unwrap_or(false) {
            self.pending[index] = false;
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    fn claim(&mut self) -> Option<usize> {
        while let Some(index) = self.priority.pop_front() {
            if self.take(index) {
                return Some(index);
            }
            log::warn!("dropping priority request for pattern {index}: not pending");
        }

        // Backlog entries claimed through the priority list are skipped here.
        while let Some(index) = self.backlog.pop_front() {
            if self.take(index) {
                return Some(index);
            }
        }
        None
    }
}

/// Backlog plus priority overrides behind a single lock.
///
/// Each index of a run is handed out by [`pop`](Self::pop) at most once.
/// Priority entries are drained before the backlog; an entry whose index was
/// already claimed (or never belonged to the run) is dropped when popped.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
}

impl WorkQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new run over `0..count`.
    ///
    /// The backlog is `focus` followed by every other index ascending. An
    /// out-of-range `focus` gives a plain ascending backlog. Pending priority
    /// requests from the previous run are discarded.
    pub fn reset(&self, count: usize, focus: usize) {
        let mut state = self.lock();
        state.priority.clear();
        state.backlog.clear();
        state.backlog.extend(0..count);
        if focus < count {
            state.backlog.retain(|&i| i != focus);
            state.backlog.push_front(focus);
        }
        state.pending.clear();
        state.pending.resize(count, true);
        state.remaining = count;
    }

    /// Requests that `index` be claimed before any backlog entry.
    pub fn push_priority(&self, index: usize) {
        self.lock().priority.push_back(index);
    }

    /// Claims the next index, or `None` once the run is exhausted or
    /// cancellation has been requested.
    ///
    /// `on_claim` runs before the queue lock is released, so whatever it
    /// records happens in claim order across all workers.
    pub fn pop(&self, cancel: &CancellationToken, on_claim: impl FnOnce(usize)) -> Option<usize> {
        let mut state = self.lock();
        if cancel.is_cancelled() {
            return None;
        }
        let index = state.claim()?;
        on_claim(index);
        Some(index)
    }

    /// Number of indices not yet claimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().remaining
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &WorkQueue) -> Vec<usize> {
        let token = CancellationToken::new();
        std::iter::from_fn(|| queue.pop(&token, |_| {})).collect()
    }

    #[test]
    fn test_focus_first() {
        let queue = WorkQueue::new();
        queue.reset(5, 2);
        assert_eq!(drain(&queue), vec![2, 0, 1, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_out_of_range_focus() {
        let queue = WorkQueue::new();
        queue.reset(3, 7);
        assert_eq!(drain(&queue), vec![0, 1, 2]);
    }

    #[test]
    fn test_priority_before_backlog() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.reset(5, 0);
        assert_eq!(queue.pop(&token, |_| {}), Some(0));
        queue.push_priority(3);
        queue.push_priority(1);
        assert_eq!(drain(&queue), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_stale_priority_dropped() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.reset(4, 0);
        assert_eq!(queue.pop(&token, |_| {}), Some(0));
        queue.push_priority(0);
        queue.push_priority(99);
        queue.push_priority(2);
        queue.push_priority(2);
        assert_eq!(drain(&queue), vec![2, 1, 3]);
    }

    #[test]
    fn test_cancelled_pop() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.reset(3, 0);
        token.cancel();
        assert_eq!(queue.pop(&token, |_| {}), None);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_reset_discards_priority() {
        let queue = WorkQueue::new();
        queue.reset(3, 0);
        queue.push_priority(2);
        queue.reset(3, 1);
        assert_eq!(drain(&queue), vec![1, 0, 2]);
    }

    #[test]
    fn test_on_claim_sees_claim_order() {
        let queue = WorkQueue::new();
        let token = CancellationToken::new();
        queue.reset(3, 1);
        let mut seen = Vec::new();
        assert_eq!(queue.pop(&token, |i| seen.push(i)), Some(1));
        assert_eq!(queue.pop(&token, |i| seen.push(i)), Some(0));
        token.cancel();
        assert_eq!(queue.pop(&token, |i| seen.push(i)), None);
        assert_eq!(seen, vec![1, 0]);
    }

    #[test]
    fn test_empty_run() {
        let queue = WorkQueue::new();
        queue.reset(0, 0);
        assert!(drain(&queue).is_empty());
    }
}
