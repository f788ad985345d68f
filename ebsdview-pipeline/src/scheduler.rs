//! Fixed-size worker pool generating detector patterns.
//!
//! A run hands every pattern index to exactly one of `T` worker tasks on a
//! dedicated rayon pool. Workers claim indices from the shared
//! [`WorkQueue`], synthesize and render outside the queue lock, and report
//! through [`ProgressReporter`] and the event channel. The last worker to
//! return clears the cancellation flag and emits
//! [`WorkbenchEvent::PatternGenerationFinished`].

use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use ebsdview_core::{
    generate_image, CancellationToken, DetectorData, Error as CoreError, ImageData,
    PatternDisplayData, PatternRequest, PatternStatus, PatternSynthesizer,
};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::message::WorkbenchEvent;
use crate::progress::ProgressReporter;
use crate::work_queue::WorkQueue;
use crate::{Error, Result};

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SchedulerConfig {
    /// Number of worker tasks per run (0 = one per logical CPU).
    pub num_threads: usize,
    /// Name given to the pool's threads.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            thread_name: "ebsdview-worker".into(),
        }
    }
}

/// Counts down from the number of workers in a run.
#[derive(Debug, Default)]
struct CountdownLatch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl CountdownLatch {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms the latch for `count` workers unless a run is still active.
    fn try_arm(&self, count: usize) -> bool {
        let mut remaining = self.lock();
        if *remaining > 0 {
            return false;
        }
        *remaining = count;
        true
    }

    /// Runs `on_zero` under the latch lock when the last worker arrives, so
    /// waiters only wake after it has completed.
    fn count_down(&self, on_zero: impl FnOnce()) {
        let mut remaining = self.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            on_zero();
            self.zero.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.lock();
        while *remaining > 0 {
            remaining = self
                .zero
                .wait(remaining)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn is_open(&self) -> bool {
        *self.lock() == 0
    }
}

/// State shared by the worker tasks of one run.
struct RunContext {
    queue: Arc<WorkQueue>,
    progress: Arc<ProgressReporter>,
    latch: Arc<CountdownLatch>,
    cancel: CancellationToken,
    events: Sender<WorkbenchEvent>,
    synthesizer: Arc<dyn PatternSynthesizer>,
    detector: DetectorData,
    display: PatternDisplayData,
}

impl RunContext {
    fn emit(&self, event: WorkbenchEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.events.send(event);
    }

    fn set_status(&self, index: usize, status: PatternStatus) {
        if let Err(e) = self.progress.set_status(index, status) {
            log::warn!("{e}");
        }
    }

    fn render(&self, index: usize) -> ebsdview_core::Result<ImageData> {
        let count = self.display.angle_count();
        let euler = self
            .display
            .euler(index)
            .ok_or(CoreError::IndexOutOfRange { index, count })?;
        let request = PatternRequest {
            index,
            euler,
            detector: &self.detector,
            display: &self.display,
        };
        let pattern = self.synthesizer.synthesize(&request, &self.cancel)?;
        generate_image(&pattern.data, pattern.width, pattern.height, 0)
    }

    /// Generates a pattern already claimed and marked `Loading`.
    fn process(&self, index: usize) {
        log::debug!("generating pattern {index}");
        self.emit(WorkbenchEvent::RowChanged(index));

        match self.render(index) {
            Ok(image) => {
                self.set_status(index, PatternStatus::Loaded);
                self.emit(WorkbenchEvent::PatternImageReady { index, image });
            }
            Err(CoreError::Cancelled) => {
                log::debug!("pattern {index} cancelled in flight");
                self.set_status(index, PatternStatus::Error);
            }
            Err(e) => {
                log::warn!("pattern {index} failed: {e}");
                self.set_status(index, PatternStatus::Error);
                self.emit(WorkbenchEvent::Error(format!(
                    "Pattern {index} could not be generated: {e}"
                )));
            }
        }

        let finished = self.progress.increment_finished();
        self.emit(WorkbenchEvent::ProgressValue(finished));
        self.emit(WorkbenchEvent::RowChanged(index));
    }
}

fn run_worker(ctx: &RunContext) {
    // Loading is set under the queue lock so statuses leave WaitingToLoad in
    // claim order, whatever the number of workers.
    while let Some(index) = ctx
        .queue
        .pop(&ctx.cancel, |index| ctx.set_status(index, PatternStatus::Loading))
    {
        ctx.process(index);
    }
    ctx.latch.count_down(|| {
        ctx.cancel.reset();
        log::info!(
            "pattern generation finished: {}/{} patterns",
            ctx.progress.finished(),
            ctx.progress.maximum()
        );
        ctx.emit(WorkbenchEvent::PatternGenerationFinished);
    });
}

/// Runs pattern-generation passes on a dedicated worker pool.
pub struct PatternScheduler {
    pool: ThreadPool,
    num_workers: usize,
    queue: Arc<WorkQueue>,
    progress: Arc<ProgressReporter>,
    latch: Arc<CountdownLatch>,
    cancel: CancellationToken,
    events: Sender<WorkbenchEvent>,
}

impl PatternScheduler {
    /// Builds the worker pool.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be created.
    pub fn new(config: &SchedulerConfig, events: Sender<WorkbenchEvent>) -> Result<Self> {
        let name = config.thread_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(move |i| format!("{name}-{i}"))
            .build()?;
        let num_workers = pool.current_num_threads();
        log::debug!("pattern scheduler ready with {num_workers} workers");
        Ok(Self {
            pool,
            num_workers,
            queue: Arc::new(WorkQueue::new()),
            progress: Arc::new(ProgressReporter::new()),
            latch: Arc::new(CountdownLatch::default()),
            cancel: CancellationToken::new(),
            events,
        })
    }

    /// Number of worker tasks launched per run.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Starts generating every pattern in `display.angles`, beginning with
    /// `display.current_row`. Returns without waiting for the run.
    ///
    /// # Errors
    /// Returns [`Error::RunInProgress`] if the previous run has not finished,
    /// or an error if the angle list is malformed.
    pub fn start_run(
        &self,
        synthesizer: Arc<dyn PatternSynthesizer>,
        detector: DetectorData,
        display: PatternDisplayData,
    ) -> Result<()> {
        display.validate()?;
        if !self.latch.try_arm(self.num_workers) {
            return Err(Error::RunInProgress);
        }

        let count = display.angle_count();
        self.cancel.reset();
        self.queue.reset(count, display.current_row);
        self.progress.reset(count);
        log::info!(
            "starting pattern generation: {count} patterns, focus {}, {} workers",
            display.current_row,
            self.num_workers
        );
        let _ = self.events.send(WorkbenchEvent::ProgressMaximum(count));

        let ctx = Arc::new(RunContext {
            queue: Arc::clone(&self.queue),
            progress: Arc::clone(&self.progress),
            latch: Arc::clone(&self.latch),
            cancel: self.cancel.clone(),
            events: self.events.clone(),
            synthesizer,
            detector,
            display,
        });
        for _ in 0..self.num_workers {
            let ctx = Arc::clone(&ctx);
            self.pool.spawn(move || run_worker(&ctx));
        }
        Ok(())
    }

    /// Asks the workers to claim `index` next.
    pub fn add_priority_index(&self, index: usize) {
        log::debug!("priority request for pattern {index}");
        self.queue.push_priority(index);
    }

    /// Stops claiming new patterns; in-flight syntheses stop at their next
    /// checkpoint.
    pub fn cancel(&self) {
        log::info!("cancelling pattern generation");
        self.cancel.cancel();
    }

    /// Blocks until every worker of the current run has returned.
    pub fn wait(&self) {
        self.latch.wait();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.latch.is_open()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Status of every pattern in the current (or last) run.
    #[must_use]
    pub fn statuses(&self) -> Vec<PatternStatus> {
        self.progress.snapshot()
    }
}

impl Drop for PatternScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancel.cancel();
            self.latch.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use ebsdview_core::DetectorPattern;

    struct Flat;

    impl PatternSynthesizer for Flat {
        fn synthesize(
            &self,
            request: &PatternRequest<'_>,
            _cancel: &CancellationToken,
        ) -> ebsdview_core::Result<DetectorPattern> {
            #[allow(clippy::cast_precision_loss)]
            let data = (0..4).map(|i| (i + request.index) as f32).collect();
            Ok(DetectorPattern {
                data,
                width: 2,
                height: 2,
            })
        }
    }

    fn display(count: usize) -> PatternDisplayData {
        PatternDisplayData {
            angles: vec![0.0; count * 3],
            ..PatternDisplayData::default()
        }
    }

    #[test]
    fn test_latch() {
        let latch = CountdownLatch::default();
        assert!(latch.is_open());
        assert!(latch.try_arm(2));
        assert!(!latch.try_arm(2));
        let mut fired = 0;
        latch.count_down(|| fired += 1);
        assert_eq!(fired, 0);
        latch.count_down(|| fired += 1);
        assert_eq!(fired, 1);
        latch.wait();
        assert!(latch.is_open());
    }

    #[test]
    fn test_run_completes() {
        let (tx, rx) = mpsc::channel();
        let config = SchedulerConfig {
            num_threads: 3,
            ..SchedulerConfig::default()
        };
        let scheduler = PatternScheduler::new(&config, tx).unwrap();
        assert_eq!(scheduler.num_workers(), 3);

        scheduler
            .start_run(Arc::new(Flat), DetectorData::default(), display(6))
            .unwrap();
        scheduler.wait();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.progress().finished(), 6);
        assert!(scheduler
            .statuses()
            .iter()
            .all(|s| *s == PatternStatus::Loaded));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&WorkbenchEvent::ProgressMaximum(6)));
        assert_eq!(events.last(), Some(&WorkbenchEvent::PatternGenerationFinished));
        let images = events
            .iter()
            .filter(|e| matches!(e, WorkbenchEvent::PatternImageReady { .. }))
            .count();
        assert_eq!(images, 6);
    }

    #[test]
    fn test_empty_run_finishes() {
        let (tx, rx) = mpsc::channel();
        let config = SchedulerConfig {
            num_threads: 2,
            ..SchedulerConfig::default()
        };
        let scheduler = PatternScheduler::new(&config, tx).unwrap();
        scheduler
            .start_run(Arc::new(Flat), DetectorData::default(), display(0))
            .unwrap();
        scheduler.wait();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                WorkbenchEvent::ProgressMaximum(0),
                WorkbenchEvent::PatternGenerationFinished
            ]
        );
    }

    #[test]
    fn test_rejects_partial_triple() {
        let (tx, _rx) = mpsc::channel();
        let scheduler = PatternScheduler::new(&SchedulerConfig::default(), tx).unwrap();
        let display = PatternDisplayData {
            angles: vec![0.0; 4],
            ..PatternDisplayData::default()
        };
        assert!(matches!(
            scheduler.start_run(Arc::new(Flat), DetectorData::default(), display),
            Err(Error::Core(CoreError::InvalidAngleCount(4)))
        ));
        assert!(!scheduler.is_running());
    }
}
