use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::time::Duration;

use ebsdview_core::{
    CancellationToken, DetectorData, DetectorPattern, PatternDisplayData, PatternRequest,
    PatternStatus, PatternSynthesizer, Result,
};
use ebsdview_pipeline::{Error, PatternScheduler, SchedulerConfig, WorkbenchEvent};

#[derive(Default)]
struct Gate {
    open_all: bool,
    released: HashSet<usize>,
}

/// Records claim order and blocks each synthesis until its index is released.
struct GatedSynthesizer {
    order: Mutex<Vec<usize>>,
    claimed: Mutex<Sender<usize>>,
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedSynthesizer {
    fn new(open: bool) -> (Arc<Self>, Receiver<usize>) {
        let (tx, rx) = mpsc::channel();
        let synth = Arc::new(Self {
            order: Mutex::new(Vec::new()),
            claimed: Mutex::new(tx),
            gate: Mutex::new(Gate {
                open_all: open,
                ..Gate::default()
            }),
            changed: Condvar::new(),
        });
        (synth, rx)
    }

    fn release(&self, index: usize) {
        self.gate.lock().unwrap().released.insert(index);
        self.changed.notify_all();
    }

    fn release_all(&self) {
        self.gate.lock().unwrap().open_all = true;
        self.changed.notify_all();
    }

    fn order(&self) -> Vec<usize> {
        self.order.lock().unwrap().clone()
    }
}

impl PatternSynthesizer for GatedSynthesizer {
    fn synthesize(
        &self,
        request: &PatternRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<DetectorPattern> {
        self.order.lock().unwrap().push(request.index);
        let _ = self.claimed.lock().unwrap().send(request.index);

        let mut gate = self.gate.lock().unwrap();
        while !(gate.open_all || gate.released.contains(&request.index)) {
            gate = self.changed.wait(gate).unwrap();
        }
        drop(gate);

        cancel.check()?;
        Ok(DetectorPattern {
            data: vec![0.0, 0.5, 1.0, 0.25],
            width: 2,
            height: 2,
        })
    }
}

fn display(count: usize, focus: usize) -> PatternDisplayData {
    PatternDisplayData {
        angles: vec![0.1; count * 3],
        current_row: focus,
        ..PatternDisplayData::default()
    }
}

fn scheduler(threads: usize) -> (PatternScheduler, Receiver<WorkbenchEvent>) {
    let (tx, rx) = mpsc::channel();
    let config = SchedulerConfig {
        num_threads: threads,
        thread_name: "test-worker".into(),
    };
    (PatternScheduler::new(&config, tx).unwrap(), rx)
}

fn wait_claim(rx: &Receiver<usize>) -> usize {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("worker did not claim a pattern")
}

#[test]
fn test_single_worker_focus_order() {
    let (scheduler, events) = scheduler(1);
    let (synth, _claims) = GatedSynthesizer::new(true);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(5, 2))
        .unwrap();
    scheduler.wait();

    assert_eq!(synth.order(), vec![2, 0, 1, 3, 4]);
    assert_eq!(scheduler.progress().finished(), 5);
    assert_eq!(scheduler.progress().maximum(), 5);
    assert!(scheduler
        .statuses()
        .iter()
        .all(|s| *s == PatternStatus::Loaded));

    let events: Vec<_> = events.try_iter().collect();
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkbenchEvent::ProgressValue(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3, 4, 5]);

    // Per-item order: row change, image, progress, row change.
    let first_item: Vec<_> = events.iter().skip(1).take(4).cloned().collect();
    assert_eq!(first_item[0], WorkbenchEvent::RowChanged(2));
    assert!(matches!(
        first_item[1],
        WorkbenchEvent::PatternImageReady { index: 2, .. }
    ));
    assert_eq!(first_item[2], WorkbenchEvent::ProgressValue(1));
    assert_eq!(first_item[3], WorkbenchEvent::RowChanged(2));
    assert_eq!(
        events.last(),
        Some(&WorkbenchEvent::PatternGenerationFinished)
    );
}

#[test]
fn test_priority_claimed_next() {
    let (scheduler, _events) = scheduler(2);
    let (synth, claims) = GatedSynthesizer::new(false);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(6, 0))
        .unwrap();
    let mut first = [wait_claim(&claims), wait_claim(&claims)];
    first.sort_unstable();
    assert_eq!(first, [0, 1]);

    // Worker holding 1 stays blocked; the one freed from 0 claims next.
    scheduler.add_priority_index(4);
    synth.release(0);
    assert_eq!(wait_claim(&claims), 4);

    synth.release_all();
    scheduler.wait();

    let mut order = synth.order();
    assert_eq!(order.len(), 6);
    order.sort_unstable();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_stale_priority_ignored() {
    let (scheduler, _events) = scheduler(1);
    let (synth, claims) = GatedSynthesizer::new(false);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(4, 0))
        .unwrap();
    assert_eq!(wait_claim(&claims), 0);
    scheduler.add_priority_index(0);
    scheduler.add_priority_index(42);
    scheduler.add_priority_index(3);
    synth.release_all();
    scheduler.wait();

    assert_eq!(synth.order(), vec![0, 3, 1, 2]);
    assert_eq!(scheduler.progress().finished(), 4);
}

#[test]
fn test_cancel_leaves_unclaimed_waiting() {
    let (scheduler, events) = scheduler(1);
    let (synth, claims) = GatedSynthesizer::new(false);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(5, 0))
        .unwrap();
    assert_eq!(wait_claim(&claims), 0);
    assert!(scheduler.is_running());

    scheduler.cancel();
    synth.release_all();
    scheduler.wait();

    assert!(!scheduler.is_running());
    let statuses = scheduler.statuses();
    assert_eq!(statuses[0], PatternStatus::Error);
    assert!(statuses[1..]
        .iter()
        .all(|s| *s == PatternStatus::WaitingToLoad));
    assert_eq!(scheduler.progress().finished(), 1);
    assert!(events
        .try_iter()
        .any(|e| e == WorkbenchEvent::PatternGenerationFinished));

    // The flag is cleared, so a fresh run completes normally.
    let (fresh, _claims) = GatedSynthesizer::new(true);
    scheduler
        .start_run(fresh.clone(), DetectorData::default(), display(5, 0))
        .unwrap();
    scheduler.wait();
    assert_eq!(fresh.order().len(), 5);
    assert!(scheduler
        .statuses()
        .iter()
        .all(|s| *s == PatternStatus::Loaded));
}

#[test]
fn test_second_run_rejected_while_active() {
    let (scheduler, _events) = scheduler(2);
    let (synth, claims) = GatedSynthesizer::new(false);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(3, 0))
        .unwrap();
    wait_claim(&claims);

    let again = scheduler.start_run(synth.clone(), DetectorData::default(), display(3, 0));
    assert!(matches!(again, Err(Error::RunInProgress)));

    synth.release_all();
    scheduler.wait();
    assert_eq!(scheduler.progress().finished(), 3);
}

#[test]
fn test_every_index_claimed_once() {
    let (scheduler, _events) = scheduler(4);
    let (synth, _claims) = GatedSynthesizer::new(true);

    scheduler
        .start_run(synth.clone(), DetectorData::default(), display(50, 17))
        .unwrap();
    for index in [3, 3, 49, 0, 17, 25] {
        scheduler.add_priority_index(index);
    }
    scheduler.wait();

    let mut order = synth.order();
    order.sort_unstable();
    assert_eq!(order, (0..50).collect::<Vec<_>>());
    assert_eq!(scheduler.progress().finished(), 50);
}

/// Checks, from inside every synthesis, that the focus pattern has already
/// left `WaitingToLoad`.
struct FocusWatcher {
    scheduler: OnceLock<Weak<PatternScheduler>>,
    focus: usize,
    calls: Mutex<usize>,
    focus_waiting: Mutex<Vec<usize>>,
}

impl PatternSynthesizer for FocusWatcher {
    fn synthesize(
        &self,
        request: &PatternRequest<'_>,
        _cancel: &CancellationToken,
    ) -> Result<DetectorPattern> {
        let scheduler = self.scheduler.get().and_then(Weak::upgrade).unwrap();
        if scheduler.statuses()[self.focus] == PatternStatus::WaitingToLoad {
            self.focus_waiting.lock().unwrap().push(request.index);
        }
        *self.calls.lock().unwrap() += 1;
        std::thread::yield_now();
        Ok(DetectorPattern {
            data: vec![0.0, 1.0, 2.0, 3.0],
            width: 2,
            height: 2,
        })
    }
}

#[test]
fn test_multi_worker_focus_leaves_waiting_first() {
    let (scheduler, _events) = scheduler(4);
    let scheduler = Arc::new(scheduler);
    let focus = 5;
    let watcher = Arc::new(FocusWatcher {
        scheduler: OnceLock::new(),
        focus,
        calls: Mutex::new(0),
        focus_waiting: Mutex::new(Vec::new()),
    });
    watcher.scheduler.set(Arc::downgrade(&scheduler)).unwrap();

    for _ in 0..50 {
        scheduler
            .start_run(watcher.clone(), DetectorData::default(), display(16, focus))
            .unwrap();
        scheduler.wait();
        assert!(scheduler.statuses().iter().all(|s| s.is_settled()));
    }

    assert_eq!(*watcher.calls.lock().unwrap(), 50 * 16);
    assert!(watcher.focus_waiting.lock().unwrap().is_empty());
}
