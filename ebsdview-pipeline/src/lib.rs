//! ebsdview-pipeline: Concurrent pattern generation and display caching.
//!
//! This crate provides:
//! - [`WorkQueue`]: backlog of pattern indices with jump-ahead requests
//! - [`PatternScheduler`]: fixed-size worker pool with cooperative
//!   cancellation and a completion latch
//! - [`ProgressReporter`]: finished count and per-pattern status
//! - [`DisplayCache`]: pre-rendered master-pattern and Monte-Carlo images
//! - [`PatternDisplayController`]: the command surface tying them together,
//!   reporting through [`WorkbenchEvent`]s
//!

mod controller;
mod display_cache;
mod error;
mod message;
mod progress;
mod scheduler;
mod work_queue;

pub use controller::PatternDisplayController;
pub use display_cache::{
    CacheLoadReport, DataSource, DisplayCache, ProjectionFamily, ProjectionMode,
};
pub use error::{Error, Result};
pub use message::WorkbenchEvent;
pub use progress::ProgressReporter;
pub use scheduler::{PatternScheduler, SchedulerConfig};
pub use work_queue::WorkQueue;
