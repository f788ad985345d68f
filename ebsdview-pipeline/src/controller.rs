//! Command surface of the pattern-display workbench.
//!
//! [`PatternDisplayController`] owns the loaded master data, its
//! [`DisplayCache`] and the [`PatternScheduler`]. Every command reports
//! through the event channel; failures are also returned to the caller.

use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use ebsdview_core::{
    DetectorData, MasterPatternData, MasterPatternLoader, PatternDisplayData, PatternStatus,
    PatternSynthesizer,
};
use ebsdview_projection::LambertSynthesizer;

use crate::display_cache::{
    CacheLoadReport, DataSource, DisplayCache, ProjectionFamily, ProjectionMode,
};
use crate::message::WorkbenchEvent;
use crate::scheduler::{PatternScheduler, SchedulerConfig};
use crate::{Error, Result};

/// Loaded master pattern and the synthesizer built from it.
struct LoadedMaster {
    data: Arc<MasterPatternData>,
    synthesizer: Arc<dyn PatternSynthesizer>,
}

/// Drives master-file loading, projection display and pattern generation.
pub struct PatternDisplayController {
    loader: Arc<dyn MasterPatternLoader>,
    scheduler: PatternScheduler,
    cache: DisplayCache,
    master: Option<LoadedMaster>,
    events: Sender<WorkbenchEvent>,
}

impl PatternDisplayController {
    /// Creates a controller reading master files through `loader`.
    ///
    /// # Errors
    /// Returns an error if the worker pool cannot be created.
    pub fn new(
        loader: Arc<dyn MasterPatternLoader>,
        config: &SchedulerConfig,
        events: Sender<WorkbenchEvent>,
    ) -> Result<Self> {
        Ok(Self {
            loader,
            scheduler: PatternScheduler::new(config, events.clone())?,
            cache: DisplayCache::new(),
            master: None,
            events,
        })
    }

    fn emit(&self, event: WorkbenchEvent) {
        let _ = self.events.send(event);
    }

    fn fail(&self, error: Error) -> Error {
        log::error!("{error}");
        self.emit(WorkbenchEvent::Error(error.to_string()));
        error
    }

    /// Reads the master file at `path` and renders every display-cache slot.
    ///
    /// On success emits, in order, the energy levels, the default image range
    /// and [`WorkbenchEvent::MasterMonteCarloFinished`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, holds no energy levels or
    /// its arrays are inconsistent. The previous master data is discarded
    /// in every case.
    pub fn set_master_file_path(&mut self, path: &Path) -> Result<CacheLoadReport> {
        self.master = None;
        self.cache.clear();
        for line in ebsdview_io::path_summary(path) {
            self.emit(WorkbenchEvent::StdOutput(line));
        }

        let data = self
            .loader
            .load(path)
            .map_err(|e| self.fail(e.into()))?;
        if data.ekevs.is_empty() {
            return Err(self.fail(Error::NoEnergyLevels(path.to_path_buf())));
        }
        self.emit(WorkbenchEvent::EnergyLevelsChanged(data.ekevs.clone()));

        let events = self.events.clone();
        let report = self
            .cache
            .load(&data, |line| {
                let _ = events.send(WorkbenchEvent::StdOutput(line));
            })
            .map_err(|e| self.fail(e))?;

        let data = Arc::new(data);
        let synthesizer =
            LambertSynthesizer::new(Arc::clone(&data)).map_err(|e| self.fail(e.into()))?;
        self.master = Some(LoadedMaster {
            data,
            synthesizer: Arc::new(synthesizer),
        });

        self.emit(WorkbenchEvent::ImageRangeChanged {
            min: 1,
            max: report.slot_count(ProjectionFamily::MasterLambertNorth),
        });
        self.emit(WorkbenchEvent::MasterMonteCarloFinished);
        Ok(report)
    }

    /// Checks the master file path of `detector`, emitting an error event
    /// when it is unusable.
    pub fn validate_detector_values(&self, detector: &DetectorData) -> bool {
        match ebsdview_io::validate_master_path(&detector.master_file_path) {
            Ok(()) => true,
            Err(e) => {
                self.emit(WorkbenchEvent::Error(e.to_string()));
                false
            }
        }
    }

    /// Starts generating every pattern in `display`, beginning with
    /// `display.current_row`.
    ///
    /// # Errors
    /// Returns an error if the detector values are invalid, no master file is
    /// loaded or a run is already active.
    pub fn generate_pattern_images(
        &self,
        detector: DetectorData,
        display: PatternDisplayData,
    ) -> Result<()> {
        if let Err(e) = ebsdview_io::validate_master_path(&detector.master_file_path) {
            return Err(self.fail(e.into()));
        }
        let synthesizer = match &self.master {
            Some(master) => Arc::clone(&master.synthesizer),
            None => return Err(self.fail(Error::NoMasterData)),
        };
        self.scheduler
            .start_run(synthesizer, detector, display)
            .map_err(|e| self.fail(e))
    }

    /// Moves `index` ahead of the remaining backlog.
    pub fn add_priority_index(&self, index: usize) {
        self.scheduler.add_priority_index(index);
    }

    pub fn cancel_generation(&self) {
        self.scheduler.cancel();
    }

    /// Blocks until the current generation run has finished.
    pub fn wait_for_generation(&self) {
        self.scheduler.wait();
    }

    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Emits the master-pattern image for a 1-based energy bin.
    pub fn update_master_image(&self, mode: ProjectionMode, energy_bin: usize) {
        let image = self.cache.query(DataSource::Master, mode, energy_bin);
        self.emit(WorkbenchEvent::MasterImageReady(image));
    }

    /// Emits the Monte-Carlo image for a 1-based energy bin.
    pub fn update_monte_carlo_image(&self, mode: ProjectionMode, energy_bin: usize) {
        let image = self.cache.query(DataSource::MonteCarlo, mode, energy_bin);
        self.emit(WorkbenchEvent::MonteCarloImageReady(image));
    }

    #[must_use]
    pub fn master_data(&self) -> Option<&Arc<MasterPatternData>> {
        self.master.as_ref().map(|m| &m.data)
    }

    #[must_use]
    pub fn cache(&self) -> &DisplayCache {
        &self.cache
    }

    #[must_use]
    pub fn pattern_statuses(&self) -> Vec<PatternStatus> {
        self.scheduler.statuses()
    }

    #[must_use]
    pub fn scheduler(&self) -> &PatternScheduler {
        &self.scheduler
    }
}
