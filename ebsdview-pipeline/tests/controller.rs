use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use approx::assert_relative_eq;
use ebsdview_core::{
    DetectorData, MasterPatternData, MasterPatternLoader, PatternDisplayData, PatternStatus,
};
use ebsdview_pipeline::{
    Error, PatternDisplayController, ProjectionFamily, ProjectionMode, SchedulerConfig,
    WorkbenchEvent,
};
use tempfile::NamedTempFile;

struct MemoryLoader(MasterPatternData);

impl MasterPatternLoader for MemoryLoader {
    fn load(&self, _path: &Path) -> ebsdview_core::Result<MasterPatternData> {
        Ok(self.0.clone())
    }
}

fn master(side: usize, bins: usize) -> MasterPatternData {
    let plane = side * side;
    MasterPatternData {
        mp_program_name: "EMEBSDmaster.f90".into(),
        mp_version_id: "5_0_20200101".into(),
        mc_program_name: "EMMCOpenCL.f90".into(),
        mc_version_id: "5_0_20200101".into(),
        num_mp_energy_bins: bins,
        ekevs: (0..bins).map(|b| 20.0 - b as f32).collect(),
        master_lpnh: (0..bins * plane).map(|v| (v % plane) as f32).collect(),
        mlpnh_dims: [1, bins, side, side],
        master_lpsh: (0..bins * plane).map(|v| (plane - v % plane) as f32).collect(),
        mlpsh_dims: [1, bins, side, side],
        master_spnh: (0..bins * plane).map(|v| (v / side) as f32).collect(),
        master_spnh_dims: [bins, side, side],
        monte_carlo_square: (0..plane * bins).map(|v| v as i32 % 7).collect(),
        monte_carlo_dims: [side, side, bins],
        numsx: side,
        numset: 1,
        npx: side / 2,
        incident_beam_voltage: 20.0,
        min_energy: 10.0,
        energy_bin_size: 1.0,
        omega: 0.0,
        sigma: 70.0,
    }
}

fn master_file() -> NamedTempFile {
    tempfile::Builder::new()
        .prefix("master")
        .suffix(".h5")
        .tempfile()
        .unwrap()
}

fn controller(data: MasterPatternData) -> (PatternDisplayController, Receiver<WorkbenchEvent>) {
    let (tx, rx) = mpsc::channel();
    let config = SchedulerConfig {
        num_threads: 2,
        ..SchedulerConfig::default()
    };
    let controller = PatternDisplayController::new(Arc::new(MemoryLoader(data)), &config, tx)
        .unwrap();
    (controller, rx)
}

fn std_output(events: &[WorkbenchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            WorkbenchEvent::StdOutput(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_load_master_events() {
    let file = master_file();
    let (mut controller, rx) = controller(master(7, 3));

    let report = controller.set_master_file_path(file.path()).unwrap();
    assert_eq!(report.slots.len(), 7);
    assert_eq!(report.slot_count(ProjectionFamily::MasterLambertSouth), 3);
    assert_eq!(report.total_slots(), 21);

    let events: Vec<_> = rx.try_iter().collect();
    let lines = std_output(&events);
    assert!(lines[0].starts_with("Full Path: "));
    assert!(lines[2].starts_with("Data File: master"));
    assert_eq!(lines[3], "Suffix: h5\n");
    assert!(lines.contains(&"File generated by program 'EMEBSDmaster.f90'".to_string()));
    assert!(lines.contains(&"Size of mLPNH data array: 1 x 3 x 7 x 7".to_string()));
    assert!(lines.contains(&"Reading Master Pattern data sets (4/4)...".to_string()));
    assert!(lines.contains(&"Reading Monte Carlo data sets (3/3)...".to_string()));

    let signals: Vec<_> = events
        .iter()
        .filter(|e| !matches!(e, WorkbenchEvent::StdOutput(_)))
        .cloned()
        .collect();
    assert_eq!(
        signals,
        vec![
            WorkbenchEvent::EnergyLevelsChanged(vec![20.0, 19.0, 18.0]),
            WorkbenchEvent::ImageRangeChanged { min: 1, max: 3 },
            WorkbenchEvent::MasterMonteCarloFinished,
        ]
    );
    assert!(controller.master_data().is_some());
}

#[test]
fn test_empty_energy_levels_reported() {
    let file = master_file();
    let mut data = master(5, 1);
    data.ekevs.clear();
    let (mut controller, rx) = controller(data);

    let err = controller.set_master_file_path(file.path()).unwrap_err();
    assert!(matches!(err, Error::NoEnergyLevels(_)));
    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        WorkbenchEvent::Error(msg) if msg.contains("contains no energy levels")
    )));
    assert!(!events.contains(&WorkbenchEvent::MasterMonteCarloFinished));
    assert!(controller.cache().is_empty());
}

#[test]
fn test_display_queries() {
    let file = master_file();
    let (mut controller, rx) = controller(master(7, 2));
    controller.set_master_file_path(file.path()).unwrap();
    rx.try_iter().for_each(drop);

    controller.update_master_image(ProjectionMode::LambertSquare, 2);
    controller.update_monte_carlo_image(ProjectionMode::Stereographic, 1);
    controller.update_master_image(ProjectionMode::LambertCircle, 3);
    controller.update_monte_carlo_image(ProjectionMode::LambertSquare, 0);

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 4);
    match &events[0] {
        WorkbenchEvent::MasterImageReady(image) => {
            assert_eq!(image.image.width(), 7);
            assert_relative_eq!(image.kev_value, 19.0);
            assert_relative_eq!(image.max_value, 48.0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[1] {
        WorkbenchEvent::MonteCarloImageReady(image) => {
            assert!(!image.image.is_empty());
            assert_relative_eq!(image.kev_value, 20.0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    for event in &events[2..] {
        match event {
            WorkbenchEvent::MasterImageReady(image) | WorkbenchEvent::MonteCarloImageReady(image) => {
                assert!(image.image.is_empty());
                assert_relative_eq!(image.min_value, 0.0);
                assert_relative_eq!(image.max_value, 0.0);
                assert_relative_eq!(image.kev_value, 0.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn test_validate_detector_values() {
    let file = master_file();
    let (controller, rx) = controller(master(5, 1));

    assert!(!controller.validate_detector_values(&DetectorData::default()));
    let missing = DetectorData {
        master_file_path: file.path().with_extension("missing.h5"),
        ..DetectorData::default()
    };
    assert!(!controller.validate_detector_values(&missing));
    let valid = DetectorData {
        master_file_path: file.path().to_path_buf(),
        ..DetectorData::default()
    };
    assert!(controller.validate_detector_values(&valid));

    let errors: Vec<_> = rx
        .try_iter()
        .filter_map(|e| match e {
            WorkbenchEvent::Error(msg) => Some(msg),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "The master file path must be set.");
    assert!(errors[1].contains("does not exist"));
}

#[test]
fn test_generate_requires_master() {
    let file = master_file();
    let (controller, rx) = controller(master(5, 1));
    let detector = DetectorData {
        master_file_path: file.path().to_path_buf(),
        ..DetectorData::default()
    };
    let err = controller
        .generate_pattern_images(detector, PatternDisplayData::default())
        .unwrap_err();
    assert!(matches!(err, Error::NoMasterData));
    assert!(rx
        .try_iter()
        .any(|e| matches!(e, WorkbenchEvent::Error(_))));
}

#[test]
fn test_generate_patterns() {
    let file = master_file();
    let (mut controller, rx) = controller(master(9, 2));
    controller.set_master_file_path(file.path()).unwrap();
    rx.try_iter().for_each(drop);

    let detector = DetectorData {
        master_file_path: file.path().to_path_buf(),
        num_of_pixels_x: 16,
        num_of_pixels_y: 12,
        scintillator_pixel_size: 500.0,
        ..DetectorData::default()
    };
    let display = PatternDisplayData {
        angles: vec![0.0, 0.0, 0.0, 0.5, 0.2, 0.1, 1.0, 0.7, 0.3],
        current_row: 1,
        detector_binning_value: 2,
        gamma_value: 1.0,
    };
    controller.generate_pattern_images(detector, display).unwrap();
    controller.wait_for_generation();

    assert!(!controller.is_generating());
    assert_eq!(
        controller.pattern_statuses(),
        vec![PatternStatus::Loaded; 3]
    );
    let events: Vec<_> = rx.try_iter().collect();
    let mut ready: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkbenchEvent::PatternImageReady { index, image } => {
                assert_eq!((image.image.width(), image.image.height()), (8, 6));
                Some(*index)
            }
            _ => None,
        })
        .collect();
    ready.sort_unstable();
    assert_eq!(ready, vec![0, 1, 2]);
    assert_eq!(events.first(), Some(&WorkbenchEvent::ProgressMaximum(3)));
    assert_eq!(
        events.last(),
        Some(&WorkbenchEvent::PatternGenerationFinished)
    );
}
