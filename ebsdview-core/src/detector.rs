//! Detector geometry and per-run pattern parameters.

use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Detector geometry and beam settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DetectorData {
    /// Master-pattern file the detector patterns are generated from.
    pub master_file_path: PathBuf,
    /// Detector width in pixels.
    pub num_of_pixels_x: usize,
    /// Detector height in pixels.
    pub num_of_pixels_y: usize,
    /// Pattern center x offset from the detector center (pixels).
    pub pattern_center_x: f32,
    /// Pattern center y offset from the detector center (pixels).
    pub pattern_center_y: f32,
    /// Scintillator pixel size (microns).
    pub scintillator_pixel_size: f32,
    /// Sample-to-scintillator distance (microns).
    pub scintillator_dist: f32,
    /// Detector tilt (degrees).
    pub detector_tilt_angle: f32,
    /// Beam current (nA).
    pub beam_current: f32,
    /// Dwell time per pattern (microseconds).
    pub dwell_time: f32,
}

impl Default for DetectorData {
    fn default() -> Self {
        Self {
            master_file_path: PathBuf::new(),
            num_of_pixels_x: 640,
            num_of_pixels_y: 480,
            pattern_center_x: 0.0,
            pattern_center_y: 0.0,
            scintillator_pixel_size: 50.0,
            scintillator_dist: 15_000.0,
            detector_tilt_angle: 10.0,
            beam_current: 150.0,
            dwell_time: 100.0,
        }
    }
}

impl DetectorData {
    /// Output pattern dimensions after `binning x binning` pixel binning.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDetector`] if the binning is zero or leaves an
    /// empty pattern.
    pub fn binned_dimensions(&self, binning: usize) -> Result<(usize, usize)> {
        if binning == 0 {
            return Err(Error::InvalidDetector("binning must be at least 1".into()));
        }
        let width = self.num_of_pixels_x / binning;
        let height = self.num_of_pixels_y / binning;
        if width == 0 || height == 0 {
            return Err(Error::InvalidDetector(format!(
                "binning {binning} leaves no pixels on a {}x{} detector",
                self.num_of_pixels_x, self.num_of_pixels_y
            )));
        }
        Ok((width, height))
    }

    /// Checks the geometric parameters.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDetector`] describing the first bad value.
    pub fn validate_geometry(&self) -> Result<()> {
        if self.num_of_pixels_x == 0 || self.num_of_pixels_y == 0 {
            return Err(Error::InvalidDetector("detector has no pixels".into()));
        }
        if !positive(self.scintillator_pixel_size) {
            return Err(Error::InvalidDetector(
                "scintillator pixel size must be positive".into(),
            ));
        }
        if !positive(self.scintillator_dist) {
            return Err(Error::InvalidDetector(
                "scintillator distance must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Parameters of one pattern-generation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PatternDisplayData {
    /// Flattened Bunge Euler triples `(phi1, Phi, phi2)` in radians.
    pub angles: Vec<f32>,
    /// Row currently shown by the pattern list; generated first.
    pub current_row: usize,
    /// Detector binning factor.
    pub detector_binning_value: usize,
    /// Gamma applied to the normalized pattern intensities.
    pub gamma_value: f32,
}

impl Default for PatternDisplayData {
    fn default() -> Self {
        Self {
            angles: Vec::new(),
            current_row: 0,
            detector_binning_value: 1,
            gamma_value: 0.34,
        }
    }
}

impl PatternDisplayData {
    /// Number of complete Euler triples.
    #[must_use]
    pub fn angle_count(&self) -> usize {
        self.angles.len() / 3
    }

    /// Euler triple for pattern `index`.
    #[must_use]
    pub fn euler(&self, index: usize) -> Option<[f32; 3]> {
        let start = index.checked_mul(3)?;
        match self.angles.get(start..start + 3)? {
            &[phi1, big_phi, phi2] => Some([phi1, big_phi, phi2]),
            _ => None,
        }
    }

    /// Checks that the angle buffer holds whole triples.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAngleCount`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.angles.len() % 3 == 0 {
            Ok(())
        } else {
            Err(Error::InvalidAngleCount(self.angles.len()))
        }
    }
}
