//! Default detector-pattern synthesizer.
//!
//! For each detector pixel the direction from the sample to the scintillator
//! is computed in the sample frame, weighted per energy bin by the Monte-Carlo
//! backscatter yield at that direction, rotated into the crystal frame and
//! used to sample the master-pattern Lambert squares. The binned pattern is
//! normalized to `[0, 1]` and gamma-corrected.

use std::sync::Arc;

use ebsdview_core::{
    CancellationToken, DetectorPattern, Error, Hemisphere, MasterPatternData, PatternRequest,
    PatternSynthesizer, Result,
};

use crate::hyperslab::de_hyperslab;
use crate::lambert::{nearest_index, normalize, sample_bilinear, square_coords, Direction};
use crate::rotation::{apply, euler_to_matrix, rotation_x, rotation_z, Matrix3};

/// Samples master-pattern Lambert squares for each detector pixel.
pub struct LambertSynthesizer {
    data: Arc<MasterPatternData>,
    /// Monte-Carlo counts as `[energy][y][x]` planes.
    monte_carlo: Vec<f32>,
    energy_bins: usize,
}

impl LambertSynthesizer {
    /// Prepares a synthesizer for one loaded master pattern.
    ///
    /// # Errors
    /// Returns an error if the master data is inconsistent or has no energy
    /// bins.
    pub fn new(data: Arc<MasterPatternData>) -> Result<Self> {
        data.validate()?;
        let [dim_x, dim_y, dim_e] = data.monte_carlo_dims;
        #[allow(clippy::cast_precision_loss)]
        let monte_carlo = de_hyperslab(&data.monte_carlo_square, dim_x, dim_y, dim_e)?
            .into_iter()
            .map(|count| count as f32)
            .collect();
        let energy_bins = data.energy_bin_count().min(dim_e);
        if energy_bins == 0 {
            return Err(Error::InvalidMasterData(
                "master pattern has no energy bins".into(),
            ));
        }
        log::debug!(
            "synthesizer ready: {energy_bins} energy bins, Monte-Carlo {}",
            ebsdview_core::format_dims(&data.monte_carlo_dims)
        );
        Ok(Self {
            data,
            monte_carlo,
            energy_bins,
        })
    }

    /// Master data this synthesizer samples.
    #[must_use]
    pub fn master_data(&self) -> &Arc<MasterPatternData> {
        &self.data
    }

    /// Per-energy weights for a sample-frame direction.
    fn energy_weights(&self, dir: Direction, weights: &mut [f32]) {
        let [dim_x, dim_y, _] = self.data.monte_carlo_dims;
        let plane = dim_x * dim_y;
        let (x, y) = square_coords(dir);
        let idx = nearest_index(dim_x.min(dim_y), x, y);
        let mut total = 0.0;
        for (bin, weight) in weights.iter_mut().enumerate() {
            *weight = self
                .monte_carlo
                .get(bin * plane + idx)
                .copied()
                .unwrap_or(0.0);
            total += *weight;
        }
        if total <= 0.0 {
            weights.fill(1.0);
        }
    }

    /// Energy-weighted master-pattern intensity along a crystal-frame direction.
    fn intensity(&self, dir: Direction, weights: &[f32]) -> f32 {
        let hemisphere = if dir[2] >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        };
        let (x, y) = square_coords(dir);
        let side = self.data.lambert_side();

        let mut sum = 0.0;
        let mut norm = 0.0;
        for (bin, &weight) in weights.iter().enumerate() {
            if weight <= 0.0 {
                continue;
            }
            if let Some(value) = self
                .data
                .lambert_slice(hemisphere, bin)
                .and_then(|square| sample_bilinear(square, side, x, y))
            {
                sum += weight * value;
                norm += weight;
            }
        }
        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }
}

impl PatternSynthesizer for LambertSynthesizer {
    #[allow(clippy::cast_precision_loss)]
    fn synthesize(
        &self,
        request: &PatternRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<DetectorPattern> {
        let detector = request.detector;
        detector.validate_geometry()?;
        let binning = request.display.detector_binning_value;
        let (width, height) = detector.binned_dimensions(binning)?;

        let crystal = euler_to_matrix(request.euler);
        let sample = sample_frame(
            self.data.sigma,
            detector.detector_tilt_angle,
            self.data.omega,
        );

        let nx = width * binning;
        let ny = height * binning;
        let half_x = detector.num_of_pixels_x as f32 / 2.0;
        let half_y = detector.num_of_pixels_y as f32 / 2.0;
        let delta = detector.scintillator_pixel_size;
        let distance = detector.scintillator_dist;

        let mut weights = vec![0.0f32; self.energy_bins];
        let mut binned = vec![0.0f32; width * height];

        for row in 0..ny {
            cancel.check()?;
            let ys = (half_y + detector.pattern_center_y - row as f32 - 0.5) * delta;
            for col in 0..nx {
                let xs = (col as f32 + 0.5 - half_x - detector.pattern_center_x) * delta;
                let dir = normalize(apply(&sample, [xs, ys, distance]));
                self.energy_weights(dir, &mut weights);
                let value = self.intensity(apply(&crystal, dir), &weights);
                binned[(row / binning) * width + col / binning] += value;
            }
        }

        normalize_with_gamma(&mut binned, request.display.gamma_value);

        Ok(DetectorPattern {
            data: binned,
            width,
            height,
        })
    }
}

/// Detector-to-sample rotation from sample tilt, detector tilt and omega
/// (all in degrees).
fn sample_frame(sigma: f32, tilt: f32, omega: f32) -> Matrix3 {
    let alpha = (90.0 - sigma + tilt).to_radians();
    let rx = rotation_x(alpha);
    let rz = rotation_z(omega.to_radians());
    let mut m = [[0.0f32; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..3).map(|k| rz[i][k] * rx[k][j]).sum();
        }
    }
    m
}

/// Rescales to `[0, 1]` and raises to `gamma` (skipped for non-positive gamma).
fn normalize_with_gamma(values: &mut [f32], gamma: f32) {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    for v in values.iter_mut() {
        let n = if span > 0.0 { (*v - lo) / span } else { 0.0 };
        *v = if gamma > 0.0 { n.powf(gamma) } else { n };
    }
}
