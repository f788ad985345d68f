//! Master-pattern and Monte-Carlo data model.
//!
//! Array layouts follow the HDF5 files written by the master-pattern
//! simulation programs:
//!
//! - `mLPNH` / `mLPSH`: `[numset, energy, y, x]` modified Lambert squares,
//!   one per hemisphere.
//! - `masterSPNH`: `[energy, y, x]` stereographic projection of the northern
//!   hemisphere.
//! - `accum_e`: `[x, y, energy]` Monte-Carlo electron counts with energy as
//!   the fastest-varying axis (a "hyperslab" layout that must be reordered
//!   before slices can be rendered).

use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lambert square hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hemisphere {
    North,
    South,
}

/// Everything read from one master-pattern file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterPatternData {
    /// Program that produced the master pattern.
    pub mp_program_name: String,
    /// Version identifier of the master-pattern program.
    pub mp_version_id: String,
    /// Program that produced the Monte-Carlo data.
    pub mc_program_name: String,
    /// Version identifier of the Monte-Carlo program.
    pub mc_version_id: String,

    /// Number of energy bins stored in the master pattern.
    pub num_mp_energy_bins: usize,
    /// Energy (keV) of each master-pattern bin.
    pub ekevs: Vec<f32>,

    /// Northern Lambert square, `[numset, energy, y, x]`.
    pub master_lpnh: Vec<f32>,
    pub mlpnh_dims: [usize; 4],
    /// Southern Lambert square, `[numset, energy, y, x]`.
    pub master_lpsh: Vec<f32>,
    pub mlpsh_dims: [usize; 4],
    /// Northern stereographic projection, `[energy, y, x]`.
    pub master_spnh: Vec<f32>,
    pub master_spnh_dims: [usize; 3],

    /// Monte-Carlo counts, `[x, y, energy]` with energy fastest.
    pub monte_carlo_square: Vec<i32>,
    pub monte_carlo_dims: [usize; 3],

    /// Monte-Carlo Lambert half-width is `(numsx - 1) / 2`.
    pub numsx: usize,
    /// Number of atom sets in the master pattern.
    pub numset: usize,
    /// Master-pattern Lambert half-width.
    pub npx: usize,
    /// Incident beam voltage (kV).
    pub incident_beam_voltage: f32,
    /// Lowest energy in the Monte-Carlo histogram (keV).
    pub min_energy: f32,
    /// Monte-Carlo energy bin width (keV).
    pub energy_bin_size: f32,
    /// Sample omega rotation (degrees).
    pub omega: f32,
    /// Sample tilt (degrees).
    pub sigma: f32,
}

impl MasterPatternData {
    /// Number of master-pattern energy bins (`mLPNH` energy axis).
    #[must_use]
    pub fn energy_bin_count(&self) -> usize {
        self.mlpnh_dims[1]
    }

    /// Number of Monte-Carlo energy bins.
    #[must_use]
    pub fn monte_carlo_bin_count(&self) -> usize {
        self.monte_carlo_dims[2]
    }

    /// Side length of the master Lambert squares in pixels.
    #[must_use]
    pub fn lambert_side(&self) -> usize {
        self.mlpnh_dims[3]
    }

    /// Energy of a 0-based master-pattern bin.
    #[must_use]
    pub fn kev(&self, bin: usize) -> Option<f32> {
        self.ekevs.get(bin).copied()
    }

    /// Lambert square of one hemisphere for one energy bin (first atom set).
    #[must_use]
    pub fn lambert_slice(&self, hemisphere: Hemisphere, bin: usize) -> Option<&[f32]> {
        let (data, dims) = match hemisphere {
            Hemisphere::North => (&self.master_lpnh, &self.mlpnh_dims),
            Hemisphere::South => (&self.master_lpsh, &self.mlpsh_dims),
        };
        if bin >= dims[1] {
            return None;
        }
        let plane = dims[2] * dims[3];
        data.get(bin * plane..(bin + 1) * plane)
    }

    /// Checks every array against the product of its dimensions.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMasterData`] naming the first inconsistent array.
    pub fn validate(&self) -> Result<()> {
        check_len("mLPNH", self.master_lpnh.len(), &self.mlpnh_dims)?;
        check_len("mLPSH", self.master_lpsh.len(), &self.mlpsh_dims)?;
        check_len("masterSPNH", self.master_spnh.len(), &self.master_spnh_dims)?;
        check_len("accum_e", self.monte_carlo_square.len(), &self.monte_carlo_dims)?;
        if self.mlpnh_dims[1] != self.mlpsh_dims[1] {
            return Err(Error::InvalidMasterData(format!(
                "hemisphere energy bins differ: {} vs {}",
                self.mlpnh_dims[1], self.mlpsh_dims[1]
            )));
        }
        Ok(())
    }
}

fn check_len(name: &str, len: usize, dims: &[usize]) -> Result<()> {
    let expected: usize = dims.iter().product();
    if len == expected {
        Ok(())
    } else {
        Err(Error::InvalidMasterData(format!(
            "{name} holds {len} values, dimensions {} require {expected}",
            format_dims(dims)
        )))
    }
}

/// Format dimensions as `"a x b x c"`.
#[must_use]
pub fn format_dims(dims: &[usize]) -> String {
    dims.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" x ")
}

/// Reads master-pattern files.
///
/// Implemented by the HDF5 reader in `ebsdview-io`; tests supply in-memory
/// loaders.
pub trait MasterPatternLoader: Send + Sync {
    /// Reads the file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is malformed.
    fn load(&self, path: &Path) -> Result<MasterPatternData>;
}
