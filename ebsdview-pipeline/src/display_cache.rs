//! Pre-rendered master-pattern and Monte-Carlo images.
//!
//! After a master file is loaded, every energy bin of every projection family
//! is rendered once so the display can page through bins without further
//! work. Slots are filled in parallel and never resized afterwards.

use std::time::{Duration, Instant};

use ebsdview_core::{generate_image, Error as CoreError, ImageData, MasterPatternData};
use ebsdview_projection::{convert_square_slice, de_hyperslab, ProjectionType};
use rayon::prelude::*;

use crate::Result;

/// Where a displayed projection comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataSource {
    Master,
    MonteCarlo,
}

/// Projection shown by the display widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjectionMode {
    #[default]
    LambertSquare,
    LambertCircle,
    Stereographic,
}

/// One cached image stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjectionFamily {
    MasterLambertNorth,
    MasterLambertSouth,
    MasterLambertCircle,
    MasterStereographic,
    MonteCarloLambertSquare,
    MonteCarloLambertCircle,
    MonteCarloStereographic,
}

impl ProjectionFamily {
    /// Every family, in load order.
    pub const ALL: [ProjectionFamily; 7] = [
        ProjectionFamily::MasterLambertNorth,
        ProjectionFamily::MasterLambertSouth,
        ProjectionFamily::MasterLambertCircle,
        ProjectionFamily::MasterStereographic,
        ProjectionFamily::MonteCarloLambertSquare,
        ProjectionFamily::MonteCarloLambertCircle,
        ProjectionFamily::MonteCarloStereographic,
    ];

    /// Family displayed for a source and mode. The master Lambert square is
    /// shown from the northern hemisphere.
    #[must_use]
    pub fn resolve(source: DataSource, mode: ProjectionMode) -> Self {
        match (source, mode) {
            (DataSource::Master, ProjectionMode::LambertSquare) => Self::MasterLambertNorth,
            (DataSource::Master, ProjectionMode::LambertCircle) => Self::MasterLambertCircle,
            (DataSource::Master, ProjectionMode::Stereographic) => Self::MasterStereographic,
            (DataSource::MonteCarlo, ProjectionMode::LambertSquare) => {
                Self::MonteCarloLambertSquare
            }
            (DataSource::MonteCarlo, ProjectionMode::LambertCircle) => {
                Self::MonteCarloLambertCircle
            }
            (DataSource::MonteCarlo, ProjectionMode::Stereographic) => {
                Self::MonteCarloStereographic
            }
        }
    }

    #[must_use]
    pub fn source(self) -> DataSource {
        match self {
            Self::MasterLambertNorth
            | Self::MasterLambertSouth
            | Self::MasterLambertCircle
            | Self::MasterStereographic => DataSource::Master,
            _ => DataSource::MonteCarlo,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ProjectionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MasterLambertNorth => "master Lambert square (north)",
            Self::MasterLambertSouth => "master Lambert square (south)",
            Self::MasterLambertCircle => "master Lambert circle",
            Self::MasterStereographic => "master stereographic",
            Self::MonteCarloLambertSquare => "Monte-Carlo Lambert square",
            Self::MonteCarloLambertCircle => "Monte-Carlo Lambert circle",
            Self::MonteCarloStereographic => "Monte-Carlo stereographic",
        };
        f.write_str(name)
    }
}

/// Summary of a [`DisplayCache::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLoadReport {
    /// Number of populated slots per family, in load order.
    pub slots: Vec<(ProjectionFamily, usize)>,
    pub elapsed: Duration,
}

impl CacheLoadReport {
    /// Slots populated for `family`.
    #[must_use]
    pub fn slot_count(&self, family: ProjectionFamily) -> usize {
        self.slots
            .iter()
            .find(|(f, _)| *f == family)
            .map_or(0, |(_, n)| *n)
    }

    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.slots.iter().map(|(_, n)| n).sum()
    }
}

/// Rendered images for every projection family and energy bin.
#[derive(Debug, Default)]
pub struct DisplayCache {
    families: [Vec<ImageData>; 7],
    ekevs: Vec<f32>,
}

impl DisplayCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders every family of `data`, replacing previous contents.
    ///
    /// Progress text is passed to `on_message` between families. Returns
    /// only after every slot has been written. On error the cache is left
    /// empty.
    ///
    /// # Errors
    /// Returns an error if an array does not match its dimensions.
    pub fn load(
        &mut self,
        data: &MasterPatternData,
        mut on_message: impl FnMut(String),
    ) -> Result<CacheLoadReport> {
        let start = Instant::now();
        self.clear();
        data.validate()?;

        let mut families: [Vec<ImageData>; 7] = Default::default();

        on_message(format!(
            "File generated by program '{}'",
            data.mp_program_name
        ));
        on_message(format!("Version Identifier: {}", data.mp_version_id));
        on_message(format!(
            "Number Of Energy Bins: {}\n",
            data.num_mp_energy_bins
        ));
        on_message(format!(
            "Size of mLPNH data array: {}",
            ebsdview_core::format_dims(&data.mlpnh_dims)
        ));

        let [_, mp_bins, lp_y, lp_x] = data.mlpnh_dims;
        let [_, _, lpsh_y, lpsh_x] = data.mlpsh_dims;
        let [sp_bins, sp_y, sp_x] = data.master_spnh_dims;

        on_message(stage("Master Pattern", 1, 4));
        families[ProjectionFamily::MasterLambertNorth.slot()] =
            render_stack(&data.master_lpnh, lp_x, lp_y, mp_bins, data)?;
        on_message(stage("Master Pattern", 2, 4));
        families[ProjectionFamily::MasterLambertSouth.slot()] =
            render_stack(&data.master_lpsh, lpsh_x, lpsh_y, mp_bins, data)?;
        on_message(stage("Master Pattern", 3, 4));
        families[ProjectionFamily::MasterLambertCircle.slot()] = convert_stack(
            &data.master_lpnh,
            lp_x,
            lp_y,
            mp_bins,
            ProjectionType::Circular,
            data,
        )?;
        on_message(stage("Master Pattern", 4, 4));
        families[ProjectionFamily::MasterStereographic.slot()] =
            render_stack(&data.master_spnh, sp_x, sp_y, sp_bins, data)?;
        on_message("Reading Master Pattern data sets complete!\n".into());

        on_message(format!(
            "File generated by program '{}'",
            data.mc_program_name
        ));
        on_message(format!("Version Identifier: {}", data.mc_version_id));
        on_message("Dehyperslabbing Monte Carlo square data...".into());
        let [mc_x, mc_y, _] = data.monte_carlo_dims;
        let mc_bins = data.monte_carlo_bin_count();
        let mc_square = de_hyperslab(&data.monte_carlo_square, mc_x, mc_y, mc_bins)?;

        on_message(stage("Monte Carlo", 1, 3));
        families[ProjectionFamily::MonteCarloLambertSquare.slot()] =
            render_stack(&mc_square, mc_x, mc_y, mc_bins, data)?;
        on_message(stage("Monte Carlo", 2, 3));
        families[ProjectionFamily::MonteCarloLambertCircle.slot()] = convert_stack(
            &mc_square,
            mc_x,
            mc_y,
            mc_bins,
            ProjectionType::Circular,
            data,
        )?;
        on_message(stage("Monte Carlo", 3, 3));
        families[ProjectionFamily::MonteCarloStereographic.slot()] = convert_stack(
            &mc_square,
            mc_x,
            mc_y,
            mc_bins,
            ProjectionType::Stereographic,
            data,
        )?;
        on_message("Reading Monte Carlo data sets complete!\n".into());

        self.families = families;
        self.ekevs.clone_from(&data.ekevs);

        let report = CacheLoadReport {
            slots: ProjectionFamily::ALL
                .iter()
                .map(|&f| (f, self.families[f.slot()].len()))
                .collect(),
            elapsed: start.elapsed(),
        };
        log::info!(
            "display cache loaded: {} images in {:.2?}",
            report.total_slots(),
            report.elapsed
        );
        Ok(report)
    }

    /// Drops every cached image.
    pub fn clear(&mut self) {
        for family in &mut self.families {
            family.clear();
        }
        self.ekevs.clear();
    }

    /// Image for a 1-based `energy_bin` of the family shown for
    /// `(source, mode)`.
    #[must_use]
    pub fn query(&self, source: DataSource, mode: ProjectionMode, energy_bin: usize) -> ImageData {
        self.query_family(ProjectionFamily::resolve(source, mode), energy_bin)
    }

    /// Image for a 1-based `energy_bin` of `family`, or
    /// [`ImageData::empty`] outside `1..=count`.
    #[must_use]
    pub fn query_family(&self, family: ProjectionFamily, energy_bin: usize) -> ImageData {
        energy_bin
            .checked_sub(1)
            .and_then(|bin| self.families[family.slot()].get(bin))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of cached energy bins for `family`.
    #[must_use]
    pub fn slot_count(&self, family: ProjectionFamily) -> usize {
        self.families[family.slot()].len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.iter().all(Vec::is_empty)
    }
}

fn stage(kind: &str, current: usize, total: usize) -> String {
    format!("Reading {kind} data sets ({current}/{total})...")
}

fn render_stack<T: ebsdview_core::PixelValue>(
    data: &[T],
    width: usize,
    height: usize,
    bins: usize,
    master: &MasterPatternData,
) -> Result<Vec<ImageData>> {
    let images = (0..bins)
        .into_par_iter()
        .map(|bin| -> Result<ImageData> {
            let kev = master.kev(bin).unwrap_or(0.0);
            Ok(generate_image(data, width, height, bin)?.with_kev(kev))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(images)
}

fn convert_stack<T: ebsdview_core::PixelValue>(
    data: &[T],
    width: usize,
    height: usize,
    bins: usize,
    projection: ProjectionType,
    master: &MasterPatternData,
) -> Result<Vec<ImageData>> {
    if width != height {
        return Err(CoreError::InvalidMasterData(format!(
            "cannot convert non-square {width}x{height} Lambert projection"
        ))
        .into());
    }
    let images = (0..bins)
        .into_par_iter()
        .map(|bin| -> Result<ImageData> {
            let disk = convert_square_slice(data, width, bin, width, projection)?;
            let kev = master.kev(bin).unwrap_or(0.0);
            Ok(generate_image(&disk, width, width, 0)?.with_kev(kev))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(images)
}
