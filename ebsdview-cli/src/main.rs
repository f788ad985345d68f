//! ebsdview command-line interface.
//!
//! Inspects master-pattern files, exports their projections as PNG stacks
//! and generates detector patterns for a list of Euler angles.
#![allow(
    clippy::uninlined_format_args,
    clippy::redundant_closure_for_method_calls,
    clippy::too_many_lines
)]

mod export;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use ebsdview_core::{DetectorData, MasterPatternData, PatternDisplayData};
use ebsdview_io::{read_angle_file, read_master_pattern, Hdf5MasterPatternReader};
use ebsdview_pipeline::{
    DataSource, DisplayCache, PatternDisplayController, ProjectionFamily, ProjectionMode,
    SchedulerConfig, WorkbenchEvent,
};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    EbsdIo(#[from] ebsdview_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] ebsdview_core::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] ebsdview_pipeline::Error),

    #[error("Invalid detector file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image too large to encode: {}", .0.display())]
    ImageTooLarge(PathBuf),

    #[error("Pattern generation stopped before completion")]
    Interrupted,
}

/// Which data set to export.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Source {
    /// Master-pattern projections
    Master,
    /// Monte-Carlo energy histograms
    MonteCarlo,
}

/// Projection to export.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Modified Lambert square (northern hemisphere for master patterns)
    LambertSquare,
    /// Lambert-circle projection
    LambertCircle,
    /// Stereographic projection
    Stereographic,
    /// Every family of the selected source
    All,
}

/// EBSD master-pattern viewer and detector-pattern generator.
#[derive(Parser)]
#[command(name = "ebsdview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a master-pattern file
    Info {
        /// Input HDF5 master-pattern file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export master-pattern or Monte-Carlo projections as PNG images
    ExportMaster {
        /// Input HDF5 master-pattern file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Data set to export
        #[arg(long, value_enum, default_value = "master")]
        source: Source,

        /// Projection to export
        #[arg(long, value_enum, default_value = "all")]
        mode: Mode,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate detector patterns for a list of Euler angles
    Generate {
        /// Input HDF5 master-pattern file
        input: PathBuf,

        /// Euler angle file (`eu` degrees or `rd` radians)
        #[arg(short, long)]
        angles: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Detector parameters as JSON (defaults for missing fields)
        #[arg(long)]
        detector: Option<PathBuf>,

        /// Pattern generated first
        #[arg(long, default_value = "0")]
        focus: usize,

        /// Patterns moved ahead of the backlog once generation has started
        #[arg(long, num_args = 1..)]
        priority: Vec<usize>,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Detector binning factor
        #[arg(long, default_value = "1")]
        binning: usize,

        /// Gamma applied to pattern intensities
        #[arg(long, default_value = "0.34")]
        gamma: f32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input, json } => {
            let data = read_master_pattern(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info_json(&input, &data))?);
            } else {
                print_info(&input, &data);
            }
        }

        Commands::ExportMaster {
            input,
            output,
            source,
            mode,
            verbose,
        } => {
            let start = Instant::now();
            let data = read_master_pattern(&input)?;
            std::fs::create_dir_all(&output)?;
            log::info!("exporting {:?} {:?} from {}", source, mode, input.display());

            let mut cache = DisplayCache::new();
            cache.load(&data, |line| {
                if verbose {
                    eprintln!("{}", line.trim_end());
                }
            })?;

            let mut written = 0usize;
            for family in export_families(source, mode) {
                let stem = family_stem(family);
                for bin in 1..=cache.slot_count(family) {
                    let path = export::numbered_path(&output, stem, bin);
                    if export::write_png(&path, &cache.query_family(family, bin))? {
                        written += 1;
                    }
                }
                if verbose {
                    eprintln!("{}: {} images", family, cache.slot_count(family));
                }
            }
            log::info!("export finished: {} images", written);
            println!(
                "Wrote {} images to {} in {:.2?}",
                written,
                output.display(),
                start.elapsed()
            );
        }

        Commands::Generate {
            input,
            angles,
            output,
            detector,
            focus,
            priority,
            threads,
            binning,
            gamma,
            verbose,
        } => {
            let start = Instant::now();
            let mut detector = match detector {
                Some(path) => serde_json::from_str::<DetectorData>(&std::fs::read_to_string(path)?)?,
                None => DetectorData::default(),
            };
            detector.master_file_path.clone_from(&input);
            let display = PatternDisplayData {
                angles: read_angle_file(&angles)?,
                current_row: focus,
                detector_binning_value: binning,
                gamma_value: gamma,
            };
            let count = display.angle_count();
            std::fs::create_dir_all(&output)?;

            let (tx, rx) = mpsc::channel();
            let config = SchedulerConfig {
                num_threads: threads,
                ..SchedulerConfig::default()
            };
            let mut controller =
                PatternDisplayController::new(Arc::new(Hdf5MasterPatternReader), &config, tx)?;
            controller.set_master_file_path(&input)?;
            controller.generate_pattern_images(detector, display)?;
            for index in priority {
                controller.add_priority_index(index);
            }

            if verbose {
                eprintln!(
                    "Generating {} patterns on {} workers",
                    count,
                    controller.scheduler().num_workers()
                );
            }

            log::info!(
                "generating {} patterns from {} (focus {})",
                count,
                input.display(),
                focus
            );
            let mut written = 0usize;
            let mut failed = 0usize;
            loop {
                let event = rx.recv().map_err(|_| CliError::Interrupted)?;
                match event {
                    WorkbenchEvent::PatternImageReady { index, image } => {
                        let path = export::numbered_path(&output, "pattern", index);
                        if export::write_png(&path, &image)? {
                            written += 1;
                        }
                    }
                    WorkbenchEvent::ProgressValue(done) if verbose => {
                        eprintln!("Processed {}/{} patterns", done, count);
                    }
                    WorkbenchEvent::StdOutput(line) if verbose => {
                        eprintln!("{}", line.trim_end());
                    }
                    WorkbenchEvent::Error(message) => {
                        failed += 1;
                        eprintln!("Error: {}", message);
                    }
                    WorkbenchEvent::PatternGenerationFinished => {
                        log::info!(
                            "pattern generation finished: {} written, {} failed",
                            written,
                            failed
                        );
                        break;
                    }
                    _ => {}
                }
            }

            println!(
                "Wrote {} patterns to {} in {:.2?} ({} failed)",
                written,
                output.display(),
                start.elapsed(),
                failed
            );
        }
    }

    Ok(())
}

fn print_info(path: &Path, data: &MasterPatternData) {
    println!("File: {}", path.display());
    println!(
        "Master pattern: {} (version {})",
        data.mp_program_name, data.mp_version_id
    );
    println!(
        "Monte Carlo:    {} (version {})",
        data.mc_program_name, data.mc_version_id
    );
    println!("Energy bins:    {}", data.num_mp_energy_bins);
    if let (Some(first), Some(last)) = (data.ekevs.first(), data.ekevs.last()) {
        println!("Energy range:   {:.2} - {:.2} keV", first, last);
    }
    println!(
        "mLPNH:          {}",
        ebsdview_core::format_dims(&data.mlpnh_dims)
    );
    println!(
        "masterSPNH:     {}",
        ebsdview_core::format_dims(&data.master_spnh_dims)
    );
    println!(
        "accum_e:        {}",
        ebsdview_core::format_dims(&data.monte_carlo_dims)
    );
    println!("Sample tilt:    {:.2} deg", data.sigma);
    println!("Omega:          {:.2} deg", data.omega);
    println!("Beam voltage:   {:.2} kV", data.incident_beam_voltage);
}

fn info_json(path: &Path, data: &MasterPatternData) -> serde_json::Value {
    serde_json::json!({
        "file": path.display().to_string(),
        "mp_program_name": data.mp_program_name,
        "mp_version_id": data.mp_version_id,
        "mc_program_name": data.mc_program_name,
        "mc_version_id": data.mc_version_id,
        "num_mp_energy_bins": data.num_mp_energy_bins,
        "ekevs": data.ekevs,
        "mlpnh_dims": data.mlpnh_dims,
        "mlpsh_dims": data.mlpsh_dims,
        "master_spnh_dims": data.master_spnh_dims,
        "monte_carlo_dims": data.monte_carlo_dims,
        "numsx": data.numsx,
        "numset": data.numset,
        "npx": data.npx,
        "incident_beam_voltage": data.incident_beam_voltage,
        "min_energy": data.min_energy,
        "energy_bin_size": data.energy_bin_size,
        "omega": data.omega,
        "sigma": data.sigma,
    })
}

fn export_families(source: Source, mode: Mode) -> Vec<ProjectionFamily> {
    let source = match source {
        Source::Master => DataSource::Master,
        Source::MonteCarlo => DataSource::MonteCarlo,
    };
    let mode = match mode {
        Mode::LambertSquare => ProjectionMode::LambertSquare,
        Mode::LambertCircle => ProjectionMode::LambertCircle,
        Mode::Stereographic => ProjectionMode::Stereographic,
        Mode::All => {
            return ProjectionFamily::ALL
                .into_iter()
                .filter(|f| f.source() == source)
                .collect()
        }
    };
    vec![ProjectionFamily::resolve(source, mode)]
}

fn family_stem(family: ProjectionFamily) -> &'static str {
    match family {
        ProjectionFamily::MasterLambertNorth => "master_lambert_north",
        ProjectionFamily::MasterLambertSouth => "master_lambert_south",
        ProjectionFamily::MasterLambertCircle => "master_lambert_circle",
        ProjectionFamily::MasterStereographic => "master_stereographic",
        ProjectionFamily::MonteCarloLambertSquare => "mc_lambert_square",
        ProjectionFamily::MonteCarloLambertCircle => "mc_lambert_circle",
        ProjectionFamily::MonteCarloStereographic => "mc_stereographic",
    }
}
