//! HDF5 master-pattern files.
//!
//! Layout (groups relative to the file root):
//!
//! | path | content |
//! |---|---|
//! | `EMData/EBSDmaster/mLPNH`, `mLPSH` | `[numset, energy, y, x]` Lambert squares |
//! | `EMData/EBSDmaster/masterSPNH` | `[energy, y, x]` stereographic projection |
//! | `EMData/EBSDmaster/EkeVs` | energy of each bin (keV) |
//! | `EMData/EBSDmaster/numEbins`, `numset` | counts |
//! | `EMData/MCOpenCL/accum_e` | `[x, y, energy]` Monte-Carlo counts |
//! | `NMLparameters/MCCLNameList/*` | `numsx`, `EkeV`, `Ehistmin`, `Ebinsize`, `sig`, `omega` |
//! | `NMLparameters/EBSDMasterNameList/npx` | Lambert half-width |
//! | `EMheader/{EBSDmaster,MCOpenCL}/{ProgramName,Version}` | provenance strings (optional) |

use std::path::Path;
use std::str::FromStr;

use ebsdview_core::{MasterPatternData, MasterPatternLoader};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{File, Group};
use ndarray::{ArrayView, ArrayView1};

use crate::{Error, Result};

const MASTER_GROUP: [&str; 2] = ["EMData", "EBSDmaster"];
const MONTE_CARLO_GROUP: [&str; 2] = ["EMData", "MCOpenCL"];
const MC_NAMELIST: [&str; 2] = ["NMLparameters", "MCCLNameList"];
const MP_NAMELIST: [&str; 2] = ["NMLparameters", "EBSDMasterNameList"];
const MP_HEADER: [&str; 2] = ["EMheader", "EBSDmaster"];
const MC_HEADER: [&str; 2] = ["EMheader", "MCOpenCL"];

/// [`MasterPatternLoader`] backed by HDF5 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5MasterPatternReader;

impl MasterPatternLoader for Hdf5MasterPatternReader {
    fn load(&self, path: &Path) -> ebsdview_core::Result<MasterPatternData> {
        read_master_pattern(path).map_err(|e| match e {
            Error::CoreError(core) => core,
            other => ebsdview_core::Error::ReadError(other.to_string()),
        })
    }
}

/// Read a master-pattern file.
///
/// # Errors
/// Returns an error if a required dataset is missing, has the wrong rank, or
/// HDF5 I/O fails. Provenance strings and namelist parameters are optional.
pub fn read_master_pattern<P: AsRef<Path>>(path: P) -> Result<MasterPatternData> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let master = open_group(&file, &MASTER_GROUP)?;
    let (master_lpnh, mlpnh_dims) = read_array::<f32, 4>(&master, "mLPNH")?;
    let (master_lpsh, mlpsh_dims) = read_array::<f32, 4>(&master, "mLPSH")?;
    let (master_spnh, master_spnh_dims) = read_array::<f32, 3>(&master, "masterSPNH")?;
    let ekevs = master.dataset("EkeVs")?.read_raw::<f32>()?;
    let num_mp_energy_bins = read_count(&master, "numEbins")?.unwrap_or(ekevs.len());
    let numset = read_count(&master, "numset")?.unwrap_or(mlpnh_dims[0]);

    let monte_carlo = open_group(&file, &MONTE_CARLO_GROUP)?;
    let (monte_carlo_square, monte_carlo_dims) = read_array::<i32, 3>(&monte_carlo, "accum_e")?;

    let mc_nml = open_group(&file, &MC_NAMELIST).ok();
    let mp_nml = open_group(&file, &MP_NAMELIST).ok();
    let mc_param = |name: &str| -> Result<f32> {
        Ok(mc_nml
            .as_ref()
            .map(|g| read_first::<f64>(g, name))
            .transpose()?
            .flatten()
            .map_or(0.0, to_f32))
    };

    let data = MasterPatternData {
        mp_program_name: read_header(&file, &MP_HEADER, "ProgramName"),
        mp_version_id: read_header(&file, &MP_HEADER, "Version"),
        mc_program_name: read_header(&file, &MC_HEADER, "ProgramName"),
        mc_version_id: read_header(&file, &MC_HEADER, "Version"),
        num_mp_energy_bins,
        ekevs,
        master_lpnh,
        mlpnh_dims,
        master_lpsh,
        mlpsh_dims,
        master_spnh,
        master_spnh_dims,
        monte_carlo_square,
        monte_carlo_dims,
        numsx: match mc_nml.as_ref() {
            Some(g) => read_count(g, "numsx")?,
            None => None,
        }
        .unwrap_or(monte_carlo_dims[0]),
        numset,
        npx: match mp_nml.as_ref() {
            Some(g) => read_count(g, "npx")?,
            None => None,
        }
        .unwrap_or(mlpnh_dims[3] / 2),
        incident_beam_voltage: mc_param("EkeV")?,
        min_energy: mc_param("Ehistmin")?,
        energy_bin_size: mc_param("Ebinsize")?,
        sigma: mc_param("sig")?,
        omega: mc_param("omega")?,
    };
    data.validate()?;

    log::info!(
        "read master pattern {}: {} energy bins, mLPNH {}",
        path.display(),
        data.energy_bin_count(),
        ebsdview_core::format_dims(&data.mlpnh_dims)
    );
    Ok(data)
}

/// Write a master-pattern file in the layout [`read_master_pattern`] expects.
///
/// # Errors
/// Returns an error if the data is inconsistent or HDF5 I/O fails.
pub fn write_master_pattern<P: AsRef<Path>>(path: P, data: &MasterPatternData) -> Result<()> {
    data.validate()?;
    let file = File::create(path)?;

    let master = create_group(&file, &MASTER_GROUP)?;
    write_array(&master, "mLPNH", &data.master_lpnh, &data.mlpnh_dims)?;
    write_array(&master, "mLPSH", &data.master_lpsh, &data.mlpsh_dims)?;
    write_array(&master, "masterSPNH", &data.master_spnh, &data.master_spnh_dims)?;
    write_array(&master, "EkeVs", &data.ekevs, &[data.ekevs.len()])?;
    write_value(&master, "numEbins", to_i32(data.num_mp_energy_bins)?)?;
    write_value(&master, "numset", to_i32(data.numset)?)?;

    let monte_carlo = create_group(&file, &MONTE_CARLO_GROUP)?;
    write_array(
        &monte_carlo,
        "accum_e",
        &data.monte_carlo_square,
        &data.monte_carlo_dims,
    )?;

    let mc_nml = create_group(&file, &MC_NAMELIST)?;
    write_value(&mc_nml, "numsx", to_i32(data.numsx)?)?;
    write_value(&mc_nml, "EkeV", f64::from(data.incident_beam_voltage))?;
    write_value(&mc_nml, "Ehistmin", f64::from(data.min_energy))?;
    write_value(&mc_nml, "Ebinsize", f64::from(data.energy_bin_size))?;
    write_value(&mc_nml, "sig", f64::from(data.sigma))?;
    write_value(&mc_nml, "omega", f64::from(data.omega))?;

    let mp_nml = create_group(&file, &MP_NAMELIST)?;
    write_value(&mp_nml, "npx", to_i32(data.npx)?)?;

    let mp_header = create_group(&file, &MP_HEADER)?;
    write_string(&mp_header, "ProgramName", &data.mp_program_name)?;
    write_string(&mp_header, "Version", &data.mp_version_id)?;
    let mc_header = create_group(&file, &MC_HEADER)?;
    write_string(&mc_header, "ProgramName", &data.mc_program_name)?;
    write_string(&mc_header, "Version", &data.mc_version_id)?;

    Ok(())
}

fn open_group(file: &File, path: &[&str]) -> Result<Group> {
    let mut group = file.group(path[0])?;
    for name in &path[1..] {
        group = group.group(name)?;
    }
    Ok(group)
}

fn create_group(file: &File, path: &[&str]) -> Result<Group> {
    let mut group = match file.group(path[0]) {
        Ok(g) => g,
        Err(_) => file.create_group(path[0])?,
    };
    for name in &path[1..] {
        group = match group.group(name) {
            Ok(g) => g,
            Err(_) => group.create_group(name)?,
        };
    }
    Ok(group)
}

fn read_array<T: H5Type, const N: usize>(group: &Group, name: &str) -> Result<(Vec<T>, [usize; N])> {
    let dataset = group.dataset(name)?;
    let shape = dataset.shape();
    let dims: [usize; N] = shape.as_slice().try_into().map_err(|_| {
        Error::InvalidFormat(format!(
            "dataset {name} has rank {}, expected {N}",
            shape.len()
        ))
    })?;
    Ok((dataset.read_raw::<T>()?, dims))
}

fn read_first<T: H5Type + Copy>(group: &Group, name: &str) -> Result<Option<T>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(dataset.read_raw::<T>()?.first().copied()),
        Err(_) => Ok(None),
    }
}

fn read_count(group: &Group, name: &str) -> Result<Option<usize>> {
    read_first::<i64>(group, name)?
        .map(|value| {
            usize::try_from(value)
                .map_err(|_| Error::InvalidFormat(format!("{name} is negative: {value}")))
        })
        .transpose()
}

fn read_header(file: &File, path: &[&str], name: &str) -> String {
    open_group(file, path)
        .ok()
        .and_then(|group| group.dataset(name).ok())
        .and_then(|dataset| dataset.read_raw::<VarLenUnicode>().ok())
        .and_then(|values| values.first().map(ToString::to_string))
        .unwrap_or_default()
}

fn write_array<T: H5Type>(group: &Group, name: &str, data: &[T], dims: &[usize]) -> Result<()> {
    let view = ArrayView::from_shape(dims, data)
        .map_err(|e| Error::InvalidFormat(format!("{name} shape mismatch: {e}")))?;
    let dataset = group.new_dataset::<T>().shape(dims.to_vec()).create(name)?;
    dataset.write(view)?;
    Ok(())
}

fn write_value<T: H5Type>(group: &Group, name: &str, value: T) -> Result<()> {
    let dataset = group.new_dataset::<T>().shape((1,)).create(name)?;
    dataset.write(ArrayView1::from(std::slice::from_ref(&value)))?;
    Ok(())
}

fn write_string(group: &Group, name: &str, value: &str) -> Result<()> {
    let value = VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 string: {e}")))?;
    write_value(group, name, value)
}

fn to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidFormat(format!("{value} exceeds i32")))
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(value: f64) -> f32 {
    value as f32
}
