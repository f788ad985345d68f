//! Conversion of Lambert squares into circular projections.

use ebsdview_core::{Error, PixelValue, Result};
use rayon::prelude::*;

use crate::lambert::{normalize, sample_bilinear, square_coords, Direction};

/// Target projection for [`convert_square_slice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    /// Equal-area Lambert projection onto the unit disk.
    Circular,
    /// Stereographic projection onto the unit disk.
    Stereographic,
}

impl std::fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionType::Circular => write!(f, "Lambert Circle"),
            ProjectionType::Stereographic => write!(f, "Stereographic"),
        }
    }
}

impl ProjectionType {
    /// Direction on the northern hemisphere for disk coordinates `(u, v)`,
    /// or `None` outside the unit disk.
    #[must_use]
    pub fn disk_to_sphere(self, u: f32, v: f32) -> Option<Direction> {
        let r2 = u * u + v * v;
        if r2 > 1.0 {
            return None;
        }
        let dir = match self {
            ProjectionType::Circular => {
                let s = (2.0 - r2).sqrt();
                [u * s, v * s, 1.0 - r2]
            }
            ProjectionType::Stereographic => {
                let d = 1.0 + r2;
                [2.0 * u / d, 2.0 * v / d, (1.0 - r2) / d]
            }
        };
        Some(normalize(dir))
    }
}

/// Converts slice `slice` of a stack of `side x side` Lambert squares into a
/// `out_dim x out_dim` image of the requested projection.
///
/// Pixels outside the projection disk are zero.
///
/// # Errors
/// Returns an error if `side` or `out_dim` is zero or the slice is out of range.
#[allow(clippy::cast_precision_loss)]
pub fn convert_square_slice<T: PixelValue>(
    data: &[T],
    side: usize,
    slice: usize,
    out_dim: usize,
    projection: ProjectionType,
) -> Result<Vec<f32>> {
    if side == 0 || out_dim == 0 {
        return Err(Error::InvalidDimensions {
            width: side,
            height: out_dim,
        });
    }
    let plane = side * side;
    let square: Vec<f32> = data
        .get(slice * plane..(slice + 1) * plane)
        .ok_or(Error::SliceOutOfRange {
            slice,
            width: side,
            height: side,
            len: data.len(),
        })?
        .iter()
        .map(|v| v.to_f32())
        .collect();

    let scale = if out_dim > 1 {
        2.0 / (out_dim - 1) as f32
    } else {
        0.0
    };
    let mut out = vec![0.0f32; out_dim * out_dim];
    for (row, line) in out.chunks_exact_mut(out_dim).enumerate() {
        let v = row as f32 * scale - 1.0;
        for (col, value) in line.iter_mut().enumerate() {
            let u = col as f32 * scale - 1.0;
            if let Some(dir) = projection.disk_to_sphere(u, v) {
                let (x, y) = square_coords(dir);
                *value = sample_bilinear(&square, side, x, y).unwrap_or(0.0);
            }
        }
    }
    Ok(out)
}

/// Converts every slice of a stack, returning the converted slices laid out
/// consecutively.
///
/// # Errors
/// Returns the first slice conversion error.
pub fn convert_square_stack<T: PixelValue>(
    data: &[T],
    side: usize,
    count: usize,
    out_dim: usize,
    projection: ProjectionType,
) -> Result<Vec<f32>> {
    let slices = (0..count)
        .into_par_iter()
        .map(|slice| convert_square_slice(data, side, slice, out_dim, projection))
        .collect::<Result<Vec<_>>>()?;
    Ok(slices.concat())
}
