//! Reordering of Monte-Carlo histograms into per-energy slices.

use ebsdview_core::{Error, Result};

/// Reorders a `[x, y, energy]` array with energy fastest into consecutive
/// `[y][x]` planes, one per energy bin.
///
/// `dim_x` and `dim_y` are the Lambert square sides, `dim_e` the number of
/// energy bins.
///
/// # Errors
/// Returns [`Error::InvalidMasterData`] if `data` does not match the dimensions.
pub fn de_hyperslab<T: Copy + Default>(
    data: &[T],
    dim_x: usize,
    dim_y: usize,
    dim_e: usize,
) -> Result<Vec<T>> {
    let expected = dim_x * dim_y * dim_e;
    if data.len() != expected {
        return Err(Error::InvalidMasterData(format!(
            "hyperslab holds {} values, expected {expected}",
            data.len()
        )));
    }

    let plane = dim_x * dim_y;
    let mut out = vec![T::default(); expected];
    for x in 0..dim_x {
        for y in 0..dim_y {
            let src = (x * dim_y + y) * dim_e;
            for e in 0..dim_e {
                out[e * plane + y * dim_x + x] = data[src + e];
            }
        }
    }
    Ok(out)
}
