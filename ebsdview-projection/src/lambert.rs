//! Modified (square) Lambert projection.
//!
//! Each hemisphere of the unit sphere maps onto a square with equal-area
//! cells. Coordinates returned here are normalized to `[-1, 1]` on both axes;
//! `(0, 0)` is the pole and the square's edge is the equator.

use std::f32::consts::{FRAC_PI_2, PI};

/// Unit vector on the sphere.
pub type Direction = [f32; 3];

/// Maps a direction to normalized Lambert square coordinates.
///
/// The hemisphere is selected by the sign of `z`; the caller decides which
/// square to sample. Returns `(x, y)` in `[-1, 1]`.
#[must_use]
pub fn square_coords(dir: Direction) -> (f32, f32) {
    let [x, y, z] = normalize(dir);
    let q = (2.0 * (1.0 - z.abs())).max(0.0).sqrt();
    let half_side = FRAC_PI_2.sqrt();
    let sqrt_pi = PI.sqrt();

    let (px, py) = if x == 0.0 && y == 0.0 {
        (0.0, 0.0)
    } else if x.abs() >= y.abs() {
        let s = x.signum();
        (
            s * q * sqrt_pi / 2.0,
            s * q * (2.0 / sqrt_pi) * (y / x).atan(),
        )
    } else {
        let s = y.signum();
        (
            s * q * (2.0 / sqrt_pi) * (x / y).atan(),
            s * q * sqrt_pi / 2.0,
        )
    };

    (
        (px / half_side).clamp(-1.0, 1.0),
        (py / half_side).clamp(-1.0, 1.0),
    )
}

/// Converts a normalized coordinate to a fractional pixel position on a grid
/// of `side` pixels.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_pixel(coord: f32, side: usize) -> f32 {
    (coord + 1.0) * 0.5 * (side.saturating_sub(1)) as f32
}

/// Bilinear sample of a `side x side` square at normalized coordinates.
///
/// Returns `None` if `square` is shorter than `side * side`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sample_bilinear(square: &[f32], side: usize, x: f32, y: f32) -> Option<f32> {
    if side == 0 || square.len() < side * side {
        return None;
    }
    let fx = to_pixel(x, side);
    let fy = to_pixel(y, side);
    let x0 = (fx.floor() as usize).min(side - 1);
    let y0 = (fy.floor() as usize).min(side - 1);
    let x1 = (x0 + 1).min(side - 1);
    let y1 = (y0 + 1).min(side - 1);
    let tx = fx - fx.floor();
    let ty = fy - fy.floor();

    let top = square[y0 * side + x0] * (1.0 - tx) + square[y0 * side + x1] * tx;
    let bottom = square[y1 * side + x0] * (1.0 - tx) + square[y1 * side + x1] * tx;
    Some(top * (1.0 - ty) + bottom * ty)
}

/// Nearest pixel index on a `side x side` grid.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn nearest_index(side: usize, x: f32, y: f32) -> usize {
    let px = (to_pixel(x, side).round() as usize).min(side.saturating_sub(1));
    let py = (to_pixel(y, side).round() as usize).min(side.saturating_sub(1));
    py * side + px
}

/// Normalizes a vector; the zero vector maps to the north pole.
#[must_use]
pub fn normalize(v: Direction) -> Direction {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if norm > 0.0 {
        [v[0] / norm, v[1] / norm, v[2] / norm]
    } else {
        [0.0, 0.0, 1.0]
    }
}
