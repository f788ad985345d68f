//! Orientation matrices from Bunge Euler angles.

use crate::lambert::Direction;

/// 3x3 rotation matrix, row-major.
pub type Matrix3 = [[f32; 3]; 3];

/// Passive rotation matrix (sample frame to crystal frame) for Bunge Euler
/// angles `(phi1, Phi, phi2)` in radians.
#[must_use]
pub fn euler_to_matrix([phi1, big_phi, phi2]: [f32; 3]) -> Matrix3 {
    let (s1, c1) = phi1.sin_cos();
    let (s, c) = big_phi.sin_cos();
    let (s2, c2) = phi2.sin_cos();
    [
        [c1 * c2 - s1 * s2 * c, s1 * c2 + c1 * s2 * c, s2 * s],
        [-c1 * s2 - s1 * c2 * c, -s1 * s2 + c1 * c2 * c, c2 * s],
        [s1 * s, -c1 * s, c],
    ]
}

/// Rotation about the x axis by `angle` radians.
#[must_use]
pub fn rotation_x(angle: f32) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

/// Rotation about the z axis by `angle` radians.
#[must_use]
pub fn rotation_z(angle: f32) -> Matrix3 {
    let (s, c) = angle.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

/// Applies `m` to `v`.
#[must_use]
pub fn apply(m: &Matrix3, v: Direction) -> Direction {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}
