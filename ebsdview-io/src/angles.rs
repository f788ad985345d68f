//! Euler-angle list files.
//!
//! The format is the plain-text orientation list used by the EBSD
//! simulation tools:
//!
//! ```text
//! eu
//! 2
//! 0.0 45.0 0.0
//! 120.0, 30.0, 10.0
//! ```
//!
//! The first line is the angle type: `eu` for Bunge Euler angles in degrees,
//! `rd` for the same in radians. The second line is the number of triples.
//! Values may be separated by whitespace or commas. Angles are returned in
//! radians, flattened as `phi1, Phi, phi2` per pattern.

use std::path::Path;

use crate::{Error, Result};

/// Reads and parses an angle file.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn read_angle_file(path: &Path) -> Result<Vec<f32>> {
    let text = std::fs::read_to_string(path)?;
    let angles = parse_angles(&text)?;
    log::debug!("read {} orientations from {}", angles.len() / 3, path.display());
    Ok(angles)
}

/// Parses the contents of an angle file.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for an unknown angle type, a bad count,
/// a non-numeric value, a line that is not a triple, or a count mismatch.
pub fn parse_angles(text: &str) -> Result<Vec<f32>> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    let kind = lines
        .next()
        .ok_or_else(|| Error::InvalidFormat("empty angle file".into()))?;
    let degrees = match kind.to_ascii_lowercase().as_str() {
        "eu" => true,
        "rd" => false,
        other => {
            return Err(Error::InvalidFormat(format!(
                "unsupported angle type '{other}'"
            )))
        }
    };

    let count_line = lines
        .next()
        .ok_or_else(|| Error::InvalidFormat("missing orientation count".into()))?;
    let count: usize = count_line
        .parse()
        .map_err(|_| Error::InvalidFormat(format!("invalid orientation count '{count_line}'")))?;

    let mut angles = Vec::with_capacity(count * 3);
    for (line_no, line) in lines.enumerate() {
        let values = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f32>().map_err(|_| {
                    Error::InvalidFormat(format!("invalid angle '{token}' on line {}", line_no + 3))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if values.len() != 3 {
            return Err(Error::InvalidFormat(format!(
                "expected 3 angles on line {}, found {}",
                line_no + 3,
                values.len()
            )));
        }
        angles.extend(
            values
                .into_iter()
                .map(|v| if degrees { v.to_radians() } else { v }),
        );
    }

    if angles.len() != count * 3 {
        return Err(Error::InvalidFormat(format!(
            "header declares {count} orientations, file holds {}",
            angles.len() / 3
        )));
    }
    Ok(angles)
}
