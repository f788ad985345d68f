//! Image generation from raw numeric slices.
//!
//! A slice of a 2-D or stacked 3-D array is normalized to an 8-bit grayscale
//! image. The value range found during normalization is kept alongside the
//! image so views can label their color bars.

use crate::error::{Error, Result};

/// Numeric element types that can be rendered.
pub trait PixelValue: Copy + Send + Sync {
    /// Converts the value to `f32` for normalization.
    fn to_f32(self) -> f32;
}

impl PixelValue for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl PixelValue for f64 {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl PixelValue for i32 {
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl PixelValue for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

/// 8-bit grayscale image in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GeneratedImage {
    /// Creates an image from raw pixels.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if `pixels.len() != width * height`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Blank 0x0 image.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at `(x, y)`, if inside the image.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Displayable image with its value range and associated energy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageData {
    /// Normalized image.
    pub image: GeneratedImage,
    /// Smallest finite value in the source slice.
    pub min_value: f32,
    /// Largest finite value in the source slice.
    pub max_value: f32,
    /// Electron energy of the slice in keV (0 when not applicable).
    pub kev_value: f32,
}

impl ImageData {
    /// Blank image, `(0, 0)` range and zero energy.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a copy tagged with the given energy.
    #[must_use]
    pub fn with_kev(mut self, kev: f32) -> Self {
        self.kev_value = kev;
        self
    }
}

/// Generate a normalized grayscale image from slice `slice` of `data`.
///
/// `data` holds consecutive `width * height` slices. Non-finite values are
/// ignored when computing the range and render black. A constant slice renders
/// black with `min == max`.
///
/// # Errors
/// Returns an error if the dimensions are zero or the slice lies past the end
/// of `data`.
pub fn generate_image<T: PixelValue>(
    data: &[T],
    width: usize,
    height: usize,
    slice: usize,
) -> Result<ImageData> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    let values = width
        .checked_mul(height)
        .and_then(|plane| {
            let start = slice.checked_mul(plane)?;
            data.get(start..start.checked_add(plane)?)
        })
        .ok_or(Error::SliceOutOfRange {
            slice,
            width,
            height,
            len: data.len(),
        })?;

    let (min_value, max_value) = values
        .iter()
        .map(|v| v.to_f32())
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f32, f32)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0));

    let span = max_value - min_value;
    let pixels = values
        .iter()
        .map(|v| {
            let v = v.to_f32();
            if span > 0.0 && v.is_finite() {
                normalized_to_u8((v - min_value) / span)
            } else {
                0
            }
        })
        .collect();

    Ok(ImageData {
        image: GeneratedImage::from_pixels(width, height, pixels)?,
        min_value,
        max_value,
        kev_value: 0.0,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalized_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
