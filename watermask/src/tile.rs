//! Decoded water mask tiles.
//!
//! A [`DecodedTile`] is the in-memory form of one raster file: a single band
//! of class codes in row-major order, row 0 at the northern edge.

use crate::error::{Result, WaterMaskError};
use crate::grid::BoundingBox;

/// Class code stored for raster values that do not fit a `u8`.
///
/// It falls outside the known categories, so it classifies as land.
pub const NO_CLASS: u8 = u8::MAX;

/// A decoded single-band tile.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    raster: Vec<u8>,
    width: usize,
    height: usize,
    bbox: BoundingBox,
}

impl DecodedTile {
    /// Build a tile from a row-major raster.
    ///
    /// # Errors
    ///
    /// Returns [`WaterMaskError::InvalidRaster`] if the dimensions are zero,
    /// the raster length does not equal `width * height`, or the bounding box
    /// is empty or non-finite.
    pub fn new(raster: Vec<u8>, width: usize, height: usize, bbox: BoundingBox) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(WaterMaskError::InvalidRaster {
                reason: format!("zero dimensions {}x{}", width, height),
            });
        }
        if raster.len() != width * height {
            return Err(WaterMaskError::InvalidRaster {
                reason: format!(
                    "expected {} samples for {}x{}, got {}",
                    width * height,
                    width,
                    height,
                    raster.len()
                ),
            });
        }
        if !bbox.is_valid() || bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(WaterMaskError::InvalidRaster {
                reason: format!("degenerate bounding box {:?}", bbox),
            });
        }

        Ok(Self {
            raster,
            width,
            height,
            bbox,
        })
    }

    /// Raster width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Geographic extent of the raster.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Raw class codes, row-major.
    pub fn raster(&self) -> &[u8] {
        &self.raster
    }

    /// Raw class code at a pixel, or `None` outside the raster.
    pub fn value_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.raster.get(y * self.width + x).copied()
    }

    /// Approximate in-memory size of the raster in bytes.
    pub fn size_bytes(&self) -> usize {
        self.raster.len()
    }
}

/// Convert a decoded sample to a class code.
///
/// Integers in `0..=255` are kept as-is; fractional, negative, oversized
/// and NaN samples become [`NO_CLASS`].
pub fn to_class_code(value: f64) -> u8 {
    if value.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&value) {
        value as u8
    } else {
        NO_CLASS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(-10.0, 45.0, -5.0, 50.0)
    }

    #[test]
    fn test_new_valid_tile() {
        let tile = DecodedTile::new(vec![0, 1, 2, 3, 4, 5], 3, 2, bbox()).unwrap();

        assert_eq!(tile.width(), 3);
        assert_eq!(tile.height(), 2);
        assert_eq!(tile.bbox(), bbox());
        assert_eq!(tile.size_bytes(), 6);
        assert_eq!(tile.value_at(0, 0), Some(0));
        assert_eq!(tile.value_at(2, 1), Some(5));
        assert_eq!(tile.value_at(3, 0), None);
        assert_eq!(tile.value_at(0, 2), None);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = DecodedTile::new(vec![0; 5], 3, 2, bbox());
        assert!(matches!(result, Err(WaterMaskError::InvalidRaster { .. })));
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        assert!(DecodedTile::new(Vec::new(), 0, 0, bbox()).is_err());
    }

    #[test]
    fn test_new_rejects_degenerate_bbox() {
        let flat = BoundingBox::new(-10.0, 45.0, -10.0, 50.0);
        assert!(DecodedTile::new(vec![0; 4], 2, 2, flat).is_err());

        let inverted = BoundingBox::new(-5.0, 45.0, -10.0, 50.0);
        assert!(DecodedTile::new(vec![0; 4], 2, 2, inverted).is_err());

        let nan = BoundingBox::new(f64::NAN, 45.0, -5.0, 50.0);
        assert!(DecodedTile::new(vec![0; 4], 2, 2, nan).is_err());
    }

    #[test]
    fn test_to_class_code() {
        assert_eq!(to_class_code(0.0), 0);
        assert_eq!(to_class_code(5.0), 5);
        assert_eq!(to_class_code(255.0), 255);
        assert_eq!(to_class_code(256.0), NO_CLASS);
        assert_eq!(to_class_code(-1.0), NO_CLASS);
        assert_eq!(to_class_code(1.5), NO_CLASS);
        assert_eq!(to_class_code(f64::NAN), NO_CLASS);
        assert_eq!(to_class_code(-32768.0), NO_CLASS);
    }
}
