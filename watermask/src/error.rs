//! Error types for the watermask library.

use thiserror::Error;

/// Errors that can occur while indexing or decoding water mask tiles.
///
/// Query methods on [`crate::WaterDetectionService`] never return these;
/// they surface through loaders, configuration and logging only.
#[derive(Error, Debug)]
pub enum WaterMaskError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TIFF decoder rejected the file.
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file decoded but its raster is unusable.
    #[error("Invalid raster: {reason}")]
    InvalidRaster { reason: String },

    /// Tile size must be a finite, positive number of degrees.
    #[error("Invalid tile size: {size} (expected a positive number of degrees)")]
    InvalidTileSize { size: f64 },

    /// No data directory was configured.
    #[error("WATERMASK_DATA_DIR environment variable not set")]
    MissingDataDir,
}

/// Result type alias using [`WaterMaskError`].
pub type Result<T> = std::result::Result<T, WaterMaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WaterMaskError::InvalidRaster {
            reason: "empty band".to_string(),
        };
        assert!(err.to_string().contains("empty band"));

        let err = WaterMaskError::InvalidTileSize { size: -5.0 };
        assert!(err.to_string().contains("-5"));

        let err = WaterMaskError::MissingDataDir;
        assert!(err.to_string().contains("WATERMASK_DATA_DIR"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: WaterMaskError = io.into();
        assert!(matches!(err, WaterMaskError::Io(_)));
    }
}
