//! Tile decoding.
//!
//! [`TileLoader`] is the seam between the cache and the raster codec. The
//! default implementation, [`GeoTiffLoader`], decodes GeoTIFF water masks
//! with the pure-Rust `tiff` crate. Decoding always happens on the calling
//! thread from an in-memory buffer; no loader may hand work to a background
//! worker, so the service behaves the same inside worker threads, blocking
//! contexts and async tasks.

use std::io::{Cursor, Read, Seek};

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::error::{Result, WaterMaskError};
use crate::grid::BoundingBox;
use crate::index::TileCatalogEntry;
use crate::tile::{to_class_code, DecodedTile};

/// Default cap on decoder buffers: 1 GB.
const DEFAULT_MAX_BUFFER_BYTES: usize = 1024 * 1024 * 1024;

/// Decodes tile files into [`DecodedTile`]s.
///
/// Implementations must decode synchronously on the calling thread.
pub trait TileLoader: Send + Sync {
    /// Decode the raw bytes of `entry`'s file.
    ///
    /// `entry.bounds` may be used when the file carries no georeferencing.
    fn decode(&self, bytes: &[u8], entry: &TileCatalogEntry) -> Result<DecodedTile>;

    /// Read `entry`'s file and decode it.
    fn load(&self, entry: &TileCatalogEntry) -> Result<DecodedTile> {
        let bytes = std::fs::read(&entry.file_path)?;
        self.decode(&bytes, entry)
    }
}

/// Loader for single-band GeoTIFF water masks.
///
/// Band 0 is read as class codes. Bounds come from the ModelTiepoint and
/// ModelPixelScale tags and fall back to the catalog entry's bounds when the
/// file is not georeferenced.
#[derive(Debug, Clone)]
pub struct GeoTiffLoader {
    max_buffer_bytes: usize,
}

impl Default for GeoTiffLoader {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

impl GeoTiffLoader {
    /// Create a loader with the default 1 GB buffer limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the decoder's buffers at `bytes`.
    ///
    /// Files needing more are rejected with a decode error.
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.decoding_buffer_size = self.max_buffer_bytes;
        limits.intermediate_buffer_size = self.max_buffer_bytes;
        limits.ifd_value_size = self.max_buffer_bytes;
        limits
    }
}

impl TileLoader for GeoTiffLoader {
    fn decode(&self, bytes: &[u8], entry: &TileCatalogEntry) -> Result<DecodedTile> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?.with_limits(self.limits());

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let bbox = match read_bounds(&mut decoder, width, height) {
            Some(bbox) => bbox,
            None => {
                tracing::debug!(
                    path = %entry.file_path.display(),
                    "No GeoTIFF georeferencing, using bounds from filename"
                );
                entry.bounds
            }
        };

        let raster = first_band(decoder.read_image()?, width * height)?;

        DecodedTile::new(raster, width, height, bbox)
    }
}

/// Read the geographic extent from ModelTiepoint + ModelPixelScale.
///
/// The tiepoint ties raster pixel `(i, j)` to model coordinate `(x, y)`;
/// rows run south from the northern edge.
fn read_bounds<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Option<BoundingBox> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;

    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }

    let (tie_i, tie_j) = (tiepoint[0], tiepoint[1]);
    let (tie_x, tie_y) = (tiepoint[3], tiepoint[4]);
    let (scale_x, scale_y) = (scale[0], scale[1]);

    if !(scale_x > 0.0 && scale_y > 0.0) {
        return None;
    }

    let min_lon = tie_x - tie_i * scale_x;
    let max_lat = tie_y + tie_j * scale_y;
    let bbox = BoundingBox::new(
        min_lon,
        max_lat - height as f64 * scale_y,
        min_lon + width as f64 * scale_x,
        max_lat,
    );

    bbox.is_valid().then_some(bbox)
}

/// Extract band 0 from interleaved samples as class codes.
fn first_band(image: DecodingResult, pixels: usize) -> Result<Vec<u8>> {
    match image {
        DecodingResult::U8(values) => band_zero(values, pixels, |v| v),
        DecodingResult::U16(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::U32(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::U64(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::I8(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::I16(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::I32(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::I64(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::F32(values) => band_zero(values, pixels, |v| to_class_code(v as f64)),
        DecodingResult::F64(values) => band_zero(values, pixels, to_class_code),
    }
}

fn band_zero<T: Copy>(values: Vec<T>, pixels: usize, to_code: impl Fn(T) -> u8) -> Result<Vec<u8>> {
    if pixels == 0 || values.len() % pixels != 0 || values.len() < pixels {
        return Err(WaterMaskError::InvalidRaster {
            reason: format!(
                "{} samples do not divide evenly into {} pixels",
                values.len(),
                pixels
            ),
        });
    }

    let samples_per_pixel = values.len() / pixels;
    Ok(values
        .into_iter()
        .step_by(samples_per_pixel)
        .map(to_code)
        .collect())
}
