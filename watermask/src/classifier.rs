//! Point classification.
//!
//! Pure functions that turn a coordinate and a [`DecodedTile`] into a
//! [`WaterType`]. Nothing here touches the filesystem or the cache.

use std::fmt;
use std::str::FromStr;

use crate::tile::DecodedTile;

/// Semantic category of a raster pixel.
///
/// `Land` doubles as the answer when no tile data is available, so callers
/// cannot tell "surveyed land" from "no data" apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaterType {
    /// Raw value 0, unknown values, and the no-data fallback.
    #[default]
    Land,
    /// Raw value 1.
    Ocean,
    /// Raw value 2: lakes and large rivers.
    Lake,
    /// Raw value 3: major rivers.
    River,
    /// Raw value 4.
    Canal,
    /// Raw value 5: small streams.
    Stream,
}

impl WaterType {
    /// All categories in raw-value order.
    pub const ALL: [WaterType; 6] = [
        WaterType::Land,
        WaterType::Ocean,
        WaterType::Lake,
        WaterType::River,
        WaterType::Canal,
        WaterType::Stream,
    ];

    /// `true` for every category except [`WaterType::Land`].
    pub fn is_water(&self) -> bool {
        !matches!(self, WaterType::Land)
    }

    /// The raster code for this category.
    pub fn raw_value(&self) -> u8 {
        match self {
            WaterType::Land => 0,
            WaterType::Ocean => 1,
            WaterType::Lake => 2,
            WaterType::River => 3,
            WaterType::Canal => 4,
            WaterType::Stream => 5,
        }
    }

    /// Lowercase name, as printed by the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterType::Land => "land",
            WaterType::Ocean => "ocean",
            WaterType::Lake => "lake",
            WaterType::River => "river",
            WaterType::Canal => "canal",
            WaterType::Stream => "stream",
        }
    }
}

impl fmt::Display for WaterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWaterTypeError(String);

impl fmt::Display for ParseWaterTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown water type: {}", self.0)
    }
}

impl std::error::Error for ParseWaterTypeError {}

impl FromStr for WaterType {
    type Err = ParseWaterTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaterType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseWaterTypeError(s.to_string()))
    }
}

/// Map a raw raster value to its category.
///
/// Total: anything outside `0..=5` is land.
///
/// ```
/// use watermask::{classify, WaterType};
///
/// assert_eq!(classify(1), WaterType::Ocean);
/// assert_eq!(classify(99), WaterType::Land);
/// ```
pub fn classify(raw: u8) -> WaterType {
    match raw {
        1 => WaterType::Ocean,
        2 => WaterType::Lake,
        3 => WaterType::River,
        4 => WaterType::Canal,
        5 => WaterType::Stream,
        // 0 is land; everything else falls back to it
        _ => WaterType::Land,
    }
}

/// Pixel `(x, y)` under `(lon, lat)`, or `None` when the point falls outside
/// the raster.
///
/// Ratios are taken against the tile's own bounding box, with the latitude
/// ratio inverted because row 0 is the northern edge:
///
/// ```text
/// x = floor((lon - min_lon) / (max_lon - min_lon) * width)
/// y = floor((max_lat - lat) / (max_lat - min_lat) * height)
/// ```
pub fn pixel_for(tile: &DecodedTile, lon: f64, lat: f64) -> Option<(usize, usize)> {
    let bbox = tile.bbox();

    let x_ratio = (lon - bbox.min_lon) / bbox.width();
    let y_ratio = (bbox.max_lat - lat) / bbox.height();

    let x = (x_ratio * tile.width() as f64).floor();
    let y = (y_ratio * tile.height() as f64).floor();

    // Also rejects NaN
    if !(x >= 0.0 && x < tile.width() as f64 && y >= 0.0 && y < tile.height() as f64) {
        return None;
    }

    Some((x as usize, y as usize))
}

/// Category of the pixel under `(lon, lat)`; land when outside the raster.
pub fn sample(tile: &DecodedTile, lon: f64, lat: f64) -> WaterType {
    pixel_for(tile, lon, lat)
        .and_then(|(x, y)| tile.value_at(x, y))
        .map(classify)
        .unwrap_or(WaterType::Land)
}
