//! Fixed-size tile grid math.
//!
//! The plane is partitioned into `tile_size` × `tile_size` degree cells. A
//! cell is identified by the integer row/column of its southwest corner:
//!
//! ```text
//! row = floor(lat / tile_size)
//! col = floor(lon / tile_size)
//! ```
//!
//! Every coordinate maps to exactly one cell, whether or not a tile exists
//! for it.

use crate::error::{Result, WaterMaskError};

/// Tile edge length used by the published water mask tiles, in degrees.
pub const DEFAULT_TILE_SIZE: f64 = 5.0;

/// Tolerance when checking that a declared tile corner sits on the grid.
const CORNER_EPSILON: f64 = 1e-9;

/// A geographic bounding box in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western boundary.
    pub min_lon: f64,
    /// Southern boundary.
    pub min_lat: f64,
    /// Eastern boundary.
    pub max_lon: f64,
    /// Northern boundary.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `min_lon` - Western boundary longitude
    /// * `min_lat` - Southern boundary latitude
    /// * `max_lon` - Eastern boundary longitude
    /// * `max_lat` - Northern boundary latitude
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point lies inside the half-open box
    /// `[min_lon, max_lon) × [min_lat, max_lat)`.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..self.max_lon).contains(&lon) && (self.min_lat..self.max_lat).contains(&lat)
    }

    /// Check if this box overlaps another. Touching edges do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
            && self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
    }

    /// True when every coordinate is finite and the box is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lon <= self.max_lon
            && self.min_lat <= self.max_lat
    }
}

/// Identifier of one grid cell: the row (latitude index) and column
/// (longitude index) of its southwest corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCellId {
    row: i32,
    col: i32,
}

impl GridCellId {
    /// Create a cell id from raw grid indices.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Latitude index, `floor(lat / tile_size)`.
    pub fn row(&self) -> i32 {
        self.row
    }

    /// Longitude index, `floor(lon / tile_size)`.
    pub fn col(&self) -> i32 {
        self.col
    }
}

/// A fixed, origin-aligned grid of square tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    tile_size: f64,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileGrid {
    /// Create a grid with the given tile edge length in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`WaterMaskError::InvalidTileSize`] unless `tile_size` is
    /// finite and positive.
    pub fn new(tile_size: f64) -> Result<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(WaterMaskError::InvalidTileSize { size: tile_size });
        }
        Ok(Self { tile_size })
    }

    /// Tile edge length in degrees.
    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Grid cell containing `(lon, lat)`.
    ///
    /// Returns `None` for non-finite coordinates or coordinates so large the
    /// cell index does not fit in an `i32`.
    pub fn cell_for(&self, lon: f64, lat: f64) -> Option<GridCellId> {
        let row = self.index_for(lat)?;
        let col = self.index_for(lon)?;
        Some(GridCellId::new(row, col))
    }

    /// Grid cell whose southwest corner is exactly `(min_lon, min_lat)`.
    ///
    /// Returns `None` when the corner is not on a grid line, since no
    /// coordinate would ever resolve to a tile declared there.
    pub fn cell_for_corner(&self, min_lon: f64, min_lat: f64) -> Option<GridCellId> {
        let cell = self.cell_for(min_lon, min_lat)?;
        let (lon, lat) = self.south_west(cell);
        let aligned = (lon - min_lon).abs() < CORNER_EPSILON && (lat - min_lat).abs() < CORNER_EPSILON;
        aligned.then_some(cell)
    }

    /// Southwest corner of a cell as `(lon, lat)`.
    pub fn south_west(&self, cell: GridCellId) -> (f64, f64) {
        (
            cell.col as f64 * self.tile_size,
            cell.row as f64 * self.tile_size,
        )
    }

    /// Geographic extent of a cell.
    pub fn bounds(&self, cell: GridCellId) -> BoundingBox {
        let (min_lon, min_lat) = self.south_west(cell);
        BoundingBox::new(
            min_lon,
            min_lat,
            min_lon + self.tile_size,
            min_lat + self.tile_size,
        )
    }

    /// Every cell touched by `bbox`, walking south to north and west to east
    /// from the floor-aligned southwest corner.
    ///
    /// The box is first clamped to the world (lon ±180, lat ±90). The
    /// northern and eastern edges are inclusive: a box ending exactly on a
    /// grid line also yields the cells that start on that line. Invalid boxes
    /// and boxes entirely outside the world yield nothing.
    pub fn cells_in(&self, bbox: &BoundingBox) -> Vec<GridCellId> {
        if !bbox.is_valid() {
            return Vec::new();
        }

        let bbox = BoundingBox::new(
            bbox.min_lon.max(-180.0),
            bbox.min_lat.max(-90.0),
            bbox.max_lon.min(180.0),
            bbox.max_lat.min(90.0),
        );
        if !bbox.is_valid() {
            return Vec::new();
        }

        let (Some(south), Some(west)) = (self.index_for(bbox.min_lat), self.index_for(bbox.min_lon))
        else {
            return Vec::new();
        };
        let (Some(north), Some(east)) = (self.index_for(bbox.max_lat), self.index_for(bbox.max_lon))
        else {
            return Vec::new();
        };

        let mut cells = Vec::new();
        for row in south..=north {
            for col in west..=east {
                cells.push(GridCellId::new(row, col));
            }
        }
        cells
    }

    fn index_for(&self, degrees: f64) -> Option<i32> {
        let index = (degrees / self.tile_size).floor();
        if !index.is_finite() || index < i32::MIN as f64 || index > i32::MAX as f64 {
            return None;
        }
        Some(index as i32)
    }
}
