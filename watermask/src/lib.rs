//! # watermask - Land/Water Point Classification
//!
//! Answers "is this coordinate on water, and what kind?" from a directory of
//! raster water mask tiles, keeping a bounded number of decoded tiles in
//! memory.
//!
//! ## Features
//!
//! - **Lazy**: the directory is indexed once by filename; rasters are only
//!   decoded when a query needs them
//! - **Bounded memory**: an exact LRU cache holds at most `N` decoded tiles
//! - **Two query paths**: async queries load missing tiles, sync queries
//!   answer from the cache without any I/O
//! - **Pure Rust decoding**: GeoTIFFs decode on the calling thread, no GDAL
//!
//! ## Quick Start
//!
//! ```ignore
//! use watermask::{WaterServiceBuilder, WaterType};
//!
//! let service = WaterServiceBuilder::new("/data/watermask")
//!     .cache_size(10)
//!     .build()?;
//! service.initialize();
//!
//! match service.get_water_type(-9.5, 45.5).await {
//!     WaterType::Land => println!("dry"),
//!     other => println!("water: {}", other),
//! }
//! ```
//!
//! ## Tile Layout
//!
//! Tiles are single-band rasters covering a fixed-size square of the globe
//! (5° by default). Each file name carries its southwest corner, e.g.
//! `OSM_WaterLayer_N45W010.tif` covers longitudes -10..-5 and latitudes
//! 45..50. Files may sit anywhere below the data directory.
//!
//! Raster values map to categories:
//!
//! | Value | Category |
//! |-------|----------|
//! | 0 | land |
//! | 1 | ocean |
//! | 2 | lake |
//! | 3 | river |
//! | 4 | canal |
//! | 5 | stream |
//! | other | land |
//!
//! Coordinates are decimal degrees (WGS84), always passed as `(lon, lat)`.

pub mod cache;
pub mod classifier;
pub mod error;
pub mod filename;
pub mod grid;
pub mod index;
pub mod loader;
pub mod service;
pub mod tile;

// Re-export main types at crate root for convenience
pub use cache::{TileCache, DEFAULT_CACHE_SIZE};
pub use classifier::{classify, pixel_for, sample, ParseWaterTypeError, WaterType};
pub use error::{Result, WaterMaskError};
pub use grid::{BoundingBox, GridCellId, TileGrid, DEFAULT_TILE_SIZE};
pub use index::{TileCatalogEntry, TileIndex};
pub use loader::{GeoTiffLoader, TileLoader};
pub use service::{
    PreloadStats, ServiceState, ServiceStats, WaterDetectionService, WaterServiceBuilder,
};
pub use tile::{DecodedTile, NO_CLASS};
