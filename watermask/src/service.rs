//! Water detection service with LRU tile caching.
//!
//! [`WaterDetectionService`] ties the catalog, the cache and a
//! [`TileLoader`] together behind a small query API:
//!
//! - [`WaterDetectionService::get_water_type`] loads missing tiles, suspending
//!   only while the file is read.
//! - [`WaterDetectionService::get_water_type_sync`] answers from the cache and
//!   never touches the disk.
//! - [`WaterDetectionService::get_water_type_blocking`] loads missing tiles on
//!   the calling thread, for callers without an async runtime.
//!
//! ```ignore
//! use watermask::WaterServiceBuilder;
//!
//! let service = WaterServiceBuilder::new("/data/watermask")
//!     .cache_size(20)
//!     .build()?;
//! service.initialize();
//!
//! let water_type = service.get_water_type(-9.5, 45.5).await;
//! println!("{}", water_type);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::cache::{TileCache, DEFAULT_CACHE_SIZE};
use crate::classifier::{sample, WaterType};
use crate::error::{Result, WaterMaskError};
use crate::grid::{BoundingBox, GridCellId, TileGrid, DEFAULT_TILE_SIZE};
use crate::index::{TileCatalogEntry, TileIndex};
use crate::loader::{GeoTiffLoader, TileLoader};
use crate::tile::DecodedTile;

/// Lifecycle of a [`WaterDetectionService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// No scan has run yet; every query answers [`WaterType::Land`].
    #[default]
    Uninitialized,
    /// A scan is in progress.
    Initializing,
    /// The catalog is built and queries can load tiles.
    Ready,
}

/// Snapshot of catalog and cache usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceStats {
    /// Number of indexed tile files.
    pub tile_count: usize,
    /// Number of decoded tiles currently cached.
    pub cached_tiles: usize,
    /// Maximum number of cached tiles.
    pub cache_capacity: usize,
    /// Lookups served from the cache.
    pub hit_count: u64,
    /// Lookups that found nothing cached.
    pub miss_count: u64,
}

impl ServiceStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Statistics from a preload operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadStats {
    /// Tiles newly decoded into the cache.
    pub tiles_loaded: u64,
    /// Tiles that were already cached.
    pub tiles_already_cached: u64,
    /// Grid cells in the box with no tile file.
    pub tiles_missing: u64,
    /// Tiles whose file could not be read or decoded.
    pub tiles_failed: u64,
    /// Grid cells in the box that have a tile file.
    pub tiles_matched: u64,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Land/water classification backed by a directory of raster tiles.
///
/// Methods take `&self`; share the service across threads or tasks behind an
/// `Arc`. Queries never fail: a missing tile, a decode error or a point
/// outside any raster all answer [`WaterType::Land`].
pub struct WaterDetectionService {
    data_dir: PathBuf,
    grid: TileGrid,
    index: RwLock<TileIndex>,
    cache: Mutex<TileCache>,
    loader: Box<dyn TileLoader>,
    state: RwLock<ServiceState>,
    /// Serializes scans so concurrent `initialize` calls run only one.
    scan_lock: Mutex<()>,
    /// Bumped whenever the cache is invalidated; loads started under an
    /// older value are not cached.
    generation: AtomicU64,
}

impl WaterDetectionService {
    /// Create a service over `data_dir` with the default grid and loader.
    ///
    /// The directory is not scanned until [`Self::initialize`] is called.
    pub fn new<P: AsRef<Path>>(data_dir: P, cache_size: usize) -> Self {
        Self::from_parts(
            data_dir.as_ref().to_path_buf(),
            TileGrid::default(),
            cache_size,
            Box::new(GeoTiffLoader::default()),
        )
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> WaterServiceBuilder {
        WaterServiceBuilder::new(data_dir)
    }

    fn from_parts(
        data_dir: PathBuf,
        grid: TileGrid,
        cache_size: usize,
        loader: Box<dyn TileLoader>,
    ) -> Self {
        Self {
            data_dir,
            grid,
            index: RwLock::new(TileIndex::new(grid)),
            cache: Mutex::new(TileCache::new(cache_size)),
            loader,
            state: RwLock::new(ServiceState::Uninitialized),
            scan_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Scan the data directory and mark the service ready.
    ///
    /// Idempotent: once ready, later calls return immediately. Concurrent
    /// callers wait for the first scan instead of starting their own.
    ///
    /// # Returns
    ///
    /// The number of indexed tiles.
    pub fn initialize(&self) -> usize {
        let _scan = self.scan_lock.lock();

        if *self.state.read() == ServiceState::Ready {
            return self.index.read().len();
        }

        self.scan()
    }

    /// Drop the catalog and every cached tile, then scan again.
    ///
    /// # Returns
    ///
    /// The number of indexed tiles.
    pub fn reload(&self) -> usize {
        let _scan = self.scan_lock.lock();

        *self.state.write() = ServiceState::Uninitialized;
        self.invalidate_cache();
        self.index.write().clear();

        let count = self.scan();
        // Loads that read the old catalog during the scan are dropped too
        self.invalidate_cache();
        count
    }

    fn invalidate_cache(&self) {
        let mut cache = self.cache.lock();
        cache.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Callers hold `scan_lock`.
    fn scan(&self) -> usize {
        *self.state.write() = ServiceState::Initializing;

        let mut index = TileIndex::new(self.grid);
        let count = index.scan(&self.data_dir);
        *self.index.write() = index;

        *self.state.write() = ServiceState::Ready;
        count
    }

    /// Classify `(lon, lat)`, loading the covering tile on a cache miss.
    ///
    /// Suspends only while reading the tile file. Decoding runs on the
    /// current task's thread and the decoded tile is cached.
    pub async fn get_water_type(&self, lon: f64, lat: f64) -> WaterType {
        let Some(cell) = self.query_cell(lon, lat) else {
            return WaterType::Land;
        };

        let cached = self.cache.lock().get_cached(cell);
        if let Some(tile) = cached {
            return sample(&tile, lon, lat);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let Some(entry) = self.catalog_entry(cell) else {
            return WaterType::Land;
        };

        match self.load_tile(cell, &entry, generation).await {
            Some(tile) => sample(&tile, lon, lat),
            None => WaterType::Land,
        }
    }

    /// Classify `(lon, lat)` from cached tiles only.
    ///
    /// Never reads a file. A miss answers [`WaterType::Land`] and leaves the
    /// cache as it was.
    pub fn get_water_type_sync(&self, lon: f64, lat: f64) -> WaterType {
        let Some(cell) = self.query_cell(lon, lat) else {
            return WaterType::Land;
        };

        let cached = self.cache.lock().get_cached(cell);
        match cached {
            Some(tile) => sample(&tile, lon, lat),
            None => WaterType::Land,
        }
    }

    /// Classify `(lon, lat)`, reading and decoding the covering tile on the
    /// calling thread when it is not cached.
    ///
    /// Meant for code without an async runtime. No lock is held while the
    /// file is read and decoded, so concurrent sync queries never wait on it.
    pub fn get_water_type_blocking(&self, lon: f64, lat: f64) -> WaterType {
        let Some(cell) = self.query_cell(lon, lat) else {
            return WaterType::Land;
        };

        let cached = self.cache.lock().get_cached(cell);
        if let Some(tile) = cached {
            return sample(&tile, lon, lat);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let Some(entry) = self.catalog_entry(cell) else {
            return WaterType::Land;
        };

        let decoded = self.loader.load(&entry);
        match self.finish_load(cell, &entry, generation, decoded) {
            Some(tile) => sample(&tile, lon, lat),
            None => WaterType::Land,
        }
    }

    /// `true` iff [`Self::get_water_type`] is not land.
    pub async fn is_water(&self, lon: f64, lat: f64) -> bool {
        self.get_water_type(lon, lat).await.is_water()
    }

    /// `true` iff [`Self::get_water_type_sync`] is not land.
    pub fn is_water_sync(&self, lon: f64, lat: f64) -> bool {
        self.get_water_type_sync(lon, lat).is_water()
    }

    /// `true` iff [`Self::get_water_type_blocking`] is not land.
    pub fn is_water_blocking(&self, lon: f64, lat: f64) -> bool {
        self.get_water_type_blocking(lon, lat).is_water()
    }

    /// Load every tile intersecting the box into the cache.
    ///
    /// Cells are visited from the floor-aligned southwest corner in
    /// tile-size steps; tiles already cached are left alone. An inverted or
    /// non-finite box visits nothing. When the box holds more tiles than the
    /// cache, the earliest loads are evicted again.
    pub async fn preload_tiles(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> PreloadStats {
        let start = Instant::now();
        let mut stats = PreloadStats::default();

        let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat);
        for cell in self.grid.cells_in(&bbox) {
            let generation = self.generation.load(Ordering::SeqCst);
            let Some(entry) = self.catalog_entry(cell) else {
                stats.tiles_missing += 1;
                continue;
            };
            stats.tiles_matched += 1;

            if self.cache.lock().contains(cell) {
                stats.tiles_already_cached += 1;
                continue;
            }

            match self.load_tile(cell, &entry, generation).await {
                Some(_) => stats.tiles_loaded += 1,
                None => stats.tiles_failed += 1,
            }
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            loaded = stats.tiles_loaded,
            already_cached = stats.tiles_already_cached,
            missing = stats.tiles_missing,
            failed = stats.tiles_failed,
            elapsed_ms = stats.elapsed_ms,
            "Preload finished"
        );

        stats
    }

    /// Whether [`Self::initialize`] has completed.
    pub fn is_initialized(&self) -> bool {
        self.state() == ServiceState::Ready
    }

    /// Whether the catalog holds at least one tile.
    pub fn has_data(&self) -> bool {
        !self.index.read().is_empty()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    /// Catalog and cache statistics.
    pub fn stats(&self) -> ServiceStats {
        let tile_count = self.index.read().len();
        let cache = self.cache.lock();
        ServiceStats {
            tile_count,
            cached_tiles: cache.len(),
            cache_capacity: cache.capacity(),
            hit_count: cache.hit_count(),
            miss_count: cache.miss_count(),
        }
    }

    /// Catalog entries sorted by tile name.
    pub fn catalog(&self) -> Vec<TileCatalogEntry> {
        let mut entries: Vec<_> = self
            .index
            .read()
            .entries()
            .map(|(_, entry)| entry.clone())
            .collect();
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        entries
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The grid tiles are keyed on.
    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    fn query_cell(&self, lon: f64, lat: f64) -> Option<GridCellId> {
        if self.state() != ServiceState::Ready {
            tracing::debug!(lon = lon, lat = lat, "Query before initialize, answering land");
        }
        self.grid.cell_for(lon, lat)
    }

    fn catalog_entry(&self, cell: GridCellId) -> Option<TileCatalogEntry> {
        self.index.read().lookup(cell).cloned()
    }

    /// Read `entry`'s file asynchronously, decode it here and cache it.
    ///
    /// Two tasks missing on the same cell both decode; the later insert
    /// replaces the earlier tile.
    async fn load_tile(
        &self,
        cell: GridCellId,
        entry: &TileCatalogEntry,
        generation: u64,
    ) -> Option<Arc<DecodedTile>> {
        let bytes = match tokio::fs::read(&entry.file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    path = %entry.file_path.display(),
                    error = %e,
                    "Failed to read tile"
                );
                return None;
            }
        };

        let decoded = self.loader.decode(&bytes, entry);
        self.finish_load(cell, entry, generation, decoded)
    }

    /// Cache a freshly decoded tile unless the cache was invalidated since
    /// `generation` was read. The tile is returned either way.
    fn finish_load(
        &self,
        cell: GridCellId,
        entry: &TileCatalogEntry,
        generation: u64,
        decoded: Result<DecodedTile>,
    ) -> Option<Arc<DecodedTile>> {
        match decoded {
            Ok(tile) => {
                let tile = Arc::new(tile);
                let mut cache = self.cache.lock();
                if self.generation.load(Ordering::SeqCst) == generation {
                    cache.insert(cell, tile.clone());
                } else {
                    tracing::debug!(
                        path = %entry.file_path.display(),
                        "Catalog reloaded during load, not caching tile"
                    );
                }
                Some(tile)
            }
            Err(e) => {
                tracing::warn!(
                    path = %entry.file_path.display(),
                    error = %e,
                    "Failed to decode tile"
                );
                None
            }
        }
    }
}

/// Builder for [`WaterDetectionService`].
pub struct WaterServiceBuilder {
    data_dir: PathBuf,
    cache_size: usize,
    tile_size: f64,
    loader: Option<Box<dyn TileLoader>>,
}

impl WaterServiceBuilder {
    /// Create a new builder with the specified data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_size: DEFAULT_CACHE_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            loader: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `WATERMASK_DATA_DIR` | Directory containing tile files | Required |
    /// | `WATERMASK_CACHE_SIZE` | Maximum tiles in cache | 10 |
    /// | `WATERMASK_TILE_SIZE` | Tile edge length in degrees | 5 |
    ///
    /// Unparsable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WaterMaskError::MissingDataDir`] if `WATERMASK_DATA_DIR` is
    /// not set.
    pub fn from_env() -> Result<Self> {
        let data_dir =
            std::env::var("WATERMASK_DATA_DIR").map_err(|_| WaterMaskError::MissingDataDir)?;

        let cache_size: usize = std::env::var("WATERMASK_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE);

        let tile_size: f64 = std::env::var("WATERMASK_TILE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TILE_SIZE);

        Ok(Self::new(data_dir).cache_size(cache_size).tile_size(tile_size))
    }

    /// Set the data directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of tiles to keep in cache.
    ///
    /// Default is 10 tiles; zero is treated as one.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the tile edge length in degrees. Default is 5.
    pub fn tile_size(mut self, degrees: f64) -> Self {
        self.tile_size = degrees;
        self
    }

    /// Replace the default [`GeoTiffLoader`].
    pub fn loader<L: TileLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Build the [`WaterDetectionService`].
    ///
    /// # Errors
    ///
    /// Returns [`WaterMaskError::InvalidTileSize`] if the tile size is not a
    /// finite, positive number.
    pub fn build(self) -> Result<WaterDetectionService> {
        let grid = TileGrid::new(self.tile_size)?;
        let loader = self
            .loader
            .unwrap_or_else(|| Box::new(GeoTiffLoader::default()));

        Ok(WaterDetectionService::from_parts(
            self.data_dir,
            grid,
            self.cache_size,
            loader,
        ))
    }
}
