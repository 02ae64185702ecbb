//! Bounded LRU cache of decoded tiles.
//!
//! [`TileCache`] holds at most `capacity` tiles keyed by [`GridCellId`].
//! Every hit refreshes the tile's `last_accessed` timestamp and moves it to
//! the front of the recency list; when a new tile arrives at a full cache,
//! the tile with the oldest access is evicted first.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;

use crate::grid::GridCellId;
use crate::index::TileIndex;
use crate::loader::TileLoader;
use crate::tile::DecodedTile;

/// Default number of tiles kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 10;

#[derive(Debug)]
struct CachedTile {
    tile: Arc<DecodedTile>,
    last_accessed: Instant,
}

/// LRU cache of decoded tiles.
pub struct TileCache {
    entries: LruCache<GridCellId, CachedTile>,
    hit_count: u64,
    miss_count: u64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl TileCache {
    /// Create a cache holding at most `capacity` tiles.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hit_count: 0,
            miss_count: 0,
        }
    }

    /// Return the cached tile for `cell`, loading it on a miss.
    ///
    /// - Hit: refresh the tile's access time and return it.
    /// - No catalog entry for `cell`: return `None`, cache nothing.
    /// - Decode failure: log it, return `None`, cache nothing. The next call
    ///   for the same cell tries again.
    /// - Decode success: evict the least recently used tile if full, insert,
    ///   return the new tile.
    ///
    /// The loader runs on the calling thread.
    pub fn get_or_load(
        &mut self,
        cell: GridCellId,
        index: &TileIndex,
        loader: &dyn TileLoader,
    ) -> Option<Arc<DecodedTile>> {
        if let Some(tile) = self.get_cached(cell) {
            return Some(tile);
        }

        let entry = index.lookup(cell)?;

        match loader.load(entry) {
            Ok(tile) => {
                let tile = Arc::new(tile);
                self.insert(cell, tile.clone());
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

    /// Return the cached tile for `cell` without loading anything.
    ///
    /// A hit refreshes the tile's access time.
    pub fn get_cached(&mut self, cell: GridCellId) -> Option<Arc<DecodedTile>> {
        match self.entries.get_mut(&cell) {
            Some(cached) => {
                cached.last_accessed = Instant::now();
                self.hit_count += 1;
                Some(cached.tile.clone())
            }
            None => {
                self.miss_count += 1;
                None
            }
        }
    }

    /// Insert a decoded tile, evicting the least recently used tile when the
    /// cache is full.
    ///
    /// Inserting a cell that is already cached replaces its tile without
    /// evicting anything.
    ///
    /// # Returns
    ///
    /// The evicted cell, if any.
    pub fn insert(&mut self, cell: GridCellId, tile: Arc<DecodedTile>) -> Option<GridCellId> {
        let mut evicted = None;

        if !self.entries.contains(&cell) && self.entries.len() >= self.capacity() {
            if let Some((old_cell, old)) = self.entries.pop_lru() {
                tracing::debug!(
                    row = old_cell.row(),
                    col = old_cell.col(),
                    idle_ms = old.last_accessed.elapsed().as_millis() as u64,
                    "Evicted tile"
                );
                evicted = Some(old_cell);
            }
        }

        self.entries.put(
            cell,
            CachedTile {
                tile,
                last_accessed: Instant::now(),
            },
        );

        evicted
    }

    /// Whether `cell` is cached. Does not count as an access.
    pub fn contains(&self, cell: GridCellId) -> bool {
        self.entries.contains(&cell)
    }

    /// When `cell` was last inserted or hit. Does not count as an access.
    pub fn last_accessed(&self, cell: GridCellId) -> Option<Instant> {
        self.entries.peek(&cell).map(|cached| cached.last_accessed)
    }

    /// Cached cells, most recently used first.
    pub fn cells(&self) -> Vec<GridCellId> {
        self.entries.iter().map(|(cell, _)| *cell).collect()
    }

    /// Drop every cached tile. Hit and miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached tiles.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Lookups served from the cache.
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Lookups that found nothing cached.
    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, WaterMaskError};
    use crate::grid::TileGrid;
    use crate::index::TileCatalogEntry;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Loader that fabricates uniform tiles without reading the file.
    #[derive(Default)]
    struct FakeLoader {
        loads: AtomicUsize,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeLoader {
        fn fail(&self, name: &str) {
            self.failing.lock().unwrap().insert(name.to_string());
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl TileLoader for FakeLoader {
        fn decode(&self, _bytes: &[u8], entry: &TileCatalogEntry) -> Result<DecodedTile> {
            self.load(entry)
        }

        fn load(&self, entry: &TileCatalogEntry) -> Result<DecodedTile> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().unwrap().contains(&entry.name()) {
                return Err(WaterMaskError::InvalidRaster {
                    reason: "corrupt".to_string(),
                });
            }
            DecodedTile::new(vec![1; 4], 2, 2, entry.bounds)
        }
    }

    /// Index over one placeholder file per longitude column at latitude 0.
    fn index_with_tiles(dir: &Path, count: i32) -> TileIndex {
        for i in 0..count {
            let name = crate::filename::tile_name(i as f64 * 5.0, 0.0);
            std::fs::write(dir.join(format!("{}.tif", name)), b"").unwrap();
        }
        let mut index = TileIndex::new(TileGrid::default());
        index.scan(dir);
        index
    }

    fn cell(i: i32) -> GridCellId {
        GridCellId::new(0, i)
    }

    #[test]
    fn test_miss_then_hit() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 1);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(10);

        assert!(cache.get_or_load(cell(0), &index, &loader).is_some());
        assert!(cache.get_or_load(cell(0), &index, &loader).is_some());

        assert_eq!(loader.loads(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 1);
    }

    #[test]
    fn test_absent_tile_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 1);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(10);

        assert!(cache.get_or_load(cell(7), &index, &loader).is_none());
        assert_eq!(loader.loads(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_decode_is_not_cached_and_retried() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 1);
        let loader = FakeLoader::default();
        loader.fail("N00E000");
        let mut cache = TileCache::new(10);

        assert!(cache.get_or_load(cell(0), &index, &loader).is_none());
        assert!(cache.get_or_load(cell(0), &index, &loader).is_none());

        assert!(cache.is_empty());
        assert_eq!(loader.loads(), 2);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 8);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(3);

        for i in 0..8 {
            cache.get_or_load(cell(i), &index, &loader);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);

        // The three most recent loads remain
        assert_eq!(cache.cells(), vec![cell(7), cell(6), cell(5)]);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 4);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(3);

        cache.get_or_load(cell(0), &index, &loader);
        cache.get_or_load(cell(1), &index, &loader);
        cache.get_or_load(cell(2), &index, &loader);

        // Refresh 0 and 1; 2 is now the oldest access
        let before = cache.last_accessed(cell(0)).unwrap();
        assert!(cache.get_cached(cell(0)).is_some());
        assert!(cache.get_cached(cell(1)).is_some());
        assert!(cache.last_accessed(cell(0)).unwrap() >= before);

        cache.get_or_load(cell(3), &index, &loader);

        assert!(cache.contains(cell(0)));
        assert!(cache.contains(cell(1)));
        assert!(!cache.contains(cell(2)));
        assert!(cache.contains(cell(3)));
    }

    #[test]
    fn test_insert_reports_eviction() {
        let bounds = crate::grid::BoundingBox::new(0.0, 0.0, 5.0, 5.0);
        let tile = Arc::new(DecodedTile::new(vec![0], 1, 1, bounds).unwrap());
        let mut cache = TileCache::new(2);

        assert_eq!(cache.insert(cell(0), tile.clone()), None);
        assert_eq!(cache.insert(cell(1), tile.clone()), None);
        // Overwriting an existing key evicts nothing
        assert_eq!(cache.insert(cell(1), tile.clone()), None);
        assert_eq!(cache.insert(cell(2), tile.clone()), Some(cell(0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_cached_never_loads() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 1);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(10);

        assert!(cache.get_cached(cell(0)).is_none());
        assert!(cache.is_empty());
        assert_eq!(loader.loads(), 0);

        cache.get_or_load(cell(0), &index, &loader);
        assert!(cache.get_cached(cell(0)).is_some());
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_with_tiles(temp_dir.path(), 2);
        let loader = FakeLoader::default();
        let mut cache = TileCache::new(10);

        cache.get_or_load(cell(0), &index, &loader);
        cache.get_or_load(cell(1), &index, &loader);
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.get_cached(cell(0)).is_none());
    }

    #[test]
    fn test_zero_capacity_holds_one_tile() {
        let cache = TileCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(TileCache::default().capacity(), DEFAULT_CACHE_SIZE);
    }
}
