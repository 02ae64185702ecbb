//! On-disk tile catalog.
//!
//! [`TileIndex`] walks a directory tree once and records which file covers
//! which grid cell, without opening or decoding any raster.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::filename::{has_tile_extension, parse_tile_corner, tile_name};
use crate::grid::{BoundingBox, GridCellId, TileGrid};

/// One discovered tile file and the area its name claims to cover.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCatalogEntry {
    /// Path to the raster file.
    pub file_path: PathBuf,
    /// Bounds parsed from the filename.
    pub bounds: BoundingBox,
}

impl TileCatalogEntry {
    /// Short tile name derived from the southwest corner, e.g. `N45W010`.
    pub fn name(&self) -> String {
        tile_name(self.bounds.min_lon, self.bounds.min_lat)
    }
}

/// Catalog of tile files keyed by grid cell.
#[derive(Debug, Default)]
pub struct TileIndex {
    grid: TileGrid,
    entries: HashMap<GridCellId, TileCatalogEntry>,
}

impl TileIndex {
    /// Create an empty index on the given grid.
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            entries: HashMap::new(),
        }
    }

    /// The grid this index keys its entries on.
    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    /// Replace the catalog with the tiles found under `root_dir`.
    ///
    /// The walk is recursive and sorted by file name, so duplicate tiles for
    /// one cell resolve the same way on every scan (the last one wins). A
    /// missing root or unreadable entries are logged and skipped; scanning
    /// never fails.
    ///
    /// # Returns
    ///
    /// The number of indexed tiles.
    pub fn scan<P: AsRef<Path>>(&mut self, root_dir: P) -> usize {
        let root = root_dir.as_ref();
        self.entries.clear();

        if !root.is_dir() {
            tracing::warn!(root = %root.display(), "Tile directory does not exist, index is empty");
            return 0;
        }

        let mut skipped = 0usize;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !has_tile_extension(&name) {
                continue;
            }

            match self.catalog_entry(entry.path(), &name) {
                Some((cell, catalog_entry)) => {
                    if let Some(previous) = self.entries.insert(cell, catalog_entry) {
                        tracing::warn!(
                            replaced = %previous.file_path.display(),
                            by = %entry.path().display(),
                            "Duplicate tile for grid cell"
                        );
                    }
                }
                None => skipped += 1,
            }
        }

        tracing::info!(
            root = %root.display(),
            tiles = self.entries.len(),
            skipped = skipped,
            "Tile index built"
        );

        self.entries.len()
    }

    /// Build the catalog entry for one file, or `None` if its name does not
    /// describe a reachable tile.
    fn catalog_entry(&self, path: &Path, name: &str) -> Option<(GridCellId, TileCatalogEntry)> {
        let Some((min_lon, min_lat)) = parse_tile_corner(name) else {
            tracing::debug!(path = %path.display(), "No tile coordinates in filename, skipping");
            return None;
        };

        let Some(cell) = self.grid.cell_for_corner(min_lon, min_lat) else {
            tracing::warn!(
                path = %path.display(),
                min_lon = min_lon,
                min_lat = min_lat,
                tile_size = self.grid.tile_size(),
                "Tile corner is not aligned to the grid, skipping"
            );
            return None;
        };

        let size = self.grid.tile_size();
        let bounds = BoundingBox::new(min_lon, min_lat, min_lon + size, min_lat + size);

        Some((
            cell,
            TileCatalogEntry {
                file_path: path.to_path_buf(),
                bounds,
            },
        ))
    }

    /// Catalog entry covering `cell`, if any.
    pub fn lookup(&self, cell: GridCellId) -> Option<&TileCatalogEntry> {
        self.entries.get(&cell)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of indexed tiles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (&GridCellId, &TileCatalogEntry)> {
        self.entries.iter()
    }
}
