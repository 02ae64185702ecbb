use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use watermask::filename::parse_tile_corner;
use watermask::{
    classify, BoundingBox, DecodedTile, GeoTiffLoader, TileCatalogEntry, TileLoader, WaterType,
};

use super::{format_size, ServiceConfig};

pub fn run(config: &ServiceConfig, tile: &str) -> Result<()> {
    let tile_path = resolve_tile(config, tile)?;

    let name = tile_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tile.to_string());
    let Some((min_lon, min_lat)) = parse_tile_corner(&name) else {
        bail!("No tile coordinates in file name: {}", name);
    };

    let entry = TileCatalogEntry {
        file_path: tile_path.clone(),
        bounds: BoundingBox::new(
            min_lon,
            min_lat,
            min_lon + config.tile_size,
            min_lat + config.tile_size,
        ),
    };

    let decoded = GeoTiffLoader::new()
        .load(&entry)
        .with_context(|| format!("Failed to decode tile: {}", tile_path.display()))?;

    let file_size = std::fs::metadata(&tile_path)?.len();
    let bbox = decoded.bbox();

    // Display information
    println!("Tile: {}", entry.name());
    println!("Path: {}", tile_path.display());
    println!();
    println!("Dimensions: {}x{} pixels", decoded.width(), decoded.height());
    println!(
        "Bounds: lon {} to {}, lat {} to {}",
        bbox.min_lon, bbox.max_lon, bbox.min_lat, bbox.max_lat
    );
    if bbox != entry.bounds {
        println!(
            "Name bounds: lon {} to {}, lat {} to {}",
            entry.bounds.min_lon, entry.bounds.max_lon, entry.bounds.min_lat, entry.bounds.max_lat
        );
    }
    println!(
        "Pixel size: {:.6}° x {:.6}°",
        bbox.width() / decoded.width() as f64,
        bbox.height() / decoded.height() as f64
    );
    println!("File size: {}", format_size(file_size));
    println!();

    let histogram = Histogram::of(&decoded);
    let total = decoded.raster().len() as f64;
    for (water_type, count) in WaterType::ALL.iter().zip(histogram.counts) {
        println!(
            "{:<8} {:>12} ({:.1}%)",
            water_type.as_str(),
            count,
            count as f64 / total * 100.0
        );
    }
    if histogram.unknown > 0 {
        println!(
            "Unknown values (read as land): {} ({:.1}%)",
            histogram.unknown,
            histogram.unknown as f64 / total * 100.0
        );
    }

    Ok(())
}

/// A path to an existing file, or a tile name looked up in the data
/// directory.
fn resolve_tile(config: &ServiceConfig, tile: &str) -> Result<PathBuf> {
    let path = Path::new(tile);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let service = config.initialized_service()?;
    service
        .catalog()
        .into_iter()
        .find(|entry| entry.name().eq_ignore_ascii_case(tile))
        .map(|entry| entry.file_path)
        .with_context(|| {
            format!(
                "Tile not found: {} (not a file, and not indexed under {})",
                tile,
                service.data_dir().display()
            )
        })
}

/// Pixel counts per category, in [`WaterType::ALL`] order.
struct Histogram {
    counts: [u64; 6],
    /// Pixels whose raw value is outside the known categories.
    unknown: u64,
}

impl Histogram {
    fn of(tile: &DecodedTile) -> Self {
        let mut histogram = Histogram {
            counts: [0; 6],
            unknown: 0,
        };
        for &raw in tile.raster() {
            let water_type = classify(raw);
            if water_type == WaterType::Land && raw != 0 {
                histogram.unknown += 1;
            }
            histogram.counts[water_type.raw_value() as usize] += 1;
        }
        histogram
    }
}
