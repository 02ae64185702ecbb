use anyhow::{bail, Result};
use std::fs;

use super::{format_size, ServiceConfig};

pub fn run(config: &ServiceConfig) -> Result<()> {
    let service = config.initialized_service()?;
    let dir = service.data_dir();

    if !dir.exists() {
        bail!("Data directory does not exist: {}", dir.display());
    }

    let mut entries = service.catalog();
    if entries.is_empty() {
        println!("No tiles found in: {}", dir.display());
        return Ok(());
    }
    entries.sort_by_key(|entry| entry.name());

    println!("{:<10} {:>24} {:>12}  PATH", "TILE", "COVERAGE", "SIZE");
    println!("{}", "-".repeat(60));

    let mut total_size: u64 = 0;
    for entry in &entries {
        let size = fs::metadata(&entry.file_path).map(|m| m.len()).unwrap_or(0);
        total_size += size;

        let b = entry.bounds;
        let coverage = format!(
            "{}..{}, {}..{}",
            b.min_lon, b.max_lon, b.min_lat, b.max_lat
        );
        let relative = entry
            .file_path
            .strip_prefix(dir)
            .unwrap_or(&entry.file_path);

        println!(
            "{:<10} {:>24} {:>12}  {}",
            entry.name(),
            coverage,
            format_size(size),
            relative.display()
        );
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Total tiles: {}", entries.len());
    println!("  Tile size: {}°", service.grid().tile_size());
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
}
