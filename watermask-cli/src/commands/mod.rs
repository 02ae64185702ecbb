use anyhow::{Context, Result};
use std::path::PathBuf;
use watermask::{WaterDetectionService, WaterServiceBuilder};

pub mod batch;
pub mod info;
pub mod list;
pub mod query;

/// Service settings shared by every subcommand.
pub struct ServiceConfig {
    pub data_dir: Option<PathBuf>,
    pub cache_size: usize,
    pub tile_size: f64,
}

impl ServiceConfig {
    /// The configured data directory. `--data-dir` falls back to
    /// `WATERMASK_DATA_DIR` through clap.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.data_dir.clone().context(
            "WATERMASK_DATA_DIR environment variable not set. Use --data-dir or set WATERMASK_DATA_DIR",
        )
    }

    /// Build the service and scan the data directory.
    pub fn initialized_service(&self) -> Result<WaterDetectionService> {
        let service = WaterServiceBuilder::new(self.data_dir()?)
            .cache_size(self.cache_size)
            .tile_size(self.tile_size)
            .build()
            .context("Failed to create water detection service")?;

        service.initialize();
        Ok(service)
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
