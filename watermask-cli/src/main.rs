use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Land/water classification CLI tool
#[derive(Parser)]
#[command(name = "watermask")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing water mask tiles
    #[arg(short, long, env = "WATERMASK_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum tiles in cache
    #[arg(
        short,
        long,
        env = "WATERMASK_CACHE_SIZE",
        default_value = "10",
        global = true
    )]
    cache_size: usize,

    /// Tile edge length in degrees
    #[arg(long, env = "WATERMASK_TILE_SIZE", default_value = "5", global = true)]
    tile_size: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single coordinate
    Query {
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Classify multiple coordinates from a file
    Batch {
        /// Input file (CSV or GeoJSON)
        input: PathBuf,

        /// Output file (same format as input if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude (CSV only)
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude (CSV only)
        #[arg(long, default_value = "lon")]
        lon_col: String,
    },

    /// Display information about a tile
    Info {
        /// Path to a tile file, or tile name (e.g., N45W010)
        tile: String,
    },

    /// List tiles in the data directory
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watermask=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = commands::ServiceConfig {
        data_dir: cli.data_dir,
        cache_size: cli.cache_size,
        tile_size: cli.tile_size,
    };

    match cli.command {
        Commands::Query { lon, lat, json } => commands::query::run(&config, lon, lat, json),
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
        } => commands::batch::run(&config, input, output, &lat_col, &lon_col),
        Commands::Info { tile } => commands::info::run(&config, &tile),
        Commands::List => commands::list::run(&config),
    }
}
