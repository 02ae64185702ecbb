use anyhow::{bail, Context, Result};
use geojson::{Feature, GeoJson, Value};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use watermask::WaterDetectionService;

use super::ServiceConfig;

const WATER_TYPE_FIELD: &str = "water_type";

pub fn run(
    config: &ServiceConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
) -> Result<()> {
    let service = config.initialized_service()?;

    // Detect file format
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let output_path = match extension.as_str() {
        "csv" => {
            let output_path = output.unwrap_or_else(|| default_output(&input, "csv"));
            process_csv(&service, &input, &output_path, lat_col, lon_col)?;
            output_path
        }
        "geojson" | "json" => {
            let output_path = output.unwrap_or_else(|| default_output(&input, "geojson"));
            process_geojson(&service, &input, &output_path)?;
            output_path
        }
        _ => bail!(
            "Unsupported file format: {}. Use .csv or .geojson",
            extension
        ),
    };

    let stats = service.stats();
    tracing::info!(
        cache_misses = stats.miss_count,
        hit_rate = stats.hit_rate(),
        "Batch finished"
    );

    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn default_output(input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_water.{}", stem, extension))
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn process_csv(
    service: &WaterDetectionService,
    input: &Path,
    output_path: &Path,
    lat_col: &str,
    lon_col: &str,
) -> Result<()> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let pb = progress_bar(records.len() as u64)?;

    let output_file = File::create(output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.push(WATER_TYPE_FIELD);
    writer.write_record(&new_headers)?;

    for (line, record) in records.iter().enumerate() {
        let lat: f64 = parse_coordinate(record.get(lat_idx), "latitude", line)?;
        let lon: f64 = parse_coordinate(record.get(lon_idx), "longitude", line)?;

        let water_type = service.get_water_type_blocking(lon, lat);

        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.push(water_type.as_str());
        writer.write_record(&new_record)?;

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;
    Ok(())
}

fn parse_coordinate(field: Option<&str>, what: &str, line: usize) -> Result<f64> {
    field
        .with_context(|| format!("Missing {} on record {}", what, line + 1))?
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} on record {}", what, line + 1))
}

fn process_geojson(service: &WaterDetectionService, input: &Path, output_path: &Path) -> Result<()> {
    let file = File::open(input).context("Failed to open input file")?;
    let reader = BufReader::new(file);

    let geojson: GeoJson = serde_json::from_reader(reader).context("Failed to parse GeoJSON")?;

    let result = match geojson {
        GeoJson::Feature(mut feature) => {
            tag_feature(service, &mut feature);
            GeoJson::Feature(feature)
        }
        GeoJson::FeatureCollection(mut fc) => {
            let pb = progress_bar(fc.features.len() as u64)?;
            for feature in &mut fc.features {
                tag_feature(service, feature);
                pb.inc(1);
            }
            pb.finish_with_message("done");
            GeoJson::FeatureCollection(fc)
        }
        GeoJson::Geometry(_) => bail!("GeoJSON input must be a Feature or FeatureCollection"),
    };

    let output_file = File::create(output_path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(output_file);
    serde_json::to_writer_pretty(&mut writer, &result)?;
    writer.flush()?;
    Ok(())
}

/// Set the `water_type` property on Point features; others are left alone.
fn tag_feature(service: &WaterDetectionService, feature: &mut Feature) {
    let Some(Value::Point(position)) = feature.geometry.as_ref().map(|g| &g.value) else {
        return;
    };
    if position.len() < 2 {
        return;
    }

    let water_type = service.get_water_type_blocking(position[0], position[1]);
    feature.set_property(WATER_TYPE_FIELD, water_type.as_str());
}
