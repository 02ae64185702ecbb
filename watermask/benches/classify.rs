use std::io::Cursor;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use tiff::encoder::{colortype::Gray8, TiffEncoder};
use tiff::tags::Tag;
use watermask::{sample, BoundingBox, DecodedTile, WaterDetectionService};

const TILE_PIXELS: usize = 1200;

/// Write a georeferenced 5° tile with stripes of every category.
fn create_tile(dir: &Path, min_lon: f64, min_lat: f64) {
    let mut raster = vec![0u8; TILE_PIXELS * TILE_PIXELS];
    for row in 0..TILE_PIXELS {
        for col in 0..TILE_PIXELS {
            raster[row * TILE_PIXELS + col] = ((row / 100 + col / 100) % 6) as u8;
        }
    }

    let bbox = BoundingBox::new(min_lon, min_lat, min_lon + 5.0, min_lat + 5.0);
    let pixel = 5.0 / TILE_PIXELS as f64;
    let scale = [pixel, pixel, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, bbox.min_lon, bbox.max_lat, 0.0];

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        let mut image = encoder
            .new_image::<Gray8>(TILE_PIXELS as u32, TILE_PIXELS as u32)
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
            .unwrap();
        image.write_data(&raster).unwrap();
    }

    let name = format!("{}.tif", watermask::filename::tile_name(min_lon, min_lat));
    std::fs::write(dir.join(name), buf.into_inner()).unwrap();
}

fn bench_single_cached(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), -10.0, 45.0);
    let service = WaterDetectionService::new(tmp.path(), 10);
    service.initialize();

    // Warm the cache
    let _ = service.get_water_type_blocking(-7.5, 47.5);

    c.bench_function("single_sync_cached", |b| {
        b.iter(|| {
            black_box(service.get_water_type_sync(black_box(-7.3606), black_box(47.7274)));
        });
    });
}

fn bench_sample_tile(c: &mut Criterion) {
    let raster = (0..TILE_PIXELS * TILE_PIXELS).map(|i| (i % 6) as u8).collect();
    let bbox = BoundingBox::new(-10.0, 45.0, -5.0, 50.0);
    let tile = DecodedTile::new(raster, TILE_PIXELS, TILE_PIXELS, bbox).unwrap();

    c.bench_function("sample_decoded_tile", |b| {
        b.iter(|| black_box(sample(&tile, black_box(-7.3606), black_box(47.7274))));
    });
}

fn bench_single_cold(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), -10.0, 45.0);
    let service = WaterDetectionService::new(tmp.path(), 10);
    service.initialize();

    // Reloading drops the cache, so every iteration decodes the tile
    c.bench_function("single_blocking_cold", |b| {
        b.iter(|| {
            service.reload();
            black_box(service.get_water_type_blocking(black_box(-7.3606), black_box(47.7274)));
        });
    });
}

fn bench_batch_multi_tile(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), -10.0, 45.0);
    create_tile(tmp.path(), -5.0, 45.0);
    create_tile(tmp.path(), -10.0, 40.0);
    let service = WaterDetectionService::new(tmp.path(), 10);
    service.initialize();

    // Generate 1000 coords spread across 3 tiles
    let coords: Vec<(f64, f64)> = (0..1000)
        .map(|i| {
            let frac = (i as f64 / 3000.0) * 4.99;
            match i % 3 {
                0 => (-10.0 + frac, 47.5),
                1 => (-5.0 + frac, 47.5),
                _ => (-10.0 + frac, 42.5),
            }
        })
        .collect();

    // Warm the cache
    for &(lon, lat) in &coords[..3] {
        let _ = service.get_water_type_blocking(lon, lat);
    }

    c.bench_function("batch_1000_multi_tile", |b| {
        b.iter(|| {
            for &(lon, lat) in black_box(&coords) {
                black_box(service.get_water_type_sync(lon, lat));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_single_cached,
    bench_sample_tile,
    bench_single_cold,
    bench_batch_multi_tile,
);
criterion_main!(benches);
