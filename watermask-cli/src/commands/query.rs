use anyhow::Result;
use serde::Serialize;

use super::ServiceConfig;

#[derive(Serialize)]
struct WaterTypeResponse {
    lon: f64,
    lat: f64,
    water_type: String,
    is_water: bool,
}

pub fn run(config: &ServiceConfig, lon: f64, lat: f64, json: bool) -> Result<()> {
    let service = config.initialized_service()?;

    if !service.has_data() {
        tracing::warn!(data_dir = %service.data_dir().display(), "No tiles indexed, every point is land");
    }

    let water_type = service.get_water_type_blocking(lon, lat);

    if json {
        let response = WaterTypeResponse {
            lon,
            lat,
            water_type: water_type.to_string(),
            is_water: water_type.is_water(),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{}", water_type);
    }

    Ok(())
}
