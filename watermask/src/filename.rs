//! Tile filename utilities.
//!
//! Water mask tiles carry their southwest corner in the filename as a
//! cardinal-direction coordinate pair, anywhere in the name:
//!
//! ```text
//! OSM_WaterLayer_N45W010.tif
//!                ^^^ ^^^^
//!                lat lon
//! ```
//!
//! - Latitude: `N` or `S` followed by degrees
//! - Longitude: `E` or `W` followed by degrees
//!
//! Matching is case-insensitive. Only `.tif`/`.tiff` files are considered
//! tiles.

use std::sync::OnceLock;

use regex::Regex;

/// File extensions recognised as raster tiles (compared case-insensitively).
pub const TILE_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

fn corner_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // ([NS])(\d+) - latitude hemisphere and magnitude
        // ([EW])(\d+) - longitude hemisphere and magnitude
        Regex::new(r"(?i)([NS])(\d+)([EW])(\d+)").unwrap()
    })
}

/// Strip any directory components, accepting both `/` and `\` separators.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Parse a tile filename to extract its southwest corner.
///
/// # Arguments
///
/// * `filename` - The filename (with or without path, with or without extension)
///
/// # Returns
///
/// The `(min_lon, min_lat)` of the southwest corner, or `None` if the name
/// carries no coordinate pair.
///
/// # Examples
///
/// ```
/// use watermask::filename::parse_tile_corner;
///
/// assert_eq!(parse_tile_corner("OSM_WaterLayer_N45W010.tif"), Some((-10.0, 45.0)));
/// assert_eq!(parse_tile_corner("mask_S30E150.tif"), Some((150.0, -30.0)));
/// assert_eq!(parse_tile_corner("/data/tiles/n00e000.tif"), Some((0.0, 0.0)));
/// assert_eq!(parse_tile_corner("readme.txt"), None);
/// ```
pub fn parse_tile_corner(filename: &str) -> Option<(f64, f64)> {
    let name = base_name(filename);
    let captures = corner_pattern().captures(name)?;

    let lat_sign = match captures.get(1)?.as_str() {
        "N" | "n" => 1.0,
        _ => -1.0,
    };
    let lat: u32 = captures.get(2)?.as_str().parse().ok()?;

    let lon_sign = match captures.get(3)?.as_str() {
        "E" | "e" => 1.0,
        _ => -1.0,
    };
    let lon: u32 = captures.get(4)?.as_str().parse().ok()?;

    Some((lon as f64 * lon_sign, lat as f64 * lat_sign))
}

/// Check whether a filename has a raster tile extension.
///
/// ```
/// use watermask::filename::has_tile_extension;
///
/// assert!(has_tile_extension("N45W010.tif"));
/// assert!(has_tile_extension("N45W010.TIFF"));
/// assert!(!has_tile_extension("N45W010.tif.aux.xml"));
/// ```
pub fn has_tile_extension(filename: &str) -> bool {
    base_name(filename)
        .rsplit_once('.')
        .map(|(_, ext)| TILE_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

/// Format a southwest corner as a short tile name.
///
/// Latitude is zero-padded to two digits and longitude to three, so
/// `(-10.0, 45.0)` becomes `N45W010`. Fractional degrees are truncated.
///
/// ```
/// use watermask::filename::tile_name;
///
/// assert_eq!(tile_name(-10.0, 45.0), "N45W010");
/// assert_eq!(tile_name(150.0, -30.0), "S30E150");
/// assert_eq!(tile_name(0.0, 0.0), "N00E000");
/// ```
pub fn tile_name(min_lon: f64, min_lat: f64) -> String {
    let lat_prefix = if min_lat >= 0.0 { 'N' } else { 'S' };
    let lon_prefix = if min_lon >= 0.0 { 'E' } else { 'W' };

    format!(
        "{}{:02}{}{:03}",
        lat_prefix,
        min_lat.abs() as u32,
        lon_prefix,
        min_lon.abs() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_north_west() {
        assert_eq!(
            parse_tile_corner("OSM_WaterLayer_N45W010.tif"),
            Some((-10.0, 45.0))
        );
    }

    #[test]
    fn test_parse_south_east() {
        assert_eq!(
            parse_tile_corner("OSM_WaterLayer_S30E150.tif"),
            Some((150.0, -30.0))
        );
    }

    #[test]
    fn test_parse_with_path() {
        assert_eq!(
            parse_tile_corner("/path/to/data/N35E135.tif"),
            Some((135.0, 35.0))
        );
        assert_eq!(
            parse_tile_corner("C:\\data\\S10W075.tif"),
            Some((-75.0, -10.0))
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(parse_tile_corner("water_n45w010.tif"), Some((-10.0, 45.0)));
        assert_eq!(parse_tile_corner("water_s30e150.TIF"), Some((150.0, -30.0)));
    }

    #[test]
    fn test_parse_pattern_anywhere() {
        assert_eq!(
            parse_tile_corner("N45W010_v2_final.tif"),
            Some((-10.0, 45.0))
        );
        assert_eq!(parse_tile_corner("tile-N5E5.tif"), Some((5.0, 5.0)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_tile_corner("invalid.tif"), None);
        assert_eq!(parse_tile_corner("N45.tif"), None); // No longitude
        assert_eq!(parse_tile_corner("X45W010.tif"), None); // Invalid prefix
        assert_eq!(parse_tile_corner("N45X010.tif"), None); // Invalid prefix
        assert_eq!(parse_tile_corner("NAAW010.tif"), None); // Non-numeric
        assert_eq!(parse_tile_corner("N99999999999W010.tif"), None); // Overflow
    }

    #[test]
    fn test_parse_ignores_directory_names() {
        assert_eq!(parse_tile_corner("/tiles/N45W010/readme.tif"), None);
    }

    #[test]
    fn test_has_tile_extension() {
        assert!(has_tile_extension("N45W010.tif"));
        assert!(has_tile_extension("/data/N45W010.Tif"));
        assert!(has_tile_extension("N45W010.tiff"));
        assert!(!has_tile_extension("N45W010.png"));
        assert!(!has_tile_extension("N45W010"));
        assert!(!has_tile_extension("N45W010.tif.ovr"));
    }

    #[test]
    fn test_tile_name() {
        assert_eq!(tile_name(-10.0, 45.0), "N45W010");
        assert_eq!(tile_name(150.0, -30.0), "S30E150");
        assert_eq!(tile_name(-180.0, -90.0), "S90W180");
    }

    #[test]
    fn test_roundtrip() {
        let corners = [(-10.0, 45.0), (150.0, -30.0), (0.0, 0.0), (-175.0, 85.0)];

        for (lon, lat) in corners {
            let name = format!("OSM_WaterLayer_{}.tif", tile_name(lon, lat));
            assert_eq!(parse_tile_corner(&name), Some((lon, lat)));
        }
    }
}
