//! Coordinate formatting and great-circle distance.

use cachesync_core::Coordinates;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Render a decimal lat/lon pair as `S27 30.000 E153 00.000`.
///
/// `(0, 0)` renders as the empty string: the search service uses it for
/// "no corrected coordinates". Output is byte-stable for identical input;
/// rows are compared on these strings, not on the floats.
pub fn format_coords(lat: f64, lon: f64) -> String {
    if lat == 0.0 && lon == 0.0 {
        return String::new();
    }
    let (lat_dir, lat) = if lat < 0.0 { ('S', -lat) } else { ('N', lat) };
    let (lon_dir, lon) = if lon < 0.0 { ('W', -lon) } else { ('E', lon) };
    let (lat_deg, lat_min) = degrees_minutes(lat);
    let (lon_deg, lon_min) = degrees_minutes(lon);
    format!("{lat_dir}{lat_deg} {lat_min:06.3} {lon_dir}{lon_deg} {lon_min:06.3}")
}

/// [`format_coords`] for a [`Coordinates`] value.
pub fn format_coordinates(coords: Coordinates) -> String {
    format_coords(coords.latitude, coords.longitude)
}

fn degrees_minutes(value: f64) -> (u32, f64) {
    let degrees = value.trunc();
    (degrees as u32, (value - degrees) * 60.0)
}

/// Haversine distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two points, rounded to two decimals.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    round2(haversine_km(
        from.latitude,
        from.longitude,
        to.latitude,
        to.longitude,
    ))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
