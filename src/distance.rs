use crate::error::{ReachError, Result};
use crate::model::Location;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Computes the great-circle (haversine) distance between two locations,
/// truncated toward zero to whole kilometers. A computed 12.9 km yields 12.
///
/// Coordinate ranges are re-validated here even though [`Location::new`]
/// already enforces them; the distance must never be computed from an
/// out-of-domain pair.
pub fn distance_km(a: Location, b: Location) -> Result<u32> {
    validate(a)?;
    validate(b)?;
    Ok(haversine_km(a, b) as u32)
}

fn validate(location: Location) -> Result<()> {
    if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lon) {
        return Err(ReachError::InvalidCoordinate {
            lat: location.lat,
            lon: location.lon,
        });
    }
    Ok(())
}

fn haversine_km(a: Location, b: Location) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}
