//! Great-circle distance and subject geocoding.

use std::collections::BTreeMap;

use crate::config::CityCenter;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two WGS84 coordinates.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Resolves a subject address into coordinates.
///
/// `None` means the location is unknown; callers fall back to
/// distance-free weighting rather than failing.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str, city: &str, state: &str, country: &str)
    -> Option<(f64, f64)>;
}

/// Geocoder backed by a fixed table of city centers.
///
/// Only the city name is consulted, and it must match a table key exactly.
pub struct CityTableGeocoder {
    centers: BTreeMap<String, CityCenter>,
}

impl CityTableGeocoder {
    pub fn new(centers: BTreeMap<String, CityCenter>) -> Self {
        Self { centers }
    }
}

impl Geocoder for CityTableGeocoder {
    fn geocode(
        &self,
        _address: &str,
        city: &str,
        _state: &str,
        _country: &str,
    ) -> Option<(f64, f64)> {
        self.centers.get(city).map(|c| (c.lat, c.lon))
    }
}
