//! Great-circle distance and nearest-facility ranking.
//!
//! Distances are straight-line over a spherical Earth. That is good enough to
//! order a few dozen hospitals or rescuers; it is not a routing engine.

use serde::Serialize;

use crate::model::Facility;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Reference point used when a caller does not supply coordinates (Kathmandu).
pub const KATHMANDU: GeoPoint = GeoPoint {
    latitude: 27.7172,
    longitude: 85.3240,
};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A facility annotated with its distance from the query point.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub facility: Facility,

    /// Distance from the query point in kilometres.
    pub distance: f64,
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Annotate every facility with its distance from `origin` and sort nearest first.
///
/// The sort is stable, so facilities at the same distance keep their input order.
pub fn rank_by_distance(origin: GeoPoint, facilities: Vec<Facility>) -> Vec<RankedFacility> {
    let mut ranked: Vec<RankedFacility> = facilities
        .into_iter()
        .map(|facility| RankedFacility {
            distance: haversine_km(origin, facility.point()),
            facility,
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked
}
