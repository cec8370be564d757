//! Great-circle distance and radius filtering.

use serde::{Deserialize, Serialize};
use tripmate_common::{AppError, AppResult};
use tripmate_db::{
    entities::{activity, event},
    repositories::GeoBounds,
};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack added to every radius comparison. Stored coordinates carry about
/// four decimals (~11 m), so a point that is 10 km away on the map may
/// compute a few meters further.
pub const RADIUS_TOLERANCE_KM: f64 = 0.01;

/// Kilometers per degree of latitude used for bounding boxes (rounded down
/// so the box always contains the circle).
const KM_PER_DEGREE: f64 = 111.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting out-of-range or non-finite coordinates.
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::Validation(format!("Invalid latitude: {latitude}")));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::Validation(format!(
                "Invalid longitude: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Parameters of a nearby listing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

/// Anything with an optional position.
pub trait Located {
    /// `(latitude, longitude)`; either may be missing.
    fn coordinates(&self) -> (Option<f64>, Option<f64>);
}

impl Located for activity::Model {
    fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        (self.latitude, self.longitude)
    }
}

impl Located for event::Model {
    fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        (self.latitude, self.longitude)
    }
}

/// An item together with its distance from the query origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nearby<T> {
    pub item: T,
    pub distance_km: f64,
}

/// Haversine distance in kilometers. A missing coordinate on either side
/// yields `f64::INFINITY`.
#[must_use]
pub fn distance_km(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> f64 {
    match (lat1, lon1, lat2, lon2) {
        (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => haversine_km(lat1, lon1, lat2, lon2),
        _ => f64::INFINITY,
    }
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);
    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Keep items within `radius_km` of `origin`, nearest first.
pub fn filter_by_radius<T: Located>(
    candidates: impl IntoIterator<Item = T>,
    origin: GeoPoint,
    radius_km: f64,
) -> Vec<Nearby<T>> {
    let limit = radius_km + RADIUS_TOLERANCE_KM;
    let mut nearby: Vec<Nearby<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let (lat, lon) = item.coordinates();
            let distance_km = distance_km(Some(origin.latitude), Some(origin.longitude), lat, lon);
            (distance_km <= limit).then_some(Nearby { item, distance_km })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Latitude/longitude rectangle containing the circle of `radius_km`
/// around `origin`, for prefiltering in SQL.
#[must_use]
pub fn bounding_box(origin: GeoPoint, radius_km: f64) -> GeoBounds {
    let lat_change = (radius_km + RADIUS_TOLERANCE_KM) / KM_PER_DEGREE;
    let min_lat = origin.latitude - lat_change;
    let max_lat = origin.latitude + lat_change;

    let lon_range = if min_lat <= -90.0 || max_lat >= 90.0 {
        None
    } else {
        let lon_change = lat_change / origin.latitude.to_radians().cos().abs();
        let min_lon = origin.longitude - lon_change;
        let max_lon = origin.longitude + lon_change;
        if min_lon < -180.0 || max_lon > 180.0 {
            None
        } else {
            Some((min_lon, max_lon))
        }
    };

    GeoBounds {
        center: (origin.latitude, origin.longitude),
        min_lat: min_lat.max(-90.0),
        max_lat: max_lat.min(90.0),
        lon_range,
    }
}
