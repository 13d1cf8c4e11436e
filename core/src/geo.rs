//! Geographic points and great-circle distance.
//!
//! Distances use the haversine formula on a sphere with the mean Earth
//! radius. This is within a fraction of a percent of the ellipsoidal distance
//! at the tens-to-thousands of meters the movement policy cares about, and is
//! symmetric and monotonic in the angular separation.

use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

/// Unchecked wire form of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if latitude is outside `[-90, 90]` or
    /// longitude is outside `[-180, 180]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use leavecheck_core::geo::GeoPoint;
    ///
    /// assert!(GeoPoint::new(35.6812, 139.7671).is_ok());
    /// assert!(GeoPoint::new(999.0, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        // Clamp guards against rounding pushing `a` just past 1 for antipodes.
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }
}

#[cfg(test)]
impl GeoPoint {
    /// The point `meters` due north, clamped at the pole.
    pub(crate) fn offset_north(&self, meters: f64) -> GeoPoint {
        let delta = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint {
            latitude: (self.latitude + delta).clamp(-90.0, 90.0),
            longitude: self.longitude,
        }
    }
}

impl TryFrom<RawCoordinate> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for RawCoordinate {
    fn from(point: GeoPoint) -> Self {
        RawCoordinate {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}
