#![forbid(unsafe_code)]

//! Location provider and great-circle distance.

use glassbite_state::{Coordinates, Location};

use crate::error::LocationError;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Device location source.
///
/// Both calls may fail; callers own any retry policy.
pub trait LocationProvider {
    fn request_permission(&self) -> Result<bool, LocationError>;
    fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Ask for permission, then read the position.
pub fn locate(provider: &dyn LocationProvider) -> Result<Location, LocationError> {
    if !provider.request_permission()? {
        tracing::debug!("location permission refused");
        return Err(LocationError::PermissionDenied);
    }
    let coordinates = provider.current_position()?;
    tracing::debug!(lat = coordinates.lat, lng = coordinates.lng, "location resolved");
    Ok(Location::new(coordinates))
}

/// Provider with a scripted answer.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    granted: bool,
    position: Result<Coordinates, LocationError>,
}

impl FixedLocationProvider {
    /// Permission granted and `position` reported.
    #[must_use]
    pub fn at(position: Coordinates) -> Self {
        Self {
            granted: true,
            position: Ok(position),
        }
    }

    /// The user refuses permission.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            granted: false,
            position: Err(LocationError::PermissionDenied),
        }
    }

    /// Permission granted but no fix available.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            position: Err(LocationError::Unavailable(reason.into())),
        }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn request_permission(&self) -> Result<bool, LocationError> {
        Ok(self.granted)
    }

    fn current_position(&self) -> Result<Coordinates, LocationError> {
        if !self.granted {
            return Err(LocationError::PermissionDenied);
        }
        self.position.clone()
    }
}
