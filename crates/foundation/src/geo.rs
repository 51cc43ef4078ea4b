use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite latitude within [-90, 90].
    ///
    /// Longitude is only required to be finite; callers may hand us wrapped
    /// longitudes (the generated stress set goes well past 180).
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }
}
