//! Shared types for the crowd-safety core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newtype wrapper for facility/location identifiers to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LocationId {
    fn from(s: &str) -> Self {
        LocationId(s.to_string())
    }
}

/// Newtype wrapper for SOS alert identifiers to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AlertId(pub i64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One occupancy reading from the live telemetry endpoint.
///
/// Superseded wholesale by the next successful poll; the poller never merges
/// samples and keeps no history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySample {
    /// Number of people observed at the location
    pub count: u32,
    /// Sensor timestamp of the observation
    pub observed_at: DateTime<Utc>,
    /// Location the count was observed at
    pub location_id: LocationId,
}

/// Static reference point on the temple grounds.
///
/// Loaded from configuration; the intensity overlay draws exactly one marker
/// per facility point on every redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityPoint {
    pub id: LocationId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl FacilityPoint {
    pub fn new(id: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self { id: LocationId::from(id), name: name.to_string(), lat, lon }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_id_display() {
        let id = LocationId::from("main_entrance");
        assert_eq!(id.to_string(), "main_entrance");
        assert_eq!(id.as_str(), "main_entrance");
    }

    #[test]
    fn test_facility_point_new() {
        let point = FacilityPoint::new("sabha_mandap", "Sabha Mandap", 20.8882, 70.4015);
        assert_eq!(point.id, LocationId::from("sabha_mandap"));
        assert_eq!(point.name, "Sabha Mandap");
    }
}
