//! Office data models.

use serde::{Deserialize, Serialize};

/// Office ID type
pub type OfficeId = i64;

/// Office with its circular geofence and network allow-list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius; always > 0
    pub radius_meters: f64,
    /// IPv4 CIDR strings; empty means no address passes
    pub allowed_ranges: Vec<String>,
}

/// Partial update applied by an administrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeUpdate {
    pub radius_meters: Option<f64>,
    pub allowed_ranges: Option<Vec<String>>,
}

impl OfficeUpdate {
    pub fn is_empty(&self) -> bool {
        self.radius_meters.is_none() && self.allowed_ranges.is_none()
    }

    /// Apply the update to a copy of `office`.
    pub fn apply_to(&self, office: &Office) -> Office {
        let mut updated = office.clone();
        if let Some(radius) = self.radius_meters {
            updated.radius_meters = radius;
        }
        if let Some(ranges) = &self.allowed_ranges {
            updated.allowed_ranges = ranges.clone();
        }
        updated
    }
}
