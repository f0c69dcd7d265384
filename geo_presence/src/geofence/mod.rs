//! Circular geofence evaluation.
//!
//! Distances are great-circle distances computed with the haversine formula on
//! a sphere of radius [`EARTH_RADIUS_M`]. Inputs are degrees. Range checks on
//! latitude/longitude are the caller's job; see
//! [`crate::admission::ParsedAttempt`].

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geofence verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeofenceVerdict {
    Pass,
    Fail,
}

impl GeofenceVerdict {
    pub fn is_pass(self) -> bool {
        matches!(self, GeofenceVerdict::Pass)
    }
}

impl std::fmt::Display for GeofenceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeofenceVerdict::Pass => write!(f, "PASS"),
            GeofenceVerdict::Fail => write!(f, "FAIL"),
        }
    }
}

impl std::str::FromStr for GeofenceVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(GeofenceVerdict::Pass),
            "FAIL" => Ok(GeofenceVerdict::Fail),
            other => Err(format!("unknown geofence verdict: {other}")),
        }
    }
}

/// Result of a geofence evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceCheck {
    /// Distance to the office center, rounded to centimeters
    pub distance_m: f64,
    pub verdict: GeofenceVerdict,
}

/// Raw haversine distance in meters between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Float error can push `a` marginally past 1 for near-antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Round a distance to two decimal places.
pub fn round_distance(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Evaluate a reported position against a circular geofence.
///
/// The verdict is computed on the rounded distance, so a caller that stores
/// `distance_m` can always reproduce the verdict from the stored values.
///
/// # Example
///
/// ```
/// use geo_presence::geofence::{evaluate, GeofenceVerdict};
///
/// let check = evaluate(-5.170628, 119.415447, -5.170628, 119.415447, 20.0);
/// assert_eq!(check.distance_m, 0.0);
/// assert_eq!(check.verdict, GeofenceVerdict::Pass);
/// ```
pub fn evaluate(
    user_lat: f64,
    user_lon: f64,
    office_lat: f64,
    office_lon: f64,
    radius_m: f64,
) -> GeofenceCheck {
    let distance_m = round_distance(haversine_distance(user_lat, user_lon, office_lat, office_lon));
    let verdict = if distance_m <= radius_m {
        GeofenceVerdict::Pass
    } else {
        GeofenceVerdict::Fail
    };

    GeofenceCheck {
        distance_m,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE_LAT: f64 = -5.170628;
    const OFFICE_LON: f64 = 119.415447;

    #[test]
    fn test_identical_points_have_zero_distance() {
        assert_eq!(haversine_distance(OFFICE_LAT, OFFICE_LON, OFFICE_LAT, OFFICE_LON), 0.0);

        let check = evaluate(OFFICE_LAT, OFFICE_LON, OFFICE_LAT, OFFICE_LON, 0.0);
        assert_eq!(check.distance_m, 0.0);
        assert_eq!(check.verdict, GeofenceVerdict::Pass);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = haversine_distance(OFFICE_LAT, OFFICE_LON, -5.1, 119.5);
        let b = haversine_distance(-5.1, 119.5, OFFICE_LAT, OFFICE_LON);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_thousandth_degree_latitude_at_equator() {
        // Reference: R * 0.001 * pi / 180
        let reference = EARTH_RADIUS_M * 0.001_f64.to_radians();
        let check = evaluate(0.0, 0.0, 0.001, 0.0, 200.0);

        assert!((check.distance_m - reference).abs() <= 0.01);
        assert!((check.distance_m - 111.19).abs() <= 0.01);
    }

    #[test]
    fn test_verdict_at_exact_boundary() {
        let check = evaluate(0.0, 0.0, 0.001, 0.0, 1.0);
        let boundary = check.distance_m;

        let at = evaluate(0.0, 0.0, 0.001, 0.0, boundary);
        assert_eq!(at.verdict, GeofenceVerdict::Pass);

        let below = evaluate(0.0, 0.0, 0.001, 0.0, boundary - 0.01);
        assert_eq!(below.verdict, GeofenceVerdict::Fail);
    }

    #[test]
    fn test_point_500m_away_fails_small_fence() {
        // 500 m due north of the office
        let dlat = (500.0 / EARTH_RADIUS_M).to_degrees();
        let check = evaluate(OFFICE_LAT + dlat, OFFICE_LON, OFFICE_LAT, OFFICE_LON, 20.0);

        assert_eq!(check.verdict, GeofenceVerdict::Fail);
        assert!((check.distance_m - 500.0).abs() < 0.5, "got {}", check.distance_m);
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_M * std::f64::consts::PI).abs() < 1.0);
    }

    #[test]
    fn test_round_distance() {
        assert_eq!(round_distance(12.345_678), 12.35);
        assert_eq!(round_distance(0.004), 0.0);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(GeofenceVerdict::Pass.to_string(), "PASS");
        assert_eq!(GeofenceVerdict::Fail.to_string(), "FAIL");
        assert!(GeofenceVerdict::Pass.is_pass());
    }
}
