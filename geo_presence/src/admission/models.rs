//! Admission request and result models.

use crate::{
    face::FaceImage,
    geofence::GeofenceVerdict,
    ledger::{AttendanceRecord, AttendanceType, FaceEvidence},
    network::FactorVerdict,
    office::OfficeId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum note length in characters
pub const MAX_NOTE_LEN: usize = 500;

/// Second admission factor selected by deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondFactor {
    /// Client address must match the office allow-list
    #[default]
    Network,
    /// Capture must match an enrolled face template
    Face,
}

impl std::fmt::Display for SecondFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecondFactor::Network => write!(f, "network"),
            SecondFactor::Face => write!(f, "face"),
        }
    }
}

impl std::str::FromStr for SecondFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(SecondFactor::Network),
            "face" => Ok(SecondFactor::Face),
            other => Err(format!("unknown second factor: {other} (expected network or face)")),
        }
    }
}

/// Deployment-level admission settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub second_factor: SecondFactor,
}

/// Raw attempt body as received from the client
///
/// Every field is optional here; [`ParsedAttempt::parse`] decides what is
/// missing or out of range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPayload {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub office_id: Option<OfficeId>,
    pub accuracy_meters: Option<f64>,
    pub face_image_base64: Option<String>,
    pub note: Option<String>,
}

/// Attempt that passed shape validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAttempt {
    pub latitude: f64,
    pub longitude: f64,
    pub office_id: OfficeId,
    pub accuracy_meters: Option<f64>,
    pub face_image: Option<FaceImage>,
    pub note: Option<String>,
}

/// Outcome of validating an [`AttemptPayload`]
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAttempt {
    Valid(ValidAttempt),
    Invalid(String),
}

impl ParsedAttempt {
    /// Validate a payload for the given second factor.
    ///
    /// Coordinates must be finite and within ±90/±180. In face mode a capture
    /// is required; in network mode any capture is ignored.
    pub fn parse(payload: AttemptPayload, second_factor: SecondFactor) -> Self {
        match validate(payload, second_factor) {
            Ok(attempt) => ParsedAttempt::Valid(attempt),
            Err(reason) => ParsedAttempt::Invalid(reason),
        }
    }

    pub fn into_result(self) -> Result<ValidAttempt, String> {
        match self {
            ParsedAttempt::Valid(attempt) => Ok(attempt),
            ParsedAttempt::Invalid(reason) => Err(reason),
        }
    }
}

fn validate(payload: AttemptPayload, second_factor: SecondFactor) -> Result<ValidAttempt, String> {
    let latitude = payload.latitude.ok_or("latitude is required")?;
    let longitude = payload.longitude.ok_or("longitude is required")?;
    let office_id = payload.office_id.ok_or("officeId is required")?;

    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude out of range: {latitude}"));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude out of range: {longitude}"));
    }

    if let Some(accuracy) = payload.accuracy_meters {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(format!("accuracyMeters must be a non-negative number: {accuracy}"));
        }
    }

    let note = payload
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(note) = &note {
        if note.chars().count() > MAX_NOTE_LEN {
            return Err(format!("note exceeds {MAX_NOTE_LEN} characters"));
        }
    }

    let face_image = match second_factor {
        SecondFactor::Network => None,
        SecondFactor::Face => {
            let raw = payload
                .face_image_base64
                .ok_or("faceImageBase64 is required for face verification")?;
            Some(FaceImage::from_payload(&raw).map_err(|e| e.to_string())?)
        }
    };

    Ok(ValidAttempt {
        latitude,
        longitude,
        office_id,
        accuracy_meters: payload.accuracy_meters,
        face_image,
        note,
    })
}

/// Admitted attempt with the values the client displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub record: AttendanceRecord,
    pub distance_meters: f64,
    pub office_radius_meters: f64,
}

impl Admission {
    pub fn record_id(&self) -> i64 {
        self.record.id
    }

    pub fn kind(&self) -> AttendanceType {
        self.record.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.recorded_at
    }

    pub fn geofence(&self) -> GeofenceVerdict {
        self.record.geofence
    }

    pub fn network(&self) -> FactorVerdict {
        self.record.network
    }

    pub fn face(&self) -> &FaceEvidence {
        &self.record.face
    }
}
