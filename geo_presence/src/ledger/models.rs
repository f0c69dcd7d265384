//! Attendance ledger data models.

use crate::{auth::UserId, geofence::GeofenceVerdict, network::FactorVerdict, office::OfficeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendance record ID type
pub type RecordId = i64;

/// Attendance event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceType {
    Checkin,
    Checkout,
}

impl std::fmt::Display for AttendanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceType::Checkin => write!(f, "checkin"),
            AttendanceType::Checkout => write!(f, "checkout"),
        }
    }
}

impl std::str::FromStr for AttendanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkin" => Ok(AttendanceType::Checkin),
            "checkout" => Ok(AttendanceType::Checkout),
            other => Err(format!("unknown attendance type: {other}")),
        }
    }
}

/// Face evidence attached to a record admitted in face mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceEvidence {
    pub verdict: FactorVerdict,
    pub distance: Option<f64>,
    pub model_id: Option<String>,
}

impl FaceEvidence {
    pub fn not_evaluated() -> Self {
        Self {
            verdict: FactorVerdict::NotEvaluated,
            distance: None,
            model_id: None,
        }
    }
}

/// Record about to be appended; the store assigns the ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendanceRecord {
    pub user_id: UserId,
    pub office_id: OfficeId,
    pub kind: AttendanceType,
    /// Whole seconds
    pub recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub distance_meters: f64,
    pub geofence: GeofenceVerdict,
    pub network: FactorVerdict,
    pub face: FaceEvidence,
    pub client_address: String,
    pub note: Option<String>,
}

impl NewAttendanceRecord {
    pub fn with_id(self, id: RecordId) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: self.user_id,
            office_id: self.office_id,
            kind: self.kind,
            recorded_at: self.recorded_at,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_meters: self.accuracy_meters,
            distance_meters: self.distance_meters,
            geofence: self.geofence,
            network: self.network,
            face: self.face,
            client_address: self.client_address,
            note: self.note,
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub office_id: OfficeId,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    pub recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub distance_meters: f64,
    pub geofence: GeofenceVerdict,
    pub network: FactorVerdict,
    pub face: FaceEvidence,
    pub client_address: String,
    pub note: Option<String>,
}

/// Day-scoped session state of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DayState {
    /// No check-in yet today
    NoSession,
    /// A check-in without a later check-out
    OpenSession {
        since: DateTime<Utc>,
        #[serde(rename = "recordId")]
        record_id: RecordId,
    },
    /// Every check-in today has been matched by a check-out
    ClosedSession,
}

impl DayState {
    /// Derive the state from a day's records.
    ///
    /// Records are ordered by `(recorded_at, id)` before folding, so the result
    /// does not depend on the order the store returned them in.
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let mut ordered: Vec<&AttendanceRecord> = records.iter().collect();
        ordered.sort_by_key(|r| (r.recorded_at, r.id));

        let last_checkin = ordered
            .iter()
            .rposition(|r| r.kind == AttendanceType::Checkin);

        match last_checkin {
            None => DayState::NoSession,
            Some(idx) => {
                let closed = ordered[idx + 1..]
                    .iter()
                    .any(|r| r.kind == AttendanceType::Checkout);
                if closed {
                    DayState::ClosedSession
                } else {
                    let open = ordered[idx];
                    DayState::OpenSession {
                        since: open.recorded_at,
                        record_id: open.id,
                    }
                }
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DayState::OpenSession { .. })
    }

    /// Transition guard for an attempt of `kind`
    pub fn permits(&self, kind: AttendanceType) -> bool {
        match kind {
            AttendanceType::Checkin => !self.is_open(),
            AttendanceType::Checkout => self.is_open(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayState::NoSession => "no_session",
            DayState::OpenSession { .. } => "open_session",
            DayState::ClosedSession => "closed_session",
        }
    }
}
