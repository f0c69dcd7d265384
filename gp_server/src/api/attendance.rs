//! Check-in, check-out and the caller's day view.
//!
//! # Examples
//!
//! ```bash
//! curl -X POST http://localhost:8080/checkin \
//!   -H "x-user-id: 7" \
//!   -H "Content-Type: application/json" \
//!   -d '{"latitude": -5.170628, "longitude": 119.415447, "officeId": 1}'
//! ```

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
};
use chrono::{DateTime, NaiveDate, Utc};
use geo_presence::{
    admission::{Admission, AdmissionError, AttemptPayload},
    auth::User,
    geofence::GeofenceVerdict,
    ledger::{AttendanceRecord, AttendanceType, Clock, DayState, FaceEvidence},
    network::FactorVerdict,
};
use serde::Serialize;

use super::{AppState, error::ApiError, request_context::ClientAddress};
use crate::{logging, metrics};

/// Body returned for an admitted attempt
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub record_id: i64,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    pub timestamp: DateTime<Utc>,
    pub distance_meters: f64,
    pub office_radius_meters: f64,
    pub geofence: GeofenceVerdict,
    pub network: FactorVerdict,
    pub face: FaceEvidence,
}

impl From<Admission> for AdmissionResponse {
    fn from(admission: Admission) -> Self {
        Self {
            record_id: admission.record_id(),
            kind: admission.kind(),
            timestamp: admission.timestamp(),
            distance_meters: admission.distance_meters,
            office_radius_meters: admission.office_radius_meters,
            geofence: admission.geofence(),
            network: admission.network(),
            face: admission.face().clone(),
        }
    }
}

/// The caller's records for today and the resulting session state
#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub records: Vec<AttendanceRecord>,
    #[serde(flatten)]
    pub state: DayState,
}

/// Record a check-in.
///
/// # Errors
///
/// Any admission error kind, see [`ApiError`].
pub async fn checkin(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    client: ClientAddress,
    payload: Result<Json<AttemptPayload>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    attempt(&state, &user, AttendanceType::Checkin, &client, payload).await
}

/// Record a check-out.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    client: ClientAddress,
    payload: Result<Json<AttemptPayload>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    attempt(&state, &user, AttendanceType::Checkout, &client, payload).await
}

async fn attempt(
    state: &AppState,
    user: &User,
    kind: AttendanceType,
    client: &ClientAddress,
    payload: Result<Json<AttemptPayload>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let kind_label = kind.to_string();

    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            let err = AdmissionError::InvalidInput(rejection.body_text());
            metrics::attendance_attempts_total(&kind_label, err.kind());
            logging::log_admission(user.id, None, &kind_label, err.kind(), None);
            return Err(err.into());
        }
    };
    let office_id = payload.office_id;

    match state
        .admission
        .admit(user.id, kind, payload, client.as_str())
        .await
    {
        Ok(admission) => {
            metrics::attendance_attempts_total(&kind_label, "admitted");
            logging::log_admission(
                user.id,
                office_id,
                &kind_label,
                "admitted",
                Some(admission.distance_meters),
            );
            Ok(Json(admission.into()))
        }
        Err(err) => {
            let distance = match &err {
                AdmissionError::OutOfRange { distance_m, .. } => Some(*distance_m),
                _ => None,
            };
            metrics::attendance_attempts_total(&kind_label, err.kind());
            logging::log_admission(user.id, office_id, &kind_label, err.kind(), distance);
            Err(err.into())
        }
    }
}

/// The caller's records for the current day in the reference zone.
pub async fn today(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<TodayResponse>, ApiError> {
    let ledger = state.admission.ledger();
    let date = ledger.local_date(state.admission.clock().now());

    let records = ledger.records_for(user.id, date).await?;
    let day_state = DayState::from_records(&records);

    Ok(Json(TodayResponse {
        date,
        records,
        state: day_state,
    }))
}
