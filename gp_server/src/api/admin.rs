//! Administrative endpoints: attendance reports and office settings.
//!
//! Both routes sit behind [`require_admin`](super::middleware::require_admin).
//!
//! ```bash
//! curl "http://localhost:8080/admin/attendance?date=2024-03-04&officeId=1" -H "x-user-id: 1"
//!
//! curl -X PATCH http://localhost:8080/admin/offices/1 \
//!   -H "x-user-id: 1" \
//!   -H "Content-Type: application/json" \
//!   -d '{"radiusMeters": 50, "allowedRanges": ["192.168.1.0/24"]}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, Query, State, rejection::JsonRejection},
};
use chrono::NaiveDate;
use geo_presence::{
    auth::User,
    ledger::{AttendanceRecord, Clock},
    office::{Office, OfficeId, OfficeUpdate},
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    /// `YYYY-MM-DD` in the reference zone; today when absent
    pub date: Option<String>,
    pub office_id: Option<OfficeId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse {
    pub date: NaiveDate,
    pub office_id: Option<OfficeId>,
    pub records: Vec<AttendanceRecord>,
}

/// Every record on a calendar date, optionally for one office.
pub async fn records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let ledger = state.admission.ledger();
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::invalid_input(format!("date must be YYYY-MM-DD: {raw}")))?,
        None => ledger.local_date(state.admission.clock().now()),
    };

    let records = ledger.records_on(date, query.office_id).await?;

    Ok(Json(RecordsResponse {
        date,
        office_id: query.office_id,
        records,
    }))
}

/// Change an office's radius and/or allow-list.
///
/// # Errors
///
/// - `400 InvalidInput`: Empty update, or a radius that is not finite and positive
/// - `404 OfficeNotFound`: No office with that ID
pub async fn update_office(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    Path(office_id): Path<OfficeId>,
    payload: Result<Json<OfficeUpdate>, JsonRejection>,
) -> Result<Json<Office>, ApiError> {
    let Json(update) = payload.map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;

    let office = state.admission.offices().update(office_id, update).await?;
    tracing::info!(
        admin_id = admin.id,
        office_id = office.id,
        radius_meters = office.radius_meters,
        allowed_ranges = ?office.allowed_ranges,
        "Office settings changed"
    );

    Ok(Json(office))
}
