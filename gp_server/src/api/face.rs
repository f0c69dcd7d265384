//! Face enrollment endpoints.

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
};
use geo_presence::{
    admission::AdmissionError,
    auth::User,
    face::{Enrollment, FaceImage, FaceManager, FaceStatus},
};
use serde::Deserialize;

use super::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub image_base64: Option<String>,
}

fn face_manager(state: &AppState) -> Result<&FaceManager, ApiError> {
    state.admission.face().ok_or_else(|| {
        AdmissionError::FaceServiceUnavailable("face verification is not configured".to_string())
            .into()
    })
}

/// Enrollment status of the caller: `{enrolled, count}`.
pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<FaceStatus>, ApiError> {
    let status = face_manager(&state)?.status(user.id).await?;
    Ok(Json(status))
}

/// Enroll one more template for the caller.
///
/// # Request
///
/// ```json
/// {"imageBase64": "data:image/jpeg;base64,/9j/4AAQ..."}
/// ```
///
/// # Errors
///
/// - `400 InvalidInput`: Missing or empty image
/// - `400 FaceRejected`: The scoring service found no usable face
/// - `503 FaceServiceUnavailable`: Scoring service down or timed out
pub async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<EnrollRequest>, JsonRejection>,
) -> Result<Json<Enrollment>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;

    let raw = request
        .image_base64
        .ok_or_else(|| ApiError::invalid_input("imageBase64 is required"))?;
    let image = FaceImage::from_payload(&raw)?;

    let enrollment = face_manager(&state)?.enroll(user.id, &image).await?;
    tracing::info!(
        user_id = user.id,
        record_id = enrollment.record_id,
        model_id = %enrollment.model_id,
        "Face template enrolled"
    );

    Ok(Json(enrollment))
}
