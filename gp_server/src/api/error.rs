//! JSON error responses.
//!
//! Every failing handler answers with
//!
//! ```json
//! {"error": "OutOfRange", "message": "...", "details": {"distanceMeters": 31.2, "radiusMeters": 20.0}}
//! ```
//!
//! where `details` is present only when there is structured context.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use geo_presence::{
    admission::AdmissionError, db::StoreError, face::FaceError, office::OfficeError,
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.body.details = Some(details);
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidInput", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal",
            "Internal server error",
        )
    }

    pub fn kind(&self) -> &str {
        &self.body.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        if matches!(err, AdmissionError::Store(_) | AdmissionError::Internal(_)) {
            tracing::error!("Admission failed internally: {}", err);
        }

        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let details = match &err {
            AdmissionError::OutOfRange {
                distance_m,
                radius_m,
            } => Some(json!({"distanceMeters": distance_m, "radiusMeters": radius_m})),
            AdmissionError::FaceMismatch {
                best_distance,
                threshold,
                model_id,
            } => Some(json!({
                "bestDistance": best_distance,
                "threshold": threshold,
                "modelId": model_id,
            })),
            AdmissionError::DuplicateCheckin { since } => Some(json!({"since": since})),
            _ => None,
        };

        let api_error = ApiError::new(status, err.kind(), err.client_message());
        match details {
            Some(details) => api_error.with_details(details),
            None => api_error,
        }
    }
}

impl From<FaceError> for ApiError {
    fn from(err: FaceError) -> Self {
        AdmissionError::from(err).into()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        AdmissionError::from(err).into()
    }
}

impl From<OfficeError> for ApiError {
    fn from(err: OfficeError) -> Self {
        match err {
            OfficeError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "OfficeNotFound", err.client_message())
            }
            OfficeError::InvalidRadius(_) | OfficeError::EmptyUpdate => {
                ApiError::invalid_input(err.client_message())
            }
            OfficeError::Store(e) => e.into(),
        }
    }
}
