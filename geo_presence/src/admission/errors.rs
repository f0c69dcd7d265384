//! Admission error taxonomy.

use crate::{
    db::StoreError, face::FaceError, ledger::LedgerError, office::OfficeError, office::OfficeId,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reasons an attendance attempt is not admitted
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Malformed attempt
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Office reference does not exist
    #[error("Office not found: {0}")]
    OfficeNotFound(OfficeId),

    /// Outside the office geofence
    #[error("Out of range: {distance_m:.2}m from office, radius is {radius_m}m")]
    OutOfRange { distance_m: f64, radius_m: f64 },

    /// Client address not on the office allow-list
    #[error("Network not allowed: {client_address}")]
    NetworkDenied { client_address: String },

    /// No face templates enrolled
    #[error("Face not enrolled")]
    FaceUnenrolled,

    /// Capture did not match any template
    #[error("Face does not match (distance {best_distance:.4}, threshold {threshold})")]
    FaceMismatch {
        best_distance: f64,
        threshold: f64,
        model_id: String,
    },

    /// Scoring service refused the capture (message passed through)
    #[error("{0}")]
    FaceRejected(String),

    /// Check-in while a session is open
    #[error("Already checked in since {since}")]
    DuplicateCheckin { since: DateTime<Utc> },

    /// Check-out without an open session
    #[error("No open check-in to check out from")]
    NoOpenSession,

    /// Scoring service unreachable or timed out
    #[error("Face verification service unavailable: {0}")]
    FaceServiceUnavailable(String),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AdmissionError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::InvalidInput(_) => "InvalidInput",
            AdmissionError::OfficeNotFound(_) => "OfficeNotFound",
            AdmissionError::OutOfRange { .. } => "OutOfRange",
            AdmissionError::NetworkDenied { .. } => "NetworkDenied",
            AdmissionError::FaceUnenrolled => "FaceUnenrolled",
            AdmissionError::FaceMismatch { .. } => "FaceMismatch",
            AdmissionError::FaceRejected(_) => "FaceRejected",
            AdmissionError::DuplicateCheckin { .. } => "DuplicateCheckin",
            AdmissionError::NoOpenSession => "NoOpenSession",
            AdmissionError::FaceServiceUnavailable(_) => "FaceServiceUnavailable",
            AdmissionError::Internal(_) | AdmissionError::Store(_) => "Internal",
        }
    }

    /// HTTP status this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            AdmissionError::InvalidInput(_)
            | AdmissionError::FaceUnenrolled
            | AdmissionError::FaceRejected(_)
            | AdmissionError::DuplicateCheckin { .. }
            | AdmissionError::NoOpenSession => 400,
            AdmissionError::OutOfRange { .. }
            | AdmissionError::NetworkDenied { .. }
            | AdmissionError::FaceMismatch { .. } => 403,
            AdmissionError::OfficeNotFound(_) => 404,
            AdmissionError::FaceServiceUnavailable(_) => 503,
            AdmissionError::Internal(_) | AdmissionError::Store(_) => 500,
        }
    }

    /// Whether the user can fix this without operator action
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(
            self,
            AdmissionError::FaceServiceUnavailable(_)
                | AdmissionError::Internal(_)
                | AdmissionError::Store(_)
        )
    }

    /// Get a client-safe error message
    ///
    /// Storage and internal details are not exposed; the network denial does
    /// not echo the address back.
    pub fn client_message(&self) -> String {
        match self {
            AdmissionError::Store(_) | AdmissionError::Internal(_) => {
                "Internal server error".to_string()
            }
            AdmissionError::NetworkDenied { .. } => {
                "Your network is not allowed for this office".to_string()
            }
            AdmissionError::FaceServiceUnavailable(_) => {
                "Face verification service is unavailable, try again later".to_string()
            }
            AdmissionError::FaceUnenrolled => {
                "No face enrolled, enroll before checking in".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<FaceError> for AdmissionError {
    fn from(err: FaceError) -> Self {
        match err {
            FaceError::Unavailable(reason) => AdmissionError::FaceServiceUnavailable(reason),
            FaceError::Rejected(message) => AdmissionError::FaceRejected(message),
            FaceError::InvalidImage(reason) => AdmissionError::InvalidInput(reason),
            FaceError::NotEnrolled(_) => AdmissionError::FaceUnenrolled,
            FaceError::InvalidResponse(reason) => AdmissionError::Internal(reason),
            FaceError::Store(e) => AdmissionError::Store(e),
        }
    }
}

impl From<LedgerError> for AdmissionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateCheckin { since } => AdmissionError::DuplicateCheckin { since },
            LedgerError::NoOpenSession => AdmissionError::NoOpenSession,
            LedgerError::Store(e) => AdmissionError::Store(e),
        }
    }
}

impl From<OfficeError> for AdmissionError {
    fn from(err: OfficeError) -> Self {
        match err {
            OfficeError::NotFound(id) => AdmissionError::OfficeNotFound(id),
            OfficeError::Store(e) => AdmissionError::Store(e),
            other @ (OfficeError::InvalidRadius(_) | OfficeError::EmptyUpdate) => {
                AdmissionError::InvalidInput(other.to_string())
            }
        }
    }
}

/// Result type for admission
pub type AdmissionResult<T> = Result<T, AdmissionError>;
