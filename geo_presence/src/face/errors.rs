//! Face verification error types.

use crate::db::StoreError;
use thiserror::Error;

/// Face enrollment/verification errors
#[derive(Debug, Error)]
pub enum FaceError {
    /// Scoring service unreachable, timed out, or failing on its side
    #[error("Face service unavailable: {0}")]
    Unavailable(String),

    /// Scoring service answered with a domain error (message passed through)
    #[error("{0}")]
    Rejected(String),

    /// Scoring service answered with a body we cannot interpret
    #[error("Invalid face service response: {0}")]
    InvalidResponse(String),

    /// Client payload is not usable as an image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// User has no enrolled templates
    #[error("No face enrolled for user {0}")]
    NotEnrolled(i64),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl FaceError {
    /// Infrastructure failures an operator has to fix, as opposed to
    /// something the user can correct by retrying the capture.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FaceError::Unavailable(_))
    }
}

/// Result type for face operations
pub type FaceResult<T> = Result<T, FaceError>;
