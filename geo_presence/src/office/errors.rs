//! Office directory error types.

use super::models::OfficeId;
use crate::db::StoreError;
use thiserror::Error;

/// Office directory errors
#[derive(Debug, Error)]
pub enum OfficeError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Office not found
    #[error("Office not found: {0}")]
    NotFound(OfficeId),

    /// Radius must be a finite positive number of meters
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),

    /// Update carried no fields
    #[error("Nothing to update")]
    EmptyUpdate,
}

impl OfficeError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            OfficeError::Store(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for office directory operations
pub type OfficeResult<T> = Result<T, OfficeError>;
