//! Ledger error types.

use crate::db::StoreError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Ledger guard violations and storage failures
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Check-in while a session is already open
    #[error("Already checked in since {since}")]
    DuplicateCheckin { since: DateTime<Utc> },

    /// Check-out without an open session
    #[error("No open check-in to check out from")]
    NoOpenSession,

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
