//! Admission engine: turns a raw attendance attempt into a ledger record or a
//! typed rejection.
//!
//! ```text
//! attempt ─▶ validate ─▶ office ─▶ geofence ─▶ network | face ─▶ ledger guard ─▶ record
//! ```
//!
//! Every step before the ledger guard is free of ledger side effects, so a
//! rejection at any point leaves the day state unchanged.

pub mod controller;
pub mod errors;
pub mod models;

pub use controller::AdmissionController;
pub use errors::{AdmissionError, AdmissionResult};
pub use models::{
    Admission, AdmissionPolicy, AttemptPayload, MAX_NOTE_LEN, ParsedAttempt, SecondFactor,
    ValidAttempt,
};
