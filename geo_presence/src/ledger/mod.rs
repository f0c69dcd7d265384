//! Append-only attendance ledger with day-scoped session tracking.
//!
//! For one user and one calendar day (in the ledger's reference offset) the
//! admitted records alternate `checkin`, `checkout`, `checkin`, ... A new
//! check-in needs no open session; a check-out needs one. Several cycles a day
//! are fine.

pub mod clock;
pub mod errors;
pub mod manager;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{LedgerError, LedgerResult};
pub use manager::AttendanceLedger;
pub use models::{
    AttendanceRecord, AttendanceType, DayState, FaceEvidence, NewAttendanceRecord, RecordId,
};
