//! # Geo Presence
//!
//! Attendance admission engine: check-ins and check-outs are recorded only
//! when the reporter is inside the office geofence and passes a second
//! factor chosen by deployment (network allow-list or face match).
//!
//! ## Architecture
//!
//! An attempt flows through the [`admission::AdmissionController`]:
//!
//! - **Validate**: coordinates in range, office exists
//! - **Geofence**: haversine distance against the office radius
//! - **Second factor**: IPv4 CIDR allow-list *or* remote face verification
//! - **Ledger guard**: per-user, per-day alternation of check-in/check-out
//! - **Append**: one immutable attendance record
//!
//! ## Core Modules
//!
//! - [`geofence`]: Great-circle distance and radius verdict
//! - [`network`]: Client address normalisation and CIDR matching
//! - [`face`]: Scoring service client and template orchestration
//! - [`ledger`]: Day-scoped session state and guarded appends
//! - [`admission`]: The pipeline tying the above together
//! - [`db`]: Storage traits with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use geo_presence::geofence::{self, GeofenceVerdict};
//!
//! let check = geofence::evaluate(-5.170628, 119.415447, -5.170628, 119.415447, 20.0);
//! assert_eq!(check.distance_m, 0.0);
//! assert_eq!(check.verdict, GeofenceVerdict::Pass);
//! ```

/// Admission pipeline and its error taxonomy.
pub mod admission;
pub use admission::{AdmissionController, AdmissionError, AdmissionPolicy, SecondFactor};

/// Users and roles.
pub mod auth;

/// Storage traits, PostgreSQL pool and in-memory store.
pub mod db;

/// Face enrollment and verification.
pub mod face;

/// Geofence evaluation.
pub mod geofence;

/// Attendance ledger and clock.
pub mod ledger;
pub use ledger::{AttendanceLedger, AttendanceRecord, AttendanceType, DayState};

/// Network allow-list matching.
pub mod network;

/// Office directory.
pub mod office;
pub use office::{Office, OfficeDirectory};
