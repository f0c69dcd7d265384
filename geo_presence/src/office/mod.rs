//! Offices: geofence centers, radii and network allow-lists.
//!
//! Offices are owned by administration; the engine only reads them, except for
//! runtime radius/allow-list changes made through [`OfficeDirectory::update`].

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{OfficeError, OfficeResult};
pub use manager::OfficeDirectory;
pub use models::{Office, OfficeId, OfficeUpdate};
