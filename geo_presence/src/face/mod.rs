//! Face enrollment and verification against a remote scoring service.
//!
//! The embedding model lives outside this crate. [`HttpFaceClient`] talks to
//! it over HTTP; [`FaceManager`] stores templates and bounds every call with a
//! timeout. Failures are split in two classes:
//!
//! - [`FaceError::Unavailable`]: connection refused, DNS failure, timeout,
//!   5xx. Operator action needed.
//! - [`FaceError::Rejected`]: the service looked at the image and refused it
//!   ("no face detected"). The user can retry the capture.
//!
//! ## Example
//!
//! ```no_run
//! use geo_presence::db::MemoryStore;
//! use geo_presence::face::{FaceConfig, FaceImage, FaceManager, HttpFaceClient};
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpFaceClient::new("http://127.0.0.1:8001", Duration::from_secs(12))?;
//!     let faces = FaceManager::new(
//!         Arc::new(client),
//!         Arc::new(MemoryStore::new()),
//!         FaceConfig::default(),
//!     );
//!
//!     let image = FaceImage::from_payload("data:image/jpeg;base64,/9j/4AAQ...")?;
//!     let enrollment = faces.enroll(1, &image).await?;
//!     println!("Enrolled template {} ({})", enrollment.record_id, enrollment.model_id);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod errors;
pub mod manager;
pub mod models;

pub use client::{FaceScorer, HttpFaceClient};
pub use errors::{FaceError, FaceResult};
pub use manager::{FaceConfig, FaceManager};
pub use models::{
    DEFAULT_MATCH_THRESHOLD, DEFAULT_MODEL_ID, DEFAULT_TEMPLATE_CAP, Embedding, Enrollment,
    FaceImage, FaceStatus, FaceTemplate, VerifyOutcome,
};
