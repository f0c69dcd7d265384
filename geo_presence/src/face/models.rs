//! Face enrollment and verification models.

use crate::auth::UserId;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{FaceError, FaceResult};

/// Model identifier reported by the default scoring service
pub const DEFAULT_MODEL_ID: &str = "insightface/buffalo_l";

/// Default cosine-distance threshold for a match
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.45;

/// Default number of most recent templates submitted per verification
pub const DEFAULT_TEMPLATE_CAP: usize = 20;

/// A captured face image as raw base64 (no data-URI prefix)
#[derive(Clone, PartialEq, Eq)]
pub struct FaceImage(String);

impl FaceImage {
    /// Build an image from a client payload.
    ///
    /// Accepts raw base64 or a `data:<mime>;base64,<payload>` URI. The content
    /// itself is not inspected; the scoring service owns quality checks.
    ///
    /// # Errors
    ///
    /// * `FaceError::InvalidImage` - Payload is empty after stripping
    ///
    /// # Example
    ///
    /// ```
    /// use geo_presence::face::FaceImage;
    ///
    /// let image = FaceImage::from_payload("data:image/jpeg;base64,/9j/4AAQ").unwrap();
    /// assert_eq!(image.as_base64(), "/9j/4AAQ");
    /// assert!(FaceImage::from_payload("  ").is_err());
    /// ```
    pub fn from_payload(payload: &str) -> FaceResult<Self> {
        let trimmed = payload.trim();
        let raw = if trimmed.starts_with("data:") {
            trimmed
                .split_once(',')
                .map(|(_, data)| data)
                .unwrap_or_default()
        } else {
            trimmed
        };

        if raw.is_empty() {
            return Err(FaceError::InvalidImage("empty image".to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for FaceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FaceImage({} bytes)", self.0.len())
    }
}

/// Embedding produced by the scoring service
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Opaque vector bytes as produced by the model
    pub bytes: Vec<u8>,
    pub model_id: String,
}

/// Enrolled biometric template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceTemplate {
    pub id: i64,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub embedding: Vec<u8>,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
}

impl FaceTemplate {
    pub fn embedding_base64(&self) -> String {
        STANDARD.encode(&self.embedding)
    }
}

/// Outcome of a verification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub is_match: bool,
    pub best_distance: f64,
    pub threshold: f64,
    pub model_id: String,
}

/// Enrollment status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceStatus {
    pub enrolled: bool,
    pub count: i64,
}

/// Result of a successful enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub record_id: i64,
    pub model_id: String,
}
