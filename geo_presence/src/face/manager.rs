//! Face enrollment and verification orchestration.

use super::{
    client::FaceScorer,
    errors::{FaceError, FaceResult},
    models::{
        DEFAULT_MATCH_THRESHOLD, DEFAULT_TEMPLATE_CAP, Enrollment, FaceImage, FaceStatus,
        VerifyOutcome,
    },
};
use crate::{auth::UserId, db::FaceTemplateRepository};
use std::{future::Future, sync::Arc, time::Duration, time::Instant};

/// Face verification settings
#[derive(Debug, Clone)]
pub struct FaceConfig {
    /// Cosine-distance threshold sent to the scoring service
    pub threshold: f64,
    /// Upper bound on a single scoring call
    pub timeout: Duration,
    /// Most recent templates submitted per verification
    pub template_cap: usize,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            timeout: Duration::from_secs(12),
            template_cap: DEFAULT_TEMPLATE_CAP,
        }
    }
}

/// Face manager
#[derive(Clone)]
pub struct FaceManager {
    scorer: Arc<dyn FaceScorer>,
    templates: Arc<dyn FaceTemplateRepository>,
    config: FaceConfig,
}

impl FaceManager {
    /// Create a new face manager
    ///
    /// # Arguments
    ///
    /// * `scorer` - Scoring service client
    /// * `templates` - Template storage
    /// * `config` - Threshold, timeout and template cap
    pub fn new(
        scorer: Arc<dyn FaceScorer>,
        templates: Arc<dyn FaceTemplateRepository>,
        config: FaceConfig,
    ) -> Self {
        Self {
            scorer,
            templates,
            config,
        }
    }

    pub fn config(&self) -> &FaceConfig {
        &self.config
    }

    /// Enroll a new template for a user
    ///
    /// Every successful call adds a template; earlier templates stay eligible.
    ///
    /// # Errors
    ///
    /// * `FaceError::Rejected` - Service refused the image (message passed through)
    /// * `FaceError::Unavailable` - Service unreachable or timed out
    pub async fn enroll(&self, user_id: UserId, image: &FaceImage) -> FaceResult<Enrollment> {
        let embedding = self.bounded("embed", self.scorer.embed(image)).await?;

        let template = self
            .templates
            .insert_template(user_id, &embedding.bytes, &embedding.model_id)
            .await?;

        log::info!(
            "Enrolled face template {} for user {} ({})",
            template.id,
            user_id,
            template.model_id
        );

        Ok(Enrollment {
            record_id: template.id,
            model_id: template.model_id,
        })
    }

    /// Enrollment status for a user
    pub async fn status(&self, user_id: UserId) -> FaceResult<FaceStatus> {
        let count = self.templates.count_templates(user_id).await?;
        Ok(FaceStatus {
            enrolled: count > 0,
            count,
        })
    }

    /// Verify a capture against the user's most recent templates
    ///
    /// # Errors
    ///
    /// * `FaceError::NotEnrolled` - User has no templates; the service is not called
    /// * `FaceError::Rejected` - Service refused the image
    /// * `FaceError::Unavailable` - Service unreachable or timed out
    pub async fn verify(&self, user_id: UserId, image: &FaceImage) -> FaceResult<VerifyOutcome> {
        let templates = self
            .templates
            .recent_templates(user_id, self.config.template_cap)
            .await?;

        if templates.is_empty() {
            return Err(FaceError::NotEnrolled(user_id));
        }

        let outcome = self
            .bounded(
                "verify",
                self.scorer.verify(image, &templates, self.config.threshold),
            )
            .await?;

        log::debug!(
            "Face verify for user {}: match={} best_distance={:.4} candidates={}",
            user_id,
            outcome.is_match,
            outcome.best_distance,
            templates.len()
        );

        Ok(outcome)
    }

    /// Check that the scoring service answers
    pub async fn health(&self) -> FaceResult<()> {
        self.bounded("health", self.scorer.health()).await
    }

    /// Run a scoring call under the configured timeout; an expired call is
    /// reported as unavailable and dropped, never retried.
    async fn bounded<T, F>(&self, operation: &str, call: F) -> FaceResult<T>
    where
        F: Future<Output = FaceResult<T>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FaceError::Unavailable(format!(
                "{operation} timed out after {:?}",
                self.config.timeout
            ))),
        };

        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Err(e) if e.is_unavailable() => {
                log::warn!("Face service {operation} failed after {elapsed_ms}ms: {e}")
            }
            _ => log::debug!("Face service {operation} completed in {elapsed_ms}ms"),
        }

        result
    }
}
