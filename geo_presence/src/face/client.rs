//! Client for the remote face scoring service.
//!
//! The service exposes `POST /embed`, `POST /verify` and `GET /health`. The
//! client performs no retries; every failure is classified once and handed
//! back to the caller.

use super::{
    errors::{FaceError, FaceResult},
    models::{Embedding, FaceImage, FaceTemplate, VerifyOutcome},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Narrow RPC boundary to a face scoring backend
#[async_trait]
pub trait FaceScorer: Send + Sync {
    /// Compute the embedding of the dominant face in `image`
    async fn embed(&self, image: &FaceImage) -> FaceResult<Embedding>;

    /// Compare `image` against candidate templates
    async fn verify(
        &self,
        image: &FaceImage,
        templates: &[FaceTemplate],
        threshold: f64,
    ) -> FaceResult<VerifyOutcome>;

    /// Check that the backend is reachable
    async fn health(&self) -> FaceResult<()>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    image_base64: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    model: String,
    embedding_b64: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    image_base64: &'a str,
    templates_b64: Vec<String>,
    threshold: f64,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(rename = "match")]
    is_match: bool,
    best_distance: f64,
    threshold: Option<f64>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP implementation of [`FaceScorer`]
#[derive(Clone)]
pub struct HttpFaceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFaceClient {
    /// Create a client for the service at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://127.0.0.1:8001`
    /// * `timeout` - Bound on every request, connection included
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FaceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FaceError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> FaceResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(send_error)?;

        read_json(response).await
    }
}

#[async_trait]
impl FaceScorer for HttpFaceClient {
    async fn embed(&self, image: &FaceImage) -> FaceResult<Embedding> {
        let response: EmbedResponse = self
            .post_json(
                "/embed",
                &EmbedRequest {
                    image_base64: image.as_base64(),
                },
            )
            .await?;

        let bytes = STANDARD
            .decode(response.embedding_b64.trim())
            .map_err(|e| FaceError::InvalidResponse(format!("embedding is not base64: {e}")))?;

        if bytes.is_empty() {
            return Err(FaceError::InvalidResponse("empty embedding".to_string()));
        }

        Ok(Embedding {
            bytes,
            model_id: response.model,
        })
    }

    async fn verify(
        &self,
        image: &FaceImage,
        templates: &[FaceTemplate],
        threshold: f64,
    ) -> FaceResult<VerifyOutcome> {
        let request = VerifyRequest {
            image_base64: image.as_base64(),
            templates_b64: templates.iter().map(FaceTemplate::embedding_base64).collect(),
            threshold,
        };

        let response: VerifyResponse = self.post_json("/verify", &request).await?;

        Ok(VerifyOutcome {
            is_match: response.is_match,
            best_distance: response.best_distance,
            threshold: response.threshold.unwrap_or(threshold),
            model_id: response.model,
        })
    }

    async fn health(&self) -> FaceResult<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(FaceError::Unavailable(format!(
                "health check returned {}",
                response.status()
            )))
        }
    }
}

/// Any failure to get a response at all is an infrastructure failure.
fn send_error(e: reqwest::Error) -> FaceError {
    if e.is_timeout() {
        FaceError::Unavailable(format!("request timed out: {e}"))
    } else {
        FaceError::Unavailable(e.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> FaceResult<T> {
    let status = response.status();

    if status.is_success() {
        return response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                FaceError::Unavailable(format!("request timed out: {e}"))
            } else {
                FaceError::InvalidResponse(e.to_string())
            }
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_detail(&body).unwrap_or_else(|| format!("face service returned {status}"));

    Err(classify_status(status, message))
}

/// 400/422 are answers about the submitted image; every other failure status
/// means the service or its configuration is broken.
fn classify_status(status: StatusCode, message: String) -> FaceError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => FaceError::Rejected(message),
        _ => FaceError::Unavailable(message),
    }
}

fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        assert_eq!(
            error_detail(r#"{"detail": "no face detected"}"#),
            Some("no face detected".to_string())
        );
    }

    #[test]
    fn test_error_detail_structured() {
        let detail = error_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#);
        assert!(detail.unwrap().contains("field required"));
    }

    #[test]
    fn test_error_detail_missing() {
        assert_eq!(error_detail("Internal Server Error"), None);
        assert_eq!(error_detail(r#"{"detail": null}"#), None);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "no face detected".into()),
            FaceError::Rejected(m) if m == "no face detected"
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "bad body".into()),
            FaceError::Rejected(_)
        ));
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()).is_unavailable());
        assert!(classify_status(StatusCode::NOT_FOUND, "Not Found".into()).is_unavailable());
        assert!(classify_status(StatusCode::BAD_GATEWAY, "down".into()).is_unavailable());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpFaceClient::new("http://localhost:8001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001");
    }
}
