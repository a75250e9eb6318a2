//! Remote inference service extractor.
//!
//! Posts the frame as PNG to an HTTP endpoint and reads back a JSON body:
//!
//! ```json
//! { "face_detected": true, "embedding": [0.12, -0.03, ...] }
//! ```
//!
//! A `422 Unprocessable Entity` status or `"face_detected": false` means no
//! face. Requests are never retried: the model is deterministic, so the same
//! bytes would fail the same way.

use std::io::Cursor;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EmbeddingExtractor, EmbeddingVector};
use crate::error::{FaceguardError, Result};

/// Configuration for the remote inference client.
#[derive(Debug, Clone)]
pub struct RemoteExtractorConfig {
    /// Endpoint accepting `image/png` bodies.
    pub url: String,
    /// Model identifier served by the endpoint (e.g. "Facenet512").
    pub model_name: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl RemoteExtractorConfig {
    pub fn new(url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model_name: model_name.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default = "default_true")]
    face_detected: bool,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

fn default_true() -> bool {
    true
}

pub struct RemoteExtractor {
    client: Client,
    config: RemoteExtractorConfig,
}

impl RemoteExtractor {
    pub fn new(config: RemoteExtractorConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(FaceguardError::InvalidConfig(
                "remote extractor URL must not be empty".into(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                FaceguardError::ExtractorError(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| FaceguardError::ExtractorError(format!("Failed to encode frame: {e}")))?;
        Ok(buffer.into_inner())
    }
}

impl std::fmt::Debug for RemoteExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExtractor")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl EmbeddingExtractor for RemoteExtractor {
    async fn extract(&self, image: &DynamicImage) -> Result<EmbeddingVector> {
        let body = Self::encode_png(image)?;
        let start = Instant::now();

        let response = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Inference request failed");
                FaceguardError::ExtractorError(format!("inference request failed: {e}"))
            })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(status = %status, latency_ms, "Received inference response");

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(FaceguardError::no_face("inference service found no face"));
        }
        if !status.is_success() {
            return Err(FaceguardError::ExtractorError(format!(
                "inference service returned status: {status}"
            )));
        }

        let parsed: InferenceResponse = response.json().await.map_err(|e| {
            FaceguardError::ExtractorError(format!("Failed to parse inference response: {e}"))
        })?;

        match (parsed.face_detected, parsed.embedding) {
            (true, Some(values)) => EmbeddingVector::new(values),
            _ => Err(FaceguardError::no_face("inference service found no face")),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_rejected() {
        let config = RemoteExtractorConfig::new("", "Facenet512");
        assert!(matches!(
            RemoteExtractor::new(config),
            Err(FaceguardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_model_name_reported() {
        let config = RemoteExtractorConfig::new("http://127.0.0.1:9/represent", "Facenet512");
        let extractor = RemoteExtractor::new(config).unwrap();
        assert_eq!(extractor.model_name(), "Facenet512");
    }

    #[test]
    fn test_response_parsing_defaults() {
        let parsed: InferenceResponse = serde_json::from_str(r#"{"embedding":[1.0,2.0]}"#).unwrap();
        assert!(parsed.face_detected);
        assert_eq!(parsed.embedding.unwrap(), vec![1.0, 2.0]);

        let none: InferenceResponse = serde_json::from_str(r#"{"face_detected":false}"#).unwrap();
        assert!(!none.face_detected);
        assert!(none.embedding.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_extractor_error() {
        let mut config = RemoteExtractorConfig::new("http://127.0.0.1:9/represent", "Facenet512");
        config.timeout = Duration::from_millis(500);
        let extractor = RemoteExtractor::new(config).unwrap();
        let frame = DynamicImage::new_rgb8(4, 4);
        assert!(matches!(
            extractor.extract(&frame).await,
            Err(FaceguardError::ExtractorError(_))
        ));
    }
}
