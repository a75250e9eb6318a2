//! Face embedding extraction.
//!
//! The gate treats the embedding model as an opaque function from a decoded
//! image to a fixed-length vector. A frame without a usable face is an
//! ordinary outcome (`NoFaceDetected`), never a panic.
//!
//! ## Extractors
//!
//! - **RemoteExtractor** - JSON over HTTP to an inference service (feature `network`)
//! - **ThumbnailExtractor** - local grayscale-thumbnail baseline, no model required
//! - **MockExtractor** - deterministic lookup table for tests

mod mock;
mod provider;
#[cfg(feature = "network")]
mod remote;
mod thumbnail;

pub use mock::MockExtractor;
pub use provider::{ExtractorConfig, ExtractorFactory};
#[cfg(feature = "network")]
pub use remote::{RemoteExtractor, RemoteExtractorConfig};
pub use thumbnail::ThumbnailExtractor;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{FaceguardError, Result};

/// Fixed-dimension feature vector produced for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wrap raw values, rejecting empty or non-finite vectors.
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(FaceguardError::ExtractorError(
                "embedding must not be empty".into(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FaceguardError::ExtractorError(
                "embedding contains non-finite values".into(),
            ));
        }
        Ok(Self(values))
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Distance function over the embedding space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// `1 - cosine similarity`, in `[0, 2]`.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    ///
    /// Accumulates in `f64` so that large finite components cannot overflow
    /// into an infinite or NaN distance.
    pub fn distance(&self, lhs: &[f32], rhs: &[f32]) -> f32 {
        let pairs = lhs.iter().zip(rhs).map(|(l, r)| (f64::from(*l), f64::from(*r)));
        let distance = match self {
            Self::Euclidean => pairs.map(|(l, r)| (l - r) * (l - r)).sum::<f64>().sqrt(),
            Self::Cosine => {
                let mut dot = 0.0f64;
                let mut norm_lhs = 0.0f64;
                let mut norm_rhs = 0.0f64;
                for (l, r) in pairs {
                    dot += l * r;
                    norm_lhs += l * l;
                    norm_rhs += r * r;
                }
                let denom = norm_lhs.sqrt() * norm_rhs.sqrt();
                if denom == 0.0 {
                    1.0
                } else {
                    (1.0 - dot / denom).clamp(0.0, 2.0)
                }
            }
        };
        distance as f32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = FaceguardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            other => Err(FaceguardError::InvalidConfig(format!(
                "unknown distance metric '{other}' (expected euclidean or cosine)"
            ))),
        }
    }
}

/// Opaque image -> embedding function.
///
/// Implementations must be thread-safe (`Send + Sync`) and deterministic for
/// a given model and image. They must not retry internally and must not
/// reject low-confidence detections; acceptance is the decider's job.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    /// Embed the most prominent face in `image`.
    ///
    /// Fails with `NoFaceDetected` when no usable face region is found.
    async fn extract(&self, image: &DynamicImage) -> Result<EmbeddingVector>;

    /// Model identifier, persisted in the index metadata.
    fn model_name(&self) -> &str;
}

/// Decode raw bytes into an image. Undecodable data counts as no face.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| FaceguardError::no_face(format!("failed to decode image: {e}")))
}

/// Decode `bytes` and run `extractor` on the result.
pub async fn extract_from_bytes(
    extractor: &dyn EmbeddingExtractor,
    bytes: &[u8],
) -> Result<EmbeddingVector> {
    let image = decode_image(bytes)?;
    extractor.extract(&image).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_large_components_stay_finite() {
        let opposite = DistanceMetric::Cosine.distance(&[1e30, 0.0], &[-1e30, 0.0]);
        assert!((opposite - 2.0).abs() < 1e-6);

        let same = DistanceMetric::Cosine.distance(&[3e38, 3e38], &[3e38, 3e38]);
        assert!(same.abs() < 1e-6);

        let far = DistanceMetric::Euclidean.distance(&[1e30, 0.0], &[-1e30, 0.0]);
        assert!(far.is_finite());
        assert!((far - 2e30).abs() / 2e30 < 1e-6);
    }

    #[test]
    fn test_cosine_distance() {
        let same = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]);
        assert!(same.abs() < 1e-6);

        let orthogonal = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((orthogonal - 1.0).abs() < 1e-6);

        let zero = DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(zero, 1.0);
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!(
            "Euclidean".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Euclidean
        );
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::Cosine.to_string(), "cosine");
    }

    #[test]
    fn test_embedding_rejects_invalid_values() {
        assert!(EmbeddingVector::new(vec![]).is_err());
        assert!(EmbeddingVector::new(vec![1.0, f32::NAN]).is_err());
        assert!(EmbeddingVector::new(vec![1.0, f32::INFINITY]).is_err());
        assert_eq!(EmbeddingVector::new(vec![1.0, 2.0]).unwrap().dim(), 2);
    }

    #[test]
    fn test_decode_garbage_is_no_face() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(FaceguardError::NoFaceDetected(_))
        ));
    }
}
