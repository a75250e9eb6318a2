//! Mock extractor for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use image::DynamicImage;

use super::{EmbeddingExtractor, EmbeddingVector};
use crate::error::{FaceguardError, Result};

/// Deterministic extractor keyed by the colour of the top-left pixel.
///
/// Tests encode "who is in the frame" as a solid colour and register the
/// embedding that colour should produce. Unregistered colours behave like
/// frames without a face.
/// WARNING: Do not use in production.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    faces: HashMap<[u8; 3], Vec<f32>>,
    model_name: String,
}

impl MockExtractor {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            faces: HashMap::new(),
            model_name: model_name.into(),
        }
    }

    /// Register the embedding returned for frames whose top-left pixel is `rgb`.
    pub fn with_face(mut self, rgb: [u8; 3], embedding: Vec<f32>) -> Self {
        self.faces.insert(rgb, embedding);
        self
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl EmbeddingExtractor for MockExtractor {
    async fn extract(&self, image: &DynamicImage) -> Result<EmbeddingVector> {
        let rgb = image.to_rgb8();
        let key = match rgb.pixels().next() {
            Some(pixel) => pixel.0,
            None => return Err(FaceguardError::no_face("empty frame")),
        };

        match self.faces.get(&key) {
            Some(values) => EmbeddingVector::new(values.clone()),
            None => Err(FaceguardError::no_face(format!(
                "no face registered for colour {key:?}"
            ))),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(rgb)))
    }

    #[tokio::test]
    async fn test_registered_colour_returns_embedding() {
        let extractor = MockExtractor::default().with_face([10, 0, 0], vec![1.0, 2.0]);
        let embedding = extractor.extract(&solid([10, 0, 0])).await.unwrap();
        assert_eq!(embedding.as_slice(), &[1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_unregistered_colour_is_no_face() {
        let extractor = MockExtractor::default();
        assert!(matches!(
            extractor.extract(&solid([1, 2, 3])).await,
            Err(FaceguardError::NoFaceDetected(_))
        ));
    }
}
