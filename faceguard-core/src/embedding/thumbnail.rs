//! Local baseline extractor.
//!
//! Embeds a z-scored grayscale thumbnail of the whole frame. It needs no
//! model files and is fully deterministic, which makes it useful for
//! development galleries and tests. It does not localise faces: a frame is
//! only rejected when it carries no contrast at all (lens cap, blank frame).
//! Thresholds must be calibrated separately from any real face model.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;

use super::{EmbeddingExtractor, EmbeddingVector};
use crate::error::{FaceguardError, Result};

/// Default thumbnail side length in pixels (256-dimensional embedding).
pub const DEFAULT_THUMBNAIL_SIDE: u32 = 16;

/// Minimum luma standard deviation (0-255 scale) for a frame to count as having content.
const MIN_CONTRAST: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct ThumbnailExtractor {
    side: u32,
    model_name: String,
}

impl ThumbnailExtractor {
    pub fn new(side: u32) -> Self {
        let side = side.max(2);
        Self {
            side,
            model_name: format!("thumbnail-{side}"),
        }
    }

    pub fn dimension(&self) -> usize {
        (self.side * self.side) as usize
    }

    fn embed(&self, image: &DynamicImage) -> Result<EmbeddingVector> {
        let thumb = image
            .resize_exact(self.side, self.side, FilterType::Triangle)
            .to_luma8();
        let pixels: Vec<f32> = thumb.pixels().map(|p| f32::from(p.0[0])).collect();

        let n = pixels.len() as f32;
        let mean = pixels.iter().sum::<f32>() / n;
        let variance = pixels.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let std_dev = variance.sqrt();

        if std_dev < MIN_CONTRAST {
            return Err(FaceguardError::no_face(format!(
                "frame has no usable content (contrast {std_dev:.2})"
            )));
        }

        EmbeddingVector::new(pixels.iter().map(|v| (v - mean) / std_dev).collect())
    }
}

impl Default for ThumbnailExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SIDE)
    }
}

#[async_trait]
impl EmbeddingExtractor for ThumbnailExtractor {
    async fn extract(&self, image: &DynamicImage) -> Result<EmbeddingVector> {
        self.embed(image)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 64])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[tokio::test]
    async fn test_embedding_dimension_and_model_name() {
        let extractor = ThumbnailExtractor::default();
        let embedding = extractor.extract(&gradient(64, 48)).await.unwrap();
        assert_eq!(embedding.dim(), 256);
        assert_eq!(extractor.dimension(), 256);
        assert_eq!(extractor.model_name(), "thumbnail-16");
    }

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let extractor = ThumbnailExtractor::new(8);
        let a = extractor.extract(&gradient(40, 40)).await.unwrap();
        let b = extractor.extract(&gradient(40, 40)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_blank_frame_is_no_face() {
        let extractor = ThumbnailExtractor::default();
        let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([12, 12, 12])));
        assert!(matches!(
            extractor.extract(&blank).await,
            Err(FaceguardError::NoFaceDetected(_))
        ));
    }

    #[test]
    fn test_side_is_clamped() {
        assert_eq!(ThumbnailExtractor::new(0).dimension(), 4);
    }
}
