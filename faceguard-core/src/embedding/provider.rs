//! Extractor selection from configuration.

use std::sync::Arc;

use super::{EmbeddingExtractor, ThumbnailExtractor};
#[cfg(feature = "network")]
use super::{RemoteExtractor, RemoteExtractorConfig};
use crate::error::{FaceguardError, Result};

/// Which extractor backs the pipeline.
#[derive(Debug, Clone)]
pub enum ExtractorConfig {
    /// Local thumbnail baseline with the given side length.
    Thumbnail { side: u32 },

    /// Remote inference service.
    #[cfg(feature = "network")]
    Remote(RemoteExtractorConfig),
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::Thumbnail {
            side: super::thumbnail::DEFAULT_THUMBNAIL_SIDE,
        }
    }
}

impl ExtractorConfig {
    /// Read `FACEGUARD_EXTRACTOR` and its companion variables.
    ///
    /// - `thumbnail` (default): optional `FACEGUARD_THUMBNAIL_SIDE`
    /// - `remote`: requires `FACEGUARD_EXTRACTOR_URL`, optional `FACEGUARD_EMBEDDING_MODEL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = lookup("FACEGUARD_EXTRACTOR").unwrap_or_else(|| "thumbnail".into());

        match kind.to_lowercase().as_str() {
            "thumbnail" => {
                let side = lookup("FACEGUARD_THUMBNAIL_SIDE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(super::thumbnail::DEFAULT_THUMBNAIL_SIDE);
                Ok(Self::Thumbnail { side })
            }
            #[cfg(feature = "network")]
            "remote" => {
                let url = lookup("FACEGUARD_EXTRACTOR_URL").ok_or_else(|| {
                    FaceguardError::InvalidConfig(
                        "FACEGUARD_EXTRACTOR_URL must be set for the remote extractor".into(),
                    )
                })?;
                let model =
                    lookup("FACEGUARD_EMBEDDING_MODEL").unwrap_or_else(|| "Facenet512".into());
                Ok(Self::Remote(RemoteExtractorConfig::new(url, model)))
            }
            other => Err(FaceguardError::InvalidConfig(format!(
                "unknown extractor '{other}'"
            ))),
        }
    }
}

pub struct ExtractorFactory;

impl ExtractorFactory {
    pub fn create(config: ExtractorConfig) -> Result<Arc<dyn EmbeddingExtractor>> {
        match config {
            ExtractorConfig::Thumbnail { side } => Ok(Arc::new(ThumbnailExtractor::new(side))),
            #[cfg(feature = "network")]
            ExtractorConfig::Remote(remote) => {
                tracing::info!(url = %remote.url, model = %remote.model_name, "Using remote extractor");
                Ok(Arc::new(RemoteExtractor::new(remote)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_thumbnail() {
        let extractor = ExtractorFactory::create(ExtractorConfig::default()).unwrap();
        assert_eq!(extractor.model_name(), "thumbnail-16");
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_remote_from_config() {
        let config = ExtractorConfig::Remote(RemoteExtractorConfig::new(
            "http://127.0.0.1:8500/represent",
            "Facenet512",
        ));
        let extractor = ExtractorFactory::create(config).unwrap();
        assert_eq!(extractor.model_name(), "Facenet512");
    }
}
