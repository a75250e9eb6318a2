//! Pipeline configuration from environment variables.

use std::path::PathBuf;

use crate::archive::DEFAULT_ARCHIVE_FOLDER;
use crate::decision::{DecisionPolicy, BACKGROUND_LABEL, DEFAULT_DISTANCE_THRESHOLD};
use crate::embedding::{DistanceMetric, ExtractorConfig};
use crate::error::{FaceguardError, Result};
use crate::index::DEFAULT_COLLECTION;
use crate::signature::SharedSecret;

pub const DEFAULT_INDEX_DIR: &str = "./faceguard-index";
pub const DEFAULT_ARCHIVE_DIR: &str = "./faceguard-archive";

/// Settings shared by the gate server and the offline tools.
///
/// `Debug` output never contains the shared secret.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub secret: SharedSecret,
    pub index_dir: PathBuf,
    pub collection: String,
    pub distance_metric: DistanceMetric,
    pub distance_threshold: f32,
    pub background_label: String,
    pub extractor: ExtractorConfig,
    pub archive_dir: PathBuf,
    pub archive_folder: String,
}

impl PipelineConfig {
    /// Load configuration from `FACEGUARD_*` environment variables.
    ///
    /// `FACEGUARD_SECRET` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = lookup("FACEGUARD_SECRET").ok_or_else(|| {
            FaceguardError::InvalidConfig("FACEGUARD_SECRET must be set".into())
        })?;
        let secret = SharedSecret::from_config_value(&secret)?;

        let distance_metric = match lookup("FACEGUARD_DISTANCE_METRIC") {
            Some(value) => value.parse()?,
            None => DistanceMetric::default(),
        };

        let distance_threshold = match lookup("FACEGUARD_DISTANCE_THRESHOLD") {
            Some(value) => value.trim().parse::<f32>().map_err(|e| {
                FaceguardError::InvalidConfig(format!(
                    "FACEGUARD_DISTANCE_THRESHOLD '{value}' is not a number: {e}"
                ))
            })?,
            None => DEFAULT_DISTANCE_THRESHOLD,
        };

        let config = Self {
            secret,
            index_dir: lookup("FACEGUARD_INDEX_DIR")
                .unwrap_or_else(|| DEFAULT_INDEX_DIR.into())
                .into(),
            collection: lookup("FACEGUARD_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            distance_metric,
            distance_threshold,
            background_label: lookup("FACEGUARD_BACKGROUND_LABEL")
                .unwrap_or_else(|| BACKGROUND_LABEL.into()),
            extractor: ExtractorConfig::from_lookup(&lookup)?,
            archive_dir: lookup("FACEGUARD_ARCHIVE_DIR")
                .unwrap_or_else(|| DEFAULT_ARCHIVE_DIR.into())
                .into(),
            archive_folder: lookup("FACEGUARD_ARCHIVE_FOLDER")
                .unwrap_or_else(|| DEFAULT_ARCHIVE_FOLDER.into()),
        };

        // Fail at startup rather than on the first request.
        config.policy()?;
        Ok(config)
    }

    /// Threshold policy described by this configuration.
    pub fn policy(&self) -> Result<DecisionPolicy> {
        Ok(DecisionPolicy::new(self.distance_threshold)?
            .with_background_label(self.background_label.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[("FACEGUARD_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.collection, "faces");
        assert_eq!(config.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(config.distance_threshold, 22.0);
        assert_eq!(config.background_label, "others");
        assert_eq!(config.archive_folder, "secureesp");
        assert_eq!(config.index_dir, PathBuf::from(DEFAULT_INDEX_DIR));
        assert!(matches!(config.extractor, ExtractorConfig::Thumbnail { side: 16 }));
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[])),
            Err(FaceguardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("FACEGUARD_SECRET", "hex:abcd"),
            ("FACEGUARD_DISTANCE_METRIC", "cosine"),
            ("FACEGUARD_DISTANCE_THRESHOLD", "0.4"),
            ("FACEGUARD_COLLECTION", "lobby"),
            ("FACEGUARD_BACKGROUND_LABEL", "crowd"),
        ]))
        .unwrap();
        assert_eq!(config.distance_metric, DistanceMetric::Cosine);
        assert_eq!(config.distance_threshold, 0.4);
        assert_eq!(config.collection, "lobby");
        assert_eq!(config.policy().unwrap().background_label, "crowd");
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        for bad in ["abc", "0", "-3", "NaN"] {
            let result = PipelineConfig::from_lookup(lookup(&[
                ("FACEGUARD_SECRET", "s3cret"),
                ("FACEGUARD_DISTANCE_THRESHOLD", bad),
            ]));
            assert!(result.is_err(), "threshold {bad} should be rejected");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = PipelineConfig::from_lookup(lookup(&[("FACEGUARD_SECRET", "hunter2")])).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
