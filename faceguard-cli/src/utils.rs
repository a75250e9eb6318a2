//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use faceguard_core::{
    DecisionPolicy, FaceguardError, FileIndexStore, IdentitySnapshot, IndexProfile, IndexStore,
    SharedSecret,
};
use tracing::debug;

use crate::IndexArgs;

/// Read an input file, tagging failures so they map to the input exit code.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), size = bytes.len(), "Read input");
    Ok(bytes)
}

/// Resolve the shared secret from `--secret` or `FACEGUARD_SECRET`.
pub fn resolve_secret(secret: Option<String>) -> Result<SharedSecret> {
    let value = secret.ok_or_else(|| {
        FaceguardError::InvalidConfig(
            "a shared secret is required (--secret or FACEGUARD_SECRET)".into(),
        )
    })?;
    Ok(SharedSecret::from_config_value(&value)?)
}

/// Load the persisted generation described by `args`.
pub fn load_snapshot(args: &IndexArgs) -> Result<IdentitySnapshot> {
    let store = FileIndexStore::new(&args.index_dir);
    let snapshot = store
        .load(&args.collection)
        .with_context(|| format!("Failed to open identity index in {}", args.index_dir.display()))?
        .ok_or_else(|| {
            FaceguardError::index_unavailable(format!(
                "no index for collection '{}' in {} (run `faceguard build-index` first)",
                args.collection,
                args.index_dir.display()
            ))
        })?;
    Ok(snapshot)
}

/// Threshold policy from the command line.
pub fn policy(args: &IndexArgs) -> Result<DecisionPolicy> {
    Ok(DecisionPolicy::new(args.threshold)?.with_background_label(args.background_label.clone()))
}

/// Profile an index must carry to be queried with `args` and `model`.
pub fn expected_profile(args: &IndexArgs, model: &str) -> IndexProfile {
    IndexProfile {
        embedding_model: model.to_string(),
        distance_metric: args.metric,
        threshold: args.threshold,
    }
}

/// Format a build timestamp as a human-readable UTC string.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-15 12:30:45 UTC");
    }

    #[test]
    fn test_resolve_secret_requires_value() {
        assert!(resolve_secret(None).is_err());
        assert!(resolve_secret(Some("device-secret".into())).is_ok());
    }

    #[test]
    fn test_read_input_reports_path() {
        let err = read_input(Path::new("/no/such/frame.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file: /no/such/frame.png"));
    }
}
