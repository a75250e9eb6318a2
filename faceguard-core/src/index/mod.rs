//! Identity index: the gallery of known faces.
//!
//! An [`IdentitySnapshot`] is an immutable generation of records plus the
//! metadata describing how it was built (embedding model, distance metric,
//! decision threshold). [`IdentityIndex`] holds the currently published
//! generation; rebuilds construct a whole new snapshot and swap it in, so a
//! concurrent query sees either the old generation or the new one, never a
//! mix of both.

mod store;

pub use store::{FileIndexStore, IndexStore, MemoryIndexStore};

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::{DistanceMetric, EmbeddingVector};
use crate::error::{FaceguardError, Result};

/// Current on-disk index format version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Largest persisted generation accepted when loading (256 MiB).
pub const MAX_INDEX_BYTES: usize = 256 * 1024 * 1024;

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "faces";

/// One embedded gallery image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// `<label>_<filename>`
    pub id: String,
    /// Identity name, or the reserved background label.
    pub label: String,
    pub embedding: EmbeddingVector,
    /// Filename or provenance tag of the source image.
    pub source: String,
}

impl IdentityRecord {
    pub fn new(label: impl Into<String>, source: impl Into<String>, embedding: EmbeddingVector) -> Self {
        let label = label.into();
        let source = source.into();
        Self {
            id: format!("{label}_{source}"),
            label,
            embedding,
            source,
        }
    }
}

/// Settings an index is built for and must be queried with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProfile {
    pub embedding_model: String,
    pub distance_metric: DistanceMetric,
    pub threshold: f32,
}

/// Metadata persisted with every generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub format_version: u32,
    pub collection: String,
    /// Unique id of this build; changes on every rebuild.
    pub generation: Uuid,
    pub built_at: DateTime<Utc>,
    pub profile: IndexProfile,
    /// Embedding dimension shared by all records, `None` for an empty index.
    pub dimension: Option<usize>,
    pub record_count: usize,
}

impl IndexMetadata {
    /// Fail with `IndexUnavailable` unless this index was built for `expected`.
    pub fn ensure_matches(&self, expected: &IndexProfile) -> Result<()> {
        let actual = &self.profile;
        if actual.embedding_model != expected.embedding_model {
            return Err(FaceguardError::index_unavailable(format!(
                "index '{}' was built with model '{}' but the gate runs '{}'",
                self.collection, actual.embedding_model, expected.embedding_model
            )));
        }
        if actual.distance_metric != expected.distance_metric {
            return Err(FaceguardError::index_unavailable(format!(
                "index '{}' uses {} distance but the gate is configured for {}",
                self.collection, actual.distance_metric, expected.distance_metric
            )));
        }
        if actual.threshold != expected.threshold {
            return Err(FaceguardError::index_unavailable(format!(
                "index '{}' was calibrated for threshold {} but the gate is configured with {}",
                self.collection, actual.threshold, expected.threshold
            )));
        }
        Ok(())
    }
}

/// Nearest-neighbour query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub record_id: String,
    pub label: String,
    pub source: String,
    pub distance: f32,
}

/// Immutable generation of the gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    metadata: IndexMetadata,
    records: Vec<IdentityRecord>,
}

impl IdentitySnapshot {
    /// Create a fresh generation from `records`.
    pub fn build(
        collection: impl Into<String>,
        profile: IndexProfile,
        records: Vec<IdentityRecord>,
    ) -> Result<Self> {
        let dimension = check_dimensions(&records)?;
        let metadata = IndexMetadata {
            format_version: INDEX_FORMAT_VERSION,
            collection: collection.into(),
            generation: Uuid::new_v4(),
            built_at: Utc::now(),
            profile,
            dimension,
            record_count: records.len(),
        };
        Ok(Self { metadata, records })
    }

    /// Re-check invariants of a snapshot read from storage.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.format_version != INDEX_FORMAT_VERSION {
            return Err(FaceguardError::index_unavailable(format!(
                "unsupported index format version {} (current: {})",
                self.metadata.format_version, INDEX_FORMAT_VERSION
            )));
        }
        let dimension = check_dimensions(&self.records)
            .map_err(|e| FaceguardError::index_unavailable(e.to_string()))?;
        if dimension != self.metadata.dimension || self.records.len() != self.metadata.record_count
        {
            return Err(FaceguardError::index_unavailable(
                "index metadata does not match its records",
            ));
        }
        Ok(())
    }

    /// Decode and validate a persisted generation of at most [`MAX_INDEX_BYTES`].
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_cbor_with_limit(bytes, MAX_INDEX_BYTES)
    }

    pub fn from_cbor_with_limit(bytes: &[u8], max_bytes: usize) -> Result<Self> {
        if bytes.len() > max_bytes {
            return Err(FaceguardError::index_unavailable(format!(
                "index is {} bytes, limit is {max_bytes}",
                bytes.len()
            )));
        }
        let snapshot: Self = ciborium::from_reader(bytes)
            .map_err(|e| FaceguardError::index_unavailable(format!("corrupt index: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| FaceguardError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn records(&self) -> &[IdentityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Up to `k` records closest to `target`, ascending by distance.
    pub fn query(&self, target: &EmbeddingVector, k: usize) -> Result<Vec<Neighbor>> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dimension) = self.metadata.dimension {
            if dimension != target.dim() {
                return Err(FaceguardError::index_unavailable(format!(
                    "query embedding has {} dimensions, index '{}' holds {}",
                    target.dim(),
                    self.metadata.collection,
                    dimension
                )));
            }
        }

        let metric = self.metadata.profile.distance_metric;
        let mut scored: Vec<(f32, &IdentityRecord)> = self
            .records
            .iter()
            .map(|record| {
                (
                    metric.distance(target.as_slice(), record.embedding.as_slice()),
                    record,
                )
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, record)| Neighbor {
                record_id: record.id.clone(),
                label: record.label.clone(),
                source: record.source.clone(),
                distance,
            })
            .collect())
    }
}

fn check_dimensions(records: &[IdentityRecord]) -> Result<Option<usize>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let dimension = first.embedding.dim();
    if let Some(bad) = records.iter().find(|r| r.embedding.dim() != dimension) {
        return Err(FaceguardError::ExtractorError(format!(
            "record '{}' has {} dimensions, expected {}",
            bad.id,
            bad.embedding.dim(),
            dimension
        )));
    }
    Ok(Some(dimension))
}

/// Holder of the published snapshot.
///
/// Readers clone the `Arc` and release the lock immediately; a rebuild
/// publishes a complete new snapshot with a single pointer swap.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    current: RwLock<Option<Arc<IdentitySnapshot>>>,
}

impl IdentityIndex {
    /// An index with nothing published yet. Queries fail with `IndexUnavailable`.
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: IdentitySnapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// The currently published generation.
    pub fn snapshot(&self) -> Result<Arc<IdentitySnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| FaceguardError::index_unavailable("identity index is not loaded"))
    }

    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the published generation, returning the previous one.
    pub fn publish(&self, snapshot: IdentitySnapshot) -> Option<Arc<IdentitySnapshot>> {
        let generation = snapshot.metadata.generation;
        let records = snapshot.len();
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(snapshot));
        tracing::info!(%generation, records, "Published identity index generation");
        previous
    }

    /// Load `collection` from `store` and publish it if its generation differs.
    ///
    /// Returns `true` when a new generation was published.
    pub fn reload_from(&self, store: &dyn IndexStore, collection: &str) -> Result<bool> {
        let loaded = store
            .load(collection)?
            .ok_or_else(|| {
                FaceguardError::index_unavailable(format!("collection '{collection}' not found"))
            })?;

        let unchanged = self
            .snapshot()
            .map(|current| current.metadata.generation == loaded.metadata.generation)
            .unwrap_or(false);
        if unchanged {
            return Ok(false);
        }

        self.publish(loaded);
        Ok(true)
    }

    /// Convenience wrapper: nearest `k` neighbours in the current generation.
    pub fn query_nearest(&self, target: &EmbeddingVector, k: usize) -> Result<Vec<Neighbor>> {
        self.snapshot()?.query(target, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> IndexProfile {
        IndexProfile {
            embedding_model: "mock".into(),
            distance_metric: DistanceMetric::Euclidean,
            threshold: 22.0,
        }
    }

    fn record(label: &str, source: &str, values: &[f32]) -> IdentityRecord {
        IdentityRecord::new(label, source, EmbeddingVector::new(values.to_vec()).unwrap())
    }

    fn vector(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_query_orders_by_distance() {
        let snapshot = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![
                record("bob", "b1.jpg", &[10.0, 0.0]),
                record("alice", "a1.jpg", &[1.0, 0.0]),
                record("alice", "a2.jpg", &[3.0, 0.0]),
            ],
        )
        .unwrap();

        let hits = snapshot.query(&vector(&[0.0, 0.0]), 3).unwrap();
        let labels: Vec<_> = hits.iter().map(|h| h.source.as_str()).collect();
        assert_eq!(labels, vec!["a1.jpg", "a2.jpg", "b1.jpg"]);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
        assert_eq!(hits[0].record_id, "alice_a1.jpg");

        let nearest = snapshot.query(&vector(&[9.0, 0.0]), 1).unwrap();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].label, "bob");
    }

    #[test]
    fn test_empty_snapshot_returns_no_hits() {
        let snapshot = IdentitySnapshot::build(DEFAULT_COLLECTION, profile(), vec![]).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.metadata().dimension, None);
        assert!(snapshot.query(&vector(&[1.0]), 1).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_cbor_is_rejected_before_decoding() {
        let snapshot = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![record("alice", "a1.jpg", &[1.0, 2.0])],
        )
        .unwrap();
        let bytes = snapshot.to_cbor().unwrap();

        let decoded = IdentitySnapshot::from_cbor_with_limit(&bytes, bytes.len()).unwrap();
        assert_eq!(decoded.len(), 1);

        assert!(matches!(
            IdentitySnapshot::from_cbor_with_limit(&bytes, bytes.len() - 1),
            Err(FaceguardError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let result = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![record("a", "1.jpg", &[1.0, 2.0]), record("b", "2.jpg", &[1.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_query_dimension_mismatch_is_unavailable() {
        let snapshot = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![record("a", "1.jpg", &[1.0, 2.0])],
        )
        .unwrap();
        assert!(matches!(
            snapshot.query(&vector(&[1.0, 2.0, 3.0]), 1),
            Err(FaceguardError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_ensure_matches_detects_each_mismatch() {
        let snapshot = IdentitySnapshot::build(DEFAULT_COLLECTION, profile(), vec![]).unwrap();
        let metadata = snapshot.metadata();
        assert!(metadata.ensure_matches(&profile()).is_ok());

        let mut other_model = profile();
        other_model.embedding_model = "Facenet512".into();
        assert!(metadata.ensure_matches(&other_model).is_err());

        let mut other_metric = profile();
        other_metric.distance_metric = DistanceMetric::Cosine;
        assert!(metadata.ensure_matches(&other_metric).is_err());

        let mut other_threshold = profile();
        other_threshold.threshold = 0.4;
        assert!(metadata.ensure_matches(&other_threshold).is_err());
    }

    #[test]
    fn test_unloaded_index_is_unavailable() {
        let index = IdentityIndex::unloaded();
        assert!(!index.is_loaded());
        assert!(matches!(
            index.query_nearest(&vector(&[1.0]), 1),
            Err(FaceguardError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_publish_swaps_whole_generation() {
        let first = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![record("alice", "a.jpg", &[0.0, 0.0])],
        )
        .unwrap();
        let index = IdentityIndex::with_snapshot(first);
        let held = index.snapshot().unwrap();

        let second = IdentitySnapshot::build(
            DEFAULT_COLLECTION,
            profile(),
            vec![
                record("bob", "b.jpg", &[0.0, 0.0]),
                record("carol", "c.jpg", &[5.0, 5.0]),
            ],
        )
        .unwrap();
        let previous = index.publish(second).unwrap();

        // A reader holding the old generation keeps a consistent view.
        assert_eq!(held.len(), 1);
        assert_eq!(previous.metadata().generation, held.metadata().generation);
        assert_eq!(index.snapshot().unwrap().len(), 2);
        assert_eq!(
            index.query_nearest(&vector(&[0.0, 0.0]), 1).unwrap()[0].label,
            "bob"
        );
    }

    #[test]
    fn test_concurrent_readers_never_see_partial_generation() {
        let index = Arc::new(IdentityIndex::with_snapshot(
            IdentitySnapshot::build(DEFAULT_COLLECTION, profile(), vec![]).unwrap(),
        ));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = index.snapshot().unwrap();
                        assert_eq!(snapshot.len(), snapshot.metadata().record_count);
                        assert!(snapshot.len() == 0 || snapshot.len() == 50);
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            let records = (0..50)
                .map(|i| record("alice", &format!("{i}.jpg"), &[i as f32, 0.0]))
                .collect();
            index.publish(IdentitySnapshot::build(DEFAULT_COLLECTION, profile(), records).unwrap());
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
