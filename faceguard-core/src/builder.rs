//! Offline gallery construction.
//!
//! The corpus is a directory of label directories:
//!
//! ```text
//! dataset/
//!   alice/   a1.jpg a2.png
//!   bob/     b1.jpeg
//!   others/  crowd1.jpg      <- background class, never granted
//! ```
//!
//! Every image is embedded with the configured extractor. A bad image is
//! recorded as a failure and skipped; it never aborts the build.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::{extract_from_bytes, DistanceMetric, EmbeddingExtractor};
use crate::error::{FaceguardError, Result};
use crate::index::{IdentityIndex, IdentityRecord, IdentitySnapshot, IndexProfile, IndexStore};

/// Image file extensions picked up from the corpus (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Where a corpus image's bytes come from.
#[derive(Debug, Clone)]
pub enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// One labelled image of the corpus.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub label: String,
    /// Filename or provenance tag.
    pub source: String,
    pub origin: EntrySource,
}

impl CorpusEntry {
    pub fn from_bytes(label: impl Into<String>, source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            origin: EntrySource::Bytes(bytes),
        }
    }

    fn read(&self) -> Result<Vec<u8>> {
        match &self.origin {
            EntrySource::File(path) => Ok(fs::read(path)?),
            EntrySource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Check a path against [`IMAGE_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A labelled directory tree, enumerated in a stable (sorted) order.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    entries: Vec<CorpusEntry>,
}

impl DirectoryCorpus {
    pub fn scan(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FaceguardError::InvalidConfig(format!(
                "dataset directory '{}' not found",
                root.display()
            )));
        }

        let mut entries = Vec::new();
        for label_dir in sorted_children(&root)? {
            if !label_dir.is_dir() {
                continue;
            }
            let Some(label) = label_dir.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %label_dir.display(), "Skipping non UTF-8 label directory");
                continue;
            };

            for image_path in sorted_children(&label_dir)? {
                if !image_path.is_file() || !is_supported_image(&image_path) {
                    continue;
                }
                let Some(source) = image_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                entries.push(CorpusEntry {
                    label: label.to_string(),
                    source: source.to_string(),
                    origin: EntrySource::File(image_path.clone()),
                });
            }
        }

        debug!(root = %root.display(), images = entries.len(), "Scanned corpus");
        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for DirectoryCorpus {
    type Item = CorpusEntry;
    type IntoIter = std::vec::IntoIter<CorpusEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

/// An image that could not be embedded.
#[derive(Debug, Clone, Serialize)]
pub struct BuildFailure {
    pub label: String,
    pub source: String,
    pub reason: String,
}

/// Outcome of a build.
#[derive(Debug)]
pub struct BuildReport {
    pub snapshot: IdentitySnapshot,
    pub processed: usize,
    pub failed: usize,
    pub failures: Vec<BuildFailure>,
    /// Records added per label.
    pub per_label: BTreeMap<String, usize>,
}

/// Builds identity snapshots from a labelled corpus.
pub struct DatabaseBuilder {
    extractor: Arc<dyn EmbeddingExtractor>,
    collection: String,
    distance_metric: DistanceMetric,
    threshold: f32,
}

impl DatabaseBuilder {
    pub fn new(
        extractor: Arc<dyn EmbeddingExtractor>,
        collection: impl Into<String>,
        distance_metric: DistanceMetric,
        threshold: f32,
    ) -> Self {
        Self {
            extractor,
            collection: collection.into(),
            distance_metric,
            threshold,
        }
    }

    pub fn profile(&self) -> IndexProfile {
        IndexProfile {
            embedding_model: self.extractor.model_name().to_string(),
            distance_metric: self.distance_metric,
            threshold: self.threshold,
        }
    }

    /// Embed every entry and assemble a new snapshot.
    pub async fn build<I>(&self, corpus: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = CorpusEntry>,
    {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut per_label: BTreeMap<String, usize> = BTreeMap::new();
        let mut dimension: Option<usize> = None;
        let mut current_label: Option<String> = None;

        for entry in corpus {
            if current_label.as_deref() != Some(entry.label.as_str()) {
                info!(label = %entry.label, "Processing label");
                current_label = Some(entry.label.clone());
            }

            let embedded = match entry.read() {
                Ok(bytes) => extract_from_bytes(self.extractor.as_ref(), &bytes).await,
                Err(e) => Err(e),
            };

            let embedding = match embedded {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(label = %entry.label, source = %entry.source, error = %e, "Skipping image");
                    failures.push(BuildFailure {
                        label: entry.label,
                        source: entry.source,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let expected = *dimension.get_or_insert(embedding.dim());
            if embedding.dim() != expected {
                warn!(
                    label = %entry.label,
                    source = %entry.source,
                    dimension = embedding.dim(),
                    expected,
                    "Skipping image with inconsistent embedding dimension"
                );
                failures.push(BuildFailure {
                    reason: format!(
                        "embedding has {} dimensions, expected {expected}",
                        embedding.dim()
                    ),
                    label: entry.label,
                    source: entry.source,
                });
                continue;
            }

            debug!(label = %entry.label, source = %entry.source, "Added image");
            *per_label.entry(entry.label.clone()).or_default() += 1;
            records.push(IdentityRecord::new(entry.label, entry.source, embedding));
        }

        let processed = records.len();
        let failed = failures.len();
        let snapshot = IdentitySnapshot::build(self.collection.clone(), self.profile(), records)?;

        info!(
            processed,
            failed,
            collection = %self.collection,
            model = %self.extractor.model_name(),
            "Build completed"
        );

        Ok(BuildReport {
            snapshot,
            processed,
            failed,
            failures,
            per_label,
        })
    }

    /// Build, persist over the previous generation, and publish to `index` if given.
    pub async fn rebuild<I>(
        &self,
        corpus: I,
        store: &dyn IndexStore,
        index: Option<&IdentityIndex>,
    ) -> Result<BuildReport>
    where
        I: IntoIterator<Item = CorpusEntry>,
    {
        let report = self.build(corpus).await?;
        store.replace_all(&report.snapshot)?;
        if let Some(index) = index {
            index.publish(report.snapshot.clone());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockExtractor;
    use crate::index::{MemoryIndexStore, DEFAULT_COLLECTION};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(rgb)));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn builder() -> DatabaseBuilder {
        let extractor = MockExtractor::default()
            .with_face([1, 0, 0], vec![0.0, 0.0])
            .with_face([2, 0, 0], vec![1.0, 0.0])
            .with_face([3, 0, 0], vec![9.0, 9.0])
            .with_face([4, 0, 0], vec![1.0, 2.0, 3.0]);
        DatabaseBuilder::new(
            Arc::new(extractor),
            DEFAULT_COLLECTION,
            DistanceMetric::Euclidean,
            22.0,
        )
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.JPEG")));
        assert!(is_supported_image(Path::new("a.Png")));
        assert!(!is_supported_image(Path::new("a.gif")));
        assert!(!is_supported_image(Path::new("README")));
    }

    #[tokio::test]
    async fn test_build_skips_failures_and_keeps_duplicates() {
        let corpus = vec![
            CorpusEntry::from_bytes("alice", "a1.png", solid_png([1, 0, 0])),
            CorpusEntry::from_bytes("alice", "a2.png", solid_png([2, 0, 0])),
            CorpusEntry::from_bytes("alice", "broken.png", b"not an image".to_vec()),
            CorpusEntry::from_bytes("others", "crowd.png", solid_png([3, 0, 0])),
            CorpusEntry::from_bytes("bob", "noface.png", solid_png([200, 200, 200])),
        ];

        let report = builder().build(corpus).await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.per_label.get("alice"), Some(&2));
        assert_eq!(report.per_label.get("others"), Some(&1));
        assert_eq!(report.per_label.get("bob"), None);
        assert_eq!(report.snapshot.len(), 3);
        assert_eq!(report.snapshot.metadata().profile.embedding_model, "mock");
        assert_eq!(report.snapshot.metadata().dimension, Some(2));

        let failed_sources: Vec<_> = report.failures.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(failed_sources, vec!["broken.png", "noface.png"]);
    }

    #[tokio::test]
    async fn test_build_rejects_inconsistent_dimension_per_image() {
        let corpus = vec![
            CorpusEntry::from_bytes("alice", "a1.png", solid_png([1, 0, 0])),
            CorpusEntry::from_bytes("bob", "b1.png", solid_png([4, 0, 0])),
        ];
        let report = builder().build(corpus).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert!(report.failures[0].reason.contains("dimensions"));
    }

    #[tokio::test]
    async fn test_rebuild_persists_and_publishes() {
        let store = MemoryIndexStore::new();
        let index = IdentityIndex::unloaded();
        let corpus = vec![CorpusEntry::from_bytes("alice", "a1.png", solid_png([1, 0, 0]))];

        let report = builder()
            .rebuild(corpus, &store, Some(&index))
            .await
            .unwrap();

        let stored = store.load(DEFAULT_COLLECTION).unwrap().unwrap();
        assert_eq!(stored.metadata().generation, report.snapshot.metadata().generation);
        assert_eq!(
            index.snapshot().unwrap().metadata().generation,
            report.snapshot.metadata().generation
        );
    }

    #[test]
    fn test_scan_directory_corpus() {
        let tmp = TempDir::new().unwrap();
        let alice = tmp.path().join("alice");
        let others = tmp.path().join("others");
        fs::create_dir_all(&alice).unwrap();
        fs::create_dir_all(&others).unwrap();
        fs::write(alice.join("b.jpg"), b"x").unwrap();
        fs::write(alice.join("a.PNG"), b"x").unwrap();
        fs::write(alice.join("notes.txt"), b"x").unwrap();
        fs::write(others.join("c.jpeg"), b"x").unwrap();
        fs::write(tmp.path().join("stray.jpg"), b"x").unwrap();

        let corpus = DirectoryCorpus::scan(tmp.path()).unwrap();
        let listed: Vec<_> = corpus
            .entries()
            .iter()
            .map(|e| format!("{}/{}", e.label, e.source))
            .collect();
        assert_eq!(listed, vec!["alice/a.PNG", "alice/b.jpg", "others/c.jpeg"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(DirectoryCorpus::scan("/definitely/not/here").is_err());
    }
}
