//! Index persistence.
//!
//! The file store keeps one CBOR document per collection. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! previous generation, so readers of the file see one complete generation
//! or the other.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tempfile::NamedTempFile;

use super::{IdentitySnapshot, IndexMetadata, Neighbor, MAX_INDEX_BYTES};
use crate::embedding::EmbeddingVector;
use crate::error::{FaceguardError, Result};

/// Durable storage for index generations, keyed by collection name.
pub trait IndexStore: Send + Sync {
    /// Read the stored generation of `collection`, if any.
    fn load(&self, collection: &str) -> Result<Option<IdentitySnapshot>>;

    /// Atomically replace the stored generation of the snapshot's collection.
    fn replace_all(&self, snapshot: &IdentitySnapshot) -> Result<()>;

    fn read_metadata(&self, collection: &str) -> Result<Option<IndexMetadata>> {
        Ok(self.load(collection)?.map(|s| s.metadata().clone()))
    }

    fn query_nearest(
        &self,
        collection: &str,
        target: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        match self.load(collection)? {
            Some(snapshot) => snapshot.query(target, k),
            None => Err(FaceguardError::index_unavailable(format!(
                "collection '{collection}' not found"
            ))),
        }
    }
}

fn validate_collection_name(collection: &str) -> Result<()> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FaceguardError::InvalidConfig(format!(
            "invalid collection name '{collection}'"
        )))
    }
}

/// Filesystem-backed store: `<root>/<collection>.cbor`.
#[derive(Debug, Clone)]
pub struct FileIndexStore {
    root: PathBuf,
}

impl FileIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self.root.join(format!("{collection}.cbor")))
    }
}

impl IndexStore for FileIndexStore {
    fn load(&self, collection: &str) -> Result<Option<IdentitySnapshot>> {
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(None);
        }

        let size = fs::metadata(&path)
            .map_err(|e| {
                FaceguardError::index_unavailable(format!("failed to stat {}: {e}", path.display()))
            })?
            .len();
        if size > MAX_INDEX_BYTES as u64 {
            return Err(FaceguardError::index_unavailable(format!(
                "{} is {size} bytes, limit is {MAX_INDEX_BYTES}",
                path.display()
            )));
        }

        let data = fs::read(&path).map_err(|e| {
            FaceguardError::index_unavailable(format!("failed to read {}: {e}", path.display()))
        })?;
        let snapshot = IdentitySnapshot::from_cbor(&data).map_err(|e| {
            FaceguardError::index_unavailable(format!("{}: {e}", path.display()))
        })?;

        if snapshot.metadata().collection != collection {
            return Err(FaceguardError::index_unavailable(format!(
                "{} holds collection '{}'",
                path.display(),
                snapshot.metadata().collection
            )));
        }

        tracing::debug!(
            path = %path.display(),
            records = snapshot.len(),
            generation = %snapshot.metadata().generation,
            "Loaded identity index"
        );
        Ok(Some(snapshot))
    }

    fn replace_all(&self, snapshot: &IdentitySnapshot) -> Result<()> {
        let path = self.collection_path(&snapshot.metadata().collection)?;
        fs::create_dir_all(&self.root)?;

        let bytes = snapshot.to_cbor()?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| FaceguardError::Io(e.error))?;

        tracing::info!(
            path = %path.display(),
            records = snapshot.len(),
            generation = %snapshot.metadata().generation,
            "Stored identity index"
        );
        Ok(())
    }
}

/// In-memory store (tests and ephemeral deployments).
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    collections: DashMap<String, IdentitySnapshot>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self, collection: &str) -> Result<Option<IdentitySnapshot>> {
        validate_collection_name(collection)?;
        Ok(self.collections.get(collection).map(|s| s.value().clone()))
    }

    fn replace_all(&self, snapshot: &IdentitySnapshot) -> Result<()> {
        let collection = snapshot.metadata().collection.clone();
        validate_collection_name(&collection)?;
        self.collections.insert(collection, snapshot.clone());
        Ok(())
    }
}
