//! Audit archive of submitted frames.
//!
//! Every decided frame is stored under an identifier that encodes its
//! verdict, e.g. `granted_alice_3f9a1c0b2e4d`, so listings can be filtered
//! by status without reading content. The identifier carries only a short
//! signature prefix, never the full signature or the secret.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::decision::{AccessStatus, Verdict};
use crate::error::{signature_prefix, FaceguardError, Result};

/// Folder archived frames are written to unless configured otherwise.
pub const DEFAULT_ARCHIVE_FOLDER: &str = "secureesp";

/// Default and maximum number of entries returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

/// Lowercase a label and replace anything outside `[a-z0-9-]` with `-`.
pub fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Fields recovered from an archive identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveName {
    pub status: AccessStatus,
    pub label: String,
    pub signature_prefix: String,
}

/// Derives and parses archive identifiers.
pub struct ArchiveNamer;

impl ArchiveNamer {
    /// `<status>_<label>_<prefix>` for a verdict and the submitted signature.
    pub fn name(verdict: &Verdict, signature_hex: &str) -> String {
        format!(
            "{}_{}_{}",
            verdict.status.as_str(),
            sanitize_label(&verdict.identity.to_string()),
            signature_prefix(signature_hex)
        )
    }

    pub fn parse(identifier: &str) -> Option<ArchiveName> {
        let mut parts = identifier.splitn(3, '_');
        let status = parts.next()?.parse::<AccessStatus>().ok()?;
        let label = parts.next()?;
        let prefix = parts.next()?;

        let label_ok = !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let prefix_ok = prefix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !label_ok || !prefix_ok {
            return None;
        }

        Some(ArchiveName {
            status,
            label: label.to_string(),
            signature_prefix: prefix.to_string(),
        })
    }
}

/// Acknowledgement of a stored frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveReceipt {
    pub identifier: String,
    /// Backend-specific location (path or key).
    pub location: String,
    /// An earlier frame with the same identifier was overwritten.
    pub replaced: bool,
}

/// One archived frame as seen by a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    pub identifier: String,
    pub status: AccessStatus,
    pub label: String,
    pub signature_prefix: String,
    pub stored_at: DateTime<Utc>,
    pub size: u64,
}

/// Listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveQuery {
    pub status: Option<AccessStatus>,
    pub limit: usize,
}

impl Default for ArchiveQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ArchiveQuery {
    /// Clamp `limit` to `1..=MAX_LIST_LIMIT`.
    pub fn new(status: Option<AccessStatus>, limit: Option<usize>) -> Self {
        Self {
            status,
            limit: limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
        }
    }

    fn select(&self, mut entries: Vec<ArchiveEntry>) -> Vec<ArchiveEntry> {
        entries.retain(|e| self.status.map_or(true, |s| s == e.status));
        entries.sort_by(|a, b| {
            b.stored_at
                .cmp(&a.stored_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        entries.truncate(self.limit);
        entries
    }
}

/// Storage collaborator for decided frames.
#[async_trait]
pub trait Archive: Send + Sync {
    async fn store(&self, folder: &str, identifier: &str, bytes: &[u8]) -> Result<ArchiveReceipt>;

    /// Entries of `folder`, newest first.
    async fn list(&self, folder: &str, query: ArchiveQuery) -> Result<Vec<ArchiveEntry>>;
}

fn validate_folder(folder: &str) -> Result<()> {
    let valid = !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FaceguardError::InvalidConfig(format!(
            "invalid archive folder '{folder}'"
        )))
    }
}

fn storage(context: &str, e: impl std::fmt::Display) -> FaceguardError {
    FaceguardError::StorageFailure(format!("{context}: {e}"))
}

/// File extension for the stored frame, from its magic bytes.
fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}

/// Archive rooted at a local directory: `<root>/<folder>/<identifier>.<ext>`.
#[derive(Debug, Clone)]
pub struct FilesystemArchive {
    root: PathBuf,
}

impl FilesystemArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Archive for FilesystemArchive {
    async fn store(&self, folder: &str, identifier: &str, bytes: &[u8]) -> Result<ArchiveReceipt> {
        validate_folder(folder)?;
        if ArchiveNamer::parse(identifier).is_none() {
            return Err(storage("refusing to store", format!("bad identifier '{identifier}'")));
        }

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage("failed to create archive folder", e))?;

        let path = dir.join(format!("{identifier}.{}", extension_for(bytes)));
        let replaced = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage("failed to check archived frame", e))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| storage("failed to write archived frame", e))?;

        debug!(path = %path.display(), size = bytes.len(), "Archived frame");
        Ok(ArchiveReceipt {
            identifier: identifier.to_string(),
            location: path.display().to_string(),
            replaced,
        })
    }

    async fn list(&self, folder: &str, query: ArchiveQuery) -> Result<Vec<ArchiveEntry>> {
        validate_folder(folder)?;
        let dir = self.root.join(folder);
        if !tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| storage("failed to read archive folder", e))?
        {
            return Ok(Vec::new());
        }

        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| storage("failed to read archive folder", e))?;
        let mut entries = Vec::new();
        while let Some(item) = reader
            .next_entry()
            .await
            .map_err(|e| storage("failed to read archive folder", e))?
        {
            let path = item.path();
            let Some(identifier) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(name) = ArchiveNamer::parse(identifier) else {
                continue;
            };
            let metadata = item
                .metadata()
                .await
                .map_err(|e| storage("failed to stat archived frame", e))?;
            if !metadata.is_file() {
                continue;
            }
            let stored_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            entries.push(ArchiveEntry {
                identifier: identifier.to_string(),
                status: name.status,
                label: name.label,
                signature_prefix: name.signature_prefix,
                stored_at,
                size: metadata.len(),
            });
        }

        Ok(query.select(entries))
    }
}

#[derive(Debug, Clone)]
struct StoredFrame {
    bytes: Vec<u8>,
    stored_at: DateTime<Utc>,
    sequence: u64,
}

/// In-memory archive for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    frames: DashMap<(String, String), StoredFrame>,
    sequence: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `store` fail with `StorageFailure`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, folder: &str, identifier: &str) -> Option<Vec<u8>> {
        self.frames
            .get(&(folder.to_string(), identifier.to_string()))
            .map(|f| f.bytes.clone())
    }

    /// Stored identifiers in insertion order.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<(u64, String)> = self
            .frames
            .iter()
            .map(|f| (f.sequence, f.key().1.clone()))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    async fn store(&self, folder: &str, identifier: &str, bytes: &[u8]) -> Result<ArchiveReceipt> {
        validate_folder(folder)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FaceguardError::StorageFailure("archive unavailable".into()));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let previous = self.frames.insert(
            (folder.to_string(), identifier.to_string()),
            StoredFrame {
                bytes: bytes.to_vec(),
                stored_at: Utc::now(),
                sequence,
            },
        );
        Ok(ArchiveReceipt {
            identifier: identifier.to_string(),
            location: format!("memory://{folder}/{identifier}"),
            replaced: previous.is_some(),
        })
    }

    async fn list(&self, folder: &str, query: ArchiveQuery) -> Result<Vec<ArchiveEntry>> {
        validate_folder(folder)?;
        let mut frames: Vec<(u64, ArchiveEntry)> = self
            .frames
            .iter()
            .filter(|f| f.key().0 == folder)
            .filter_map(|f| {
                let name = ArchiveNamer::parse(&f.key().1)?;
                Some((
                    f.sequence,
                    ArchiveEntry {
                        identifier: f.key().1.clone(),
                        status: name.status,
                        label: name.label,
                        signature_prefix: name.signature_prefix,
                        stored_at: f.stored_at,
                        size: f.bytes.len() as u64,
                    },
                ))
            })
            .collect();

        // Timestamps can tie; the insertion sequence breaks ties newest first.
        frames.sort_by(|a, b| b.0.cmp(&a.0));
        let ordered: Vec<ArchiveEntry> = frames.into_iter().map(|(_, e)| e).collect();
        let mut selected: Vec<ArchiveEntry> = ordered
            .into_iter()
            .filter(|e| query.status.map_or(true, |s| s == e.status))
            .collect();
        selected.truncate(query.limit);
        Ok(selected)
    }
}
