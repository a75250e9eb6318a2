//! Faceguard Core - authenticated face-gate decisions
//!
//! This crate implements the pipeline behind a camera-operated door gate:
//! frames arrive signed by the capture device, are authenticated, embedded,
//! matched against a gallery of known identities and archived with their
//! verdict.
//!
//! # Features
//!
//! - HMAC-SHA256 submission signatures with constant-time comparison
//! - Pluggable embedding extractors (local thumbnail baseline, remote inference)
//! - Nearest-neighbour identity index with atomic generation swaps
//! - CBOR index persistence guarded by model/metric/threshold metadata
//! - Verdict-encoding archive identifiers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use faceguard_core::{
//!     AccessDecider, DecisionPolicy, DistanceMetric, FileIndexStore, IdentityIndex,
//!     IndexStore, SharedSecret, SignatureVerifier, Submission, ThumbnailExtractor,
//! };
//!
//! # async fn example(frame: Vec<u8>, signature: String) -> faceguard_core::Result<()> {
//! let store = FileIndexStore::new("./faceguard-index");
//! let index = Arc::new(IdentityIndex::unloaded());
//! index.reload_from(&store, "faces")?;
//!
//! let decider = AccessDecider::new(
//!     SignatureVerifier::new(SharedSecret::new(b"device-secret".to_vec())?),
//!     Arc::new(ThumbnailExtractor::new(16)),
//!     index,
//!     DecisionPolicy::default(),
//!     DistanceMetric::Euclidean,
//! );
//!
//! let decision = decider.decide(&Submission::new(frame, signature)).await?;
//! println!("{} {}", decision.verdict.status, decision.verdict.identity);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod builder;
pub mod config;
pub mod decision;
pub mod embedding;
pub mod error;
pub mod index;
pub mod signature;

// Re-export main types for convenience
pub use archive::{
    Archive, ArchiveEntry, ArchiveName, ArchiveNamer, ArchiveQuery, ArchiveReceipt,
    FilesystemArchive, MemoryArchive, DEFAULT_ARCHIVE_FOLDER,
};
pub use builder::{BuildFailure, BuildReport, CorpusEntry, DatabaseBuilder, DirectoryCorpus};
pub use config::PipelineConfig;
pub use decision::{
    AccessDecider, AccessStatus, Decision, DecisionPolicy, DecisionReason, IdentityLabel,
    Submission, Verdict, BACKGROUND_LABEL, DEFAULT_DISTANCE_THRESHOLD,
};
pub use embedding::{
    DistanceMetric, EmbeddingExtractor, EmbeddingVector, ExtractorConfig, ExtractorFactory,
    MockExtractor, ThumbnailExtractor,
};
#[cfg(feature = "network")]
pub use embedding::{RemoteExtractor, RemoteExtractorConfig};
pub use error::{FaceguardError, Result, SIGNATURE_PREFIX_LEN};
pub use index::{
    FileIndexStore, IdentityIndex, IdentityRecord, IdentitySnapshot, IndexMetadata, IndexProfile,
    IndexStore, MemoryIndexStore, Neighbor, DEFAULT_COLLECTION, MAX_INDEX_BYTES,
};
pub use signature::{SharedSecret, SignatureVerifier};
