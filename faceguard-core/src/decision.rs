//! Access decisions for signed submissions.
//!
//! One submission runs through:
//!
//! ```text
//! RECEIVED -> SIGNATURE_CHECKED -> REJECTED_FORGED                     (Err(ForgedSubmission))
//!                               -> EMBEDDING_EXTRACTED -> NO_FACE      -> VERDICT_ISSUED
//!                                                      -> MATCHED      -> VERDICT_ISSUED
//! ```
//!
//! A forged submission never reaches the index or the archive. Every other
//! cycle yields exactly one [`Verdict`], which is archived together with the
//! original bytes. Archive failures are logged and never alter the verdict.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::{Archive, ArchiveNamer, ArchiveReceipt, DEFAULT_ARCHIVE_FOLDER};
use crate::embedding::{extract_from_bytes, DistanceMetric, EmbeddingExtractor};
use crate::error::{signature_prefix, FaceguardError, Result};
use crate::index::{IdentityIndex, IndexProfile, Neighbor};
use crate::signature::SignatureVerifier;

/// Reserved gallery label for background faces. Never granted.
pub const BACKGROUND_LABEL: &str = "others";

/// Default maximum distance for a match (Euclidean embedding space).
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 22.0;

/// A signed frame as received from a capture device.
#[derive(Debug, Clone)]
pub struct Submission {
    pub raw_bytes: Vec<u8>,
    /// Lowercase hex HMAC-SHA256 of `raw_bytes`.
    pub claimed_signature: String,
}

impl Submission {
    pub fn new(raw_bytes: impl Into<Vec<u8>>, claimed_signature: impl Into<String>) -> Self {
        Self {
            raw_bytes: raw_bytes.into(),
            claimed_signature: claimed_signature.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Granted,
    Denied,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessStatus {
    type Err = FaceguardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            other => Err(FaceguardError::InvalidConfig(format!(
                "unknown access status '{other}'"
            ))),
        }
    }
}

/// Identity attached to a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLabel {
    /// Gallery label of the matched identity.
    Named(String),
    /// The gallery is empty.
    Unknown,
    /// Nearest match too far away, or a background face.
    Intruder,
    NoFace,
    Forged,
}

impl fmt::Display for IdentityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(label) => f.write_str(label),
            Self::Unknown => f.write_str("Unknown"),
            Self::Intruder => f.write_str("Intruder"),
            Self::NoFace => f.write_str("NoFace"),
            Self::Forged => f.write_str("Forged"),
        }
    }
}

impl Serialize for IdentityLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one decision cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: AccessStatus,
    pub identity: IdentityLabel,
    pub signature_prefix: String,
}

impl Verdict {
    pub fn new(status: AccessStatus, identity: IdentityLabel, signature_hex: &str) -> Self {
        Self {
            status,
            identity,
            signature_prefix: signature_prefix(signature_hex),
        }
    }

    /// Verdict recorded for a submission whose signature did not match.
    pub fn forged(signature_hex: &str) -> Self {
        Self::new(AccessStatus::Denied, IdentityLabel::Forged, signature_hex)
    }

    /// Verdict carried by a rejected submission. Only forged signatures have one.
    pub fn from_rejection(error: &FaceguardError) -> Option<Self> {
        match error {
            FaceguardError::ForgedSubmission { signature_prefix } => {
                Some(Self::forged(signature_prefix))
            }
            _ => None,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == AccessStatus::Granted
    }
}

/// Why the policy settled on a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Matched,
    AboveThreshold,
    BackgroundMatch,
    EmptyIndex,
    NoFace,
}

/// Threshold policy applied to the nearest gallery hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    pub threshold: f32,
    pub background_label: String,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISTANCE_THRESHOLD,
            background_label: BACKGROUND_LABEL.to_string(),
        }
    }
}

impl DecisionPolicy {
    pub fn new(threshold: f32) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(FaceguardError::InvalidConfig(format!(
                "distance threshold must be a positive number, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    pub fn with_background_label(mut self, label: impl Into<String>) -> Self {
        self.background_label = label.into();
        self
    }

    /// Granted iff `distance < threshold` and the label is not the background label.
    ///
    /// A non-finite distance is always denied.
    pub fn evaluate(&self, nearest: Option<&Neighbor>) -> (AccessStatus, IdentityLabel, DecisionReason) {
        let Some(hit) = nearest else {
            return (
                AccessStatus::Denied,
                IdentityLabel::Unknown,
                DecisionReason::EmptyIndex,
            );
        };

        if !hit.distance.is_finite() || hit.distance >= self.threshold {
            (
                AccessStatus::Denied,
                IdentityLabel::Intruder,
                DecisionReason::AboveThreshold,
            )
        } else if hit.label == self.background_label {
            (
                AccessStatus::Denied,
                IdentityLabel::Intruder,
                DecisionReason::BackgroundMatch,
            )
        } else {
            (
                AccessStatus::Granted,
                IdentityLabel::Named(hit.label.clone()),
                DecisionReason::Matched,
            )
        }
    }
}

/// Full record of a decision cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: DecisionReason,
    /// Nearest gallery hit, when a face was extracted and the gallery is not empty.
    pub nearest: Option<Neighbor>,
    /// Set once the frame has been archived.
    pub archive_id: Option<String>,
    /// The archive already held a frame under the same identifier.
    pub replayed: bool,
    /// Index generation the decision was made against.
    pub index_generation: Uuid,
    pub elapsed_ms: u64,
}

impl Decision {
    pub fn distance(&self) -> Option<f32> {
        self.nearest.as_ref().map(|n| n.distance)
    }
}

/// Runs submissions through signature check, extraction, matching and archiving.
pub struct AccessDecider {
    verifier: SignatureVerifier,
    extractor: Arc<dyn EmbeddingExtractor>,
    index: Arc<IdentityIndex>,
    policy: DecisionPolicy,
    distance_metric: DistanceMetric,
    archive: Option<Arc<dyn Archive>>,
    archive_folder: String,
}

impl AccessDecider {
    pub fn new(
        verifier: SignatureVerifier,
        extractor: Arc<dyn EmbeddingExtractor>,
        index: Arc<IdentityIndex>,
        policy: DecisionPolicy,
        distance_metric: DistanceMetric,
    ) -> Self {
        Self {
            verifier,
            extractor,
            index,
            policy,
            distance_metric,
            archive: None,
            archive_folder: DEFAULT_ARCHIVE_FOLDER.to_string(),
        }
    }

    /// Hand decided frames to `archive` under `folder`.
    pub fn with_archive(mut self, archive: Arc<dyn Archive>, folder: impl Into<String>) -> Self {
        self.archive = Some(archive);
        self.archive_folder = folder.into();
        self
    }

    /// Settings the loaded index must have been built with.
    pub fn profile(&self) -> IndexProfile {
        IndexProfile {
            embedding_model: self.extractor.model_name().to_string(),
            distance_metric: self.distance_metric,
            threshold: self.policy.threshold,
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn index(&self) -> &Arc<IdentityIndex> {
        &self.index
    }

    pub fn archive_folder(&self) -> &str {
        &self.archive_folder
    }

    /// Decide one submission.
    ///
    /// Errors: `MalformedSubmission` for missing bytes or signature,
    /// `ForgedSubmission` on signature mismatch, `IndexUnavailable` when the
    /// index is not loaded or does not match this decider's profile.
    pub async fn decide(&self, submission: &Submission) -> Result<Decision> {
        let start = Instant::now();
        let signature = submission.claimed_signature.as_str();

        if let Err(e) = self.verifier.authenticate(&submission.raw_bytes, signature) {
            if let Some(verdict) = Verdict::from_rejection(&e) {
                warn!(
                    security_event = "forged_submission",
                    status = %verdict.status,
                    label = %verdict.identity,
                    signature_prefix = %verdict.signature_prefix,
                    size = submission.raw_bytes.len(),
                    "Rejected submission with invalid signature"
                );
            }
            return Err(e);
        }

        // Pin one generation for the whole cycle.
        let snapshot = self.index.snapshot()?;
        snapshot.metadata().ensure_matches(&self.profile())?;

        let (status, identity, reason, nearest) =
            match extract_from_bytes(self.extractor.as_ref(), &submission.raw_bytes).await {
                Ok(embedding) => {
                    let nearest = snapshot.query(&embedding, 1)?.into_iter().next();
                    let (status, identity, reason) = self.policy.evaluate(nearest.as_ref());
                    (status, identity, reason, nearest)
                }
                Err(e) => {
                    debug!(error = %e, "Extraction failed");
                    (
                        AccessStatus::Denied,
                        IdentityLabel::NoFace,
                        DecisionReason::NoFace,
                        None,
                    )
                }
            };

        let verdict = Verdict::new(status, identity, signature);
        let receipt = self.archive_frame(&verdict, submission).await;
        let replayed = receipt.as_ref().is_some_and(|r| r.replaced);
        let archive_id = receipt.map(|r| r.identifier);

        let decision = Decision {
            verdict,
            reason,
            nearest,
            archive_id,
            replayed,
            index_generation: snapshot.metadata().generation,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            status = %decision.verdict.status,
            label = %decision.verdict.identity,
            distance = ?decision.distance(),
            reason = ?decision.reason,
            archive_id = ?decision.archive_id,
            signature_prefix = %decision.verdict.signature_prefix,
            "Verdict issued"
        );
        Ok(decision)
    }

    async fn archive_frame(
        &self,
        verdict: &Verdict,
        submission: &Submission,
    ) -> Option<ArchiveReceipt> {
        let archive = self.archive.as_ref()?;
        let identifier = ArchiveNamer::name(verdict, &submission.claimed_signature);

        match archive
            .store(&self.archive_folder, &identifier, &submission.raw_bytes)
            .await
        {
            Ok(receipt) => {
                if receipt.replaced {
                    warn!(
                        security_event = "replayed_submission",
                        archive_id = %receipt.identifier,
                        "Archived frame replaced an earlier frame with the same signature"
                    );
                }
                Some(receipt)
            }
            Err(e) => {
                warn!(archive_id = %identifier, error = %e, "Failed to archive frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveQuery, MemoryArchive};
    use crate::embedding::{EmbeddingVector, MockExtractor};
    use crate::index::{IdentityRecord, IdentitySnapshot, DEFAULT_COLLECTION};
    use crate::signature::SharedSecret;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const ALICE: [u8; 3] = [10, 0, 0];
    const STRANGER: [u8; 3] = [20, 0, 0];
    const CROWD: [u8; 3] = [30, 0, 0];
    const BLANK: [u8; 3] = [255, 255, 255];

    fn neighbor(label: &str, distance: f32) -> Neighbor {
        Neighbor {
            record_id: format!("{label}_x.jpg"),
            label: label.to_string(),
            source: "x.jpg".to_string(),
            distance,
        }
    }

    fn frame(rgb: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(rgb)));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SharedSecret::new(b"device-secret".to_vec()).unwrap())
    }

    fn profile() -> IndexProfile {
        IndexProfile {
            embedding_model: "mock".into(),
            distance_metric: DistanceMetric::Euclidean,
            threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }

    fn gallery(records: Vec<IdentityRecord>) -> Arc<IdentityIndex> {
        Arc::new(IdentityIndex::with_snapshot(
            IdentitySnapshot::build(DEFAULT_COLLECTION, profile(), records).unwrap(),
        ))
    }

    fn decider(index: Arc<IdentityIndex>, archive: Arc<MemoryArchive>) -> AccessDecider {
        let extractor = MockExtractor::default()
            .with_face(ALICE, vec![5.0, 0.0])
            .with_face(STRANGER, vec![100.0, 0.0])
            .with_face(CROWD, vec![-50.0, 0.0]);
        AccessDecider::new(
            verifier(),
            Arc::new(extractor),
            index,
            DecisionPolicy::default(),
            DistanceMetric::Euclidean,
        )
        .with_archive(archive, DEFAULT_ARCHIVE_FOLDER)
    }

    fn standard_gallery() -> Arc<IdentityIndex> {
        gallery(vec![
            IdentityRecord::new("alice", "a1.jpg", EmbeddingVector::new(vec![0.0, 0.0]).unwrap()),
            IdentityRecord::new(
                BACKGROUND_LABEL,
                "crowd.jpg",
                EmbeddingVector::new(vec![-50.0, 0.0]).unwrap(),
            ),
        ])
    }

    fn signed(bytes: Vec<u8>) -> Submission {
        let signature = verifier().sign(&bytes).unwrap();
        Submission::new(bytes, signature)
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = DecisionPolicy::default();
        let (status, _, reason) = policy.evaluate(Some(&neighbor("alice", 22.0)));
        assert_eq!(status, AccessStatus::Denied);
        assert_eq!(reason, DecisionReason::AboveThreshold);

        let (status, identity, _) = policy.evaluate(Some(&neighbor("alice", 22.0 - 1e-4)));
        assert_eq!(status, AccessStatus::Granted);
        assert_eq!(identity, IdentityLabel::Named("alice".into()));
    }

    #[test]
    fn test_background_label_never_granted() {
        let policy = DecisionPolicy::default();
        let (status, identity, reason) = policy.evaluate(Some(&neighbor(BACKGROUND_LABEL, 0.0)));
        assert_eq!(status, AccessStatus::Denied);
        assert_eq!(identity, IdentityLabel::Intruder);
        assert_eq!(reason, DecisionReason::BackgroundMatch);
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let (status, identity, _) = DecisionPolicy::default().evaluate(None);
        assert_eq!(status, AccessStatus::Denied);
        assert_eq!(identity, IdentityLabel::Unknown);
    }

    #[test]
    fn test_policy_rejects_bad_threshold() {
        assert!(DecisionPolicy::new(0.0).is_err());
        assert!(DecisionPolicy::new(-1.0).is_err());
        assert!(DecisionPolicy::new(f32::NAN).is_err());
        assert!(DecisionPolicy::new(0.4).is_ok());
    }

    #[test]
    fn test_status_parse_and_serialize() {
        assert_eq!("GRANTED".parse::<AccessStatus>().unwrap(), AccessStatus::Granted);
        assert!("maybe".parse::<AccessStatus>().is_err());

        let verdict = Verdict::new(
            AccessStatus::Granted,
            IdentityLabel::Named("alice".into()),
            "3F9A1C0B2E4D55",
        );
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "granted");
        assert_eq!(json["identity"], "alice");
        assert_eq!(json["signature_prefix"], "3f9a1c0b2e4d");
    }

    #[tokio::test]
    async fn test_granted_match_is_archived() {
        let archive = Arc::new(MemoryArchive::new());
        let decider = decider(standard_gallery(), archive.clone());
        let submission = signed(frame(ALICE));

        let decision = decider.decide(&submission).await.unwrap();

        assert_eq!(decision.verdict.status, AccessStatus::Granted);
        assert_eq!(decision.verdict.identity, IdentityLabel::Named("alice".into()));
        assert!((decision.distance().unwrap() - 5.0).abs() < 1e-6);

        let archive_id = decision.archive_id.unwrap();
        assert!(archive_id.starts_with("granted_alice_"));
        assert_eq!(
            archive.get(DEFAULT_ARCHIVE_FOLDER, &archive_id).unwrap(),
            submission.raw_bytes
        );
    }

    #[tokio::test]
    async fn test_stranger_and_background_are_intruders() {
        let archive = Arc::new(MemoryArchive::new());
        let decider = decider(standard_gallery(), archive.clone());

        let stranger = decider.decide(&signed(frame(STRANGER))).await.unwrap();
        assert_eq!(stranger.verdict.identity, IdentityLabel::Intruder);
        assert_eq!(stranger.reason, DecisionReason::AboveThreshold);

        let crowd = decider.decide(&signed(frame(CROWD))).await.unwrap();
        assert_eq!(crowd.verdict.status, AccessStatus::Denied);
        assert_eq!(crowd.reason, DecisionReason::BackgroundMatch);

        let denied = archive
            .list(
                DEFAULT_ARCHIVE_FOLDER,
                ArchiveQuery::new(Some(AccessStatus::Denied), None),
            )
            .await
            .unwrap();
        assert_eq!(denied.len(), 2);
    }

    #[tokio::test]
    async fn test_no_face_is_denied() {
        let decider = decider(standard_gallery(), Arc::new(MemoryArchive::new()));

        let blank = decider.decide(&signed(frame(BLANK))).await.unwrap();
        assert_eq!(blank.verdict.identity, IdentityLabel::NoFace);
        assert_eq!(blank.reason, DecisionReason::NoFace);
        assert!(blank.nearest.is_none());

        let garbage = decider.decide(&signed(b"not an image".to_vec())).await.unwrap();
        assert_eq!(garbage.verdict.identity, IdentityLabel::NoFace);
    }

    #[tokio::test]
    async fn test_forged_submission_touches_nothing() {
        let archive = Arc::new(MemoryArchive::new());
        let decider = decider(standard_gallery(), archive.clone());
        let submission = Submission::new(frame(ALICE), "0".repeat(64));

        let result = decider.decide(&submission).await;

        let error = result.unwrap_err();
        assert!(matches!(error, FaceguardError::ForgedSubmission { .. }));
        assert_eq!(
            Verdict::from_rejection(&error),
            Some(Verdict {
                status: AccessStatus::Denied,
                identity: IdentityLabel::Forged,
                signature_prefix: "000000000000".into(),
            })
        );
        assert!(archive.is_empty());
    }

    #[test]
    fn test_only_forged_rejections_carry_a_verdict() {
        let verdict = Verdict::from_rejection(&FaceguardError::forged("3F9A1C0B2E4D5F60")).unwrap();
        assert_eq!(verdict.identity.to_string(), "Forged");
        assert_eq!(verdict.signature_prefix, "3f9a1c0b2e4d");
        assert!(!verdict.is_granted());

        assert!(Verdict::from_rejection(&FaceguardError::malformed("missing signature")).is_none());
        assert!(Verdict::from_rejection(&FaceguardError::index_unavailable("not loaded")).is_none());
    }

    #[test]
    fn test_non_finite_distance_is_denied() {
        let policy = DecisionPolicy::new(0.4).unwrap();
        for distance in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let (status, identity, reason) = policy.evaluate(Some(&neighbor("alice", distance)));
            assert_eq!(status, AccessStatus::Denied, "distance {distance}");
            assert_eq!(identity, IdentityLabel::Intruder);
            assert_eq!(reason, DecisionReason::AboveThreshold);
        }
    }

    #[tokio::test]
    async fn test_cosine_decisions_with_extreme_embeddings() {
        let cosine = IndexProfile {
            embedding_model: "mock".into(),
            distance_metric: DistanceMetric::Cosine,
            threshold: 0.4,
        };
        let index = Arc::new(IdentityIndex::with_snapshot(
            IdentitySnapshot::build(
                DEFAULT_COLLECTION,
                cosine,
                vec![IdentityRecord::new(
                    "alice",
                    "a1.jpg",
                    EmbeddingVector::new(vec![1e30, 0.0]).unwrap(),
                )],
            )
            .unwrap(),
        ));
        let extractor = MockExtractor::default()
            .with_face(ALICE, vec![2e30, 1e28])
            .with_face(STRANGER, vec![-1e30, 0.0]);
        let decider = AccessDecider::new(
            verifier(),
            Arc::new(extractor),
            index,
            DecisionPolicy::new(0.4).unwrap(),
            DistanceMetric::Cosine,
        );

        let alice = decider.decide(&signed(frame(ALICE))).await.unwrap();
        assert_eq!(alice.verdict.status, AccessStatus::Granted);
        assert_eq!(alice.verdict.identity, IdentityLabel::Named("alice".into()));
        assert!(alice.distance().unwrap() < 0.01);

        let opposite = decider.decide(&signed(frame(STRANGER))).await.unwrap();
        assert_eq!(opposite.verdict.status, AccessStatus::Denied);
        assert_eq!(opposite.verdict.identity, IdentityLabel::Intruder);
        assert!((opposite.distance().unwrap() - 2.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_missing_signature_is_malformed() {
        let decider = decider(standard_gallery(), Arc::new(MemoryArchive::new()));
        let result = decider.decide(&Submission::new(frame(ALICE), "")).await;
        assert!(matches!(result, Err(FaceguardError::MalformedSubmission(_))));
    }

    #[tokio::test]
    async fn test_empty_gallery_yields_unknown() {
        let decider = decider(gallery(vec![]), Arc::new(MemoryArchive::new()));
        let decision = decider.decide(&signed(frame(ALICE))).await.unwrap();
        assert_eq!(decision.verdict.identity, IdentityLabel::Unknown);
        assert_eq!(decision.reason, DecisionReason::EmptyIndex);
    }

    #[tokio::test]
    async fn test_unloaded_or_mismatched_index_fails_closed() {
        let unloaded = decider(
            Arc::new(IdentityIndex::unloaded()),
            Arc::new(MemoryArchive::new()),
        );
        assert!(matches!(
            unloaded.decide(&signed(frame(ALICE))).await,
            Err(FaceguardError::IndexUnavailable(_))
        ));

        let mut other = profile();
        other.embedding_model = "Facenet512".into();
        let mismatched = Arc::new(IdentityIndex::with_snapshot(
            IdentitySnapshot::build(DEFAULT_COLLECTION, other, vec![]).unwrap(),
        ));
        let archive = Arc::new(MemoryArchive::new());
        let decider = decider(mismatched, archive.clone());
        assert!(matches!(
            decider.decide(&signed(frame(ALICE))).await,
            Err(FaceguardError::IndexUnavailable(_))
        ));
        assert!(archive.is_empty());
    }

    #[tokio::test]
    async fn test_archive_failure_keeps_verdict() {
        let archive = Arc::new(MemoryArchive::new());
        archive.fail_writes(true);
        let decider = decider(standard_gallery(), archive.clone());

        let decision = decider.decide(&signed(frame(ALICE))).await.unwrap();
        assert_eq!(decision.verdict.status, AccessStatus::Granted);
        assert!(decision.archive_id.is_none());
    }
}
