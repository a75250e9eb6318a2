//! Frame submission handler
//!
//! Handles POST /upload: raw frame bytes in the body, the device's HMAC in
//! the `X-Signature` header.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use faceguard_core::{Decision, Submission};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{validate_content_type, validate_file_size};

/// Header carrying the lowercase hex HMAC-SHA256 of the body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Verdict issued for an authenticated frame
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// "granted" or "denied"
    #[schema(example = "granted")]
    pub status: String,
    /// Matched label, or Unknown / Intruder / NoFace
    #[schema(example = "alice")]
    pub identity: String,
    /// Why the policy settled on this verdict
    #[schema(example = "matched")]
    pub reason: String,
    /// Distance to the nearest gallery record, when one was compared
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 5.0)]
    pub distance: Option<f32>,
    /// First 12 hex characters of the submitted signature
    #[schema(example = "3f9a1c0b2e4d")]
    pub signature_prefix: String,
    /// Archive identifier, absent when archiving failed
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "granted_alice_3f9a1c0b2e4d")]
    pub archive_id: Option<String>,
    /// Index generation the decision was made against
    pub index_generation: String,
}

impl From<Decision> for UploadResponse {
    fn from(decision: Decision) -> Self {
        let reason = serde_json::to_value(decision.reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            status: decision.verdict.status.to_string(),
            identity: decision.verdict.identity.to_string(),
            reason,
            distance: decision.distance(),
            signature_prefix: decision.verdict.signature_prefix,
            archive_id: decision.archive_id,
            index_generation: decision.index_generation.to_string(),
        }
    }
}

/// Submit a signed frame for an access decision
///
/// The body is the raw image (JPEG or PNG). The `X-Signature` header must
/// hold the lowercase hex HMAC-SHA256 of the body under the device secret.
///
/// Authenticated frames always receive a verdict (200), granted or denied,
/// and are archived under an identifier encoding that verdict. Frames with
/// a bad signature are rejected (403) and never archived.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Gate",
    request_body(
        content_type = "application/octet-stream",
        description = "Raw frame bytes"
    ),
    params(
        ("X-Signature" = String, Header, description = "Hex HMAC-SHA256 of the body")
    ),
    responses(
        (status = 200, description = "Verdict issued", body = UploadResponse),
        (status = 400, description = "Missing frame or signature, or unsupported Content-Type"),
        (status = 403, description = "Signature mismatch"),
        (status = 500, description = "Identity index unavailable")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    validate_content_type(content_type)?;
    validate_file_size(body.len(), state.max_file_size)?;

    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::bad_request("X-Signature header is not valid ASCII"))?
            .trim()
            .to_string(),
        None => String::new(),
    };

    let submission = Submission::new(body.to_vec(), signature);
    let decision = state.decider.decide(&submission).await?;

    Ok(Json(decision.into()))
}
