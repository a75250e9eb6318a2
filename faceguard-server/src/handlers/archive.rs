//! Archive listing handler
//!
//! Handles GET /archive: the most recent archived frames, newest first.

use axum::{
    extract::{Query, State},
    Json,
};
use faceguard_core::{AccessStatus, ArchiveEntry, ArchiveQuery};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the archive listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ArchiveListParams {
    /// Filter by verdict status ("granted" or "denied")
    pub status: Option<String>,
    /// Number of entries to return (default 20, max 100)
    pub limit: Option<usize>,
}

/// One archived frame
#[derive(Debug, Serialize, ToSchema)]
pub struct ArchiveItem {
    #[schema(example = "granted_alice_3f9a1c0b2e4d")]
    pub identifier: String,
    #[schema(example = "granted")]
    pub status: String,
    #[schema(example = "alice")]
    pub label: String,
    #[schema(example = "3f9a1c0b2e4d")]
    pub signature_prefix: String,
    /// RFC 3339 timestamp
    pub stored_at: String,
    pub size: u64,
}

impl From<ArchiveEntry> for ArchiveItem {
    fn from(entry: ArchiveEntry) -> Self {
        Self {
            identifier: entry.identifier,
            status: entry.status.to_string(),
            label: entry.label,
            signature_prefix: entry.signature_prefix,
            stored_at: entry.stored_at.to_rfc3339(),
            size: entry.size,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArchiveListResponse {
    #[schema(example = "secureesp")]
    pub folder: String,
    pub count: usize,
    pub entries: Vec<ArchiveItem>,
}

/// List recently archived frames
///
/// Verdict fields are recovered from each identifier; frame content is not read.
#[utoipa::path(
    get,
    path = "/archive",
    tag = "Archive",
    params(ArchiveListParams),
    responses(
        (status = 200, description = "Archived frames, newest first", body = ArchiveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 500, description = "Archive storage failure")
    )
)]
pub async fn list_archive_handler(
    State(state): State<AppState>,
    Query(params): Query<ArchiveListParams>,
) -> Result<Json<ArchiveListResponse>, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<AccessStatus>()
                .map_err(|_| ApiError::bad_request(format!("Unknown status filter '{s}'")))
        })
        .transpose()?;

    let folder = state.archive_folder().to_string();
    let entries = state
        .archive
        .list(&folder, ArchiveQuery::new(status, params.limit))
        .await?;

    let entries: Vec<ArchiveItem> = entries.into_iter().map(ArchiveItem::from).collect();
    Ok(Json(ArchiveListResponse {
        folder,
        count: entries.len(),
        entries,
    }))
}
