//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Service name
    pub service: &'static str,
    /// Whether an identity index generation is published
    pub index_loaded: bool,
    /// Whether the published index matches the running model, metric and threshold
    pub index_compatible: bool,
    /// Generation id of the published index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_generation: Option<String>,
    /// Number of gallery records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_records: Option<usize>,
    /// Embedding model the gate runs
    pub embedding_model: String,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version and index state.
/// The service is "degraded" while no compatible index is published.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let profile = state.decider.profile();
    let snapshot = state.index().snapshot().ok();
    let index_compatible = snapshot
        .as_ref()
        .map(|s| s.metadata().ensure_matches(&profile).is_ok())
        .unwrap_or(false);

    Json(HealthResponse {
        status: if index_compatible { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        service: "faceguard-server",
        index_loaded: snapshot.is_some(),
        index_compatible,
        index_generation: snapshot
            .as_ref()
            .map(|s| s.metadata().generation.to_string()),
        index_records: snapshot.as_ref().map(|s| s.len()),
        embedding_model: profile.embedding_model,
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /ready - Readiness probe
///
/// Returns 200 once a compatible index is published, 503 before that.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready", body = ReadyResponse),
        (status = 503, description = "No compatible identity index", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let profile = state.decider.profile();
    match state.index().snapshot() {
        Ok(snapshot) if snapshot.metadata().ensure_matches(&profile).is_ok() => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Ok(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some("identity index was built for another profile"),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some("identity index not loaded"),
            }),
        ),
    }
}
