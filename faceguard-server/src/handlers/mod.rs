//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod archive;
pub mod health;
pub mod upload;

pub use crate::state::AppState;
pub use archive::{list_archive_handler, ArchiveItem, ArchiveListParams, ArchiveListResponse};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use upload::{upload_handler, UploadResponse, SIGNATURE_HEADER};
