//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the Faceguard gate API.

use utoipa::OpenApi;

use crate::handlers::{
    ArchiveItem, ArchiveListResponse, HealthResponse, ReadyResponse, UploadResponse,
};

/// Faceguard gate API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Faceguard - Gate API",
        version = "0.1.0",
        description = r#"
## Authenticated Face-Gate API

Capture devices post frames signed with a shared secret. Each authenticated
frame is matched against a gallery of known identities and receives a
verdict:

1. `POST /upload` with the raw frame and its `X-Signature` (hex HMAC-SHA256)
2. Frames with a bad signature are rejected with `403` and never archived
3. Authenticated frames are granted only when the nearest gallery face is
   closer than the configured distance threshold and is not a background face
4. Every verdict is archived under an identifier such as `granted_alice_3f9a1c0b2e4d`
5. `GET /archive` lists recent verdicts
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Gate", description = "Signed frame submission and access verdicts"),
        (name = "Archive", description = "Archived frames and their verdicts"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::upload::upload_handler,
        crate::handlers::archive::list_archive_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UploadResponse,
            ArchiveItem,
            ArchiveListResponse,
        )
    )
)]
pub struct ApiDoc;
