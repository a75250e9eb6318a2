//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use faceguard_core::{FaceguardError, Verdict};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required service is not configured or available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Gate pipeline error
    #[error("Gate error: {0}")]
    Gate(#[from] FaceguardError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gate(e) => match e {
                FaceguardError::MalformedSubmission(_) => StatusCode::BAD_REQUEST,
                FaceguardError::ForgedSubmission { .. } => StatusCode::FORBIDDEN,
                FaceguardError::NoFaceDetected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FaceguardError::ExtractorError(_) => StatusCode::SERVICE_UNAVAILABLE,
                FaceguardError::IndexUnavailable(_)
                | FaceguardError::StorageFailure(_)
                | FaceguardError::InvalidConfig(_)
                | FaceguardError::SerializationError(_)
                | FaceguardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Gate(e) => match e {
                FaceguardError::MalformedSubmission(_) => "MALFORMED_SUBMISSION",
                FaceguardError::ForgedSubmission { .. } => "FORGED_SUBMISSION",
                FaceguardError::NoFaceDetected(_) => "NO_FACE_DETECTED",
                FaceguardError::IndexUnavailable(_) => "INDEX_UNAVAILABLE",
                FaceguardError::StorageFailure(_) => "STORAGE_FAILURE",
                FaceguardError::ExtractorError(_) => "EXTRACTOR_UNAVAILABLE",
                FaceguardError::InvalidConfig(_) => "INVALID_CONFIG",
                FaceguardError::SerializationError(_) => "SERIALIZATION_ERROR",
                FaceguardError::Io(_) => "IO_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // For gate errors, never echo internal details
            Self::Gate(e) => match e {
                FaceguardError::MalformedSubmission(detail) => {
                    format!("Malformed submission: {detail}")
                }
                FaceguardError::ForgedSubmission { .. } => "Signature mismatch".to_string(),
                FaceguardError::NoFaceDetected(_) => "No face detected".to_string(),
                FaceguardError::IndexUnavailable(_) => "Identity index unavailable".to_string(),
                FaceguardError::ExtractorError(_) => {
                    "Embedding service unavailable".to_string()
                }
                FaceguardError::StorageFailure(_) => "Archive storage failure".to_string(),
                FaceguardError::InvalidConfig(_)
                | FaceguardError::SerializationError(_)
                | FaceguardError::Io(_) => "Internal server error".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Gate(_) => "gate",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) | Self::Gate(FaceguardError::MalformedSubmission(_)) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Client error"
                );
            }
            // The decider already logged the security event with its signature prefix
            Self::Gate(FaceguardError::ForgedSubmission { .. }) => {
                tracing::debug!(status = %status, code = code, "Forged submission rejected");
            }
            Self::ServiceUnavailable(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Service unavailable"
                );
            }
            Self::Internal(_) | Self::Gate(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    client_message = %client_message,
                    "Server error"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let mut body = serde_json::json!({
            "error": client_message,
            "code": code,
        });
        // Forged submissions still get their DENIED verdict
        if let Self::Gate(e) = &self {
            if let Some(verdict) = Verdict::from_rejection(e) {
                body["verdict"] = serde_json::json!(verdict);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_error_mapping() {
        let cases = [
            (FaceguardError::malformed("missing signature"), StatusCode::BAD_REQUEST),
            (FaceguardError::forged("abcdef"), StatusCode::FORBIDDEN),
            (FaceguardError::index_unavailable("not loaded"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn test_index_details_not_exposed() {
        let error = ApiError::from(FaceguardError::index_unavailable(
            "/var/lib/faceguard/faces.cbor: corrupt",
        ));
        assert_eq!(error.error_code(), "INDEX_UNAVAILABLE");
        assert!(!error.client_message().contains("/var/lib"));
    }
}
