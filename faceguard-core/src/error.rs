use thiserror::Error;

/// Length of the signature prefix carried in verdicts, logs and archive ids.
pub const SIGNATURE_PREFIX_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum FaceguardError {
    /// Request is missing its payload or its signature.
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),

    /// Signature did not match the payload. Security event.
    #[error("Forged submission (signature prefix {signature_prefix})")]
    ForgedSubmission { signature_prefix: String },

    #[error("No face detected: {0}")]
    NoFaceDetected(String),

    /// Index is not loaded, is corrupt, or was built for another model/metric/threshold.
    #[error("Identity index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Archive storage failure: {0}")]
    StorageFailure(String),

    #[error("Extractor error: {0}")]
    ExtractorError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FaceguardError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSubmission(message.into())
    }

    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::IndexUnavailable(message.into())
    }

    pub fn no_face(message: impl Into<String>) -> Self {
        Self::NoFaceDetected(message.into())
    }

    /// Build a forged-submission error that only retains a short prefix of the claimed signature.
    pub fn forged(claimed_signature: &str) -> Self {
        Self::ForgedSubmission {
            signature_prefix: signature_prefix(claimed_signature),
        }
    }

    /// Whether this error must be reported as a security event rather than an ordinary denial.
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::ForgedSubmission { .. })
    }
}

/// Short, log-safe prefix of a hex signature.
pub fn signature_prefix(signature_hex: &str) -> String {
    signature_hex
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(SIGNATURE_PREFIX_LEN)
        .collect::<String>()
        .to_ascii_lowercase()
}

pub type Result<T> = std::result::Result<T, FaceguardError>;
