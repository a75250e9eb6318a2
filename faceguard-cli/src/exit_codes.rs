//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts driving the gate tools a stable way to tell a
//! forged frame from a missing file or an unusable index.

use faceguard_core::FaceguardError;

/// Successful execution.
#[allow(dead_code)]
pub const SUCCESS: u8 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: u8 = 1;

/// Command line usage error (invalid arguments or configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: u8 = 64;

/// Data error (forged signature, access denied).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: u8 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: u8 = 66;

/// Service unavailable (identity index, remote extractor).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: u8 = 69;

/// I/O error (cannot write the index or output).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: u8 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: u8,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = err
            .chain()
            .find_map(classify_source)
            .unwrap_or_else(|| classify_message(&message));

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify_source(source: &(dyn std::error::Error + 'static)) -> Option<u8> {
    if let Some(err) = source.downcast_ref::<FaceguardError>() {
        return Some(match err {
            FaceguardError::ForgedSubmission { .. } | FaceguardError::NoFaceDetected(_) => {
                VERIFICATION_FAILED
            }
            FaceguardError::MalformedSubmission(_) | FaceguardError::InvalidConfig(_) => {
                USAGE_ERROR
            }
            FaceguardError::IndexUnavailable(_) | FaceguardError::ExtractorError(_) => UNAVAILABLE,
            FaceguardError::Io(io) => io_code(io),
            FaceguardError::StorageFailure(_) | FaceguardError::SerializationError(_) => IO_ERROR,
        });
    }
    source.downcast_ref::<std::io::Error>().map(io_code)
}

fn io_code(err: &std::io::Error) -> u8 {
    match err.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => INPUT_ERROR,
        _ => IO_ERROR,
    }
}

fn classify_message(message: &str) -> u8 {
    if message.contains("Failed to read file") {
        INPUT_ERROR
    } else if message.contains("verification failed") || message.contains("Access denied") {
        VERIFICATION_FAILED
    } else if message.contains("Failed to write") {
        IO_ERROR
    } else {
        GENERAL_ERROR
    }
}
