//! HMAC-SHA256 submission signatures.
//!
//! Capture devices sign the raw image bytes with a secret shared with the
//! gate and send the lowercase hex digest alongside the payload. The gate
//! recomputes the digest and compares it in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{signature_prefix, FaceguardError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Prefix marking a hex-encoded secret in configuration values.
const HEX_SECRET_PREFIX: &str = "hex:";

/// Length of a hex-encoded HMAC-SHA256 digest.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Process-wide secret shared with capture devices.
///
/// The bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(FaceguardError::InvalidConfig(
                "shared secret must not be empty".into(),
            ));
        }
        Ok(Self(bytes))
    }

    /// Parse a configuration value: raw UTF-8 bytes, or `hex:<digits>`.
    pub fn from_config_value(value: &str) -> Result<Self> {
        match value.strip_prefix(HEX_SECRET_PREFIX) {
            Some(encoded) => {
                let bytes = hex::decode(encoded.trim()).map_err(|e| {
                    FaceguardError::InvalidConfig(format!("invalid hex shared secret: {e}"))
                })?;
                Self::new(bytes)
            }
            None => Self::new(value.as_bytes().to_vec()),
        }
    }

    fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret").field(&"[REDACTED]").finish()
    }
}

/// Compute the lowercase hex HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &SharedSecret, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .map_err(|e| FaceguardError::InvalidConfig(format!("invalid HMAC key: {e}")))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `claimed_signature_hex` against the HMAC of `message`.
///
/// Returns `Ok(false)` for any mismatch, including length mismatch. An empty
/// message or signature is a malformed request, not a failed verification.
pub fn verify(secret: &SharedSecret, message: &[u8], claimed_signature_hex: &str) -> Result<bool> {
    if message.is_empty() {
        return Err(FaceguardError::malformed("missing image bytes"));
    }
    if claimed_signature_hex.is_empty() {
        return Err(FaceguardError::malformed("missing signature"));
    }

    let computed = sign(secret, message)?;
    Ok(computed
        .as_bytes()
        .ct_eq(claimed_signature_hex.as_bytes())
        .into())
}

/// Verifier bound to the process secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: SharedSecret,
}

impl SignatureVerifier {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    pub fn sign(&self, message: &[u8]) -> Result<String> {
        sign(&self.secret, message)
    }

    pub fn verify(&self, message: &[u8], claimed_signature_hex: &str) -> Result<bool> {
        verify(&self.secret, message, claimed_signature_hex)
    }

    /// Like [`verify`](Self::verify) but turns a mismatch into `ForgedSubmission`.
    pub fn authenticate(&self, message: &[u8], claimed_signature_hex: &str) -> Result<()> {
        if self.verify(message, claimed_signature_hex)? {
            Ok(())
        } else {
            Err(FaceguardError::ForgedSubmission {
                signature_prefix: signature_prefix(claimed_signature_hex),
            })
        }
    }
}
