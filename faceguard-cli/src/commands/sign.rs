//! Sign command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use faceguard_core::SignatureVerifier;
use tracing::info;

use crate::utils::{read_input, resolve_secret};

/// Execute the sign command.
///
/// Prints the hex HMAC-SHA256 a capture device would send in `X-Signature`.
pub fn execute(file: PathBuf, secret: Option<String>, quiet: bool) -> Result<()> {
    let content = read_input(&file)?;
    let verifier = SignatureVerifier::new(resolve_secret(secret)?);
    let signature = verifier.sign(&content)?;

    info!(path = %file.display(), bytes = content.len(), "Signed file");

    if quiet {
        println!("{signature}");
    } else {
        println!("{}", signature.bold());
        eprintln!(
            "   {} {} ({} bytes)",
            "Signed:".dimmed(),
            file.display(),
            content.len()
        );
    }
    Ok(())
}
