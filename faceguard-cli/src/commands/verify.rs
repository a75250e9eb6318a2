//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use faceguard_core::error::signature_prefix;
use faceguard_core::SignatureVerifier;
use tracing::{info, warn};

use crate::utils::{read_input, resolve_secret};

/// Execute the verify command.
pub fn execute(file: PathBuf, signature: String, secret: Option<String>, quiet: bool) -> Result<()> {
    let content = read_input(&file)?;
    let verifier = SignatureVerifier::new(resolve_secret(secret)?);
    let prefix = signature_prefix(&signature);

    if verifier.verify(&content, &signature)? {
        info!(path = %file.display(), signature_prefix = %prefix, "Signature valid");
        if !quiet {
            println!();
            println!("{}", "SIGNATURE VALID".green().bold());
            println!();
            println!("   {} {}", "File:".dimmed(), file.display());
            println!("   {} {}", "Signature:".dimmed(), prefix);
        }
        return Ok(());
    }

    warn!(
        security_event = "forged_submission",
        signature_prefix = %prefix,
        "Signature mismatch"
    );
    if !quiet {
        println!();
        println!("{}", "SIGNATURE MISMATCH".red().bold());
        println!();
        println!("   {} {}", "File:".dimmed(), file.display());
        println!("   {} {}", "Signature:".dimmed(), prefix);
    }
    bail!("Signature verification failed: {} does not match {prefix}", file.display())
}
