//! Identify command implementation.
//!
//! Runs one image through the same extraction, matching and threshold
//! policy as the gate, without archiving it.

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;
use faceguard_core::embedding::extract_from_bytes;
use faceguard_core::{
    AccessStatus, DecisionReason, ExtractorConfig, ExtractorFactory, IdentityLabel,
    SignatureVerifier,
};
use tracing::{debug, info, warn};

use crate::utils::{expected_profile, load_snapshot, policy, read_input, resolve_secret};
use crate::IndexArgs;

/// Execute the identify command.
pub async fn execute(
    file: PathBuf,
    args: IndexArgs,
    signature: Option<String>,
    secret: Option<String>,
    k: usize,
    quiet: bool,
) -> Result<()> {
    let content = read_input(&file)?;

    if let Some(signature) = &signature {
        let verifier = SignatureVerifier::new(resolve_secret(secret)?);
        if let Err(e) = verifier.authenticate(&content, signature) {
            if e.is_security_event() {
                warn!(
                    security_event = "forged_submission",
                    path = %file.display(),
                    "Rejected image with invalid signature"
                );
            }
            return Err(e.into());
        }
        debug!("Signature authenticated");
    }

    let policy = policy(&args)?;
    let extractor = ExtractorFactory::create(ExtractorConfig::from_env()?)?;
    let snapshot = load_snapshot(&args)?;
    snapshot
        .metadata()
        .ensure_matches(&expected_profile(&args, extractor.model_name()))?;

    let (status, identity, reason, neighbors) =
        match extract_from_bytes(extractor.as_ref(), &content).await {
            Ok(embedding) => {
                let neighbors = snapshot.query(&embedding, k.max(1))?;
                let (status, identity, reason) = policy.evaluate(neighbors.first());
                (status, identity, reason, neighbors)
            }
            Err(e) => {
                debug!(error = %e, "Extraction failed");
                (
                    AccessStatus::Denied,
                    IdentityLabel::NoFace,
                    DecisionReason::NoFace,
                    Vec::new(),
                )
            }
        };

    info!(
        status = %status,
        identity = %identity,
        distance = neighbors.first().map(|n| n.distance),
        "Identified"
    );

    if quiet {
        println!("{} {}", status, identity);
    } else {
        println!();
        match status {
            AccessStatus::Granted => println!(
                "{} {}",
                "ACCESS GRANTED".green().bold(),
                identity.to_string().bold()
            ),
            AccessStatus::Denied => println!(
                "{} {}",
                "ACCESS DENIED".red().bold(),
                identity.to_string().bold()
            ),
        }
        println!();
        println!("   {} {:?}", "Reason:".dimmed(), reason);
        println!(
            "   {} {}",
            "Authenticated:".dimmed(),
            if signature.is_some() { "yes" } else { "no (unsigned)" }
        );
        println!(
            "   {} {} ({} records)",
            "Index generation:".dimmed(),
            snapshot.metadata().generation,
            snapshot.len()
        );

        if !neighbors.is_empty() {
            println!();
            for (rank, neighbor) in neighbors.iter().enumerate() {
                println!(
                    "   {}. {:<20} {:>10.4}  {}",
                    rank + 1,
                    neighbor.label.cyan(),
                    neighbor.distance,
                    neighbor.source.dimmed()
                );
            }
        }
    }

    if status == AccessStatus::Denied {
        bail!("Access denied: {identity}");
    }
    Ok(())
}
