//! Build-index command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use faceguard_core::{
    DatabaseBuilder, DirectoryCorpus, ExtractorConfig, ExtractorFactory, FileIndexStore,
};
use tracing::info;

use crate::IndexArgs;

/// Execute the build-index command.
pub async fn execute(dataset: PathBuf, args: IndexArgs, json: bool, quiet: bool) -> Result<()> {
    std::fs::metadata(&dataset)
        .with_context(|| format!("Failed to read dataset directory: {}", dataset.display()))?;

    // Reject a bad threshold before embedding anything.
    crate::utils::policy(&args)?;

    let corpus = DirectoryCorpus::scan(&dataset)?;
    info!(dataset = %dataset.display(), images = corpus.len(), "Scanned dataset");
    if corpus.is_empty() && !quiet {
        eprintln!(
            "{}",
            format!("No images found under {}", dataset.display()).yellow()
        );
    }

    let extractor = ExtractorFactory::create(ExtractorConfig::from_env()?)?;
    let builder = DatabaseBuilder::new(
        extractor,
        args.collection.clone(),
        args.metric,
        args.threshold,
    );
    let store = FileIndexStore::new(&args.index_dir);

    let report = builder
        .rebuild(corpus, &store, None)
        .await
        .context("Failed to write identity index")?;
    let index_path = store.collection_path(&args.collection)?;
    let metadata = report.snapshot.metadata();

    if json {
        let output = serde_json::json!({
            "index_path": index_path.display().to_string(),
            "processed": report.processed,
            "failed": report.failed,
            "per_label": report.per_label,
            "failures": report.failures,
            "metadata": metadata,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if quiet {
        return Ok(());
    }

    println!();
    println!("{}", "Identity index built".green().bold());
    println!();
    println!("   {} {}", "Index:".dimmed(), index_path.display());
    println!("   {} {}", "Generation:".dimmed(), metadata.generation);
    println!(
        "   {} {} ({} distance, threshold {})",
        "Model:".dimmed(),
        metadata.profile.embedding_model,
        metadata.profile.distance_metric,
        metadata.profile.threshold
    );
    println!("   {} {}", "Processed:".dimmed(), report.processed);
    if report.failed > 0 {
        println!(
            "   {} {}",
            "Failed:".dimmed(),
            report.failed.to_string().yellow()
        );
    }

    if !report.per_label.is_empty() {
        println!();
        for (label, count) in &report.per_label {
            println!("   {:<24} {}", label.cyan(), count);
        }
    }

    if !report.failures.is_empty() {
        println!();
        for failure in &report.failures {
            println!(
                "   {} {}/{}: {}",
                "skipped".yellow(),
                failure.label,
                failure.source,
                failure.reason.dimmed()
            );
        }
    }

    Ok(())
}
