//! Inspect command implementation.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;

use crate::utils::{format_timestamp, load_snapshot};
use crate::IndexArgs;

/// Execute the inspect command.
pub fn execute(args: IndexArgs, json: bool, quiet: bool) -> Result<()> {
    let snapshot = load_snapshot(&args)?;
    let metadata = snapshot.metadata();

    let mut per_label: BTreeMap<&str, usize> = BTreeMap::new();
    for record in snapshot.records() {
        *per_label.entry(record.label.as_str()).or_default() += 1;
    }

    if json {
        let output = serde_json::json!({
            "metadata": metadata,
            "per_label": per_label,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if quiet {
        println!("{} {}", metadata.generation, metadata.record_count);
        return Ok(());
    }

    println!();
    println!("{}", format!("Collection '{}'", metadata.collection).bold());
    println!();
    println!("   {} {}", "Generation:".dimmed(), metadata.generation);
    println!(
        "   {} {}",
        "Built at:".dimmed(),
        format_timestamp(&metadata.built_at)
    );
    println!("   {} {}", "Format:".dimmed(), metadata.format_version);
    println!(
        "   {} {}",
        "Model:".dimmed(),
        metadata.profile.embedding_model
    );
    println!(
        "   {} {}",
        "Metric:".dimmed(),
        metadata.profile.distance_metric
    );
    println!("   {} {}", "Threshold:".dimmed(), metadata.profile.threshold);
    match metadata.dimension {
        Some(dim) => println!("   {} {}", "Dimension:".dimmed(), dim),
        None => println!("   {} {}", "Dimension:".dimmed(), "empty index".yellow()),
    }
    println!("   {} {}", "Records:".dimmed(), metadata.record_count);

    if !per_label.is_empty() {
        println!();
        for (label, count) in &per_label {
            let label = if *label == args.background_label {
                format!("{label} (background)").dimmed()
            } else {
                label.cyan()
            };
            println!("   {:<24} {}", label, count);
        }
    }

    Ok(())
}
