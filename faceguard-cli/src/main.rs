//! Faceguard CLI - offline tools for the face gate.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use faceguard_core::config::DEFAULT_INDEX_DIR;
use faceguard_core::{DistanceMetric, DEFAULT_COLLECTION};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (signature valid, access granted)
  1   General error
  64  Usage error (bad arguments or configuration)
  65  Verification failed (forged signature, access denied)
  66  Input file not found or unreadable
  69  Identity index or extractor unavailable
  74  I/O error while writing output";

#[derive(Parser)]
#[command(name = "faceguard")]
#[command(author, version, about = "Authenticated face-gate tools", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Only print results, no banners or progress
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the gallery lives and what it was calibrated for.
#[derive(Args, Clone, Debug)]
pub struct IndexArgs {
    /// Directory holding persisted index generations
    #[arg(long, env = "FACEGUARD_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    pub index_dir: PathBuf,

    /// Collection name inside the index directory
    #[arg(long, env = "FACEGUARD_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Distance metric (euclidean or cosine)
    #[arg(long, env = "FACEGUARD_DISTANCE_METRIC", default_value = "euclidean")]
    pub metric: DistanceMetric,

    /// Distance below which a match is granted
    #[arg(long, env = "FACEGUARD_DISTANCE_THRESHOLD", default_value_t = faceguard_core::DEFAULT_DISTANCE_THRESHOLD)]
    pub threshold: f32,

    /// Label of the background class that is never granted
    #[arg(long, env = "FACEGUARD_BACKGROUND_LABEL", default_value = faceguard_core::BACKGROUND_LABEL)]
    pub background_label: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new index generation from a directory of labelled images
    BuildIndex {
        /// Dataset root with one subdirectory per label
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        #[command(flatten)]
        index: IndexArgs,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the metadata of the persisted index
    Inspect {
        #[command(flatten)]
        index: IndexArgs,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match an image against the index and print the verdict
    Identify {
        /// Image to identify
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        index: IndexArgs,

        /// Authenticate the image with this hex signature first
        #[arg(long)]
        signature: Option<String>,

        /// Shared secret used with --signature
        #[arg(long, env = "FACEGUARD_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Number of nearest gallery records to show
        #[arg(short, long, default_value_t = 1)]
        k: usize,
    },

    /// Sign a file the way a capture device does (hex HMAC-SHA256)
    Sign {
        /// File to sign
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Shared secret (raw string, or hex with a `hex:` prefix)
        #[arg(long, env = "FACEGUARD_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Check a file against a claimed signature
    Verify {
        /// File that was signed
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Claimed hex signature
        #[arg(value_name = "SIGNATURE")]
        signature: String,

        /// Shared secret (raw string, or hex with a `hex:` prefix)
        #[arg(long, env = "FACEGUARD_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            let exit = exit_codes::ExitCode::from_anyhow(&err);
            if let Some(message) = &exit.message {
                eprintln!("{} {}", "Error:".red().bold(), message);
            }
            std::process::ExitCode::from(exit.code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::BuildIndex {
            dataset,
            index,
            json,
        } => commands::build_index::execute(dataset, index, json, quiet).await,
        Commands::Inspect { index, json } => commands::inspect::execute(index, json, quiet),
        Commands::Identify {
            file,
            index,
            signature,
            secret,
            k,
        } => commands::identify::execute(file, index, signature, secret, k, quiet).await,
        Commands::Sign { file, secret } => commands::sign::execute(file, secret, quiet),
        Commands::Verify {
            file,
            signature,
            secret,
        } => commands::verify::execute(file, signature, secret, quiet),
    }
}
