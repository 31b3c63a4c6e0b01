//! Command-line interface definitions for Chainpress.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via environment variables instead of flags.

use clap::Parser;

/// Command-line arguments for the Chainpress application.
///
/// By default one article is generated and the process exits; `--serve`
/// keeps the process up behind the HTTP surface instead.
///
/// # Examples
///
/// ```sh
/// # One-shot generation into ./exports
/// chainpress -o ./exports
///
/// # With a config file and drafting enabled
/// chainpress -c config.yaml --api-key YOUR_KEY
///
/// # Long-running HTTP surface
/// chainpress --serve --bind 0.0.0.0:8000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for HTML artifacts (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Serve the HTTP surface instead of running once
    #[arg(long)]
    pub serve: bool,

    /// Bind address for --serve (overrides config)
    #[arg(long, env = "CHAINPRESS_BIND")]
    pub bind: Option<String>,

    /// Drafting service API key
    #[arg(long, env = "DRAFT_API_KEY")]
    pub api_key: Option<String>,
}
