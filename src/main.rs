//! # Chainpress
//!
//! A crypto-news content pipeline that fetches the most recent item from
//! weighted RSS feeds, gathers auxiliary signals, optionally drafts the
//! article through an OpenAI-compatible LLM API, and exports a single
//! SEO-annotated HTML artifact per run.
//!
//! ## Features
//!
//! - Weighted multi-feed RSS selection with article-page text extraction
//! - Independent signal collectors (trend keywords, social posts,
//!   internal-link candidates), each with a deterministic fallback
//! - Ordered drafting passes over an OpenAI-compatible chat API
//! - Deterministic document assembly: sectioning, signal placement,
//!   word-count window enforcement, derived SEO metadata
//! - Pure HTML rendering with schema.org structured data
//! - Minimal HTTP surface: `POST /generate` and `GET /logs`
//!
//! ## Usage
//!
//! ```sh
//! chainpress -o ./exports            # one-shot run
//! chainpress --serve                 # long-running HTTP surface
//! ```
//!
//! ## Architecture
//!
//! One linear pipeline per run:
//! 1. **Fetch**: pick the best recent item across the configured feeds
//! 2. **Collect**: gather the three signal kinds concurrently
//! 3. **Draft**: apply the configured enhancement passes
//! 4. **Assemble**: build the structured document under its invariants
//! 5. **Render/Export**: write one HTML artifact, atomically

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assemble;
mod cli;
mod config;
mod draft;
mod error;
mod feed;
mod models;
mod pipeline;
mod render;
mod server;
mod signals;
mod utils;

use cli::Cli;
use config::AppConfig;
use pipeline::Pipeline;
use server::{AppState, LogBuffer};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init: stdout plus the in-memory buffer behind GET /logs ---
    let logs = LogBuffer::new();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tfmt::layer()
                .with_target(true)
                .with_timer(tfmt::time::UtcTime::rfc_3339()),
        )
        .with(
            tfmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(tfmt::time::UtcTime::rfc_3339())
                .with_writer(logs.clone()),
        )
        .init();

    let start_time = std::time::Instant::now();
    info!("chainpress starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, serve = args.serve, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref()).await?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(key) = args.api_key {
        config.api.api_key = key;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    info!(
        feeds = config.feeds.len(),
        output_dir = %config.output_dir,
        drafting = !config.api.api_key.is_empty(),
        "Configuration loaded"
    );

    // Early check: the output directory must be writable before any network work
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let bind_addr = config.bind_addr.clone();
    let pipeline = Pipeline::new(config);

    if args.serve {
        let state = Arc::new(AppState { pipeline, logs });
        server::serve(state, &bind_addr).await?;
        return Ok(());
    }

    let report = pipeline.run().await?;
    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        title = %report.title,
        words = report.word_count,
        path = %report.path.display(),
        "Execution complete"
    );
    Ok(())
}
