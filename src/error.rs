//! Error kinds surfaced by a pipeline run.
//!
//! Only a handful of failures are fatal: an unreachable or empty feed, a
//! drafting service that stays down through every retry, an assembly
//! invariant that cannot be restored by padding or trimming, and rendering
//! or filesystem failures. Signal-collection failures never appear here;
//! they are absorbed inside [`crate::signals`] and replaced with fallback
//! data. A failed run reports exactly one of these errors and leaves no
//! output artifact behind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Every configured feed was unreachable or returned no usable item.
    #[error("feed unreachable or empty: {0}")]
    Fetch(String),

    /// The drafting service failed after all retry attempts.
    #[error("drafting service failed: {0}")]
    Draft(String),

    /// The word-count invariant could not be restored by padding or trimming.
    #[error("assembly invariant unresolvable: {0}")]
    AssemblyPolicy(String),

    /// The document could not be rendered.
    #[error("render failed: {0}")]
    Render(String),

    /// Writing the output artifact failed.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
