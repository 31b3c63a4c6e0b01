//! Auxiliary signal collectors with deterministic fallback.
//!
//! One submodule per signal kind, each following the same contract:
//!
//! - `collect(topic, max_count)` queries the live source and may fail
//! - `fallback(topic, max_count)` synthesizes a deterministic substitute
//!   sequence of exactly `max_count` signals of the same kind
//!
//! [`collect_or_fallback`] is the only entry point the pipeline uses: no
//! collector failure ever crosses that boundary. Real data and fallback
//! data are structurally indistinguishable downstream, so assembly never
//! branches on source availability.
//!
//! | Kind | Module | Live source |
//! |------|--------|-------------|
//! | Trend keywords | [`trends`] | suggestion XML endpoint |
//! | Social posts | [`social`] | JSON search endpoint |
//! | Internal links | [`links`] | scraped site index |

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Signal, SignalKind};

pub mod links;
pub mod social;
pub mod trends;

pub use links::LinkCollector;
pub use social::SocialCollector;
pub use trends::TrendCollector;

/// Failure inside a collector. Never propagates past
/// [`collect_or_fallback`]; it exists so the substitution site can log what
/// went wrong.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source returned no results")]
    Empty,
    #[error("unparseable response: {0}")]
    Parse(String),
    #[error("no endpoint configured")]
    Disabled,
}

/// One auxiliary signal source.
pub trait SignalSource {
    fn kind(&self) -> SignalKind;

    /// Query the live source. May fail; the caller substitutes fallback.
    async fn collect(
        &self,
        topic: &str,
        max_count: usize,
    ) -> std::result::Result<Vec<Signal>, SignalError>;

    /// Deterministic synthetic signals, exactly `max_count` of them.
    fn fallback(&self, topic: &str, max_count: usize) -> Vec<Signal>;
}

/// Collect signals of one kind, absorbing every failure.
///
/// Live results are truncated to `max_count`; a failed or empty collection
/// is replaced by the source's fallback sequence, logged at warn level.
/// Insertion order of the returned sequence is preserved either way.
pub async fn collect_or_fallback<S: SignalSource>(
    source: &S,
    topic: &str,
    max_count: usize,
) -> Vec<Signal> {
    if max_count == 0 {
        return Vec::new();
    }
    match source.collect(topic, max_count).await {
        Ok(signals) if !signals.is_empty() => {
            let mut signals = signals;
            signals.truncate(max_count);
            debug!(kind = source.kind().as_str(), count = signals.len(), "Collected live signals");
            signals
        }
        Ok(_) => {
            warn!(kind = source.kind().as_str(), "Source returned nothing; substituting fallback");
            source.fallback(topic, max_count)
        }
        Err(e) => {
            warn!(kind = source.kind().as_str(), error = %e, "Collection failed; substituting fallback");
            source.fallback(topic, max_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A source whose live path always fails, for exercising substitution.
    struct BrokenSource {
        kind: SignalKind,
        inner: TrendCollector,
    }

    impl SignalSource for BrokenSource {
        fn kind(&self) -> SignalKind {
            self.kind
        }

        async fn collect(
            &self,
            _topic: &str,
            _max_count: usize,
        ) -> std::result::Result<Vec<Signal>, SignalError> {
            Err(SignalError::Empty)
        }

        fn fallback(&self, topic: &str, max_count: usize) -> Vec<Signal> {
            self.inner.fallback(topic, max_count)
        }
    }

    #[tokio::test]
    async fn test_failure_substitutes_exactly_max_count() {
        let source = BrokenSource {
            kind: SignalKind::TrendKeyword,
            inner: TrendCollector::new(reqwest::Client::new(), ""),
        };
        let signals = collect_or_fallback(&source, "bitcoin etf", 4).await;
        assert_eq!(signals.len(), 4);
        assert!(signals.iter().all(|s| s.kind() == SignalKind::TrendKeyword));
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let source = BrokenSource {
            kind: SignalKind::TrendKeyword,
            inner: TrendCollector::new(reqwest::Client::new(), ""),
        };
        let first = collect_or_fallback(&source, "bitcoin etf", 3).await;
        let second = collect_or_fallback(&source, "bitcoin etf", 3).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_zero_count_collects_nothing() {
        let source = BrokenSource {
            kind: SignalKind::TrendKeyword,
            inner: TrendCollector::new(reqwest::Client::new(), ""),
        };
        assert!(collect_or_fallback(&source, "bitcoin", 0).await.is_empty());
    }
}
