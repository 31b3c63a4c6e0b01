//! Internal-link candidate collector.
//!
//! Scrapes heading anchors off a configured site index and scores each
//! candidate by token overlap with the topic. The fallback serves evergreen
//! guide pages so the related-articles section never comes up empty.

use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

use super::{SignalError, SignalSource};
use crate::models::{Signal, SignalKind};
use crate::utils::{token_overlap, tokenize};

/// Anchor titles shorter than this are navigation chrome, not articles.
const MIN_TITLE_LEN: usize = 10;

static HEADING_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1 a[href], h2 a[href], h3 a[href]").unwrap());

/// Evergreen guide pages served when the index is unreachable.
const FALLBACK_PAGES: &[(&str, &str)] = &[
    ("Technical analysis with AI predictions", "/guides/technical-analysis-ai"),
    ("Regulatory impact analysis", "/guides/regulatory-impact"),
    ("Institutional adoption trends", "/guides/institutional-adoption"),
    ("Cross-chain interoperability", "/guides/cross-chain-interoperability"),
    ("DeFi risk assessment", "/guides/defi-risk-assessment"),
];

pub struct LinkCollector {
    client: Client,
    index_url: String,
}

impl LinkCollector {
    pub fn new(client: Client, index_url: impl Into<String>) -> Self {
        LinkCollector {
            client,
            index_url: index_url.into(),
        }
    }
}

impl SignalSource for LinkCollector {
    fn kind(&self) -> SignalKind {
        SignalKind::InternalLink
    }

    #[instrument(level = "debug", skip(self))]
    async fn collect(
        &self,
        topic: &str,
        max_count: usize,
    ) -> std::result::Result<Vec<Signal>, SignalError> {
        if self.index_url.is_empty() {
            return Err(SignalError::Disabled);
        }
        let html = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .text()
            .await?;

        let candidates = extract_candidates(&html, &self.index_url, topic, max_count);
        if candidates.is_empty() {
            return Err(SignalError::Empty);
        }
        Ok(candidates)
    }

    fn fallback(&self, _topic: &str, max_count: usize) -> Vec<Signal> {
        let base = self.index_url.trim_end_matches('/');
        (0..max_count)
            .map(|i| {
                let (title, path) = FALLBACK_PAGES[i % FALLBACK_PAGES.len()];
                Signal::InternalLink {
                    url: format!("{base}{path}"),
                    title: title.to_string(),
                    relevance_score: 1.0 / (1.0 + i as f64),
                }
            })
            .collect()
    }
}

/// Parse heading anchors, resolve hrefs, score and rank by topic overlap.
fn extract_candidates(html: &str, index_url: &str, topic: &str, max_count: usize) -> Vec<Signal> {
    let document = Html::parse_document(html);
    let base = Url::parse(index_url).ok();
    let topic_tokens = tokenize(topic).len().max(1);

    document
        .select(&HEADING_ANCHORS)
        .filter_map(|el| {
            let title = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if title.len() <= MIN_TITLE_LEN {
                return None;
            }
            let href = el.value().attr("href")?;
            let url = match &base {
                Some(b) => b.join(href).ok()?.to_string(),
                None => href.to_string(),
            };
            let relevance_score = token_overlap(topic, &title) as f64 / topic_tokens as f64;
            Some(Signal::InternalLink {
                url,
                title,
                relevance_score,
            })
        })
        .unique_by(|s| match s {
            Signal::InternalLink { url, .. } => url.clone(),
            _ => unreachable!(),
        })
        .sorted_by(|a, b| {
            let (ra, rb) = match (a, b) {
                (
                    Signal::InternalLink {
                        relevance_score: ra, ..
                    },
                    Signal::InternalLink {
                        relevance_score: rb, ..
                    },
                ) => (*ra, *rb),
                _ => unreachable!(),
            };
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        })
        .take(max_count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_HTML: &str = r#"<html><body>
        <h2><a href="/news/bitcoin-rally-extends">Bitcoin rally extends into the weekend</a></h2>
        <h2><a href="/news/eth-upgrade">Ethereum upgrade ships on schedule</a></h2>
        <h3><a href="/news/bitcoin-rally-extends">Bitcoin rally extends into the weekend</a></h3>
        <h3><a href="/about">About</a></h3>
    </body></html>"#;

    #[test]
    fn test_extract_candidates_ranks_by_overlap() {
        let signals = extract_candidates(INDEX_HTML, "https://example.com", "Bitcoin rally", 5);
        assert_eq!(signals.len(), 2); // dedup by url, nav link too short
        match &signals[0] {
            Signal::InternalLink { url, title, relevance_score } => {
                assert_eq!(url, "https://example.com/news/bitcoin-rally-extends");
                assert!(title.contains("Bitcoin"));
                assert!(*relevance_score > 0.0);
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[test]
    fn test_extract_candidates_respects_cap() {
        let signals = extract_candidates(INDEX_HTML, "https://example.com", "crypto", 1);
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn test_fallback_resolves_against_index() {
        let collector = LinkCollector::new(Client::new(), "https://example.com/");
        let signals = collector.fallback("anything", 2);
        assert_eq!(signals.len(), 2);
        match &signals[0] {
            Signal::InternalLink { url, .. } => {
                assert_eq!(url, "https://example.com/guides/technical-analysis-ai");
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_endpoint_errors() {
        let collector = LinkCollector::new(Client::new(), "");
        let err = collector.collect("bitcoin", 2).await.unwrap_err();
        assert!(matches!(err, SignalError::Disabled));
    }
}
