//! Trend keyword collector.
//!
//! Queries a keyword-suggestion endpoint that answers with
//! `<suggestion data="..."/>` XML and scores terms by position. The
//! fallback leads with the topic itself and cycles through a curated list
//! of evergreen crypto keywords.

use itertools::Itertools;
use quick_xml::events::Event;
use reqwest::Client;
use tracing::instrument;

use super::{SignalError, SignalSource};
use crate::models::{Signal, SignalKind};

/// Evergreen keyword phrases used when the live lookup is unavailable.
const FALLBACK_TERMS: &[&str] = &[
    "Bitcoin ETF approval",
    "Ethereum staking rewards",
    "DeFi yield farming strategies",
    "Layer 2 scaling solutions",
    "Crypto regulation impact",
    "Stablecoin market dynamics",
    "Smart contract security audit",
    "Cross-chain bridge technology",
    "Institutional crypto adoption",
    "Central bank digital currency",
];

pub struct TrendCollector {
    client: Client,
    suggest_url: String,
}

impl TrendCollector {
    pub fn new(client: Client, suggest_url: impl Into<String>) -> Self {
        TrendCollector {
            client,
            suggest_url: suggest_url.into(),
        }
    }
}

impl SignalSource for TrendCollector {
    fn kind(&self) -> SignalKind {
        SignalKind::TrendKeyword
    }

    #[instrument(level = "debug", skip(self))]
    async fn collect(
        &self,
        topic: &str,
        max_count: usize,
    ) -> std::result::Result<Vec<Signal>, SignalError> {
        if self.suggest_url.is_empty() {
            return Err(SignalError::Disabled);
        }
        let url = format!("{}{}", self.suggest_url, urlencoding::encode(topic));
        let xml = self.client.get(&url).send().await?.text().await?;

        let terms: Vec<String> = parse_suggestions(&xml)
            .into_iter()
            .unique_by(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Err(SignalError::Empty);
        }

        Ok(terms
            .into_iter()
            .take(max_count)
            .enumerate()
            .map(|(i, term)| Signal::TrendKeyword {
                term,
                score: position_score(i),
            })
            .collect())
    }

    fn fallback(&self, topic: &str, max_count: usize) -> Vec<Signal> {
        (0..max_count)
            .map(|i| {
                let term = if i == 0 {
                    topic.trim().to_lowercase()
                } else {
                    FALLBACK_TERMS[(i - 1) % FALLBACK_TERMS.len()].to_string()
                };
                Signal::TrendKeyword {
                    term,
                    score: position_score(i),
                }
            })
            .collect()
    }
}

/// Earlier suggestions score higher.
fn position_score(index: usize) -> f64 {
    1.0 / (1.0 + index as f64)
}

/// Pull every `data` attribute off `<suggestion/>` elements.
fn parse_suggestions(xml: &str) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut terms = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"suggestion" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"data" {
                        terms.push(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestions() {
        let xml = r#"<toplevel>
            <CompleteSuggestion><suggestion data="bitcoin price"/></CompleteSuggestion>
            <CompleteSuggestion><suggestion data="bitcoin etf flows"/></CompleteSuggestion>
        </toplevel>"#;
        assert_eq!(
            parse_suggestions(xml),
            vec!["bitcoin price", "bitcoin etf flows"]
        );
    }

    #[test]
    fn test_parse_suggestions_garbage_input() {
        assert!(parse_suggestions("not xml at all").is_empty());
        assert!(parse_suggestions("").is_empty());
    }

    #[test]
    fn test_fallback_leads_with_topic() {
        let collector = TrendCollector::new(Client::new(), "");
        let signals = collector.fallback("Bitcoin Hits $70K", 3);
        assert_eq!(signals.len(), 3);
        match &signals[0] {
            Signal::TrendKeyword { term, score } => {
                assert_eq!(term, "bitcoin hits $70k");
                assert_eq!(*score, 1.0);
            }
            other => panic!("unexpected signal {other:?}"),
        }
        match &signals[1] {
            Signal::TrendKeyword { term, .. } => assert_eq!(term, FALLBACK_TERMS[0]),
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[test]
    fn test_fallback_cycles_past_curated_list() {
        let collector = TrendCollector::new(Client::new(), "");
        let signals = collector.fallback("defi", FALLBACK_TERMS.len() + 2);
        assert_eq!(signals.len(), FALLBACK_TERMS.len() + 2);
    }

    #[tokio::test]
    async fn test_disabled_endpoint_errors() {
        let collector = TrendCollector::new(Client::new(), "");
        let err = collector.collect("bitcoin", 3).await.unwrap_err();
        assert!(matches!(err, SignalError::Disabled));
    }
}
