//! Data models for fetched news, auxiliary signals, and assembled documents.
//!
//! This module defines the core data structures flowing through the pipeline:
//! - [`NewsItem`]: the single source article a run is built around
//! - [`Signal`]: a closed tagged variant over every auxiliary data kind
//! - [`AssembledDocument`] / [`Section`]: the structured document handed to
//!   the renderer
//! - [`DocumentMeta`]: derived SEO metadata
//!
//! [`NewsItem`] and the collected [`Signal`]s are created once per run and
//! read-only afterwards; the document is built incrementally by the
//! assembler and consumed exactly once by the renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most recent news item selected from the configured feeds.
///
/// Immutable once fetched. `body_text` is the extracted article text, or the
/// stripped RSS summary when page extraction fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub body_text: String,
    pub publish_time: DateTime<Utc>,
    pub source_url: String,
}

/// An auxiliary piece of fetched context attachable to document sections.
///
/// The variant set is closed on purpose: assembly and rendering match
/// exhaustively, so a new signal kind is a compile error until both ends
/// handle it. Fallback signals use the same variants and are structurally
/// indistinguishable from live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    TrendKeyword {
        term: String,
        score: f64,
    },
    SocialPost {
        author: String,
        text: String,
        engagement_count: u64,
        timestamp: DateTime<Utc>,
    },
    InternalLink {
        url: String,
        title: String,
        relevance_score: f64,
    },
}

/// Discriminant of a [`Signal`] variant, used for per-kind caps and
/// collector dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    TrendKeyword,
    SocialPost,
    InternalLink,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::TrendKeyword => "trend_keyword",
            SignalKind::SocialPost => "social_post",
            SignalKind::InternalLink => "internal_link",
        }
    }
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::TrendKeyword { .. } => SignalKind::TrendKeyword,
            Signal::SocialPost { .. } => SignalKind::SocialPost,
            Signal::InternalLink { .. } => SignalKind::InternalLink,
        }
    }
}

/// A titled block of paragraph text within the assembled document.
///
/// `embedded` holds indexes into [`AssembledDocument::embedded_signals`].
/// Body sections carry at most one embedded signal (a social post); the
/// trailing related-articles section carries one index per link card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub paragraphs: Vec<String>,
    pub embedded: Vec<usize>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Section {
            heading: heading.into(),
            paragraphs: Vec::new(),
            embedded: Vec::new(),
        }
    }

    /// Word count over this section's paragraph text.
    pub fn word_count(&self) -> usize {
        self.paragraphs
            .iter()
            .map(|p| p.split_whitespace().count())
            .sum()
    }
}

/// Derived SEO metadata for an assembled document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Meta description, taken from the first section's leading sentence
    /// and truncated to 160 characters.
    pub description: String,
    /// Trend keyword terms, in collection order.
    pub keywords: Vec<String>,
    /// The keyword whose density is tracked.
    pub focus_keyword: String,
    /// occurrences x keyword token length / total tokens.
    pub keyword_density: f64,
    /// Estimated reading time in minutes, rounded up.
    pub reading_time_minutes: u32,
    /// Word count over all section paragraph text.
    pub word_count: usize,
    pub publish_time: DateTime<Utc>,
    /// When this run produced the document. The renderer derives every
    /// timestamp in the artifact from here, never from the clock.
    pub generated_at: DateTime<Utc>,
    pub source_url: String,
}

/// The structured document produced by the assembler and consumed exactly
/// once by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub title: String,
    pub meta: DocumentMeta,
    pub body_sections: Vec<Section>,
    /// Every signal embedded anywhere in the document, in document order.
    pub embedded_signals: Vec<Signal>,
}

impl AssembledDocument {
    /// Word count over all sections, matching `meta.word_count` after
    /// assembly.
    pub fn word_count(&self) -> usize {
        self.body_sections.iter().map(Section::word_count).sum()
    }

    /// Embedded signals of one kind, in document order.
    pub fn signals_of_kind(&self, kind: SignalKind) -> impl Iterator<Item = &Signal> {
        self.embedded_signals.iter().filter(move |s| s.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> Signal {
        Signal::SocialPost {
            author: "@chainwatch".to_string(),
            text: text.to_string(),
            engagement_count: 12,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_signal_kind_discriminants() {
        let trend = Signal::TrendKeyword {
            term: "bitcoin etf".to_string(),
            score: 1.0,
        };
        let link = Signal::InternalLink {
            url: "/guides/defi-risk".to_string(),
            title: "DeFi risk assessment".to_string(),
            relevance_score: 0.5,
        };
        assert_eq!(trend.kind(), SignalKind::TrendKeyword);
        assert_eq!(post("hello").kind(), SignalKind::SocialPost);
        assert_eq!(link.kind(), SignalKind::InternalLink);
    }

    #[test]
    fn test_signal_serde_tagging() {
        let json = serde_json::to_string(&post("markets are moving")).unwrap();
        assert!(json.contains("\"kind\":\"social_post\""));
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, post("markets are moving"));
    }

    #[test]
    fn test_section_word_count() {
        let mut section = Section::new("Overview");
        section.paragraphs.push("one two three".to_string());
        section.paragraphs.push("four five".to_string());
        assert_eq!(section.word_count(), 5);
    }

    #[test]
    fn test_document_word_count_and_kind_filter() {
        let mut a = Section::new("A");
        a.paragraphs.push("alpha beta".to_string());
        let mut b = Section::new("B");
        b.paragraphs.push("gamma delta epsilon".to_string());

        let doc = AssembledDocument {
            title: "Test".to_string(),
            meta: DocumentMeta {
                description: "Alpha beta.".to_string(),
                keywords: vec![],
                focus_keyword: "alpha".to_string(),
                keyword_density: 0.0,
                reading_time_minutes: 1,
                word_count: 5,
                publish_time: DateTime::<Utc>::UNIX_EPOCH,
                generated_at: DateTime::<Utc>::UNIX_EPOCH,
                source_url: "https://example.com/a".to_string(),
            },
            body_sections: vec![a, b],
            embedded_signals: vec![
                post("alpha"),
                Signal::TrendKeyword {
                    term: "alpha".to_string(),
                    score: 1.0,
                },
            ],
        };

        assert_eq!(doc.word_count(), 5);
        assert_eq!(doc.signals_of_kind(SignalKind::SocialPost).count(), 1);
        assert_eq!(doc.signals_of_kind(SignalKind::TrendKeyword).count(), 1);
        assert_eq!(doc.signals_of_kind(SignalKind::InternalLink).count(), 0);
    }
}
