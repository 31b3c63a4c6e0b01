//! Run configuration.
//!
//! Every tunable lives in one explicit [`AppConfig`] value, deserialized
//! from a YAML file and passed into each component at construction; nothing
//! reads ambient state. Defaults match a sensible crypto-news setup, so a
//! missing config file still produces a working pipeline.
//!
//! The density, word-count, and reading-speed numbers are empirically tuned
//! values carried over as plain configuration; nothing in the pipeline
//! depends on their specific magnitudes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One weighted RSS source. Higher weight wins when picking the run's item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Drafting service endpoint (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftApiConfig {
    pub base_url: String,
    /// Bearer token. Empty disables the drafting passes.
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ordered enhancement passes; each feeds its output to the next.
    pub passes: Vec<PassKind>,
}

impl Default for DraftApiConfig {
    fn default() -> Self {
        DraftApiConfig {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            model: "deepseek/deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 2500,
            passes: vec![PassKind::Draft, PassKind::Humanize],
        }
    }
}

/// A named `text -> text` drafting transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Produce the article draft from the source text.
    Draft,
    /// Paraphrase the draft for variety and natural texture.
    Humanize,
}

/// Endpoints for the auxiliary signal collectors. Any of them may be empty;
/// collection then falls straight through to the deterministic fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalEndpoints {
    /// Keyword-suggestion endpoint returning `<suggestion data="..."/>` XML;
    /// the url-encoded topic is appended.
    pub trend_suggest_url: String,
    /// JSON search endpoint returning an array of posts.
    pub social_search_url: String,
    /// Site index page scraped for internal-link candidates.
    pub link_index_url: String,
}

impl Default for SignalEndpoints {
    fn default() -> Self {
        SignalEndpoints {
            trend_suggest_url: "https://suggestqueries.google.com/complete/search?output=toolbar&q="
                .to_string(),
            social_search_url: String::new(),
            link_index_url: "https://cointelegraph.com".to_string(),
        }
    }
}

/// Assembly targets and per-kind signal caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub target_word_count: usize,
    pub word_count_tolerance: usize,
    /// Drives the derived section count for marker-less text.
    pub words_per_section: usize,
    pub reading_speed_wpm: u32,
    /// Density is tracked for this keyword; empty derives it from the first
    /// trend keyword, then from the title.
    pub focus_keyword: String,
    pub max_trend_keywords: usize,
    pub max_social_embeds: usize,
    pub max_related_links: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            target_word_count: 2000,
            word_count_tolerance: 200,
            words_per_section: 400,
            reading_speed_wpm: 200,
            focus_keyword: String::new(),
            max_trend_keywords: 10,
            max_social_embeds: 3,
            max_related_links: 5,
        }
    }
}

/// Top-level configuration passed into every component at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedSource>,
    pub api: DraftApiConfig,
    pub signals: SignalEndpoints,
    pub content: ContentConfig,
    pub output_dir: String,
    pub bind_addr: String,
    pub site_name: String,
    pub author: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            feeds: vec![
                FeedSource {
                    name: "Cointelegraph".to_string(),
                    url: "https://cointelegraph.com/rss".to_string(),
                    weight: 1.0,
                },
                FeedSource {
                    name: "CoinDesk".to_string(),
                    url: "https://www.coindesk.com/arc/outboundfeeds/rss/".to_string(),
                    weight: 0.8,
                },
                FeedSource {
                    name: "Decrypt".to_string(),
                    url: "https://decrypt.co/feed".to_string(),
                    weight: 0.7,
                },
            ],
            api: DraftApiConfig::default(),
            signals: SignalEndpoints::default(),
            content: ContentConfig::default(),
            output_dir: "exports".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            site_name: "Chainpress".to_string(),
            author: "Chainpress Desk".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, or defaults when `path` is None.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = tokio::fs::read_to_string(p)
                    .await
                    .map_err(|e| Error::Config(format!("cannot read {p}: {e}")))?;
                serde_yaml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
            }
            None => Ok(AppConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.feeds.len(), 3);
        assert_eq!(config.content.target_word_count, 2000);
        assert_eq!(config.api.passes, vec![PassKind::Draft, PassKind::Humanize]);
        assert!(config.api.api_key.is_empty());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
content:
  target_word_count: 1000
  word_count_tolerance: 100
output_dir: /tmp/articles
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.content.target_word_count, 1000);
        assert_eq!(config.content.word_count_tolerance, 100);
        assert_eq!(config.output_dir, "/tmp/articles");
        // untouched sections keep their defaults
        assert_eq!(config.content.reading_speed_wpm, 200);
        assert_eq!(config.feeds.len(), 3);
    }

    #[test]
    fn test_pass_kind_snake_case() {
        let yaml = "passes: [draft, humanize]\n";
        let api: DraftApiConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(api.passes, vec![PassKind::Draft, PassKind::Humanize]);
    }
}
